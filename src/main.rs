use clap::{Parser, Subcommand};
use griddle::{serve, site, watch};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "griddle")]
#[command(about = "Static site generator for a personal cooking site")]
#[command(long_about = "\
Static site generator for a personal cooking site

The input directory holds three trees:

  content/
  ├── pages/                  # Markdown documents with `key: value` frontmatter
  │   ├── about.md
  │   └── cooking/
  │       ├── meta.json       # Optional directory description
  │       └── pan-pizza.md    # template: recipe → HTML page + typeset PDF
  ├── templates/              # page, index, home, cooking, recipe (Tera)
  └── static/                 # Copied verbatim, except:
      └── cooking/            # Gallery sources, renamed to capture timestamps

Frontmatter keys: title, subtitle, template, draft, featured, order.

Pages rebuild only when their source is newer than the output; pass
--force after editing templates. Recipe PDFs and gallery derivatives
are generated concurrently by a worker pool.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site
    Build {
        /// Input directory (pages/, templates/, static/)
        #[arg(short, long, default_value = "./content/")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./dist/")]
        output: PathBuf,

        /// Rebuild every page and PDF, ignoring staleness checks
        #[arg(short, long)]
        force: bool,
    },
    /// Serve a built site for local preview
    Serve {
        /// Output directory to serve
        #[arg(short, long, default_value = "./dist/")]
        output: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Rebuild on change and serve the result
    Watch {
        /// Input directory to watch
        #[arg(short, long, default_value = "./content/")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./dist/")]
        output: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Shell command to run instead of the in-process build
        #[arg(long)]
        build_command: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            input,
            output,
            force,
        } => {
            site::SiteBuilder::new(&input, &output, force).build()?;
        }
        Command::Serve { output, port } => {
            serve::serve(&output, port)?;
        }
        Command::Watch {
            input,
            output,
            port,
            build_command,
        } => {
            watch::watch(&input, &output, port, build_command)?;
        }
    }

    Ok(())
}
