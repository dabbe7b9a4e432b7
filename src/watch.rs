//! Watch mode: rebuild on change, serve the result.
//!
//! Watches the whole input tree recursively with a one-second debounce, so a
//! burst of editor writes triggers a single rebuild. The preview server runs
//! on its own thread against the output directory and is oblivious to
//! rebuilds — pages are swapped on disk underneath it.
//!
//! A failed rebuild is reported and watching continues; the previous output
//! stays served. Only the initial build is allowed to abort watch mode.

use crate::site::{BuildError, SiteBuilder};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

const DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("Rebuild command exited with {0}")]
    CommandFailed(i32),
}

/// How changes are turned into a fresh site.
enum Rebuild {
    /// Build in-process with [`SiteBuilder`].
    InProcess { input: PathBuf, output: PathBuf },
    /// Shell out to a user-supplied command.
    Command(String),
}

impl Rebuild {
    fn run(&self) -> Result<(), WatchError> {
        match self {
            Rebuild::InProcess { input, output } => {
                SiteBuilder::new(input, output, false).build()?;
                Ok(())
            }
            Rebuild::Command(command) => {
                let status = Command::new("sh").arg("-c").arg(command).status()?;
                if !status.success() {
                    return Err(WatchError::CommandFailed(status.code().unwrap_or(-1)));
                }
                Ok(())
            }
        }
    }
}

/// Build once, then watch `input_dir` and rebuild on every debounced change,
/// serving `output_dir` on `port` the whole time. Blocks forever.
pub fn watch(
    input_dir: &Path,
    output_dir: &Path,
    port: u16,
    build_command: Option<String>,
) -> Result<(), WatchError> {
    let rebuild = match build_command {
        Some(command) => Rebuild::Command(command),
        None => Rebuild::InProcess {
            input: input_dir.to_path_buf(),
            output: output_dir.to_path_buf(),
        },
    };

    rebuild.run()?;

    {
        let output_dir = output_dir.to_path_buf();
        std::thread::spawn(move || {
            if let Err(e) = crate::serve::serve(&output_dir, port) {
                eprintln!("preview server failed: {e}");
            }
        });
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;
    debouncer
        .watcher()
        .watch(input_dir, RecursiveMode::Recursive)?;
    println!("watching {}", input_dir.display());

    for result in rx {
        match result {
            Ok(_events) => {
                if let Err(e) = rebuild.run() {
                    eprintln!("rebuild failed: {e}");
                }
            }
            Err(e) => eprintln!("watch error: {e}"),
        }
    }
    Ok(())
}
