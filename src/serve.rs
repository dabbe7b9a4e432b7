//! Development preview server.
//!
//! Serves the build output directory over HTTP for local preview. Not a
//! production server: single-threaded, no caching headers, bound to
//! localhost. Directory URLs resolve to their `index.html`; anything else
//! that does not match a file is a plain 404.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tiny_http::{Header, Response, Server, StatusCode};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to start server: {0}")]
    Bind(String),
}

/// What a request URL maps to on disk.
#[derive(Debug, PartialEq)]
enum Resolved {
    File(PathBuf),
    NotFound,
}

/// Serve `output_dir` on `port`, blocking forever.
pub fn serve(output_dir: &Path, port: u16) -> Result<(), ServeError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let server = Server::http(addr).map_err(|e| ServeError::Bind(e.to_string()))?;
    println!("serving {} on http://{addr}", output_dir.display());

    for request in server.incoming_requests() {
        let result = match resolve(output_dir, request.url()) {
            Resolved::File(path) => respond_file(request, &path),
            Resolved::NotFound => respond_not_found(request),
        };
        if let Err(e) = result {
            eprintln!("request error: {e}");
        }
    }
    Ok(())
}

/// Map a request URL to a file under `serve_root`.
///
/// The query string is ignored, `..` components are rejected, and a
/// directory resolves to its `index.html`.
fn resolve(serve_root: &Path, url: &str) -> Resolved {
    let path_part = url.split('?').next().unwrap_or(url);
    let relative = path_part.trim_matches('/');

    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Resolved::NotFound;
    }

    let local = serve_root.join(relative);
    if local.is_file() {
        return Resolved::File(local);
    }
    if local.is_dir() {
        let index = local.join("index.html");
        if index.is_file() {
            return Resolved::File(index);
        }
    }
    Resolved::NotFound
}

fn respond_file(request: tiny_http::Request, path: &Path) -> std::io::Result<()> {
    let content = std::fs::read(path)?;
    let response = Response::from_data(content).with_header(
        Header::from_bytes("Content-Type", content_type(path))
            .map_err(|_| std::io::Error::other("bad header"))?,
    );
    request.respond(response)
}

fn respond_not_found(request: tiny_http::Request) -> std::io::Result<()> {
    let response = Response::from_string("404 Not Found").with_status_code(StatusCode(404));
    request.respond(response)
}

/// MIME type from the file extension; octet-stream for anything unknown.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("index.html"), "home").unwrap();
        fs::create_dir_all(tmp.path().join("cooking")).unwrap();
        fs::write(tmp.path().join("cooking/index.html"), "cooking").unwrap();
        fs::write(tmp.path().join("cooking/soup.html"), "soup").unwrap();
        tmp
    }

    #[test]
    fn resolves_files_directly() {
        let tmp = site();
        assert_eq!(
            resolve(tmp.path(), "/cooking/soup.html"),
            Resolved::File(tmp.path().join("cooking/soup.html"))
        );
    }

    #[test]
    fn directory_urls_resolve_to_index() {
        let tmp = site();
        assert_eq!(
            resolve(tmp.path(), "/"),
            Resolved::File(tmp.path().join("index.html"))
        );
        assert_eq!(
            resolve(tmp.path(), "/cooking/"),
            Resolved::File(tmp.path().join("cooking/index.html"))
        );
        assert_eq!(
            resolve(tmp.path(), "/cooking"),
            Resolved::File(tmp.path().join("cooking/index.html"))
        );
    }

    #[test]
    fn query_strings_are_ignored() {
        let tmp = site();
        assert_eq!(
            resolve(tmp.path(), "/cooking/soup.html?t=123"),
            Resolved::File(tmp.path().join("cooking/soup.html"))
        );
    }

    #[test]
    fn missing_paths_are_not_found() {
        let tmp = site();
        assert_eq!(resolve(tmp.path(), "/nope.html"), Resolved::NotFound);
        assert_eq!(resolve(tmp.path(), "/empty-dir"), Resolved::NotFound);
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let tmp = site();
        assert_eq!(
            resolve(tmp.path().join("cooking").as_path(), "/../index.html"),
            Resolved::NotFound
        );
    }

    #[test]
    fn content_types_cover_site_outputs() {
        assert_eq!(
            content_type(Path::new("a.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(content_type(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type(Path::new("a.pdf")), "application/pdf");
        assert_eq!(content_type(Path::new("a.xyz")), "application/octet-stream");
    }
}
