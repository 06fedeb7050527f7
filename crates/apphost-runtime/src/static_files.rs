//! Static content: an app's directory tree, or a single shared file.

use std::path::{Path, PathBuf};

use apphost_core::{AppFault, Request, Response};

const INDEX_FILE: &str = "index.html";

/// Handler serving files under `root` for requests below `prefix`
/// (`/<app>/`).
pub(crate) fn static_handler(
    root: PathBuf,
    prefix: String,
) -> impl Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static {
    move |request: &Request| Ok(serve(&root, &prefix, &request.path))
}

/// Handler answering every request with the contents of `file`.
pub(crate) fn file_handler(
    file: PathBuf,
) -> impl Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static {
    move |_: &Request| Ok(send_file(&file))
}

fn serve(root: &Path, prefix: &str, path: &str) -> Response {
    let Some(relative) = path.strip_prefix(prefix) else {
        return Response::not_found();
    };
    let relative = relative.split(['?', '#']).next().unwrap_or_default();

    let mut relative = relative.to_string();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str(INDEX_FILE);
    }

    if relative
        .split('/')
        .any(|segment| segment == ".." || segment.contains(['\\', '\0']))
    {
        return Response::with_status(403);
    }

    send_file(&root.join(relative.trim_start_matches('/')))
}

fn send_file(file: &Path) -> Response {
    match std::fs::read(file) {
        Ok(bytes) => Response::ok(bytes).with_header("content-type", content_type(file)),
        Err(_) => Response::not_found(),
    }
}

fn content_type(file: &Path) -> &'static str {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body{}").unwrap();
        dir
    }

    #[test]
    fn trailing_slash_serves_index() {
        let dir = site();
        let response = serve(dir.path(), "/notes/", "/notes/");
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), Some("<h1>home</h1>"));
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("text/html; charset=utf-8")
        );
    }

    #[test]
    fn nested_file_with_query() {
        let dir = site();
        let response = serve(dir.path(), "/notes/", "/notes/css/site.css?v=2");
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), Some("body{}"));
    }

    #[test]
    fn traversal_is_forbidden() {
        let dir = site();
        assert_eq!(serve(dir.path(), "/notes/", "/notes/../secret").status, 403);
        assert_eq!(serve(dir.path(), "/notes/", "/notes/css/../../x").status, 403);
    }

    #[test]
    fn file_handler_ignores_request_path() {
        let dir = site();
        let handler = file_handler(dir.path().join("css/site.css"));
        let response = handler(&Request::new(apphost_core::Verb::Get, "/modules/site")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("text/css; charset=utf-8")
        );

        let gone = file_handler(dir.path().join("gone.js"));
        assert_eq!(gone(&Request::new(apphost_core::Verb::Get, "/")).unwrap().status, 404);
    }

    #[test]
    fn missing_file_is_404() {
        let dir = site();
        assert_eq!(serve(dir.path(), "/notes/", "/notes/nope.js").status, 404);
        assert_eq!(serve(dir.path(), "/notes/", "/other/index.html").status, 404);
    }
}
