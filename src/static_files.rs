use http::{Method, StatusCode};
use minijinja::Environment;
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, warn};

use crate::fallback::{DefaultHandler, NotFoundHandler};
use crate::server::{HttpRequest, ResponseHandle};

/// Passthrough responder serving files from a directory.
///
/// `GET`/`HEAD` requests for existing files are answered with the file
/// content; everything else falls through to a `404`. With templates
/// enabled, `.html` files are rendered through `minijinja` with the request
/// `method`, `path` and `query` as context.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    templates: bool,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
            templates: false,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, enabled: bool) -> Self {
        self.templates = enabled;
        self
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let relative = url_path.trim_start_matches('/');
        let relative = if relative.is_empty() || relative.ends_with('/') {
            format!("{relative}index.html")
        } else {
            relative.to_string()
        };
        let mut pb = self.base_dir.clone();
        for comp in Path::new(&relative).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            _ => "application/octet-stream",
        }
    }

    /// Read (and, for templates, render) the file behind `url_path`.
    ///
    /// # Errors
    ///
    /// `NotFound` for missing files and paths escaping the base directory,
    /// `InvalidData` for templates that fail to compile or render, and the
    /// underlying I/O error when the file cannot be read.
    pub fn load(&self, url_path: &str, ctx: Option<&Value>) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        if let (Some("html"), Some(ctx)) = (path.extension().and_then(|s| s.to_str()), ctx) {
            let source = fs::read_to_string(&path)?;
            let mut env = Environment::new();
            env.add_template("page", &source)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let rendered = env
                .get_template("page")
                .and_then(|t| t.render(ctx))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            return Ok((rendered.into_bytes(), Self::content_type(&path)));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl DefaultHandler for StaticFiles {
    fn serve(&self, request: &HttpRequest, response: &ResponseHandle) -> io::Result<()> {
        if request.method != Method::GET && request.method != Method::HEAD {
            return NotFoundHandler.serve(request, response);
        }
        let ctx = self.templates.then(|| {
            let query: serde_json::Map<String, Value> = request
                .query_params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                .collect();
            json!({ "method": request.method.as_str(), "path": request.path, "query": query })
        });
        match self.load(&request.path, ctx.as_ref()) {
            Ok((bytes, content_type)) => {
                debug!(
                    request_id = %request.request_id,
                    path = %request.path,
                    size_bytes = bytes.len(),
                    "Static file served"
                );
                response.set_status(200);
                response.set_content_type(content_type);
                if request.method == Method::GET {
                    response.set_body(bytes);
                }
                response.commit();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => NotFoundHandler.serve(request, response),
            // A broken file is a server fault, not a connection failure
            Err(e) => {
                error!(
                    request_id = %request.request_id,
                    path = %request.path,
                    error = %e,
                    "Static file failed"
                );
                if response.send_error(StatusCode::INTERNAL_SERVER_ERROR, "static file error").is_err() {
                    warn!(request_id = %request.request_id, "Static file error after response committed");
                }
                Ok(())
            }
        }
    }
}
