//! 🏗 HTTP request implementation

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use ticket_desk_core::{Request, RequestKind, RequestMethod};
use tiny_http::{Header, Response};

struct HTTPRequest {
    rq: tiny_http::Request,
    content_type: Option<String>,
}

impl ticket_desk_core::RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.rq.url()
    }

    fn method(&self) -> RequestMethod {
        match self.rq.method() {
            tiny_http::Method::Post => RequestMethod::Post,
            _ => RequestMethod::Get,
        }
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn read_string(&mut self) -> io::Result<String> {
        let mut s = String::with_capacity(self.rq.body_length().unwrap_or(0));
        self.rq.as_reader().read_to_string(&mut s)?;
        Ok(s)
    }

    fn respond_with_json(self: Box<Self>, status: u16, body: String) {
        let mut res = Response::from_string(body).with_status_code(status);
        add_header(&mut res, "Content-Type", "application/json; charset=utf-8");
        respond(self.rq, res);
    }

    fn respond_with_redirect(self: Box<Self>, location: &str) {
        let mut res = Response::empty(302);
        add_header(&mut res, "Location", location);
        respond(self.rq, res);
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered, either with a
/// static file from `public_dir` or with a corresponding error message.
pub fn parse(rq: tiny_http::Request, public_dir: &Path) -> Option<Request> {
    use tiny_http::Method::*;

    let method = match rq.method() {
        Options => {
            respond(rq, Response::empty(204));
            return None;
        }
        Get => RequestMethod::Get,
        Post => RequestMethod::Post,
        _ => {
            respond(rq, Response::empty(405));
            return None;
        }
    };

    let Some(kind) = RequestKind::from_route(method, rq.url()) else {
        if method == RequestMethod::Get {
            serve_static(rq, public_dir);
        } else {
            not_found(rq);
        }
        return None;
    };

    let content_type = rq
        .headers()
        .iter()
        .find(|hdr| hdr.field.equiv("content-type"))
        .map(|hdr| hdr.value.as_str().to_owned());

    Some(Request::from_raw(
        kind,
        Box::new(HTTPRequest { rq, content_type }),
    ))
}

/// Answer a GET request with a file below `public_dir`
fn serve_static(rq: tiny_http::Request, public_dir: &Path) {
    let Some(mut path) = static_path(public_dir, rq.url()) else {
        not_found(rq);
        return;
    };
    if path.is_dir() {
        path.push("index.html");
    }

    match File::open(&path) {
        Ok(file) => {
            let mut res = Response::from_file(file);
            add_header(&mut res, "Content-Type", content_type(&path));
            respond(rq, res);
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), "no static file: {e}");
            not_found(rq);
        }
    }
}

/// Resolve `url` to a path below `public_dir`, rejecting parent components
fn static_path(public_dir: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = percent_decode_str(path).decode_utf8().ok()?;
    let relative = Path::new(path.trim_start_matches('/'));

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(public_dir.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn not_found(rq: tiny_http::Request) {
    let res = Response::from_string(
        "🦀 could not find the service you are looking for!

Valid requests are:
  GET  /tickets
  GET  /tickets/pendientes
  GET  /ticket/:id
  GET  /borraticket/:id
  POST /nueva
  GET  /actualizaticket/:id/:completada
  POST /editar",
    )
    .with_status_code(404);
    respond(rq, res);
}

/// Add CORS headers to `res` and send it
fn respond<R: Read>(rq: tiny_http::Request, mut res: Response<R>) {
    add_response_cors_headers(&mut res);
    if let Err(e) = rq.respond(res) {
        tracing::warn!("HTTP response failed: {e}");
    }
}

fn add_header<R: Read>(res: &mut Response<R>, field: &str, value: &str) {
    match Header::from_bytes(field.as_bytes(), value.as_bytes()) {
        Ok(hdr) => res.add_header(hdr),
        Err(()) => tracing::warn!(field, value, "invalid header"),
    }
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    add_header(res, "Access-Control-Request-Method", "*");
    add_header(res, "Access-Control-Allow-Origin", "*");
    add_header(res, "Access-Control-Allow-Headers", "*");
    add_header(res, "Access-Control-Expose-Headers", "*");
}
