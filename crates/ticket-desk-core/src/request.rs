use std::io;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::error::{DeskError, Result};
use crate::fields::Fields;

/// Kind of the request, with the parameters taken from its path
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestKind {
    /// `GET /tickets`: all tickets
    ListTickets,

    /// `GET /tickets/pendientes`: tickets that are not completed yet
    ListPending,

    /// `GET /ticket/:id`: a single ticket
    GetTicket {
        /// Id of the ticket
        id: String,
    },

    /// `GET /borraticket/:id`: delete a ticket and answer with all remaining
    /// tickets
    DeleteTicket {
        /// Id of the ticket
        id: String,
    },

    /// `POST /nueva`: create a ticket from `cliente` and `solicitud`
    ///
    /// On success the client is redirected to `/`.
    NewTicket,

    /// `GET /actualizaticket/:id/:completada`: mark a ticket as completed
    /// (`"true"`) or pending (anything else)
    SetCompletion {
        /// Id of the ticket
        id: String,
        /// Raw path segment, compared against `"true"`
        completada: String,
    },

    /// `POST /editar`: overwrite `cliente`, `fecha`, `solicitud` and
    /// `completada` of the ticket named by the `id` field
    ///
    /// On success the client is redirected to `/`.
    EditTicket,
}

impl RequestKind {
    /// Map a method and URL to a request kind
    ///
    /// Query strings are ignored, a trailing slash is tolerated, and path
    /// parameters are percent-decoded. Returns [`None`] for anything that is
    /// not part of the ticket API, including paths that do not decode to
    /// UTF-8.
    pub fn from_route(method: RequestMethod, url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let path = path.strip_suffix('/').unwrap_or(path);
        let segments: Vec<String> = path
            .split('/')
            .skip(1)
            .map(|s| percent_decode_str(s).decode_utf8().map(|s| s.into_owned()))
            .collect::<Result<_, _>>()
            .ok()?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        use RequestMethod::*;
        Some(match (method, segments.as_slice()) {
            (Get, ["tickets"]) => RequestKind::ListTickets,
            (Get, ["tickets", "pendientes"]) => RequestKind::ListPending,
            (Get, ["ticket", id]) => RequestKind::GetTicket { id: id.to_string() },
            (Get, ["borraticket", id]) => RequestKind::DeleteTicket { id: id.to_string() },
            (Get, ["actualizaticket", id, completada]) => RequestKind::SetCompletion {
                id: id.to_string(),
                completada: completada.to_string(),
            },
            (Post, ["nueva"]) => RequestKind::NewTicket,
            (Post, ["editar"]) => RequestKind::EditTicket,
            _ => return None,
        })
    }

    /// The request method this kind is reached with
    pub fn method(&self) -> RequestMethod {
        match self {
            RequestKind::NewTicket | RequestKind::EditTicket => RequestMethod::Post,
            _ => RequestMethod::Get,
        }
    }

    /// A URL that [`Self::from_route()`] maps back to this kind
    pub fn url(&self) -> String {
        let enc = |s: &str| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string();
        match self {
            RequestKind::ListTickets => "/tickets".into(),
            RequestKind::ListPending => "/tickets/pendientes".into(),
            RequestKind::GetTicket { id } => format!("/ticket/{}", enc(id)),
            RequestKind::DeleteTicket { id } => format!("/borraticket/{}", enc(id)),
            RequestKind::NewTicket => "/nueva".into(),
            RequestKind::SetCompletion { id, completada } => {
                format!("/actualizaticket/{}/{}", enc(id), enc(completada))
            }
            RequestKind::EditTicket => "/editar".into(),
        }
    }

    /// Whether handling this request changes the store
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            RequestKind::ListTickets | RequestKind::ListPending | RequestKind::GetTicket { .. }
        )
    }
}

/// Request sent from a web browser
pub struct Request {
    kind: RequestKind,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
}

/// Interface for handling requests from a web browser
pub trait RequestHandler {
    /// Handle a request from a web browser
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the ticket desk down
    ///
    /// This method waits until every change has been written to disk.
    fn shutdown(self);
}

/// A raw request, implemented by the HTTP server and the test harness
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;
    /// Get the value of the `Content-Type` header, if any
    fn content_type(&self) -> Option<&str>;

    /// Read the request body as string
    fn read_string(&mut self) -> io::Result<String>;

    /// Respond with a JSON document
    fn respond_with_json(self: Box<Self>, status: u16, body: String);
    /// Respond with a redirect to `location`
    fn respond_with_redirect(self: Box<Self>, location: &str);
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the request URL
    #[inline]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Read and parse the form or JSON payload
    ///
    /// This method has side effects and should be called only once per
    /// request.
    pub fn read_fields(&mut self) -> Result<Fields> {
        let body = self
            .raw
            .read_string()
            .map_err(|e| DeskError::BadRequest(e.to_string()))?;
        Fields::parse(self.raw.content_type(), &body)
    }

    /// Respond with `value` serialized as JSON and status `200`
    pub fn respond_with_json<T: Serialize>(self, value: &T) {
        match serde_json::to_string(value) {
            Ok(body) => self.respond(200, body),
            Err(e) => self.respond_with_err(&DeskError::Serialize(e)),
        }
    }

    /// Respond with `{"error": ...}` and the status matching `err`
    pub fn respond_with_err(self, err: &DeskError) {
        let msg = err.to_string();
        let body = serde_json::to_string(&ErrorPayload { error: &msg })
            .unwrap_or_else(|_| String::from(r#"{"error":"internal error"}"#));
        self.respond(err.status(), body);
    }

    /// Redirect the browser to `location`
    pub fn respond_with_redirect(self, location: &str) {
        #[cfg(feature = "logging")]
        tracing::debug!(method = ?self.method(), url = self.url(), location, "redirect");
        self.raw.respond_with_redirect(location);
    }

    fn respond(self, status: u16, body: String) {
        #[cfg(feature = "logging")]
        tracing::debug!(method = ?self.method(), url = self.url(), status, "respond");
        self.raw.respond_with_json(status, body);
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(kind: RequestKind, raw: Box<dyn RawRequest + Send>) -> Self {
        Self { kind, raw }
    }
}
