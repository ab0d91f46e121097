use std::sync::Arc;

use eyre::Result;
use flume::Sender;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use ticket_desk_core::{RequestKind, Ticket, TicketEnvelope, TicketList};
use tokio::sync::oneshot;

pub mod mock;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Error {status}: {msg}")]
pub struct ApiError {
    pub status: u16,
    pub msg: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Json { status: u16, body: String },
    Redirect { location: String },
}

impl Response {
    /// Decode a JSON response, turning `{"error": ...}` payloads into errors
    fn into_api_response<T: DeserializeOwned>(self, rq_kind: &RequestKind) -> Result<ApiResponse<T>> {
        match self {
            Response::Json { status, body } => {
                let value: Value = serde_json::from_str(&body)?;
                let result = match value.get("error") {
                    Some(msg) => Err(ApiError {
                        status,
                        msg: msg.as_str().unwrap_or_default().to_owned(),
                    }),
                    None => Ok(serde_json::from_value(value)?),
                };
                Ok(ApiResponse { status, result })
            }
            resp => panic!("{rq_kind:?} must not be answered by {resp:?}"),
        }
    }

    /// Decode the answer to a form submission, which redirects on success
    fn into_redirect(self, rq_kind: &RequestKind) -> Result<ApiResponse<String>> {
        match self {
            Response::Redirect { location } => Ok(ApiResponse {
                status: 302,
                result: Ok(location),
            }),
            Response::Json { status, body } => {
                let value: Value = serde_json::from_str(&body)?;
                match value.get("error").and_then(Value::as_str) {
                    Some(msg) => Ok(ApiResponse {
                        status,
                        result: Err(ApiError {
                            status,
                            msg: msg.to_owned(),
                        }),
                    }),
                    None => panic!("{rq_kind:?} must not be answered by {body}"),
                }
            }
        }
    }
}

/// Body of a POST request
#[derive(Clone, Debug)]
pub enum Payload {
    /// Sent as `application/json`
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Sent verbatim with the given content type
    Raw {
        content_type: Option<String>,
        body: String,
    },
}

impl Payload {
    /// Build a URL-encoded form from `pairs`
    pub fn form<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Payload::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }

    fn encode(self) -> Result<(Option<String>, String)> {
        Ok(match self {
            Payload::Json(value) => (
                Some(String::from("application/json")),
                serde_json::to_string(&value)?,
            ),
            Payload::Form(pairs) => (
                Some(String::from("application/x-www-form-urlencoded")),
                serde_urlencoded::to_string(pairs)?,
            ),
            Payload::Raw { content_type, body } => (content_type, body),
        })
    }
}

impl<T: Serialize> From<&T> for Payload {
    fn from(value: &T) -> Self {
        Payload::Json(serde_json::to_value(value).unwrap_or(Value::Null))
    }
}

struct RequestMsg {
    kind: RequestKind,
    content_type: Option<String>,
    body: String,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per HTTP thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    async fn make_request(&self, kind: &RequestKind, payload: Option<Payload>) -> Result<Response> {
        let (content_type, body) = match payload {
            Some(payload) => payload.encode()?,
            None => (None, String::new()),
        };
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind: kind.clone(),
            content_type,
            body,
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    pub async fn list_tickets(&self) -> Result<ApiResponse<Vec<Ticket>>> {
        let kind = RequestKind::ListTickets;
        let response = self.make_request(&kind, None).await?;
        response
            .into_api_response::<TicketList>(&kind)
            .map(|r| r.map(|list| list.tickets))
    }

    pub async fn list_pending(&self) -> Result<ApiResponse<Vec<Ticket>>> {
        let kind = RequestKind::ListPending;
        let response = self.make_request(&kind, None).await?;
        response
            .into_api_response::<TicketList>(&kind)
            .map(|r| r.map(|list| list.tickets))
    }

    pub async fn get_ticket(&self, id: &str) -> Result<ApiResponse<Option<Ticket>>> {
        let kind = RequestKind::GetTicket { id: id.into() };
        let response = self.make_request(&kind, None).await?;
        response
            .into_api_response::<TicketEnvelope>(&kind)
            .map(|r| r.map(|envelope| envelope.ticket))
    }

    pub async fn delete_ticket(&self, id: &str) -> Result<ApiResponse<Vec<Ticket>>> {
        let kind = RequestKind::DeleteTicket { id: id.into() };
        let response = self.make_request(&kind, None).await?;
        response
            .into_api_response::<TicketList>(&kind)
            .map(|r| r.map(|list| list.tickets))
    }

    /// Submit a new ticket, the result holds the redirect location
    pub async fn new_ticket(&self, payload: impl Into<Payload>) -> Result<ApiResponse<String>> {
        let kind = RequestKind::NewTicket;
        let response = self.make_request(&kind, Some(payload.into())).await?;
        response.into_redirect(&kind)
    }

    pub async fn set_completion(&self, id: &str, completada: &str) -> Result<ApiResponse<Value>> {
        let kind = RequestKind::SetCompletion {
            id: id.into(),
            completada: completada.into(),
        };
        let response = self.make_request(&kind, None).await?;
        response.into_api_response(&kind)
    }

    /// Submit an edit, the result holds the redirect location
    pub async fn edit_ticket(&self, payload: impl Into<Payload>) -> Result<ApiResponse<String>> {
        let kind = RequestKind::EditTicket;
        let response = self.make_request(&kind, Some(payload.into())).await?;
        response.into_redirect(&kind)
    }
}

#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub result: ApiResult<T>,
}

impl<T> ApiResponse<T> {
    pub fn map<R, F: FnOnce(T) -> R>(self, func: F) -> ApiResponse<R> {
        ApiResponse {
            status: self.status,
            result: self.result.map(func),
        }
    }
}
