//! Mock API implementation directly using the `ticket-desk-store` crate

use std::sync::Arc;

use eyre::{eyre, Result};
use ticket_desk_core::{Config, RawRequest, Request, RequestHandler, RequestMethod};
use ticket_desk_store::Desk;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Api, RequestMsg, Response};

pub struct MockDesk {
    desk: Arc<Desk>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    url: String,
    method: RequestMethod,
    content_type: Option<String>,
    body: Option<String>,
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(threads: u16, config: Config) -> Result<(MockDesk, Api)> {
    let desk = Arc::new(task::spawn_blocking(move || ticket_desk_store::launch(&config)).await??);

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let desk = desk.clone();
        let handle = task::spawn_blocking(move || {
            let desk = &*desk;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    url: msg.kind.url(),
                    method: msg.kind.method(),
                    content_type: msg.content_type,
                    body: Some(msg.body),
                    response_channel: msg.response_channel,
                });
                desk.handle(Request::from_raw(msg.kind, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_desk = MockDesk { desk, join_handles };
    Ok((mock_desk, Api::new(senders)))
}

impl MockDesk {
    /// Wait until every change made so far is on disk
    pub async fn flush(&self) -> Result<()> {
        let desk = self.desk.clone();
        task::spawn_blocking(move || desk.flush()).await?;
        Ok(())
    }

    pub async fn shutdown(self) -> Result<()> {
        for handle in self.join_handles {
            handle.await?;
        }
        let desk = Arc::into_inner(self.desk).ok_or_else(|| eyre!("desk is still shared"))?;
        task::spawn_blocking(move || desk.shutdown()).await?;
        Ok(())
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> RequestMethod {
        self.method
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn read_string(&mut self) -> std::io::Result<String> {
        Ok(self.body.take().unwrap_or_default())
    }

    fn respond_with_json(self: Box<Self>, status: u16, body: String) {
        let MockRawRequest {
            url,
            response_channel,
            ..
        } = *self;
        if response_channel.send(Response::Json { status, body }).is_err() {
            tracing::warn!(url = %url, "response dropped");
        }
    }

    fn respond_with_redirect(self: Box<Self>, location: &str) {
        let MockRawRequest {
            url,
            response_channel,
            ..
        } = *self;
        let response = Response::Redirect {
            location: location.to_owned(),
        };
        if response_channel.send(response).is_err() {
            tracing::warn!(url = %url, "response dropped");
        }
    }
}
