//! Implementation of the request router

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use ticket_desk_core::{
    DeskError, Request, RequestHandler, RequestKind, Result, TicketEnvelope, TicketList,
};

use crate::store::TicketStore;
use crate::writer::Writer;

/// Routes browser requests to the [`TicketStore`]
///
/// Every mutation runs under the store lock and enqueues a snapshot before
/// the lock is released, so snapshots reach the [`Writer`] in the same order
/// as the mutations they capture. Responses never wait for the disk.
pub struct Desk {
    store: Mutex<TicketStore>,
    writer: Writer,
}

impl Desk {
    /// Create a new [`Desk`]
    pub fn new(store: TicketStore, writer: Writer) -> Self {
        Self {
            store: Mutex::new(store),
            writer,
        }
    }

    /// Block until every change made so far is on disk
    pub fn flush(&self) {
        self.writer.flush();
    }

    /// Apply `f` to the store and persist the result, even if nothing changed
    fn mutate<T>(&self, f: impl FnOnce(&mut TicketStore) -> Result<T>) -> Result<T> {
        let mut store = self.store.lock();
        let out = f(&mut *store)?;
        match store.snapshot() {
            Ok(snapshot) => self.writer.persist(snapshot),
            Err(e) => tracing::warn!("could not take snapshot: {e}"),
        }
        Ok(out)
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }
}

impl RequestHandler for Desk {
    fn handle(&self, mut rq: Request) {
        tracing::debug!(kind = ?rq.kind(), "handling request");

        match rq.kind().clone() {
            RequestKind::ListTickets => {
                let list = self.store.lock().to_list();
                rq.respond_with_json(&list);
            }
            RequestKind::ListPending => {
                let tickets = self.store.lock().pending();
                rq.respond_with_json(&TicketList { tickets });
            }
            RequestKind::GetTicket { id } => {
                let ticket = self.store.lock().find(&id).cloned();
                rq.respond_with_json(&TicketEnvelope { ticket });
            }
            RequestKind::DeleteTicket { id } => {
                let list = self.mutate(|store| {
                    match store.delete(&id) {
                        Some(_) => tracing::info!(id = %id, "ticket deleted"),
                        None => tracing::debug!(id = %id, "nothing to delete"),
                    }
                    Ok(store.to_list())
                });
                match list {
                    Ok(list) => rq.respond_with_json(&list),
                    Err(e) => rq.respond_with_err(&e),
                }
            }
            RequestKind::NewTicket => {
                let created = rq.read_fields().and_then(|fields| {
                    self.mutate(|store| {
                        let ticket = store.create(
                            fields.required("cliente"),
                            fields.required("solicitud"),
                            Self::today(),
                        )?;
                        tracing::info!(id = %ticket.id, "ticket created");
                        Ok(())
                    })
                });
                match created {
                    Ok(()) => rq.respond_with_redirect("/"),
                    Err(e) => respond_with_err(rq, e),
                }
            }
            RequestKind::SetCompletion { id, completada } => {
                let updated = self.mutate(|store| {
                    let ticket = store.set_completion(&id, &completada)?;
                    tracing::info!(id = %id, completada = ticket.completada, "ticket updated");
                    Ok(())
                });
                match updated {
                    Ok(()) => rq.respond_with_json(&serde_json::Map::new()),
                    Err(e) => respond_with_err(rq, e),
                }
            }
            RequestKind::EditTicket => {
                let edited = rq.read_fields().and_then(|fields| {
                    self.mutate(|store| {
                        let ticket = store.edit(&fields)?;
                        tracing::info!(id = %ticket.id, "ticket edited");
                        Ok(())
                    })
                });
                match edited {
                    Ok(()) => rq.respond_with_redirect("/"),
                    Err(e) => respond_with_err(rq, e),
                }
            }
        }
    }

    fn shutdown(self) {
        tracing::info!("shutting down, flushing database");
        self.writer.shutdown();
    }
}

fn respond_with_err(rq: Request, err: DeskError) {
    tracing::warn!(kind = ?rq.kind(), "request failed: {err}");
    rq.respond_with_err(&err);
}
