//! 🗃 The ticket store, its writer, and the request router
//!
//! The components of the system are the [store], the [writer] persisting the
//! store, and the [desk] answering requests.

#![allow(rustdoc::private_intra_doc_links)]

mod desk;
mod store;
mod writer;

pub use desk::Desk;
pub use store::TicketStore;
pub use writer::Writer;

use ticket_desk_core::{Config, DeskError, Result};

/// Entrypoint of the ticket desk
///
/// Loads the database named by `config` and starts its writer. The returned
/// [`Desk`] is served requests by the surrounding infrastructure.
pub fn launch(config: &Config) -> Result<Desk> {
    let store = TicketStore::load(&config.database, config.create_missing)?;
    tracing::info!(
        path = %config.database.display(),
        tickets = store.tickets().len(),
        "database loaded"
    );

    let writer = Writer::spawn(config.database.clone()).map_err(|source| DeskError::Io {
        path: config.database.clone(),
        source,
    })?;
    Ok(Desk::new(store, writer))
}
