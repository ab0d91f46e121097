//! 🏗 Infrastructure for handling requests, the ticket model, and configuration
#![warn(missing_docs)]

mod config;
mod error;
mod fields;
mod model;
mod request;

pub use config::Config;
pub use error::{DeskError, Result};
pub use fields::{truthy, Fields};
pub use model::{Ticket, TicketEnvelope, TicketList};
pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
