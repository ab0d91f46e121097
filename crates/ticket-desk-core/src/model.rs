//! The ticket model and its JSON layout

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A support request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Ticket {
    /// Unique id, generated on creation
    pub id: String,
    /// Name of the client
    #[serde(default)]
    pub cliente: String,
    /// Description of the request
    #[serde(default)]
    pub solicitud: String,
    /// Creation date as `YEAR-MONTH-DAY`, not zero-padded
    #[serde(default)]
    pub fecha: String,
    /// Whether the ticket has been dealt with
    #[serde(default)]
    pub completada: bool,
}

impl Ticket {
    /// Create a new pending ticket dated `today`
    pub fn new(cliente: impl Into<String>, solicitud: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().hyphenated().to_string(),
            cliente: cliente.into(),
            solicitud: solicitud.into(),
            fecha: format_fecha(today),
            completada: false,
        }
    }
}

/// Format a date the way tickets store it, e.g. `2024-3-7`
pub fn format_fecha(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// The persisted document and the payload of list responses
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Debug)]
pub struct TicketList {
    /// All tickets in insertion order
    pub tickets: Vec<Ticket>,
}

/// Response payload for a single ticket lookup
///
/// An unknown id produces `{}`.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Debug)]
pub struct TicketEnvelope {
    /// The ticket, if it exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}
