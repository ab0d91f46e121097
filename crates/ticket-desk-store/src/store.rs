//! Implementation of the in-memory ticket store

use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use ticket_desk_core::{DeskError, Fields, Result, Ticket, TicketList};

/// The authoritative list of tickets
///
/// The store itself never touches the disk after [`TicketStore::load()`];
/// persisting snapshots is left to the [`Writer`](crate::Writer).
#[derive(Clone, Default, Debug)]
pub struct TicketStore {
    /// All tickets in insertion order
    tickets: Vec<Ticket>,
}

impl TicketStore {
    /// Create a [`TicketStore`] holding `tickets`
    pub fn new(tickets: Vec<Ticket>) -> Self {
        Self { tickets }
    }

    /// Load the store from the JSON file at `path`
    ///
    /// With `create_missing`, a file that does not exist yields an empty
    /// store instead of an error.
    pub fn load(path: &Path, create_missing: bool) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if create_missing && e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "database missing, starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(DeskError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let list: TicketList = serde_json::from_str(&contents).map_err(|source| {
            DeskError::Corrupt {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::new(list.tickets))
    }

    /// All tickets in insertion order
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Tickets that are not completed yet, in insertion order
    pub fn pending(&self) -> Vec<Ticket> {
        self.tickets
            .iter()
            .filter(|t| !t.completada)
            .cloned()
            .collect()
    }

    /// Find the first ticket with the given id
    pub fn find(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DeskError::NotFound { id: id.to_owned() })
    }

    /// Create a ticket dated `today` and append it
    ///
    /// Fails with [`DeskError::Validation`] unless both `cliente` and
    /// `solicitud` are given and non-empty.
    pub fn create(
        &mut self,
        cliente: Option<String>,
        solicitud: Option<String>,
        today: NaiveDate,
    ) -> Result<&Ticket> {
        let (Some(cliente), Some(solicitud)) = (cliente, solicitud) else {
            return Err(DeskError::Validation);
        };
        if cliente.is_empty() || solicitud.is_empty() {
            return Err(DeskError::Validation);
        }

        let mut ticket = Ticket::new(cliente, solicitud, today);
        // UUID collisions are practically impossible, but ids must stay unique
        while self.find(&ticket.id).is_some() {
            ticket = Ticket::new(ticket.cliente, ticket.solicitud, today);
        }
        self.tickets.push(ticket);
        Ok(&self.tickets[self.tickets.len() - 1])
    }

    /// Remove the ticket with the given id
    ///
    /// Returns the removed ticket. An unknown id leaves the store unchanged.
    pub fn delete(&mut self, id: &str) -> Option<Ticket> {
        let idx = self.position(id).ok()?;
        Some(self.tickets.remove(idx))
    }

    /// Mark a ticket as completed iff `completada` is exactly `"true"`
    pub fn set_completion(&mut self, id: &str, completada: &str) -> Result<&Ticket> {
        let idx = self.position(id)?;
        let ticket = &mut self.tickets[idx];
        ticket.completada = completada == "true";
        Ok(ticket)
    }

    /// Overwrite the ticket named by the `id` field with the submitted
    /// `cliente`, `fecha`, `solicitud` and `completada`
    ///
    /// No field is validated and none is kept from the previous version:
    /// missing text fields become empty strings and `completada` follows the
    /// truthiness of the submitted value.
    pub fn edit(&mut self, fields: &Fields) -> Result<&Ticket> {
        let idx = self.position(&fields.text("id"))?;
        let ticket = &mut self.tickets[idx];
        ticket.cliente = fields.text("cliente");
        ticket.fecha = fields.text("fecha");
        ticket.solicitud = fields.text("solicitud");
        ticket.completada = fields.flag("completada");
        Ok(ticket)
    }

    /// A copy of all tickets in their persisted layout
    pub fn to_list(&self) -> TicketList {
        TicketList {
            tickets: self.tickets.clone(),
        }
    }

    /// Serialize all tickets as the pretty-printed database document
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct Document<'a> {
            tickets: &'a [Ticket],
        }

        let mut bytes = serde_json::to_vec_pretty(&Document {
            tickets: &self.tickets,
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
    }

    fn ticket(id: &str, completada: bool) -> Ticket {
        Ticket {
            id: id.into(),
            cliente: format!("cliente {id}"),
            solicitud: format!("solicitud {id}"),
            fecha: "2024-1-1".into(),
            completada,
        }
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_owned())
    }

    #[test]
    fn create_appends_one_pending_ticket() {
        let mut store = TicketStore::new(vec![ticket("a", true)]);
        let created = store
            .create(some("Ana"), some("Fix printer"), today())
            .unwrap()
            .clone();
        assert_eq!(store.tickets().len(), 2);
        assert_eq!(store.tickets()[1], created);
        assert!(!created.completada);
        assert_eq!(created.fecha, "2024-5-9");
        assert_ne!(created.id, "a");
    }

    #[test]
    fn create_requires_both_fields() {
        let mut store = TicketStore::default();
        for (cliente, solicitud) in [
            (None, some("x")),
            (some("x"), None),
            (some(""), some("x")),
            (some("x"), some("")),
        ] {
            assert!(matches!(
                store.create(cliente, solicitud, today()),
                Err(DeskError::Validation)
            ));
        }
        assert!(store.tickets().is_empty());
    }

    #[test]
    fn created_ids_are_unique() {
        let mut store = TicketStore::default();
        for _ in 0..100 {
            store.create(some("c"), some("s"), today()).unwrap();
        }
        let mut ids: Vec<_> = store.tickets().iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn pending_keeps_order() {
        let store = TicketStore::new(vec![
            ticket("a", false),
            ticket("b", true),
            ticket("c", false),
            ticket("d", true),
        ]);
        let ids: Vec<_> = store.pending().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn delete_present_and_absent() {
        let mut store = TicketStore::new(vec![ticket("a", false), ticket("b", false)]);
        assert!(store.delete("zzz").is_none());
        assert_eq!(store.tickets().len(), 2);

        assert_eq!(store.delete("a").map(|t| t.id).as_deref(), Some("a"));
        assert_eq!(store.tickets().len(), 1);
        assert!(store.find("a").is_none());
        assert!(store.find("b").is_some());
    }

    #[test]
    fn completion_uses_string_equality() {
        let mut store = TicketStore::new(vec![ticket("a", false)]);
        assert!(store.set_completion("a", "true").unwrap().completada);
        assert!(!store.set_completion("a", "TRUE").unwrap().completada);
        store.set_completion("a", "true").unwrap();
        assert!(!store.set_completion("a", "1").unwrap().completada);
        assert!(matches!(
            store.set_completion("b", "true"),
            Err(DeskError::NotFound { .. })
        ));
    }

    #[test]
    fn edit_overwrites_every_field() {
        let mut store = TicketStore::new(vec![ticket("a", false), ticket("b", true)]);
        let fields = Fields::from([
            ("id", json!("b")),
            ("cliente", json!("Luis")),
            ("fecha", json!("not a date")),
            ("completada", json!("")),
        ]);
        let edited = store.edit(&fields).unwrap().clone();
        assert_eq!(
            edited,
            Ticket {
                id: "b".into(),
                cliente: "Luis".into(),
                solicitud: String::new(),
                fecha: "not a date".into(),
                completada: false,
            }
        );
        assert_eq!(store.tickets()[0], ticket("a", false));
    }

    #[test]
    fn edit_unknown_id() {
        let mut store = TicketStore::new(vec![ticket("a", false)]);
        let fields = Fields::from([("id", json!("nope")), ("cliente", json!("x"))]);
        assert!(matches!(store.edit(&fields), Err(DeskError::NotFound { id }) if id == "nope"));
        assert_eq!(store.tickets()[0], ticket("a", false));
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = TicketStore::new(vec![ticket("a", false), ticket("b", true)]);
        std::fs::write(&path, store.snapshot().unwrap()).unwrap();

        let loaded = TicketStore::load(&path, false).unwrap();
        assert_eq!(loaded.tickets(), store.tickets());
    }

    #[test]
    fn load_tickets_with_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"tickets":[{"id":"a","cliente":"Ana","solicitud":"x","completada":true},{"id":"b"}]}"#,
        )
        .unwrap();

        let store = TicketStore::load(&path, false).unwrap();
        assert_eq!(
            store.tickets(),
            [
                Ticket {
                    id: "a".into(),
                    cliente: "Ana".into(),
                    solicitud: "x".into(),
                    fecha: String::new(),
                    completada: true,
                },
                Ticket {
                    id: "b".into(),
                    cliente: String::new(),
                    solicitud: String::new(),
                    fecha: String::new(),
                    completada: false,
                },
            ]
        );
    }

    #[test]
    fn load_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        assert!(matches!(
            TicketStore::load(&path, false),
            Err(DeskError::Io { .. })
        ));
        assert!(TicketStore::load(&path, true).unwrap().tickets().is_empty());

        std::fs::write(&path, "{\"tickets\": 3}").unwrap();
        assert!(matches!(
            TicketStore::load(&path, true),
            Err(DeskError::Corrupt { .. })
        ));
    }
}
