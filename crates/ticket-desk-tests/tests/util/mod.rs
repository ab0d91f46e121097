use chrono::Datelike;
use eyre::Result;
use serde_json::json;
use ticket_desk_core::Ticket;
use ticket_desk_tests::Api;

/// A ticket with predictable contents
#[allow(unused)]
pub fn ticket(id: &str, completada: bool) -> Ticket {
    Ticket {
        id: id.into(),
        cliente: format!("cliente {id}"),
        solicitud: format!("solicitud {id}"),
        fecha: String::from("2023-11-5"),
        completada,
    }
}

/// Today's date the way new tickets store it
#[allow(unused)]
pub fn today() -> String {
    let now = chrono::Local::now();
    format!("{}-{}-{}", now.year(), now.month(), now.day())
}

/// Creates a ticket and returns it as stored by the desk.
#[allow(unused)]
pub async fn create(api: &Api, cliente: &str, solicitud: &str) -> Result<Ticket> {
    let before = api.list_tickets().await?.result?;
    let location = api
        .new_ticket(&json!({ "cliente": cliente, "solicitud": solicitud }))
        .await?
        .result?;
    assert_eq!(location, "/", "Creating a ticket must redirect to `/`.");

    let after = api.list_tickets().await?.result?;
    assert_eq!(
        after.len(),
        before.len() + 1,
        "Creating a ticket must append exactly one ticket."
    );
    assert_eq!(&after[..before.len()], &before[..]);
    Ok(after[before.len()].clone())
}
