use eyre::Result;
use ticket_desk_tests::TestCtxBuilder;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_create_complete_delete() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let ticket = util::create(&ctx.api, "Ana", "Fix printer").await?;
    assert_eq!(ticket.cliente, "Ana");
    assert_eq!(ticket.solicitud, "Fix printer");
    assert!(!ticket.completada, "New tickets must be pending.");
    assert_eq!(ticket.fecha, util::today());

    let response = ctx.api.set_completion(&ticket.id, "true").await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.result?, serde_json::json!({}));
    let found = ctx.api.get_ticket(&ticket.id).await?.result?;
    assert!(found.is_some_and(|t| t.completada));
    assert!(ctx.api.list_pending().await?.result?.is_empty());

    let remaining = ctx.api.delete_ticket(&ticket.id).await?.result?;
    assert!(remaining.is_empty());
    assert_eq!(ctx.api.get_ticket(&ticket.id).await?.result?, None);

    assert!(ctx.read_database().await?.tickets.is_empty());

    ctx.finish().await
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_starts_without_database_file() -> Result<()> {
    let ctx = TestCtxBuilder::new().without_database().build().await?;
    assert!(ctx.api.list_tickets().await?.result?.is_empty());
    assert!(!ctx.database().exists());

    let ticket = util::create(&ctx.api, "Luis", "Reset password").await?;
    let on_disk = ctx.read_database().await?;
    assert_eq!(on_disk.tickets, vec![ticket]);

    ctx.finish().await
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_refuses_missing_database_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ticket_desk_core::Config {
        database: dir.path().join("db.json"),
        ..Default::default()
    };
    let launched = tokio::task::spawn_blocking(move || ticket_desk_store::launch(&config)).await?;
    assert!(matches!(
        launched,
        Err(ticket_desk_core::DeskError::Io { .. })
    ));
    Ok(())
}
