use eyre::Result;
use ticket_desk_tests::TestCtxBuilder;
use util::ticket;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_list_in_persisted_order() -> Result<()> {
    let tickets = vec![ticket("c", false), ticket("a", true), ticket("b", false)];
    let ctx = TestCtxBuilder::new()
        .with_tickets(tickets.clone())
        .build()
        .await?;

    assert_eq!(ctx.api.list_tickets().await?.result?, tickets);

    ctx.finish().await
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_pending_keeps_order() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_tickets(vec![
            ticket("a", false),
            ticket("b", true),
            ticket("c", false),
            ticket("d", true),
            ticket("e", false),
        ])
        .build()
        .await?;

    let pending = ctx.api.list_pending().await?.result?;
    let ids: Vec<_> = pending.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["a", "c", "e"]);
    assert!(pending.iter().all(|t| !t.completada));

    ctx.finish().await
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_get_ticket() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_tickets(vec![ticket("a", false), ticket("b", true)])
        .build()
        .await?;

    assert_eq!(ctx.api.get_ticket("b").await?.result?, Some(ticket("b", true)));

    let missing = ctx.api.get_ticket("nope").await?;
    assert_eq!(missing.status, 200);
    assert_eq!(missing.result?, None);

    ctx.finish().await
}
