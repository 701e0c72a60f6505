//! Failures injected into either write of a movement must leave both the
//! balance and the log exactly as they were.

mod common;

use anyhow::Result;
use common::{signup, test_service, StandardProducts};
use stockroom::domain::MovementKind;
use stockroom::InventoryService;

async fn execute(service: &InventoryService, sql: &str) -> Result<()> {
    sqlx::query(sql).execute(service.repository().pool()).await?;
    Ok(())
}

#[tokio::test]
async fn test_failed_movement_insert_rolls_back_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    let product = StandardProducts::with_stock(&service, &ana, "Notebook Dell", 10, 2).await?;

    execute(
        &service,
        r#"
        CREATE TRIGGER fail_movement_insert BEFORE INSERT ON movements
        BEGIN
            SELECT RAISE(ABORT, 'injected movement failure');
        END
        "#,
    )
    .await?;

    for kind in [MovementKind::Inbound, MovementKind::Outbound] {
        let err = service
            .record_movement(product.id, kind, 3, ana.id, None)
            .await
            .unwrap_err();
        assert!(err.is_persistence(), "unexpected error: {err}");

        assert_eq!(service.balance(product.id).await?.quantity, 10);
        assert_eq!(service.repository().count_movements(Some(product.id)).await?, 0);
    }

    execute(&service, "DROP TRIGGER fail_movement_insert").await?;

    let result = service
        .record_movement(product.id, MovementKind::Outbound, 3, ana.id, None)
        .await?;
    assert_eq!(result.balance, 7);
    assert_eq!(service.repository().count_movements(Some(product.id)).await?, 1);
    assert!(service.check_integrity().await?.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_failed_balance_update_appends_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    let product = StandardProducts::with_stock(&service, &ana, "Monitor LG", 5, 1).await?;

    execute(
        &service,
        r#"
        CREATE TRIGGER fail_balance_update BEFORE UPDATE OF quantity ON products
        BEGIN
            SELECT RAISE(ABORT, 'injected balance failure');
        END
        "#,
    )
    .await?;

    let err = service
        .record_movement(product.id, MovementKind::Inbound, 4, ana.id, None)
        .await
        .unwrap_err();
    assert!(err.is_persistence(), "unexpected error: {err}");

    assert_eq!(service.balance(product.id).await?.quantity, 5);
    assert!(service.product_movements(product.id).await?.is_empty());

    execute(&service, "DROP TRIGGER fail_balance_update").await?;

    let result = service
        .record_movement(product.id, MovementKind::Inbound, 4, ana.id, None)
        .await?;
    assert_eq!(result.balance, 9);
    assert_eq!(service.product_movements(product.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_rejected_outbound_leaves_other_products_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    let products = StandardProducts::create_catalogue(&service, &ana).await?;
    let before = service.list_products(None).await?;

    let err = service
        .record_movement(products[1].id, MovementKind::Outbound, 100, ana.id, None)
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());

    let after = service.list_products(None).await?;
    assert_eq!(before, after);
    assert_eq!(service.repository().count_movements(None).await?, 0);

    Ok(())
}
