mod common;

use anyhow::Result;
use common::{signup, test_service, StandardProducts};
use stockroom::domain::MovementKind;
use stockroom::io::{Exporter, InventorySnapshot};

#[tokio::test]
async fn test_export_products_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    StandardProducts::create_catalogue(&service, &ana).await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_products_csv(&mut buffer)
        .await?;
    assert_eq!(count, 3);

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers()?.clone();
    assert_eq!(&headers[1], "name");
    assert_eq!(&headers[5], "quantity");
    assert_eq!(&headers[7], "price");

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][1], "Monitor LG");
    assert_eq!(&rows[0][5], "4");
    assert_eq!(&rows[0][7], "1200.00");
    assert_eq!(&rows[2][1], "Smart TV Samsung");
    assert_eq!(&rows[2][7], "2899.90");

    Ok(())
}

#[tokio::test]
async fn test_export_movements_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    let products = StandardProducts::create_catalogue(&service, &ana).await?;

    service
        .record_movement(
            products[0].id,
            MovementKind::Outbound,
            2,
            ana.id,
            Some("Pedido 42, loja centro".to_string()),
        )
        .await?;
    service
        .record_movement(products[1].id, MovementKind::Inbound, 6, ana.id, None)
        .await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_movements_csv(&mut buffer)
        .await?;
    assert_eq!(count, 2);

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(&rows[0][3], "Monitor LG");
    assert_eq!(&rows[0][5], "entrada");
    assert_eq!(&rows[1][3], "Notebook Dell");
    assert_eq!(&rows[1][5], "saida");
    assert_eq!(&rows[1][8], "Ana Souza");
    assert_eq!(&rows[1][9], "Pedido 42, loja centro");

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = signup(&service, "Ana Souza").await?;
    let products = StandardProducts::create_catalogue(&service, &ana).await?;

    for quantity in [1, 2, 3] {
        service
            .record_movement(products[2].id, MovementKind::Outbound, quantity, ana.id, None)
            .await?;
    }

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.profiles.len(), 1);
    assert_eq!(snapshot.products.len(), 3);
    assert_eq!(snapshot.movements.len(), 3);

    let parsed: InventorySnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(parsed.profiles[0].full_name, "Ana Souza");

    // Oldest first, so the log replays to the exported balance.
    let quantities: Vec<i64> = parsed.movements.iter().map(|m| m.quantity).collect();
    assert_eq!(quantities, vec![1, 2, 3]);
    let tv = parsed
        .products
        .iter()
        .find(|p| p.id == products[2].id)
        .unwrap();
    let replayed = stockroom::domain::stock::replay(tv.initial_quantity, &parsed.movements);
    assert_eq!(replayed.balance, tv.quantity);

    Ok(())
}
