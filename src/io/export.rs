use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::InventoryService;
use crate::domain::{format_cents, Movement, Product, Profile};

/// Full database snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub profiles: Vec<Profile>,
    pub products: Vec<Product>,
    /// Oldest first, so replaying the list reproduces every balance.
    pub movements: Vec<Movement>,
}

/// Exporter for converting inventory data to CSV or JSON
pub struct Exporter<'a> {
    service: &'a InventoryService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a InventoryService) -> Self {
        Self { service }
    }

    /// Export the product catalogue with current balances to CSV
    pub async fn export_products_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let products = self.service.list_products(None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "name",
            "category",
            "brand",
            "model",
            "quantity",
            "min_stock",
            "price",
            "voltage",
            "dimensions",
            "screen_resolution",
            "storage_capacity",
            "connectivity",
            "created_at",
        ])?;

        for product in &products {
            let specs = &product.specs;
            csv_writer.write_record([
                product.id.to_string(),
                product.name.clone(),
                product.category.clone(),
                product.brand.clone(),
                product.model.clone(),
                product.quantity.to_string(),
                product.min_stock.to_string(),
                format_cents(product.price_cents),
                specs.voltage.clone().unwrap_or_default(),
                specs.dimensions.clone().unwrap_or_default(),
                specs.screen_resolution.clone().unwrap_or_default(),
                specs.storage_capacity.clone().unwrap_or_default(),
                specs.connectivity.clone().unwrap_or_default(),
                product.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(products.len())
    }

    /// Export the movement history (newest first) to CSV
    pub async fn export_movements_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.movement_history().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "created_at",
            "product_id",
            "product",
            "category",
            "type",
            "quantity",
            "responsible_id",
            "responsible",
            "notes",
        ])?;

        for record in &records {
            let movement = &record.movement;
            csv_writer.write_record([
                movement.id.to_string(),
                movement.created_at.to_rfc3339(),
                movement.product_id.to_string(),
                record.product_name.clone(),
                record.product_category.clone(),
                movement.kind.as_str().to_string(),
                movement.quantity.to_string(),
                movement.responsible_id.to_string(),
                movement.responsible_name.clone(),
                movement.notes.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(records.len())
    }

    /// Export everything as a single JSON document
    pub async fn export_full_json<W: Write>(&self, writer: W) -> Result<InventorySnapshot> {
        let profiles = self.service.list_profiles().await?;
        let products = self.service.list_products(None).await?;
        let mut movements: Vec<Movement> = self
            .service
            .movement_history()
            .await?
            .into_iter()
            .map(|record| record.movement)
            .collect();
        movements.reverse();

        let snapshot = InventorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            profiles,
            products,
            movements,
        };

        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot)
    }
}
