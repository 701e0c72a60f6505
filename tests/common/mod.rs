// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use stockroom::config::Settings;
use stockroom::domain::{NewProduct, Product, Profile};
use stockroom::InventoryService;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(InventoryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let settings = Settings::for_database(db_path.to_str().unwrap());
    let service = InventoryService::init(&settings).await?;
    Ok((service, temp_dir))
}

/// Helper to register a profile that can act on the inventory
pub async fn signup(service: &InventoryService, full_name: &str) -> Result<Profile> {
    Ok(service.signup(full_name).await?)
}

/// Test fixture: products used across the ledger tests
pub struct StandardProducts;

impl StandardProducts {
    /// Register a product with the given starting stock and threshold
    pub async fn with_stock(
        service: &InventoryService,
        actor: &Profile,
        name: &str,
        quantity: i64,
        min_stock: i64,
    ) -> Result<Product> {
        let product = service
            .register_product(
                actor.id,
                NewProduct {
                    name: name.to_string(),
                    category: "Eletrônicos".to_string(),
                    quantity,
                    min_stock,
                    ..NewProduct::default()
                },
            )
            .await?;
        Ok(product)
    }

    /// A small catalogue across two categories, with prices
    pub async fn create_catalogue(service: &InventoryService, actor: &Profile) -> Result<Vec<Product>> {
        let notebook = service
            .register_product(
                actor.id,
                NewProduct {
                    name: "Notebook Dell".to_string(),
                    category: "Informática".to_string(),
                    brand: "Dell".to_string(),
                    model: "Inspiron 15".to_string(),
                    quantity: 10,
                    min_stock: 5,
                    price_cents: 350000,
                    ..NewProduct::default()
                },
            )
            .await?;
        let monitor = service
            .register_product(
                actor.id,
                NewProduct {
                    name: "Monitor LG".to_string(),
                    category: "Informática".to_string(),
                    brand: "LG".to_string(),
                    model: "27UL500".to_string(),
                    quantity: 4,
                    min_stock: 5,
                    price_cents: 120000,
                    ..NewProduct::default()
                },
            )
            .await?;
        let tv = service
            .register_product(
                actor.id,
                NewProduct {
                    name: "Smart TV Samsung".to_string(),
                    category: "TV e Vídeo".to_string(),
                    brand: "Samsung".to_string(),
                    model: "QN55".to_string(),
                    quantity: 7,
                    min_stock: 2,
                    price_cents: 289990,
                    ..NewProduct::default()
                },
            )
            .await?;
        Ok(vec![notebook, monitor, tv])
    }
}
