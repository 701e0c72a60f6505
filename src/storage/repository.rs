use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    stock, Cents, Movement, MovementKind, MovementRecord, Product, ProductId, ProductSpecs,
    Profile, ProfileId, StockError,
};

use super::MIGRATION_001_INITIAL;

const PRODUCT_COLUMNS: &str = "id, name, category, brand, model, quantity, initial_quantity, min_stock, price_cents, voltage, dimensions, screen_resolution, storage_capacity, connectivity, created_at, updated_at, created_by";

const MOVEMENT_COLUMNS: &str =
    "id, product_id, type, quantity, responsible_id, responsible_name, notes, created_at";

/// Connection tuning for the SQLite pool.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits for the database lock before failing.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 8,
        }
    }
}

/// What happened to a movement handed to [`Repository::apply_movement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementOutcome {
    /// Balance updated and movement appended in one transaction.
    Applied { balance: i64 },
    /// The product does not exist. Nothing was written.
    ProductMissing,
    /// The balance could not take the movement (insufficient stock or
    /// overflow). Nothing was written.
    Rejected(StockError),
}

/// Aggregate figures over the whole catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockTotals {
    pub product_count: i64,
    pub total_units: i64,
    pub total_value: Cents,
    pub low_stock_count: i64,
}

/// Repository for persisting and querying profiles, products and movements.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file at `path`. With `create` the file is created if missing.
    pub async fn connect(path: &str, options: &StoreOptions, create: bool) -> Result<Self> {
        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to connect to database {}", path))?;

        debug!(path, max_connections = options.max_connections, "Database pool ready");
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        info!("Database schema is up to date");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(path: &str, options: &StoreOptions) -> Result<Self> {
        let repo = Self::connect(path, options, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Underlying pool, for callers that need raw access to the store.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================
    // Profile operations
    // ========================

    pub async fn save_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(profile.id.to_string())
        .bind(&profile.full_name)
        .bind(timestamp(profile.created_at))
        .bind(timestamp(profile.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save profile")?;
        Ok(())
    }

    pub async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, full_name, created_at, updated_at FROM profiles WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch profile")?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT id, full_name, created_at, updated_at FROM profiles ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list profiles")?;

        rows.iter().map(Self::row_to_profile).collect()
    }

    pub async fn update_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query("UPDATE profiles SET full_name = ?, updated_at = ? WHERE id = ?")
            .bind(&profile.full_name)
            .bind(timestamp(profile.updated_at))
            .bind(profile.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update profile")?;
        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> Result<Profile> {
        Ok(Profile {
            id: parse_uuid(row, "id")?,
            full_name: row.get("full_name"),
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    // ========================
    // Product operations
    // ========================

    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, brand, model, quantity, initial_quantity, min_stock, price_cents,
                                  voltage, dimensions, screen_resolution, storage_capacity, connectivity,
                                  created_at, updated_at, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(&product.model)
        .bind(product.quantity)
        .bind(product.initial_quantity)
        .bind(product.min_stock)
        .bind(product.price_cents)
        .bind(&product.specs.voltage)
        .bind(&product.specs.dimensions)
        .bind(&product.specs.screen_resolution)
        .bind(&product.specs.storage_capacity)
        .bind(&product.specs.connectivity)
        .bind(timestamp(product.created_at))
        .bind(timestamp(product.updated_at))
        .bind(product.created_by.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;
        Ok(())
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE id = ?",
            PRODUCT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product")?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    /// Products whose name equals `name`, ignoring ASCII case.
    pub async fn find_products_by_name(&self, name: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE name = ? COLLATE NOCASE ORDER BY created_at",
            PRODUCT_COLUMNS
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch products by name")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// List products ordered by name, optionally narrowed by a search term
    /// matched against name, category, brand and model.
    pub async fn list_products(&self, search: Option<&str>) -> Result<Vec<Product>> {
        let mut query = format!("SELECT {} FROM products", PRODUCT_COLUMNS);
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        if pattern.is_some() {
            query.push_str(
                " WHERE lower(name) LIKE ?1 OR lower(category) LIKE ?1 OR lower(brand) LIKE ?1 OR lower(model) LIKE ?1",
            );
        }
        query.push_str(" ORDER BY name COLLATE NOCASE, created_at");

        let mut sql_query = sqlx::query(&query);
        if let Some(ref pattern) = pattern {
            sql_query = sql_query.bind(pattern);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// Persist a direct edit. The balance columns are never written here.
    pub async fn update_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, category = ?, brand = ?, model = ?, min_stock = ?, price_cents = ?,
                voltage = ?, dimensions = ?, screen_resolution = ?, storage_capacity = ?, connectivity = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(&product.model)
        .bind(product.min_stock)
        .bind(product.price_cents)
        .bind(&product.specs.voltage)
        .bind(&product.specs.dimensions)
        .bind(&product.specs.screen_resolution)
        .bind(&product.specs.storage_capacity)
        .bind(&product.specs.connectivity)
        .bind(timestamp(product.updated_at))
        .bind(product.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update product")?;
        Ok(())
    }

    /// Delete a product; its movements go with it through the foreign key cascade.
    pub async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete product")?;
        Ok(result.rows_affected() > 0)
    }

    /// Current balance of a product, `None` if it does not exist.
    pub async fn get_quantity(&self, id: ProductId) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product quantity")
    }

    /// Products at or below their threshold, lowest balance first.
    pub async fn list_low_stock(&self, limit: usize) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE quantity <= min_stock ORDER BY quantity, name COLLATE NOCASE LIMIT ?",
            PRODUCT_COLUMNS
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list low stock products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// Catalogue totals. The stock value saturates at `Cents::MAX` instead of
    /// overflowing, since inbound movements can grow it past what fits.
    pub async fn stock_totals(&self) -> Result<StockTotals> {
        let rows = sqlx::query("SELECT quantity, min_stock, price_cents FROM products")
            .fetch_all(&self.pool)
            .await
            .context("Failed to compute stock totals")?;

        let mut totals = StockTotals::default();
        for row in &rows {
            let quantity: i64 = row.try_get("quantity").context("Invalid product quantity")?;
            let min_stock: i64 = row.try_get("min_stock").context("Invalid product min_stock")?;
            let price_cents: Cents = row.try_get("price_cents").context("Invalid product price")?;

            totals.product_count += 1;
            totals.total_units = totals.total_units.saturating_add(quantity);
            totals.total_value = totals
                .total_value
                .saturating_add(quantity.saturating_mul(price_cents));
            if quantity <= min_stock {
                totals.low_stock_count += 1;
            }
        }

        Ok(totals)
    }

    /// Units in stock per category: (category, product count, units).
    pub async fn units_by_category(&self) -> Result<Vec<(String, i64, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT category, COUNT(*) as products, COALESCE(SUM(quantity), 0) as units
            FROM products
            GROUP BY category
            ORDER BY units DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to group stock by category")?;

        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get("category")?,
                    row.try_get("products")?,
                    row.try_get("units")?,
                ))
            })
            .collect::<Result<_, sqlx::Error>>()
            .context("Invalid category totals")
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product> {
        Ok(Product {
            id: parse_uuid(row, "id")?,
            name: row.get("name"),
            category: row.get("category"),
            brand: row.get("brand"),
            model: row.get("model"),
            quantity: row.get("quantity"),
            initial_quantity: row.get("initial_quantity"),
            min_stock: row.get("min_stock"),
            price_cents: row.get("price_cents"),
            specs: ProductSpecs {
                voltage: row.get("voltage"),
                dimensions: row.get("dimensions"),
                screen_resolution: row.get("screen_resolution"),
                storage_capacity: row.get("storage_capacity"),
                connectivity: row.get("connectivity"),
            },
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
            created_by: parse_uuid(row, "created_by")?,
        })
    }

    // ========================
    // Movement operations
    // ========================

    /// Apply a movement's delta to its product and append it to the log as one
    /// transaction.
    ///
    /// The balance changes through a single conditional `UPDATE` written in
    /// terms of the prior value, and it is the first statement of the
    /// transaction, so it takes the write lock before anything is read.
    /// Concurrent callers on the same product queue behind that lock rather than
    /// racing a read-modify-write. If any statement fails the transaction is
    /// dropped uncommitted and rolls back.
    pub async fn apply_movement(&self, movement: &Movement) -> Result<MovementOutcome> {
        let product_id = movement.product_id.to_string();
        let delta = movement.delta();
        let (low, high) = stock::applicable_range(movement.kind, movement.quantity);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin movement transaction")?;

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE id = ?3 AND quantity BETWEEN ?4 AND ?5
            RETURNING quantity
            "#,
        )
        .bind(delta)
        .bind(timestamp(movement.created_at))
        .bind(&product_id)
        .bind(low)
        .bind(high)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update product balance")?;

        let Some(balance) = balance else {
            // Same transaction and write lock, so this is the balance the
            // update was checked against.
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?")
                    .bind(&product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to re-read product balance")?;
            tx.rollback()
                .await
                .context("Failed to roll back movement transaction")?;

            let Some(available) = available else {
                return Ok(MovementOutcome::ProductMissing);
            };
            return match stock::apply_movement(available, movement.kind, movement.quantity) {
                Err(rejection) => Ok(MovementOutcome::Rejected(rejection)),
                Ok(_) => Err(anyhow::anyhow!(
                    "Balance update for product {} matched no row at balance {}",
                    product_id,
                    available
                )),
            };
        };

        sqlx::query(&format!(
            "INSERT INTO movements ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            MOVEMENT_COLUMNS
        ))
        .bind(movement.id.to_string())
        .bind(&product_id)
        .bind(movement.kind.as_str())
        .bind(movement.quantity)
        .bind(movement.responsible_id.to_string())
        .bind(&movement.responsible_name)
        .bind(&movement.notes)
        .bind(timestamp(movement.created_at))
        .execute(&mut *tx)
        .await
        .context("Failed to append movement")?;

        tx.commit()
            .await
            .context("Failed to commit movement transaction")?;

        Ok(MovementOutcome::Applied { balance })
    }

    /// Movements for one product, oldest first.
    pub async fn list_movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM movements WHERE product_id = ? ORDER BY created_at, rowid",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements for product")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// Every movement joined with its product, newest first.
    pub async fn list_movement_records(&self, limit: Option<usize>) -> Result<Vec<MovementRecord>> {
        let mut query = String::from(
            r#"
            SELECT m.id, m.product_id, m.type, m.quantity, m.responsible_id, m.responsible_name,
                   m.notes, m.created_at, p.name as product_name, p.category as product_category
            FROM movements m
            JOIN products p ON p.id = m.product_id
            ORDER BY m.created_at DESC, m.rowid DESC
            "#,
        );

        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list movement history")?;

        rows.iter()
            .map(|row| {
                Ok(MovementRecord {
                    movement: Self::row_to_movement(row)?,
                    product_name: row.get("product_name"),
                    product_category: row.get("product_category"),
                })
            })
            .collect()
    }

    pub async fn count_movements(&self, product_id: Option<ProductId>) -> Result<i64> {
        let count = match product_id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM movements WHERE product_id = ?")
                    .bind(id.to_string())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM movements")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .context("Failed to count movements")?;
        Ok(count)
    }

    /// Movements with a non-positive quantity or an unknown type.
    pub async fn count_invalid_movements(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM movements WHERE quantity <= 0 OR type NOT IN ('entrada', 'saida')",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count invalid movements")
    }

    fn row_to_movement(row: &SqliteRow) -> Result<Movement> {
        let kind_str: String = row.get("type");

        Ok(Movement {
            id: parse_uuid(row, "id")?,
            product_id: parse_uuid(row, "product_id")?,
            kind: MovementKind::from_str(&kind_str)
                .map_err(|e| anyhow::anyhow!("Invalid movement type: {}", e))?,
            quantity: row.get("quantity"),
            responsible_id: parse_uuid(row, "responsible_id")?,
            responsible_name: row.get("responsible_name"),
            notes: row.get("notes"),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically in time order.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid {} timestamp: {}", column, value))?
        .with_timezone(&Utc))
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    Uuid::parse_str(&value).with_context(|| format!("Invalid {}: {}", column, value))
}
