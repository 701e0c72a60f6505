use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::domain::{
    stock, Cents, HistoryFilter, IntegrityReport, Movement, MovementKind, MovementRecord,
    NewProduct, Product, ProductId, ProductUpdate, Profile, ProfileId, StockError,
};
use crate::storage::{MovementOutcome, Repository};

use super::{AppError, CategoryStock, DashboardSummary};

/// Application service providing the inventory operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
#[derive(Clone)]
pub struct InventoryService {
    repo: Repository,
}

/// Result of recording a movement
#[derive(Debug, Clone)]
pub struct MovementResult {
    pub movement: Movement,
    pub product_name: String,
    /// Product balance right after this movement was applied.
    pub balance: i64,
}

/// Current balance of a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub min_stock: i64,
}

impl BalanceEntry {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

/// Detailed product information
pub struct ProductInfo {
    pub product: Product,
    pub created_by: Option<Profile>,
    pub movement_count: i64,
    /// Newest first.
    pub recent_movements: Vec<Movement>,
}

impl InventoryService {
    /// Create a new inventory service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database named in `settings`.
    pub async fn init(settings: &Settings) -> Result<Self, AppError> {
        let repo = Repository::init(&settings.database, &settings.store_options()).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        let repo = Repository::connect(&settings.database, &settings.store_options(), false).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Authorization
    // ========================

    /// Capability check run first by every mutating operation: the actor must
    /// be a registered profile. Returns that profile.
    pub async fn authorize(&self, actor: ProfileId) -> Result<Profile, AppError> {
        match self.repo.get_profile(actor).await? {
            Some(profile) => Ok(profile),
            None => {
                warn!(%actor, "Rejected operation from unknown actor");
                Err(AppError::Unauthorized(format!(
                    "{} is not a registered profile",
                    actor
                )))
            }
        }
    }

    // ========================
    // Profile operations
    // ========================

    /// Register a new user profile.
    pub async fn signup(&self, full_name: &str) -> Result<Profile, AppError> {
        let full_name = required("full name", full_name)?;
        let profile = Profile::new(full_name);
        self.repo.save_profile(&profile).await?;
        info!(profile_id = %profile.id, "Profile created");
        Ok(profile)
    }

    pub async fn get_profile(&self, id: ProfileId) -> Result<Profile, AppError> {
        self.repo
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(id.to_string()))
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        Ok(self.repo.list_profiles().await?)
    }

    /// Change the actor's own display name. Past movements keep the old one.
    pub async fn rename_profile(
        &self,
        actor: ProfileId,
        full_name: &str,
    ) -> Result<Profile, AppError> {
        let mut profile = self.authorize(actor).await?;
        profile.rename(required("full name", full_name)?);
        self.repo.update_profile(&profile).await?;
        Ok(profile)
    }

    // ========================
    // Product operations
    // ========================

    /// Register a product. Its starting quantity becomes the initial balance.
    pub async fn register_product(
        &self,
        actor: ProfileId,
        input: NewProduct,
    ) -> Result<Product, AppError> {
        let profile = self.authorize(actor).await?;

        let name = required("name", &input.name)?;
        let category = required("category", &input.category)?;
        non_negative("quantity", input.quantity)?;
        non_negative("minimum stock", input.min_stock)?;
        non_negative("price", input.price_cents)?;
        stock_value_fits(input.quantity, input.price_cents)?;

        let product = Product::new(name, category, input.brand.trim(), input.model.trim(), profile.id)
            .with_quantity(input.quantity)
            .with_min_stock(input.min_stock)
            .with_price(input.price_cents)
            .with_specs(input.specs);

        self.repo.save_product(&product).await?;
        info!(
            product_id = %product.id,
            name = %product.name,
            quantity = product.quantity,
            "Product registered"
        );
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, AppError> {
        self.repo
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(id.to_string()))
    }

    /// Resolve a product from a UUID or an exact (case-insensitive) name.
    pub async fn find_product(&self, reference: &str) -> Result<Product, AppError> {
        let reference = reference.trim();
        if let Ok(id) = uuid::Uuid::parse_str(reference) {
            return self.get_product(id).await;
        }

        let mut matches = self.repo.find_products_by_name(reference).await?;
        match matches.len() {
            0 => Err(AppError::ProductNotFound(reference.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(AppError::Validation(format!(
                "{} products are named '{}'; use the product ID",
                n, reference
            ))),
        }
    }

    pub async fn get_product_info(&self, id: ProductId) -> Result<ProductInfo, AppError> {
        let product = self.get_product(id).await?;
        let created_by = self.repo.get_profile(product.created_by).await?;
        let movement_count = self.repo.count_movements(Some(id)).await?;
        let mut recent_movements = self.repo.list_movements_for_product(id).await?;
        recent_movements.reverse();
        recent_movements.truncate(10);

        Ok(ProductInfo {
            product,
            created_by,
            movement_count,
            recent_movements,
        })
    }

    /// List products by name, optionally narrowed by a search term.
    pub async fn list_products(&self, search: Option<&str>) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products(search).await?)
    }

    /// Edit descriptive fields, specs, threshold or price. Stock is untouched.
    pub async fn update_product(
        &self,
        actor: ProfileId,
        id: ProductId,
        mut update: ProductUpdate,
    ) -> Result<Product, AppError> {
        self.authorize(actor).await?;

        if update.is_empty() {
            return Err(AppError::Validation("nothing to update".to_string()));
        }
        if let Some(name) = update.name.take() {
            update.name = Some(required("name", &name)?.to_string());
        }
        if let Some(category) = update.category.take() {
            update.category = Some(required("category", &category)?.to_string());
        }
        if let Some(min_stock) = update.min_stock {
            non_negative("minimum stock", min_stock)?;
        }
        if let Some(price) = update.price_cents {
            non_negative("price", price)?;
        }

        let mut product = self.get_product(id).await?;
        update.apply(&mut product);
        stock_value_fits(product.quantity, product.price_cents)?;
        self.repo.update_product(&product).await?;

        // Re-read so the returned balance is current, not the one read before the edit.
        let product = self.get_product(id).await?;
        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Remove a product together with its movement log.
    pub async fn delete_product(&self, actor: ProfileId, id: ProductId) -> Result<Product, AppError> {
        self.authorize(actor).await?;
        let product = self.get_product(id).await?;

        if !self.repo.delete_product(id).await? {
            return Err(AppError::ProductNotFound(id.to_string()));
        }
        info!(product_id = %id, name = %product.name, "Product deleted");
        Ok(product)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Record an inbound or outbound movement performed by `actor`.
    ///
    /// The balance update and the movement row are written in one
    /// transaction; on any error neither is applied. An outbound movement
    /// larger than the current balance fails with
    /// [`AppError::InsufficientStock`], and an inbound one that would overflow
    /// the balance with [`AppError::Validation`]. The operation is not retried here.
    #[instrument(skip(self, notes))]
    pub async fn record_movement(
        &self,
        product_id: ProductId,
        kind: MovementKind,
        quantity: i64,
        actor: ProfileId,
        notes: Option<String>,
    ) -> Result<MovementResult, AppError> {
        let responsible = self.authorize(actor).await?;

        stock::validate_quantity(quantity).map_err(|e| AppError::Validation(e.to_string()))?;

        let product = self.get_product(product_id).await?;

        let mut movement = Movement::new(product_id, kind, quantity, &responsible);
        if let Some(notes) = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            movement = movement.with_notes(notes);
        }

        match self.repo.apply_movement(&movement).await? {
            MovementOutcome::Applied { balance } => {
                info!(
                    movement_id = %movement.id,
                    quantity,
                    balance,
                    "Movement recorded"
                );
                Ok(MovementResult {
                    movement,
                    product_name: product.name,
                    balance,
                })
            }
            MovementOutcome::Rejected(StockError::Insufficient {
                available,
                requested,
            }) => {
                debug!(available, requested, "Outbound movement rejected");
                Err(AppError::InsufficientStock {
                    product_name: product.name,
                    available,
                    requested,
                })
            }
            MovementOutcome::Rejected(rejection) => {
                debug!(%rejection, "Movement rejected");
                Err(AppError::Validation(format!("{}: {}", product.name, rejection)))
            }
            // Deleted between the lookup and the write.
            MovementOutcome::ProductMissing => Err(AppError::ProductNotFound(product_id.to_string())),
        }
    }

    // ========================
    // Balance queries
    // ========================

    /// Current stock of a product, as maintained by the ledger.
    pub async fn balance(&self, product_id: ProductId) -> Result<BalanceEntry, AppError> {
        let product = self.get_product(product_id).await?;
        Ok(BalanceEntry {
            product_id: product.id,
            product_name: product.name,
            quantity: product.quantity,
            min_stock: product.min_stock,
        })
    }

    /// Products at or below their minimum, lowest quantity first.
    pub async fn low_stock(&self, limit: usize) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_low_stock(limit).await?)
    }

    // ========================
    // History
    // ========================

    /// Movement log joined with product names, newest first.
    pub async fn movement_history(&self) -> Result<Vec<MovementRecord>, AppError> {
        Ok(self.repo.list_movement_records(None).await?)
    }

    /// Filtered history, newest first, optionally truncated to `limit` rows.
    pub async fn search_history(
        &self,
        filter: &HistoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MovementRecord>, AppError> {
        let records = self.movement_history().await?;
        let mut filtered = filter.apply(&records);
        if let Some(limit) = limit {
            filtered.truncate(limit);
        }
        Ok(filtered)
    }

    /// Movements of a single product, oldest first.
    pub async fn product_movements(&self, product_id: ProductId) -> Result<Vec<Movement>, AppError> {
        self.get_product(product_id).await?;
        Ok(self.repo.list_movements_for_product(product_id).await?)
    }

    // ========================
    // Dashboard and integrity
    // ========================

    pub async fn dashboard(
        &self,
        low_stock_limit: usize,
        recent_limit: usize,
    ) -> Result<DashboardSummary, AppError> {
        let totals = self.repo.stock_totals().await?;
        let low_stock = self.repo.list_low_stock(low_stock_limit).await?;
        let recent_movements = self.repo.list_movement_records(Some(recent_limit)).await?;
        let categories = self
            .repo
            .units_by_category()
            .await?
            .into_iter()
            .map(|(category, products, units)| CategoryStock {
                category,
                products,
                units,
            })
            .collect();

        Ok(DashboardSummary {
            total_products: totals.product_count,
            total_units: totals.total_units,
            total_value: totals.total_value,
            low_stock_count: totals.low_stock_count,
            low_stock,
            recent_movements,
            categories,
        })
    }

    /// Replay every product's log and compare it with the stored balance.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let products = self.repo.list_products(None).await?;
        let mut logs = Vec::with_capacity(products.len());
        for product in &products {
            logs.push(self.repo.list_movements_for_product(product.id).await?);
        }

        let movement_count = self.repo.count_movements(None).await?;
        let invalid = self.repo.count_invalid_movements().await?;

        let report = stock::build_integrity_report(
            products.iter().zip(logs.iter().map(Vec::as_slice)),
            movement_count,
            invalid,
        );

        if !report.is_ok() {
            warn!(
                discrepancies = report.discrepancies.len(),
                negative_histories = report.negative_histories.len(),
                invalid_quantities = report.invalid_quantities,
                "Integrity check found problems"
            );
        }
        Ok(report)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}

/// Stock value (quantity times unit price) must be representable in cents.
fn stock_value_fits(quantity: i64, price_cents: Cents) -> Result<(), AppError> {
    if quantity.checked_mul(price_cents).is_none() {
        return Err(AppError::Validation(format!(
            "stock value of {} units at {} cents each is too large",
            quantity, price_cents
        )));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::Validation(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    Ok(())
}
