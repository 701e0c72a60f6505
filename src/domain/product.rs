use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ProfileId};

pub type ProductId = Uuid;

/// Free-form technical attributes. All optional, none are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecs {
    pub voltage: Option<String>,
    pub dimensions: Option<String>,
    pub screen_resolution: Option<String>,
    pub storage_capacity: Option<String>,
    pub connectivity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    /// Current stock balance. Only the movement ledger changes it after registration.
    pub quantity: i64,
    /// Balance at registration time; the starting point when replaying the log.
    pub initial_quantity: i64,
    pub min_stock: i64,
    pub price_cents: Cents,
    pub specs: ProductSpecs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: ProfileId,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        created_by: ProfileId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            brand: brand.into(),
            model: model.into(),
            quantity: 0,
            initial_quantity: 0,
            min_stock: 0,
            price_cents: 0,
            specs: ProductSpecs::default(),
            created_at: now,
            updated_at: now,
            created_by,
        }
    }

    /// Sets both the current and the initial balance.
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self.initial_quantity = quantity;
        self
    }

    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }

    pub fn with_price(mut self, price_cents: Cents) -> Self {
        self.price_cents = price_cents;
        self
    }

    pub fn with_specs(mut self, specs: ProductSpecs) -> Self {
        self.specs = specs;
        self
    }

    /// At or below the replenishment threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn stock_value(&self) -> Cents {
        self.quantity.saturating_mul(self.price_cents)
    }

    /// Case-insensitive match on name, category, brand or model.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&self.name, &self.category, &self.brand, &self.model]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Input for registering a product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub quantity: i64,
    pub min_stock: i64,
    pub price_cents: Cents,
    pub specs: ProductSpecs,
}

/// A direct edit. `quantity` is deliberately absent: stock only moves through
/// recorded movements.
///
/// For the optional spec fields, `Some("")` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_stock: Option<i64>,
    pub price_cents: Option<Cents>,
    pub voltage: Option<String>,
    pub dimensions: Option<String>,
    pub screen_resolution: Option<String>,
    pub storage_capacity: Option<String>,
    pub connectivity: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.brand.is_none()
            && self.model.is_none()
            && self.min_stock.is_none()
            && self.price_cents.is_none()
            && self.voltage.is_none()
            && self.dimensions.is_none()
            && self.screen_resolution.is_none()
            && self.storage_capacity.is_none()
            && self.connectivity.is_none()
    }

    /// Apply the edit in place and bump `updated_at`.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(brand) = self.brand {
            product.brand = brand;
        }
        if let Some(model) = self.model {
            product.model = model;
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(price_cents) = self.price_cents {
            product.price_cents = price_cents;
        }

        let specs = &mut product.specs;
        set_spec(&mut specs.voltage, self.voltage);
        set_spec(&mut specs.dimensions, self.dimensions);
        set_spec(&mut specs.screen_resolution, self.screen_resolution);
        set_spec(&mut specs.storage_capacity, self.storage_capacity);
        set_spec(&mut specs.connectivity, self.connectivity);

        product.updated_at = Utc::now();
    }
}

fn set_spec(field: &mut Option<String>, value: Option<String>) {
    match value {
        Some(v) if v.trim().is_empty() => *field = None,
        Some(v) => *field = Some(v),
        None => {}
    }
}
