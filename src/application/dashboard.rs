use serde::{Deserialize, Serialize};

use crate::domain::{Cents, MovementRecord, Product};

/// Everything the dashboard screen shows, gathered in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_products: i64,
    pub total_units: i64,
    pub total_value: Cents,
    pub low_stock_count: i64,
    /// Lowest balances first, bounded for display.
    pub low_stock: Vec<Product>,
    /// Newest first.
    pub recent_movements: Vec<MovementRecord>,
    pub categories: Vec<CategoryStock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStock {
    pub category: String,
    pub products: i64,
    pub units: i64,
}

impl DashboardSummary {
    /// Percentage of the catalogue that is at or below its threshold.
    pub fn low_stock_ratio(&self) -> f64 {
        if self.total_products == 0 {
            0.0
        } else {
            self.low_stock_count as f64 * 100.0 / self.total_products as f64
        }
    }
}
