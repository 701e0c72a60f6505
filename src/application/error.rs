use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error(
        "Insufficient stock for {product_name}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::ProductNotFound(_) | AppError::ProfileNotFound(_)
        )
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, AppError::InsufficientStock { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}
