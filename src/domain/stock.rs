//! Stock balance arithmetic.
//!
//! Each product carries its balance as an eagerly maintained running total in
//! `products.quantity`. Reads never fold the movement log. The cost is paid
//! at write time: the store applies every movement's delta with a single
//! conditional update inside the same transaction that appends the movement,
//! so concurrent writers on one product cannot lose an update and the balance
//! cannot go below zero.
//!
//! Folding the log ([`replay`]) is only used to audit that the running total
//! still agrees with `initial_quantity` plus the movements.

use thiserror::Error;

use super::{Movement, MovementKind, Product, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("movement quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("insufficient stock: available {available}, requested {requested}")]
    Insufficient { available: i64, requested: i64 },

    #[error("stock balance overflow")]
    Overflow,
}

pub fn validate_quantity(quantity: i64) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    Ok(())
}

/// Compute the balance after applying one movement to `balance`.
pub fn apply_movement(balance: i64, kind: MovementKind, quantity: i64) -> Result<i64, StockError> {
    validate_quantity(quantity)?;
    match kind {
        MovementKind::Inbound => balance.checked_add(quantity).ok_or(StockError::Overflow),
        MovementKind::Outbound if quantity > balance => Err(StockError::Insufficient {
            available: balance,
            requested: quantity,
        }),
        MovementKind::Outbound => Ok(balance - quantity),
    }
}

/// Inclusive range of prior balances a movement can be applied to without
/// going negative or overflowing. `quantity` must already be positive.
pub fn applicable_range(kind: MovementKind, quantity: i64) -> (i64, i64) {
    match kind {
        MovementKind::Inbound => (0, i64::MAX - quantity),
        MovementKind::Outbound => (quantity, i64::MAX),
    }
}

/// Result of folding a movement log from an initial balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replay {
    pub balance: i64,
    /// Some prefix of the log drove the balance below zero.
    pub went_negative: bool,
}

/// Fold `movements` (oldest first) starting at `initial`.
pub fn replay(initial: i64, movements: &[Movement]) -> Replay {
    movements.iter().fold(
        Replay {
            balance: initial,
            went_negative: initial < 0,
        },
        |acc, movement| {
            let balance = acc.balance.saturating_add(movement.delta());
            Replay {
                balance,
                went_negative: acc.went_negative || balance < 0,
            }
        },
    )
}

/// A product whose stored balance disagrees with its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDiscrepancy {
    pub product_id: ProductId,
    pub product_name: String,
    pub stored: i64,
    pub replayed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub product_count: i64,
    pub movement_count: i64,
    pub invalid_quantities: i64,
    pub discrepancies: Vec<BalanceDiscrepancy>,
    /// Products whose log went negative at some point.
    pub negative_histories: Vec<ProductId>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.invalid_quantities == 0
            && self.discrepancies.is_empty()
            && self.negative_histories.is_empty()
    }
}

/// Audit every product against its own movement log.
///
/// `logs` yields each product together with its movements, oldest first.
pub fn build_integrity_report<'a, I>(
    logs: I,
    movement_count: i64,
    invalid_quantities: i64,
) -> IntegrityReport
where
    I: IntoIterator<Item = (&'a Product, &'a [Movement])>,
{
    let mut product_count = 0;
    let mut discrepancies = Vec::new();
    let mut negative_histories = Vec::new();

    for (product, movements) in logs {
        product_count += 1;
        let result = replay(product.initial_quantity, movements);
        if result.balance != product.quantity {
            discrepancies.push(BalanceDiscrepancy {
                product_id: product.id,
                product_name: product.name.clone(),
                stored: product.quantity,
                replayed: result.balance,
            });
        }
        if result.went_negative {
            negative_histories.push(product.id);
        }
    }

    IntegrityReport {
        product_count,
        movement_count,
        invalid_quantities,
        discrepancies,
        negative_histories,
    }
}
