mod history;
mod money;
mod movement;
mod product;
mod profile;
pub mod stock;

pub use history::*;
pub use money::*;
pub use movement::*;
pub use product::*;
pub use profile::*;
pub use stock::{BalanceDiscrepancy, IntegrityReport, StockError};
