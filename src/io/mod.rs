// Data export (CSV and JSON)

mod export;

pub use export::*;
