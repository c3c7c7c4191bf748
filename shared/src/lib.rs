//! Shared types and domain logic for the StockHub platform
//!
//! This crate contains the pure, database-independent pieces of the stock
//! management domain: role scoping, weighted-average cost math, transfer
//! shortfall summarization, and input validation helpers.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
