//! Domain models for the StockHub platform

mod stock;
mod transfer;
mod user;

pub use stock::*;
pub use transfer::*;
pub use user::*;
