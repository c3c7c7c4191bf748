//! Service layer
//!
//! Each service owns one slice of the domain and takes the shared `PgPool`
//! by value. The stock ledger is the only writer of positions and
//! movements; transfer and inventory compose it inside their own
//! transactions.

pub mod access;
pub mod alert;
pub mod audit;
pub mod inventory;
pub mod stock;
pub mod transfer;

pub use access::AccessService;
pub use alert::AlertService;
pub use audit::AuditService;
pub use inventory::InventoryService;
pub use stock::StockService;
pub use transfer::TransferService;
