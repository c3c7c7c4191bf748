//! Transfer receipt shortfall summarization

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A received transfer line that came up short against what was shipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortfall {
    pub product_id: Uuid,
    pub sent: i64,
    pub received: i64,
    pub note: Option<String>,
}

impl Shortfall {
    pub fn missing(&self) -> i64 {
        self.sent - self.received
    }
}

/// Quantity a receipt is compared against: what was actually shipped,
/// falling back to what was requested when the sent quantity was never
/// recorded.
pub fn effective_sent(quantity_sent: Option<i64>, quantity_requested: i64) -> i64 {
    quantity_sent.unwrap_or(quantity_requested)
}

/// Synthesize a dispute reason summarizing every short line of a partial
/// receipt.
pub fn dispute_reason(shortfalls: &[Shortfall]) -> String {
    let parts: Vec<String> = shortfalls
        .iter()
        .map(|s| {
            let mut part = format!(
                "product {}: sent {}, received {} (missing {})",
                s.product_id,
                s.sent,
                s.received,
                s.missing()
            );
            if let Some(note) = &s.note {
                part.push_str(" - ");
                part.push_str(note);
            }
            part
        })
        .collect();

    format!("Partial receipt: {}", parts.join("; "))
}
