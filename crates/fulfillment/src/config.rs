//! Engine tunables.

use chrono::Duration;

/// Business constants shared by every workflow.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// How long after delivery a return may still be requested.
    pub return_window: Duration,
    /// Low-stock threshold for products registered without one.
    pub default_low_stock_threshold: u32,
}

impl FulfillmentConfig {
    pub fn with_return_window_days(mut self, days: i64) -> Self {
        self.return_window = Duration::days(days);
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.default_low_stock_threshold = threshold;
        self
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            return_window: Duration::days(10),
            default_low_stock_threshold: 5,
        }
    }
}
