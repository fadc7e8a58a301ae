pub mod adjustments;
pub mod health;
pub mod inventory;
pub mod merchants;
pub mod metrics;
pub mod orders;
pub mod payments;
