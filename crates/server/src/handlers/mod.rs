//! # API Route Handlers
//!
//! The Axum route handlers for the `invoice-parser-server`, split by concern.

pub mod general;
pub mod invoices;

// Re-exported so the router can reach every handler under `handlers::`.
pub use general::*;
pub use invoices::*;

use super::{errors::AppError, state::AppState};
