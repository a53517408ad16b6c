//! Shared types for the checkout fulfillment core.
//!
//! - Identifiers used across crates (`OrderId`, `EventId`)
//! - `RequestContext`, the caller-supplied cancellation and deadline carrier
//! - `ErrorKind`, the closed error taxonomy every component maps onto

pub mod context;
pub mod error;
pub mod types;

pub use context::{ContextError, RequestContext};
pub use error::ErrorKind;
pub use types::{EventId, OrderId};
