//! Resilient order fulfilment.
//!
//! ```text
//! OrderOrchestrator ──► ProductValidationClient ──► CircuitBreaker ──► ProductCatalog
//!        │
//!        ├──► CartStore / OrderStore
//!        ├──► PaymentExecutor
//!        └──► EventPublisher
//! ```

pub mod catalog;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod payment;
pub mod validation;

pub use catalog::{CatalogError, InMemoryProductCatalog, ProductCatalog, ProductSnapshot};
pub use error::{LineFailure, LineFailureReason, OrderError};
pub use http::HttpProductCatalog;
pub use orchestrator::OrderOrchestrator;
pub use payment::{InMemoryPaymentExecutor, PaymentError, PaymentExecutor, PaymentOutcome};
pub use validation::{ProductValidationClient, ValidationOutcome, ValidationSettings};
