// Uncertain Decimal - Core Library
// Arbitrary-precision quantities with first-order uncertainty and covariance propagation

pub mod config;      // Precision configuration (digits, guard digits, env overrides)
pub mod covariance;  // Canonical-pair covariance store
pub mod error;       // QuantityError + ErrorKind
pub mod numeric;     // Decimal conversion, rounding context, transcendental backend
pub mod propagation; // Arithmetic and transcendental operations on quantities
pub mod quantity;    // Handles, identities, measurements
pub mod registry;    // Slot table owning every live quantity

// Re-export commonly used types
pub use config::PrecisionConfig;
pub use error::{ErrorKind, QuantityError, Result};
pub use numeric::ToDecimal;
pub use quantity::{Measurement, Operation, Origin, Quantity, QuantityId};
pub use registry::Registry;

pub use bigdecimal::BigDecimal;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
