// ⚠️ Error Taxonomy - every failure is raised at the point of violation
//
// Operations either return a well-formed quantity or fail with one of these,
// leaving the registry and the covariance store untouched.

use thiserror::Error;

use crate::quantity::Quantity;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, QuantityError>;

// ============================================================================
// ERROR KIND
// ============================================================================

/// Broad category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input at construction or configuration time
    Validation,
    /// Mathematical domain of an operation violated
    Domain,
    /// Argument is not a live quantity of this registry
    Type,
    /// Transcendental backend produced something that is not a finite decimal
    Numeric,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation",
            ErrorKind::Domain => "Domain",
            ErrorKind::Type => "Type",
            ErrorKind::Numeric => "Numeric",
        }
    }
}

// ============================================================================
// QUANTITY ERROR
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum QuantityError {
    #[error("uncertainty cannot be negative, got {uncertainty}")]
    NegativeUncertainty { uncertainty: String },

    #[error("'{input}' is not a decimal number")]
    InvalidNumber { input: String },

    #[error("correlation coefficient must lie in [-1, 1], got {rho}")]
    InvalidCorrelation { rho: String },

    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("{operation} is only defined for positive values, got {value}")]
    NonPositiveLogarithm { operation: &'static str, value: String },

    #[error("power base must be positive to propagate uncertainty, got {value}")]
    NonPositiveBase { value: String },

    #[error("tangent is undefined where cosine is zero (x = {value})")]
    TangentPole { value: String },

    #[error("division by zero in {operation}")]
    DivisionByZero { operation: &'static str },

    #[error("declared covariances give a negative variance ({variance}) in {operation}")]
    InconsistentCovariance { operation: &'static str, variance: String },

    #[error("{quantity} belongs to a different registry")]
    ForeignQuantity { quantity: Quantity },

    #[error("{quantity} has been released")]
    Released { quantity: Quantity },

    #[error("numeric backend failed in {operation}: {message}")]
    Numeric { operation: &'static str, message: String },
}

impl QuantityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuantityError::NegativeUncertainty { .. }
            | QuantityError::InvalidNumber { .. }
            | QuantityError::InvalidCorrelation { .. }
            | QuantityError::InvalidConfig { .. } => ErrorKind::Validation,
            QuantityError::NonPositiveLogarithm { .. }
            | QuantityError::NonPositiveBase { .. }
            | QuantityError::TangentPole { .. }
            | QuantityError::DivisionByZero { .. }
            | QuantityError::InconsistentCovariance { .. } => ErrorKind::Domain,
            QuantityError::ForeignQuantity { .. } | QuantityError::Released { .. } => {
                ErrorKind::Type
            }
            QuantityError::Numeric { .. } => ErrorKind::Numeric,
        }
    }

    pub(crate) fn numeric(operation: &'static str, message: impl Into<String>) -> Self {
        QuantityError::Numeric {
            operation,
            message: message.into(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
