// 📏 Quantity - identity vs value
//
// "The handle is IDENTITY (never changes), the measurement is a VALUE"
//
// A `Quantity` is a copyable handle into a `Registry`. It does not own the
// value it names and does not keep it alive; the registry does. Reading a
// quantity yields a `Measurement`, a plain value/uncertainty pair that can be
// compared, rendered and serialized on its own.

use bigdecimal::{BigDecimal, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::error::{QuantityError, Result};

// ============================================================================
// IDENTITY
// ============================================================================

/// Slot index plus generation; unique within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl QuantityId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for QuantityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}.{}", self.index, self.generation)
    }
}

/// Handle to one quantity living in a registry
///
/// Handles are freely copyable and never affect lifetime. A handle whose
/// quantity was released stays "absent" forever, even if its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantity {
    pub(crate) registry: Uuid,
    pub(crate) id: QuantityId,
}

impl Quantity {
    pub fn id(&self) -> QuantityId {
        self.id
    }

    /// Identity of the registry this handle belongs to
    pub fn registry_id(&self) -> Uuid {
        self.registry
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantity {}", self.id)
    }
}

// ============================================================================
// PROVENANCE
// ============================================================================

/// Operation that produced a derived quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    AddScalar,
    SubScalar,
    ScalarSub,
    MulScalar,
    DivScalar,
    ScalarDiv,
    PowScalar,
    Sqrt,
    Ln,
    Exp,
    Log10,
    Sin,
    Cos,
    Tan,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
            Operation::Pow => "pow",
            Operation::AddScalar => "add_scalar",
            Operation::SubScalar => "sub_scalar",
            Operation::ScalarSub => "scalar_sub",
            Operation::MulScalar => "mul_scalar",
            Operation::DivScalar => "div_scalar",
            Operation::ScalarDiv => "scalar_div",
            Operation::PowScalar => "pow_scalar",
            Operation::Sqrt => "sqrt",
            Operation::Ln => "ln",
            Operation::Exp => "exp",
            Operation::Log10 => "log10",
            Operation::Sin => "sin",
            Operation::Cos => "cos",
            Operation::Tan => "tan",
        }
    }

    /// Binary quantity-with-quantity operations merge contributor sets
    pub fn merges_contributors(&self) -> bool {
        matches!(
            self,
            Operation::Add | Operation::Sub | Operation::Mul | Operation::Div | Operation::Pow
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Constructed directly from a measured value
    Measured,
    /// Result of an operation
    Derived(Operation),
}

impl Origin {
    pub fn is_measured(&self) -> bool {
        matches!(self, Origin::Measured)
    }
}

// ============================================================================
// MEASUREMENT
// ============================================================================

/// Value with one standard uncertainty
///
/// Equality needs both numbers to match; equality and ordering against a
/// plain `BigDecimal` look at the value only. Ordering between measurements
/// is `cmp_value` and ignores uncertainty entirely: it says nothing about
/// statistical distinguishability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MeasurementRecord")]
pub struct Measurement {
    pub value: BigDecimal,
    pub uncertainty: BigDecimal,
}

impl Measurement {
    pub fn new(value: BigDecimal, uncertainty: BigDecimal) -> Result<Self> {
        if uncertainty.is_negative() {
            return Err(QuantityError::NegativeUncertainty {
                uncertainty: uncertainty.to_string(),
            });
        }
        Ok(Measurement { value, uncertainty })
    }

    /// Exact value, zero uncertainty
    pub fn exact(value: BigDecimal) -> Self {
        Measurement {
            value,
            uncertainty: BigDecimal::zero(),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.uncertainty.is_zero()
    }

    pub fn variance(&self) -> BigDecimal {
        &self.uncertainty * &self.uncertainty
    }

    /// σ / |value|, or None for a zero value
    pub fn relative_uncertainty(&self) -> Option<BigDecimal> {
        if self.value.is_zero() {
            return None;
        }
        Some(&self.uncertainty / &self.value.abs())
    }

    /// Compare values only
    pub fn cmp_value(&self, other: &Measurement) -> Ordering {
        self.value.cmp(&other.value)
    }
}

/// Unchecked wire form; deserialization goes through `Measurement::new`
#[derive(Deserialize)]
struct MeasurementRecord {
    value: BigDecimal,
    uncertainty: BigDecimal,
}

impl TryFrom<MeasurementRecord> for Measurement {
    type Error = QuantityError;

    fn try_from(record: MeasurementRecord) -> Result<Self> {
        Measurement::new(record.value, record.uncertainty)
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.uncertainty == other.uncertainty
    }
}

impl Eq for Measurement {}

impl PartialEq<BigDecimal> for Measurement {
    fn eq(&self, other: &BigDecimal) -> bool {
        self.value == *other
    }
}

impl PartialOrd<BigDecimal> for Measurement {
    fn partial_cmp(&self, other: &BigDecimal) -> Option<Ordering> {
        Some(self.value.cmp(other))
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± {}", self.value, self.uncertainty)
    }
}

// ============================================================================
// TESTS
// ============================================================================
