// ⚡ Propagation Engine - first-order (delta-method) uncertainty propagation
//
// Each operation reads its operands under one read lock, computes the new
// value and a propagated uncertainty from closed-form partial derivatives
// outside the lock, and inserts the result under the write lock. Failing
// operations insert nothing.
//
// Covariance policy:
// - addition sums covariances across the full contributor closure of both
//   operands, so correlations inherited from shared ancestors surface;
// - subtraction, multiplication, division and power only use the direct
//   covariance between the two immediate operands.

mod additive;
mod multiplicative;
mod power;
mod transcendental;

use bigdecimal::BigDecimal;

use crate::error::Result;
use crate::quantity::Quantity;
use crate::registry::{Operand, Registry};

impl Registry {
    /// Both operands and their direct covariance, from one snapshot
    pub(crate) fn operand_pair(
        &self,
        x: Quantity,
        y: Quantity,
    ) -> Result<(Operand, Operand, BigDecimal)> {
        let arena = self.read();
        let a = self.operand_in(&arena, x)?;
        let b = self.operand_in(&arena, y)?;
        let covariance = arena
            .covariances
            .get(x.id(), y.id())
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(0));
        Ok((a, b, covariance))
    }
}

/// 2·x, the weight of a cross term
pub(crate) fn twice(x: &BigDecimal) -> BigDecimal {
    x * BigDecimal::from(2)
}

// ============================================================================
// TESTS
// ============================================================================
