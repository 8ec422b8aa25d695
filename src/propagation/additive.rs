// ➕ Additive family: x + y, x - y, and their scalar forms

use tracing::debug;

use crate::error::Result;
use crate::numeric::ToDecimal;
use crate::quantity::{Operation, Quantity};
use crate::registry::{Lineage, Registry};

use super::twice;

impl Registry {
    /// z = x + y
    ///
    /// Var(z) = σx² + σy² + 2·Σ cov(u, v) for u in x's contributors and v in
    /// y's contributors, skipping released identities.
    pub fn add(&self, x: Quantity, y: Quantity) -> Result<Quantity> {
        let (a, b, closure) = {
            let arena = self.read();
            let a = self.operand_in(&arena, x)?;
            let b = self.operand_in(&arena, y)?;
            let closure = arena.closure_covariance(&a.contributors, &b.contributors);
            (a, b, closure)
        };
        debug!(x = %x.id(), y = %y.id(), closure = %closure, "contributor closure covariance");

        let ctx = self.decimal();
        let value = ctx.add(&a.value, &b.value);
        let uncertainty =
            ctx.standard_deviation(&[a.variance(), b.variance(), twice(&closure)], "add")?;
        Ok(self.derive(Operation::Add, value, uncertainty, Lineage::Merge(&a, &b)))
    }

    /// z = x - y
    ///
    /// Var(z) = σx² + σy² - 2·cov(x, y), direct covariance only.
    pub fn sub(&self, x: Quantity, y: Quantity) -> Result<Quantity> {
        let (a, b, covariance) = self.operand_pair(x, y)?;

        let ctx = self.decimal();
        let value = ctx.sub(&a.value, &b.value);
        let uncertainty =
            ctx.standard_deviation(&[a.variance(), b.variance(), -twice(&covariance)], "sub")?;
        Ok(self.derive(Operation::Sub, value, uncertainty, Lineage::Merge(&a, &b)))
    }

    /// x + c; uncertainty unchanged
    pub fn add_scalar(&self, x: Quantity, c: impl ToDecimal) -> Result<Quantity> {
        let c = c.to_decimal()?;
        let a = self.operand(x)?;
        let value = self.decimal().add(&a.value, &c);
        Ok(self.derive(
            Operation::AddScalar,
            value,
            a.uncertainty.clone(),
            Lineage::Inherit(&a),
        ))
    }

    /// x - c; uncertainty unchanged
    pub fn sub_scalar(&self, x: Quantity, c: impl ToDecimal) -> Result<Quantity> {
        let c = c.to_decimal()?;
        let a = self.operand(x)?;
        let value = self.decimal().sub(&a.value, &c);
        Ok(self.derive(
            Operation::SubScalar,
            value,
            a.uncertainty.clone(),
            Lineage::Inherit(&a),
        ))
    }

    /// c - x; uncertainty unchanged
    pub fn scalar_sub(&self, c: impl ToDecimal, x: Quantity) -> Result<Quantity> {
        let c = c.to_decimal()?;
        let a = self.operand(x)?;
        let value = self.decimal().sub(&c, &a.value);
        Ok(self.derive(
            Operation::ScalarSub,
            value,
            a.uncertainty.clone(),
            Lineage::Inherit(&a),
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================
