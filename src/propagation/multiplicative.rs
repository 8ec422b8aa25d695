// ✖️ Multiplicative family: x·y, x/y, and their scalar forms
//
// The relative-variance formulas
//   (σx/x)² + (σy/y)² ± 2·cov/(x·y)
// are evaluated in their absolute form, multiplied through by z², which
// stays defined when an operand value is zero.

use bigdecimal::Zero;

use crate::error::{QuantityError, Result};
use crate::numeric::ToDecimal;
use crate::quantity::{Operation, Quantity};
use crate::registry::{Lineage, Registry};

use super::twice;

impl Registry {
    /// z = x·y
    ///
    /// Var(z) = y²σx² + x²σy² + 2·x·y·cov(x, y)
    pub fn mul(&self, x: Quantity, y: Quantity) -> Result<Quantity> {
        let (a, b, covariance) = self.operand_pair(x, y)?;

        let ctx = self.decimal();
        let value = ctx.mul(&a.value, &b.value);
        let terms = [
            ctx.mul(&a.variance(), &ctx.square(&b.value)),
            ctx.mul(&b.variance(), &ctx.square(&a.value)),
            twice(&ctx.mul(&value, &covariance)),
        ];
        let uncertainty = ctx.standard_deviation(&terms, "mul")?;
        Ok(self.derive(Operation::Mul, value, uncertainty, Lineage::Merge(&a, &b)))
    }

    /// z = x / y
    ///
    /// Var(z) = (σx² + z²σy² - 2·z·cov(x, y)) / y²
    pub fn div(&self, x: Quantity, y: Quantity) -> Result<Quantity> {
        let (a, b, covariance) = self.operand_pair(x, y)?;

        let ctx = self.decimal();
        let value = ctx.div(&a.value, &b.value, "div")?;
        let terms = [
            a.variance(),
            ctx.mul(&b.variance(), &ctx.square(&value)),
            -twice(&ctx.mul(&value, &covariance)),
        ];
        let numerator = ctx.standard_deviation(&terms, "div")?;
        let uncertainty = ctx.div(&numerator, &b.value.abs(), "div")?;
        Ok(self.derive(Operation::Div, value, uncertainty, Lineage::Merge(&a, &b)))
    }

    /// x·c; uncertainty scales by |c|
    pub fn mul_scalar(&self, x: Quantity, c: impl ToDecimal) -> Result<Quantity> {
        let c = c.to_decimal()?;
        let a = self.operand(x)?;

        let ctx = self.decimal();
        let value = ctx.mul(&a.value, &c);
        let uncertainty = ctx.mul(&a.uncertainty, &c.abs());
        Ok(self.derive(
            Operation::MulScalar,
            value,
            uncertainty,
            Lineage::Inherit(&a),
        ))
    }

    /// x / c; uncertainty scales by 1/|c|
    pub fn div_scalar(&self, x: Quantity, c: impl ToDecimal) -> Result<Quantity> {
        let c = c.to_decimal()?;
        if c.is_zero() {
            return Err(QuantityError::DivisionByZero {
                operation: "div_scalar",
            });
        }
        let a = self.operand(x)?;

        let ctx = self.decimal();
        let value = ctx.div(&a.value, &c, "div_scalar")?;
        let uncertainty = ctx.div(&a.uncertainty, &c.abs(), "div_scalar")?;
        Ok(self.derive(
            Operation::DivScalar,
            value,
            uncertainty,
            Lineage::Inherit(&a),
        ))
    }

    /// c / x; σ = |c/x|·σx/|x|
    pub fn scalar_div(&self, c: impl ToDecimal, x: Quantity) -> Result<Quantity> {
        let c = c.to_decimal()?;
        let a = self.operand(x)?;
        if a.value.is_zero() {
            return Err(QuantityError::DivisionByZero {
                operation: "scalar_div",
            });
        }

        let ctx = self.decimal();
        let value = ctx.div(&c, &a.value, "scalar_div")?;
        let relative = ctx.div(&a.uncertainty, &a.value.abs(), "scalar_div")?;
        let uncertainty = ctx.mul(&value.abs(), &relative);
        Ok(self.derive(
            Operation::ScalarDiv,
            value,
            uncertainty,
            Lineage::Inherit(&a),
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================
