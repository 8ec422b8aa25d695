// 🌀 Transcendental family: ln, exp, log10, sin, cos, tan
//
// All of these are single-operand: the result inherits the operand's
// contributor set and σy = |f'(x)|·σx.

use bigdecimal::Signed;

use crate::error::{QuantityError, Result};
use crate::quantity::{Operation, Quantity};
use crate::registry::{Lineage, Operand, Registry};

fn require_positive(operation: &'static str, operand: &Operand) -> Result<()> {
    if !operand.value.is_positive() {
        return Err(QuantityError::NonPositiveLogarithm {
            operation,
            value: operand.value.to_string(),
        });
    }
    Ok(())
}

impl Registry {
    /// Natural logarithm; σy = σx/x
    pub fn ln(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;
        require_positive("ln", &a)?;

        let value = self.math().ln(&a.value)?;
        let uncertainty = self.decimal().div(&a.uncertainty, &a.value, "ln")?;
        Ok(self.derive(Operation::Ln, value, uncertainty, Lineage::Inherit(&a)))
    }

    /// e^x; σy = e^x·σx
    pub fn exp(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;

        let value = self.math().exp(&a.value)?;
        let uncertainty = self.decimal().mul(&value, &a.uncertainty);
        Ok(self.derive(Operation::Exp, value, uncertainty, Lineage::Inherit(&a)))
    }

    /// Base-10 logarithm; σy = σx/(x·ln 10)
    pub fn log10(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;
        require_positive("log10", &a)?;

        let ctx = self.decimal();
        let math = self.math();
        let ln10 = math.ln10()?;
        let value = ctx.div(&math.ln(&a.value)?, &ln10, "log10")?;
        let relative = ctx.div(&a.uncertainty, &a.value, "log10")?;
        let uncertainty = ctx.div(&relative, &ln10, "log10")?;
        Ok(self.derive(Operation::Log10, value, uncertainty, Lineage::Inherit(&a)))
    }

    /// Sine (radians); σy = |cos x|·σx
    pub fn sin(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;

        let math = self.math();
        let value = math.sin(&a.value)?;
        let slope = math.cos(&a.value)?;
        let uncertainty = self.decimal().mul(&slope.abs(), &a.uncertainty);
        Ok(self.derive(Operation::Sin, value, uncertainty, Lineage::Inherit(&a)))
    }

    /// Cosine (radians); σy = |sin x|·σx
    pub fn cos(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;

        let math = self.math();
        let value = math.cos(&a.value)?;
        let slope = math.sin(&a.value)?;
        let uncertainty = self.decimal().mul(&slope.abs(), &a.uncertainty);
        Ok(self.derive(Operation::Cos, value, uncertainty, Lineage::Inherit(&a)))
    }

    /// Tangent (radians); σy = σx/cos²x
    ///
    /// Fails with [`QuantityError::TangentPole`] when cos x is zero, or too
    /// small for x at the working precision to tell it apart from zero.
    pub fn tan(&self, x: Quantity) -> Result<Quantity> {
        let a = self.operand(x)?;

        let ctx = self.decimal();
        let math = self.math();
        let cos = math.cos(&a.value)?;
        if ctx.below_resolution(&cos, &a.value) {
            return Err(QuantityError::TangentPole {
                value: a.value.to_string(),
            });
        }
        let value = ctx.div(&math.sin(&a.value)?, &cos, "tan")?;
        let uncertainty = ctx.div(&a.uncertainty, &ctx.square(&cos), "tan")?;
        Ok(self.derive(Operation::Tan, value, uncertainty, Lineage::Inherit(&a)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
