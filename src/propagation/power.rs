// 📈 Power family: x^p with a quantity or scalar exponent, and sqrt
//
// The base must be positive: ∂y/∂p = y·ln(x) has no real value otherwise.
// The same restriction is applied to scalar exponents.

use bigdecimal::{BigDecimal, Signed};

use crate::error::{QuantityError, Result};
use crate::numeric::ToDecimal;
use crate::quantity::{Operation, Quantity};
use crate::registry::{Lineage, Operand, Registry};

use super::twice;

fn require_positive_base(base: &Operand) -> Result<()> {
    if !base.value.is_positive() {
        return Err(QuantityError::NonPositiveBase {
            value: base.value.to_string(),
        });
    }
    Ok(())
}

impl Registry {
    /// y = x^p, both quantities
    ///
    /// ∂y/∂x = p·x^(p-1), ∂y/∂p = y·ln(x),
    /// Var(y) = (∂y/∂x·σx)² + (∂y/∂p·σp)² + 2·∂y/∂x·∂y/∂p·cov(x, p)
    pub fn pow(&self, x: Quantity, p: Quantity) -> Result<Quantity> {
        let (base, exponent, covariance) = self.operand_pair(x, p)?;
        require_positive_base(&base)?;

        let ctx = self.decimal();
        let math = self.math();
        let value = math.pow(&base.value, &exponent.value)?;

        let reduced = ctx.sub(&exponent.value, &BigDecimal::from(1));
        let d_base = ctx.mul(&exponent.value, &math.pow(&base.value, &reduced)?);
        let d_exponent = ctx.mul(&value, &math.ln(&base.value)?);

        let terms = [
            ctx.square(&ctx.mul(&d_base, &base.uncertainty)),
            ctx.square(&ctx.mul(&d_exponent, &exponent.uncertainty)),
            twice(&ctx.mul(&ctx.mul(&d_base, &d_exponent), &covariance)),
        ];
        let uncertainty = ctx.standard_deviation(&terms, "pow")?;
        Ok(self.derive(
            Operation::Pow,
            value,
            uncertainty,
            Lineage::Merge(&base, &exponent),
        ))
    }

    /// y = x^p for a plain exponent; σy = |p|·(σx/x)·|y|
    pub fn pow_scalar(&self, x: Quantity, p: impl ToDecimal) -> Result<Quantity> {
        let p = p.to_decimal()?;
        self.power_with_scalar(x, &p, Operation::PowScalar)
    }

    /// √x, i.e. x^0.5
    pub fn sqrt(&self, x: Quantity) -> Result<Quantity> {
        self.power_with_scalar(x, &BigDecimal::new(5.into(), 1), Operation::Sqrt)
    }

    fn power_with_scalar(
        &self,
        x: Quantity,
        p: &BigDecimal,
        operation: Operation,
    ) -> Result<Quantity> {
        let base = self.operand(x)?;
        require_positive_base(&base)?;

        let ctx = self.decimal();
        let value = self.math().pow(&base.value, p)?;
        let relative = ctx.div(&base.uncertainty, &base.value, operation.as_str())?;
        let uncertainty = ctx.mul(&ctx.mul(&p.abs(), &relative), &value.abs());
        Ok(self.derive(operation, value, uncertainty, Lineage::Inherit(&base)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use crate::error::QuantityError;
    use crate::numeric::tests::{assert_close, dec};
    use crate::numeric::Transcendental;
    use crate::quantity::{Operation, Origin};
    use crate::registry::Registry;

    #[test]
    fn test_pow_with_covariance() {
        let registry = Registry::new();
        let a = registry.quantity("2.0", "0.1").unwrap();
        let p = registry.quantity("3.0", "0.2").unwrap();
        registry.set_covariance(a, p, "0.005").unwrap();

        let y = registry.measurement(registry.pow(a, p).unwrap()).unwrap();

        let ln2 = Transcendental::new(*registry.config()).ln(&dec("2")).unwrap();
        let d_base = dec("12");
        let d_exponent = dec("8") * &ln2;
        let d_base_sigma = &d_base * dec("0.1");
        let d_exponent_sigma = &d_exponent * dec("0.2");
        let variance = &d_base_sigma * &d_base_sigma
            + &d_exponent_sigma * &d_exponent_sigma
            + dec("2") * &d_base * &d_exponent * dec("0.005");
        let expected = variance.sqrt().unwrap();

        assert_close(&y.value, &dec("8.0"), 80);
        assert_close(&y.uncertainty, &expected, 80);
        assert_close(&y.uncertainty, &dec("1.82630255"), 6);
    }

    #[test]
    fn test_pow_merges_contributors() {
        let registry = Registry::new();
        let a = registry.quantity("2.0", "0.1").unwrap();
        let p = registry.quantity("3.0", "0.2").unwrap();
        let y = registry.pow(a, p).unwrap();

        let contributors = registry.contributors(y).unwrap();
        assert!(contributors.contains(&a.id()));
        assert!(contributors.contains(&p.id()));
        assert!(contributors.contains(&y.id()));
    }

    #[test]
    fn test_pow_rejects_non_positive_base() {
        let registry = Registry::new();
        let zero = registry.quantity("0", "0.1").unwrap();
        let negative = registry.quantity("-2", "0.1").unwrap();
        let p = registry.quantity("2", "0").unwrap();

        let err = registry.pow(zero, p).unwrap_err();
        assert!(matches!(err, QuantityError::NonPositiveBase { .. }));
        let err = registry.pow_scalar(negative, 2).unwrap_err();
        assert!(matches!(err, QuantityError::NonPositiveBase { .. }));
        let err = registry.sqrt(negative).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Domain);

        assert_eq!(registry.live_count(), 3);
    }

    #[test]
    fn test_pow_scalar() {
        let registry = Registry::new();
        let x = registry.quantity("3.0", "0.03").unwrap();

        // y = 9, σy = 2·0.01·9
        let y = registry.measurement(registry.pow_scalar(x, 2).unwrap()).unwrap();
        assert_close(&y.value, &dec("9"), 80);
        assert_close(&y.uncertainty, &dec("0.18"), 80);
    }

    #[test]
    fn test_pow_scalar_negative_exponent() {
        let registry = Registry::new();
        let x = registry.quantity("2.0", "0.1").unwrap();

        // y = 0.25, σy = |-2|·0.05·0.25
        let y = registry
            .measurement(registry.pow_scalar(x, "-2").unwrap())
            .unwrap();
        assert_close(&y.value, &dec("0.25"), 80);
        assert_close(&y.uncertainty, &dec("0.025"), 80);
    }

    #[test]
    fn test_sqrt() {
        let registry = Registry::new();
        let x = registry.quantity("16", "0.8").unwrap();

        // y = 4, σy = 0.5·0.05·4
        let q = registry.sqrt(x).unwrap();
        let y = registry.measurement(q).unwrap();
        assert_close(&y.value, &dec("4"), 80);
        assert_close(&y.uncertainty, &dec("0.1"), 80);
        assert_eq!(registry.origin(q).unwrap(), Origin::Derived(Operation::Sqrt));
        assert_eq!(
            registry.contributors(q).unwrap(),
            registry.contributors(x).unwrap()
        );
    }

    #[test]
    fn test_exact_base_and_exponent() {
        let registry = Registry::new();
        let a = registry.exact("2").unwrap();
        let p = registry.exact("10").unwrap();

        let y = registry.measurement(registry.pow(a, p).unwrap()).unwrap();
        assert_close(&y.value, &dec("1024"), 80);
        assert_eq!(y.uncertainty, BigDecimal::from(0));
    }
}
