// 🔢 Numeric Layer - precision-bounded decimal arithmetic
//
// Values live as `BigDecimal`. Addition and multiplication are exact and get
// rounded to the configured significant digits; division and square root run
// at BigDecimal's working precision. Transcendental functions go through
// `astro-float` at an equivalent binary precision and come back as decimals.

use astro_float::{BigFloat, Consts, Radix, RoundingMode};
use bigdecimal::{BigDecimal, Signed, Zero};
use std::str::FromStr;

use crate::config::PrecisionConfig;
use crate::error::{QuantityError, Result};

// ============================================================================
// DECIMAL CONVERSION
// ============================================================================

/// Anything that converts exactly into a `BigDecimal`
///
/// Binary floats are intentionally not implemented: chained operations would
/// compound their representation error.
pub trait ToDecimal {
    fn to_decimal(self) -> Result<BigDecimal>;
}

impl ToDecimal for &str {
    fn to_decimal(self) -> Result<BigDecimal> {
        BigDecimal::from_str(self.trim()).map_err(|_| QuantityError::InvalidNumber {
            input: self.to_string(),
        })
    }
}

impl ToDecimal for String {
    fn to_decimal(self) -> Result<BigDecimal> {
        self.as_str().to_decimal()
    }
}

impl ToDecimal for &String {
    fn to_decimal(self) -> Result<BigDecimal> {
        self.as_str().to_decimal()
    }
}

impl ToDecimal for BigDecimal {
    fn to_decimal(self) -> Result<BigDecimal> {
        Ok(self)
    }
}

impl ToDecimal for &BigDecimal {
    fn to_decimal(self) -> Result<BigDecimal> {
        Ok(self.clone())
    }
}

macro_rules! exact_integer_to_decimal {
    ($($t:ty),*) => {
        $(
            impl ToDecimal for $t {
                fn to_decimal(self) -> Result<BigDecimal> {
                    Ok(BigDecimal::from(self))
                }
            }
        )*
    };
}

exact_integer_to_decimal!(i32, i64, u32, u64);

// ============================================================================
// DECIMAL CONTEXT
// ============================================================================

/// Decimal arithmetic bound to one precision configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecimalContext {
    config: PrecisionConfig,
}

impl DecimalContext {
    pub(crate) fn new(config: PrecisionConfig) -> Self {
        DecimalContext { config }
    }

    pub(crate) fn round(&self, x: BigDecimal) -> BigDecimal {
        x.with_prec(self.config.digits)
    }

    pub(crate) fn add(&self, a: &BigDecimal, b: &BigDecimal) -> BigDecimal {
        self.round(a + b)
    }

    pub(crate) fn sub(&self, a: &BigDecimal, b: &BigDecimal) -> BigDecimal {
        self.round(a - b)
    }

    pub(crate) fn mul(&self, a: &BigDecimal, b: &BigDecimal) -> BigDecimal {
        self.round(a * b)
    }

    pub(crate) fn square(&self, a: &BigDecimal) -> BigDecimal {
        self.round(a * a)
    }

    pub(crate) fn div(
        &self,
        a: &BigDecimal,
        b: &BigDecimal,
        operation: &'static str,
    ) -> Result<BigDecimal> {
        if b.is_zero() {
            return Err(QuantityError::DivisionByZero { operation });
        }
        Ok(self.round(a / b))
    }

    pub(crate) fn sqrt(&self, x: &BigDecimal, operation: &'static str) -> Result<BigDecimal> {
        x.sqrt()
            .map(|root| self.round(root))
            .ok_or_else(|| QuantityError::numeric(operation, format!("sqrt of negative {}", x)))
    }

    /// 10^-(digits - guard_digits)
    pub(crate) fn noise_floor(&self) -> BigDecimal {
        BigDecimal::new(1.into(), self.config.noise_floor_exponent() as i64)
    }

    /// Sum variance terms and turn the result into a standard deviation.
    ///
    /// A sum inside the noise floor (relative to the summed magnitudes) is
    /// cancellation residue and becomes exactly zero. A sum below zero beyond
    /// that means the declared covariances cannot belong to real data.
    pub(crate) fn standard_deviation(
        &self,
        terms: &[BigDecimal],
        operation: &'static str,
    ) -> Result<BigDecimal> {
        let mut variance = BigDecimal::zero();
        let mut magnitude = BigDecimal::zero();
        for term in terms {
            variance += term;
            magnitude += term.abs();
        }

        if variance.abs() <= magnitude * self.noise_floor() {
            return Ok(BigDecimal::zero());
        }
        if variance.is_negative() {
            return Err(QuantityError::InconsistentCovariance {
                operation,
                variance: self.round(variance).to_string(),
            });
        }
        self.sqrt(&self.round(variance), operation)
    }

    /// True when |x| is zero or smaller than one unit in the last kept
    /// digit of `reference`
    pub(crate) fn below_resolution(&self, x: &BigDecimal, reference: &BigDecimal) -> bool {
        if x.is_zero() {
            return true;
        }
        let unit = BigDecimal::new(1.into(), self.config.digits as i64);
        x.abs() < reference.abs() * unit
    }
}

// ============================================================================
// TRANSCENDENTAL BACKEND
// ============================================================================

/// Bridge to `astro-float` for ln, exp, sin, cos, tan and power
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transcendental {
    decimal: DecimalContext,
    bits: usize,
}

const RM: RoundingMode = RoundingMode::ToEven;

impl Transcendental {
    pub(crate) fn new(config: PrecisionConfig) -> Self {
        Transcendental {
            decimal: DecimalContext::new(config),
            bits: config.binary_bits(),
        }
    }

    pub(crate) fn ln(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.unary("ln", x, |f, p, cc| f.ln(p, RM, cc))
    }

    pub(crate) fn exp(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.unary("exp", x, |f, p, cc| f.exp(p, RM, cc))
    }

    pub(crate) fn sin(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.unary("sin", x, |f, p, cc| f.sin(p, RM, cc))
    }

    pub(crate) fn cos(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.unary("cos", x, |f, p, cc| f.cos(p, RM, cc))
    }

    /// ln(10), used by log10
    pub(crate) fn ln10(&self) -> Result<BigDecimal> {
        self.ln(&BigDecimal::from(10))
    }

    /// x^p for a positive base
    pub(crate) fn pow(&self, x: &BigDecimal, p: &BigDecimal) -> Result<BigDecimal> {
        let mut cc = consts("pow")?;
        let base = self.to_float(x, &mut cc);
        let exponent = self.to_float(p, &mut cc);
        let result = base.pow(&exponent, self.bits, RM, &mut cc);
        self.to_decimal(&result, "pow", &mut cc)
    }

    fn unary<F>(&self, operation: &'static str, x: &BigDecimal, f: F) -> Result<BigDecimal>
    where
        F: FnOnce(&BigFloat, usize, &mut Consts) -> BigFloat,
    {
        let mut cc = consts(operation)?;
        let input = self.to_float(x, &mut cc);
        let result = f(&input, self.bits, &mut cc);
        self.to_decimal(&result, operation, &mut cc)
    }

    fn to_float(&self, x: &BigDecimal, cc: &mut Consts) -> BigFloat {
        // value = mantissa * 10^-scale, rendered without a decimal point
        let (mantissa, scale) = x.as_bigint_and_exponent();
        let text = format!("{}e{}", mantissa, -scale);
        BigFloat::parse(&text, Radix::Dec, self.bits, RM, cc)
    }

    fn to_decimal(
        &self,
        f: &BigFloat,
        operation: &'static str,
        cc: &mut Consts,
    ) -> Result<BigDecimal> {
        if f.is_nan() || f.is_inf() {
            return Err(QuantityError::numeric(operation, "result is not finite"));
        }
        let text = f
            .format(Radix::Dec, RM, cc)
            .map_err(|e| QuantityError::numeric(operation, format!("{:?}", e)))?;
        let value = BigDecimal::from_str(&text)
            .map_err(|_| QuantityError::numeric(operation, format!("unparsable '{}'", text)))?;
        Ok(self.decimal.round(value))
    }
}

fn consts(operation: &'static str) -> Result<Consts> {
    Consts::new().map_err(|e| QuantityError::numeric(operation, format!("{:?}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// |actual - expected| <= 10^-places
    pub(crate) fn assert_close(actual: &BigDecimal, expected: &BigDecimal, places: i64) {
        let tolerance = BigDecimal::new(1.into(), places);
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "expected {} to be within 1e-{} of {}",
            actual,
            places,
            expected
        );
    }

    pub(crate) fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_decimal_accepts_strings_and_integers() {
        assert_eq!("10.0".to_decimal().unwrap(), dec("10"));
        assert_eq!(" 1e-3 ".to_decimal().unwrap(), dec("0.001"));
        assert_eq!(String::from("-2.5").to_decimal().unwrap(), dec("-2.5"));
        assert_eq!(42i64.to_decimal().unwrap(), dec("42"));
        assert_eq!(7u32.to_decimal().unwrap(), dec("7"));
    }

    #[test]
    fn test_to_decimal_rejects_garbage() {
        let err = "ten".to_decimal().unwrap_err();
        assert!(matches!(err, QuantityError::InvalidNumber { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        let ctx = DecimalContext::new(PrecisionConfig::default());
        let err = ctx.div(&dec("1"), &dec("0"), "div").unwrap_err();
        assert!(matches!(err, QuantityError::DivisionByZero { .. }));
    }

    #[test]
    fn test_standard_deviation_of_independent_terms() {
        let ctx = DecimalContext::new(PrecisionConfig::default());
        let sd = ctx
            .standard_deviation(&[dec("0.09"), dec("0.16")], "add")
            .unwrap();
        assert_eq!(sd, dec("0.5"));
    }

    #[test]
    fn test_standard_deviation_settles_cancellation_residue() {
        let ctx = DecimalContext::new(PrecisionConfig::default());
        // 1 + 1 - 2 with residue far below the noise floor
        let residue = dec("1e-120");
        let sd = ctx
            .standard_deviation(&[dec("1"), dec("1") + residue, dec("-2")], "div")
            .unwrap();
        assert!(sd.is_zero());
    }

    #[test]
    fn test_standard_deviation_rejects_inconsistent_covariance() {
        let ctx = DecimalContext::new(PrecisionConfig::default());
        let err = ctx
            .standard_deviation(&[dec("0.01"), dec("0.01"), dec("-0.1")], "sub")
            .unwrap_err();
        assert!(matches!(err, QuantityError::InconsistentCovariance { .. }));
    }

    #[test]
    fn test_below_resolution_scales_with_reference() {
        let ctx = DecimalContext::new(PrecisionConfig::new(10).unwrap());
        assert!(ctx.below_resolution(&dec("0"), &dec("0")));
        assert!(ctx.below_resolution(&dec("1e-11"), &dec("1.5")));
        assert!(!ctx.below_resolution(&dec("1e-9"), &dec("1.5")));
        assert!(!ctx.below_resolution(&dec("3e-7"), &dec("1.570796")));
    }

    #[test]
    fn test_rounding_keeps_configured_digits() {
        let ctx = DecimalContext::new(PrecisionConfig::new(5).unwrap());
        let third = ctx.div(&dec("1"), &dec("3"), "div").unwrap();
        assert_eq!(third, dec("0.33333"));
    }

    #[test]
    fn test_transcendental_ln_and_exp() {
        let math = Transcendental::new(PrecisionConfig::default());
        let ln_one = math.ln(&dec("1")).unwrap();
        assert_close(&ln_one, &dec("0"), 90);

        let e = math.exp(&dec("1")).unwrap();
        assert_close(&e, &dec("2.718281828459045235360287471352662497757"), 38);

        let ln_e = math.ln(&e).unwrap();
        assert_close(&ln_e, &dec("1"), 90);
    }

    #[test]
    fn test_transcendental_trig() {
        let math = Transcendental::new(PrecisionConfig::default());
        let sin0 = math.sin(&dec("0")).unwrap();
        let cos0 = math.cos(&dec("0")).unwrap();
        assert_close(&sin0, &dec("0"), 90);
        assert_close(&cos0, &dec("1"), 90);
    }

    #[test]
    fn test_transcendental_pow() {
        let math = Transcendental::new(PrecisionConfig::default());
        let eight = math.pow(&dec("2"), &dec("3")).unwrap();
        assert_close(&eight, &dec("8"), 90);

        let root = math.pow(&dec("2"), &dec("0.5")).unwrap();
        assert_close(&root, &dec("1.41421356237309504880168872420969807856967"), 40);
    }

    #[test]
    fn test_ln10() {
        let math = Transcendental::new(PrecisionConfig::default());
        let ln10 = math.ln10().unwrap();
        assert_close(&ln10, &dec("2.302585092994045684017991454684364207601"), 38);
    }
}
