// ⚙️ Precision Configuration
//
// How many significant digits every propagated value keeps, and where the
// variance noise floor sits below that.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{QuantityError, Result};

/// Working precision of `BigDecimal` division and square root
pub const MAX_DIGITS: u64 = 100;

pub const DEFAULT_DIGITS: u64 = 100;
pub const DEFAULT_GUARD_DIGITS: u64 = 4;

pub const ENV_DIGITS: &str = "UDECIMAL_PRECISION";
pub const ENV_GUARD_DIGITS: &str = "UDECIMAL_GUARD_DIGITS";

// ============================================================================
// PRECISION CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionConfig {
    /// Significant decimal digits kept by every result
    pub digits: u64,

    /// A combined variance smaller than 10^-(digits - guard_digits) times the
    /// sum of its terms' magnitudes is rounding residue and settles to zero
    pub guard_digits: u64,
}

impl PrecisionConfig {
    pub fn new(digits: u64) -> Result<Self> {
        let config = PrecisionConfig {
            digits,
            guard_digits: DEFAULT_GUARD_DIGITS.min(digits.saturating_sub(1)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder: override guard digits
    pub fn with_guard_digits(mut self, guard_digits: u64) -> Result<Self> {
        self.guard_digits = guard_digits;
        self.validate()?;
        Ok(self)
    }

    /// Read `UDECIMAL_PRECISION` / `UDECIMAL_GUARD_DIGITS`, defaulting when unset
    pub fn from_env() -> Result<Self> {
        let digits = read_env(ENV_DIGITS)?.unwrap_or(DEFAULT_DIGITS);
        let config = PrecisionConfig::new(digits)?;
        match read_env(ENV_GUARD_DIGITS)? {
            Some(guard) => config.with_guard_digits(guard),
            None => Ok(config),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.digits == 0 || self.digits > MAX_DIGITS {
            return Err(QuantityError::InvalidConfig {
                field: "digits".to_string(),
                message: format!("must be between 1 and {}, got {}", MAX_DIGITS, self.digits),
            });
        }
        if self.guard_digits >= self.digits {
            return Err(QuantityError::InvalidConfig {
                field: "guard_digits".to_string(),
                message: format!(
                    "must be smaller than digits ({}), got {}",
                    self.digits, self.guard_digits
                ),
            });
        }
        Ok(())
    }

    /// Binary precision for the transcendental backend
    pub fn binary_bits(&self) -> usize {
        // log2(10) ~= 3.3220, plus a word of guard bits
        (self.digits as usize * 33220).div_ceil(10000) + 64
    }

    /// Exponent of the variance noise floor
    pub fn noise_floor_exponent(&self) -> u64 {
        self.digits.saturating_sub(self.guard_digits)
    }
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        PrecisionConfig {
            digits: DEFAULT_DIGITS,
            guard_digits: DEFAULT_GUARD_DIGITS,
        }
    }
}

fn read_env(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| QuantityError::InvalidConfig {
                field: name.to_string(),
                message: format!("'{}' is not a non-negative integer", raw),
            }),
        Err(_) => Ok(None),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrecisionConfig::default();
        assert_eq!(config.digits, 100);
        assert_eq!(config.guard_digits, 4);
        assert!(config.validate().is_ok());
        assert_eq!(config.noise_floor_exponent(), 96);
    }

    #[test]
    fn test_rejects_out_of_range_digits() {
        assert!(PrecisionConfig::new(0).is_err());
        assert!(PrecisionConfig::new(101).is_err());
        assert!(PrecisionConfig::new(50).is_ok());
    }

    #[test]
    fn test_guard_digits_must_stay_below_digits() {
        let config = PrecisionConfig::new(10).unwrap();
        assert!(config.with_guard_digits(10).is_err());
        assert!(config.with_guard_digits(9).is_ok());

        // Tiny precisions shrink the default guard instead of failing
        let tiny = PrecisionConfig::new(1).unwrap();
        assert_eq!(tiny.guard_digits, 0);
    }

    #[test]
    fn test_binary_bits_cover_decimal_digits() {
        let config = PrecisionConfig::default();
        // 100 decimal digits need ~333 bits
        assert!(config.binary_bits() >= 333 + 64);
    }

    #[test]
    fn test_noise_floor_exponent_never_underflows() {
        let inverted = PrecisionConfig {
            digits: 2,
            guard_digits: 4,
        };
        assert!(inverted.validate().is_err());
        assert_eq!(inverted.noise_floor_exponent(), 0);
    }

    #[test]
    fn test_config_serializes() {
        let config = PrecisionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"digits":100,"guard_digits":4}"#);

        let back: PrecisionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
