// 🔗 Covariance Store - one entry per unordered pair
//
// cov(a, b) is stored once under the canonical key (min, max), so the two
// directions can never disagree. A missing pair means covariance 0
// (independent by convention, not by proof). Covariance is only ever
// declared by the caller; it is never inferred from shared history.

use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;
use tracing::trace;

use crate::error::{QuantityError, Result};
use crate::numeric::ToDecimal;
use crate::quantity::{Quantity, QuantityId};
use crate::registry::Registry;

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct CovarianceStore {
    pairs: HashMap<(QuantityId, QuantityId), BigDecimal>,
}

fn canonical(a: QuantityId, b: QuantityId) -> (QuantityId, QuantityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl CovarianceStore {
    pub(crate) fn set(&mut self, a: QuantityId, b: QuantityId, covariance: BigDecimal) {
        self.pairs.insert(canonical(a, b), covariance);
    }

    pub(crate) fn get(&self, a: QuantityId, b: QuantityId) -> Option<&BigDecimal> {
        self.pairs.get(&canonical(a, b))
    }

    pub(crate) fn remove(&mut self, a: QuantityId, b: QuantityId) -> Option<BigDecimal> {
        self.pairs.remove(&canonical(a, b))
    }

    /// Drop every pair naming `id`
    pub(crate) fn forget(&mut self, id: QuantityId) {
        self.pairs.retain(|(a, b), _| *a != id && *b != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }
}

// ============================================================================
// REGISTRY API
// ============================================================================

impl Registry {
    /// Declare cov(a, b); overwrites any previous value
    pub fn set_covariance(&self, a: Quantity, b: Quantity, covariance: impl ToDecimal) -> Result<()> {
        let covariance = covariance.to_decimal()?;
        let mut arena = self.write();
        self.resolve(&arena, a)?;
        self.resolve(&arena, b)?;
        trace!(a = %a.id(), b = %b.id(), covariance = %covariance, "set covariance");
        arena.covariances.set(a.id(), b.id(), covariance);
        Ok(())
    }

    /// Stored covariance, or 0 when none was declared
    pub fn covariance(&self, a: Quantity, b: Quantity) -> Result<BigDecimal> {
        let arena = self.read();
        self.resolve(&arena, a)?;
        self.resolve(&arena, b)?;
        Ok(arena
            .covariances
            .get(a.id(), b.id())
            .cloned()
            .unwrap_or_else(BigDecimal::zero))
    }

    /// Forget cov(a, b); no-op when none was declared
    pub fn remove_covariance(&self, a: Quantity, b: Quantity) -> Result<()> {
        let mut arena = self.write();
        self.resolve(&arena, a)?;
        self.resolve(&arena, b)?;
        if arena.covariances.remove(a.id(), b.id()).is_some() {
            trace!(a = %a.id(), b = %b.id(), "removed covariance");
        }
        Ok(())
    }

    /// Declare cov(a, b) = rho·σa·σb
    pub fn set_correlation(&self, a: Quantity, b: Quantity, rho: impl ToDecimal) -> Result<()> {
        let rho = rho.to_decimal()?;
        if rho.abs() > BigDecimal::from(1) {
            return Err(QuantityError::InvalidCorrelation {
                rho: rho.to_string(),
            });
        }
        let mut arena = self.write();
        let sigma_a = self.resolve(&arena, a)?.measurement.uncertainty.clone();
        let sigma_b = self.resolve(&arena, b)?.measurement.uncertainty.clone();
        let ctx = self.decimal();
        let covariance = ctx.mul(&ctx.mul(&rho, &sigma_a), &sigma_b);
        trace!(a = %a.id(), b = %b.id(), covariance = %covariance, "set correlation");
        arena.covariances.set(a.id(), b.id(), covariance);
        Ok(())
    }

    /// cov(a, b) / (σa·σb), or None when either uncertainty is zero
    pub fn correlation(&self, a: Quantity, b: Quantity) -> Result<Option<BigDecimal>> {
        let arena = self.read();
        let sigma_a = &self.resolve(&arena, a)?.measurement.uncertainty;
        let sigma_b = &self.resolve(&arena, b)?.measurement.uncertainty;
        if sigma_a.is_zero() || sigma_b.is_zero() {
            return Ok(None);
        }
        let covariance = arena
            .covariances
            .get(a.id(), b.id())
            .cloned()
            .unwrap_or_else(BigDecimal::zero);
        let ctx = self.decimal();
        ctx.div(&covariance, &ctx.mul(sigma_a, sigma_b), "correlation")
            .map(Some)
    }

    /// Number of stored covariance pairs
    pub fn covariance_count(&self) -> usize {
        self.read().covariances.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::tests::dec;

    #[test]
    fn test_covariance_is_symmetric() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();

        registry.set_covariance(a, b, "0.05").unwrap();
        assert_eq!(registry.covariance(a, b).unwrap(), dec("0.05"));
        assert_eq!(registry.covariance(b, a).unwrap(), dec("0.05"));
        assert_eq!(registry.covariance_count(), 1);
    }

    #[test]
    fn test_set_covariance_overwrites() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();

        registry.set_covariance(a, b, "0.05").unwrap();
        registry.set_covariance(b, a, "0.01").unwrap();
        assert_eq!(registry.covariance(a, b).unwrap(), dec("0.01"));
        assert_eq!(registry.covariance_count(), 1);
    }

    #[test]
    fn test_missing_covariance_is_zero() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();
        assert!(registry.covariance(a, b).unwrap().is_zero());
    }

    #[test]
    fn test_remove_covariance() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();

        registry.set_covariance(a, b, "0.05").unwrap();
        registry.remove_covariance(b, a).unwrap();
        assert!(registry.covariance(a, b).unwrap().is_zero());

        // Removing again is a no-op
        registry.remove_covariance(a, b).unwrap();
        assert_eq!(registry.covariance_count(), 0);
    }

    #[test]
    fn test_covariance_with_released_quantity_fails_without_writing() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();
        registry.release(b);

        let err = registry.set_covariance(a, b, "0.05").unwrap_err();
        assert!(matches!(err, QuantityError::Released { .. }));
        assert_eq!(registry.covariance_count(), 0);
    }

    #[test]
    fn test_covariance_with_foreign_quantity_fails() {
        let registry = Registry::new();
        let other = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = other.quantity("2.0", "0.2").unwrap();

        let err = registry.set_covariance(a, b, "0.05").unwrap_err();
        assert!(matches!(err, QuantityError::ForeignQuantity { .. }));
        assert_eq!(registry.covariance_count(), 0);
    }

    #[test]
    fn test_release_drops_pairs() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();
        registry.set_covariance(a, b, "0.05").unwrap();

        registry.release(b);
        assert_eq!(registry.covariance_count(), 0);

        // A new quantity in b's old slot starts uncorrelated
        let c = registry.quantity("3.0", "0.3").unwrap();
        assert_eq!(c.id().index(), b.id().index());
        assert!(registry.covariance(a, c).unwrap().is_zero());
    }

    #[test]
    fn test_correlation_round_trip() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();

        registry.set_correlation(a, b, "0.5").unwrap();
        assert_eq!(registry.covariance(a, b).unwrap(), dec("0.01"));
        assert_eq!(registry.correlation(a, b).unwrap(), Some(dec("0.5")));
    }

    #[test]
    fn test_correlation_out_of_range() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.quantity("2.0", "0.2").unwrap();

        let err = registry.set_correlation(a, b, "1.5").unwrap_err();
        assert!(matches!(err, QuantityError::InvalidCorrelation { .. }));
        assert_eq!(registry.covariance_count(), 0);
    }

    #[test]
    fn test_correlation_undefined_for_exact_quantity() {
        let registry = Registry::new();
        let a = registry.quantity("1.0", "0.1").unwrap();
        let b = registry.exact("2.0").unwrap();
        assert_eq!(registry.correlation(a, b).unwrap(), None);
    }

    #[test]
    fn test_canonical_key_ordering() {
        let low = QuantityId {
            index: 1,
            generation: 0,
        };
        let high = QuantityId {
            index: 2,
            generation: 0,
        };
        assert_eq!(canonical(high, low), (low, high));
        assert_eq!(canonical(low, high), (low, high));
    }
}
