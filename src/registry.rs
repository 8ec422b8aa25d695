// 🗂️ Registry - slot table of live quantities
//
// Every quantity lives in one slot of an arena. A handle carries the slot
// index plus the slot's generation at insertion time; releasing a quantity
// frees the slot and bumps the generation, so old handles resolve to
// "absent" and never to whatever moves in next.
//
// One RwLock guards the whole arena (slots + covariance store), so
// registration, covariance writes and contributor-closure sums all observe
// the same set of live identities.

use bigdecimal::BigDecimal;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PrecisionConfig;
use crate::covariance::CovarianceStore;
use crate::error::{QuantityError, Result};
use crate::numeric::{DecimalContext, ToDecimal, Transcendental};
use crate::quantity::{Measurement, Operation, Origin, Quantity, QuantityId};

// ============================================================================
// ARENA
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) measurement: Measurement,
    pub(crate) contributors: BTreeSet<QuantityId>,
    pub(crate) origin: Origin,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Slots, free list and covariance store
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    pub(crate) covariances: CovarianceStore,
}

impl Arena {
    /// Store a new entry; `include_self` adds the new identity to its own
    /// contributor set
    fn insert(
        &mut self,
        measurement: Measurement,
        mut contributors: BTreeSet<QuantityId>,
        include_self: bool,
        origin: Origin,
    ) -> QuantityId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = QuantityId {
            index,
            generation: slot.generation,
        };
        if include_self {
            contributors.insert(id);
        }
        slot.entry = Some(Entry {
            measurement,
            contributors,
            origin,
        });
        self.live += 1;
        id
    }

    pub(crate) fn get(&self, id: QuantityId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn release(&mut self, id: QuantityId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.entry.is_none() {
            return false;
        }
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        self.covariances.forget(id);
        true
    }

    /// Sum of cov(u, v) over u in `xs`, v in `ys`, live identities only
    pub(crate) fn closure_covariance(
        &self,
        xs: &BTreeSet<QuantityId>,
        ys: &BTreeSet<QuantityId>,
    ) -> BigDecimal {
        let mut sum = BigDecimal::from(0);
        for u in xs.iter().filter(|u| self.get(**u).is_some()) {
            for v in ys.iter().filter(|v| self.get(**v).is_some()) {
                if let Some(cov) = self.covariances.get(*u, *v) {
                    sum += cov;
                }
            }
        }
        sum
    }
}

// ============================================================================
// OPERAND SNAPSHOT
// ============================================================================

/// Copy of one operand taken under the read lock
#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub(crate) quantity: Quantity,
    pub(crate) value: BigDecimal,
    pub(crate) uncertainty: BigDecimal,
    pub(crate) contributors: BTreeSet<QuantityId>,
}

impl Operand {
    pub(crate) fn variance(&self) -> BigDecimal {
        &self.uncertainty * &self.uncertainty
    }
}

/// How a derived quantity gets its contributor set
pub(crate) enum Lineage<'a> {
    /// Own identity plus both operands' sets
    Merge(&'a Operand, &'a Operand),
    /// Exact copy of the operand's set
    Inherit(&'a Operand),
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Owner of every quantity and of the covariance relation between them
///
/// Cloning a registry is cheap and yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct Registry {
    id: Uuid,
    config: PrecisionConfig,
    arena: Arc<RwLock<Arena>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Create an empty registry with the default precision
    pub fn new() -> Self {
        Self::build(PrecisionConfig::default())
    }

    /// Create an empty registry; fails if `config` does not validate
    pub fn with_config(config: PrecisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PrecisionConfig) -> Self {
        Registry {
            id: Uuid::new_v4(),
            config,
            arena: Arc::new(RwLock::new(Arena::default())),
        }
    }

    /// Process-wide registry, configured from the environment on first use
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(|| {
            let config = PrecisionConfig::from_env().unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default precision");
                PrecisionConfig::default()
            });
            Registry::build(config)
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PrecisionConfig {
        &self.config
    }

    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Register a measured quantity `value ± uncertainty`
    pub fn quantity(&self, value: impl ToDecimal, uncertainty: impl ToDecimal) -> Result<Quantity> {
        let value = value.to_decimal()?;
        let uncertainty = uncertainty.to_decimal()?;
        let measurement = Measurement::new(value, uncertainty)?;
        Ok(self.insert_root(measurement))
    }

    /// Register a measured quantity with zero uncertainty
    pub fn exact(&self, value: impl ToDecimal) -> Result<Quantity> {
        let value = value.to_decimal()?;
        Ok(self.insert_root(Measurement::exact(value)))
    }

    fn insert_root(&self, measurement: Measurement) -> Quantity {
        // Inputs are kept exactly as given; only results get rounded
        let id = self
            .write()
            .insert(measurement, BTreeSet::new(), true, Origin::Measured);
        debug!(quantity = %id, "registered measured quantity");
        self.handle(id)
    }

    // ========================================================================
    // LOOKUP / RELEASE
    // ========================================================================

    /// Live snapshot, or None once released (or if foreign)
    pub fn lookup(&self, quantity: Quantity) -> Option<Measurement> {
        if quantity.registry != self.id {
            return None;
        }
        self.read()
            .get(quantity.id)
            .map(|entry| entry.measurement.clone())
    }

    /// Live snapshot, failing for released or foreign handles
    pub fn measurement(&self, quantity: Quantity) -> Result<Measurement> {
        self.with_entry(quantity, |entry| entry.measurement.clone())
    }

    pub fn value(&self, quantity: Quantity) -> Result<BigDecimal> {
        self.with_entry(quantity, |entry| entry.measurement.value.clone())
    }

    pub fn uncertainty(&self, quantity: Quantity) -> Result<BigDecimal> {
        self.with_entry(quantity, |entry| entry.measurement.uncertainty.clone())
    }

    /// Identities whose variability feeds this quantity
    pub fn contributors(&self, quantity: Quantity) -> Result<BTreeSet<QuantityId>> {
        self.with_entry(quantity, |entry| entry.contributors.clone())
    }

    pub fn origin(&self, quantity: Quantity) -> Result<Origin> {
        self.with_entry(quantity, |entry| entry.origin)
    }

    pub fn is_live(&self, quantity: Quantity) -> bool {
        self.lookup(quantity).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.read().live
    }

    /// Free the quantity's slot. Returns false if it was already gone.
    ///
    /// Derived quantities keep the released identity in their contributor
    /// sets; it simply stops contributing covariance.
    pub fn release(&self, quantity: Quantity) -> bool {
        if quantity.registry != self.id {
            return false;
        }
        let released = self.write().release(quantity.id);
        if released {
            debug!(quantity = %quantity.id, "released quantity");
        }
        released
    }

    // ========================================================================
    // COMPARISON
    // ========================================================================

    /// Value and uncertainty both equal
    pub fn equals(&self, a: Quantity, b: Quantity) -> Result<bool> {
        Ok(self.measurement(a)? == self.measurement(b)?)
    }

    /// Order by value only
    pub fn cmp_value(&self, a: Quantity, b: Quantity) -> Result<std::cmp::Ordering> {
        Ok(self.measurement(a)?.cmp_value(&self.measurement(b)?))
    }

    // ========================================================================
    // INTERNALS SHARED WITH THE PROPAGATION ENGINE
    // ========================================================================

    pub(crate) fn decimal(&self) -> DecimalContext {
        DecimalContext::new(self.config)
    }

    pub(crate) fn math(&self) -> Transcendental {
        Transcendental::new(self.config)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn handle(&self, id: QuantityId) -> Quantity {
        Quantity {
            registry: self.id,
            id,
        }
    }

    /// Check that a handle is ours and live
    pub(crate) fn resolve<'a>(&self, arena: &'a Arena, quantity: Quantity) -> Result<&'a Entry> {
        if quantity.registry != self.id {
            return Err(QuantityError::ForeignQuantity { quantity });
        }
        arena
            .get(quantity.id)
            .ok_or(QuantityError::Released { quantity })
    }

    fn with_entry<T>(&self, quantity: Quantity, f: impl FnOnce(&Entry) -> T) -> Result<T> {
        let arena = self.read();
        self.resolve(&arena, quantity).map(f)
    }

    pub(crate) fn operand_in(&self, arena: &Arena, quantity: Quantity) -> Result<Operand> {
        let entry = self.resolve(arena, quantity)?;
        Ok(Operand {
            quantity,
            value: entry.measurement.value.clone(),
            uncertainty: entry.measurement.uncertainty.clone(),
            contributors: entry.contributors.clone(),
        })
    }

    pub(crate) fn operand(&self, quantity: Quantity) -> Result<Operand> {
        let arena = self.read();
        self.operand_in(&arena, quantity)
    }

    /// Insert an operation's result
    pub(crate) fn derive(
        &self,
        operation: Operation,
        value: BigDecimal,
        uncertainty: BigDecimal,
        lineage: Lineage<'_>,
    ) -> Quantity {
        debug_assert_eq!(
            operation.merges_contributors(),
            matches!(lineage, Lineage::Merge(..))
        );
        let (contributors, include_self, inputs) = match lineage {
            Lineage::Merge(x, y) => (
                x.contributors.union(&y.contributors).copied().collect(),
                true,
                format!("{}, {}", x.quantity.id, y.quantity.id),
            ),
            Lineage::Inherit(x) => (x.contributors.clone(), false, x.quantity.id.to_string()),
        };
        let measurement = Measurement { value, uncertainty };
        let id = self.write().insert(
            measurement.clone(),
            contributors,
            include_self,
            Origin::Derived(operation),
        );
        debug!(
            operation = operation.as_str(),
            inputs = %inputs,
            quantity = %id,
            result = %measurement,
            "propagated"
        );
        self.handle(id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
