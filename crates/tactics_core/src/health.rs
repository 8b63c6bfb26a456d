//! Health state machine and the central health registry.
//!
//! States: `Alive -> Alive | Dead`. Dead is terminal except through an
//! explicit [`HealthComponent::revive`]. The death transition is guarded
//! by the `dead` flag so the death event fires exactly once no matter
//! how many further hits land.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::config::RegenerationConfig;
use crate::error::{Result, TacticsError};
use crate::events::{EventKind, EventSink, GameEvent};
use crate::math::{fixed_serde, Fixed};

/// Result of applying damage to a health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Health actually removed.
    pub applied: u32,
    /// Health left afterwards.
    pub remaining: u32,
    /// True only on the hit that brought health to zero.
    pub died: bool,
}

/// Current and maximum health of one unit.
///
/// Invariant: `current <= max`, and `dead` iff health reached zero
/// without a later revival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthComponent {
    current: u32,
    max: u32,
    dead: bool,
    last_damage_tick: Option<u64>,
    #[serde(with = "fixed_serde")]
    regen_accumulator: Fixed,
}

impl HealthComponent {
    /// Create a component at full health. A zero maximum is raised to 1.
    #[must_use]
    pub fn new(max: u32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            dead: false,
            last_damage_tick: None,
            regen_accumulator: Fixed::ZERO,
        }
    }

    /// Current health points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Maximum health points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// True once health has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// True at maximum health.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply damage, clamping at zero.
    ///
    /// Damage against a dead unit is ignored.
    pub fn take_damage(&mut self, amount: u32, tick: u64) -> DamageOutcome {
        if self.dead {
            return DamageOutcome {
                applied: 0,
                remaining: 0,
                died: false,
            };
        }

        let applied = amount.min(self.current);
        self.current -= applied;
        self.last_damage_tick = Some(tick);
        self.regen_accumulator = Fixed::ZERO;

        let died = self.current == 0;
        if died {
            self.dead = true;
        }

        DamageOutcome {
            applied,
            remaining: self.current,
            died,
        }
    }

    /// Restore health up to max, returning the amount restored. No-op when dead.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.dead {
            return 0;
        }
        let headroom = self.max - self.current;
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }

    /// Bring a dead unit back with `health` points (at least 1, at most max).
    ///
    /// Returns false if the unit was not dead.
    pub fn revive(&mut self, health: u32) -> bool {
        if !self.dead {
            return false;
        }
        self.dead = false;
        self.current = health.clamp(1, self.max);
        self.last_damage_tick = None;
        self.regen_accumulator = Fixed::ZERO;
        true
    }

    /// Advance regeneration by one tick, returning whole health points restored.
    pub fn regenerate(&mut self, config: &RegenerationConfig, tick: u64) -> u32 {
        if self.dead {
            return 0;
        }

        let cap = (u64::from(self.max) * u64::from(config.cap_percent) / 100) as u32;
        if self.current >= cap {
            self.regen_accumulator = Fixed::ZERO;
            return 0;
        }

        if let Some(last) = self.last_damage_tick {
            if tick.saturating_sub(last) < config.delay_ticks {
                return 0;
            }
        }

        self.regen_accumulator +=
            Fixed::from_num(config.per_hundred_ticks) / Fixed::from_num(100);
        let whole: u32 = self.regen_accumulator.floor().to_num();
        if whole == 0 {
            return 0;
        }
        self.regen_accumulator -= Fixed::from_num(whole);

        let gained = whole.min(cap - self.current);
        self.current += gained;
        gained
    }
}

/// Registry of health components keyed by unit id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthManager {
    components: BTreeMap<UnitId, HealthComponent>,
    regeneration: Option<RegenerationConfig>,
}

impl HealthManager {
    /// Create a registry with optional regeneration for every unit.
    #[must_use]
    pub fn new(regeneration: Option<RegenerationConfig>) -> Self {
        Self {
            components: BTreeMap::new(),
            regeneration,
        }
    }

    /// Register a unit at full health.
    ///
    /// Re-registering a known unit logs a warning and changes nothing.
    pub fn register(&mut self, unit: UnitId, max_health: u32) -> bool {
        if self.components.contains_key(&unit) {
            tracing::warn!(unit, "Unit already registered with health manager");
            return false;
        }
        self.components.insert(unit, HealthComponent::new(max_health));
        true
    }

    /// Remove a unit. Unknown units are ignored.
    pub fn unregister(&mut self, unit: UnitId) -> Option<HealthComponent> {
        let removed = self.components.remove(&unit);
        if removed.is_none() {
            tracing::debug!(unit, "Unregistering unknown unit");
        }
        removed
    }

    /// Health of a unit.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&HealthComponent> {
        self.components.get(&unit)
    }

    /// True if the unit can receive damage.
    #[must_use]
    pub fn is_registered(&self, unit: UnitId) -> bool {
        self.components.contains_key(&unit)
    }

    /// True if the unit is registered and not dead.
    #[must_use]
    pub fn is_alive(&self, unit: UnitId) -> bool {
        self.get(unit).is_some_and(|h| !h.is_dead())
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate registered units in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &HealthComponent)> {
        self.components.iter()
    }

    fn component_mut(&mut self, unit: UnitId) -> Result<&mut HealthComponent> {
        self.components
            .get_mut(&unit)
            .ok_or(TacticsError::UnknownUnit(unit))
    }

    /// Damage a unit and publish the resulting events.
    ///
    /// Publishes `UnitDamaged`, then `UnitDied` on the killing blow.
    /// Damage against an already dead unit publishes nothing.
    pub fn apply_damage(
        &mut self,
        unit: UnitId,
        amount: u32,
        source: Option<UnitId>,
        critical: bool,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<DamageOutcome> {
        let component = self.component_mut(unit)?;
        if component.is_dead() {
            return Ok(DamageOutcome::default());
        }

        let outcome = component.take_damage(amount, tick);
        tracing::debug!(
            unit,
            applied = outcome.applied,
            remaining = outcome.remaining,
            "Damage applied"
        );

        sink.publish(GameEvent::new(
            EventKind::UnitDamaged {
                unit,
                source,
                amount: outcome.applied,
                remaining: outcome.remaining,
                critical,
            },
            tick,
        ));
        if outcome.died {
            sink.publish(GameEvent::new(
                EventKind::UnitDied {
                    unit,
                    killer: source,
                },
                tick,
            ));
        }
        Ok(outcome)
    }

    /// Heal a unit, publishing `UnitHealed` when anything was restored.
    pub fn heal(
        &mut self,
        unit: UnitId,
        amount: u32,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<u32> {
        let component = self.component_mut(unit)?;
        let healed = component.heal(amount);
        if healed > 0 {
            let current = component.current();
            sink.publish(GameEvent::new(
                EventKind::UnitHealed {
                    unit,
                    amount: healed,
                    current,
                },
                tick,
            ));
        }
        Ok(healed)
    }

    /// Revive a dead unit, publishing `UnitRevived` on success.
    pub fn revive(
        &mut self,
        unit: UnitId,
        health: u32,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<bool> {
        let component = self.component_mut(unit)?;
        if !component.revive(health) {
            return Ok(false);
        }
        let health = component.current();
        sink.publish(GameEvent::new(EventKind::UnitRevived { unit, health }, tick));
        Ok(true)
    }

    /// Run one regeneration tick for every unit.
    pub fn tick_regeneration(&mut self, tick: u64, sink: &mut dyn EventSink) {
        let Some(config) = self.regeneration.as_ref() else {
            return;
        };
        for (&unit, component) in &mut self.components {
            let gained = component.regenerate(config, tick);
            if gained > 0 {
                sink.publish(GameEvent::new(
                    EventKind::UnitHealed {
                        unit,
                        amount: gained,
                        current: component.current(),
                    },
                    tick,
                ));
            }
        }
    }
}
