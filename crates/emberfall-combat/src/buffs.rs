//! Timed buffs and consumables.
//!
//! Buffs are fractional attack/defense bonuses with an absolute expiry
//! timestamp. A new buff of the same kind replaces the old one; nothing
//! stacks. Expired buffs are pruned lazily whenever bonuses are queried.

use serde::{Deserialize, Serialize};

// ============================================================================
// Buff Kinds
// ============================================================================

/// What a buff amplifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuffKind {
    /// Multiplies total attack by `1 + magnitude`.
    Attack,
    /// Multiplies total defense by `1 + magnitude`.
    Defense,
}

/// A timed, replaceable percentage bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedBuff {
    /// Bonus kind
    pub kind: BuffKind,
    /// Fractional bonus (0.1 = +10%)
    pub magnitude: f32,
    /// Clock time (ms) at which the buff stops applying
    pub expires_at_ms: u64,
}

impl TimedBuff {
    /// Create a buff lasting `duration_ms` from `now_ms`.
    #[must_use]
    pub fn new(kind: BuffKind, magnitude: f32, now_ms: u64, duration_ms: u64) -> Self {
        Self {
            kind,
            magnitude,
            expires_at_ms: now_ms.saturating_add(duration_ms),
        }
    }

    /// Check if the buff has expired at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Milliseconds left before expiry.
    #[must_use]
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at_ms.saturating_sub(now_ms)
    }
}

/// Summed buff bonuses at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffBonuses {
    /// Attack bonus fraction
    pub attack: f32,
    /// Defense bonus fraction
    pub defense: f32,
}

// ============================================================================
// Buff Set
// ============================================================================

/// The player's active buffs, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffSet {
    attack: Option<TimedBuff>,
    defense: Option<TimedBuff>,
}

impl BuffSet {
    /// Create an empty buff set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: BuffKind) -> &mut Option<TimedBuff> {
        match kind {
            BuffKind::Attack => &mut self.attack,
            BuffKind::Defense => &mut self.defense,
        }
    }

    /// Apply a buff, returning the one it replaced.
    pub fn apply(&mut self, buff: TimedBuff) -> Option<TimedBuff> {
        self.slot_mut(buff.kind).replace(buff)
    }

    /// Remove a buff early.
    pub fn remove(&mut self, kind: BuffKind) -> Option<TimedBuff> {
        self.slot_mut(kind).take()
    }

    /// Remove every buff.
    pub fn clear(&mut self) {
        self.attack = None;
        self.defense = None;
    }

    /// Drop expired buffs and return them.
    pub fn prune_expired(&mut self, now_ms: u64) -> Vec<TimedBuff> {
        let mut expired = Vec::new();
        for slot in [&mut self.attack, &mut self.defense] {
            if slot.is_some_and(|b| b.is_expired(now_ms)) {
                expired.extend(slot.take());
            }
        }
        expired
    }

    /// Current bonuses, pruning anything expired first.
    pub fn active_bonuses(&mut self, now_ms: u64) -> BuffBonuses {
        self.prune_expired(now_ms);
        BuffBonuses {
            attack: self.attack.map_or(0.0, |b| b.magnitude),
            defense: self.defense.map_or(0.0, |b| b.magnitude),
        }
    }

    /// Active buff of a kind, if any. Does not prune.
    #[must_use]
    pub fn get(&self, kind: BuffKind) -> Option<&TimedBuff> {
        match kind {
            BuffKind::Attack => self.attack.as_ref(),
            BuffKind::Defense => self.defense.as_ref(),
        }
    }

    /// Iterate held buffs (may include ones not yet pruned).
    pub fn iter(&self) -> impl Iterator<Item = &TimedBuff> {
        self.attack.iter().chain(self.defense.iter())
    }
}

// ============================================================================
// Consumables
// ============================================================================

/// Effect of using a consumable item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ConsumableEffect {
    /// Restore a flat amount of HP.
    RestoreHp {
        /// HP restored
        amount: u32,
    },
    /// Restore a flat amount of MP.
    RestoreMp {
        /// MP restored
        amount: u32,
    },
    /// Grant a timed buff.
    Buff {
        /// Buff kind
        kind: BuffKind,
        /// Fractional bonus
        magnitude: f32,
        /// Duration in milliseconds
        duration_ms: u64,
    },
}

impl ConsumableEffect {
    /// Red potion.
    pub const RED_POTION: Self = Self::RestoreHp { amount: 50 };
    /// Blue potion.
    pub const BLUE_POTION: Self = Self::RestoreMp { amount: 100 };
    /// Warrior elixir: +10% attack for 3 minutes.
    pub const WARRIOR_ELIXIR: Self = Self::Buff {
        kind: BuffKind::Attack,
        magnitude: 0.1,
        duration_ms: 180_000,
    };
    /// Guard elixir: +15% defense for 3 minutes.
    pub const GUARD_ELIXIR: Self = Self::Buff {
        kind: BuffKind::Defense,
        magnitude: 0.15,
        duration_ms: 180_000,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_replaces() {
        let mut buffs = BuffSet::new();
        buffs.apply(TimedBuff::new(BuffKind::Attack, 0.1, 0, 1_000));
        let replaced = buffs.apply(TimedBuff::new(BuffKind::Attack, 0.3, 0, 1_000));

        assert_eq!(replaced.map(|b| b.magnitude), Some(0.1));
        assert!((buffs.active_bonuses(10).attack - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut buffs = BuffSet::new();
        buffs.apply(TimedBuff::new(BuffKind::Attack, 0.1, 0, 1_000));
        buffs.apply(TimedBuff::new(BuffKind::Defense, 0.2, 0, 1_000));

        let bonuses = buffs.active_bonuses(0);
        assert!((bonuses.attack - 0.1).abs() < f32::EPSILON);
        assert!((bonuses.defense - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_expired_pruned_on_query() {
        let mut buffs = BuffSet::new();
        buffs.apply(TimedBuff::new(BuffKind::Attack, 0.1, 0, 1_000));
        buffs.apply(TimedBuff::new(BuffKind::Defense, 0.2, 0, 5_000));

        let bonuses = buffs.active_bonuses(1_000);
        assert_eq!(bonuses.attack, 0.0);
        assert!(buffs.get(BuffKind::Attack).is_none());
        assert!(buffs.get(BuffKind::Defense).is_some());
    }

    #[test]
    fn test_prune_reports_expired() {
        let mut buffs = BuffSet::new();
        buffs.apply(TimedBuff::new(BuffKind::Attack, 0.1, 0, 100));

        assert!(buffs.prune_expired(99).is_empty());
        let expired = buffs.prune_expired(100);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].kind, BuffKind::Attack);
    }

    #[test]
    fn test_clear() {
        let mut buffs = BuffSet::new();
        buffs.apply(TimedBuff::new(BuffKind::Attack, 0.1, 0, 100));
        buffs.clear();
        assert_eq!(buffs.iter().count(), 0);
    }
}
