//! Cooldown and resource ledger.
//!
//! This module provides:
//! - Per-skill cooldown-ready timestamps
//! - HP/MP pools with clamping
//! - The single basic-attack swing timer

use emberfall_common::SkillId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CombatError, CombatResult};
use crate::skills::Skill;

// ============================================================================
// Resource Pool
// ============================================================================

/// Current and maximum HP/MP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    hp: u32,
    max_hp: u32,
    mp: u32,
    max_mp: u32,
}

impl ResourcePool {
    /// Create a full pool.
    #[must_use]
    pub const fn full(max_hp: u32, max_mp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            mp: max_mp,
            max_mp,
        }
    }

    /// Current HP.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Maximum HP.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Current MP.
    #[must_use]
    pub const fn mp(&self) -> u32 {
        self.mp
    }

    /// Maximum MP.
    #[must_use]
    pub const fn max_mp(&self) -> u32 {
        self.max_mp
    }

    /// Check if HP is depleted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.hp == 0
    }

    /// Set HP directly, clamped to `[0, max_hp]`.
    pub fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.max_hp);
    }

    /// Set MP directly, clamped to `[0, max_mp]`.
    pub fn set_mp(&mut self, mp: u32) {
        self.mp = mp.min(self.max_mp);
    }

    /// Update maxima (gear or level changed), clamping current values.
    pub fn set_max(&mut self, max_hp: u32, max_mp: u32) {
        self.max_hp = max_hp;
        self.max_mp = max_mp;
        self.hp = self.hp.min(max_hp);
        self.mp = self.mp.min(max_mp);
    }

    /// Restore HP, returning the amount actually restored.
    pub fn restore_hp(&mut self, amount: u32) -> u32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self.hp - before
    }

    /// Restore MP, returning the amount actually restored.
    pub fn restore_mp(&mut self, amount: u32) -> u32 {
        let before = self.mp;
        self.mp = self.mp.saturating_add(amount).min(self.max_mp);
        self.mp - before
    }

    /// Remove HP, returning the amount actually removed.
    pub fn take_hp(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.hp);
        self.hp -= removed;
        removed
    }

    /// Spend MP if enough is available. Leaves MP untouched on failure.
    pub fn spend_mp(&mut self, amount: u32) -> CombatResult<()> {
        if self.mp < amount {
            return Err(CombatError::InsufficientResource {
                needed: amount,
                available: self.mp,
            });
        }
        self.mp -= amount;
        Ok(())
    }
}

// ============================================================================
// Skill Cooldowns
// ============================================================================

/// Skill ID to cooldown-ready timestamp.
///
/// Entries are created on first use and only ever overwritten; the ready
/// timestamp for a skill never moves backward except through `reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCooldowns {
    ready_at: HashMap<SkillId, u64>,
}

impl SkillCooldowns {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the skill has no unexpired cooldown.
    #[must_use]
    pub fn can_use_skill(&self, skill: SkillId, now_ms: u64) -> bool {
        self.ready_at.get(&skill).map_or(true, |&ready| now_ms >= ready)
    }

    /// Milliseconds until the skill is ready (0 when ready).
    #[must_use]
    pub fn remaining_ms(&self, skill: SkillId, now_ms: u64) -> u64 {
        self.ready_at
            .get(&skill)
            .map_or(0, |&ready| ready.saturating_sub(now_ms))
    }

    /// Cooldown-ready timestamp, if the skill has been used.
    #[must_use]
    pub fn ready_at(&self, skill: SkillId) -> Option<u64> {
        self.ready_at.get(&skill).copied()
    }

    /// Validate and commit a skill use.
    ///
    /// Checks the cooldown first, then MP. On success MP is deducted and the
    /// cooldown written; on failure neither changes.
    pub fn use_skill(&mut self, skill: &Skill, pool: &mut ResourcePool, now_ms: u64) -> CombatResult<()> {
        let remaining_ms = self.remaining_ms(skill.id, now_ms);
        if remaining_ms > 0 {
            return Err(CombatError::OnCooldown { remaining_ms });
        }
        pool.spend_mp(skill.mp_cost)?;

        let ready = now_ms.saturating_add(skill.cooldown_ms);
        let entry = self.ready_at.entry(skill.id).or_insert(ready);
        debug_assert!(ready >= *entry, "cooldown timestamp moved backward");
        *entry = ready;
        Ok(())
    }

    /// Clear one skill's cooldown.
    pub fn reset(&mut self, skill: SkillId) {
        self.ready_at.remove(&skill);
    }

    /// Clear every cooldown.
    pub fn reset_all(&mut self) {
        self.ready_at.clear();
    }
}

// ============================================================================
// Swing Timer
// ============================================================================

/// Phase of the basic-attack swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingPhase {
    /// Ready to swing.
    Idle,
    /// Visible swing; hits register.
    Attacking,
    /// Dead recovery time; cannot cancel or restart.
    Recovering,
}

/// Timer for the single in-flight weapon swing.
///
/// The first half of the cooldown is the visible swing, the second half is
/// non-cancelable recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingTimer {
    remaining_ms: u64,
    total_ms: u64,
}

impl SwingTimer {
    /// Create an idle timer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining_ms: 0,
            total_ms: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SwingPhase {
        if self.remaining_ms == 0 {
            SwingPhase::Idle
        } else if self.remaining_ms * 2 > self.total_ms {
            SwingPhase::Attacking
        } else {
            SwingPhase::Recovering
        }
    }

    /// True while the visible swing window is open.
    #[must_use]
    pub const fn is_swinging(&self) -> bool {
        matches!(self.phase(), SwingPhase::Attacking)
    }

    /// Milliseconds until another swing may start.
    #[must_use]
    pub const fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Start a swing lasting `cooldown_ms`.
    pub fn start(&mut self, cooldown_ms: u64) -> CombatResult<()> {
        match self.phase() {
            SwingPhase::Attacking => Err(CombatError::AlreadyInState),
            SwingPhase::Recovering => Err(CombatError::OnCooldown {
                remaining_ms: self.remaining_ms,
            }),
            SwingPhase::Idle => {
                self.total_ms = cooldown_ms.max(1);
                self.remaining_ms = self.total_ms;
                Ok(())
            },
        }
    }

    /// Advance by `dt_ms`.
    pub fn advance(&mut self, dt_ms: u64) {
        self.remaining_ms = self.remaining_ms.saturating_sub(dt_ms);
    }
}
