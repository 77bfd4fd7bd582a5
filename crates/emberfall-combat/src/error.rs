//! Combat error types.

use emberfall_common::SkillId;
use thiserror::Error;

use crate::stats::Job;

/// Reasons a combat action is rejected.
///
/// Every variant is recoverable by the caller: input handling either drops
/// the action or shows a UI cue, and may retry on a later tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    /// Skill or swing still cooling down
    #[error("on cooldown: {remaining_ms}ms remaining")]
    OnCooldown {
        /// Time remaining in milliseconds
        remaining_ms: u64,
    },
    /// Not enough MP
    #[error("insufficient resource: need {needed} MP, have {available}")]
    InsufficientResource {
        /// MP required
        needed: u32,
        /// MP available
        available: u32,
    },
    /// Target is dead or out of range
    #[error("invalid target")]
    InvalidTarget,
    /// Requested transition into the state the subsystem is already in
    #[error("already in requested state")]
    AlreadyInState,
    /// Skill ID not present in the skill book
    #[error("unknown skill: {0}")]
    UnknownSkill(SkillId),
    /// Skill requires a higher level
    #[error("{skill} unlocks at level {required}, player is level {current}")]
    SkillLocked {
        /// Skill requested
        skill: SkillId,
        /// Required level
        required: u32,
        /// Current level
        current: u32,
    },
    /// Skill is not available to the player's job
    #[error("{skill} is not usable by {job:?}")]
    JobIneligible {
        /// Skill requested
        skill: SkillId,
        /// Player job
        job: Job,
    },
    /// Player is defeated and cannot act
    #[error("player is incapacitated")]
    Incapacitated,
    /// No unspent ability points
    #[error("no ability points to spend")]
    NoStatPoints,
    /// Job advancement not allowed
    #[error("cannot advance from {from:?} to {to:?}")]
    InvalidJobAdvance {
        /// Current job
        from: Job,
        /// Requested job
        to: Job,
    },
}

/// Result type for combat operations.
pub type CombatResult<T> = Result<T, CombatError>;
