//! # Emberfall Common
//!
//! Common types shared by the Emberfall combat core and its harnesses:
//! - ID types (`EntityId`, `SkillId`)
//! - Position and angle helpers over `glam::Vec2`
//! - Data-file and top-level error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use glam::Vec2;
pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_validity() {
        assert!(!EntityId::NULL.is_valid());
        assert!(EntityId::from_raw(7).is_valid());
        assert_eq!(EntityId::from_raw(7).raw(), 7);
    }

    #[test]
    fn test_skill_id_roundtrip() {
        let id = SkillId::new(1001);
        assert_eq!(id.raw(), 1001);
        assert_eq!(id.to_string(), "skill#1001");
    }

    #[test]
    fn test_data_error_wraps_into_top_level() {
        let err: EmberfallError = DataFileError::Validation("bad".into()).into();
        assert!(err.to_string().contains("bad"));
    }
}
