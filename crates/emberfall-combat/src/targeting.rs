//! Targeting geometry.
//!
//! Cone selection for directional attacks and radius selection for AoE
//! skills and aggro checks. Angles compare by shortest angular distance so
//! aim directions either side of the +/-PI seam behave the same.

use emberfall_common::{heading_to, shortest_angle, EntityId, Vec2};
use serde::{Deserialize, Serialize};

use crate::skills::Skill;
use crate::stats::WeaponStyle;

/// Anything a player attack can select.
pub trait Targetable {
    /// Entity ID.
    fn target_id(&self) -> EntityId;
    /// World position.
    fn position(&self) -> Vec2;
    /// False while dead or otherwise untargetable.
    fn is_targetable(&self) -> bool;
}

/// A directional hit area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeSpec {
    /// Reach in world units.
    pub range: f32,
    /// Half-angle in radians.
    pub half_angle: f32,
}

/// Hit-area presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Melee basic-attack reach.
    pub melee_range: f32,
    /// Melee basic-attack half-angle (also used by non-projectile skills).
    pub melee_half_angle: f32,
    /// Ranged basic-attack reach.
    pub ranged_range: f32,
    /// Ranged basic-attack half-angle.
    pub ranged_half_angle: f32,
    /// Projectile skill half-angle.
    pub projectile_half_angle: f32,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            melee_range: 70.0,
            melee_half_angle: 0.8,
            ranged_range: 250.0,
            ranged_half_angle: 0.4,
            projectile_half_angle: 0.7,
        }
    }
}

impl TargetingConfig {
    /// Cone for a basic attack with the given weapon style.
    #[must_use]
    pub fn basic_attack_cone(&self, style: WeaponStyle) -> ConeSpec {
        match style {
            WeaponStyle::Melee => ConeSpec {
                range: self.melee_range,
                half_angle: self.melee_half_angle,
            },
            WeaponStyle::Ranged => ConeSpec {
                range: self.ranged_range,
                half_angle: self.ranged_half_angle,
            },
        }
    }

    /// Cone for a directional skill.
    #[must_use]
    pub fn skill_cone(&self, skill: &Skill) -> ConeSpec {
        let half_angle = if skill.projectile {
            self.projectile_half_angle
        } else {
            self.melee_half_angle
        };
        ConeSpec {
            range: skill.range,
            half_angle,
        }
    }
}

/// Targetable candidates within `range` whose bearing is strictly inside
/// `half_angle` of `aim`.
///
/// A candidate standing exactly on `origin` has no bearing and is always
/// inside the cone.
pub fn entities_in_cone<'a, T: Targetable>(
    origin: Vec2,
    aim: f32,
    cone: ConeSpec,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Vec<&'a T>
where
    T: 'a,
{
    candidates
        .into_iter()
        .filter(|c| c.is_targetable())
        .filter(|c| {
            let pos = c.position();
            let distance = origin.distance(pos);
            if distance > cone.range {
                return false;
            }
            distance <= f32::EPSILON
                || shortest_angle(heading_to(origin, pos), aim) < cone.half_angle
        })
        .collect()
}

/// Targetable candidates within `radius` of `center`.
pub fn entities_in_radius<'a, T: Targetable>(
    center: Vec2,
    radius: f32,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Vec<&'a T>
where
    T: 'a,
{
    candidates
        .into_iter()
        .filter(|c| c.is_targetable() && center.distance(c.position()) <= radius)
        .collect()
}

/// Closest candidate to `origin`; ties go to the lower entity ID.
pub fn nearest<'a, T: Targetable>(
    origin: Vec2,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Option<&'a T>
where
    T: 'a,
{
    candidates.into_iter().min_by(|a, b| {
        origin
            .distance_squared(a.position())
            .total_cmp(&origin.distance_squared(b.position()))
            .then_with(|| a.target_id().cmp(&b.target_id()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[derive(Debug)]
    struct Dummy {
        id: u64,
        pos: Vec2,
        alive: bool,
    }

    impl Targetable for Dummy {
        fn target_id(&self) -> EntityId {
            EntityId::from_raw(self.id)
        }
        fn position(&self) -> Vec2 {
            self.pos
        }
        fn is_targetable(&self) -> bool {
            self.alive
        }
    }

    fn dummy(id: u64, x: f32, y: f32) -> Dummy {
        Dummy {
            id,
            pos: Vec2::new(x, y),
            alive: true,
        }
    }

    fn ids(hits: &[&Dummy]) -> Vec<u64> {
        hits.iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_cone_boundary_is_exclusive() {
        let cone = ConeSpec {
            range: 100.0,
            half_angle: FRAC_PI_2,
        };
        let on_edge = dummy(1, 0.0, 50.0);
        let inside = dummy(2, 1e-3, 50.0);

        let hits = entities_in_cone(Vec2::ZERO, 0.0, cone, [&on_edge, &inside]);
        assert_eq!(ids(&hits), vec![2]);
    }

    #[test]
    fn test_cone_across_seam() {
        let cone = ConeSpec {
            range: 100.0,
            half_angle: 0.4,
        };
        // Aiming almost due west; target slightly below the negative X axis.
        let target = dummy(1, -50.0, -5.0);
        let hits = entities_in_cone(Vec2::ZERO, PI - 0.05, cone, [&target]);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_cone_range_and_dead_filtered() {
        let cone = TargetingConfig::default().basic_attack_cone(WeaponStyle::Melee);
        let near = dummy(1, 60.0, 0.0);
        let far = dummy(2, 71.0, 0.0);
        let mut dead = dummy(3, 30.0, 0.0);
        dead.alive = false;

        let hits = entities_in_cone(Vec2::ZERO, 0.0, cone, [&near, &far, &dead]);
        assert_eq!(ids(&hits), vec![1]);
    }

    #[test]
    fn test_point_blank_included() {
        let cone = ConeSpec {
            range: 10.0,
            half_angle: 0.1,
        };
        let stacked = dummy(1, 0.0, 0.0);
        assert_eq!(entities_in_cone(Vec2::ZERO, PI, cone, [&stacked]).len(), 1);
    }

    #[test]
    fn test_radius_selection() {
        let a = dummy(1, 100.0, 0.0);
        let b = dummy(2, 0.0, -100.1);
        let hits = entities_in_radius(Vec2::ZERO, 100.0, [&a, &b]);
        assert_eq!(ids(&hits), vec![1]);
    }

    #[test]
    fn test_nearest_tie_breaks_on_id() {
        let a = dummy(5, 10.0, 0.0);
        let b = dummy(2, -10.0, 0.0);
        let c = dummy(9, 30.0, 0.0);
        let pick = nearest(Vec2::ZERO, [&a, &b, &c]);
        assert_eq!(pick.map(|d| d.id), Some(2));
    }

    #[test]
    fn test_presets() {
        let config = TargetingConfig::default();
        let ranged = config.basic_attack_cone(WeaponStyle::Ranged);
        assert_eq!(ranged.range, 250.0);
        assert_eq!(ranged.half_angle, 0.4);

        let skill = Skill::new(emberfall_common::SkillId::new(1), "Arrow")
            .with_range(300.0)
            .as_projectile();
        assert_eq!(config.skill_cone(&skill).half_angle, 0.7);
    }

    proptest! {
        #[test]
        fn prop_radius_hits_are_within_radius(
            points in proptest::collection::vec((-200.0f32..200.0, -200.0f32..200.0), 0..20),
            radius in 0.0f32..250.0,
        ) {
            let dummies: Vec<Dummy> = points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| dummy(i as u64 + 1, x, y))
                .collect();
            for hit in entities_in_radius(Vec2::ZERO, radius, &dummies) {
                prop_assert!(hit.pos.length() <= radius + 1e-3);
            }
        }
    }
}
