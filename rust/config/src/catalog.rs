//! Static mapping from (environment, speed variant) to framework config blocks.

use crate::{Environment, ParamError, SpeedVariant};

/// Vehicle speeds used by a speed-tuned environment variant (m/s).
///
/// These are the registered environment's own defaults, applied by the
/// simulator when the variant's config block is selected. They are listed
/// for display and are not passed on the framework command line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProfile {
    pub ego_speed: f64,
    pub other_vehicles_speed_range: (f64, f64),
    pub merging_vehicle_speed: f64,
    pub merging_vehicle_target_speed: f64,
    /// Applied to every vehicle speed at spawn time.
    pub speed_multiplier: f64,
    /// Speed range mapped onto the high-speed reward term.
    pub reward_speed_range: (f64, f64),
}

impl SpeedProfile {
    /// Speeds as actually spawned, i.e. with `speed_multiplier` applied.
    #[must_use]
    pub fn scaled(&self) -> Self {
        let m = self.speed_multiplier;
        Self {
            ego_speed: self.ego_speed * m,
            other_vehicles_speed_range: (
                self.other_vehicles_speed_range.0 * m,
                self.other_vehicles_speed_range.1 * m,
            ),
            merging_vehicle_speed: self.merging_vehicle_speed * m,
            merging_vehicle_target_speed: self.merging_vehicle_target_speed * m,
            speed_multiplier: 1.0,
            reward_speed_range: self.reward_speed_range,
        }
    }
}

const FAST_MERGE_PROFILE: SpeedProfile = SpeedProfile {
    ego_speed: 30.0,
    other_vehicles_speed_range: (29.0, 32.0),
    merging_vehicle_speed: 20.0,
    merging_vehicle_target_speed: 30.0,
    speed_multiplier: 1.0,
    reward_speed_range: (20.0, 30.0),
};

/// One row of the environment catalog.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvSpec {
    pub env: Environment,
    pub speed: SpeedVariant,
    /// Framework config block selecting this environment.
    pub config_id: &'static str,
    /// Gym registration id of the simulator environment.
    pub gym_id: &'static str,
    pub max_episode_steps: usize,
    pub description: &'static str,
    pub speed_profile: Option<SpeedProfile>,
}

pub const CATALOG: &[EnvSpec] = &[
    EnvSpec {
        env: Environment::Highway,
        speed: SpeedVariant::Default,
        config_id: "highway",
        gym_id: "highway-v0",
        max_episode_steps: 40,
        description: "Multi-lane highway cruising with dense traffic",
        speed_profile: None,
    },
    EnvSpec {
        env: Environment::Highway,
        speed: SpeedVariant::Fast,
        config_id: "highway_fast",
        gym_id: "highway-fast-v0",
        max_episode_steps: 30,
        description: "Highway with a cheaper simulation step for quicker training",
        speed_profile: None,
    },
    EnvSpec {
        env: Environment::Merge,
        speed: SpeedVariant::Default,
        config_id: "highway_merge",
        gym_id: "merge-v0",
        max_episode_steps: 100,
        description: "Highway merge: yield to a vehicle joining from the on-ramp",
        speed_profile: None,
    },
    EnvSpec {
        env: Environment::Merge,
        speed: SpeedVariant::Fast,
        config_id: "highway_fast_merge",
        gym_id: "fast-merge-v0",
        max_episode_steps: 100,
        description: "Highway merge with configurable, faster vehicle speeds",
        speed_profile: Some(FAST_MERGE_PROFILE),
    },
    EnvSpec {
        env: Environment::Roundabout,
        speed: SpeedVariant::Default,
        config_id: "highway_roundabout",
        gym_id: "roundabout-v0",
        max_episode_steps: 11,
        description: "Enter and traverse a roundabout while avoiding collisions",
        speed_profile: None,
    },
    EnvSpec {
        env: Environment::Intersection,
        speed: SpeedVariant::Default,
        config_id: "highway_intersection",
        gym_id: "intersection-v1",
        max_episode_steps: 13,
        description: "Cross an unsignalized intersection with crossing traffic",
        speed_profile: None,
    },
];

/// Look up the catalog row for an environment and speed variant.
pub fn lookup(env: Environment, speed: SpeedVariant) -> Result<&'static EnvSpec, ParamError> {
    CATALOG
        .iter()
        .find(|spec| spec.env == env && spec.speed == speed)
        .ok_or(ParamError::UnsupportedCombination { env, speed })
}

/// Speed variants available for an environment, in catalog order.
#[must_use]
pub fn speeds_for(env: Environment) -> Vec<SpeedVariant> {
    CATALOG
        .iter()
        .filter(|spec| spec.env == env)
        .map(|spec| spec.speed)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_case::test_case;

    use super::*;

    #[test_case(Environment::Highway, SpeedVariant::Default, "highway")]
    #[test_case(Environment::Highway, SpeedVariant::Fast, "highway_fast")]
    #[test_case(Environment::Merge, SpeedVariant::Default, "highway_merge")]
    #[test_case(Environment::Merge, SpeedVariant::Fast, "highway_fast_merge")]
    #[test_case(Environment::Roundabout, SpeedVariant::Default, "highway_roundabout")]
    #[test_case(Environment::Intersection, SpeedVariant::Default, "highway_intersection")]
    fn test_config_ids(env: Environment, speed: SpeedVariant, expected: &str) {
        assert_eq!(lookup(env, speed).unwrap().config_id, expected);
    }

    #[test]
    fn test_fast_merge_differs_from_default() {
        let fast = lookup(Environment::Merge, SpeedVariant::Fast).unwrap();
        let default = lookup(Environment::Merge, SpeedVariant::Default).unwrap();
        assert_ne!(fast.config_id, default.config_id);
        assert_eq!(fast.gym_id, "fast-merge-v0");
    }

    #[test]
    fn test_config_ids_unique() {
        let ids: HashSet<_> = CATALOG.iter().map(|s| s.config_id).collect();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn test_every_environment_has_default_speed() {
        for env in Environment::ALL {
            assert!(
                lookup(env, SpeedVariant::Default).is_ok(),
                "{env} missing default speed"
            );
        }
    }

    #[test]
    fn test_unsupported_combination() {
        let err = lookup(Environment::Roundabout, SpeedVariant::Fast).unwrap_err();
        assert_eq!(
            err.to_string(),
            "speed variant 'fast' is not available for environment 'roundabout' (available: default)"
        );
    }

    #[test]
    fn test_speeds_for() {
        assert_eq!(
            speeds_for(Environment::Merge),
            vec![SpeedVariant::Default, SpeedVariant::Fast]
        );
        assert_eq!(speeds_for(Environment::Intersection), vec![SpeedVariant::Default]);
    }

    #[test]
    fn test_speed_profile_scaled() {
        let profile = SpeedProfile {
            speed_multiplier: 1.5,
            ..FAST_MERGE_PROFILE
        };
        let scaled = profile.scaled();
        assert!((scaled.ego_speed - 45.0).abs() < 1e-9);
        assert!((scaled.other_vehicles_speed_range.1 - 48.0).abs() < 1e-9);
        assert!((scaled.merging_vehicle_target_speed - 45.0).abs() < 1e-9);
        // Reward range is not a spawn speed.
        assert_eq!(scaled.reward_speed_range, (20.0, 30.0));
    }
}
