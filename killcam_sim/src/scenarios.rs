//! Replay scenarios for the deterministic harness.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// KC-001: Reference straight-line kill, instant models
    StraightShot,

    /// KC-002: Models arrive seconds into playback
    LateModels,

    /// KC-003: Teardown and reload while loads are in flight
    TeardownRace,

    /// KC-004: Follow/look switches during playback
    FollowSwitch,

    /// KC-005: Pause, resume and restart
    PauseResume,

    /// KC-006: Pursuit kill with many bystanders and one bad mesh
    Crowd,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::StraightShot,
            ScenarioId::LateModels,
            ScenarioId::TeardownRace,
            ScenarioId::FollowSwitch,
            ScenarioId::PauseResume,
            ScenarioId::Crowd,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::StraightShot => "straight_shot",
            ScenarioId::LateModels => "late_models",
            ScenarioId::TeardownRace => "teardown_race",
            ScenarioId::FollowSwitch => "follow_switch",
            ScenarioId::PauseResume => "pause_resume",
            ScenarioId::Crowd => "crowd",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::StraightShot => "Killer, weapon and stationary target on one line; loop wraps at t=10",
            ScenarioId::LateModels => "Model loads take 2-4s of replay time; camera waits, tracks keep moving",
            ScenarioId::TeardownRace => "Reload mid-load; every completion for the old replay must be dropped",
            ScenarioId::FollowSwitch => "Cycle follow roles and look overrides; cuts take effect next frame",
            ScenarioId::PauseResume => "Pause freezes cursors, camera keeps rendering, restart rewinds",
            ScenarioId::Crowd => "Seeded pursuit with 12 bystanders, one short track and one failing mesh",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "straight_shot" | "straightshot" | "kc-001" => Ok(ScenarioId::StraightShot),
            "late_models" | "latemodels" | "kc-002" => Ok(ScenarioId::LateModels),
            "teardown_race" | "teardownrace" | "kc-003" => Ok(ScenarioId::TeardownRace),
            "follow_switch" | "followswitch" | "kc-004" => Ok(ScenarioId::FollowSwitch),
            "pause_resume" | "pauseresume" | "kc-005" => Ok(ScenarioId::PauseResume),
            "crowd" | "kc-006" => Ok(ScenarioId::Crowd),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert!(!id.description().is_empty());
        }
        assert_eq!("KC-003".parse::<ScenarioId>().unwrap(), ScenarioId::TeardownRace);
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
