//! Scenario registry.
//!
//! The scenario executor maps a requested scenario key to one of a closed
//! set of routines. Keeping that set an enum means renaming or adding a
//! routine shows up at every `match`, instead of as a lookup miss at run
//! time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Executor routines known to the lab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioKind {
    /// Restore honest announcements everywhere
    Normal,
    /// Attacker originates the victim's exact prefix
    Hijack,
    /// Attacker originates a more-specific of the victim's prefix
    MoreSpecific,
    /// Transit re-exports routes against its export policy
    Leak,
    /// Attacker forges the AS path of an announcement
    AsPath,
    /// Victim prefix is tagged for blackholing upstream
    Blackhole,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 6] = [
        ScenarioKind::Normal,
        ScenarioKind::Hijack,
        ScenarioKind::MoreSpecific,
        ScenarioKind::Leak,
        ScenarioKind::AsPath,
        ScenarioKind::Blackhole,
    ];

    /// Entrypoint identifier the executor understands
    pub fn entrypoint(&self) -> &'static str {
        match self {
            ScenarioKind::Normal => "normal",
            ScenarioKind::Hijack => "hijack",
            ScenarioKind::MoreSpecific => "more-specific",
            ScenarioKind::Leak => "leak",
            ScenarioKind::AsPath => "aspath",
            ScenarioKind::Blackhole => "blackhole",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entrypoint())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(ScenarioKind::Normal),
            "hijack" => Ok(ScenarioKind::Hijack),
            "more-specific" | "more_specific" => Ok(ScenarioKind::MoreSpecific),
            "leak" => Ok(ScenarioKind::Leak),
            "aspath" | "as-path" | "as_path" => Ok(ScenarioKind::AsPath),
            "blackhole" => Ok(ScenarioKind::Blackhole),
            other => Err(format!(
                "unknown scenario entrypoint '{}' (known: {})",
                other,
                ScenarioKind::ALL
                    .iter()
                    .map(|kind| kind.entrypoint())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub key: String,
    pub description: String,
    pub kind: ScenarioKind,
}

/// Lookup of a scenario key that is not registered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario '{key}'")]
pub struct UnknownScenario {
    pub key: String,
}

/// Read-only scenario registry handed to the scenario executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn new(scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        ScenarioRegistry {
            scenarios: scenarios
                .into_iter()
                .map(|scenario| (scenario.key.clone(), scenario))
                .collect(),
        }
    }

    /// Resolve a requested scenario. Unknown keys are always an error.
    pub fn get(&self, key: &str) -> Result<&Scenario, UnknownScenario> {
        self.scenarios.get(key).ok_or_else(|| UnknownScenario {
            key: key.to_string(),
        })
    }

    /// Scenarios in key order
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrypoints_round_trip() {
        for kind in ScenarioKind::ALL {
            assert_eq!(kind.entrypoint().parse::<ScenarioKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_entrypoint_lists_known_ones() {
        let err = "route-flap".parse::<ScenarioKind>().unwrap_err();
        assert!(err.contains("route-flap"));
        assert!(err.contains("more-specific"));
    }

    #[test]
    fn test_registry_lookup_is_strict() {
        let registry = ScenarioRegistry::new(vec![Scenario {
            key: "hijack".to_string(),
            description: "exact prefix hijack".to_string(),
            kind: ScenarioKind::Hijack,
        }]);

        assert_eq!(registry.get("hijack").unwrap().kind, ScenarioKind::Hijack);
        assert_eq!(
            registry.get("leak"),
            Err(UnknownScenario { key: "leak".to_string() })
        );
        assert_eq!(registry.len(), 1);
    }
}
