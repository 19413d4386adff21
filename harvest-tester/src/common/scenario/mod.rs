pub mod catalog;

use crate::logic::SimulationPlan;
use catalog::{catalog_scenarios, find_catalog_scenario};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Look a scenario up by key or short alias.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "season" | "full" => "full-season".to_string(),
        "stakes" | "x10" => "high-roller".to_string(),
        "idle" | "timer" => "idle-income".to_string(),
        "deterministic" | "replay" => "determinism".to_string(),
        "corrupt" => "recovery".to_string(),
        "random" | "invariants" => "monte-carlo".to_string(),
        other => other.to_string(),
    };
    find_catalog_scenario(&key)
}

pub fn list_scenarios() -> Vec<(&'static str, String)> {
    catalog_scenarios()
        .into_iter()
        .map(|(key, scenario)| (key, scenario.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_catalog_entries() {
        assert_eq!(get_scenario("SMOKE").unwrap().name, "Smoke Test");
        assert_eq!(get_scenario("season").unwrap().name, "Full Festival Season");
        assert_eq!(get_scenario("replay").unwrap().name, "Deterministic Replay");
        assert!(get_scenario("browser").is_none());
    }

    #[test]
    fn listing_covers_every_key() {
        let listed = list_scenarios();
        assert_eq!(listed.len(), catalog_scenarios().len());
        for (key, name) in listed {
            assert_eq!(get_scenario(key).unwrap().name, name);
        }
    }
}
