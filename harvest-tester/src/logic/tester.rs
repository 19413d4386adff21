use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::{GameTester, RunMetrics, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Final-state digest of the first iteration.
    pub digest: Option<String>,
    /// Counters from the first iteration.
    pub metrics: Option<RunMetrics>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    game_tester: GameTester,
}

impl LogicTester {
    pub const fn new(game_tester: GameTester) -> Self {
        Self { game_tester }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.game_tester.verbose() {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations);
            results.push(result);
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let run = self.run_simulation_iterations(&scenario.name, &scenario.plan, seed, iterations);

        let avg_duration = if run.performance_data.is_empty() {
            Duration::ZERO
        } else {
            run.performance_data.iter().sum::<Duration>()
                / u32::try_from(run.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: run.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: run.successes,
            failures: run.failures,
            digest: run.first_digest.map(|digest| format!("{digest:016x}")),
            metrics: run.first_metrics,
            average_duration: avg_duration,
            performance_data: run.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        label: &str,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationRun {
        let verbose = self.game_tester.verbose();
        let mut run = IterationRun::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.game_tester.run_plan(plan, iteration_seed, label) {
                Ok(summary) => summary,
                Err(err) => {
                    run.failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): could not run: {err:#}",
                        i + 1
                    ));
                    continue;
                }
            };
            if run.first_digest.is_none() {
                run.first_digest = Some(summary.digest);
                run.first_metrics = Some(summary.metrics.clone());
            }
            if let Some(dir) = &summary.state_dir {
                log::info!("{label} seed {iteration_seed}: state saved under {}", dir.display());
            }

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let context = summarize_recent_steps(&summary);
                let state = &summary.final_state;
                run.failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, steps {}): {} | {} | final seeds {} wins {} totalXP {}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.steps.len(),
                    err,
                    context,
                    state.seeds,
                    state.wins,
                    state.total_xp
                ));

                if verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                }
            } else {
                run.successes += 1;
                let duration = start_time.elapsed();
                run.performance_data.push(duration);

                if verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) rolls:{} harvests:{} policy:{}",
                        i + 1,
                        iterations,
                        summary.metrics.rolls,
                        summary.metrics.harvests,
                        summary.policy_name
                    );
                }
            }
        }

        run
    }
}

#[derive(Default)]
struct IterationRun {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    first_digest: Option<u64>,
    first_metrics: Option<RunMetrics>,
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_recent_steps(summary: &SimulationSummary) -> String {
    if summary.steps.is_empty() {
        return "no steps recorded".to_string();
    }

    summary
        .steps
        .iter()
        .rev()
        .take(3)
        .map(|entry| format!("step {} {}: {}", entry.step, entry.action.label(), entry.detail))
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::GameplayStrategy;
    use harvest_game::EngineConfig;

    fn logic_tester() -> LogicTester {
        LogicTester::new(GameTester::new(EngineConfig::default(), false))
    }

    #[test]
    fn passing_expectations_count_successes() {
        let scenario = TestScenario::simulation(
            "Quick",
            SimulationPlan::new(GameplayStrategy::Casual)
                .with_max_steps(10)
                .with_expectation(|summary: &SimulationSummary| {
                    anyhow::ensure!(summary.steps.len() == 10, "ten steps");
                    Ok(())
                }),
        );
        let results = logic_tester().run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed && r.successful_iterations == 2));
        assert!(results.iter().all(|r| r.digest.as_ref().is_some_and(|d| d.len() == 16)));
        assert!(results.iter().all(|r| r.metrics.is_some()));
    }

    #[test]
    fn failing_expectation_is_reported_with_context() {
        let scenario = TestScenario::simulation(
            "Impossible",
            SimulationPlan::new(GameplayStrategy::Idler)
                .with_max_steps(5)
                .with_expectation(|_: &SimulationSummary| -> anyhow::Result<()> {
                    anyhow::bail!("always fails")
                }),
        );
        let results = logic_tester().run_scenario(&scenario, &[3], 1);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.successful_iterations, 0);
        assert!(result.failures[0].contains("always fails"));
        assert!(result.failures[0].contains("step 4"));
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "x".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            digest: None,
            metrics: None,
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12), Duration::from_millis(7)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"], serde_json::json!([12, 7]));
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data.len(), 2);
    }
}
