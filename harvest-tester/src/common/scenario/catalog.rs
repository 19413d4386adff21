use anyhow::{Context, Result, ensure};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::SimulationSummary;
use crate::logic::{GameplayStrategy, SimulationPlan};
use harvest_game::harvest::haystack_size_for;
use harvest_game::{EngineConfig, LoadSource};

/// Every registered scenario as `(key, scenario)`, in listing order.
pub fn catalog_scenarios() -> Vec<(&'static str, TestScenario)> {
    vec![
        ("smoke", smoke_scenario()),
        ("full-season", full_season_scenario()),
        ("high-roller", high_roller_scenario()),
        ("idle-income", idle_income_scenario()),
        ("determinism", determinism_scenario()),
        ("recovery", recovery_scenario()),
        ("uncapped", uncapped_scenario()),
        ("monte-carlo", monte_carlo_scenario()),
    ]
}

pub fn find_catalog_scenario(key: &str) -> Option<TestScenario> {
    catalog_scenarios()
        .into_iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, scenario)| scenario)
}

fn smoke_scenario() -> TestScenario {
    TestScenario::simulation(
        "Smoke Test",
        SimulationPlan::new(GameplayStrategy::Casual)
            .with_max_steps(120)
            .with_expectation(consistent_state_expectation)
            .with_expectation(smoke_expectation),
    )
}

fn full_season_scenario() -> TestScenario {
    TestScenario::simulation(
        "Full Festival Season",
        SimulationPlan::new(GameplayStrategy::Grinder)
            .with_max_steps(240)
            .with_config(fast_growth)
            .with_expectation(consistent_state_expectation)
            .with_expectation(full_season_expectation),
    )
}

fn high_roller_scenario() -> TestScenario {
    TestScenario::simulation(
        "High Roller Stakes",
        SimulationPlan::new(GameplayStrategy::HighRoller)
            .with_max_steps(200)
            .with_expectation(consistent_state_expectation)
            .with_expectation(high_roller_expectation),
    )
}

fn idle_income_scenario() -> TestScenario {
    TestScenario::simulation(
        "Idle Income",
        SimulationPlan::new(GameplayStrategy::Idler)
            .with_max_steps(150)
            .with_step_ms(10 * 60 * 1000)
            .with_expectation(consistent_state_expectation)
            .with_expectation(idle_income_expectation),
    )
}

fn determinism_scenario() -> TestScenario {
    TestScenario::simulation(
        "Deterministic Replay",
        SimulationPlan::new(GameplayStrategy::MonteCarlo)
            .with_max_steps(250)
            .with_replay_check()
            .with_expectation(replay_expectation),
    )
}

fn recovery_scenario() -> TestScenario {
    TestScenario::simulation(
        "Corrupt Save Recovery",
        SimulationPlan::new(GameplayStrategy::Casual)
            .with_max_steps(20)
            .with_preload("{\"seeds\": \"plenty\", \"gardens\": [")
            .with_expectation(recovery_expectation),
    )
}

fn uncapped_scenario() -> TestScenario {
    TestScenario::simulation(
        "Uncapped Growth",
        SimulationPlan::new(GameplayStrategy::Casual)
            .with_max_steps(200)
            .with_config(uncapped_growth)
            .with_expectation(consistent_state_expectation)
            .with_expectation(uncapped_expectation),
    )
}

fn monte_carlo_scenario() -> TestScenario {
    TestScenario::simulation(
        "Monte Carlo Invariants",
        SimulationPlan::new(GameplayStrategy::MonteCarlo)
            .with_max_steps(400)
            .with_expectation(consistent_state_expectation)
            .with_expectation(monte_carlo_expectation),
    )
}

fn fast_growth(config: &mut EngineConfig) {
    config.dice.xp_per_hit = 400;
}

fn uncapped_growth(config: &mut EngineConfig) {
    fast_growth(config);
    config.growth.max_plot_xp = None;
}

/// Checks every run must satisfy regardless of strategy.
fn consistent_state_expectation(summary: &SimulationSummary) -> Result<()> {
    let state = &summary.final_state;
    state
        .validate()
        .context("final state failed validation")?;
    ensure!(summary.reload_matches, "saved document did not reload");
    ensure!(
        state.total_xp >= summary.initial_state.total_xp,
        "totalXP went backwards"
    );
    ensure!(
        state.wins == state.harvest_count,
        "wins {} != harvest count {}",
        state.wins,
        state.harvest_count
    );
    ensure!(
        state.wins - summary.initial_state.wins == summary.metrics.harvests,
        "harvests recorded {} but wins moved by {}",
        summary.metrics.harvests,
        state.wins - summary.initial_state.wins
    );
    let expected_size = haystack_size_for(state.harvest_count, summary.config.harvest.haystack_growth);
    ensure!(
        (state.central_haystack_size - expected_size).abs() < 1e-9,
        "haystack size {} != {expected_size}",
        state.central_haystack_size
    );
    Ok(())
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.load_source == LoadSource::Fresh,
        "expected a fresh start, got {:?}",
        summary.load_source
    );
    ensure!(summary.metrics.rolls > 0, "casual player never rolled");
    ensure!(
        summary.metrics.seeds_spent_on_rolls == u64::from(summary.metrics.rolls),
        "x1 rolls should cost one seed each"
    );
    ensure!(summary.final_state.total_xp > 0, "no XP was earned");
    ensure!(summary.metrics.notifications > 0, "observers never fired");
    ensure!(
        summary.metrics.rng_draws >= 2 * u64::from(summary.metrics.rolls),
        "{} rolls drew only {} random values",
        summary.metrics.rolls,
        summary.metrics.rng_draws
    );
    Ok(())
}

fn full_season_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    let cycle = summary.config.harvest.cycle_len;
    ensure!(
        metrics.harvests >= cycle,
        "only {} harvests, expected a full cycle of {cycle}",
        metrics.harvests
    );
    ensure!(
        metrics.bonus_harvests >= cycle - summary.config.harvest.bonus_from + 1,
        "bonus window never paid out ({} bonus harvests)",
        metrics.bonus_harvests
    );
    ensure!(metrics.points_awarded > 0, "harvests awarded nothing");
    ensure!(summary.final_state.coins > 0, "no coins earned");
    Ok(())
}

fn high_roller_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(metrics.rolls > 0, "high roller never rolled");
    ensure!(
        metrics.seeds_spent_on_rolls == u64::from(metrics.rolls) * 10,
        "x10 rolls should cost ten seeds each ({} rolls, {} seeds)",
        metrics.rolls,
        metrics.seeds_spent_on_rolls
    );
    ensure!(metrics.go_bonuses > 0, "GO bonus never collected");
    Ok(())
}

fn idle_income_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    let state = &summary.final_state;
    let elapsed = i64::try_from(summary.steps.len())?.saturating_mul(summary.step_ms);
    let expected_timers = elapsed / summary.config.economy.timer_duration_ms;
    ensure!(
        i64::from(metrics.timer_bonuses) == expected_timers,
        "timer fired {} times, expected {expected_timers}",
        metrics.timer_bonuses
    );
    ensure!(state.total_xp == 0, "idler earned XP without rolling");
    let garden = state
        .active_garden()
        .context("player garden is missing")?;
    ensure!(garden.is_fallow(), "player garden grew without rolling");
    ensure!(metrics.teammate_ticks > 0, "teammates never planted");
    let earned = metrics.timer_seeds + metrics.go_seeds + metrics.teammate_seeds;
    ensure!(
        u64::from(state.seeds) == u64::from(summary.initial_state.seeds) + earned,
        "seed ledger mismatch: {} != {} + {earned}",
        state.seeds,
        summary.initial_state.seeds
    );
    Ok(())
}

fn replay_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.replay_digest == Some(summary.digest),
        "replay digest {:?} differs from {:016x}",
        summary.replay_digest,
        summary.digest
    );
    ensure!(summary.reload_matches, "saved document did not reload");
    Ok(())
}

fn recovery_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        matches!(summary.load_source, LoadSource::Recovered { .. }),
        "corrupt document was not recovered: {:?}",
        summary.load_source
    );
    ensure!(
        summary.initial_state.seeds == summary.config.economy.starting_seeds,
        "recovered state did not start with default seeds"
    );
    ensure!(summary.reload_matches, "recovered state was not persisted");
    Ok(())
}

fn uncapped_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(metrics.harvests == 0, "uncapped garden forced a harvest");
    ensure!(
        metrics.rejected_harvest_required == 0,
        "rolls were blocked on an uncapped garden"
    );
    ensure!(metrics.redirects == 0, "uncapped hits should never redirect");
    ensure!(
        summary.final_state.total_xp
            >= u64::from(metrics.rolls) * u64::from(summary.config.dice.xp_per_hit),
        "every roll should land at least one hit"
    );
    Ok(())
}

fn monte_carlo_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(
        metrics.rolls + metrics.rejected_insufficient + metrics.rejected_harvest_required > 0,
        "random player never attempted a roll"
    );
    ensure!(
        !summary.final_state.needs_harvest
            || summary
                .final_state
                .active_garden()
                .is_some_and(|garden| garden.is_full(summary.config.growth.max_plot_xp)),
        "needsHarvest set on a garden that is not full"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    fn run(key: &str, seed: u64) -> Result<()> {
        let scenario = find_catalog_scenario(key).context("unknown scenario")?;
        let summary = GameTester::new(EngineConfig::default(), false)
            .run_plan(&scenario.plan, seed, &scenario.name)?;
        for expectation in &scenario.plan.expectations {
            expectation.evaluate(&summary)?;
        }
        Ok(())
    }

    #[test]
    fn keys_are_unique() {
        let keys: Vec<&str> = catalog_scenarios().into_iter().map(|(key, _)| key).collect();
        let mut deduped = keys.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len());
    }

    #[test]
    fn catalog_scenarios_pass_on_default_seed() {
        for (key, _) in catalog_scenarios() {
            if let Err(err) = run(key, 1337) {
                panic!("{key}: {err:#}");
            }
        }
    }
}
