use harvest_game::{
    ActionError, EngineConfig, GameState, ManualClock, MemoryStorage, ProgressionEngine, TeamId,
    View, stage_of,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const MINUTE_MS: i64 = 60 * 1000;

#[derive(Debug, Clone, Copy)]
enum Action {
    Roll,
    Harvest,
    GoBonus,
    CycleRoll,
    CycleGo,
    SelectTeam(u8),
    Navigate(View),
    TeammateTick,
    Wait(i64),
}

fn random_action(rng: &mut SmallRng) -> Action {
    match rng.gen_range(0..12) {
        0..=3 => Action::Roll,
        4 => Action::Harvest,
        5 => Action::GoBonus,
        6 => Action::CycleRoll,
        7 => Action::CycleGo,
        8 => Action::SelectTeam(rng.gen_range(0..=5)),
        9 => Action::Navigate(if rng.gen_bool(0.5) {
            View::Garden
        } else {
            View::Board
        }),
        10 => Action::TeammateTick,
        _ => Action::Wait(rng.gen_range(1..=240) * MINUTE_MS * 10),
    }
}

fn assert_invariants(state: &GameState, ceiling: Option<u32>) {
    assert_eq!(state.gardens.len(), 4);
    for (team, garden) in &state.gardens {
        assert_eq!(garden.plot_count(), 16, "team {team}");
        for plot in garden.plots() {
            assert_eq!(plot.stage(), stage_of(plot.xp()));
        }
    }
    if state.needs_harvest {
        assert!(state.active_garden().unwrap().is_full(ceiling));
    }
    assert!((1.0..=10.0).contains(&state.central_haystack_size));
}

fn run(seed: u64, steps: usize, config: EngineConfig) {
    let ceiling = config.growth.max_plot_xp;
    let clock = ManualClock::starting_at(0);
    let mut engine =
        ProgressionEngine::open(MemoryStorage::new(), clock.clone(), config, seed).unwrap();
    let mut script = SmallRng::seed_from_u64(seed ^ 0x5EED);

    for _ in 0..steps {
        let before = engine.state().clone();
        let action = random_action(&mut script);
        let rejected: Option<ActionError> = match action {
            Action::Roll => engine.roll().err(),
            Action::Harvest => engine.harvest().err(),
            Action::GoBonus => engine.collect_go_bonus().err(),
            Action::CycleRoll => {
                engine.cycle_roll_multiplier();
                None
            }
            Action::CycleGo => {
                engine.cycle_go_multiplier();
                None
            }
            Action::SelectTeam(id) => engine.select_team(id).err(),
            Action::Navigate(view) => {
                engine.navigate(view);
                None
            }
            Action::TeammateTick => {
                engine.teammate_tick();
                None
            }
            Action::Wait(ms) => {
                clock.advance_ms(ms);
                engine.check_timer();
                None
            }
        };

        let after = engine.state();
        if let Some(err) = rejected {
            assert_eq!(after, &before, "{action:?} rejected with {err} but mutated");
            if let ActionError::InsufficientSeeds { required, available } = err {
                assert!(available < required);
            }
        }
        assert!(engine.phase().is_idle());
        assert!(after.total_xp >= before.total_xp);
        assert!(after.wins >= before.wins);
        assert!(after.coins >= before.coins);
        for team in TeamId::ALL {
            assert!(after.haystack(team) >= before.haystack(team));
        }
        assert_invariants(after, ceiling);
    }
}

#[test]
fn random_play_preserves_invariants() {
    for seed in 0..16 {
        run(seed, 400, EngineConfig::default());
    }
}

#[test]
fn fast_growth_play_preserves_invariants() {
    let mut config = EngineConfig::default();
    config.dice.xp_per_hit = 200;
    config.economy.teammate_tick_chance = 1.0;
    for seed in 100..108 {
        run(seed, 400, config.clone());
    }
}

#[test]
fn uncapped_gardens_never_demand_harvest() {
    let mut config = EngineConfig::default();
    config.growth.max_plot_xp = None;
    config.dice.xp_per_hit = 500;
    let clock = ManualClock::starting_at(0);
    let mut engine =
        ProgressionEngine::open(MemoryStorage::new(), clock, config, 77).unwrap();
    for _ in 0..50 {
        engine.roll().unwrap();
        assert!(!engine.state().needs_harvest);
    }
    assert_eq!(engine.state().seeds, 0);
    assert!(!engine.can_roll());
}

#[test]
fn rolls_stop_exactly_when_seeds_run_out() {
    let mut engine = ProgressionEngine::open(
        MemoryStorage::new(),
        ManualClock::starting_at(0),
        EngineConfig::default(),
        5,
    )
    .unwrap();
    engine.cycle_roll_multiplier();
    engine.cycle_roll_multiplier();
    let mut paid = 0;
    while engine.can_roll() {
        engine.roll().unwrap();
        paid += 5;
    }
    assert_eq!(paid, 50);
    assert_eq!(engine.state().seeds, 0);
    assert_eq!(
        engine.roll(),
        Err(ActionError::InsufficientSeeds {
            required: 5,
            available: 0
        })
    );
}
