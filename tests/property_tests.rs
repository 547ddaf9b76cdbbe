//! Randomized invariant checks over the state machine, the verdict, and
//! the command scaling.

use proptest::prelude::*;

use engine_runner::config::RunnerConfig;
use engine_runner::control::{percent_to_unit, CMD_MAX};
use engine_runner::fsm::{RunnerState, RunnerStateMachine};
use engine_runner::safety::ExceedanceVerdict;
use engine_runner::telemetry::EngineState;

fn engine_state_strategy() -> impl Strategy<Value = EngineState> {
    prop_oneof![
        Just(EngineState::NotConnected),
        Just(EngineState::Stopped),
        Just(EngineState::StarterRunning),
        Just(EngineState::StarterWaiting),
        Just(EngineState::Fault),
    ]
}

proptest! {
    /// Whatever the engine reports, the runner never begins a run on its
    /// own; active states require an explicit start.
    #[test]
    fn no_observation_sequence_starts_a_run(
        observations in proptest::collection::vec(engine_state_strategy(), 1..200),
    ) {
        let mut machine = RunnerStateMachine::new();
        let mut now = 1_000_u64;
        for observation in observations {
            now += 1;
            machine.update(observation, now);
            prop_assert!(!machine.state().is_active());
        }
    }

    /// A lost link drops the machine to NotConnected from any reachable
    /// state, including mid-run.
    #[test]
    fn telemetry_loss_always_wins(
        script in proptest::collection::vec(
            (any::<bool>(), engine_state_strategy()),
            0..100,
        ),
    ) {
        let mut machine = RunnerStateMachine::new();
        let mut now = 1_000_u64;
        for (start, observation) in script {
            now += 1;
            if start && machine.state() == RunnerState::Stopped {
                machine.force(RunnerState::Starting);
            }
            machine.update(observation, now);
        }
        machine.update(EngineState::NotConnected, now + 1);
        prop_assert_eq!(machine.state(), RunnerState::NotConnected);
    }

    /// While a run stays active, the attempt counter only ever grows.
    #[test]
    fn attempts_are_monotonic_while_active(
        observations in proptest::collection::vec(
            prop_oneof![
                Just(EngineState::Stopped),
                Just(EngineState::StarterRunning),
                Just(EngineState::StarterWaiting),
            ],
            1..200,
        ),
        step in 1_u64..10,
    ) {
        let mut machine = RunnerStateMachine::new();
        machine.update(EngineState::Stopped, 1_000);
        machine.force(RunnerState::Starting);

        let mut now = 1_000_u64;
        let mut last_attempts = machine.start_attempts();
        for observation in observations {
            now += step;
            machine.update(observation, now);
            if !machine.state().is_active() {
                break;
            }
            prop_assert!(machine.start_attempts() >= last_attempts);
            last_attempts = machine.start_attempts();
        }
    }

    /// The aggregate verdict is exactly the OR of its flags.
    #[test]
    fn verdict_any_is_the_or_of_all_flags(flags in any::<[bool; 8]>()) {
        let verdict = ExceedanceVerdict {
            temperature: flags[0],
            voltage: flags[1],
            fuel: flags[2],
            vibration: flags[3],
            time: flags[4],
            rpm: flags[5],
            start_attempts: flags[6],
            engaged_time: flags[7],
        };
        prop_assert_eq!(verdict.any(), flags.iter().any(|&flag| flag));
        // Every tripped flag shows up in the description.
        prop_assert_eq!(verdict.describe().is_empty(), !verdict.any());
    }

    /// Percent scaling stays inside the controller's command range and
    /// preserves ordering.
    #[test]
    fn percent_scaling_is_bounded_and_monotonic(a in 0_u8..=100, b in 0_u8..=100) {
        let (unit_a, unit_b) = (percent_to_unit(a), percent_to_unit(b));
        prop_assert!((0..=CMD_MAX).contains(&unit_a));
        if a <= b {
            prop_assert!(unit_a <= unit_b);
        }
    }

    /// A rejected field update leaves the configuration untouched.
    #[test]
    fn rejected_gain_updates_do_not_leak(value in any::<f64>()) {
        let mut config = RunnerConfig::default();
        let before = config.kp;
        let accepted = config.apply_field("kp", value).is_ok();
        if accepted {
            prop_assert!(value.is_finite() && (0.0..=100.0).contains(&value));
            prop_assert_eq!(config.kp, value);
        } else {
            prop_assert_eq!(config.kp, before);
        }
    }
}
