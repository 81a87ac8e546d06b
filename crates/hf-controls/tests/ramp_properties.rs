//! Property tests for actuator ramps and valve travel.

use hf_controls::{ActuatorSpec, ActuatorState, ActuatorStateMachine, ValveActuator, ValveSpec};
use proptest::prelude::*;

fn machine(startup_ms: f64, shutdown_ms: f64) -> ActuatorStateMachine {
    let spec = ActuatorSpec::new(60.0, startup_ms, shutdown_ms, 0.0).unwrap();
    ActuatorStateMachine::new(spec).unwrap()
}

proptest! {
    #[test]
    fn valve_converges_exactly(
        target in -50.0f64..150.0,
        start in 0.0f64..=100.0,
        rate in 1.0f64..200.0,
        dt in 0.001f64..0.1,
    ) {
        let mut valve = ValveActuator::new(ValveSpec::with_rate(rate).unwrap(), start).unwrap();
        let applied = valve.set_position(target);
        prop_assert_eq!(applied, target.clamp(0.0, 100.0));

        let mut ticks = 0;
        while valve.is_actuating() {
            let before = valve.current_position();
            valve.tick(dt);
            // bounded step, no overshoot
            prop_assert!((valve.current_position() - before).abs() <= rate * dt + 1e-9);
            ticks += 1;
            prop_assert!(ticks < 1_000_000);
        }
        prop_assert_eq!(valve.current_position(), target.clamp(0.0, 100.0));
    }

    #[test]
    fn startup_ramp_is_monotonic(
        startup_ms in 50.0f64..5000.0,
        deltas in prop::collection::vec(0.0f64..100.0, 1..400),
    ) {
        let mut m = machine(startup_ms, 1000.0);
        prop_assert!(m.start());
        let mut prev = m.output_ratio();
        for dt in deltas {
            m.tick(dt);
            let r = m.output_ratio();
            prop_assert!(r >= prev);
            prop_assert!((0.0..=1.0).contains(&r));
            prev = r;
        }
        // finish the ramp
        m.tick(startup_ms);
        prop_assert_eq!(m.state(), ActuatorState::Running);
        prop_assert_eq!(m.output_ratio(), 1.0);
    }

    #[test]
    fn shutdown_ramp_is_monotonic(
        shutdown_ms in 50.0f64..5000.0,
        deltas in prop::collection::vec(0.0f64..100.0, 1..400),
    ) {
        let mut m = machine(100.0, shutdown_ms);
        m.start();
        m.tick(100.0);
        prop_assert!(m.stop());
        let mut prev = m.output_ratio();
        for dt in deltas {
            m.tick(dt);
            let r = m.output_ratio();
            prop_assert!(r <= prev);
            prev = r;
        }
        m.tick(shutdown_ms);
        prop_assert_eq!(m.state(), ActuatorState::Idle);
        prop_assert_eq!(m.output_ratio(), 0.0);
    }

    #[test]
    fn reversals_never_jump(
        first_leg in 1.0f64..999.0,
        second_leg in 1.0f64..999.0,
    ) {
        let mut m = machine(1000.0, 1000.0);
        m.start();
        m.tick(first_leg);
        let up = m.output_ratio();
        m.stop();
        prop_assert!((m.output_ratio() - up).abs() < 1e-12);
        m.tick(second_leg);
        let down = m.output_ratio();
        prop_assert!(down <= up);
        m.start();
        prop_assert!((m.output_ratio() - down).abs() < 1e-12);
    }
}

#[test]
fn increments_summing_to_duration_land_on_running() {
    let mut m = machine(2000.0, 1500.0);
    m.start();
    let mut last = None;
    for _ in 0..125 {
        if let Some(s) = m.tick(16.0) {
            last = Some(s);
        }
    }
    assert_eq!(last, Some(ActuatorState::Running));
    assert_eq!(m.output_ratio(), 1.0);
}
