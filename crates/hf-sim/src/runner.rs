//! Drivers for the engine: a deterministic fixed-step run and a wall-clock
//! tick loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hf_core::numeric::ensure_finite;
use tracing::{debug, info, warn};

use crate::engine::SimulationEngine;
use crate::error::{SimError, SimResult};
use crate::snapshot::SystemSnapshot;

/// Options for a fixed-step run.
#[derive(Clone, Debug)]
pub struct FixedStepOptions {
    /// Step size (seconds)
    pub dt_s: f64,
    /// Simulated duration (seconds)
    pub duration_s: f64,
    /// Record every N-th step
    pub record_every: usize,
}

impl Default for FixedStepOptions {
    fn default() -> Self {
        Self {
            dt_s: 1.0 / 60.0,
            duration_s: 10.0,
            record_every: 60,
        }
    }
}

impl FixedStepOptions {
    fn validate(&self) -> SimResult<()> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "duration must be non-negative",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }

    /// Number of whole steps covering the duration.
    pub fn steps(&self) -> usize {
        (self.duration_s / self.dt_s).round() as usize
    }
}

/// Snapshots recorded during a run. The first entry is the state before the
/// first step; the last is always the final state.
#[derive(Clone, Debug, Default)]
pub struct RunRecord {
    pub snapshots: Vec<Arc<SystemSnapshot>>,
}

impl RunRecord {
    pub fn last(&self) -> Option<&SystemSnapshot> {
        self.snapshots.last().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Advance `engine` in fixed steps, independent of the wall clock.
pub fn run_fixed(engine: &mut SimulationEngine, opts: &FixedStepOptions) -> SimResult<RunRecord> {
    opts.validate()?;
    let steps = opts.steps();
    debug!(steps, dt_s = opts.dt_s, "fixed-step run");

    let mut snapshots = vec![engine.full_state()];
    for step in 1..=steps {
        let snapshot = engine.advance(opts.dt_s);
        if step % opts.record_every == 0 || step == steps {
            snapshots.push(snapshot);
        }
    }
    Ok(RunRecord { snapshots })
}

/// Cloneable flag that asks a running [`TickLoop`] to return.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous stop so the loop can be run again.
    pub fn rearm(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counters from one [`TickLoop::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    pub ticks: u64,
    pub simulated_s: f64,
    /// Wall time spent inside ticks
    pub busy_s: f64,
    /// Ticks that took longer than the target period
    pub overruns: u64,
}

impl TickStats {
    pub fn mean_tick_cost_s(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.busy_s / self.ticks as f64
        }
    }
}

/// Drives [`SimulationEngine::tick`] at a target rate on the calling thread.
///
/// Each tick integrates the real elapsed time, so a slow tick is followed by
/// a larger step rather than by extra ticks.
#[derive(Debug)]
pub struct TickLoop {
    period: Duration,
    max_duration: Option<Duration>,
    stop: StopHandle,
}

impl TickLoop {
    pub fn new(target_hz: f64) -> SimResult<Self> {
        if ensure_finite(target_hz, "tick rate")? <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "tick rate must be positive",
            });
        }
        let period =
            Duration::try_from_secs_f64(1.0 / target_hz).map_err(|_| SimError::InvalidArg {
                what: "tick period out of range",
            })?;
        Ok(Self {
            period,
            max_duration: None,
            stop: StopHandle::default(),
        })
    }

    /// Return after `duration` of wall time even if never stopped.
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Tick until stopped or until the max duration elapses.
    pub fn run(&self, engine: &mut SimulationEngine) -> TickStats {
        engine.resync_clock();
        let started = Instant::now();
        let start_sim_s = engine.elapsed_simulated_s();
        let mut stats = TickStats::default();
        info!(period_ms = self.period.as_secs_f64() * 1000.0, "tick loop started");

        while !self.stop.is_stopped() {
            if self
                .max_duration
                .is_some_and(|max| started.elapsed() >= max)
            {
                break;
            }

            let tick_start = Instant::now();
            engine.tick();
            let cost = tick_start.elapsed();

            stats.ticks += 1;
            stats.busy_s += cost.as_secs_f64();
            match self.period.checked_sub(cost) {
                Some(remaining) if !remaining.is_zero() => thread::sleep(remaining),
                _ => {
                    stats.overruns += 1;
                    warn!(cost_ms = cost.as_secs_f64() * 1000.0, "tick overran its period");
                }
            }
        }

        stats.simulated_s = engine.elapsed_simulated_s() - start_sim_s;
        info!(
            ticks = stats.ticks,
            simulated_s = stats.simulated_s,
            overruns = stats.overruns,
            "tick loop stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn fixed_options_validate() {
        let mut e = engine();
        let bad = FixedStepOptions {
            dt_s: 0.0,
            ..Default::default()
        };
        assert!(run_fixed(&mut e, &bad).is_err());
        let bad = FixedStepOptions {
            record_every: 0,
            ..Default::default()
        };
        assert!(run_fixed(&mut e, &bad).is_err());
    }

    #[test]
    fn fixed_run_records_initial_and_final() {
        let mut e = engine();
        let opts = FixedStepOptions {
            dt_s: 0.1,
            duration_s: 1.1,
            record_every: 4,
        };
        let record = run_fixed(&mut e, &opts).unwrap();
        // steps 0, 4, 8, 11 (final)
        assert_eq!(record.len(), 4);
        assert_eq!(record.last().unwrap().tick, 11);
        assert!((e.elapsed_simulated_s() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn tick_rate_must_be_positive() {
        assert!(TickLoop::new(0.0).is_err());
        assert!(TickLoop::new(f64::NAN).is_err());
        assert!(matches!(
            TickLoop::new(1.0e-300),
            Err(SimError::InvalidArg { .. })
        ));
        assert_eq!(TickLoop::new(50.0).unwrap().period(), Duration::from_millis(20));
    }

    #[test]
    fn pre_stopped_loop_does_nothing() {
        let mut e = engine();
        let lp = TickLoop::new(100.0).unwrap();
        lp.stop_handle().stop();
        let stats = lp.run(&mut e);
        assert_eq!(stats.ticks, 0);
        assert_eq!(stats.mean_tick_cost_s(), 0.0);
        lp.stop_handle().rearm();
        assert!(!lp.stop_handle().is_stopped());
    }
}
