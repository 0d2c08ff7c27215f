//! Per-phase wall-clock budgets with soft and hard ceilings
//!
//! Budget exhaustion is a scheduling signal, not an error: the owning
//! phase returns its best-effort partial result and the run carries on.
//! One scheduler instance is scoped to one analysis run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Language,
    Metadata,
    History,
    Conventions,
    Fingerprint,
    Aggregation,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Language,
        Phase::Metadata,
        Phase::History,
        Phase::Conventions,
        Phase::Fingerprint,
        Phase::Aggregation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Language => "language",
            Phase::Metadata => "metadata",
            Phase::History => "history",
            Phase::Conventions => "conventions",
            Phase::Fingerprint => "fingerprint",
            Phase::Aggregation => "aggregation",
        }
    }

    /// Share of the soft ceiling this phase may spend
    fn share(&self) -> f64 {
        match self {
            Phase::Language => 0.05,
            Phase::Metadata => 0.15,
            Phase::History => 0.20,
            Phase::Conventions => 0.45,
            Phase::Fingerprint => 0.05,
            Phase::Aggregation => 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub soft_ceiling: Duration,
    pub hard_ceiling: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { soft_ceiling: Duration::from_secs(15), hard_ceiling: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PhaseRecord {
    started_ms: Option<u64>,
    ended_ms: Option<u64>,
    timed_out: bool,
}

/// One run's budget accounting
#[derive(Debug)]
pub struct BudgetScheduler {
    config: BudgetConfig,
    started: Instant,
    records: Mutex<HashMap<Phase, PhaseRecord>>,
}

impl BudgetScheduler {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config, started: Instant::now(), records: Mutex::new(HashMap::new()) }
    }

    /// Budget allocated to one phase, clipped to what is actually left
    /// of the soft ceiling.
    pub fn phase_budget(&self, phase: Phase) -> Duration {
        let allocation = self.config.soft_ceiling.mul_f64(phase.share());
        allocation.min(self.remaining_soft().max(Duration::from_millis(1)))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining_soft(&self) -> Duration {
        self.config.soft_ceiling.saturating_sub(self.elapsed())
    }

    pub fn soft_exceeded(&self) -> bool {
        self.elapsed() >= self.config.soft_ceiling
    }

    pub fn hard_exceeded(&self) -> bool {
        self.elapsed() >= self.config.hard_ceiling
    }

    pub fn begin_phase(&self, phase: Phase) {
        let elapsed_ms = self.elapsed().as_millis() as u64;
        let mut records = self.records.lock().expect("budget lock poisoned");
        records.entry(phase).or_default().started_ms = Some(elapsed_ms);
    }

    pub fn end_phase(&self, phase: Phase) {
        let elapsed_ms = self.elapsed().as_millis() as u64;
        let mut records = self.records.lock().expect("budget lock poisoned");
        records.entry(phase).or_default().ended_ms = Some(elapsed_ms);
    }

    /// Record that a phase ran out of budget and was abandoned in place.
    pub fn mark_timeout(&self, phase: Phase) {
        debug!("phase {} exceeded its budget, using partial result", phase.name());
        let elapsed_ms = self.elapsed().as_millis() as u64;
        let mut records = self.records.lock().expect("budget lock poisoned");
        let record = records.entry(phase).or_default();
        record.timed_out = true;
        record.ended_ms.get_or_insert(elapsed_ms);
    }

    pub fn timed_out(&self, phase: Phase) -> bool {
        self.records
            .lock()
            .expect("budget lock poisoned")
            .get(&phase)
            .map(|r| r.timed_out)
            .unwrap_or(false)
    }

    pub fn any_timeout(&self) -> bool {
        self.records
            .lock()
            .expect("budget lock poisoned")
            .values()
            .any(|record| record.timed_out)
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let records = self.records.lock().expect("budget lock poisoned");
        let phases = Phase::ALL
            .iter()
            .map(|&phase| {
                let record = records.get(&phase).copied().unwrap_or_default();
                PhaseReport {
                    phase,
                    allocated_ms: self.config.soft_ceiling.mul_f64(phase.share()).as_millis()
                        as u64,
                    started_ms: record.started_ms,
                    ended_ms: record.ended_ms,
                    timed_out: record.timed_out,
                }
            })
            .collect();
        PerformanceSnapshot {
            elapsed_ms: self.elapsed().as_millis() as u64,
            remaining_soft_ms: self.remaining_soft().as_millis() as u64,
            soft_exceeded: self.soft_exceeded(),
            hard_exceeded: self.hard_exceeded(),
            phases,
            degradation_level: None,
        }
    }
}

/// Per-phase timing as observed at snapshot time. Offsets are
/// milliseconds since the run started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub allocated_ms: u64,
    pub started_ms: Option<u64>,
    pub ended_ms: Option<u64>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub elapsed_ms: u64,
    pub remaining_soft_ms: u64,
    pub soft_exceeded: bool,
    pub hard_exceeded: bool,
    pub phases: Vec<PhaseReport>,
    /// Filled in once the degradation decision is made
    pub degradation_level: Option<crate::degrade::DegradationLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_shares_cover_the_whole_ceiling() {
        let total: f64 = Phase::ALL.iter().map(|p| p.share()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn phase_budget_never_exceeds_remaining() {
        let scheduler = BudgetScheduler::new(BudgetConfig {
            soft_ceiling: Duration::from_millis(10),
            hard_ceiling: Duration::from_millis(50),
        });
        std::thread::sleep(Duration::from_millis(15));
        assert!(scheduler.soft_exceeded());
        // clipped to the floor once the soft ceiling is gone
        assert!(scheduler.phase_budget(Phase::Conventions) <= Duration::from_millis(1));
    }

    #[test]
    fn timeouts_are_recorded_per_phase() {
        let scheduler = BudgetScheduler::new(BudgetConfig::default());
        scheduler.begin_phase(Phase::Conventions);
        scheduler.mark_timeout(Phase::Conventions);
        assert!(scheduler.timed_out(Phase::Conventions));
        assert!(!scheduler.timed_out(Phase::History));
        assert!(scheduler.any_timeout());

        let snapshot = scheduler.snapshot();
        let conventions =
            snapshot.phases.iter().find(|p| p.phase == Phase::Conventions).unwrap();
        assert!(conventions.timed_out);
        assert!(conventions.ended_ms.is_some());
    }

    #[test]
    fn snapshot_covers_every_phase() {
        let scheduler = BudgetScheduler::new(BudgetConfig::default());
        scheduler.begin_phase(Phase::Language);
        scheduler.end_phase(Phase::Language);
        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.phases.len(), Phase::ALL.len());
        assert!(!snapshot.soft_exceeded);
        let language = snapshot.phases.iter().find(|p| p.phase == Phase::Language).unwrap();
        assert!(language.started_ms.is_some());
        assert!(language.ended_ms.is_some());
    }
}
