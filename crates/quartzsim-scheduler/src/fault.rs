use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::journal::{ErrorMessage, EventDraft, EventType};

/// Decides whether a journal event is reported as faulted.
///
/// Returning `Some(errors)` marks the event faulted with those messages.
pub trait FaultPolicy: Send {
    fn assess(&mut self, draft: &EventDraft) -> Option<Vec<ErrorMessage>>;
}

/// Never faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultPolicy for NoFaults {
    fn assess(&mut self, _draft: &EventDraft) -> Option<Vec<ErrorMessage>> {
        None
    }
}

/// Faults completed executions with a fixed probability.
///
/// Only `Completed` events carry a job outcome, so nothing else is faulted.
#[derive(Debug, Clone)]
pub struct RandomFaults {
    probability: f64,
    rng: StdRng,
}

impl RandomFaults {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: usable_probability(probability),
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of outcomes.
    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: usable_probability(probability),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Clamp into `[0, 1]`; NaN disables faulting.
fn usable_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

impl FaultPolicy for RandomFaults {
    fn assess(&mut self, draft: &EventDraft) -> Option<Vec<ErrorMessage>> {
        if draft.event_type != EventType::Completed || !self.rng.gen_bool(self.probability) {
            return None;
        }
        let key = draft.item_key.as_deref().unwrap_or("unknown");
        Some(vec![
            ErrorMessage {
                level: 0,
                text: format!("Simulated failure of trigger {key}"),
            },
            ErrorMessage {
                level: 1,
                text: "Injected by fault policy".to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> EventDraft {
        EventDraft::trigger(EventType::Completed, "t", Some(1))
    }

    #[test]
    fn certain_faults_only_hit_completions() {
        let mut policy = RandomFaults::seeded(1.0, 7);
        assert!(policy.assess(&completed()).is_some());
        let fired = EventDraft::trigger(EventType::Fired, "t", Some(1));
        assert!(policy.assess(&fired).is_none());
        assert!(policy
            .assess(&EventDraft::scheduler(EventType::Standby))
            .is_none());
    }

    #[test]
    fn zero_probability_never_faults() {
        let mut policy = RandomFaults::seeded(0.0, 7);
        assert!((0..100).all(|_| policy.assess(&completed()).is_none()));
    }

    #[test]
    fn same_seed_same_outcomes() {
        let mut a = RandomFaults::seeded(0.5, 42);
        let mut b = RandomFaults::seeded(0.5, 42);
        let run = |p: &mut RandomFaults| -> Vec<bool> {
            (0..64).map(|_| p.assess(&completed()).is_some()).collect()
        };
        let (ra, rb) = (run(&mut a), run(&mut b));
        assert_eq!(ra, rb);
        assert!(ra.iter().any(|f| *f) && ra.iter().any(|f| !*f));
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let mut policy = RandomFaults::seeded(3.0, 1);
        assert!(policy.assess(&completed()).is_some());
        let mut policy = RandomFaults::seeded(-1.0, 1);
        assert!(policy.assess(&completed()).is_none());
    }

    #[test]
    fn nan_probability_never_faults() {
        let mut policy = RandomFaults::new(f64::NAN);
        assert!(policy.assess(&completed()).is_none());
        let mut policy = RandomFaults::seeded(f64::NAN, 3);
        assert!((0..16).all(|_| policy.assess(&completed()).is_none()));
    }
}
