use crate::state_machine::FreezeState;
use opentelemetry::{KeyValue, global, metrics::Counter};

#[derive(Clone)]
pub struct MonitorMetrics {
    samples: Counter<u64>,
    transitions: Counter<u64>,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        let meter = global::meter("monitor");

        Self {
            samples: meter
                .u64_counter("freeze_samples_total")
                .with_description("Live frames compared by the freeze monitor")
                .build(),
            transitions: meter
                .u64_counter("freeze_transitions_total")
                .with_description("Freeze state changes broadcast to subscribers")
                .build(),
        }
    }

    pub fn record_sample(&self) {
        self.samples.add(1, &[]);
    }

    pub fn record_transition(&self, state: FreezeState) {
        let state = match state {
            FreezeState::Live => "live",
            FreezeState::Frozen => "frozen",
        };
        self.transitions.add(1, &[KeyValue::new("state", state)]);
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
