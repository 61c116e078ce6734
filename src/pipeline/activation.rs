//! Hysteresis automaton turning per-step probabilities into debounced
//! detections.
//!
//! The counter climbs by one for every probability above the threshold and
//! triggers once it reaches the trigger level. A trigger resets the counter
//! to `-refractory`, so the next trigger needs `refractory + trigger_level`
//! activations. Below-threshold steps decay the counter toward zero from
//! either side without crossing it.

use crate::defaults;

/// Tuning for the activation automaton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationConfig {
    pub threshold: f32,
    pub trigger_level: i32,
    pub refractory: i32,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::THRESHOLD,
            trigger_level: defaults::TRIGGER_LEVEL,
            refractory: defaults::REFRACTORY,
        }
    }
}

/// Pure transition function: returns the next counter and whether this step
/// triggered.
pub fn next_activation(previous: i32, probability: f32, config: &ActivationConfig) -> (i32, bool) {
    if probability > config.threshold {
        let counter = previous + 1;
        if counter >= config.trigger_level {
            (-config.refractory, true)
        } else {
            (counter, false)
        }
    } else if previous > 0 {
        ((previous - 1).max(0), false)
    } else {
        ((previous + 1).min(0), false)
    }
}

/// Per-detector activation state.
#[derive(Debug, Clone)]
pub struct Activation {
    config: ActivationConfig,
    counter: i32,
}

impl Activation {
    pub fn new(config: ActivationConfig) -> Self {
        Self { config, counter: 0 }
    }

    /// Feed one probability. Returns `true` when a detection fires.
    pub fn update(&mut self, probability: f32) -> bool {
        let (counter, triggered) = next_activation(self.counter, probability, &self.config);
        self.counter = counter;
        triggered
    }

    pub fn counter(&self) -> i32 {
        self.counter
    }
}
