use std::time::Duration;

// Шаг интегрирования. Крупный dt дробится, чтобы пружина не разваливалась на лагах.
const MAX_STEP_SECS: f64 = 0.001;
const REST_DISPLACEMENT: f64 = 0.01;
const REST_SPEED: f64 = 2.0;

/// Затухающая пружина (масса 1), которая тянет значение к цели.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    value: f64,
    velocity: f64,
    target: f64,
    stiffness: f64,
    damping: f64,
}

impl Spring {
    pub fn new(value: f64, target: f64) -> Self {
        Self {
            value,
            velocity: 0.0,
            target,
            stiffness: 100.0,
            damping: 15.0,
        }
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness.max(0.0);
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping.max(0.0);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Мгновенно ставит значение в цель и гасит скорость.
    pub fn snap_to(&mut self, value: f64) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
    }

    pub fn is_at_rest(&self) -> bool {
        (self.value - self.target).abs() < REST_DISPLACEMENT && self.velocity.abs() < REST_SPEED
    }

    pub fn tick(&mut self, dt: Duration) {
        if self.is_at_rest() {
            self.value = self.target;
            self.velocity = 0.0;
            return;
        }

        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let h = remaining.min(MAX_STEP_SECS);
            let force = -self.stiffness * (self.value - self.target) - self.damping * self.velocity;
            self.velocity += force * h;
            self.value += self.velocity * h;
            remaining -= h;
        }

        if self.is_at_rest() {
            self.value = self.target;
            self.velocity = 0.0;
        }
    }
}
