/// Simulation clock owned by each peer. Rule timing reads from here, never
/// from wall time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    pub elapsed_seconds: f64,
    pub timestep_ms: f64,
    pub tick: u64,
}

impl SimClock {
    pub fn new(timestep_ms: f64) -> Self {
        Self {
            elapsed_seconds: 0.0,
            timestep_ms,
            tick: 0,
        }
    }

    pub fn timestep_secs(&self) -> f32 {
        (self.timestep_ms / 1000.0) as f32
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.elapsed_seconds += self.timestep_ms / 1000.0;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1000.0 / 60.0)
    }
}
