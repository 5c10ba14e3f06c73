use rand::rngs::StdRng;
use rand_distr::Distribution;
use crate::utils::lognormal_dist;

/// Trait for generating the click count of every slot in a round
pub trait ClickGeneratorTrait {
    /// Generate click counts for round `t`, top slot first
    ///
    /// # Arguments
    /// * `t` - Round number
    /// * `num_slots` - Number of slots on offer
    /// * `rng` - Random number generator
    fn generate_clicks(&self, t: usize, num_slots: usize, rng: &mut StdRng) -> Vec<f64>;

    /// Get a string representation of the click model
    fn get_click_model_type(&self) -> String;
}

/// Same click counts every round
pub struct ClickGeneratorFixed {
    pub clicks: Vec<f64>,
}

impl ClickGeneratorFixed {
    pub fn new(clicks: Vec<f64>) -> Box<Self> {
        Box::new(Self { clicks })
    }
}

impl ClickGeneratorTrait for ClickGeneratorFixed {
    fn generate_clicks(&self, _t: usize, num_slots: usize, _rng: &mut StdRng) -> Vec<f64> {
        (0..num_slots).map(|slot| self.clicks.get(slot).copied().unwrap_or(0.0)).collect()
    }

    fn get_click_model_type(&self) -> String {
        format!("Fixed {:?}", self.clicks)
    }
}

/// Top slot clicks follow a daily cycle, lower slots get a constant fraction of the slot above
pub struct ClickGeneratorCosine {
    pub top_clicks: f64,
    pub amplitude: f64,
    pub period: f64,
    pub decay: f64,
}

impl ClickGeneratorCosine {
    pub fn new(top_clicks: f64, amplitude: f64, period: f64, decay: f64) -> Box<Self> {
        Box::new(Self { top_clicks, amplitude, period, decay })
    }
}

impl Default for ClickGeneratorCosine {
    fn default() -> Self {
        Self {
            top_clicks: 50.0,
            amplitude: 30.0,
            period: 24.0,
            decay: 0.75,
        }
    }
}

impl ClickGeneratorTrait for ClickGeneratorCosine {
    fn generate_clicks(&self, t: usize, num_slots: usize, _rng: &mut StdRng) -> Vec<f64> {
        let top = (self.amplitude * (std::f64::consts::PI * t as f64 / self.period).cos() + self.top_clicks).round();
        (0..num_slots)
            .map(|slot| (self.decay.powi(slot as i32) * top).round().max(0.0))
            .collect()
    }

    fn get_click_model_type(&self) -> String {
        format!("Cosine (top {:.0} ± {:.0}, period {:.0}, decay {:.2})", self.top_clicks, self.amplitude, self.period, self.decay)
    }
}

/// Top slot clicks drawn from a log-normal distribution every round, geometric decay below
pub struct ClickGeneratorLogNormal {
    mean: f64,
    stddev: f64,
    decay: f64,
}

impl ClickGeneratorLogNormal {
    pub fn new(mean: f64, stddev: f64, decay: f64) -> Box<Self> {
        Box::new(Self { mean, stddev, decay })
    }
}

impl ClickGeneratorTrait for ClickGeneratorLogNormal {
    fn generate_clicks(&self, _t: usize, num_slots: usize, rng: &mut StdRng) -> Vec<f64> {
        let dist = lognormal_dist(self.mean, self.stddev);
        let top = Distribution::sample(&dist, rng).round().max(1.0);
        // Every slot keeps at least one click so per-click prices stay defined
        (0..num_slots)
            .map(|slot| (self.decay.powi(slot as i32) * top).round().max(1.0))
            .collect()
    }

    fn get_click_model_type(&self) -> String {
        format!("LogNormal (mean {:.1}, stddev {:.1}, decay {:.2})", self.mean, self.stddev, self.decay)
    }
}
