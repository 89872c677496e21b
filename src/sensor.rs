//! Describes a sensor reading and the transducer behind it.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::settings::SensorSettings;

/// The transducer needs a couple of discarded measurements after power-up.
const WARM_UP_READS: usize = 2;
const WARM_UP_DELAY: Duration = Duration::from_millis(1200);

/// One temperature + humidity sample pair.
///
/// Either component may be NaN when the measurement failed. The pair is only
/// usable downstream when [`Reading::is_valid`] holds.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub temp_c: f64,
    pub rh_pct: f64,
}

impl Reading {
    pub fn new(temp_c: f64, rh_pct: f64) -> Self {
        Self { temp_c, rh_pct }
    }

    pub fn invalid() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// A single failed sub-measurement spoils the whole reading.
    pub fn is_valid(&self) -> bool {
        !self.temp_c.is_nan() && !self.rh_pct.is_nan()
    }
}

/// A physical or simulated transducer.
///
/// `read` performs one bounded measurement. It never retries: callers check
/// [`Reading::is_valid`] and decide what to do with a failure. The transducer
/// tolerates at most ~1 measurement per second, which the scheduler periods
/// respect.
pub trait Sensor: Send {
    fn read(&mut self) -> Reading;
}

/// Host stand-in for the DHT transducer: a slow random walk around the
/// configured base values, with an optional injected fault rate.
pub struct SimulatedDht {
    temp_c: f64,
    rh_pct: f64,
    fault_rate: f64,
    rng: StdRng,
}

impl SimulatedDht {
    pub fn new(settings: &SensorSettings) -> Self {
        Self {
            temp_c: settings.base_temp_c,
            rh_pct: settings.base_rh_pct,
            fault_rate: settings.fault_rate.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
        }
    }

    /// Take and discard the first measurements, as the datasheet asks.
    pub fn warm_up(&mut self) {
        for _ in 0..WARM_UP_READS {
            self.read();
            thread::sleep(WARM_UP_DELAY);
        }
    }
}

impl Sensor for SimulatedDht {
    fn read(&mut self) -> Reading {
        if self.fault_rate > 0.0 && self.rng.gen_bool(self.fault_rate) {
            return Reading::invalid();
        }
        self.temp_c += self.rng.gen_range(-0.05..=0.05);
        self.rh_pct = (self.rh_pct + self.rng.gen_range(-0.2..=0.2)).clamp(0.0, 100.0);
        // The real part reports with one-decimal resolution.
        Reading::new(round_tenth(self.temp_c), round_tenth(self.rh_pct))
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
