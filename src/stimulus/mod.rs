//! Current and voltage clamp point processes used by the characterization
//! protocols (step responses, I-V curves, back-propagation experiments).

use point_process_traits::PointProcessBase;
use crate::cell::SectionTarget;
use crate::synapse::{InstantaneousCurrent, Located, PointProcess, SynapticDrive};


/// A step current clamp: a fixed amplitude injected over one window
#[derive(Debug, Clone, PointProcessBase)]
pub struct CurrentClamp {
    /// Attachment location
    pub location: SectionTarget,
    /// Injected amplitude (nA, positive depolarizing)
    pub amplitude: f64,
    /// Onset time (ms)
    pub onset: f64,
    /// Duration (ms)
    pub duration: f64,
    /// Most recent current (nA)
    current: f64,
}

impl CurrentClamp {
    pub fn new(location: SectionTarget, amplitude: f64, onset: f64, duration: f64) -> Self {
        CurrentClamp { location, amplitude, onset, duration, current: 0. }
    }

    fn active(&self, t: f64) -> bool {
        t >= self.onset && t < self.onset + self.duration
    }
}

impl PointProcess for CurrentClamp {
    fn init(&mut self) {
        self.current = 0.;
    }

    fn advance(&mut self, t: f64, _dt: f64, _v: f64) -> SynapticDrive {
        let injected = if self.active(t) { self.amplitude } else { 0. };
        self.current = -injected;

        SynapticDrive { conductance: 0., reversal: 0., injected }
    }

    fn update_current(&mut self, _v: f64) {}
}

/// A three phase series resistance voltage clamp: holds `level1` for
/// `duration1` ms, then `level2`, then `level3`
#[derive(Debug, Clone, PointProcessBase)]
pub struct VoltageClamp {
    /// Attachment location
    pub location: SectionTarget,
    /// Series resistance (MΩ), should be much smaller than the cell's
    /// input resistance
    pub series_resistance: f64,
    /// Command levels (mV)
    pub levels: [f64; 3],
    /// Phase durations (ms)
    pub durations: [f64; 3],
    /// Command level active during the current step (mV)
    active_level: Option<f64>,
    /// Most recent clamp current (nA)
    current: f64,
}

impl VoltageClamp {
    pub fn new(location: SectionTarget, levels: [f64; 3], durations: [f64; 3]) -> Self {
        VoltageClamp {
            location,
            series_resistance: 0.01,
            levels,
            durations,
            active_level: None,
            current: 0.,
        }
    }

    /// The command potential at time `t`, `None` once all phases elapsed
    fn command(&self, t: f64) -> Option<f64> {
        let mut elapsed = 0.;
        for (level, duration) in self.levels.iter().zip(self.durations.iter()) {
            elapsed += duration;
            if t < elapsed {
                return Some(*level);
            }
        }

        None
    }
}

impl PointProcess for VoltageClamp {
    fn init(&mut self) {
        self.active_level = None;
        self.current = 0.;
    }

    fn advance(&mut self, t: f64, _dt: f64, _v: f64) -> SynapticDrive {
        self.active_level = self.command(t);

        match self.active_level {
            Some(level) => SynapticDrive {
                conductance: 1. / self.series_resistance,
                reversal: level,
                injected: 0.,
            },
            None => SynapticDrive::default(),
        }
    }

    fn update_current(&mut self, v: f64) {
        // the clamp current is what the amplifier sources through the
        // series resistance to hold the commanded level
        self.current = match self.active_level {
            Some(level) => (v - level) / self.series_resistance,
            None => 0.,
        };
    }
}
