//! The cable/reaction integrator: a fully implicit cable step over the
//! section tree with staggered exponential gating updates, solved per step
//! by Hines elimination on the tree structured linear system. The implicit
//! step damps the stiff modes introduced by near zero area nodes that a
//! trapezoid step would leave ringing.
//!
//! A simulation owns its cell, its attached stimuli, and its recorders, so
//! concurrent simulations never share mutable state. One `run` call
//! integrates synchronously to the stop time and returns the full
//! recording set, or fails fast without producing a partial artifact.

use crate::cell::{CellInstance, SectionTarget};
use crate::error::{SimulationError, StimulusError};
use crate::synapse::PointProcess;


/// Lifecycle of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    /// Created, stimuli and recorders may still be attached
    Uninitialized,
    /// Resting state established, ready to run
    Initialized,
    /// A run has completed or failed; re-initialize to step again
    Halted,
}

/// Handle to an attached stimulus, used to record its current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusHandle(usize);

/// What a recorder samples
#[derive(Debug, Clone, Copy)]
enum ProbeTarget {
    /// Membrane potential of the segment at a location (mV)
    Voltage(usize),
    /// Intracellular calcium of the segment at a location (mM)
    Calcium(usize),
    /// Current of an attached stimulus (nA)
    StimulusCurrent(usize),
}

/// A time indexed sample buffer bound to one state variable
#[derive(Debug, Clone)]
struct Recorder {
    label: String,
    target: ProbeTarget,
    samples: Vec<f64>,
}

/// The completed, internally consistent recording set of one run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Sample times (ms)
    pub time: Vec<f64>,
    /// Named traces, each the same length as `time`
    pub traces: Vec<(String, Vec<f64>)>,
    /// Number of integration steps taken
    pub steps: usize,
}

impl RunResult {
    /// Looks up a trace by label
    pub fn trace(&self, label: &str) -> Option<&[f64]> {
        self.traces.iter()
            .find(|(name, _)| name == label)
            .map(|(_, samples)| samples.as_slice())
    }
}

/// A synchronous, single threaded integration of one cell with its
/// attached stimuli
pub struct Simulation {
    cell: CellInstance,
    status: SimulationStatus,
    /// Timestep (ms)
    dt: f64,
    /// Uniform initial membrane potential (mV)
    v_init: f64,
    /// Sample every n-th step
    decimation: usize,
    time: f64,
    steps: usize,
    /// Membrane potential per segment (mV)
    v: Vec<f64>,
    stimuli: Vec<Box<dyn PointProcess>>,
    stimulus_segments: Vec<usize>,
    recorders: Vec<Recorder>,
    time_samples: Vec<f64>,
    // tree solve topology and workspace
    parent: Vec<Option<usize>>,
    /// Axial conductance to the parent segment (µS)
    g_axial: Vec<f64>,
    /// Membrane capacitance per segment (nF)
    capacitance: Vec<f64>,
    diag: Vec<f64>,
    rhs: Vec<f64>,
    g_syn: Vec<f64>,
    ge_syn: Vec<f64>,
    i_inj: Vec<f64>,
}

impl Simulation {
    /// Wraps a cell for integration; the timestep and initial potential
    /// default to 0.025 ms and the preset's tuned resting potential
    pub fn new(cell: CellInstance) -> Self {
        let n = cell.segment_len();
        let v_init = cell.config().preset.v_init;

        let mut parent = Vec::with_capacity(n);
        let mut g_axial = Vec::with_capacity(n);
        for i in 0..n {
            match cell.axial_link(i) {
                Some((p, resistance)) => {
                    parent.push(Some(p));
                    g_axial.push(1. / resistance);
                }
                None => {
                    parent.push(None);
                    g_axial.push(0.);
                }
            }
        }

        Simulation {
            cell,
            status: SimulationStatus::Uninitialized,
            dt: 0.025,
            v_init,
            decimation: 1,
            time: 0.,
            steps: 0,
            v: vec![0.; n],
            stimuli: Vec::new(),
            stimulus_segments: Vec::new(),
            recorders: Vec::new(),
            time_samples: Vec::new(),
            parent,
            g_axial,
            capacitance: vec![0.; n],
            diag: vec![0.; n],
            rhs: vec![0.; n],
            g_syn: vec![0.; n],
            ge_syn: vec![0.; n],
            i_inj: vec![0.; n],
        }
    }

    /// Overrides the timestep (ms)
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Overrides the uniform initial membrane potential (mV)
    pub fn with_v_init(mut self, v_init: f64) -> Self {
        self.v_init = v_init;
        self
    }

    /// Samples recorders every `every` steps instead of every step
    pub fn with_decimation(mut self, every: usize) -> Self {
        self.decimation = every.max(1);
        self
    }

    /// The wrapped cell
    pub fn cell(&self) -> &CellInstance {
        &self.cell
    }

    /// Mutable access for pre-run manipulations such as TTX
    pub fn cell_mut(&mut self) -> &mut CellInstance {
        &mut self.cell
    }

    /// Current lifecycle state
    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    /// Simulated time (ms)
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Attaches a stimulus or synapse; rejected once initialized since
    /// mechanism insertion changes segment state layout
    pub fn attach(&mut self, process: Box<dyn PointProcess>) -> Result<StimulusHandle, StimulusError> {
        if self.status != SimulationStatus::Uninitialized {
            return Err(StimulusError::AttachAfterInit);
        }

        let location = process.location();
        let segment = self.resolve(location)?;

        self.stimuli.push(process);
        self.stimulus_segments.push(segment);

        Ok(StimulusHandle(self.stimuli.len() - 1))
    }

    /// Registers a voltage recorder at a location
    pub fn record_voltage(&mut self, label: &str, target: SectionTarget) -> Result<(), StimulusError> {
        if self.status != SimulationStatus::Uninitialized {
            return Err(StimulusError::AttachAfterInit);
        }
        let segment = self.resolve(target)?;

        self.recorders.push(Recorder {
            label: label.to_string(),
            target: ProbeTarget::Voltage(segment),
            samples: Vec::new(),
        });

        Ok(())
    }

    /// Registers an intracellular calcium recorder at a location
    pub fn record_calcium(&mut self, label: &str, target: SectionTarget) -> Result<(), StimulusError> {
        if self.status != SimulationStatus::Uninitialized {
            return Err(StimulusError::AttachAfterInit);
        }
        let segment = self.resolve(target)?;

        self.recorders.push(Recorder {
            label: label.to_string(),
            target: ProbeTarget::Calcium(segment),
            samples: Vec::new(),
        });

        Ok(())
    }

    /// Registers a recorder for the current of an attached stimulus
    pub fn record_stimulus_current(&mut self, label: &str, handle: StimulusHandle) -> Result<(), StimulusError> {
        if self.status != SimulationStatus::Uninitialized {
            return Err(StimulusError::AttachAfterInit);
        }

        self.recorders.push(Recorder {
            label: label.to_string(),
            target: ProbeTarget::StimulusCurrent(handle.0),
            samples: Vec::new(),
        });

        Ok(())
    }

    fn resolve(&self, target: SectionTarget) -> Result<usize, StimulusError> {
        if target.section >= self.cell.morphology().len() {
            return Err(StimulusError::UnknownSection(format!("#{}", target.section)));
        }
        if !(0. ..=1.).contains(&target.x) || target.x.is_nan() {
            let name = self.cell.morphology().section(target.section).name.clone();
            return Err(StimulusError::LocationOutOfRange(name, target.x));
        }

        Ok(self.cell.segment_at(target))
    }

    /// Establishes the resting state: uniform `v_init`, every gating
    /// variable and calcium pool at steady state, stimuli and recorders
    /// reset
    pub fn init(&mut self) {
        let v_init = self.v_init;

        for (i, segment) in self.cell.segments_mut().iter_mut().enumerate() {
            segment.mechanisms.init(v_init);
            self.v[i] = v_init;
            self.capacitance[i] = segment.cm * segment.area * 1e-5;
        }
        for process in self.stimuli.iter_mut() {
            process.init();
        }
        for recorder in self.recorders.iter_mut() {
            recorder.samples.clear();
        }
        self.time_samples.clear();
        self.time = 0.;
        self.steps = 0;
        self.status = SimulationStatus::Initialized;

        log::debug!("simulation initialized at {} mV", v_init);
    }

    /// Integrates synchronously until `t_stop` (ms) and returns the full
    /// recording set; a divergence aborts the run with no partial output
    pub fn run(&mut self, t_stop: f64) -> Result<RunResult, SimulationError> {
        match self.status {
            SimulationStatus::Uninitialized => return Err(SimulationError::NotInitialized),
            SimulationStatus::Halted => return Err(SimulationError::AlreadyHalted),
            SimulationStatus::Initialized => {}
        }
        if t_stop <= self.time {
            self.status = SimulationStatus::Halted;
            return Err(SimulationError::InvalidStopTime(t_stop));
        }

        self.sample();

        while self.time < t_stop - 1e-9 {
            self.step()?;

            if self.steps % self.decimation == 0 {
                self.sample();
            }
        }

        self.status = SimulationStatus::Halted;

        log::debug!("run complete: {} steps to {} ms", self.steps, self.time);

        Ok(RunResult {
            time: self.time_samples.clone(),
            traces: self.recorders.iter()
                .map(|recorder| (recorder.label.clone(), recorder.samples.clone()))
                .collect(),
            steps: self.steps,
        })
    }

    /// One implicit step over the whole tree
    fn step(&mut self) -> Result<(), SimulationError> {
        let dt = self.dt;
        let n = self.v.len();

        // stimulus drives at the pre-step voltage
        self.g_syn.iter_mut().for_each(|g| *g = 0.);
        self.ge_syn.iter_mut().for_each(|ge| *ge = 0.);
        self.i_inj.iter_mut().for_each(|i| *i = 0.);
        for (process, segment) in self.stimuli.iter_mut().zip(self.stimulus_segments.iter()) {
            let drive = process.advance(self.time, dt, self.v[*segment]);
            self.g_syn[*segment] += drive.conductance;
            self.ge_syn[*segment] += drive.conductance * drive.reversal;
            self.i_inj[*segment] += drive.injected;
        }

        // gating variables advance at the pre-step voltage, then the
        // membrane is treated as ohmic over the implicit voltage solve
        for (i, segment) in self.cell.segments_mut().iter_mut().enumerate() {
            segment.mechanisms.advance_gates(self.v[i], dt);

            let (g_density, ge_density) = segment.mechanisms.conductance_totals();
            // S/cm² over µm² to µS
            let g_total = g_density * segment.area * 1e-2 + self.g_syn[i];
            let ge_total = ge_density * segment.area * 1e-2 + self.ge_syn[i];

            let c_dt = self.capacitance[i] / dt;
            self.diag[i] = c_dt + g_total;
            self.rhs[i] = c_dt * self.v[i] + ge_total + self.i_inj[i];
        }

        // axial coupling, fully implicit
        for i in 0..n {
            if let Some(p) = self.parent[i] {
                self.diag[i] += self.g_axial[i];
                self.diag[p] += self.g_axial[i];
            }
        }

        // Hines elimination: children fold into parents, then back
        // substitute from the root
        for i in (1..n).rev() {
            if let Some(p) = self.parent[i] {
                let a = -self.g_axial[i];
                let factor = a / self.diag[i];
                self.diag[p] -= factor * a;
                self.rhs[p] -= factor * self.rhs[i];
            }
        }
        self.v[0] = self.rhs[0] / self.diag[0];
        for i in 1..n {
            if let Some(p) = self.parent[i] {
                let a = -self.g_axial[i];
                self.v[i] = (self.rhs[i] - a * self.v[p]) / self.diag[i];
            } else {
                self.v[i] = self.rhs[i] / self.diag[i];
            }
        }

        self.time += dt;
        self.steps += 1;

        // divergence is a run failure, not a corrupt recording
        if self.v.iter().any(|v| !v.is_finite()) {
            self.status = SimulationStatus::Halted;
            return Err(SimulationError::Diverged { time_ms: self.time });
        }

        // calcium pools and stimulus currents follow the solved voltage
        for (i, segment) in self.cell.segments_mut().iter_mut().enumerate() {
            segment.mechanisms.advance_calcium(self.v[i], dt);
        }
        for (process, segment) in self.stimuli.iter_mut().zip(self.stimulus_segments.iter()) {
            process.update_current(self.v[*segment]);
        }

        Ok(())
    }

    fn sample(&mut self) {
        self.time_samples.push(self.time);

        for recorder in self.recorders.iter_mut() {
            let value = match recorder.target {
                ProbeTarget::Voltage(segment) => self.v[segment],
                ProbeTarget::Calcium(segment) => {
                    self.cell.segments()[segment].mechanisms.ca_pool
                        .as_ref()
                        .map(|pool| pool.ca)
                        .unwrap_or(0.)
                }
                ProbeTarget::StimulusCurrent(index) => self.stimuli[index].current(),
            };
            recorder.samples.push(value);
        }
    }
}

/// Returns the indices of local maxima above `min_height` in a voltage
/// trace
pub fn find_peaks(voltages: &[f64], min_height: f64) -> Vec<usize> {
    let mut peaks = Vec::new();

    for i in 1..voltages.len().saturating_sub(1) {
        if voltages[i] > min_height
            && voltages[i] >= voltages[i - 1]
            && voltages[i] > voltages[i + 1]
        {
            peaks.push(i);
        }
    }

    peaks
}

/// Counts upward crossings of `threshold`, the spike count measure the
/// downstream analysis recomputes from raw traces
pub fn count_spikes(voltages: &[f64], threshold: f64) -> usize {
    let mut count = 0;
    let mut above = voltages.first().map(|v| *v > threshold).unwrap_or(false);

    for v in voltages.iter().skip(1) {
        if *v > threshold && !above {
            count += 1;
        }
        above = *v > threshold;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_and_spikes_are_found_in_synthetic_traces() {
        let trace: Vec<f64> = (0..200)
            .map(|i| {
                let t = i as f64 * 0.1;
                -65. + 80. * (-((t - 5.).powi(2)) / 0.5).exp()
                    + 80. * (-((t - 12.).powi(2)) / 0.5).exp()
            })
            .collect();

        assert_eq!(count_spikes(&trace, 0.), 2);
        assert_eq!(find_peaks(&trace, 0.).len(), 2);
    }

    #[test]
    fn flat_traces_have_no_spikes() {
        let trace = vec![-65.; 1000];

        assert_eq!(count_spikes(&trace, 0.), 0);
        assert!(find_peaks(&trace, 0.).is_empty());
    }
}
