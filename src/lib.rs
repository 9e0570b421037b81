//! # Dendritic Plateaus
//!
//! `dendritic_plateaus` is a package for building multicompartment models
//! of cortical pyramidal neurons and simulating the dendritic plateau
//! potentials evoked by glutamatergic synaptic input. A cell is assembled
//! from a reconstructed morphology, discretized into iso-potential
//! segments by the d_lambda rule, and parameterized by channel
//! distribution rules that set every conductance density as a function of
//! path distance from the soma. The resulting tree of coupled membrane
//! compartments is integrated with a fully implicit cable
//! step solved by Hines elimination, with Hodgkin-Huxley form gating
//! kinetics advanced in a staggered half step.
//!
//! Two morphology variants ship with the package: the full 85 section
//! reconstruction (stored as a versioned JSON data file) and a reduced
//! 7 compartment variant, both flowing through the same distribution
//! rules with their own parameter presets. NMDA receptor kinetics are a
//! swappable strategy so the different formulations used across
//! experiments can be compared without rewiring the model.
//!
//! ## Example Code
//!
//! ### Plateau potentials from a glutamatergic synapse pool
//!
//! ```rust
//! use dendritic_plateaus::cell::{CellConfig, CellInstance};
//! use dendritic_plateaus::error::DendriticPlateausError;
//! use dendritic_plateaus::report::RunReport;
//! use dendritic_plateaus::simulation::Simulation;
//! use dendritic_plateaus::synapse::{
//!     AmpaSynapse, NetConnection, NmdaSynapse, PulseNmda, PulseSource,
//! };
//!
//! /// Places an AMPA/NMDA pool along one basal branch, runs the cell to
//! /// 1000 ms, and packages the recordings into the experiment document
//! ///
//! /// - `ampa_count` / `nmda_count` : pool sizes spread over `[0.4, 0.7]`
//! ///
//! /// - `beta` / `cdur` : per-instance NMDA kinetic overrides
//! ///
//! /// - `weight` : synaptic weight shared by both receptor classes
//! pub fn glutamate_pool_experiment(
//!     ampa_count: usize,
//!     nmda_count: usize,
//!     beta: f64,
//!     cdur: f64,
//!     weight: f64,
//! ) -> Result<RunReport, DendriticPlateausError> {
//!     let cell = CellInstance::new(CellConfig::full())?;
//!
//!     let soma = cell.target("soma[2]", 0.5)?;
//!     let dend = cell.target("basal[34]", 0.5)?;
//!
//!     let mut simulation = Simulation::new(cell);
//!
//!     // one deterministic event drives every synapse in the pool
//!     let source = PulseSource::single(60.);
//!     let connection = NetConnection { delay: 10., weight };
//!
//!     for i in 0..ampa_count {
//!         let x = 0.4 + 0.3 * i as f64 / (ampa_count - 1).max(1) as f64;
//!         let location = simulation.cell().target("basal[34]", x)?;
//!         let mut synapse = AmpaSynapse::new(location, 0.2);
//!         synapse.connect(&source, connection);
//!         simulation.attach(Box::new(synapse))?;
//!     }
//!     for i in 0..nmda_count {
//!         let x = 0.4 + 0.3 * i as f64 / (nmda_count - 1).max(1) as f64;
//!         let location = simulation.cell().target("basal[34]", x)?;
//!         let mut synapse = NmdaSynapse::new(location, 0.1, PulseNmda::new(beta, cdur));
//!         synapse.connect(&source, connection);
//!         simulation.attach(Box::new(synapse))?;
//!     }
//!
//!     simulation.record_voltage("soma/voltage", soma)?;
//!     simulation.record_voltage("basal_34/voltage_0.5", dend)?;
//!
//!     simulation.init();
//!     let result = simulation.run(1000.)?;
//!
//!     let mut report = RunReport::new();
//!     report.set_count("AMPA", "num", ampa_count);
//!     report.set_param("AMPA", "weight", weight);
//!     report.set_count("NMDA", "num", nmda_count);
//!     report.set_param("NMDA", "weight", weight);
//!     report.set_param("NMDA", "Beta", beta);
//!     report.set_param("NMDA", "Cdur", cdur);
//!     report.set_recording(&result);
//!
//!     Ok(report)
//! }
//! ```
//!
//! ### Step current characterization with an experimental manipulation
//!
//! ```rust
//! use dendritic_plateaus::cell::{CellConfig, CellInstance};
//! use dendritic_plateaus::error::DendriticPlateausError;
//! use dendritic_plateaus::simulation::{count_spikes, Simulation};
//! use dendritic_plateaus::stimulus::CurrentClamp;
//!
//! /// Injects a somatic current step, optionally under TTX, and counts
//! /// the evoked spikes from the recorded somatic voltage
//! pub fn step_response(
//!     amplitude: f64,
//!     ttx: bool,
//! ) -> Result<usize, DendriticPlateausError> {
//!     let cell = CellInstance::new(CellConfig::reduced())?;
//!     let soma = cell.target("soma", 0.5)?;
//!
//!     let mut simulation = Simulation::new(cell);
//!     if ttx {
//!         // zeroing sodium is idempotent, applying it twice is a no-op
//!         simulation.cell_mut().ttx();
//!     }
//!
//!     simulation.attach(Box::new(CurrentClamp::new(soma, amplitude, 100., 500.)))?;
//!     simulation.record_voltage("soma/voltage", soma)?;
//!
//!     simulation.init();
//!     let result = simulation.run(800.)?;
//!
//!     let trace = result.trace("soma/voltage").unwrap_or(&[]);
//!     Ok(count_spikes(trace, 0.))
//! }
//! ```
//!
//! ### Sweeping synaptic weight over isolated parallel runs
//!
//! ```rust
//! use dendritic_plateaus::batch::run_sweep;
//! use dendritic_plateaus::cell::{CellConfig, CellInstance};
//! use dendritic_plateaus::error::DendriticPlateausError;
//! use dendritic_plateaus::simulation::{RunResult, Simulation};
//! use dendritic_plateaus::synapse::{AmpaSynapse, NetConnection, PulseSource};
//!
//! /// Runs one fully isolated simulation per synaptic weight; each job
//! /// owns its cell, so no channel parameter state is shared between
//! /// concurrent runs
//! pub fn weight_sweep(weights: Vec<f64>) -> Vec<Result<RunResult, DendriticPlateausError>> {
//!     run_sweep(weights, |weight| {
//!         let cell = CellInstance::new(CellConfig::reduced())?;
//!         let dend = cell.target("Bdend1", 0.5)?;
//!
//!         let mut simulation = Simulation::new(cell);
//!         let mut synapse = AmpaSynapse::new(dend, 0.2);
//!         synapse.connect(&PulseSource::single(60.), NetConnection { delay: 10., weight });
//!         simulation.attach(Box::new(synapse))?;
//!         simulation.record_voltage("dend/voltage", dend)?;
//!
//!         simulation.init();
//!         Ok(simulation.run(400.)?)
//!     })
//! }
//! ```

pub mod batch;
pub mod cell;
pub mod distribution;
pub mod error;
pub mod mechanisms;
pub mod morphology;
pub mod report;
pub mod simulation;
pub mod stimulus;
pub mod synapse;
