//! Conductance based synaptic point processes: AMPA kinetics, a pluggable
//! family of NMDA kinetic schemes, and the deterministic event plumbing
//! that drives them.
//!
//! The NMDA schemes the experiments treat as interchangeable are exposed
//! through the [`NmdaKinetics`] trait so a synapse can swap formulations
//! without rewiring anything else.

use point_process_traits::PointProcessBase;
use crate::cell::SectionTarget;


/// Gets the attachment location of a point process
pub trait Located {
    fn location(&self) -> SectionTarget;
}

/// Gets the most recently computed current of a point process (nA,
/// positive outward)
pub trait InstantaneousCurrent {
    fn current(&self) -> f64;
}

/// Contribution of a point process to one implicit voltage step: an ohmic
/// conductance towards a reversal potential plus a directly injected
/// current
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SynapticDrive {
    /// Conductance (µS)
    pub conductance: f64,
    /// Reversal potential of the conductance (mV)
    pub reversal: f64,
    /// Directly injected current (nA, positive depolarizing)
    pub injected: f64,
}

/// A stimulus or synapse attached at one location of the tree
pub trait PointProcess: Located + InstantaneousCurrent + Send {
    /// Resets all internal state before a run
    fn init(&mut self);
    /// Advances internal state over `[t, t + dt]` given the local membrane
    /// potential at `t` and returns the drive for the implicit voltage step
    fn advance(&mut self, t: f64, dt: f64, v: f64) -> SynapticDrive;
    /// Stores the instantaneous current given the freshly solved membrane
    /// potential
    fn update_current(&mut self, v: f64);
}

/// A deterministic spike event source, a single pulse by default with
/// optional regular repeats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSource {
    /// Time of the first event (ms)
    pub start: f64,
    /// Number of events
    pub number: usize,
    /// Interval between events (ms)
    pub interval: f64,
}

impl PulseSource {
    /// A single event at `start`
    pub fn single(start: f64) -> Self {
        PulseSource { start, number: 1, interval: 20. }
    }

    /// The ordered event times (ms)
    pub fn times(&self) -> Vec<f64> {
        (0..self.number).map(|i| self.start + i as f64 * self.interval).collect()
    }
}

/// Delay and weight carried by one connection from an event source to a
/// synapse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetConnection {
    /// Propagation delay (ms)
    pub delay: f64,
    /// Synaptic weight, scales the maximal conductance
    pub weight: f64,
}

/// Sorted pending event times with a cursor, shared by every synapse type
#[derive(Debug, Clone, Default)]
struct EventQueue {
    times: Vec<f64>,
    cursor: usize,
}

impl EventQueue {
    fn push_from(&mut self, source: &PulseSource, delay: f64) {
        for time in source.times() {
            self.times.push(time + delay);
        }
        self.times.sort_by(|a, b| a.partial_cmp(b).unwrap());
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Pops every event with time in `(t, t + dt]`
    fn due(&mut self, t: f64, dt: f64) -> Option<f64> {
        if self.cursor < self.times.len() && self.times[self.cursor] <= t + dt {
            let time = self.times[self.cursor];
            self.cursor += 1;
            Some(time)
        } else {
            None
        }
    }
}

/// Voltage dependent magnesium block of the NMDA receptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MgBlock {
    /// Extracellular magnesium concentration (mM)
    pub mg: f64,
}

impl Default for MgBlock {
    fn default() -> Self {
        MgBlock { mg: 1.5 }
    }
}

impl MgBlock {
    /// Fraction of unblocked receptors at membrane potential `v` (mV)
    pub fn factor(&self, v: f64) -> f64 {
        1. / (1. + (-0.062 * v).exp() * self.mg / 3.57)
    }
}

/// First order transmitter pulse binding scheme: while transmitter is in
/// the cleft the open fraction relaxes towards its bound steady state,
/// afterwards it unbinds exponentially
#[derive(Debug, Clone, Copy)]
struct PulseBinding {
    /// Forward binding rate (mM⁻¹ ms⁻¹)
    alpha: f64,
    /// Unbinding rate (ms⁻¹)
    beta: f64,
    /// Transmitter pulse duration (ms)
    cdur: f64,
    /// Transmitter pulse concentration (mM)
    cmax: f64,
    /// Open fraction
    r: f64,
    /// End of the current transmitter pulse (ms)
    active_until: f64,
}

impl PulseBinding {
    fn new(alpha: f64, beta: f64, cdur: f64) -> Self {
        PulseBinding { alpha, beta, cdur, cmax: 1., r: 0., active_until: f64::NEG_INFINITY }
    }

    fn init(&mut self) {
        self.r = 0.;
        self.active_until = f64::NEG_INFINITY;
    }

    fn on_event(&mut self, time: f64) {
        self.active_until = self.active_until.max(time + self.cdur);
    }

    fn advance(&mut self, t: f64, dt: f64) -> f64 {
        if t < self.active_until {
            let bound = self.alpha * self.cmax;
            let rinf = bound / (bound + self.beta);
            let tau = 1. / (bound + self.beta);
            self.r += (1. - (-dt / tau).exp()) * (rinf - self.r);
        } else {
            self.r *= (-self.beta * dt).exp();
        }

        self.r
    }
}

/// NMDA receptor kinetics as a swappable strategy
pub trait NmdaKinetics: Clone + Send {
    /// Resets all internal state before a run
    fn init(&mut self);
    /// Registers a transmitter delivery at `time` (ms)
    fn on_event(&mut self, time: f64);
    /// Advances the scheme over `[t, t + dt]`, returns the open fraction
    fn advance(&mut self, t: f64, dt: f64) -> f64;
}

/// Two state transmitter pulse NMDA scheme with fast binding and a short
/// pulse, the model the plateau experiments parameterize through `beta`
/// and `cdur`
#[derive(Debug, Clone, Copy)]
pub struct PulseNmda {
    binding: PulseBinding,
}

impl PulseNmda {
    /// Per-instance kinetic overrides: `beta` is the unbinding rate
    /// (ms⁻¹), `cdur` the transmitter pulse duration (ms)
    pub fn new(beta: f64, cdur: f64) -> Self {
        PulseNmda { binding: PulseBinding::new(4., beta, cdur) }
    }
}

impl Default for PulseNmda {
    fn default() -> Self {
        PulseNmda::new(0.015, 1.)
    }
}

impl NmdaKinetics for PulseNmda {
    fn init(&mut self) {
        self.binding.init();
    }

    fn on_event(&mut self, time: f64) {
        self.binding.on_event(time);
    }

    fn advance(&mut self, t: f64, dt: f64) -> f64 {
        self.binding.advance(t, dt)
    }
}

/// Slow unbinding, long pulse NMDA scheme that saturates towards a
/// sustained plateau conductance
#[derive(Debug, Clone, Copy)]
pub struct SaturatingPulseNmda {
    binding: PulseBinding,
}

impl SaturatingPulseNmda {
    pub fn new(beta: f64, cdur: f64) -> Self {
        SaturatingPulseNmda { binding: PulseBinding::new(0.5, beta, cdur) }
    }
}

impl Default for SaturatingPulseNmda {
    fn default() -> Self {
        SaturatingPulseNmda::new(0.02, 10.)
    }
}

impl NmdaKinetics for SaturatingPulseNmda {
    fn init(&mut self) {
        self.binding.init();
    }

    fn on_event(&mut self, time: f64) {
        self.binding.on_event(time);
    }

    fn advance(&mut self, t: f64, dt: f64) -> f64 {
        self.binding.advance(t, dt)
    }
}

/// Waveform NMDA scheme: a normalized difference of exponentials per
/// delivery, rise 3 ms and decay 70 ms by default
#[derive(Debug, Clone, Copy)]
pub struct DualExponentialNmda {
    /// Rise time constant (ms)
    pub tau_rise: f64,
    /// Decay time constant (ms)
    pub tau_decay: f64,
    rise: f64,
    decay: f64,
    peak_factor: f64,
}

impl DualExponentialNmda {
    pub fn new(tau_rise: f64, tau_decay: f64) -> Self {
        let tp = (tau_rise * tau_decay) / (tau_decay - tau_rise) * (tau_decay / tau_rise).ln();
        let peak_factor = 1. / ((-tp / tau_decay).exp() - (-tp / tau_rise).exp());

        DualExponentialNmda { tau_rise, tau_decay, rise: 0., decay: 0., peak_factor }
    }
}

impl Default for DualExponentialNmda {
    fn default() -> Self {
        DualExponentialNmda::new(3., 70.)
    }
}

impl NmdaKinetics for DualExponentialNmda {
    fn init(&mut self) {
        self.rise = 0.;
        self.decay = 0.;
    }

    fn on_event(&mut self, _time: f64) {
        self.rise += self.peak_factor;
        self.decay += self.peak_factor;
    }

    fn advance(&mut self, _t: f64, dt: f64) -> f64 {
        self.rise *= (-dt / self.tau_rise).exp();
        self.decay *= (-dt / self.tau_decay).exp();

        (self.decay - self.rise).max(0.)
    }
}

/// AMPA receptor synapse with transmitter pulse kinetics
#[derive(Debug, Clone, PointProcessBase)]
pub struct AmpaSynapse {
    /// Attachment location
    pub location: SectionTarget,
    /// Maximal conductance (µS)
    pub gmax: f64,
    /// Reversal potential (mV)
    pub reversal: f64,
    /// Connection weight
    pub weight: f64,
    binding: PulseBinding,
    events: EventQueue,
    /// Most recent current (nA)
    current: f64,
}

impl AmpaSynapse {
    pub fn new(location: SectionTarget, gmax: f64) -> Self {
        AmpaSynapse {
            location,
            gmax,
            reversal: 0.,
            weight: 0.,
            binding: PulseBinding::new(1.1, 0.19, 1.),
            events: EventQueue::default(),
            current: 0.,
        }
    }

    /// Wires a deterministic event source to the synapse
    pub fn connect(&mut self, source: &PulseSource, connection: NetConnection) {
        self.events.push_from(source, connection.delay);
        self.weight = connection.weight;
    }

    /// Conductance at the current open fraction (µS)
    pub fn conductance(&self) -> f64 {
        self.gmax * self.weight * self.binding.r
    }
}

impl PointProcess for AmpaSynapse {
    fn init(&mut self) {
        self.binding.init();
        self.events.reset();
        self.current = 0.;
    }

    fn advance(&mut self, t: f64, dt: f64, _v: f64) -> SynapticDrive {
        while let Some(time) = self.events.due(t, dt) {
            self.binding.on_event(time);
        }
        self.binding.advance(t, dt);

        SynapticDrive {
            conductance: self.conductance(),
            reversal: self.reversal,
            injected: 0.,
        }
    }

    fn update_current(&mut self, v: f64) {
        self.current = self.conductance() * (v - self.reversal);
    }
}

/// NMDA receptor synapse, generic over the kinetic scheme, with the
/// magnesium block applied to whatever open fraction the scheme produces
#[derive(Debug, Clone, PointProcessBase)]
pub struct NmdaSynapse<K: NmdaKinetics> {
    /// Attachment location
    pub location: SectionTarget,
    /// Maximal conductance (µS)
    pub gmax: f64,
    /// Reversal potential (mV)
    pub reversal: f64,
    /// Connection weight
    pub weight: f64,
    /// Kinetic scheme
    pub kinetics: K,
    /// Magnesium block
    pub mg_block: MgBlock,
    events: EventQueue,
    open: f64,
    unblocked: f64,
    /// Most recent current (nA)
    current: f64,
}

impl<K: NmdaKinetics> NmdaSynapse<K> {
    pub fn new(location: SectionTarget, gmax: f64, kinetics: K) -> Self {
        NmdaSynapse {
            location,
            gmax,
            reversal: 0.,
            weight: 0.,
            kinetics,
            mg_block: MgBlock::default(),
            events: EventQueue::default(),
            open: 0.,
            unblocked: 1.,
            current: 0.,
        }
    }

    /// Wires a deterministic event source to the synapse
    pub fn connect(&mut self, source: &PulseSource, connection: NetConnection) {
        self.events.push_from(source, connection.delay);
        self.weight = connection.weight;
    }

    /// Conductance at the current open and unblocked fractions (µS)
    pub fn conductance(&self) -> f64 {
        self.gmax * self.weight * self.open * self.unblocked
    }
}

impl<K: NmdaKinetics> PointProcess for NmdaSynapse<K> {
    fn init(&mut self) {
        self.kinetics.init();
        self.events.reset();
        self.open = 0.;
        self.unblocked = 1.;
        self.current = 0.;
    }

    fn advance(&mut self, t: f64, dt: f64, v: f64) -> SynapticDrive {
        while let Some(time) = self.events.due(t, dt) {
            self.kinetics.on_event(time);
        }
        self.open = self.kinetics.advance(t, dt);
        self.unblocked = self.mg_block.factor(v);

        SynapticDrive {
            conductance: self.conductance(),
            reversal: self.reversal,
            injected: 0.,
        }
    }

    fn update_current(&mut self, v: f64) {
        self.current = self.conductance() * (v - self.reversal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SectionTarget {
        SectionTarget { section: 0, x: 0.5 }
    }

    #[test]
    fn mg_block_relieves_with_depolarization() {
        let block = MgBlock::default();

        assert!(block.factor(-70.) < 0.1);
        assert!(block.factor(0.) > 0.5);
        assert!(block.factor(40.) > block.factor(0.));
    }

    #[test]
    fn ampa_opens_after_its_event_and_decays() {
        let mut synapse = AmpaSynapse::new(target(), 0.2);
        synapse.connect(&PulseSource::single(1.), NetConnection { delay: 0., weight: 1. });
        synapse.init();

        let dt = 0.025;
        let mut t = 0.;
        let mut peak: f64 = 0.;
        while t < 0.9 {
            synapse.advance(t, dt, -65.);
            t += dt;
        }
        assert!(synapse.conductance() < 1e-12, "closed before the event");

        while t < 30. {
            synapse.advance(t, dt, -65.);
            peak = peak.max(synapse.conductance());
            t += dt;
        }

        assert!(peak > 0.05);
        assert!(synapse.conductance() < peak * 0.1, "decays after the pulse");
    }

    #[test]
    fn dual_exponential_peaks_near_unit_amplitude() {
        let mut kinetics = DualExponentialNmda::default();
        kinetics.init();
        kinetics.on_event(0.);

        let dt = 0.025;
        let mut t = 0.;
        let mut peak: f64 = 0.;
        while t < 400. {
            peak = peak.max(kinetics.advance(t, dt));
            t += dt;
        }

        assert!((peak - 1.).abs() < 0.05);
    }

    #[test]
    fn nmda_schemes_are_interchangeable() {
        let source = PulseSource::single(5.);
        let connection = NetConnection { delay: 0., weight: 1. };
        let dt = 0.025;

        fn peak<K: NmdaKinetics>(mut synapse: NmdaSynapse<K>, source: &PulseSource, connection: NetConnection, dt: f64) -> f64 {
            synapse.connect(source, connection);
            synapse.init();
            let mut t = 0.;
            let mut peak: f64 = 0.;
            while t < 300. {
                let drive = synapse.advance(t, dt, -20.);
                peak = peak.max(drive.conductance);
                t += dt;
            }
            peak
        }

        let dms = peak(NmdaSynapse::new(target(), 0.1, PulseNmda::default()), &source, connection, dt);
        let eee = peak(NmdaSynapse::new(target(), 0.1, SaturatingPulseNmda::default()), &source, connection, dt);
        let major = peak(NmdaSynapse::new(target(), 0.1, DualExponentialNmda::default()), &source, connection, dt);

        for peak in [dms, eee, major] {
            assert!(peak > 0., "every scheme conducts after an event");
        }
    }

    #[test]
    fn delayed_events_shift_activation() {
        let mut early = AmpaSynapse::new(target(), 0.2);
        let mut late = AmpaSynapse::new(target(), 0.2);
        let source = PulseSource::single(10.);
        early.connect(&source, NetConnection { delay: 0., weight: 1. });
        late.connect(&source, NetConnection { delay: 15., weight: 1. });
        early.init();
        late.init();

        let dt = 0.025;
        let mut t = 0.;
        while t < 12. {
            early.advance(t, dt, -65.);
            late.advance(t, dt, -65.);
            t += dt;
        }

        assert!(early.conductance() > 0.);
        assert!(late.conductance() < 1e-12);
    }
}
