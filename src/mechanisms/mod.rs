//! Voltage and calcium gated membrane mechanisms: gating variable kinetics,
//! the conductance families distributed over the dendritic tree, and the
//! intracellular calcium pool they couple through.
//!
//! Every mechanism instance owns its full parameter copy, only the
//! distribution rules that set densities are shared across segments, so
//! multiple cells with different kinetic settings can coexist in one process.

/// Faraday constant (C/mol)
const FARADAY: f64 = 96485.309;
/// Gas constant (J/(mol K))
const GAS_CONSTANT: f64 = 8.315;

/// `x / (exp(x / k) - 1)` with the removable singularity at `x = 0` patched
/// to its limit `k`, the shape shared by several opening rate laws
fn exp_ratio(x: f64, k: f64) -> f64 {
    if (x / k).abs() < 1e-6 {
        k * (1. - x / (2. * k))
    } else {
        x / ((x / k).exp() - 1.)
    }
}

/// Rate adjustment for running kinetics away from their reference temperature
fn temperature_adjustment(q10: f64, celsius: f64, reference: f64) -> f64 {
    q10.powf((celsius - reference) / 10.)
}

/// A first order gating variable relaxing towards its voltage dependent
/// steady state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gate {
    /// Current open fraction (0 to 1)
    pub state: f64,
}

impl Gate {
    /// Sets the gate to its steady state value
    pub fn init(&mut self, inf: f64) {
        self.state = inf;
    }

    /// Relaxes the gate towards `inf` over one timestep with the exact
    /// exponential update, stable for any `dt`
    pub fn advance(&mut self, inf: f64, tau: f64, dt: f64) {
        if tau <= 0. {
            self.state = inf;
        } else {
            self.state += (1. - (-dt / tau).exp()) * (inf - self.state);
        }
    }
}

/// Transient sodium channel, Mainen style trapezoid rate laws with a global
/// activation shift and per-instance inactivation half voltages (the axon
/// initial segment runs with lowered inactivation thresholds)
#[derive(Debug, Clone)]
pub struct NaChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Sodium reversal potential (mV)
    pub reversal: f64,
    /// Uniform activation shift (mV)
    pub vshift: f64,
    /// Inactivation opening rate half voltage (mV)
    pub thi1: f64,
    /// Inactivation closing rate half voltage (mV)
    pub thi2: f64,
    /// Temperature rate adjustment
    tadj: f64,
    /// Activation gate
    pub m: Gate,
    /// Inactivation gate
    pub h: Gate,
}

impl NaChannel {
    const THA: f64 = -35.;
    const QA: f64 = 9.;
    const RA: f64 = 0.182;
    const RB: f64 = 0.124;
    const QI: f64 = 5.;
    const RD: f64 = 0.024;
    const RG: f64 = 0.0091;
    const THINF: f64 = -65.;
    const QINF: f64 = 6.2;

    pub fn new(gbar: f64, reversal: f64, vshift: f64, celsius: f64) -> Self {
        NaChannel {
            gbar,
            reversal,
            vshift,
            thi1: -50.,
            thi2: -75.,
            tadj: temperature_adjustment(2.3, celsius, 23.),
            m: Gate::default(),
            h: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64, f64, f64) {
        let vm = v + self.vshift;

        let am = Self::RA * exp_ratio(-(vm - Self::THA), Self::QA);
        let bm = Self::RB * exp_ratio(vm - Self::THA, Self::QA);
        let minf = am / (am + bm);
        let taum = 1. / (self.tadj * (am + bm));

        let ah = Self::RD * exp_ratio(-(vm - self.thi1), Self::QI);
        let bh = Self::RG * exp_ratio(vm - self.thi2, Self::QI);
        let hinf = 1. / (1. + ((vm - Self::THINF) / Self::QINF).exp());
        let tauh = 1. / (self.tadj * (ah + bh));

        (minf, taum, hinf, tauh)
    }

    pub fn init(&mut self, v: f64) {
        let (minf, _, hinf, _) = self.rates(v);
        self.m.init(minf);
        self.h.init(hinf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (minf, taum, hinf, tauh) = self.rates(v);
        self.m.advance(minf, taum, dt);
        self.h.advance(hinf, tauh, dt);
    }

    /// Conductance density at the current gate states (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.tadj * self.gbar * self.m.state.powi(3) * self.h.state
    }
}

/// Delayed rectifier potassium channel
#[derive(Debug, Clone)]
pub struct KvChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Potassium reversal potential (mV)
    pub reversal: f64,
    tadj: f64,
    /// Activation gate
    pub n: Gate,
}

impl KvChannel {
    const THA: f64 = 25.;
    const QA: f64 = 9.;
    const RA: f64 = 0.02;
    const RB: f64 = 0.002;

    pub fn new(gbar: f64, reversal: f64, celsius: f64) -> Self {
        KvChannel {
            gbar,
            reversal,
            tadj: temperature_adjustment(2.3, celsius, 23.),
            n: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64) {
        let an = Self::RA * exp_ratio(-(v - Self::THA), Self::QA);
        let bn = Self::RB * exp_ratio(v - Self::THA, Self::QA);

        (an / (an + bn), 1. / (self.tadj * (an + bn)))
    }

    pub fn init(&mut self, v: f64) {
        let (ninf, _) = self.rates(v);
        self.n.init(ninf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (ninf, taun) = self.rates(v);
        self.n.advance(ninf, taun, dt);
    }

    /// Conductance density at the current gate state (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.tadj * self.gbar * self.n.state
    }
}

/// Kinetic parameter set for an A-type potassium channel population
#[derive(Debug, Clone, Copy)]
pub struct KaParams {
    /// Activation half voltage (mV)
    pub vhalfn: f64,
    /// Inactivation half voltage (mV)
    pub vhalfl: f64,
    /// Activation rate scale
    pub a0n: f64,
    /// Activation valence
    pub zetan: f64,
    /// Activation gating asymmetry
    pub gmn: f64,
    /// Minimum activation time constant (ms)
    pub nmin: f64,
    /// Minimum inactivation time constant (ms)
    pub lmin: f64,
}

impl KaParams {
    /// Proximal ("kap") kinetics, dominant near the soma
    pub fn proximal() -> Self {
        KaParams {
            vhalfn: 11.,
            vhalfl: -56.,
            a0n: 0.05,
            zetan: -1.5,
            gmn: 0.55,
            nmin: 0.1,
            lmin: 2.,
        }
    }

    /// Distal ("kad") kinetics, taking over along the dendrite
    pub fn distal() -> Self {
        KaParams {
            vhalfn: -1.,
            vhalfl: -56.,
            a0n: 0.1,
            zetan: -1.8,
            gmn: 0.39,
            nmin: 0.2,
            lmin: 2.,
        }
    }
}

/// A-type potassium channel, Migliore style thermodynamic rate laws,
/// instantiated with either the proximal or the distal parameter set
#[derive(Debug, Clone)]
pub struct KaChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Potassium reversal potential (mV)
    pub reversal: f64,
    /// Kinetic parameter set
    pub params: KaParams,
    /// Thermodynamic voltage scale (1/mV)
    qfact: f64,
    /// Temperature rate adjustment
    qt: f64,
    /// Activation gate
    pub n: Gate,
    /// Inactivation gate
    pub l: Gate,
}

impl KaChannel {
    const ZETAL: f64 = 3.;
    const PW: f64 = -1.;
    const TQ: f64 = -40.;
    const QQ: f64 = 5.;

    pub fn new(gbar: f64, reversal: f64, params: KaParams, celsius: f64) -> Self {
        KaChannel {
            gbar,
            reversal,
            params,
            qfact: 1e-3 * FARADAY / (GAS_CONSTANT * (273.16 + celsius)),
            qt: temperature_adjustment(5., celsius, 24.),
            n: Gate::default(),
            l: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64, f64, f64) {
        let zeta = self.params.zetan + Self::PW / (1. + ((v - Self::TQ) / Self::QQ).exp());
        let alpn = (self.qfact * zeta * (v - self.params.vhalfn)).exp();
        let betn = (self.qfact * zeta * self.params.gmn * (v - self.params.vhalfn)).exp();

        let ninf = 1. / (1. + alpn);
        let taun = (betn / (self.qt * self.params.a0n * (1. + alpn))).max(self.params.nmin);

        let alpl = (self.qfact * Self::ZETAL * (v - self.params.vhalfl)).exp();
        let linf = 1. / (1. + alpl);
        let taul = (0.26 * (v + 50.)).max(self.params.lmin);

        (ninf, taun, linf, taul)
    }

    pub fn init(&mut self, v: f64) {
        let (ninf, _, linf, _) = self.rates(v);
        self.n.init(ninf);
        self.l.init(linf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (ninf, taun, linf, taul) = self.rates(v);
        self.n.advance(ninf, taun, dt);
        self.l.advance(linf, taul, dt);
    }

    /// Conductance density at the current gate states (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.gbar * self.n.state * self.l.state
    }
}

/// High voltage activated calcium channel (m²h)
#[derive(Debug, Clone)]
pub struct CaHvaChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Calcium reversal potential (mV)
    pub reversal: f64,
    /// Uniform activation shift (mV)
    pub vshift: f64,
    tadj: f64,
    /// Activation gate
    pub m: Gate,
    /// Inactivation gate
    pub h: Gate,
}

impl CaHvaChannel {
    pub fn new(gbar: f64, reversal: f64, vshift: f64, celsius: f64) -> Self {
        CaHvaChannel {
            gbar,
            reversal,
            vshift,
            tadj: temperature_adjustment(2.3, celsius, 23.),
            m: Gate::default(),
            h: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64, f64, f64) {
        let vm = v + self.vshift;

        let am = 0.055 * exp_ratio(-27. - vm, 3.8);
        let bm = 0.94 * ((-75. - vm) / 17.).exp();
        let ah = 4.57e-4 * ((-13. - vm) / 50.).exp();
        let bh = 6.5e-3 / (((-15. - vm) / 28.).exp() + 1.);

        (
            am / (am + bm),
            1. / (self.tadj * (am + bm)),
            ah / (ah + bh),
            1. / (self.tadj * (ah + bh)),
        )
    }

    pub fn init(&mut self, v: f64) {
        let (minf, _, hinf, _) = self.rates(v);
        self.m.init(minf);
        self.h.init(hinf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (minf, taum, hinf, tauh) = self.rates(v);
        self.m.advance(minf, taum, dt);
        self.h.advance(hinf, tauh, dt);
    }

    /// Conductance density at the current gate states (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.tadj * self.gbar * self.m.state * self.m.state * self.h.state
    }
}

/// Low voltage activated T-type calcium channel ("IT"), inf/tau form with
/// the dendritic parameter overrides applied at insertion
#[derive(Debug, Clone)]
pub struct CaLvaChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Calcium reversal potential (mV)
    pub reversal: f64,
    /// Uniform activation shift (mV)
    pub vshift: f64,
    /// Activation half voltage offset (mV)
    pub v12m: f64,
    /// Inactivation half voltage offset (mV)
    pub v12h: f64,
    /// Minimum activation time constant (ms)
    pub am: f64,
    /// Minimum inactivation time constant (ms)
    pub ah: f64,
    /// Activation tau curve offsets (mV)
    pub vm1: f64,
    pub vm2: f64,
    /// Inactivation tau curve offsets (mV)
    pub vh1: f64,
    pub vh2: f64,
    /// Activation gate
    pub m: Gate,
    /// Inactivation gate
    pub h: Gate,
}

impl CaLvaChannel {
    pub fn new(gbar: f64, reversal: f64) -> Self {
        CaLvaChannel {
            gbar,
            reversal,
            vshift: 10.,
            v12m: 45.,
            v12h: 65.,
            am: 3.,
            ah: 30.,
            vm1: 50.,
            vm2: 125.,
            vh1: 56.,
            vh2: 415.,
            m: Gate::default(),
            h: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64, f64, f64) {
        let vm = v + self.vshift;

        let minf = 1. / (1. + (-(vm + self.v12m) / 6.2).exp());
        let hinf = 1. / (1. + ((vm + self.v12h) / 4.).exp());
        let taum = self.am + 1. / (((vm + self.vm1) / 10.).exp() + (-(vm + self.vm2) / 15.).exp());
        let tauh = self.ah + 1. / (((vm + self.vh1) / 4.).exp() + (-(vm + self.vh2) / 50.).exp());

        (minf, taum, hinf, tauh)
    }

    pub fn init(&mut self, v: f64) {
        let (minf, _, hinf, _) = self.rates(v);
        self.m.init(minf);
        self.h.init(hinf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (minf, taum, hinf, tauh) = self.rates(v);
        self.m.advance(minf, taum, dt);
        self.h.advance(hinf, tauh, dt);
    }

    /// Conductance density at the current gate states (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.gbar * self.m.state * self.m.state * self.h.state
    }
}

/// Hyperpolarization activated cation channel
#[derive(Debug, Clone)]
pub struct IhChannel {
    /// Maximal conductance density (S/cm²)
    pub gbar: f64,
    /// Mixed cation reversal potential (mV)
    pub reversal: f64,
    /// Activation gate
    pub m: Gate,
}

impl IhChannel {
    pub fn new(gbar: f64) -> Self {
        IhChannel {
            gbar,
            reversal: -45.,
            m: Gate::default(),
        }
    }

    fn rates(&self, v: f64) -> (f64, f64) {
        let a = 6.43e-3 * exp_ratio(v + 154.9, 11.9);
        let b = 0.193 * (v / 33.1).exp();

        (a / (a + b), 1. / (a + b))
    }

    pub fn init(&mut self, v: f64) {
        let (minf, _) = self.rates(v);
        self.m.init(minf);
    }

    pub fn advance(&mut self, v: f64, dt: f64) {
        let (minf, tau) = self.rates(v);
        self.m.advance(minf, tau, dt);
    }

    /// Conductance density at the current gate state (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.gbar * self.m.state
    }
}

/// Calcium and voltage activated large conductance potassium channel, the
/// half activation voltage slides with the intracellular calcium level
#[derive(Debug, Clone)]
pub struct KbkChannel {
    /// Peak conductance density (S/cm²)
    pub gpeak: f64,
    /// Potassium reversal potential (mV)
    pub reversal: f64,
    /// Lowest (calcium saturated) half activation voltage (mV)
    pub ca_vh_min: f64,
    /// Half activation shift per calcium decade (mV)
    pub ca_vh_slope: f64,
    /// Calcium level of maximal activation (mM)
    pub ca_sat: f64,
    /// Voltage sensitivity (mV)
    pub k: f64,
    /// Activation time constant (ms)
    pub tau: f64,
    /// Activation gate
    pub p: Gate,
}

impl KbkChannel {
    pub fn new(gpeak: f64, reversal: f64, ca_vh_min: f64) -> Self {
        KbkChannel {
            gpeak,
            reversal,
            ca_vh_min,
            ca_vh_slope: 46.7,
            ca_sat: 1e-2,
            k: 9.,
            tau: 1.,
            p: Gate::default(),
        }
    }

    fn vhalf(&self, ca: f64) -> f64 {
        let decades = (self.ca_sat / ca.max(1e-9)).log10().max(0.);

        self.ca_vh_min + self.ca_vh_slope * decades
    }

    fn steady_state(&self, v: f64, ca: f64) -> f64 {
        1. / (1. + (-(v - self.vhalf(ca)) / self.k).exp())
    }

    pub fn init(&mut self, v: f64, ca: f64) {
        let pinf = self.steady_state(v, ca);
        self.p.init(pinf);
    }

    pub fn advance(&mut self, v: f64, ca: f64, dt: f64) {
        let pinf = self.steady_state(v, ca);
        self.p.advance(pinf, self.tau, dt);
    }

    /// Conductance density at the current gate state (S/cm²)
    pub fn conductance(&self) -> f64 {
        self.gpeak * self.p.state
    }
}

/// Ungated axonal potassium leak
#[derive(Debug, Clone)]
pub struct KlLeak {
    /// Conductance density (S/cm²)
    pub gbar: f64,
    /// Potassium reversal potential (mV)
    pub reversal: f64,
}

/// Passive membrane leak
#[derive(Debug, Clone)]
pub struct PassiveLeak {
    /// Conductance density (S/cm²)
    pub g: f64,
    /// Leak reversal potential (mV)
    pub e: f64,
}

/// Intracellular calcium accumulation in a thin submembrane shell, driven
/// by the calcium channel current and decaying back to rest
#[derive(Debug, Clone)]
pub struct CalciumPool {
    /// Free calcium concentration (mM)
    pub ca: f64,
    /// Shell depth (µm)
    pub depth: f64,
    /// Removal time constant (ms)
    pub taur: f64,
    /// Resting calcium concentration (mM)
    pub ca_inf: f64,
}

impl Default for CalciumPool {
    fn default() -> Self {
        CalciumPool {
            ca: 1e-4,
            depth: 0.1,
            taur: 100.,
            ca_inf: 1e-4,
        }
    }
}

impl CalciumPool {
    pub fn init(&mut self) {
        self.ca = self.ca_inf;
    }

    /// Integrates the pool over one timestep given the calcium current
    /// density (mA/cm², inward negative)
    pub fn advance(&mut self, i_ca: f64, dt: f64) {
        let drive = (-1e4 * i_ca / (2. * FARADAY * self.depth)).max(0.);
        self.ca += dt * (drive + (self.ca_inf - self.ca) / self.taur);
        self.ca = self.ca.max(1e-9);
    }
}

/// The set of mechanisms inserted into one segment, any family a
/// distribution rule never reaches stays absent
#[derive(Debug, Clone, Default)]
pub struct SegmentMechanisms {
    pub pas: Option<PassiveLeak>,
    pub na: Option<NaChannel>,
    pub kv: Option<KvChannel>,
    pub kap: Option<KaChannel>,
    pub kad: Option<KaChannel>,
    pub ca_hva: Option<CaHvaChannel>,
    pub ca_lva: Option<CaLvaChannel>,
    pub ih: Option<IhChannel>,
    pub kbk: Option<KbkChannel>,
    pub kl: Option<KlLeak>,
    pub ca_pool: Option<CalciumPool>,
}

impl SegmentMechanisms {
    /// Sets every gate and the calcium pool to steady state at `v`
    pub fn init(&mut self, v: f64) {
        if let Some(pool) = &mut self.ca_pool {
            pool.init();
        }
        let ca = self.ca_pool.as_ref().map(|pool| pool.ca).unwrap_or(1e-4);

        if let Some(channel) = &mut self.na {
            channel.init(v);
        }
        if let Some(channel) = &mut self.kv {
            channel.init(v);
        }
        if let Some(channel) = &mut self.kap {
            channel.init(v);
        }
        if let Some(channel) = &mut self.kad {
            channel.init(v);
        }
        if let Some(channel) = &mut self.ca_hva {
            channel.init(v);
        }
        if let Some(channel) = &mut self.ca_lva {
            channel.init(v);
        }
        if let Some(channel) = &mut self.ih {
            channel.init(v);
        }
        if let Some(channel) = &mut self.kbk {
            channel.init(v, ca);
        }
    }

    /// Advances every gating variable over one timestep at membrane
    /// potential `v`
    pub fn advance_gates(&mut self, v: f64, dt: f64) {
        let ca = self.ca_pool.as_ref().map(|pool| pool.ca).unwrap_or(1e-4);

        if let Some(channel) = &mut self.na {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.kv {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.kap {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.kad {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.ca_hva {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.ca_lva {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.ih {
            channel.advance(v, dt);
        }
        if let Some(channel) = &mut self.kbk {
            channel.advance(v, ca, dt);
        }
    }

    /// Total membrane conductance density and its conductance weighted
    /// reversal sum at the current gate states, (S/cm², S·mV/cm²)
    pub fn conductance_totals(&self) -> (f64, f64) {
        let mut g_total = 0.;
        let mut ge_total = 0.;
        let mut add = |g: f64, e: f64| {
            g_total += g;
            ge_total += g * e;
        };

        if let Some(leak) = &self.pas {
            add(leak.g, leak.e);
        }
        if let Some(channel) = &self.na {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.kv {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.kap {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.kad {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.ca_hva {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.ca_lva {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.ih {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(channel) = &self.kbk {
            add(channel.conductance(), channel.reversal);
        }
        if let Some(leak) = &self.kl {
            add(leak.gbar, leak.reversal);
        }

        (g_total, ge_total)
    }

    /// Calcium current density at membrane potential `v` (mA/cm²)
    pub fn calcium_current(&self, v: f64) -> f64 {
        let mut i_ca = 0.;

        if let Some(channel) = &self.ca_hva {
            i_ca += channel.conductance() * (v - channel.reversal);
        }
        if let Some(channel) = &self.ca_lva {
            i_ca += channel.conductance() * (v - channel.reversal);
        }

        i_ca
    }

    /// Integrates the calcium pool from the calcium current at `v`
    pub fn advance_calcium(&mut self, v: f64, dt: f64) {
        let i_ca = self.calcium_current(v);

        if let Some(pool) = &mut self.ca_pool {
            pool.advance(i_ca, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_ratio_is_continuous_through_zero() {
        let near = exp_ratio(1e-9, 9.);
        let limit = 9.;

        assert!((near - limit).abs() < 1e-6);
        assert!((exp_ratio(9., 9.) - 9. / (1f64.exp() - 1.)).abs() < 1e-12);
    }

    #[test]
    fn gates_initialize_to_steady_state() {
        let mut channel = NaChannel::new(0.09, 60., -10., 32.);
        channel.init(-65.);

        let before = (channel.m.state, channel.h.state);
        for _ in 0..1000 {
            channel.advance(-65., 0.025);
        }

        assert!((channel.m.state - before.0).abs() < 1e-9);
        assert!((channel.h.state - before.1).abs() < 1e-9);
    }

    #[test]
    fn sodium_activates_with_depolarization() {
        let mut rest = NaChannel::new(0.09, 60., -10., 32.);
        let mut depolarized = rest.clone();
        rest.init(-70.);
        depolarized.init(0.);

        assert!(depolarized.m.state > rest.m.state);
        assert!(depolarized.h.state < rest.h.state);
    }

    #[test]
    fn ih_opens_with_hyperpolarization() {
        let mut channel = IhChannel::new(1e-4);
        channel.init(-100.);
        let hyper = channel.m.state;
        channel.init(-40.);
        let depol = channel.m.state;

        assert!(hyper > depol);
    }

    #[test]
    fn calcium_pool_decays_to_rest() {
        let mut pool = CalciumPool::default();
        pool.ca = 1e-3;

        for _ in 0..40000 {
            pool.advance(0., 0.025);
        }

        assert!((pool.ca - pool.ca_inf).abs() < 1e-6);
    }

    #[test]
    fn calcium_pool_ignores_outward_current() {
        let mut pool = CalciumPool::default();
        let resting = pool.ca;
        pool.advance(0.5, 0.025);

        assert!(pool.ca <= resting);
    }

    #[test]
    fn bk_activation_requires_calcium() {
        let mut channel = KbkChannel::new(2.68e-4, -87., -1.08);
        channel.init(-20., 1e-4);
        let low_ca = channel.p.state;
        channel.init(-20., 1e-2);
        let high_ca = channel.p.state;

        assert!(high_ca > low_ca);
    }

    #[test]
    fn exact_exponential_update_is_stable_for_large_dt() {
        let mut gate = Gate { state: 0. };
        gate.advance(1., 1e-6, 1e3);

        assert!(gate.state <= 1. && gate.state >= 0.);
        assert!((gate.state - 1.).abs() < 1e-9);
    }
}
