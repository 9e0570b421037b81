//! Distance dependent channel distribution: every segment's conductance
//! density is a pure function of its compartment class, its cached path
//! distance from the soma, and the cell's global scale ratios.
//!
//! All distance rules are piecewise linear with saturating clamps. A clamp
//! hitting its bound is recovered locally (the density saturates, nothing
//! propagates) but logged, since the tuned presets are not expected to
//! reach the caps.

use crate::mechanisms::{
    CaHvaChannel, CaLvaChannel, CalciumPool, IhChannel, KaChannel, KaParams,
    KbkChannel, KlLeak, KvChannel, NaChannel, PassiveLeak,
};
use crate::morphology::SectionClass;
use super::CellInstance;


/// Density conversion from the preset's pS/µm² figures to S/cm²
const PS_PER_UM2: f64 = 1e-4;

/// Global multiplicative scale ratios applied at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConductanceRatios {
    /// Sodium scale (soma, basal, apical; the axon is excluded)
    pub na: f64,
    /// High voltage activated calcium scale
    pub hva: f64,
    /// Low voltage activated calcium scale
    pub lva: f64,
    /// A-type potassium scale
    pub ka: f64,
    /// Calcium activated potassium scale
    pub bk: f64,
}

impl Default for ConductanceRatios {
    fn default() -> Self {
        ConductanceRatios { na: 1., hva: 1., lva: 1., ka: 1., bk: 1. }
    }
}

/// Reassignment of one reconstructed branch as the axon: fixed electrical
/// length, fixed segment count, and a diameter profile stepped by path
/// distance from the soma
#[derive(Debug, Clone)]
pub struct AxonSubstitution {
    /// Name of the section to repurpose
    pub section: String,
    /// Electrical length (µm)
    pub length: f64,
    /// Fixed segment count
    pub nseg: usize,
    /// `(upper path distance bound, diameter)` bands, in order; the last
    /// band catches everything beyond
    pub diam_bands: Vec<(f64, f64)>,
}

impl AxonSubstitution {
    /// Diameter (µm) at the given path distance from the soma (µm)
    pub fn diameter_at(&self, path_distance: f64) -> f64 {
        for (bound, diam) in &self.diam_bands {
            if path_distance <= *bound {
                return *diam;
            }
        }

        self.diam_bands.last().map(|(_, diam)| *diam).unwrap_or(1.)
    }
}

/// The full constant set a cell variant is parameterized by, carried in the
/// NEURON unit conventions (densities in pS/µm² unless noted)
#[derive(Debug, Clone)]
pub struct BiophysicsPreset {
    /// Axial resistivity (Ω·cm)
    pub global_ra: f64,
    /// Capacitance and leak correction factor for spiny dendrite
    pub spine_factor: f64,
    /// Somatic membrane resistance (Ω·cm²)
    pub soma_rm: f64,
    /// Somatic capacitance (µF/cm²)
    pub soma_cm: f64,
    /// Path distance where spines start (µm)
    pub spine_dist: f64,
    /// Potassium reversal potential (mV)
    pub e_k: f64,
    /// Sodium reversal potential (mV)
    pub e_na: f64,
    /// Calcium reversal potential (mV)
    pub e_ca: f64,
    /// Passive leak reversal potential (mV)
    pub e_pas: f64,

    /// Somatic sodium density
    pub soma_na: f64,
    /// Axonal hot zone sodium density
    pub axon_na: f64,
    /// Basal sodium density at the soma
    pub basal_na: f64,
    /// Basal sodium decay per µm
    pub m_na: f64,
    /// Apical sodium density
    pub apical_na: f64,
    /// Basal sodium cap
    pub g_na_max: f64,
    /// Sodium activation shift (mV)
    pub vshift_na: f64,
    /// Axonal sodium hot zone (µm path distance window)
    pub axon_na_window: (f64, f64),
    /// Axonal sodium inactivation half voltage override (mV)
    pub axon_thi: f64,

    /// Somatic, apical, and initial basal delayed rectifier density
    pub soma_kv: f64,
    /// Basal delayed rectifier slope per µm
    pub m_kv: f64,
    /// Basal delayed rectifier cap
    pub g_kv_max: f64,
    /// Axonal delayed rectifier density
    pub axon_kv: f64,

    /// Somatic and initial basal A-type density
    pub soma_ka: f64,
    /// Linear rise of the basal A-type budget per µm
    pub m_gka: f64,
    /// Linear decay of the proximal fraction per µm
    pub m_gka_ratio: f64,
    /// Apical A-type budget
    pub apical_ka: f64,
    /// A-type budget cap
    pub g_ka_max: f64,

    /// Somatic high voltage activated calcium density
    pub soma_ca_hva: f64,
    /// Dendritic high voltage activated calcium density
    pub dend_ca_hva: f64,
    /// Somatic low voltage activated calcium density
    pub soma_ca_lva: f64,
    /// Dendritic low voltage activated calcium density
    pub dend_ca_lva: f64,
    /// Basal distance threshold between the somatic and dendritic calcium
    /// regimes (µm)
    pub ca_dist_basal: f64,
    /// Apical distance threshold (µm)
    pub ca_dist_apical: f64,
    /// Calcium activation shift (mV)
    pub vshift_ca: f64,

    /// Axonal potassium leak density (S/cm²)
    pub g_kl: f64,
    /// Path distance where the axonal potassium leak starts (µm)
    pub il_dist: f64,

    /// BK peak density (S/cm²)
    pub kbk_gpeak: f64,
    /// Upward shift of the BK half activation floor (mV)
    pub kbk_vh_shift: f64,

    /// Somatic and basal Ih density (S/cm²)
    pub ih_soma: f64,
    /// Apical Ih scale (S/cm²)
    pub ih_apical_scale: f64,

    /// Axon substitution for morphologies without a reconstructed axon
    pub axon_substitution: Option<AxonSubstitution>,
    /// Tuned resting potential (mV)
    pub v_init: f64,
}

impl BiophysicsPreset {
    /// Parameter preset of the full reconstruction
    pub fn full() -> Self {
        BiophysicsPreset {
            global_ra: 100.,
            spine_factor: 1.5,
            soma_rm: 1500. / 0.04,
            soma_cm: 1.45,
            spine_dist: 40.,
            e_k: -87.,
            e_na: 60.,
            e_ca: 140.,
            e_pas: -65.,
            soma_na: 900.,
            axon_na: 5000.,
            basal_na: 150.,
            m_na: 0.5,
            apical_na: 375.,
            g_na_max: 2000.,
            vshift_na: -10.,
            axon_na_window: (35., 50.),
            axon_thi: -58.,
            soma_kv: 40.,
            m_kv: 0.,
            g_kv_max: 500.,
            axon_kv: 100.,
            soma_ka: 150.,
            m_gka: 0.7,
            m_gka_ratio: 1. / 300.,
            apical_ka: 300.,
            g_ka_max: 2000.,
            soma_ca_hva: 2.,
            dend_ca_hva: 0.4,
            soma_ca_lva: 2.,
            dend_ca_lva: 1.6,
            ca_dist_basal: 30.,
            ca_dist_apical: 30.,
            vshift_ca: 10.,
            g_kl: 0.005,
            il_dist: 15.,
            kbk_gpeak: 2.68e-4,
            kbk_vh_shift: 45.,
            ih_soma: 1e-4,
            ih_apical_scale: 2e-4,
            axon_substitution: Some(AxonSubstitution {
                section: "basal[16]".to_string(),
                length: 200.,
                nseg: 15,
                diam_bands: vec![(15., 1.725), (30., 1.119), (f64::INFINITY, 0.96)],
            }),
            v_init: -67.3,
        }
    }

    /// Parameter preset of the reduced morphology
    pub fn reduced() -> Self {
        BiophysicsPreset {
            global_ra: 90.,
            spine_factor: 1.5,
            soma_rm: 1000. / 0.04,
            soma_cm: 1.,
            spine_dist: 50.,
            e_k: -95.,
            e_na: 65.,
            e_ca: 140.,
            e_pas: -80.,
            soma_na: 150.,
            axon_na: 5000.,
            basal_na: 150.,
            m_na: 0.5,
            apical_na: 375.,
            g_na_max: 2000.,
            vshift_na: -10.,
            axon_na_window: (50., 100.),
            axon_thi: -58.,
            soma_kv: 40.,
            m_kv: 0.,
            g_kv_max: 500.,
            axon_kv: 100.,
            soma_ka: 150.,
            m_gka: 0.7,
            m_gka_ratio: 1. / 300.,
            apical_ka: 300.,
            g_ka_max: 2000.,
            soma_ca_hva: 0.5,
            dend_ca_hva: 0.4,
            soma_ca_lva: 1.,
            dend_ca_lva: 1.6,
            ca_dist_basal: 30.,
            ca_dist_apical: 30.,
            vshift_ca: 10.,
            g_kl: 0.005,
            il_dist: 15.,
            kbk_gpeak: 2.68e-4,
            kbk_vh_shift: 45.,
            ih_soma: 1e-4,
            ih_apical_scale: 2e-4,
            axon_substitution: None,
            v_init: -80.,
        }
    }

    /// The BK half activation floor after the global shift (mV)
    pub fn kbk_ca_vh_min(&self) -> f64 {
        -46.08 + self.kbk_vh_shift
    }

    /// Apical Ih density at a path distance (S/cm²)
    pub fn ih_apical(&self, distance: f64) -> f64 {
        self.ih_apical_scale * (-0.8696 + 2.0870 * (distance / 323.).exp())
    }
}

/// Clamps a linear rule into `[0, max]`, logging when the bound bites
fn clamp_density(value: f64, max: f64, family: &str, section: &str, distance: f64) -> f64 {
    if value > max {
        log::warn!(
            "setting {} to maximum {} at distance {:.1} in {}",
            family, max, distance, section,
        );
        max
    } else if value < 0. {
        log::warn!(
            "setting {} to zero at distance {:.1} in {}",
            family, distance, section,
        );
        0.
    } else {
        value
    }
}

impl CellInstance {
    /// Inserts mechanisms and assigns every density, capacitance, and leak
    /// according to the distance rules; runs once at construction, after
    /// discretization and distance caching
    pub(crate) fn distribute_channels(&mut self) {
        let preset = self.config().preset.clone();
        let ratios = self.config().ratios;
        let celsius = self.config().celsius;

        let classes: Vec<SectionClass> = self.segments().iter()
            .map(|seg| self.morphology().section(seg.section).class)
            .collect();
        let names: Vec<String> = self.segments().iter()
            .map(|seg| self.morphology().section(seg.section).name.clone())
            .collect();

        for (i, segment) in self.segments_mut().iter_mut().enumerate() {
            let class = classes[i];
            let name = names[i].as_str();
            let d = segment.path_distance;
            let mech = &mut segment.mechanisms;

            // passive membrane and the spine correction: spiny dendrite
            // beyond spine_dist carries extra membrane area
            let spiny = matches!(class, SectionClass::Basal | SectionClass::Apical)
                && d >= preset.spine_dist;
            let (cm, g_pas) = if spiny {
                (preset.soma_cm * preset.spine_factor, preset.spine_factor / preset.soma_rm)
            } else {
                (preset.soma_cm, 1. / preset.soma_rm)
            };
            segment.cm = cm;
            mech.pas = Some(PassiveLeak { g: g_pas, e: preset.e_pas });

            // sodium
            let gna = match class {
                SectionClass::Soma => preset.soma_na * ratios.na,
                SectionClass::Apical => preset.apical_na * ratios.na,
                SectionClass::Basal => {
                    let linear = preset.basal_na - preset.m_na * d;
                    clamp_density(linear, preset.g_na_max, "basal Na", name, d) * ratios.na
                }
                // the axon is excluded from ratio scaling
                SectionClass::Axon => {
                    let (from, to) = preset.axon_na_window;
                    if d >= from && d <= to {
                        preset.axon_na
                    } else {
                        preset.soma_na
                    }
                }
            };
            let mut na = NaChannel::new(gna * PS_PER_UM2, preset.e_na, preset.vshift_na, celsius);
            if class == SectionClass::Axon {
                na.thi1 = preset.axon_thi;
                na.thi2 = preset.axon_thi;
            }
            mech.na = Some(na);

            // delayed rectifier
            let gkv = match class {
                SectionClass::Soma | SectionClass::Apical => preset.soma_kv,
                SectionClass::Basal => {
                    let linear = preset.soma_kv + preset.m_kv * d;
                    clamp_density(linear, preset.g_kv_max, "basal GKV", name, d)
                }
                SectionClass::Axon => preset.axon_kv,
            };
            mech.kv = Some(KvChannel::new(gkv * PS_PER_UM2, preset.e_k, celsius));

            // A-type potassium: a distance dependent total budget split into
            // proximal and distal kinetic populations
            if class != SectionClass::Axon {
                let proximal_fraction = (1. - preset.m_gka_ratio * d).clamp(0., 1.);
                let (kap_density, kad_density) = match class {
                    SectionClass::Soma => (preset.soma_ka, 0.),
                    SectionClass::Basal => {
                        let linear = preset.soma_ka + preset.m_gka * d;
                        let total = clamp_density(linear, preset.g_ka_max, "GKA", name, d);
                        (total * proximal_fraction, total * (1. - proximal_fraction))
                    }
                    SectionClass::Apical => (
                        preset.apical_ka * proximal_fraction,
                        preset.apical_ka * (1. - proximal_fraction),
                    ),
                    SectionClass::Axon => unreachable!(),
                };

                mech.kap = Some(KaChannel::new(
                    kap_density * PS_PER_UM2 * ratios.ka,
                    preset.e_k,
                    KaParams::proximal(),
                    celsius,
                ));
                if class != SectionClass::Soma {
                    mech.kad = Some(KaChannel::new(
                        kad_density * PS_PER_UM2 * ratios.ka,
                        preset.e_k,
                        KaParams::distal(),
                        celsius,
                    ));
                }

                // calcium: hard threshold between somatic and dendritic
                // density regimes
                let threshold = match class {
                    SectionClass::Apical => preset.ca_dist_apical,
                    _ => preset.ca_dist_basal,
                };
                let (hva, lva) = if class != SectionClass::Soma && d > threshold {
                    (preset.dend_ca_hva, preset.dend_ca_lva)
                } else {
                    (preset.soma_ca_hva, preset.soma_ca_lva)
                };
                mech.ca_hva = Some(CaHvaChannel::new(
                    hva * PS_PER_UM2 * ratios.hva,
                    preset.e_ca,
                    preset.vshift_ca,
                    celsius,
                ));
                mech.ca_lva = Some(CaLvaChannel::new(lva * PS_PER_UM2 * ratios.lva, preset.e_ca));
                mech.ca_pool = Some(CalciumPool::default());

                // hyperpolarization activated cation current, growing
                // exponentially along the apical trunk
                let gih = match class {
                    SectionClass::Apical => preset.ih_apical(d),
                    _ => preset.ih_soma,
                };
                mech.ih = Some(IhChannel::new(gih));

                // calcium activated potassium
                mech.kbk = Some(KbkChannel::new(
                    preset.kbk_gpeak * ratios.bk,
                    preset.e_k,
                    preset.kbk_ca_vh_min(),
                ));
            } else {
                // axonal potassium leak past the initial segment
                let gkl = if d >= preset.il_dist { preset.g_kl } else { 0. };
                mech.kl = Some(KlLeak { gbar: gkl, reversal: preset.e_k });
            }
        }
    }
}
