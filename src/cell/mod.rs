//! Assembly of a simulatable cell: spatial discretization of the morphology
//! into iso-potential segments, cached path distances, and the distance
//! dependent channel distributions that turn geometry into biophysics.

use crate::error::{MorphologyError, StimulusError};
use crate::mechanisms::SegmentMechanisms;
use crate::morphology::{Morphology, Point3d, SectionClass};

pub mod discretization;
pub mod distance;
pub mod distribution;

pub use self::distribution::{AxonSubstitution, BiophysicsPreset, ConductanceRatios};

use self::discretization::segment_count;


/// A resolved location on a section, the unit every stimulus, recorder,
/// and distance query addresses compartments by
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionTarget {
    /// Section index within the cell's morphology
    pub section: usize,
    /// Normalized position along the section (0 to 1)
    pub x: f64,
}

/// The smallest spatial unit of the discretized cell, holding its own
/// geometry, membrane parameters, and channel state
#[derive(Debug, Clone)]
pub struct Segment {
    /// Owning section index
    pub section: usize,
    /// Normalized center position within the section
    pub x: f64,
    /// Segment length (µm)
    pub length: f64,
    /// Membrane surface area (µm²)
    pub area: f64,
    /// Diameter at the segment center (µm)
    pub diam: f64,
    /// Specific membrane capacitance (µF/cm²)
    pub cm: f64,
    /// Axial resistance from the center to the proximal span end (MΩ)
    pub half_ri_proximal: f64,
    /// Axial resistance from the center to the distal span end (MΩ)
    pub half_ri_distal: f64,
    /// Cached path distance from the reference point (µm)
    pub path_distance: f64,
    /// Inserted membrane mechanisms
    pub mechanisms: SegmentMechanisms,
}

/// Per-section bookkeeping after discretization
#[derive(Debug, Clone)]
pub struct SectionSegments {
    /// Number of segments, always odd and at least one
    pub nseg: usize,
    /// Index of the section's first segment in the flat segment list
    pub first: usize,
    /// Effective electrical length (µm), differs from the reconstructed
    /// arc length only for the substituted axon
    pub length: f64,
}

/// Model variant selector: the full reconstruction or the reduced
/// 7 compartment morphology, both flowing through the same
/// distribution rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Full,
    Reduced,
}

/// Immutable construction configuration: morphology variant, biophysics
/// preset, and the global conductance scale ratios applied multiplicatively
/// at construction
#[derive(Debug, Clone)]
pub struct CellConfig {
    pub variant: ModelVariant,
    pub preset: BiophysicsPreset,
    pub ratios: ConductanceRatios,
    /// Temperature the kinetics run at (°C)
    pub celsius: f64,
}

impl CellConfig {
    /// Full reconstruction with its tuned parameter preset
    pub fn full() -> Self {
        CellConfig {
            variant: ModelVariant::Full,
            preset: BiophysicsPreset::full(),
            ratios: ConductanceRatios::default(),
            celsius: 32.,
        }
    }

    /// Reduced morphology with its tuned parameter preset
    pub fn reduced() -> Self {
        CellConfig {
            variant: ModelVariant::Reduced,
            preset: BiophysicsPreset::reduced(),
            ratios: ConductanceRatios::default(),
            celsius: 32.,
        }
    }

    /// Replaces the conductance scale ratios
    pub fn with_ratios(mut self, ratios: ConductanceRatios) -> Self {
        self.ratios = ratios;
        self
    }
}

/// A fully assembled cell: morphology, discretization, and distributed
/// channel densities, ready to hand to a simulation
#[derive(Debug, Clone)]
pub struct CellInstance {
    morphology: Morphology,
    config: CellConfig,
    sections: Vec<SectionSegments>,
    segments: Vec<Segment>,
}

impl CellInstance {
    /// Builds the cell for the configured variant, using the bundled
    /// morphology datasets
    pub fn new(config: CellConfig) -> Result<CellInstance, MorphologyError> {
        let morphology = match config.variant {
            ModelVariant::Full => Morphology::ca229()?,
            ModelVariant::Reduced => Morphology::reduced(),
        };

        CellInstance::from_morphology(morphology, config)
    }

    /// Builds the cell from an explicit morphology
    ///
    /// Construction order is load bearing: axial resistance and capacitance
    /// are set before discretization, discretization runs exactly once, and
    /// only afterwards are channel densities and the spine capacitance
    /// correction applied. Re-discretizing after the capacitance pass would
    /// silently change segment counts.
    pub fn from_morphology(
        mut morphology: Morphology,
        config: CellConfig,
    ) -> Result<CellInstance, MorphologyError> {
        // 1. discretize every section with the d_lambda rule at the
        //    construction capacitance of 1 µF/cm²
        let mut nsegs: Vec<usize> = Vec::with_capacity(morphology.len());
        for section in morphology.sections() {
            let nseg = match section.nseg_override {
                Some(n) => if n % 2 == 0 { n + 1 } else { n.max(1) },
                None => segment_count(section, config.preset.global_ra, 1., 100., 0.05),
            };
            nsegs.push(nseg);
        }

        // 2. axon substitution: the full reconstruction repurposes one basal
        //    branch as the axon with a fixed length, segment count, and
        //    stepped diameter profile
        let mut substituted: Option<usize> = None;
        if let Some(sub) = &config.preset.axon_substitution {
            let index = morphology.index_of(&sub.section)
                .ok_or_else(|| MorphologyError::MissingSubstitutionTarget(sub.section.clone()))?;

            morphology.section_mut(index).class = SectionClass::Axon;
            nsegs[index] = sub.nseg;
            substituted = Some(index);
        }

        log::debug!(
            "discretized '{}' into {} segments across {} sections",
            morphology.name,
            nsegs.iter().sum::<usize>(),
            morphology.len(),
        );

        // path distance from the reference point to the substituted axon's
        // origin, needed because its diameter bands are expressed in path
        // distance from the soma
        let axon_start = match substituted {
            Some(index) => {
                let arc_lengths: Vec<f64> = morphology.sections().map(|s| s.length).collect();
                let origin = SectionTarget { section: morphology.root(), x: 0.5 };
                distance::distance_between(
                    &morphology,
                    &arc_lengths,
                    origin,
                    SectionTarget { section: index, x: 0. },
                )
            }
            None => 0.,
        };

        // 3. build flat segment storage with per-segment geometry
        let mut sections = Vec::with_capacity(morphology.len());
        let mut segments = Vec::new();
        for (index, section) in morphology.sections().enumerate() {
            let nseg = nsegs[index];
            let first = segments.len();

            let length = match (substituted, &config.preset.axon_substitution) {
                (Some(sub_index), Some(sub)) if sub_index == index => sub.length,
                _ => section.length,
            };

            for seg in 0..nseg {
                let x = (2. * seg as f64 + 1.) / (2. * nseg as f64);
                let geometry = match (substituted, &config.preset.axon_substitution) {
                    (Some(sub_index), Some(sub)) if sub_index == index =>
                        substituted_axon_geometry(sub, seg, config.preset.global_ra, axon_start),
                    _ => section_span_geometry(
                        &section.points,
                        &section.arc,
                        seg as f64 / nseg as f64 * section.length,
                        (seg + 1) as f64 / nseg as f64 * section.length,
                        config.preset.global_ra,
                    ),
                };

                segments.push(Segment {
                    section: index,
                    x,
                    length: length / nseg as f64,
                    area: geometry.area,
                    diam: geometry.diam,
                    cm: 1.,
                    half_ri_proximal: geometry.half_ri_proximal,
                    half_ri_distal: geometry.half_ri_distal,
                    path_distance: 0.,
                    mechanisms: SegmentMechanisms::default(),
                });
            }

            sections.push(SectionSegments { nseg, first, length });
        }

        let mut cell = CellInstance { morphology, config, sections, segments };

        // 4. cache path distances from the reference point, then distribute
        //    channels as functions of them
        cell.cache_path_distances();
        cell.distribute_channels();

        log::debug!("cell '{}' constructed", cell.morphology.name);

        Ok(cell)
    }

    /// The cell's morphology
    pub fn morphology(&self) -> &Morphology {
        &self.morphology
    }

    /// The construction configuration
    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    /// Resolves a section name and normalized position into a target,
    /// rejecting unknown names and out of range positions at attach time
    pub fn target(&self, section: &str, x: f64) -> Result<SectionTarget, StimulusError> {
        let index = self.morphology.index_of(section)
            .ok_or_else(|| StimulusError::UnknownSection(section.to_string()))?;

        if !(0. ..=1.).contains(&x) || x.is_nan() {
            return Err(StimulusError::LocationOutOfRange(section.to_string(), x));
        }

        Ok(SectionTarget { section: index, x })
    }

    /// Flat index of the segment containing a target location
    pub fn segment_at(&self, target: SectionTarget) -> usize {
        let section = &self.sections[target.section];
        let seg = ((target.x * section.nseg as f64) as usize).min(section.nseg - 1);

        section.first + seg
    }

    /// Number of segments in a named section
    pub fn nseg(&self, section: &str) -> Option<usize> {
        self.morphology.index_of(section).map(|i| self.sections[i].nseg)
    }

    /// Per-section segment bookkeeping
    pub fn section_segments(&self, section: usize) -> &SectionSegments {
        &self.sections[section]
    }

    /// All segments in Hines order (parents before children)
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Mutable access for the distribution and manipulation passes
    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Total number of segments
    pub fn segment_len(&self) -> usize {
        self.segments.len()
    }

    /// Cached path distance (µm) from the reference point to a target
    pub fn path_distance(&self, target: SectionTarget) -> f64 {
        self.segments[self.segment_at(target)].path_distance
    }

    fn cache_path_distances(&mut self) {
        let origin = SectionTarget { section: self.morphology.root(), x: 0.5 };
        let lengths: Vec<f64> = self.sections.iter().map(|section| section.length).collect();

        let distances: Vec<f64> = self.segments.iter()
            .map(|seg| {
                let target = SectionTarget { section: seg.section, x: seg.x };
                distance::distance_between(&self.morphology, &lengths, origin, target)
            })
            .collect();

        for (segment, distance) in self.segments.iter_mut().zip(distances) {
            segment.path_distance = distance;
        }
    }

    /// Parent segment index and axial resistance (MΩ) between a segment's
    /// center and its parent segment's center, `None` for the root segment
    pub fn axial_link(&self, segment: usize) -> Option<(usize, f64)> {
        let seg = &self.segments[segment];
        let section = &self.sections[seg.section];

        if segment > section.first {
            let previous = &self.segments[segment - 1];
            return Some((segment - 1, previous.half_ri_distal + seg.half_ri_proximal));
        }

        // first segment of its section, link across the attachment point
        let morph_section = self.morphology.section(seg.section);
        let parent_index = morph_section.parent?;
        let parent_x = morph_section.parent_x;

        let parent_section = &self.sections[parent_index];
        let parent_seg_local =
            ((parent_x * parent_section.nseg as f64) as usize).min(parent_section.nseg - 1);
        let parent_seg = parent_section.first + parent_seg_local;
        let parent = &self.segments[parent_seg];

        // partial resistance from the parent segment center towards the
        // attachment node, proportional to how far off-center it sits
        let half_span = 0.5 / parent_section.nseg as f64;
        let offset = (parent_x - parent.x) / half_span;
        let parent_partial = if offset >= 0. {
            offset.min(1.) * parent.half_ri_distal
        } else {
            (-offset).min(1.) * parent.half_ri_proximal
        };

        Some((parent_seg, seg.half_ri_proximal + parent_partial))
    }

    /// Zeroes every sodium conductance tree-wide, modeling bath applied
    /// TTX, idempotent
    pub fn ttx(&mut self) {
        for segment in self.segments.iter_mut() {
            if let Some(channel) = &mut segment.mechanisms.na {
                channel.gbar = 0.;
            }
        }
        log::debug!("TTX applied: all sodium conductances zeroed");
    }

    /// Zeroes sodium conductance in basal dendrites only, the manipulation
    /// used for back-propagation experiments, idempotent
    pub fn ttx_bap(&mut self) {
        for i in 0..self.segments.len() {
            let class = self.morphology.section(self.segments[i].section).class;
            if class == SectionClass::Basal {
                if let Some(channel) = &mut self.segments[i].mechanisms.na {
                    channel.gbar = 0.;
                }
            }
        }
        log::debug!("TTX applied to basal dendrites only");
    }

    /// Zeroes both calcium channel families tree-wide, idempotent
    pub fn no_calcium(&mut self) {
        for segment in self.segments.iter_mut() {
            if let Some(channel) = &mut segment.mechanisms.ca_hva {
                channel.gbar = 0.;
            }
            if let Some(channel) = &mut segment.mechanisms.ca_lva {
                channel.gbar = 0.;
            }
        }
        log::debug!("calcium conductances zeroed");
    }
}

/// Geometry derived for one segment span
struct SpanGeometry {
    area: f64,
    diam: f64,
    half_ri_proximal: f64,
    half_ri_distal: f64,
}

/// Axial resistance of a frustum (MΩ) given axial resistivity (Ω·cm),
/// length (µm), and end diameters (µm)
fn frustum_resistance(ra: f64, length: f64, d1: f64, d2: f64) -> f64 {
    0.01 * 4. * ra * length / (std::f64::consts::PI * d1 * d2)
}

/// Walks the 3d point list over `[arc_from, arc_to]` accumulating membrane
/// area and axial resistance split at the span midpoint
fn section_span_geometry(
    points: &[Point3d],
    arc: &[f64],
    arc_from: f64,
    arc_to: f64,
    ra: f64,
) -> SpanGeometry {
    let mid = 0.5 * (arc_from + arc_to);
    let diam_at = |s: f64| -> f64 {
        for i in 1..points.len() {
            if arc[i] >= s {
                let span = arc[i] - arc[i - 1];
                if span <= 0. {
                    return points[i].diam;
                }
                let frac = (s - arc[i - 1]) / span;
                return points[i - 1].diam + frac * (points[i].diam - points[i - 1].diam);
            }
        }
        points[points.len() - 1].diam
    };

    let mut area = 0.;
    let mut ri_proximal = 0.;
    let mut ri_distal = 0.;

    // breakpoints: span ends, midpoint, and any 3d sample inside
    let mut cuts: Vec<f64> = vec![arc_from, mid, arc_to];
    for s in arc.iter() {
        if *s > arc_from && *s < arc_to {
            cuts.push(*s);
        }
    }
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap());

    for pair in cuts.windows(2) {
        let (s1, s2) = (pair[0], pair[1]);
        let length = s2 - s1;
        if length <= 0. {
            continue;
        }
        let (d1, d2) = (diam_at(s1), diam_at(s2));

        area += std::f64::consts::PI * 0.5 * (d1 + d2) * length;
        let resistance = frustum_resistance(ra, length, d1, d2);
        if s2 <= mid + 1e-12 {
            ri_proximal += resistance;
        } else {
            ri_distal += resistance;
        }
    }

    SpanGeometry {
        area,
        diam: diam_at(mid),
        half_ri_proximal: ri_proximal,
        half_ri_distal: ri_distal,
    }
}

/// Geometry for one segment of the substituted axon: fixed total length,
/// diameter stepped by path distance from the soma
fn substituted_axon_geometry(
    sub: &AxonSubstitution,
    seg: usize,
    ra: f64,
    start_distance: f64,
) -> SpanGeometry {
    let seg_length = sub.length / sub.nseg as f64;
    let center = (seg as f64 + 0.5) * seg_length;
    let diam = sub.diameter_at(start_distance + center);

    SpanGeometry {
        area: std::f64::consts::PI * diam * seg_length,
        diam,
        half_ri_proximal: frustum_resistance(ra, seg_length / 2., diam, diam),
        half_ri_distal: frustum_resistance(ra, seg_length / 2., diam, diam),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_cylinder_geometry_matches_closed_form() {
        let points = vec![
            Point3d { x: 0., y: 0., z: 0., diam: 2. },
            Point3d { x: 100., y: 0., z: 0., diam: 2. },
        ];
        let arc = vec![0., 100.];
        let geometry = section_span_geometry(&points, &arc, 0., 100., 100.);

        let expected_area = std::f64::consts::PI * 2. * 100.;
        let expected_half_ri = 0.01 * 4. * 100. * 50. / (std::f64::consts::PI * 4.);

        assert!((geometry.area - expected_area).abs() / expected_area < 1e-12);
        assert!((geometry.half_ri_proximal - expected_half_ri).abs() < 1e-9);
        assert!((geometry.half_ri_distal - expected_half_ri).abs() < 1e-9);
    }

    #[test]
    fn full_cell_constructs_with_axon_substituted() {
        let cell = CellInstance::new(CellConfig::full()).unwrap();

        let axon = cell.morphology().section_by_name("basal[16]").unwrap();
        assert_eq!(axon.class, SectionClass::Axon);
        assert_eq!(cell.nseg("basal[16]"), Some(15));

        let target = cell.target("basal[16]", 0.99).unwrap();
        let tip = &cell.segments()[cell.segment_at(target)];
        assert!((tip.diam - 0.96).abs() < 1e-12);
    }

    #[test]
    fn every_segment_count_is_odd() {
        let cell = CellInstance::new(CellConfig::full()).unwrap();

        for section in cell.morphology().sections() {
            let nseg = cell.nseg(&section.name).unwrap();
            assert!(nseg >= 1);
            assert_eq!(nseg % 2, 1, "section {} has even nseg {}", section.name, nseg);
        }
    }

    #[test]
    fn axial_links_form_a_tree() {
        let cell = CellInstance::new(CellConfig::full()).unwrap();

        let mut roots = 0;
        for i in 0..cell.segment_len() {
            match cell.axial_link(i) {
                Some((parent, resistance)) => {
                    assert!(parent < i, "parent must precede child in Hines order");
                    assert!(resistance > 0.);
                }
                None => roots += 1,
            }
        }

        assert_eq!(roots, 1);
    }

    #[test]
    fn ttx_is_idempotent_and_leaves_potassium_alone() {
        let mut cell = CellInstance::new(CellConfig::full()).unwrap();

        let kv_before: Vec<f64> = cell.segments().iter()
            .filter_map(|seg| seg.mechanisms.kv.as_ref().map(|c| c.gbar))
            .collect();

        cell.ttx();
        let after_once: Vec<f64> = cell.segments().iter()
            .filter_map(|seg| seg.mechanisms.na.as_ref().map(|c| c.gbar))
            .collect();
        cell.ttx();
        let after_twice: Vec<f64> = cell.segments().iter()
            .filter_map(|seg| seg.mechanisms.na.as_ref().map(|c| c.gbar))
            .collect();

        assert!(after_once.iter().all(|g| *g == 0.));
        assert_eq!(after_once, after_twice);

        let kv_after: Vec<f64> = cell.segments().iter()
            .filter_map(|seg| seg.mechanisms.kv.as_ref().map(|c| c.gbar))
            .collect();
        assert_eq!(kv_before, kv_after);
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let cell = CellInstance::new(CellConfig::reduced()).unwrap();

        assert!(matches!(
            cell.target("Bdend1", 1.5),
            Err(StimulusError::LocationOutOfRange(_, _))
        ));
        assert!(matches!(
            cell.target("nonexistent", 0.5),
            Err(StimulusError::UnknownSection(_))
        ));
    }
}
