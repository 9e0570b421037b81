//! Reconstructed neuron morphologies as trees of unbranched sections with
//! 3d point geometry, loaded from versioned data files or built from the
//! stylized reduced variant.

use std::collections::HashMap;
use std::io::Read;
use serde::{Serialize, Deserialize};
use crate::error::MorphologyError;


/// The full 85 section layer V pyramidal cell reconstruction, stored as data
const CA229_DATA: &str = include_str!("../../data/ca229.json");

/// Compartment class a section belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionClass {
    /// Somatic compartments
    Soma,
    /// Basal dendrites
    Basal,
    /// Apical dendrites
    Apical,
    /// Axonal compartments
    Axon,
}

/// A single 3d sample along a section (coordinates and diameter in µm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diam: f64,
}

impl Point3d {
    /// Euclidean distance to another point (µm)
    pub fn distance_to(&self, other: &Point3d) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;

        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Serialized form of a single section within a morphology data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDescriptor {
    /// Stable section name, e.g. `basal[34]`
    pub name: String,
    /// Compartment class
    pub class: SectionClass,
    /// Name of the parent section, `None` for the root
    pub parent: Option<String>,
    /// Attachment fraction along the parent, `None` for the root
    pub parent_x: Option<f64>,
    /// Ordered `[x, y, z, diameter]` samples (µm)
    pub points: Vec<[f64; 4]>,
    /// Optional fixed segment count, overrides the d_lambda rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nseg: Option<usize>,
}

/// Serialized form of a whole morphology data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphologyDescriptor {
    pub name: String,
    pub sections: Vec<SectionDescriptor>,
}

/// An unbranched neural process with derived arc length geometry
#[derive(Debug, Clone)]
pub struct Section {
    /// Stable section name
    pub name: String,
    /// Compartment class
    pub class: SectionClass,
    /// Index of the parent section, `None` for the root
    pub parent: Option<usize>,
    /// Attachment fraction along the parent (0 or 1 for new branches,
    /// occasionally interior for mid-section taps)
    pub parent_x: f64,
    /// Ordered 3d samples
    pub points: Vec<Point3d>,
    /// Cumulative arc length at each point (µm), starts at 0
    pub arc: Vec<f64>,
    /// Total length (µm)
    pub length: f64,
    /// Optional fixed segment count
    pub nseg_override: Option<usize>,
}

impl Section {
    /// Interpolated diameter at normalized position `x` along the arc (µm)
    pub fn diam_at(&self, x: f64) -> f64 {
        let target = x.clamp(0., 1.) * self.length;

        for i in 1..self.points.len() {
            if self.arc[i] >= target {
                let span = self.arc[i] - self.arc[i - 1];
                if span <= 0. {
                    return self.points[i].diam;
                }
                let frac = (target - self.arc[i - 1]) / span;

                return self.points[i - 1].diam
                    + frac * (self.points[i].diam - self.points[i - 1].diam);
            }
        }

        self.points[self.points.len() - 1].diam
    }
}

/// A tree of sections rooted at the first soma section, with a stable
/// name to handle registry so compartments are never referenced by
/// bare positional index
#[derive(Debug, Clone)]
pub struct Morphology {
    /// Morphology name, e.g. `CA229`
    pub name: String,
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

impl Morphology {
    /// Builds the section tree from a descriptor, validating connectivity,
    /// failing fast on a malformed graph rather than continuing with a
    /// partial tree
    pub fn from_descriptor(descriptor: MorphologyDescriptor) -> Result<Morphology, MorphologyError> {
        let mut sections: Vec<Section> = Vec::with_capacity(descriptor.sections.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut roots = 0;

        for entry in descriptor.sections {
            if index.contains_key(&entry.name) {
                return Err(MorphologyError::DuplicateSection(entry.name));
            }
            if entry.points.len() < 2 {
                return Err(MorphologyError::TooFewPoints(entry.name));
            }

            let parent = match &entry.parent {
                Some(parent_name) => match index.get(parent_name) {
                    Some(i) => Some(*i),
                    None => return Err(MorphologyError::MissingParent(entry.name)),
                },
                None => {
                    roots += 1;
                    None
                }
            };

            let parent_x = entry.parent_x.unwrap_or(1.);
            if !(0. ..=1.).contains(&parent_x) {
                return Err(MorphologyError::InvalidAttachment(entry.name));
            }

            let points: Vec<Point3d> = entry.points.iter()
                .map(|p| Point3d { x: p[0], y: p[1], z: p[2], diam: p[3] })
                .collect();

            if points.iter().any(|p| p.diam <= 0.) {
                return Err(MorphologyError::DegenerateGeometry(entry.name));
            }

            let mut arc = Vec::with_capacity(points.len());
            arc.push(0.);
            for i in 1..points.len() {
                arc.push(arc[i - 1] + points[i].distance_to(&points[i - 1]));
            }

            let length = arc[arc.len() - 1];
            if length <= 0. {
                return Err(MorphologyError::DegenerateGeometry(entry.name));
            }

            index.insert(entry.name.clone(), sections.len());
            sections.push(Section {
                name: entry.name,
                class: entry.class,
                parent,
                parent_x,
                points,
                arc,
                length,
                nseg_override: entry.nseg,
            });
        }

        if roots == 0 {
            return Err(MorphologyError::MissingRoot);
        }

        Ok(Morphology { name: descriptor.name, sections, index })
    }

    /// Parses a morphology from JSON data
    pub fn from_json_str(data: &str) -> Result<Morphology, MorphologyError> {
        let descriptor: MorphologyDescriptor = serde_json::from_str(data)
            .map_err(|err| MorphologyError::UnreadableData(err.to_string()))?;

        Morphology::from_descriptor(descriptor)
    }

    /// Parses a morphology from a JSON reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Morphology, MorphologyError> {
        let descriptor: MorphologyDescriptor = serde_json::from_reader(reader)
            .map_err(|err| MorphologyError::UnreadableData(err.to_string()))?;

        Morphology::from_descriptor(descriptor)
    }

    /// The full CA229 reconstruction (4 soma, 36 basal, 45 apical sections,
    /// `basal[16]` is repurposed as the axon during cell construction)
    pub fn ca229() -> Result<Morphology, MorphologyError> {
        Morphology::from_json_str(CA229_DATA)
    }

    /// The reduced 7 compartment variant (stylized cylinders, basal
    /// dendrites attached at soma mid-shaft, fixed basal segment counts)
    pub fn reduced() -> Morphology {
        let soma_l = 48.4;
        let soma_diam = 28.2;
        let axon_l = 594.3;
        let axon_diam = 1.41;
        let apic_l = 261.9;
        let apic_diam = 1.58;
        let bdend_l = 200.0;
        let bdend_diam = 2.28;

        let cylinder = |name: &str, class, parent: Option<&str>, parent_x, x0: f64, y0: f64, x1: f64, y1: f64, diam, nseg| {
            SectionDescriptor {
                name: name.to_string(),
                class,
                parent: parent.map(|p| p.to_string()),
                parent_x,
                points: vec![[x0, y0, 0., diam], [x1, y1, 0., diam]],
                nseg,
            }
        };

        let descriptor = MorphologyDescriptor {
            name: "CA229simp".to_string(),
            sections: vec![
                cylinder("soma", SectionClass::Soma, None, None,
                    0., 0., 0., soma_l, soma_diam, None),
                cylinder("axon", SectionClass::Axon, Some("soma"), Some(0.),
                    0., 0., 0., -axon_l, axon_diam, None),
                cylinder("Bdend1", SectionClass::Basal, Some("soma"), Some(0.5),
                    0., soma_l / 2., bdend_l, soma_l / 2., bdend_diam, Some(99)),
                cylinder("Bdend2", SectionClass::Basal, Some("soma"), Some(0.5),
                    0., soma_l / 2., -bdend_l, soma_l / 2., bdend_diam, Some(99)),
                cylinder("Adend1", SectionClass::Apical, Some("soma"), Some(1.),
                    0., soma_l, 0., soma_l + apic_l, apic_diam, None),
                cylinder("Adend2", SectionClass::Apical, Some("Adend1"), Some(1.),
                    0., soma_l + apic_l, 0., soma_l + 2. * apic_l, apic_diam, None),
                cylinder("Adend3", SectionClass::Apical, Some("Adend2"), Some(1.),
                    0., soma_l + 2. * apic_l, 0., soma_l + 3. * apic_l, apic_diam, None),
            ],
        };

        // the stylized descriptor is well formed by construction
        match Morphology::from_descriptor(descriptor) {
            Ok(morphology) => morphology,
            Err(_) => unreachable!(),
        }
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the morphology has no sections
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Resolves a section name to its index
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Gets a section by index
    pub fn section(&self, index: usize) -> &Section {
        &self.sections[index]
    }

    /// Gets a mutable section by index
    pub(crate) fn section_mut(&mut self, index: usize) -> &mut Section {
        &mut self.sections[index]
    }

    /// Gets a section by name
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.index_of(name).map(|i| &self.sections[i])
    }

    /// Iterates over all sections in creation order
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Index of the root section
    pub fn root(&self) -> usize {
        self.sections.iter()
            .position(|section| section.parent.is_none())
            .unwrap_or(0)
    }
}
