//! Path distance along the section tree between two explicit locations.
//!
//! Every query names its origin and target, there is no implicit reference
//! section. Distances from the fixed soma reference are computed once per
//! segment during construction and cached, since every distance dependent
//! distribution rule re-queries them.

use crate::morphology::Morphology;
use super::SectionTarget;


/// Position while walking up the tree: a section index and an absolute
/// position (µm) along that section
#[derive(Clone, Copy)]
struct WalkPoint {
    section: usize,
    /// Position along the section (µm from the 0 end)
    position: f64,
    /// Path length accumulated so far (µm)
    walked: f64,
}

fn depth(morphology: &Morphology, section: usize) -> usize {
    let mut depth = 0;
    let mut current = section;
    while let Some(parent) = morphology.section(current).parent {
        depth += 1;
        current = parent;
    }

    depth
}

/// Hop from a point on a section to the attachment point on its parent,
/// accumulating the walked distance
fn hop_to_parent(morphology: &Morphology, lengths: &[f64], point: WalkPoint) -> WalkPoint {
    let section = morphology.section(point.section);
    let parent = match section.parent {
        Some(parent) => parent,
        None => return point,
    };

    WalkPoint {
        section: parent,
        position: section.parent_x * lengths[parent],
        walked: point.walked + point.position,
    }
}

/// Path distance (µm) between two locations, additive along the unique
/// tree path through the nearest common ancestor
///
/// `lengths` supplies the effective electrical length of each section by
/// index (the substituted axon differs from its reconstructed arc length).
pub fn distance_between(
    morphology: &Morphology,
    lengths: &[f64],
    a: SectionTarget,
    b: SectionTarget,
) -> f64 {
    let mut pa = WalkPoint {
        section: a.section,
        position: a.x * lengths[a.section],
        walked: 0.,
    };
    let mut pb = WalkPoint {
        section: b.section,
        position: b.x * lengths[b.section],
        walked: 0.,
    };

    let mut depth_a = depth(morphology, pa.section);
    let mut depth_b = depth(morphology, pb.section);

    while depth_a > depth_b {
        pa = hop_to_parent(morphology, lengths, pa);
        depth_a -= 1;
    }
    while depth_b > depth_a {
        pb = hop_to_parent(morphology, lengths, pb);
        depth_b -= 1;
    }
    while pa.section != pb.section {
        pa = hop_to_parent(morphology, lengths, pa);
        pb = hop_to_parent(morphology, lengths, pb);
    }

    pa.walked + pb.walked + (pa.position - pb.position).abs()
}
