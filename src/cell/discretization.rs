//! Sizing of the spatial grid: the AC length constant of each section and
//! the d_lambda rule that turns it into an odd segment count.

use crate::morphology::Section;


/// AC length constant of a section (µm) at the given frequency (Hz),
/// computed from the full 3d diameter profile; sections without at least
/// two 3d points fall back to the closed form single cylinder estimate
///
/// `ra` is the axial resistivity (Ω·cm) and `cm` the specific membrane
/// capacitance (µF/cm²) the section carries at discretization time.
pub fn lambda_f(section: &Section, ra: f64, cm: f64, freq: f64) -> f64 {
    if section.points.len() < 2 {
        let diam = section.points.first().map(|p| p.diam).unwrap_or(1.);
        return 1e5 * (diam / (4. * std::f64::consts::PI * freq * ra * cm)).sqrt();
    }

    // accumulate section length in units of lambda over each 3d interval,
    // more accurate than a single cylinder when the diameter varies
    let mut lam = 0.;
    let mut x1 = section.arc[0];
    let mut d1 = section.points[0].diam;
    for i in 0..section.points.len() {
        let x2 = section.arc[i];
        let d2 = section.points[i].diam;
        lam += (x2 - x1) / (d1 + d2).sqrt();
        x1 = x2;
        d1 = d2;
    }
    lam *= 2f64.sqrt() * 1e-5 * (4. * std::f64::consts::PI * freq * ra * cm).sqrt();

    if lam <= 0. {
        return section.length;
    }

    section.length / lam
}

/// Segment count for a section via the d_lambda rule: enough odd segments
/// that each spans at most `d_lambda` of the AC length constant at `freq`
pub fn segment_count(section: &Section, ra: f64, cm: f64, freq: f64, d_lambda: f64) -> usize {
    let lambda = lambda_f(section, ra, cm, freq);

    (((section.length / (d_lambda * lambda) + 0.9) / 2.) as usize) * 2 + 1
}
