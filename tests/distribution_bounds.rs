#[cfg(test)]
mod tests {
    use dendritic_plateaus::cell::{
        BiophysicsPreset, CellConfig, CellInstance, ConductanceRatios, ModelVariant,
    };
    use dendritic_plateaus::morphology::{
        Morphology, MorphologyDescriptor, SectionClass, SectionDescriptor,
    };

    /// A cell with one unrealistically long basal dendrite, far past every
    /// distance any rule was tuned for
    fn long_dendrite_cell() -> CellInstance {
        let morphology = Morphology::from_descriptor(MorphologyDescriptor {
            name: "stretched".to_string(),
            sections: vec![
                SectionDescriptor {
                    name: "soma".to_string(),
                    class: SectionClass::Soma,
                    parent: None,
                    parent_x: None,
                    points: vec![[0., 0., 0., 20.], [20., 0., 0., 20.]],
                    nseg: None,
                },
                SectionDescriptor {
                    name: "dend".to_string(),
                    class: SectionClass::Basal,
                    parent: Some("soma".to_string()),
                    parent_x: Some(1.),
                    points: vec![[20., 0., 0., 2.], [20020., 0., 0., 2.]],
                    nseg: None,
                },
                SectionDescriptor {
                    name: "apic".to_string(),
                    class: SectionClass::Apical,
                    parent: Some("soma".to_string()),
                    parent_x: Some(0.),
                    points: vec![[0., 0., 0., 2.], [-10000., 0., 0., 2.]],
                    nseg: None,
                },
            ],
        })
        .unwrap();

        let mut preset = BiophysicsPreset::full();
        preset.axon_substitution = None;

        CellInstance::from_morphology(
            morphology,
            CellConfig {
                variant: ModelVariant::Full,
                preset,
                ratios: ConductanceRatios::default(),
                celsius: 32.,
            },
        )
        .unwrap()
    }

    #[test]
    pub fn densities_never_leave_their_family_bounds() {
        let cell = long_dendrite_cell();
        let preset = BiophysicsPreset::full();
        let to_s_per_cm2 = 1e-4;

        for segment in cell.segments() {
            let mech = &segment.mechanisms;

            let na = mech.na.as_ref().unwrap().gbar;
            assert!(na >= 0. && na <= preset.g_na_max * to_s_per_cm2);

            let kv = mech.kv.as_ref().unwrap().gbar;
            assert!(kv >= 0. && kv <= preset.g_kv_max * to_s_per_cm2);

            let kap = mech.kap.as_ref().map(|c| c.gbar).unwrap_or(0.);
            let kad = mech.kad.as_ref().map(|c| c.gbar).unwrap_or(0.);
            assert!(kap >= 0. && kad >= 0.);
            assert!(kap + kad <= preset.g_ka_max * to_s_per_cm2 + 1e-15);
        }
    }

    #[test]
    pub fn distant_basal_sodium_clamps_to_zero_and_ka_to_its_cap() {
        let cell = long_dendrite_cell();
        let preset = BiophysicsPreset::full();
        let to_s_per_cm2 = 1e-4;

        let far = cell.target("dend", 0.99).unwrap();
        let far_segment = &cell.segments()[cell.segment_at(far)];
        assert!(far_segment.path_distance > 5000.);

        // the declining sodium rule bottoms out at zero
        assert_eq!(far_segment.mechanisms.na.as_ref().unwrap().gbar, 0.);

        // the growing A-type budget saturates at its cap, entirely in the
        // distal population
        let kap = far_segment.mechanisms.kap.as_ref().unwrap().gbar;
        let kad = far_segment.mechanisms.kad.as_ref().unwrap().gbar;
        assert_eq!(kap, 0.);
        assert!((kad - preset.g_ka_max * to_s_per_cm2).abs() < 1e-15);
    }

    #[test]
    pub fn ka_split_conserves_the_budget_everywhere() {
        let cell = long_dendrite_cell();
        let preset = BiophysicsPreset::full();
        let to_s_per_cm2 = 1e-4;

        for segment in cell.segments() {
            let class = cell.morphology().section(segment.section).class;
            let d = segment.path_distance;

            let expected = match class {
                SectionClass::Basal =>
                    (preset.soma_ka + preset.m_gka * d).clamp(0., preset.g_ka_max),
                SectionClass::Apical => preset.apical_ka,
                _ => continue,
            } * to_s_per_cm2;

            let kap = segment.mechanisms.kap.as_ref().map(|c| c.gbar).unwrap_or(0.);
            let kad = segment.mechanisms.kad.as_ref().map(|c| c.gbar).unwrap_or(0.);

            assert!(
                (kap + kad - expected).abs() < 1e-12,
                "split must conserve the budget at distance {}",
                d
            );
        }
    }

    #[test]
    pub fn conductance_ratios_scale_their_families_only() {
        let baseline = CellInstance::new(CellConfig::full()).unwrap();

        let mut config = CellConfig::full();
        config.ratios = ConductanceRatios { na: 1., hva: 3., lva: 0.5, ka: 1., bk: 2. };
        let scaled = CellInstance::new(config).unwrap();

        for (a, b) in scaled.segments().iter().zip(baseline.segments()) {
            if let (Some(sa), Some(sb)) = (&a.mechanisms.ca_hva, &b.mechanisms.ca_hva) {
                if sb.gbar > 0. {
                    assert!((sa.gbar / sb.gbar - 3.).abs() < 1e-9);
                }
            }
            if let (Some(sa), Some(sb)) = (&a.mechanisms.ca_lva, &b.mechanisms.ca_lva) {
                if sb.gbar > 0. {
                    assert!((sa.gbar / sb.gbar - 0.5).abs() < 1e-9);
                }
            }
            if let (Some(sa), Some(sb)) = (&a.mechanisms.kbk, &b.mechanisms.kbk) {
                if sb.gpeak > 0. {
                    assert!((sa.gpeak / sb.gpeak - 2.).abs() < 1e-9);
                }
            }
            // sodium and delayed rectifier stay untouched
            let na_a = a.mechanisms.na.as_ref().unwrap().gbar;
            let na_b = b.mechanisms.na.as_ref().unwrap().gbar;
            assert_eq!(na_a, na_b);
        }
    }

    #[test]
    pub fn manipulations_are_idempotent() {
        let mut cell = long_dendrite_cell();

        cell.no_calcium();
        let once: Vec<f64> = cell.segments().iter()
            .filter_map(|s| s.mechanisms.ca_hva.as_ref().map(|c| c.gbar))
            .collect();
        cell.no_calcium();
        let twice: Vec<f64> = cell.segments().iter()
            .filter_map(|s| s.mechanisms.ca_hva.as_ref().map(|c| c.gbar))
            .collect();

        assert!(once.iter().all(|g| *g == 0.));
        assert_eq!(once, twice);
    }
}
