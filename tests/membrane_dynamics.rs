#[cfg(test)]
mod tests {
    use dendritic_plateaus::cell::{BiophysicsPreset, CellConfig, CellInstance, ModelVariant};
    use dendritic_plateaus::morphology::{Morphology, MorphologyDescriptor, SectionClass, SectionDescriptor};
    use dendritic_plateaus::simulation::{count_spikes, Simulation};
    use dendritic_plateaus::stimulus::CurrentClamp;

    /// A preset with every active conductance zeroed, leaving only the
    /// passive leak
    fn passive_preset() -> BiophysicsPreset {
        let mut preset = BiophysicsPreset::full();
        preset.soma_rm = 10000.;
        preset.soma_cm = 1.;
        preset.e_pas = -65.;
        preset.v_init = -65.;
        preset.soma_na = 0.;
        preset.axon_na = 0.;
        preset.basal_na = 0.;
        preset.m_na = 0.;
        preset.apical_na = 0.;
        preset.soma_kv = 0.;
        preset.m_kv = 0.;
        preset.axon_kv = 0.;
        preset.soma_ka = 0.;
        preset.m_gka = 0.;
        preset.apical_ka = 0.;
        preset.soma_ca_hva = 0.;
        preset.dend_ca_hva = 0.;
        preset.soma_ca_lva = 0.;
        preset.dend_ca_lva = 0.;
        preset.kbk_gpeak = 0.;
        preset.ih_soma = 0.;
        preset.ih_apical_scale = 0.;
        preset.g_kl = 0.;
        preset.axon_substitution = None;
        preset
    }

    fn soma_only_cell(preset: BiophysicsPreset) -> CellInstance {
        let morphology = Morphology::from_descriptor(MorphologyDescriptor {
            name: "soma_only".to_string(),
            sections: vec![SectionDescriptor {
                name: "soma".to_string(),
                class: SectionClass::Soma,
                parent: None,
                parent_x: None,
                points: vec![[0., 0., 0., 50.], [50., 0., 0., 50.]],
                nseg: None,
            }],
        })
        .unwrap();

        let config = CellConfig {
            variant: ModelVariant::Reduced,
            preset,
            ratios: Default::default(),
            celsius: 32.,
        };

        CellInstance::from_morphology(morphology, config).unwrap()
    }

    #[test]
    pub fn passive_soma_reproduces_the_rc_charging_curve() {
        let preset = passive_preset();
        let rm = preset.soma_rm;
        let cm = preset.soma_cm;
        let e_pas = preset.e_pas;

        let cell = soma_only_cell(preset);
        let area = cell.segments()[0].area;
        let soma = cell.target("soma", 0.5).unwrap();

        // input resistance (MΩ) of the single compartment and its time
        // constant (ms)
        let r_in = rm / (area * 1e-2);
        let tau = rm * cm * 1e-3;
        let amplitude = 0.05;
        let onset = 20.;

        let mut simulation = Simulation::new(cell);
        simulation.attach(Box::new(CurrentClamp::new(soma, amplitude, onset, 200.))).unwrap();
        simulation.record_voltage("soma", soma).unwrap();
        simulation.init();
        let result = simulation.run(220.).unwrap();

        let trace = result.trace("soma").unwrap();
        let delta_v = amplitude * r_in;

        for offset in [5., 10., 20., 50., 100.] {
            let t = onset + offset;
            let index = result.time.iter().position(|s| (*s - t).abs() < 1e-6).unwrap();
            let analytic = e_pas + delta_v * (1. - (-offset / tau).exp());
            let simulated = trace[index];

            assert!(
                (simulated - analytic).abs() < 0.03 * delta_v,
                "at {} ms after onset: simulated {} vs analytic {}",
                offset, simulated, analytic,
            );
        }

        // fully charged plateau sits at e_pas + I * R
        let last = *trace.last().unwrap();
        assert!((last - (e_pas + delta_v)).abs() < 0.02 * delta_v);
    }

    #[test]
    pub fn zero_input_passive_cell_stays_flat_at_v_init() {
        let cell = soma_only_cell(passive_preset());
        let soma = cell.target("soma", 0.5).unwrap();

        let mut simulation = Simulation::new(cell);
        simulation.record_voltage("soma", soma).unwrap();
        simulation.init();
        let result = simulation.run(200.).unwrap();

        let trace = result.trace("soma").unwrap();
        for v in trace {
            assert!((*v - -65.).abs() < 1e-9, "flat trace expected, got {}", v);
        }
    }

    #[test]
    pub fn full_cell_rests_quietly_without_input() {
        let cell = CellInstance::new(CellConfig::full()).unwrap();
        let soma = cell.target("soma[2]", 0.5).unwrap();
        let dend = cell.target("basal[34]", 0.5).unwrap();

        let mut simulation = Simulation::new(cell);
        simulation.record_voltage("soma", soma).unwrap();
        simulation.record_voltage("dend", dend).unwrap();
        simulation.init();
        let result = simulation.run(200.).unwrap();

        for label in ["soma", "dend"] {
            let trace = result.trace(label).unwrap();
            assert_eq!(count_spikes(trace, 0.), 0, "no spontaneous spikes at {}", label);

            let v_init = trace[0];
            for v in trace {
                assert!(
                    (*v - v_init).abs() < 15.,
                    "resting drift exceeded bounds at {}: {} vs {}",
                    label, v, v_init,
                );
            }
        }
    }
}
