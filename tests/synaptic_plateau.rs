#[cfg(test)]
mod tests {
    use dendritic_plateaus::cell::{CellConfig, CellInstance};
    use dendritic_plateaus::simulation::{count_spikes, RunResult, Simulation};
    use dendritic_plateaus::synapse::{
        AmpaSynapse, NetConnection, NmdaSynapse, PulseNmda, PulseSource,
    };

    const STIM_START: f64 = 60.;
    const DELAY: f64 = 10.;
    const T_STOP: f64 = 300.;

    /// Places the glutamatergic pool of the single stimulation protocol on
    /// `basal[34]` and runs the cell: `ampa_count` AMPA and `nmda_count`
    /// NMDA synapses spread over `[0.4, 0.7]`, all driven by one event
    fn glutamate_pool_run(ampa_count: usize, nmda_count: usize, weight: f64) -> RunResult {
        let cell = CellInstance::new(CellConfig::full()).unwrap();
        let soma = cell.target("soma[2]", 0.5).unwrap();
        let dend = cell.target("basal[34]", 0.5).unwrap();

        let mut simulation = Simulation::new(cell);
        let source = PulseSource::single(STIM_START);
        let connection = NetConnection { delay: DELAY, weight };

        for i in 0..ampa_count {
            let x = 0.4 + 0.3 * i as f64 / (ampa_count - 1).max(1) as f64;
            let location = simulation.cell().target("basal[34]", x).unwrap();
            let mut synapse = AmpaSynapse::new(location, 0.2);
            synapse.connect(&source, connection);
            simulation.attach(Box::new(synapse)).unwrap();
        }
        for i in 0..nmda_count {
            let x = 0.4 + 0.3 * i as f64 / (nmda_count - 1).max(1) as f64;
            let location = simulation.cell().target("basal[34]", x).unwrap();
            let mut synapse = NmdaSynapse::new(location, 0.1, PulseNmda::new(0.03, 1.));
            synapse.connect(&source, connection);
            simulation.attach(Box::new(synapse)).unwrap();
        }

        simulation.record_voltage("soma", soma).unwrap();
        simulation.record_voltage("dend", dend).unwrap();
        simulation.init();

        simulation.run(T_STOP).unwrap()
    }

    /// Baseline, peak amplitude above baseline, and duration above
    /// baseline + 10 mV of the post-stimulus window
    fn plateau_measures(result: &RunResult, label: &str) -> (f64, f64, f64) {
        let trace = result.trace(label).unwrap();
        let dt = result.time[1] - result.time[0];

        // pre-stimulus baseline window average
        let baseline_samples = ((STIM_START - 10.) / dt) as usize;
        let baseline: f64 = trace[..baseline_samples].iter().sum::<f64>() / baseline_samples as f64;

        let peak = trace.iter().cloned().fold(f64::NEG_INFINITY, f64::max) - baseline;
        let duration = trace.iter().filter(|v| **v > baseline + 10.).count() as f64 * dt;

        (baseline, peak, duration)
    }

    #[test]
    pub fn weak_input_stays_subthreshold() {
        let result = glutamate_pool_run(8, 8, 0.01);

        let soma = result.trace("soma").unwrap();
        assert_eq!(count_spikes(soma, 0.), 0);

        let (_, soma_peak, _) = plateau_measures(&result, "soma");
        let (_, dend_peak, _) = plateau_measures(&result, "dend");
        assert!(dend_peak > 0.1, "the pool must depolarize the dendrite");
        assert!(soma_peak < 10., "the somatic EPSP must stay small: {}", soma_peak);
    }

    #[test]
    pub fn subthreshold_response_grows_monotonically_with_weight() {
        let mut previous = 0.;
        for weight in [0.02, 0.05, 0.1] {
            let result = glutamate_pool_run(8, 8, weight);
            let (_, peak, _) = plateau_measures(&result, "dend");

            assert!(
                peak > previous,
                "dendritic amplitude must grow with weight: {} at {}",
                peak, weight,
            );
            previous = peak;
        }
    }

    #[test]
    pub fn strong_input_crosses_threshold_and_prolongs_the_plateau() {
        let weak = glutamate_pool_run(8, 8, 0.01);
        let strong = glutamate_pool_run(30, 16, 2.);

        let weak_soma = weak.trace("soma").unwrap();
        let strong_soma = strong.trace("soma").unwrap();

        assert_eq!(count_spikes(weak_soma, 0.), 0);
        assert!(count_spikes(strong_soma, 0.) >= 1, "strong input must evoke spikes");

        let (_, _, weak_duration) = plateau_measures(&weak, "dend");
        let (_, strong_peak, strong_duration) = plateau_measures(&strong, "dend");

        assert!(strong_peak > 30.);
        assert!(
            strong_duration > weak_duration,
            "regenerative input must outlast the weak response: {} vs {}",
            strong_duration, weak_duration,
        );
    }
}
