#[cfg(test)]
mod tests {
    use dendritic_plateaus::cell::{CellConfig, CellInstance};
    use dendritic_plateaus::error::{SimulationError, StimulusError};
    use dendritic_plateaus::simulation::{Simulation, SimulationStatus};
    use dendritic_plateaus::stimulus::CurrentClamp;

    fn reduced_simulation() -> Simulation {
        Simulation::new(CellInstance::new(CellConfig::reduced()).unwrap())
    }

    #[test]
    pub fn running_before_initialization_is_rejected() {
        let mut simulation = reduced_simulation();

        assert!(matches!(
            simulation.run(100.),
            Err(SimulationError::NotInitialized)
        ));
    }

    #[test]
    pub fn attaching_after_initialization_is_rejected() {
        let mut simulation = reduced_simulation();
        let soma = simulation.cell().target("soma", 0.5).unwrap();

        simulation.init();

        let clamp = CurrentClamp::new(soma, 0.1, 10., 50.);
        assert!(matches!(
            simulation.attach(Box::new(clamp)),
            Err(StimulusError::AttachAfterInit)
        ));
        assert!(matches!(
            simulation.record_voltage("soma", soma),
            Err(StimulusError::AttachAfterInit)
        ));
    }

    #[test]
    pub fn halted_simulations_require_reinitialization() {
        let mut simulation = reduced_simulation();
        let soma = simulation.cell().target("soma", 0.5).unwrap();
        simulation.record_voltage("soma", soma).unwrap();

        simulation.init();
        simulation.run(10.).unwrap();
        assert_eq!(simulation.status(), SimulationStatus::Halted);

        assert!(matches!(
            simulation.run(20.),
            Err(SimulationError::AlreadyHalted)
        ));

        simulation.init();
        assert_eq!(simulation.status(), SimulationStatus::Initialized);
        assert!(simulation.run(10.).is_ok());
    }

    #[test]
    pub fn divergence_is_surfaced_as_a_run_failure() {
        let mut simulation = reduced_simulation();
        let soma = simulation.cell().target("soma", 0.5).unwrap();

        // an absurd current overflows the voltage solve within a step
        simulation.attach(Box::new(CurrentClamp::new(soma, 1e308, 0., 100.))).unwrap();
        simulation.record_voltage("soma", soma).unwrap();
        simulation.init();

        match simulation.run(100.) {
            Err(SimulationError::Diverged { time_ms }) => {
                assert!(time_ms <= 100.);
            }
            other => panic!("expected divergence, got {:?}", other.map(|r| r.steps)),
        }

        assert_eq!(simulation.status(), SimulationStatus::Halted);
    }

    #[test]
    pub fn stop_time_must_be_ahead() {
        let mut simulation = reduced_simulation();
        simulation.init();

        assert!(matches!(
            simulation.run(0.),
            Err(SimulationError::InvalidStopTime(_))
        ));
    }
}
