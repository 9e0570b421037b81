use std::fmt::{Display, Debug, Formatter, Result};


/// Error set for potential morphology construction errors
pub enum MorphologyError {
    /// Parent section referenced before it was created
    MissingParent(String),
    /// Section declared more than once
    DuplicateSection(String),
    /// Section has fewer than two 3d points
    TooFewPoints(String),
    /// Section has a non-positive length or diameter
    DegenerateGeometry(String),
    /// Attachment fraction outside of `[0, 1]`
    InvalidAttachment(String),
    /// Morphology has no root section
    MissingRoot,
    /// Section named for axon substitution does not exist
    MissingSubstitutionTarget(String),
    /// Morphology data could not be parsed
    UnreadableData(String),
}

impl Display for MorphologyError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            MorphologyError::MissingParent(name) =>
                write!(f, "Parent of section '{}' does not exist yet", name),
            MorphologyError::DuplicateSection(name) =>
                write!(f, "Section '{}' declared more than once", name),
            MorphologyError::TooFewPoints(name) =>
                write!(f, "Section '{}' needs at least two 3d points", name),
            MorphologyError::DegenerateGeometry(name) =>
                write!(f, "Section '{}' has a non-positive length or diameter", name),
            MorphologyError::InvalidAttachment(name) =>
                write!(f, "Section '{}' attachment fraction must be within [0, 1]", name),
            MorphologyError::MissingRoot =>
                write!(f, "Morphology has no root section"),
            MorphologyError::MissingSubstitutionTarget(name) =>
                write!(f, "Section '{}' named for axon substitution does not exist", name),
            MorphologyError::UnreadableData(reason) =>
                write!(f, "Morphology data could not be parsed: {}", reason),
        }
    }
}

impl Debug for MorphologyError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// Error set for potential stimulus and recording placement errors
pub enum StimulusError {
    /// Section name cannot be resolved
    UnknownSection(String),
    /// Normalized position outside of a section's valid domain
    LocationOutOfRange(String, f64),
    /// Stimuli and recorders must be attached before initialization
    AttachAfterInit,
}

impl Display for StimulusError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            StimulusError::UnknownSection(name) =>
                write!(f, "Section '{}' not present in this cell", name),
            StimulusError::LocationOutOfRange(name, x) =>
                write!(f, "Location {} is outside [0, 1] on section '{}'", x, name),
            StimulusError::AttachAfterInit =>
                write!(f, "Stimuli and recorders must be attached before initialization"),
        }
    }
}

impl Debug for StimulusError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// Error set for potential simulation run errors
pub enum SimulationError {
    /// Integration produced a non-finite membrane potential
    Diverged {
        /// Simulated time at which the divergence was detected (ms)
        time_ms: f64,
    },
    /// Simulation must be initialized before running
    NotInitialized,
    /// Simulation has halted and must be re-initialized before running again
    AlreadyHalted,
    /// Stop time must be ahead of the current simulation time
    InvalidStopTime(f64),
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            SimulationError::Diverged { time_ms } =>
                write!(f, "Integration diverged (non-finite voltage) at {} ms", time_ms),
            SimulationError::NotInitialized =>
                write!(f, "Simulation must be initialized before running"),
            SimulationError::AlreadyHalted =>
                write!(f, "Simulation has halted and must be re-initialized before running again"),
            SimulationError::InvalidStopTime(t) =>
                write!(f, "Stop time {} ms is not ahead of the current simulation time", t),
        }
    }
}

impl Debug for SimulationError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// A set of errors that may occur when using the library
pub enum DendriticPlateausError {
    /// Errors related to morphology construction
    MorphologyRelatedError(MorphologyError),
    /// Errors related to stimulus and recording placement
    StimulusRelatedError(StimulusError),
    /// Errors related to simulation runs
    SimulationRelatedError(SimulationError),
}

impl Display for DendriticPlateausError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            DendriticPlateausError::MorphologyRelatedError(err) => write!(f, "{}", err),
            DendriticPlateausError::StimulusRelatedError(err) => write!(f, "{}", err),
            DendriticPlateausError::SimulationRelatedError(err) => write!(f, "{}", err),
        }
    }
}

impl Debug for DendriticPlateausError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl From<MorphologyError> for DendriticPlateausError {
    fn from(err: MorphologyError) -> DendriticPlateausError {
        DendriticPlateausError::MorphologyRelatedError(err)
    }
}

impl From<StimulusError> for DendriticPlateausError {
    fn from(err: StimulusError) -> DendriticPlateausError {
        DendriticPlateausError::StimulusRelatedError(err)
    }
}

impl From<SimulationError> for DendriticPlateausError {
    fn from(err: SimulationError) -> DendriticPlateausError {
        DendriticPlateausError::SimulationRelatedError(err)
    }
}
