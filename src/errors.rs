//! Error taxonomy (§7). Fatal, caller-matchable conditions live in [`UnformatError`]; builder
//! misuse keeps the teacher crate's own minimal convention below, because that class of error is
//! a programmer mistake in wiring a builder, not a runtime condition worth a `thiserror` variant.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnformatError {
    #[error("failed to find example source files in {paths}")]
    SeedFailure { paths: String },

    #[error("failed to decode initial configuration from '{path}': {source}")]
    InitialConfigDecode {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(
        "failed to score any config files (does the given config file run on the given source files?)"
    )]
    GenerationScoringFailure,

    #[error("key '{key}' has incompatible types between parents ({type_a} vs {type_b})")]
    SchemaInconsistency {
        key: String,
        type_a: String,
        type_b: String,
    },

    #[error("failed to invoke formatter command '{command}': {source}")]
    FormatterSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration to scratch workspace: {0}")]
    ScratchWorkspace(#[source] std::io::Error),
}

/// Error returned when the evolve controller builder has invalid or missing configuration.
/// Contains a descriptive message about what went wrong (e.g. missing genotype, missing backend).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TryFromEvolveBuilderError(pub &'static str);

impl std::fmt::Display for TryFromEvolveBuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TryFromEvolveBuilderError {}
