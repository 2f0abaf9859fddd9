//! The Backend adapter (§4.1, §9 "Polymorphism over backends"): isolates all per-formatter
//! knowledge behind one small trait, implemented by two concrete records rather than by
//! inheritance — the same shape as the teacher crate's `mutate::dispatch::Dispatch` /
//! `crossover::dispatch::Dispatch`, generalized from "one of several generic-algorithm-internal
//! strategies" to "one of several third-party formatters."
pub mod clang_format;
pub mod uncrustify;

pub use clang_format::ClangFormatBackend;
pub use uncrustify::UncrustifyBackend;

use crate::config::Config;
use crate::errors::UnformatError;
use crate::mutation::MutationSchema;

/// All per-formatter knowledge the rest of the crate needs, in one place (§4.1).
pub trait Backend: std::fmt::Debug + Send + Sync {
    /// The executable name to invoke, e.g. `"clang-format"`.
    fn default_command(&self) -> &str;

    /// The filename convention the formatter expects in its working directory, e.g.
    /// `".clang-format"`.
    fn default_config_filename(&self) -> &str;

    /// Decode a configuration from its on-disk byte representation. May fail on malformed input.
    fn decode(&self, bytes: &[u8]) -> Result<Config, UnformatError>;

    /// Encode a configuration to its on-disk byte representation. Total.
    fn encode(&self, config: &Config) -> Vec<u8>;

    /// One or more seed configurations, typically obtained by introspecting the formatter
    /// executable itself (its built-in named styles, or its option defaults).
    fn default_configs(&self, command: &str) -> Result<Vec<Config>, UnformatError>;

    /// The argv to format one file, reading source from standard input.
    fn format_args(&self, command: &str, source_filename: &str) -> Vec<String>;

    /// The per-key mutation schema, possibly derived by introspecting the formatter.
    fn mutation_rules(&self, command: &str) -> Result<MutationSchema, UnformatError>;

    /// In-place fixup of any cross-key invariant the mutation engine cannot express on its own
    /// (e.g. forcing one key to a fixed value because it conflicts with another).
    fn sanitize(&self, config: &mut Config);
}
