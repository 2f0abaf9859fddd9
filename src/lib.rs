//! Derives a code-formatter configuration file that best preserves the style of an existing
//! source corpus, by evolving candidate configurations against an empirical fitness function
//! measured by actually running the formatter.
//!
//! There are three main elements:
//! * The [`config`] module (the search space: a closed grammar of formatter option values).
//! * The [`fitness`] module (the search goal: run the formatter, measure how much it changed).
//! * The [`controller`] module (the search strategy: the generational evolutionary loop).
//!
//! A [`backend::Backend`] supplies everything specific to one third-party formatter
//! (clang-format or uncrustify); everything else in this crate is formatter-agnostic.
pub mod backend;
pub mod config;
pub mod controller;
pub mod crossover;
pub mod errors;
pub mod fitness;
pub mod global_rand;
pub mod mutate;
pub mod mutation;
pub mod population;
pub mod select;
pub mod worker_pool;
