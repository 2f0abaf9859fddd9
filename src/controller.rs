//! The evolutionary controller (§4.6): the generational loop, the adaptive mutation-rate regime
//! table, elite promotion/drift, and termination. Grounded on the teacher crate's
//! `strategy::evolve::Evolve` + `EvolveBuilder` for the overall builder/run shape, and on
//! `original_source/__main__.py`'s `main` loop and `recombine.py`'s `recombine` for the exact
//! regime multipliers and recombination order.
use crate::backend::Backend;
use crate::config::Config;
use crate::crossover::crossover;
use crate::errors::{TryFromEvolveBuilderError, UnformatError};
use crate::fitness::{Evaluator, FitnessEvaluator};
use crate::mutate::mutate_config;
use crate::population::{is_perfect_match, Candidate, FitnessVector, Population};
use crate::select::choose_from_ranked;
use crate::worker_pool::WorkerPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type DynBackend = Arc<dyn Backend>;

/// §4.6 table, and `original_source/__main__.py`'s `mutation_factor_*` constants.
const MUTATION_FACTOR_PROGRESS: f32 = 1.50;
const MUTATION_FACTOR_STAGNATION: f32 = 0.95;
const MUTATION_FACTOR_STASIS: f32 = 100.0;
const MUTATION_FACTOR_REGRESS: f32 = 0.75;

pub struct EvolveControllerBuilder {
    backend: Option<DynBackend>,
    command: Option<String>,
    example_paths: Option<Vec<PathBuf>>,
    population_size: usize,
    initial_mutation_rate: f32,
    generations_without_progress_ceiling: usize,
    jobs: usize,
    initial_config: Option<Config>,
    locked_keys: Vec<String>,
    root: Option<PathBuf>,
    evaluator: Option<Box<dyn Evaluator>>,
}

impl Default for EvolveControllerBuilder {
    fn default() -> Self {
        Self {
            backend: None,
            command: None,
            example_paths: None,
            population_size: 40,
            initial_mutation_rate: 0.05,
            generations_without_progress_ceiling: 50,
            jobs: 0,
            initial_config: None,
            locked_keys: Vec::new(),
            root: None,
            evaluator: None,
        }
    }
}

impl EvolveControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_example_paths(mut self, example_paths: Vec<PathBuf>) -> Self {
        self.example_paths = Some(example_paths);
        self
    }

    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    pub fn with_initial_mutation_rate(mut self, rate: f32) -> Self {
        self.initial_mutation_rate = rate;
        self
    }

    pub fn with_generations_without_progress_ceiling(mut self, ceiling: usize) -> Self {
        self.generations_without_progress_ceiling = ceiling;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_initial_config(mut self, config: Config) -> Self {
        self.initial_config = Some(config);
        self
    }

    pub fn with_locked_keys(mut self, locked_keys: Vec<String>) -> Self {
        self.locked_keys = locked_keys;
        self
    }

    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = Some(root);
        self
    }

    /// Substitute a scripted or otherwise non-subprocess [`Evaluator`] for the default
    /// [`FitnessEvaluator`]. When set, `example_paths` is no longer required to build.
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn build(self) -> Result<EvolveController, TryFromEvolveBuilderError> {
        let backend = self
            .backend
            .ok_or(TryFromEvolveBuilderError("backend is required"))?;
        let command = self
            .command
            .unwrap_or_else(|| backend.default_command().to_string());
        if self.population_size == 0 {
            return Err(TryFromEvolveBuilderError("population_size must be > 0"));
        }
        if !(self.initial_mutation_rate > 0.0 && self.initial_mutation_rate <= 1.0) {
            return Err(TryFromEvolveBuilderError(
                "initial_mutation_rate must be in (0, 1]",
            ));
        }

        let mutation_schema = backend
            .mutation_rules(&command)
            .map_err(|_| TryFromEvolveBuilderError("failed to introspect formatter mutation schema"))?;
        let worker_pool = WorkerPool::new(self.jobs);
        let evaluator = match self.evaluator {
            Some(evaluator) => evaluator,
            None => {
                let example_paths = self
                    .example_paths
                    .filter(|paths| !paths.is_empty())
                    .ok_or(TryFromEvolveBuilderError(
                        "at least one example source file is required",
                    ))?;
                Box::new(FitnessEvaluator::new(
                    Arc::clone(&backend),
                    command.clone(),
                    example_paths,
                ))
            }
        };

        Ok(EvolveController {
            backend,
            command,
            evaluator,
            worker_pool,
            mutation_schema,
            population_size: self.population_size,
            mutation_rate: self.initial_mutation_rate,
            generations_without_progress_ceiling: self.generations_without_progress_ceiling,
            initial_config: self.initial_config,
            locked_keys: self.locked_keys,
            root: self.root,
        })
    }
}

pub struct EvolveController {
    backend: DynBackend,
    command: String,
    evaluator: Box<dyn Evaluator>,
    worker_pool: WorkerPool,
    mutation_schema: crate::mutation::MutationSchema,
    population_size: usize,
    mutation_rate: f32,
    generations_without_progress_ceiling: usize,
    initial_config: Option<Config>,
    locked_keys: Vec<String>,
    root: Option<PathBuf>,
}

impl EvolveController {
    pub fn builder() -> EvolveControllerBuilder {
        EvolveControllerBuilder::new()
    }

    fn initial_population(&self) -> Result<Population, UnformatError> {
        let seed_configs = match &self.initial_config {
            Some(config) => vec![config.clone()],
            None => self.backend.default_configs(&self.command)?,
        };
        Ok(Population::new(
            seed_configs.into_iter().map(Candidate::new).collect(),
        ))
    }

    /// Run the generational loop to termination (§4.6 "Termination"): perfect match, the
    /// no-progress ceiling, or `interrupted` being set from outside (e.g. a Ctrl-C handler
    /// installed by the caller). Always presents the best-ever elite exactly once before
    /// returning, even on interrupt.
    pub fn run(&mut self, interrupted: Arc<AtomicBool>) -> Result<Config, UnformatError> {
        let mut population = self.initial_population()?;
        let mut elite: Option<Candidate> = None;
        let mut generations_since_progress = 0usize;

        loop {
            if interrupted.load(Ordering::SeqCst) {
                log::info!("interrupted; presenting best-ever elite");
                break;
            }
            if generations_since_progress > self.generations_without_progress_ceiling {
                log::info!(
                    "no progress in {generations_since_progress} generations; giving up"
                );
                break;
            }

            self.evaluate_in_place(&mut population)?;
            population.retain_scored();
            if population.size() == 0 {
                return Err(UnformatError::GenerationScoringFailure);
            }

            let mut ranked = population.candidates.clone();
            if let Some(elite_candidate) = &elite {
                ranked.push(elite_candidate.clone());
            }
            ranked.sort_by(|a, b| a.fitness.cmp(&b.fitness));

            let best = ranked.first().expect("ranked is non-empty").clone();
            let worst = ranked.last().expect("ranked is non-empty").clone();

            match &elite {
                None => {
                    elite = Some(best.clone());
                    self.present(&best.config, false)?;
                }
                Some(elite_candidate) => {
                    let regime = classify_regime(&best, &worst, elite_candidate);
                    self.mutation_rate = apply_regime(self.mutation_rate, regime);

                    match regime {
                        Regime::Regress => {
                            generations_since_progress += 1;
                        }
                        Regime::Progress => {
                            generations_since_progress = 0;
                            elite = Some(best.clone());
                            self.present(&best.config, false)?;
                        }
                        Regime::Stasis | Regime::Stagnation => {
                            generations_since_progress += 1;
                            // Promote drift: varying the elite choice even without improvement
                            // lets selection sample across a flat fitness ridge instead of
                            // fixating on one representative of it (§4.6 "Elite update").
                            elite = Some(best.clone());
                            self.present(&best.config, false)?;
                        }
                    }
                }
            }

            if let Some(elite_candidate) = &elite {
                if let Some(fitness) = &elite_candidate.fitness {
                    if is_perfect_match(fitness) {
                        log::info!("matching configuration file found");
                        break;
                    }
                }
            }

            population = self.next_generation(&ranked)?;
        }

        let elite = elite.ok_or(UnformatError::GenerationScoringFailure)?;
        self.present(&elite.config, true)?;
        Ok(elite.config)
    }

    fn evaluate_in_place(&self, population: &mut Population) -> Result<(), UnformatError> {
        let results: Vec<Result<Option<FitnessVector>, UnformatError>> =
            self.worker_pool.map(&population.candidates, |candidate| {
                self.evaluator.evaluate(&candidate.config)
            });

        for (candidate, result) in population.candidates.iter_mut().zip(results) {
            candidate.fitness = result?;
        }
        Ok(())
    }

    /// A mismatched value shape for the same key between two parents (§4.3, §7) is a bug in the
    /// backend's schema, not a recoverable runtime condition; it aborts the run rather than
    /// silently falling back to one parent.
    fn next_generation(&self, ranked: &[Candidate]) -> Result<Population, UnformatError> {
        let offspring = (0..self.population_size)
            .map(|_| {
                let parent_a = choose_from_ranked(ranked);
                let parent_b = choose_from_ranked(ranked);
                let child = crossover(&parent_a.config, &parent_b.config)?;
                let mut mutated = mutate_config(
                    &child,
                    self.mutation_rate,
                    &self.mutation_schema,
                    &self.locked_keys,
                );
                self.backend.sanitize(&mut mutated);
                Ok(Candidate::new(mutated))
            })
            .collect::<Result<Vec<_>, UnformatError>>()?;
        Ok(Population::new(offspring))
    }

    /// §4.6 "Elite update": persist the current best. If `--root` was given, overwrite the
    /// configuration file there on every new-elite event and once more, finally, on termination
    /// (`is_final`); otherwise print to standard output exactly once, on termination.
    fn present(&self, config: &Config, is_final: bool) -> Result<(), UnformatError> {
        match &self.root {
            Some(root) => {
                let path = root.join(self.backend.default_config_filename());
                std::fs::write(&path, self.backend.encode(config))
                    .map_err(UnformatError::ScratchWorkspace)?;
            }
            None => {
                if is_final {
                    let bytes = self.backend.encode(config);
                    print!("{}", String::from_utf8_lossy(&bytes));
                }
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Regime {
    Progress,
    Regress,
    Stasis,
    Stagnation,
}

fn classify_regime(best: &Candidate, worst: &Candidate, elite: &Candidate) -> Regime {
    match best.fitness.cmp(&elite.fitness) {
        std::cmp::Ordering::Greater => Regime::Regress,
        std::cmp::Ordering::Less => Regime::Progress,
        std::cmp::Ordering::Equal => {
            if worst.fitness == elite.fitness {
                Regime::Stasis
            } else {
                Regime::Stagnation
            }
        }
    }
}

fn apply_regime(rate: f32, regime: Regime) -> f32 {
    let multiplier = match regime {
        Regime::Progress => MUTATION_FACTOR_PROGRESS,
        Regime::Regress => MUTATION_FACTOR_REGRESS,
        Regime::Stasis => MUTATION_FACTOR_STASIS,
        Regime::Stagnation => MUTATION_FACTOR_STAGNATION,
    };
    let next = rate * multiplier;
    assert!(next > 0.0, "mutation rate must stay strictly positive");
    next.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(fitness: Vec<u64>) -> Candidate {
        Candidate::with_fitness(Config::new(), fitness)
    }

    #[test]
    fn regress_when_best_is_worse_than_elite() {
        let elite = candidate(vec![0, 0]);
        let best = candidate(vec![1, 0]);
        let worst = candidate(vec![5, 0]);
        assert_eq!(classify_regime(&best, &worst, &elite), Regime::Regress);
    }

    #[test]
    fn progress_when_best_is_better_than_elite() {
        let elite = candidate(vec![5, 0]);
        let best = candidate(vec![1, 0]);
        let worst = candidate(vec![9, 0]);
        assert_eq!(classify_regime(&best, &worst, &elite), Regime::Progress);
    }

    #[test]
    fn stasis_when_entire_generation_matches_elite() {
        let elite = candidate(vec![3, 0]);
        let best = candidate(vec![3, 0]);
        let worst = candidate(vec![3, 0]);
        assert_eq!(classify_regime(&best, &worst, &elite), Regime::Stasis);
    }

    #[test]
    fn stagnation_when_best_matches_elite_but_worst_does_not() {
        let elite = candidate(vec![3, 0]);
        let best = candidate(vec![3, 0]);
        let worst = candidate(vec![9, 0]);
        assert_eq!(classify_regime(&best, &worst, &elite), Regime::Stagnation);
    }

    #[test]
    fn apply_regime_clamps_at_one() {
        assert_eq!(apply_regime(0.9, Regime::Progress), 1.0);
    }

    #[test]
    fn apply_regime_never_reaches_zero() {
        let mut rate = 1.0f32;
        for _ in 0..200 {
            rate = apply_regime(rate, Regime::Regress);
            assert!(rate > 0.0);
        }
    }

    #[test]
    fn builder_requires_backend_and_examples() {
        let result = EvolveControllerBuilder::new().build();
        assert!(result.is_err());
    }

    /// A scripted [`Evaluator`]: returns the next fitness vector from a fixed sequence on each
    /// call, repeating the last entry once exhausted. Lets the generational loop, the regime
    /// classifier, and termination be exercised without spawning a real formatter subprocess.
    #[derive(Debug)]
    struct ScriptedEvaluator {
        script: std::sync::Mutex<(Vec<FitnessVector>, usize)>,
    }

    impl ScriptedEvaluator {
        fn new(script: Vec<FitnessVector>) -> Self {
            Self {
                script: std::sync::Mutex::new((script, 0)),
            }
        }
    }

    impl Evaluator for ScriptedEvaluator {
        fn evaluate(&self, _config: &Config) -> Result<Option<FitnessVector>, UnformatError> {
            let mut guard = self.script.lock().expect("lock is never poisoned");
            let (script, next) = &mut *guard;
            let index = (*next).min(script.len() - 1);
            *next += 1;
            Ok(Some(script[index].clone()))
        }
    }

    fn controller_with_scripted_evaluator(
        script: Vec<FitnessVector>,
        population_size: usize,
        generations_without_progress_ceiling: usize,
    ) -> EvolveController {
        EvolveController::builder()
            .with_backend(Arc::new(crate::backend::ClangFormatBackend::new()))
            .with_initial_config(Config::new())
            .with_population_size(population_size)
            .with_generations_without_progress_ceiling(generations_without_progress_ceiling)
            .with_evaluator(Box::new(ScriptedEvaluator::new(script)))
            .build()
            .expect("scripted evaluator satisfies the example-paths requirement")
    }

    #[test]
    fn with_evaluator_bypasses_example_paths_requirement() {
        let result = EvolveControllerBuilder::new()
            .with_backend(Arc::new(crate::backend::ClangFormatBackend::new()))
            .with_initial_config(Config::new())
            .with_evaluator(Box::new(ScriptedEvaluator::new(vec![vec![0, 0]])))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn run_terminates_on_perfect_match_from_scripted_evaluator() {
        // Every candidate in every generation is scored identically by this mock, so the whole
        // first generation immediately reaches the all-zero fitness vector and the loop should
        // stop on its first pass, never reaching the no-progress ceiling.
        let mut controller = controller_with_scripted_evaluator(vec![vec![0, 0]], 3, 50);
        let interrupted = Arc::new(AtomicBool::new(false));
        let result = controller.run(interrupted);
        assert!(result.is_ok());
    }

    #[test]
    fn run_gives_up_after_ceiling_generations_without_progress() {
        // A constant nonzero score never improves on the elite once one is chosen, so every
        // generation after the first is Stasis/Stagnation and the ceiling trips.
        let mut controller = controller_with_scripted_evaluator(vec![vec![3, 1]], 2, 2);
        let interrupted = Arc::new(AtomicBool::new(false));
        let result = controller.run(interrupted);
        assert!(result.is_ok());
        let config = result.unwrap();
        // The scripted evaluator never returns a perfect match, so the elite config is whatever
        // candidate happened to win ties; the important assertion is termination, not its value.
        let _ = config;
    }
}
