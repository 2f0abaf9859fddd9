//! [`Candidate`]/[`Population`] (§3): a configuration paired with its fitness-or-failure, and the
//! fixed-size sequence of candidates the controller evolves generation over generation.
//!
//! Grounded on the teacher crate's `Population<T> { chromosomes: Vec<Chromosome<T>>, .. }` and its
//! `best_chromosome`/`best_chromosome_index` helpers, trimmed of the recycling-bin and
//! cardinality-estimator machinery that exists there to support populations orders of magnitude
//! larger than this crate's (tens, not tens of thousands, of candidates).
use crate::config::Config;

pub type FitnessValue = u64;

/// `(edit_distance_sum, deleted_lines_sum)` per §3/§4.4, compared lexicographically and minimized.
/// `None` on a [`Candidate`] marks a failed evaluation (§4.4 step 3): the candidate is excluded
/// from ranking and recombination (§7 "soft failures are tolerated and absorbed by selection
/// pressure").
pub type FitnessVector = Vec<FitnessValue>;

pub fn is_perfect_match(fitness: &FitnessVector) -> bool {
    fitness.iter().all(|&component| component == 0)
}

#[derive(Clone, Debug)]
pub struct Candidate {
    pub config: Config,
    pub fitness: Option<FitnessVector>,
}

impl Candidate {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            fitness: None,
        }
    }

    pub fn with_fitness(config: Config, fitness: FitnessVector) -> Self {
        Self {
            config,
            fitness: Some(fitness),
        }
    }

    pub fn is_scored(&self) -> bool {
        self.fitness.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Population {
    pub candidates: Vec<Candidate>,
}

impl Population {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn size(&self) -> usize {
        self.candidates.len()
    }

    /// Drop candidates whose evaluation failed (§4.6 step 2).
    pub fn retain_scored(&mut self) {
        self.candidates.retain(Candidate::is_scored);
    }

    /// Sort ascending by fitness (smaller is better); unscored candidates are treated as
    /// infinitely bad and sink to the end, though by the time this is called they have usually
    /// already been dropped via [`Self::retain_scored`].
    pub fn sort_by_fitness_ascending(&mut self) {
        self.candidates
            .sort_by(|a, b| match (&a.fitness, &b.fitness) {
                (Some(fa), Some(fb)) => fa.cmp(fb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn worst(&self) -> Option<&Candidate> {
        self.candidates.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn candidate(fitness: Option<Vec<u64>>) -> Candidate {
        match fitness {
            Some(f) => Candidate::with_fitness(Config::new(), f),
            None => Candidate::new(Config::new()),
        }
    }

    #[test]
    fn retain_scored_drops_failures() {
        let mut population = Population::new(vec![
            candidate(Some(vec![1, 0])),
            candidate(None),
            candidate(Some(vec![0, 0])),
        ]);
        population.retain_scored();
        assert_eq!(population.size(), 2);
    }

    #[test]
    fn sort_is_lexicographic_ascending() {
        let mut population = Population::new(vec![
            candidate(Some(vec![5, 0])),
            candidate(Some(vec![2, 9])),
            candidate(Some(vec![2, 1])),
        ]);
        population.sort_by_fitness_ascending();
        let fitnesses: Vec<_> = population
            .candidates
            .iter()
            .map(|c| c.fitness.clone().unwrap())
            .collect();
        assert_eq!(fitnesses, vec![vec![2, 1], vec![2, 9], vec![5, 0]]);
    }

    #[test]
    fn perfect_match_is_all_zero_components() {
        assert!(is_perfect_match(&vec![0, 0]));
        assert!(!is_perfect_match(&vec![0, 1]));
    }
}
