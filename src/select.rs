//! Rank-based parent selection (§4.6 step 5, §9 "Worker-pool parent selection"), combining the
//! teacher crate's `select::Tournament` (rank-biased repeated sampling) and `select::Elite`
//! (sort-then-pick) into the single biased-index selector the design calls for.
use crate::population::Candidate;

/// `floor(U1 * U2 * N)`: a PDF biased toward 0 (the best-ranked end of `ranked`, which must
/// already be sorted ascending by fitness), cheap to compute, strongly favoring fit parents while
/// still giving the tail a nonzero chance. Must run on the controller thread, never inside a
/// worker, because it needs to see the freshly ranked population (§9).
pub fn choose_from_ranked(ranked: &[Candidate]) -> &Candidate {
    debug_assert!(!ranked.is_empty(), "ranked population must be non-empty");
    let u1 = crate::global_rand::gen::<f64>();
    let u2 = crate::global_rand::gen::<f64>();
    let index = ((u1 * u2 * ranked.len() as f64).floor() as usize).min(ranked.len() - 1);
    &ranked[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn always_returns_an_element_of_the_slice() {
        let ranked: Vec<Candidate> = (0..10)
            .map(|i| Candidate::with_fitness(Config::new(), vec![i]))
            .collect();
        for _ in 0..500 {
            let chosen = choose_from_ranked(&ranked);
            assert!(ranked.iter().any(|c| std::ptr::eq(c, chosen)));
        }
    }

    #[test]
    fn single_element_population_always_selects_it() {
        let ranked = vec![Candidate::with_fitness(Config::new(), vec![0])];
        for _ in 0..20 {
            let chosen = choose_from_ranked(&ranked);
            assert_eq!(chosen.fitness, Some(vec![0]));
        }
    }

    #[test]
    fn is_biased_toward_the_front_of_the_ranking() {
        let ranked: Vec<Candidate> = (0..100)
            .map(|i| Candidate::with_fitness(Config::new(), vec![i]))
            .collect();
        let mut total_index = 0u64;
        let samples = 20_000;
        for _ in 0..samples {
            let chosen = choose_from_ranked(&ranked);
            total_index += chosen.fitness.as_ref().unwrap()[0];
        }
        let mean_index = total_index as f64 / samples as f64;
        // Uniform selection would average ~49.5; the quadratic bias should pull this well below
        // half the population.
        assert!(mean_index < 30.0, "mean index {mean_index} not biased toward front");
    }
}
