//! Per-thread randomness. Every worker thread (and the controller thread) owns its own
//! [`SmallRng`](rand::rngs::SmallRng), so sampling never contends across threads and a run can be
//! reseeded deterministically for tests.
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::distributions::{Bernoulli, Distribution, Standard, Uniform};
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::cell::RefCell;

thread_local!(static SMALL_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy()));

pub fn sample_bernoulli(dist: &Bernoulli) -> bool {
    SMALL_RNG.with(|rng| dist.sample(&mut *rng.borrow_mut()))
}

pub fn sample_uniform<T: SampleUniform>(dist: &Uniform<T>) -> T {
    SMALL_RNG.with(|rng| dist.sample(&mut *rng.borrow_mut()))
}

pub fn gen<T>() -> T
where
    Standard: Distribution<T>,
{
    SMALL_RNG.with(|rng| rng.borrow_mut().gen::<T>())
}

pub fn gen_range<T, R>(range: R) -> T
where
    T: SampleUniform,
    R: SampleRange<T>,
{
    SMALL_RNG.with(|rng| rng.borrow_mut().gen_range(range))
}

pub fn choose<T: Clone>(slice: &[T]) -> T {
    SMALL_RNG.with(|rng| {
        let index = rng.borrow_mut().gen_range(0..slice.len());
        slice[index].clone()
    })
}

pub fn coin_flip() -> bool {
    gen::<bool>()
}

/// Box-Muller transform. `rand` only ships uniform/bernoulli distributions; pulling in
/// `rand_distr` for a single Gaussian sampler is not worth a dependency for this crate's one caller.
pub fn sample_standard_normal() -> f64 {
    SMALL_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    })
}

pub fn set_small_rng(new_rng: SmallRng) {
    SMALL_RNG.with(|rng| *rng.borrow_mut() = new_rng);
}
