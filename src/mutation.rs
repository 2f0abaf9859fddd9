//! The per-key mutation schema (§3, §4.2): a backend hands the mutation engine a
//! [`MutationSchema`] mapping each key it knows about to a [`MutationRule`]. Keys the schema
//! doesn't mention fall back to the boolean-toggle-or-pass-through behaviour in [`crate::mutate`].
use crate::config::Value;
use crate::global_rand;
use rustc_hash::FxHashMap;

/// A per-key mutation recipe. Mirrors the teacher crate's `enum Mutate { Once { .. }, Twice { ..
/// } }` dispatch-by-variant shape, generalized from "one of a handful of population-level
/// strategies" to "one of a handful of per-value perturbations."
#[derive(Clone, Debug)]
pub enum MutationRule {
    /// Pick any member of the set other than the current value.
    Choice(Vec<Value>),
    /// Add a Gaussian(0, sigma) perturbation to an integer, clamp to `[min, +inf)`, round, and
    /// retry (bounded) until the result differs from the input.
    DeltaGauss { sigma: f64, min: i64 },
    /// Draw an integer uniformly from `[lo, hi)`.
    Range { lo: i64, hi: i64 },
    /// Leave the value untouched regardless of mutation rate (opaque values, e.g. regexes).
    Identity,
    /// Apply the mutation engine to a nested config at the given rate-of-its-own keys.
    Recursive,
}

/// A maximum number of resampling attempts for rules that must produce a value different from
/// the input (`Choice`, `DeltaGauss`). Prevents an infinite loop on a degenerate schema (e.g. a
/// `Choice` set of size one).
const MAX_RESAMPLE_ATTEMPTS: usize = 32;

impl MutationRule {
    /// Apply this rule to `value`, recursing through [`crate::mutate::mutate_config`] for
    /// `Recursive`/structured values. `rate` and `schema` are only used by the `Recursive` case,
    /// which re-enters the engine for a nested config.
    pub fn apply(
        &self,
        value: &Value,
        rate: f32,
        schema: &MutationSchema,
        locked_keys: &[String],
    ) -> Value {
        match self {
            MutationRule::Identity => value.clone(),
            MutationRule::Choice(options) => {
                if options.len() <= 1 {
                    return value.clone();
                }
                for _ in 0..MAX_RESAMPLE_ATTEMPTS {
                    let candidate = global_rand::choose(options);
                    if &candidate != value {
                        return candidate;
                    }
                }
                value.clone()
            }
            MutationRule::DeltaGauss { sigma, min } => {
                let Some(current) = value.as_int() else {
                    return value.clone();
                };
                for _ in 0..MAX_RESAMPLE_ATTEMPTS {
                    let delta = global_rand::sample_standard_normal() * sigma;
                    let mutated = ((current as f64) + delta).round() as i64;
                    let clamped = mutated.max(*min);
                    if clamped != current {
                        return Value::Int(clamped);
                    }
                }
                value.clone()
            }
            MutationRule::Range { lo, hi } => {
                if hi <= lo {
                    return value.clone();
                }
                Value::Int(global_rand::gen_range(*lo..*hi))
            }
            MutationRule::Recursive => match value {
                Value::Config(nested) => Value::Config(crate::mutate::mutate_config(
                    nested,
                    rate,
                    schema,
                    locked_keys,
                )),
                Value::List(items) => Value::List(
                    items
                        .iter()
                        .map(|item| crate::mutate::mutate_config(item, rate, schema, locked_keys))
                        .collect(),
                ),
                other => other.clone(),
            },
        }
    }
}

/// Mapping from configuration key to its mutation rule, supplied by a [`crate::backend::Backend`].
pub type MutationSchema = FxHashMap<String, MutationRule>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Value;

    #[test]
    fn identity_never_changes_value() {
        let rule = MutationRule::Identity;
        let schema = MutationSchema::default();
        let value = Value::Str("(?i)ignore".to_string());
        for _ in 0..50 {
            assert_eq!(rule.apply(&value, 1.0, &schema, &[]), value);
        }
    }

    #[test]
    fn choice_always_returns_member_of_set() {
        let options = vec![
            Value::Str("LLVM".into()),
            Value::Str("Google".into()),
            Value::Str("Chromium".into()),
        ];
        let rule = MutationRule::Choice(options.clone());
        let schema = MutationSchema::default();
        let current = Value::Str("LLVM".into());
        for _ in 0..50 {
            let mutated = rule.apply(&current, 1.0, &schema, &[]);
            assert!(options.contains(&mutated));
        }
    }

    #[test]
    fn choice_of_one_is_a_no_op() {
        let options = vec![Value::Bool(true)];
        let rule = MutationRule::Choice(options);
        let schema = MutationSchema::default();
        let current = Value::Bool(true);
        assert_eq!(rule.apply(&current, 1.0, &schema, &[]), Value::Bool(true));
    }

    #[test]
    fn range_stays_within_bounds() {
        let rule = MutationRule::Range { lo: 0, hi: 5 };
        let schema = MutationSchema::default();
        for _ in 0..200 {
            let mutated = rule.apply(&Value::Int(2), 1.0, &schema, &[]);
            let n = mutated.as_int().unwrap();
            assert!((0..5).contains(&n));
        }
    }

    #[test]
    fn delta_gauss_respects_minimum() {
        let rule = MutationRule::DeltaGauss { sigma: 2.0, min: 0 };
        let schema = MutationSchema::default();
        for _ in 0..200 {
            let mutated = rule.apply(&Value::Int(0), 1.0, &schema, &[]);
            assert!(mutated.as_int().unwrap() >= 0);
        }
    }
}
