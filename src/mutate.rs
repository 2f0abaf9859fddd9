//! The mutation engine (§4.2): `mutate(config, rate, schema, locked_keys) -> config'`.
//!
//! Generalizes the teacher crate's `Mutate::call` (which walks `population.chromosomes` and
//! flips a coin per chromosome) down one level: here every *key* in the config gets its own coin
//! flip, consulting the backend-supplied [`MutationSchema`] for the rule to apply.
use crate::config::{Config, Value};
use crate::mutation::{MutationRule, MutationSchema};
use rand::distributions::{Bernoulli, Distribution};

/// Mutate every eligible key of `config` independently with probability `rate`.
///
/// A key is skipped (emitted unchanged) if it is locked. Otherwise, with probability `rate`, its
/// value is replaced by `schema[key].apply(..)`; if the key has no schema entry, booleans are
/// toggled as a fallback and anything else is logged and passed through unchanged (§3).
pub fn mutate_config(
    config: &Config,
    rate: f32,
    schema: &MutationSchema,
    locked_keys: &[String],
) -> Config {
    let sampler = Bernoulli::new(rate as f64).unwrap_or_else(|_| Bernoulli::new(1.0).unwrap());

    config
        .iter()
        .map(|(key, value)| {
            if locked_keys.iter().any(|locked| locked == key) {
                return (key.clone(), value.clone());
            }
            if !crate::global_rand::sample_bernoulli(&sampler) {
                return (key.clone(), value.clone());
            }
            let mutated = mutate_value(key, value, rate, schema, locked_keys);
            (key.clone(), mutated)
        })
        .collect()
}

fn mutate_value(
    key: &str,
    value: &Value,
    rate: f32,
    schema: &MutationSchema,
    locked_keys: &[String],
) -> Value {
    if let Some(rule) = schema.get(key) {
        return rule.apply(value, rate, schema, locked_keys);
    }

    match value {
        Value::Bool(b) => Value::Bool(!b),
        Value::Config(nested) => Value::Config(mutate_config(nested, rate, schema, locked_keys)),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| mutate_config(item, rate, schema, locked_keys))
                .collect(),
        ),
        other => {
            log::warn!("unrecognized setting, '{key}: {other:?}', left unmutated");
            other.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationSchema;

    fn config_with(entries: &[(&str, Value)]) -> Config {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn locked_key_is_stable_under_any_rate() {
        let config = config_with(&[("ColumnLimit", Value::Int(120))]);
        let schema = MutationSchema::default();
        let locked = vec!["ColumnLimit".to_string()];
        for _ in 0..100 {
            let mutated = mutate_config(&config, 1.0, &schema, &locked);
            assert_eq!(mutated.get("ColumnLimit"), Some(&Value::Int(120)));
        }
    }

    #[test]
    fn identity_schema_entry_is_stable_at_rate_one() {
        let config = config_with(&[("CommentPragmas", Value::Str("^ IWYU pragma:".into()))]);
        let mut schema = MutationSchema::default();
        schema.insert("CommentPragmas".to_string(), MutationRule::Identity);
        for _ in 0..100 {
            let mutated = mutate_config(&config, 1.0, &schema, &[]);
            assert_eq!(
                mutated.get("CommentPragmas"),
                Some(&Value::Str("^ IWYU pragma:".into()))
            );
        }
    }

    #[test]
    fn unknown_boolean_falls_back_to_toggle() {
        let config = config_with(&[("UseTab", Value::Bool(false))]);
        let schema = MutationSchema::default();
        let mutated = mutate_config(&config, 1.0, &schema, &[]);
        assert_eq!(mutated.get("UseTab"), Some(&Value::Bool(true)));
    }

    #[test]
    fn rate_zero_never_mutates() {
        let config = config_with(&[("UseTab", Value::Bool(false)), ("Foo", Value::Int(1))]);
        let schema = MutationSchema::default();
        let mutated = mutate_config(&config, 0.0, &schema, &[]);
        assert_eq!(mutated, config);
    }

    #[test]
    fn recursive_rule_descends_into_nested_config() {
        let mut inner = Config::new();
        inner.insert("Inner", Value::Int(1));
        let config = config_with(&[("Outer", Value::Config(inner))]);
        let mut schema = MutationSchema::default();
        schema.insert(
            "Inner".to_string(),
            MutationRule::Range { lo: 100, hi: 101 },
        );
        schema.insert("Outer".to_string(), MutationRule::Recursive);
        let mutated = mutate_config(&config, 1.0, &schema, &[]);
        let nested = mutated.get("Outer").unwrap().as_config().unwrap();
        assert_eq!(nested.get("Inner"), Some(&Value::Int(100)));
    }
}
