//! The crossover engine (§4.3): `crossover(a, b) -> child`, generalizing the teacher crate's
//! `crossover::Uniform` (per-gene independent parent choice) and `crossover::Single` (whole-chromosome
//! swap) into "per-key independent parent choice, recursing into structured values."
use crate::config::{Config, Value};
use crate::errors::UnformatError;
use crate::global_rand;
use std::collections::HashSet;

/// Produce a child whose key set is the union of both parents'. Keys present in only one parent
/// are inherited from that parent; keys present in both are recursively crossed if both sides are
/// nested configs, or picked uniformly at random otherwise. A key present in both parents with
/// mismatched value shapes is a schema-inconsistency error (§7): that is a bug in the backend's
/// mutation/default-config setup, not a recoverable runtime condition.
pub fn crossover(parent_a: &Config, parent_b: &Config) -> Result<Config, UnformatError> {
    let keys: HashSet<&String> = parent_a.keys().chain(parent_b.keys()).collect();
    let mut child = Config::new();

    for key in keys {
        let value = match (parent_a.get(key), parent_b.get(key)) {
            (Some(a), None) => a.clone(),
            (None, Some(b)) => b.clone(),
            (Some(a), Some(b)) => crossover_value(key, a, b)?,
            (None, None) => unreachable!("key came from the union of both parents' keys"),
        };
        child.insert(key.clone(), value);
    }

    Ok(child)
}

fn crossover_value(key: &str, a: &Value, b: &Value) -> Result<Value, UnformatError> {
    if a.type_tag() != b.type_tag() {
        return Err(UnformatError::SchemaInconsistency {
            key: key.to_string(),
            type_a: format!("{:?}", a.type_tag()),
            type_b: format!("{:?}", b.type_tag()),
        });
    }

    match (a, b) {
        (Value::Config(nested_a), Value::Config(nested_b)) => {
            Ok(Value::Config(crossover(nested_a, nested_b)?))
        }
        (Value::List(items_a), Value::List(items_b)) => {
            // Structured lists don't have a natural per-element key to align on; a uniform
            // choice between the two parent lists keeps crossover total and deterministic in
            // the "no recursion target" case described in §4.3 ("otherwise, pick one of the two
            // values uniformly at random").
            if global_rand::coin_flip() {
                Ok(Value::List(items_a.clone()))
            } else {
                Ok(Value::List(items_b.clone()))
            }
        }
        _ => {
            if global_rand::coin_flip() {
                Ok(a.clone())
            } else {
                Ok(b.clone())
            }
        }
    }
}
