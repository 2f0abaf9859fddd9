//! The configuration value grammar (§3 of the design): a small closed sum type rather than a
//! dynamically typed bag, so mutation and crossover can match on shape instead of guessing at it.
use rustc_hash::FxHashMap;
use std::fmt;

/// A single formatter-option value. Lists and nested configs recurse back into [`Config`], which
/// is what lets the mutation and crossover engines walk structured sub-records uniformly.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Config>),
    Config(Config),
}

impl Value {
    /// A coarse type tag used to detect the crossover schema-inconsistency error (§7): two
    /// parents may not carry the same key with values of different shape.
    pub fn type_tag(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Str(_) => ValueType::Str,
            Value::List(_) => ValueType::List,
            Value::Config(_) => ValueType::Config,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Config> {
        match self {
            Value::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_config_mut(&mut self) -> Option<&mut Config> {
        match self {
            Value::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Config>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    Bool,
    Int,
    Str,
    List,
    Config,
}

/// An unordered string-keyed mapping, the unit the mutation and crossover engines operate over.
/// Key order is insertion order is *not* guaranteed (§3: "An unordered mapping"); backends that
/// need stable output ordering (e.g. for diffable config files) sort keys at encode time instead
/// of relying on map iteration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    entries: FxHashMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.entries.iter_mut()
    }

    /// Keys in a stable, deterministic order. Used by encoders and by tests that assert on
    /// serialized output.
    pub fn sorted_keys(&self) -> Vec<&String> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<(String, Value)> for Config {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in self.sorted_keys() {
            writeln!(f, "{}: {:?}", key, self.entries[key])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut config = Config::new();
        config.insert("ColumnLimit", Value::Int(100));
        assert_eq!(config.get("ColumnLimit"), Some(&Value::Int(100)));
    }

    #[test]
    fn sorted_keys_are_deterministic() {
        let mut config = Config::new();
        config.insert("Zeta", Value::Bool(true));
        config.insert("Alpha", Value::Bool(false));
        assert_eq!(config.sorted_keys(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn type_tag_distinguishes_shapes() {
        assert_eq!(Value::Bool(true).type_tag(), ValueType::Bool);
        assert_ne!(Value::Int(1).type_tag(), Value::Str("1".into()).type_tag());
    }
}
