//! The clang-format backend (§6 "YAML-style"): round-trips configuration through YAML, and seeds
//! the initial population by asking the executable itself for each of its built-in named styles
//! via `-dump-config -style=<name>`.
use super::Backend;
use crate::config::{Config, Value};
use crate::errors::UnformatError;
use crate::mutation::{MutationRule, MutationSchema};
use std::process::Command;

/// clang-format ships these named base styles; `-dump-config -style=<name>` prints the full,
/// concrete option set for each one, which makes a good diverse seed population (§4.1 "typically
/// derived from the formatter's own named base styles").
const SEED_STYLES: &[&str] = &["LLVM", "Google", "Chromium", "Mozilla", "WebKit"];

#[derive(Debug, Default)]
pub struct ClangFormatBackend;

impl ClangFormatBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for ClangFormatBackend {
    fn default_command(&self) -> &str {
        "clang-format"
    }

    fn default_config_filename(&self) -> &str {
        ".clang-format"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Config, UnformatError> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| UnformatError::InitialConfigDecode {
                path: self.default_config_filename().to_string(),
                source: Box::new(e),
            })?;
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| UnformatError::InitialConfigDecode {
                path: self.default_config_filename().to_string(),
                source: Box::new(e),
            })?;
        Ok(yaml_mapping_to_config(&yaml))
    }

    fn encode(&self, config: &Config) -> Vec<u8> {
        let yaml = config_to_yaml_mapping(config);
        // clang-format's own dumps always open with this marker; mirroring it keeps a diff
        // against a real `-dump-config` run readable.
        let mut out = b"---\n".to_vec();
        out.extend(serde_yaml::to_string(&yaml).unwrap_or_default().into_bytes());
        out
    }

    fn default_configs(&self, command: &str) -> Result<Vec<Config>, UnformatError> {
        SEED_STYLES
            .iter()
            .map(|style| {
                let output = Command::new(command)
                    .arg("-dump-config")
                    .arg(format!("-style={style}"))
                    .output()
                    .map_err(|source| UnformatError::FormatterSpawn {
                        command: command.to_string(),
                        source,
                    })?;
                self.decode(&output.stdout)
            })
            .collect()
    }

    fn format_args(&self, _command: &str, _source_filename: &str) -> Vec<String> {
        // `-style=file` makes clang-format search upward from its *working directory* for
        // `.clang-format`, which is the scratch workspace `score_one_file` already `cwd`s into.
        // An `-assume-filename` pointing at the real, absolute source path would instead have it
        // search upward from that file's real tree, walking straight past the candidate
        // configuration under test. Source comes in on stdin (`-`), so there's no filename to
        // assume.
        vec!["-style=file".to_string(), "-".to_string()]
    }

    fn mutation_rules(&self, _command: &str) -> Result<MutationSchema, UnformatError> {
        Ok(build_mutation_schema())
    }

    fn sanitize(&self, config: &mut Config) {
        // DisableFormat=true would make every candidate a no-op formatter, which trivially
        // "wins" on edit distance without saying anything about the corpus's real style. The
        // seed styles never set it, but a stray mutation shouldn't be allowed to either.
        config.insert("DisableFormat", Value::Bool(false));
    }
}

fn yaml_mapping_to_config(yaml: &serde_yaml::Value) -> Config {
    let mut config = Config::new();
    if let serde_yaml::Value::Mapping(mapping) = yaml {
        for (key, value) in mapping {
            let Some(key) = key.as_str() else { continue };
            config.insert(key.to_string(), yaml_scalar_to_value(value));
        }
    }
    config
}

fn yaml_scalar_to_value(value: &serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            Value::Int(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64))
        }
        serde_yaml::Value::String(s) => Value::Str(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            Value::List(seq.iter().map(yaml_mapping_to_config).collect())
        }
        serde_yaml::Value::Mapping(_) => Value::Config(yaml_mapping_to_config(value)),
        serde_yaml::Value::Null => Value::Str(String::new()),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_value(&tagged.value),
    }
}

fn config_to_yaml_mapping(config: &Config) -> serde_yaml::Value {
    let mut mapping = serde_yaml::Mapping::new();
    for key in config.sorted_keys() {
        let value = config.get(key).expect("key came from sorted_keys");
        mapping.insert(
            serde_yaml::Value::String(key.clone()),
            value_to_yaml(value),
        );
    }
    serde_yaml::Value::Mapping(mapping)
}

fn value_to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Int(i) => serde_yaml::Value::Number((*i).into()),
        Value::Str(s) => serde_yaml::Value::String(s.clone()),
        Value::List(items) => {
            serde_yaml::Value::Sequence(items.iter().map(config_to_yaml_mapping).collect())
        }
        Value::Config(nested) => config_to_yaml_mapping(nested),
    }
}

/// A representative slice of clang-format's real option schema (the full set runs into the
/// hundreds and is formatter-version-dependent; these are the stable, version-independent keys
/// present since early clang-format releases). Keys not listed here fall back to
/// [`crate::mutate::mutate_value`]'s boolean-toggle-or-pass-through behaviour.
fn build_mutation_schema() -> MutationSchema {
    let mut schema = MutationSchema::default();

    schema.insert(
        "BasedOnStyle".to_string(),
        MutationRule::Choice(
            SEED_STYLES
                .iter()
                .map(|s| Value::Str(s.to_string()))
                .collect(),
        ),
    );
    schema.insert(
        "ColumnLimit".to_string(),
        MutationRule::DeltaGauss { sigma: 10.0, min: 0 },
    );
    schema.insert(
        "IndentWidth".to_string(),
        MutationRule::Range { lo: 1, hi: 9 },
    );
    schema.insert(
        "TabWidth".to_string(),
        MutationRule::Range { lo: 1, hi: 9 },
    );
    schema.insert(
        "ContinuationIndentWidth".to_string(),
        MutationRule::Range { lo: 0, hi: 9 },
    );
    schema.insert(
        "AccessModifierOffset".to_string(),
        MutationRule::DeltaGauss { sigma: 2.0, min: -8 },
    );
    schema.insert(
        "PenaltyReturnTypeOnItsOwnLine".to_string(),
        MutationRule::DeltaGauss {
            sigma: 20.0,
            min: 0,
        },
    );
    schema.insert(
        "UseTab".to_string(),
        MutationRule::Choice(vec![
            Value::Str("Never".into()),
            Value::Str("ForIndentation".into()),
            Value::Str("ForContinuationAndIndentation".into()),
            Value::Str("Always".into()),
        ]),
    );
    schema.insert(
        "BreakBeforeBraces".to_string(),
        MutationRule::Choice(vec![
            Value::Str("Attach".into()),
            Value::Str("Linux".into()),
            Value::Str("Mozilla".into()),
            Value::Str("Stroustrup".into()),
            Value::Str("Allman".into()),
            Value::Str("GNU".into()),
            Value::Str("WebKit".into()),
            Value::Str("Custom".into()),
        ]),
    );
    schema.insert(
        "AlignAfterOpenBracket".to_string(),
        MutationRule::Choice(vec![
            Value::Str("Align".into()),
            Value::Str("DontAlign".into()),
            Value::Str("AlwaysBreak".into()),
        ]),
    );
    schema.insert(
        "AllowShortIfStatementsOnASingleLine".to_string(),
        MutationRule::Choice(vec![
            Value::Str("Never".into()),
            Value::Str("WithoutElse".into()),
            Value::Str("Always".into()),
        ]),
    );
    schema.insert(
        "SpacesBeforeTrailingComments".to_string(),
        MutationRule::Range { lo: 0, hi: 5 },
    );
    schema.insert("CommentPragmas".to_string(), MutationRule::Identity);
    schema.insert("MacroBlockBegin".to_string(), MutationRule::Identity);
    schema.insert("MacroBlockEnd".to_string(), MutationRule::Identity);
    schema.insert("DisableFormat".to_string(), MutationRule::Identity);

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_encode_roundtrips_scalar_kinds() {
        let backend = ClangFormatBackend::new();
        let yaml = b"ColumnLimit: 100\nUseTab: Never\nDisableFormat: false\n";
        let config = backend.decode(yaml).unwrap();
        assert_eq!(config.get("ColumnLimit"), Some(&Value::Int(100)));
        assert_eq!(config.get("UseTab"), Some(&Value::Str("Never".into())));
        let reencoded = backend.encode(&config);
        let reparsed = backend.decode(&reencoded).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn sanitize_forces_disable_format_off() {
        let backend = ClangFormatBackend::new();
        let mut config = Config::new();
        config.insert("DisableFormat", Value::Bool(true));
        backend.sanitize(&mut config);
        assert_eq!(config.get("DisableFormat"), Some(&Value::Bool(false)));
    }

    #[test]
    fn mutation_schema_covers_based_on_style_with_seed_names() {
        let schema = build_mutation_schema();
        match schema.get("BasedOnStyle").unwrap() {
            MutationRule::Choice(options) => {
                assert_eq!(options.len(), SEED_STYLES.len());
            }
            other => panic!("expected Choice rule, got {other:?}"),
        }
    }
}
