//! The uncrustify backend (§6 "key = value"): configuration lines are `key = value`, comments
//! start with `#`, blanks are skipped. The option schema (and therefore the mutation rules) is
//! obtained by introspecting the executable's `--show-config` output, whose trailing `# <type>`
//! annotation on each line is one of `Unsigned Number`, `Number`, `String`, or a braced,
//! comma-separated enumeration.
use super::Backend;
use crate::config::{Config, Value};
use crate::errors::UnformatError;
use crate::mutation::{MutationRule, MutationSchema};
use std::process::Command;

#[derive(Debug, Default)]
pub struct UncrustifyBackend;

impl UncrustifyBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for UncrustifyBackend {
    fn default_command(&self) -> &str {
        "uncrustify"
    }

    fn default_config_filename(&self) -> &str {
        "uncrustify.cfg"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Config, UnformatError> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| UnformatError::InitialConfigDecode {
                path: self.default_config_filename().to_string(),
                source: Box::new(e),
            })?;
        let mut config = Config::new();
        for line in text.lines() {
            let Some((key, value)) = parse_key_value_line(line) else {
                continue;
            };
            config.insert(key.to_string(), Value::Str(value.to_string()));
        }
        Ok(config)
    }

    fn encode(&self, config: &Config) -> Vec<u8> {
        let mut out = String::new();
        for key in config.sorted_keys() {
            let value = config.get(key).expect("key came from sorted_keys");
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&render_scalar(value));
            out.push('\n');
        }
        out.into_bytes()
    }

    fn default_configs(&self, command: &str) -> Result<Vec<Config>, UnformatError> {
        let schema_text = run_show_config(command)?;
        let mut config = Config::new();
        for line in schema_text.lines() {
            let Some((key, option)) = parse_schema_line(line) else {
                continue;
            };
            config.insert(key.to_string(), option.default_value);
        }
        Ok(vec![config])
    }

    fn format_args(&self, _command: &str, _source_filename: &str) -> Vec<String> {
        vec!["-c".to_string(), self.default_config_filename().to_string()]
    }

    fn mutation_rules(&self, command: &str) -> Result<MutationSchema, UnformatError> {
        let schema_text = run_show_config(command)?;
        let mut schema = MutationSchema::default();
        for line in schema_text.lines() {
            let Some((key, option)) = parse_schema_line(line) else {
                continue;
            };
            schema.insert(key.to_string(), option.rule);
        }
        Ok(schema)
    }

    fn sanitize(&self, config: &mut Config) {
        // Known conflict: a nonzero `nl_max` combined with certain newline-collapsing options
        // produces output uncrustify itself then reformats differently on a second pass. Forcing
        // it to 0 (unlimited) keeps the search in the single-pass-stable region of the space.
        config.insert("nl_max", Value::Str("0".to_string()));
    }
}

fn run_show_config(command: &str) -> Result<String, UnformatError> {
    let output = Command::new(command)
        .arg("--show-config")
        .output()
        .map_err(|source| UnformatError::FormatterSpawn {
            command: command.to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_key_value_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        // uncrustify's own grammar has no structured values; encountering one here means a
        // mutation rule produced a shape the backend never hands out.
        other => format!("{other:?}"),
    }
}

struct SchemaOption {
    default_value: Value,
    rule: MutationRule,
}

/// Parse one `--show-config` line of the form `key = value # <type annotation>` into its key and
/// the [`MutationRule`]/default pair the type annotation implies.
fn parse_schema_line(line: &str) -> Option<(&str, SchemaOption)> {
    let (assignment, annotation) = line.split_once('#')?;
    let (key, value) = parse_key_value_line(assignment)?;
    let annotation = annotation.trim();

    let option = if let Some(choices) = parse_braced_choices(annotation) {
        SchemaOption {
            default_value: Value::Str(value.to_string()),
            rule: MutationRule::Choice(choices.into_iter().map(Value::Str).collect()),
        }
    } else if annotation.eq_ignore_ascii_case("Unsigned Number") {
        let default = value.parse::<i64>().unwrap_or(0).max(0);
        SchemaOption {
            default_value: Value::Str(default.to_string()),
            rule: MutationRule::Range { lo: 0, hi: 200 },
        }
    } else if annotation.eq_ignore_ascii_case("Number") {
        let default = value.parse::<i64>().unwrap_or(0);
        SchemaOption {
            default_value: Value::Str(default.to_string()),
            rule: MutationRule::DeltaGauss {
                sigma: 5.0,
                min: -200,
            },
        }
    } else if annotation.eq_ignore_ascii_case("String") {
        SchemaOption {
            default_value: Value::Str(value.to_string()),
            rule: MutationRule::Identity,
        }
    } else {
        return None;
    };

    Some((key, option))
}

/// `{ a, b, c }` → `["a", "b", "c"]`.
fn parse_braced_choices(annotation: &str) -> Option<Vec<String>> {
    let inner = annotation.strip_prefix('{')?.strip_suffix('}')?;
    Some(inner.split(',').map(|s| s.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_skips_comments_and_blank_lines() {
        let backend = UncrustifyBackend::new();
        let text = b"# a comment\n\nindent_columns = 4\nnl_max = 0\n";
        let config = backend.decode(text).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(
            config.get("indent_columns"),
            Some(&Value::Str("4".to_string()))
        );
    }

    #[test]
    fn encode_decode_roundtrips() {
        let backend = UncrustifyBackend::new();
        let mut config = Config::new();
        config.insert("indent_columns", Value::Str("4".to_string()));
        config.insert("nl_max", Value::Str("0".to_string()));
        let bytes = backend.encode(&config);
        let roundtripped = backend.decode(&bytes).unwrap();
        assert_eq!(roundtripped, config);
    }

    #[test]
    fn sanitize_forces_nl_max_to_zero() {
        let backend = UncrustifyBackend::new();
        let mut config = Config::new();
        config.insert("nl_max", Value::Str("12".to_string()));
        backend.sanitize(&mut config);
        assert_eq!(config.get("nl_max"), Some(&Value::Str("0".to_string())));
    }

    #[test]
    fn parse_schema_line_recognizes_unsigned_number() {
        let (key, option) =
            parse_schema_line("indent_columns = 4    # Unsigned Number").unwrap();
        assert_eq!(key, "indent_columns");
        assert!(matches!(option.rule, MutationRule::Range { lo: 0, .. }));
        assert_eq!(option.default_value, Value::Str("4".to_string()));
    }

    #[test]
    fn parse_schema_line_recognizes_braced_enum() {
        let (key, option) =
            parse_schema_line("nl_end_of_file = force    # { Ignore, Add, Remove, Force }")
                .unwrap();
        assert_eq!(key, "nl_end_of_file");
        match option.rule {
            MutationRule::Choice(options) => assert_eq!(options.len(), 4),
            other => panic!("expected Choice, got {other:?}"),
        }
    }

    #[test]
    fn parse_schema_line_recognizes_string_as_identity() {
        let (_, option) =
            parse_schema_line("cmt_insert_file_header =     # String").unwrap();
        assert!(matches!(option.rule, MutationRule::Identity));
    }
}
