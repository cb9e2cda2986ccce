use crate::error::{Result, RunnerError};
use crate::options::flag_table::{self, ValueKind, FLAG_TABLE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const EXTENSION_LIST_PATTERN: &str = r"^\.?[A-Za-z0-9_]+(\s*,\s*\.?[A-Za-z0-9_]+)*$";

/// RePKG verb a run is issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Extract package contents into the output directory
    Extract,
    /// Print package and project information
    Info,
}

impl Mode {
    pub fn verb(&self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Info => "info",
        }
    }

    pub fn writes_output(&self) -> bool {
        matches!(self, Mode::Extract)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
}

impl OptionValue {
    /// Interprets `true`/`false` (any case) as a flag, anything else as text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "true" => OptionValue::Flag(true),
            "false" => OptionValue::Flag(false),
            _ => OptionValue::Text(raw.trim().to_string()),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            OptionValue::Flag(_) => "a boolean",
            OptionValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(value) => write!(f, "{}", value),
            OptionValue::Text(value) => f.write_str(value),
        }
    }
}

/// Parses a `key=value` assignment as given to `--set`.
pub fn parse_assignment(s: &str) -> std::result::Result<(String, OptionValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err("option key cannot be empty".to_string());
    }

    Ok((key.to_lowercase(), OptionValue::parse(value)))
}

/// Option values checked against the allow-list of one mode.
///
/// The only way to obtain an `OptionSet` is [`OptionSet::validate`], so a
/// value of this type never holds an unknown key, a mistyped value or a
/// contradictory pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSet {
    mode: Mode,
    values: BTreeMap<String, OptionValue>,
}

impl OptionSet {
    pub fn validate(mode: Mode, raw: &BTreeMap<String, OptionValue>) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut extension_pattern: Option<Regex> = None;

        for (key, value) in raw {
            let spec = flag_table::lookup(key)
                .filter(|spec| spec.applies_to(mode))
                .ok_or_else(|| RunnerError::InvalidOptionCombination {
                    message: format!(
                        "unrecognized option '{}' for {} mode (allowed: {})",
                        key,
                        mode,
                        flag_table::keys_for(mode).join(", ")
                    ),
                })?;

            // `key=true` parses as a flag; text options take the word literally.
            let value = match (spec.kind, value) {
                (ValueKind::Bool, _) => value.clone(),
                (_, OptionValue::Flag(word)) => OptionValue::Text(word.to_string()),
                (_, OptionValue::Text(_)) => value.clone(),
            };

            let value = match (spec.kind, &value) {
                (ValueKind::Bool, OptionValue::Flag(_)) => value.clone(),
                (ValueKind::Text, OptionValue::Text(text)) => {
                    OptionValue::Text(text.trim().to_string())
                }
                (ValueKind::ExtensionList, OptionValue::Text(text)) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        let pattern = match extension_pattern.take() {
                            Some(pattern) => pattern,
                            None => Regex::new(EXTENSION_LIST_PATTERN).map_err(|e| {
                                RunnerError::Config {
                                    message: format!("Extension pattern failed to compile: {}", e),
                                }
                            })?,
                        };
                        let matched = pattern.is_match(text);
                        extension_pattern = Some(pattern);
                        if !matched {
                            return Err(RunnerError::InvalidOptionCombination {
                                message: format!(
                                    "'{}' for {} must be a comma-separated list of extensions (e.g. png,jpg)",
                                    text, key
                                ),
                            });
                        }
                    }
                    OptionValue::Text(normalize_extension_list(text))
                }
                (ValueKind::Choice(choices), OptionValue::Text(text)) => {
                    let choice = text.trim().to_lowercase();
                    if !choice.is_empty() && !choices.contains(&choice.as_str()) {
                        return Err(RunnerError::InvalidOptionCombination {
                            message: format!(
                                "'{}' is not a valid value for {} (expected one of: {})",
                                text,
                                key,
                                choices.join(", ")
                            ),
                        });
                    }
                    OptionValue::Text(choice)
                }
                (kind, value) => {
                    let expected = match kind {
                        ValueKind::Bool => "a boolean",
                        _ => "text",
                    };
                    return Err(RunnerError::InvalidOptionCombination {
                        message: format!(
                            "option '{}' expects {}, got {} ({})",
                            key,
                            expected,
                            value.kind_name(),
                            value
                        ),
                    });
                }
            };

            values.insert(key.clone(), value);
        }

        let set = Self { mode, values };
        set.check_conflicts()?;
        Ok(set)
    }

    fn check_conflicts(&self) -> Result<()> {
        if self.flag("tex") && self.flag("no_tex_convert") {
            return Err(RunnerError::InvalidOptionCombination {
                message: "'tex' converts TEX files while 'no_tex_convert' disables conversion; choose one".to_string(),
            });
        }

        if self.text("exts_only").is_some() && self.text("exts_ignore").is_some() {
            return Err(RunnerError::InvalidOptionCombination {
                message: "'exts_only' and 'exts_ignore' cannot be used together".to_string(),
            });
        }

        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(OptionValue::Flag(true)))
    }

    /// Text value of `key`, or `None` when unset or empty.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(OptionValue::Text(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_recursive(&self) -> bool {
        self.flag("recursive")
    }

    /// Translates the set into RePKG flags, in translation-table order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for spec in FLAG_TABLE.iter().filter(|spec| spec.applies_to(self.mode)) {
            let Some(flag) = spec.flag else {
                continue;
            };

            match spec.kind {
                ValueKind::Bool => {
                    if self.flag(spec.key) {
                        args.push(flag.to_string());
                    }
                }
                ValueKind::Text | ValueKind::ExtensionList | ValueKind::Choice(_) => {
                    if let Some(value) = self.text(spec.key) {
                        args.push(flag.to_string());
                        args.push(value.to_string());
                    }
                }
            }
        }

        args
    }
}

fn normalize_extension_list(text: &str) -> String {
    text.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
