//! Agent arguments
//!
//! Agents are configured with whitespace-separated `key=value` tokens such
//! as `"name=td seed=7 alpha=0.003125 save=weights.bin"`. Tokens are parsed
//! and validated once into an [`AgentConfig`]; later tokens override
//! earlier ones with the same key.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::learning::MAX_TABLE_ENTRIES;

/// Default TD learning rate
pub const DEFAULT_ALPHA: f32 = 0.1 / 32.0;

/// Deepest greedy lookahead
pub const MAX_GREEDY_DEPTH: usize = 3;

/// Argument parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Token without `=`
    #[error("Malformed argument '{0}' (expected key=value)")]
    MalformedToken(String),

    /// Key no agent understands
    #[error("Unknown argument key '{0}'")]
    UnknownKey(String),

    /// Value that does not parse or is out of range
    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Slider decision rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyKind {
    Random,
    Greedy,
    #[default]
    TemporalDifference,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(StrategyKind::Random),
            "greedy" => Ok(StrategyKind::Greedy),
            "td" => Ok(StrategyKind::TemporalDifference),
            _ => Err("expected random, greedy or td".to_string()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Random => "random",
            StrategyKind::Greedy => "greedy",
            StrategyKind::TemporalDifference => "td",
        };
        f.write_str(name)
    }
}

/// Where the n-tuple patterns come from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PatternSource {
    /// Four rows and four columns
    #[default]
    Rows,
    /// Four 6-tuples
    Six,
    /// CSV pattern file
    File(PathBuf),
}

impl FromStr for PatternSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty pattern source".to_string()),
            "rows" => Ok(PatternSource::Rows),
            "six" => Ok(PatternSource::Six),
            path => Ok(PatternSource::File(PathBuf::from(path))),
        }
    }
}

/// Validated agent arguments
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub role: String,
    /// RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Fresh zeroed tables of these sizes
    pub init: Option<Vec<usize>>,
    /// Snapshot to load at construction (replaces `init`)
    pub load: Option<PathBuf>,
    /// Snapshot to write at shutdown
    pub save: Option<PathBuf>,
    pub alpha: f32,
    pub strategy: StrategyKind,
    /// Greedy lookahead in plies (1-3)
    pub depth: usize,
    /// Add the expectimax bonus to TD move scores
    pub expectimax: bool,
    pub patterns: PatternSource,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            role: "unknown".to_string(),
            seed: None,
            init: None,
            load: None,
            save: None,
            alpha: DEFAULT_ALPHA,
            strategy: StrategyKind::default(),
            depth: 1,
            expectimax: false,
            patterns: PatternSource::default(),
        }
    }
}

impl AgentConfig {
    /// Parse `key=value` tokens on top of the defaults.
    ///
    /// # Errors
    ///
    /// `ConfigError` for tokens without `=`, unknown keys, and values
    /// that fail to parse or fall out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::config::{AgentConfig, StrategyKind};
    ///
    /// let config = AgentConfig::parse("name=td seed=7 alpha=0.01 expectimax=true").unwrap();
    /// assert_eq!(config.name, "td");
    /// assert_eq!(config.seed, Some(7));
    /// assert_eq!(config.strategy, StrategyKind::TemporalDifference);
    /// assert!(config.expectimax);
    ///
    /// assert!(AgentConfig::parse("lambda=0.5").is_err());
    /// ```
    pub fn parse(args: &str) -> Result<Self, ConfigError> {
        Self::default().with_args(args)
    }

    /// Slider arguments: `name=slide role=slider` unless overridden.
    pub fn slider(args: &str) -> Result<Self, ConfigError> {
        Self::parse("name=slide role=slider")?.with_args(args)
    }

    /// Placer arguments: `name=place role=placer` unless overridden.
    pub fn placer(args: &str) -> Result<Self, ConfigError> {
        Self::parse("name=place role=placer")?.with_args(args)
    }

    /// Apply `key=value` tokens on top of this configuration.
    pub fn with_args(mut self, args: &str) -> Result<Self, ConfigError> {
        for token in args.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedToken(token.to_string()))?;
            self.set(key, value)?;
        }
        Ok(self)
    }

    /// Set a single key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "name" => self.name = value.to_string(),
            "role" => self.role = value.to_string(),
            "seed" => self.seed = Some(parse_value(key, value)?),
            "init" => self.init = Some(parse_sizes(value)?),
            "load" => self.load = Some(parse_path(key, value)?),
            "save" => self.save = Some(parse_path(key, value)?),
            "alpha" => {
                let alpha: f32 = parse_value(key, value)?;
                if !alpha.is_finite() || alpha < 0.0 {
                    return Err(invalid(key, value, "must be a finite non-negative number"));
                }
                self.alpha = alpha;
            }
            "strategy" => self.strategy = parse_value(key, value)?,
            "depth" => {
                let depth: usize = parse_value(key, value)?;
                if !(1..=MAX_GREEDY_DEPTH).contains(&depth) {
                    return Err(invalid(
                        key,
                        value,
                        &format!("must be between 1 and {}", MAX_GREEDY_DEPTH),
                    ));
                }
                self.depth = depth;
            }
            "expectimax" => self.expectimax = parse_bool(key, value)?,
            "patterns" => self.patterns = parse_value(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn parse_path(key: &str, value: &str) -> Result<PathBuf, ConfigError> {
    if value.is_empty() {
        return Err(invalid(key, value, "path is empty"));
    }
    Ok(PathBuf::from(value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

/// Table sizes separated by any non-digit characters, e.g. `65536,65536`
/// or `(65536x8)`.
fn parse_sizes(value: &str) -> Result<Vec<usize>, ConfigError> {
    let sizes = value
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|e| invalid("init", value, &e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if sizes.is_empty() {
        return Err(invalid("init", value, "no table sizes given"));
    }
    if sizes.contains(&0) {
        return Err(invalid("init", value, "table size must be positive"));
    }
    if sizes.iter().any(|&size| size as u64 > MAX_TABLE_ENTRIES) {
        return Err(invalid(
            "init",
            value,
            &format!("table size exceeds {} entries", MAX_TABLE_ENTRIES),
        ));
    }
    Ok(sizes)
}
