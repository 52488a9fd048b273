//! CLI configuration file
//!
//! An optional YAML file supplying defaults for the command-line flags:
//!
//! ```yaml
//! grammar_paths: [grammars, /opt/edi/grammars]
//! dialect: edifact
//! separators: { element: '|', segment: "\n" }
//! mode: lenient
//! include_invalid_nodes: false
//! ```
//!
//! Relative grammar paths are resolved against the file's directory.

use anyhow::{Context, Result};
use edi_lexer::{Dialect, DialectConfig, Separators};
use edi_parser::ParseOptions;
use edi_validation::ValidationMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub grammar_paths: Vec<PathBuf>,
    pub dialect: Option<Dialect>,
    pub separators: Option<SeparatorConfig>,
    pub mode: Option<ValidationMode>,
    pub include_invalid_nodes: Option<bool>,
    pub skip_missing_mandatory: Option<bool>,
}

/// Separator overrides; unset roles keep the dialect default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeparatorConfig {
    pub segment: Option<char>,
    pub element: Option<char>,
    pub component: Option<char>,
    pub release: Option<char>,
    pub repetition: Option<char>,
    pub decimal: Option<char>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: CliConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.grammar_paths = config
                .grammar_paths
                .into_iter()
                .map(|p| base.join(p))
                .collect();
        }

        Ok(config)
    }

    /// Dialect configuration, with `dialect` (from the command line) taking
    /// precedence over the file
    pub fn dialect_config(&self, dialect: Option<Dialect>) -> Result<DialectConfig> {
        let dialect = dialect.or(self.dialect).unwrap_or_default();
        let config = DialectConfig::new(dialect);

        match &self.separators {
            Some(overrides) => Ok(config.with_separators(overrides.apply(config.separators)?)),
            None => Ok(config),
        }
    }

    /// Parse options, with `--lenient` taking precedence over the file
    pub fn parse_options(&self, lenient: bool) -> ParseOptions {
        let mode = if lenient {
            ValidationMode::Lenient
        } else {
            self.mode.unwrap_or_default()
        };

        let defaults = ParseOptions::default();
        ParseOptions {
            mode,
            include_invalid_nodes: self
                .include_invalid_nodes
                .unwrap_or(defaults.include_invalid_nodes),
            skip_missing_mandatory: self
                .skip_missing_mandatory
                .unwrap_or(defaults.skip_missing_mandatory),
        }
    }
}

impl SeparatorConfig {
    fn apply(&self, base: Separators) -> Result<Separators> {
        Ok(Separators {
            segment: byte_or(self.segment, base.segment, "segment")?,
            element: byte_or(self.element, base.element, "element")?,
            component: byte_or(self.component, base.component, "component")?,
            release: optional_byte(self.release, base.release, "release")?,
            repetition: optional_byte(self.repetition, base.repetition, "repetition")?,
            decimal: byte_or(self.decimal, base.decimal, "decimal")?,
        })
    }
}

fn to_byte(c: char, role: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("{role} separator '{c}' is not an ASCII character"))
}

fn byte_or(value: Option<char>, default: u8, role: &str) -> Result<u8> {
    value.map_or(Ok(default), |c| to_byte(c, role))
}

fn optional_byte(value: Option<char>, default: Option<u8>, role: &str) -> Result<Option<u8>> {
    value.map_or(Ok(default), |c| to_byte(c, role).map(Some))
}
