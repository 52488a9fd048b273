//! Grammar loader for JSON and YAML grammar files

use crate::model::{DEFAULT_MAX_LENGTH, DataType, FieldRule, Grammar, Qualifier, StructuralRule};
use crate::references::ReferenceGraph;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Serializable grammar format for loading from files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrammarFile {
    message_type: String,
    version: String,
    #[serde(default)]
    structure: Vec<RuleFile>,
    #[serde(default)]
    groups: HashMap<String, RuleDef>,
    #[serde(default)]
    records: HashMap<String, Vec<FieldFile>>,
}

/// A child list entry: a reference to a named group or an inline rule
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Ref(RefFile),
    Inline(RuleDef),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RefFile {
    #[serde(rename = "ref")]
    target: String,
    #[serde(default)]
    min: Option<usize>,
    #[serde(default)]
    max: Option<MaxFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDef {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    min: usize,
    #[serde(default)]
    max: Option<MaxFile>,
    #[serde(default)]
    qualifier: Option<QualifierFile>,
    #[serde(default)]
    children: Vec<RuleFile>,
}

/// `max: 5` or `max: unbounded`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MaxFile {
    Count(usize),
    Keyword(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QualifierFile {
    element: usize,
    #[serde(default = "default_component")]
    component: usize,
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldFile {
    #[serde(default)]
    position: Option<usize>,
    id: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    min_length: usize,
    #[serde(default = "default_max_length")]
    max_length: usize,
    #[serde(default)]
    mandatory: bool,
    #[serde(default = "default_max_repeat")]
    max_repeat: usize,
    #[serde(default)]
    components: Vec<FieldFile>,
}

fn default_component() -> usize {
    1
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_max_repeat() -> usize {
    1
}

/// Loads grammars from files found in a list of search paths
#[derive(Debug, Clone, Default)]
pub struct GrammarLoader {
    search_paths: Vec<PathBuf>,
}

impl GrammarLoader {
    /// Create a new grammar loader with the given search paths
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Add a search path for grammar files
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Locate `<type>_<version>.{json,yaml,yml}` (lower-cased) in the first
    /// search path that has one
    #[must_use]
    pub fn find(&self, message_type: &str, version: &str) -> Option<PathBuf> {
        let stem = format!("{}_{}", message_type.to_lowercase(), version.to_lowercase());

        for path in &self.search_paths {
            for extension in ["json", "yaml", "yml"] {
                let candidate = path.join(format!("{stem}.{extension}"));
                if candidate.is_file() {
                    trace!(path = %candidate.display(), "found grammar file");
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Load a grammar by message type and version from the search paths
    ///
    /// # Errors
    ///
    /// Returns [`Error::GrammarNotFound`] when no file exists for the pair,
    /// or any error of [`GrammarLoader::load_from_file`]. A file that
    /// declares a different type or version is rejected as invalid.
    pub fn load(&self, message_type: &str, version: &str) -> Result<Grammar> {
        let path = self
            .find(message_type, version)
            .ok_or_else(|| Error::grammar_not_found(message_type, version))?;

        let grammar = self.load_from_file(&path)?;
        if grammar.message_type != message_type || grammar.version != version {
            return Err(Error::invalid_grammar(format!(
                "{} declares {} {}, expected {message_type} {version}",
                path.display(),
                grammar.message_type,
                grammar.version
            )));
        }

        Ok(grammar)
    }

    /// Load a grammar from a specific file path
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read, and the errors of
    /// [`GrammarLoader::load_from_json`] / [`GrammarLoader::load_from_yaml`].
    pub fn load_from_file(&self, path: &Path) -> Result<Grammar> {
        trace!(path = %path.display(), "loading grammar file");
        let content = std::fs::read_to_string(path)?;

        let grammar = if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.load_from_yaml(&content)?
        } else {
            self.load_from_json(&content)?
        };

        info!(
            message_type = %grammar.message_type,
            version = %grammar.version,
            records = grammar.records.len(),
            "loaded grammar from {}",
            path.display()
        );

        Ok(grammar)
    }

    /// Load a grammar from JSON string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for malformed documents and
    /// [`Error::InvalidGrammarDefinition`] when the grammar fails its checks.
    pub fn load_from_json(&self, json: &str) -> Result<Grammar> {
        let file: GrammarFile = serde_json::from_str(json)
            .map_err(|e| Error::invalid_format(format!("JSON parse error: {e}")))?;

        convert_grammar_file(file)
    }

    /// Load a grammar from YAML string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for malformed documents and
    /// [`Error::InvalidGrammarDefinition`] when the grammar fails its checks.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Grammar> {
        let file: GrammarFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::invalid_format(format!("YAML parse error: {e}")))?;

        convert_grammar_file(file)
    }
}

/// Convert a `GrammarFile` to a checked `Grammar`
fn convert_grammar_file(file: GrammarFile) -> Result<Grammar> {
    check_references(&file)?;

    let structure = file
        .structure
        .iter()
        .map(|rule| convert_rule(rule, &file.groups))
        .collect::<Result<Vec<_>>>()?;

    let mut records = HashMap::with_capacity(file.records.len());
    for (code, fields) in file.records {
        records.insert(code, convert_fields(fields)?);
    }

    let grammar = Grammar {
        message_type: file.message_type,
        version: file.version,
        structure,
        records,
    };
    grammar.check()?;

    debug!(
        key = %grammar.key(),
        depth = grammar.depth(),
        "grammar converted"
    );

    Ok(grammar)
}

/// Reject references to unknown groups and cyclic group references
fn check_references(file: &GrammarFile) -> Result<()> {
    let mut graph = ReferenceGraph::new();

    let mut names: Vec<&String> = file.groups.keys().collect();
    names.sort();

    for name in names {
        let mut targets = Vec::new();
        collect_refs(&file.groups[name].children, &mut targets);

        for target in targets {
            if !file.groups.contains_key(target) {
                return Err(Error::invalid_grammar(format!(
                    "group {name} references unknown group {target}"
                )));
            }
            if graph.would_create_cycle(name, target) {
                return Err(Error::invalid_grammar(format!(
                    "cyclic group reference: {name} -> {target}"
                )));
            }
            graph.add_edge(name.as_str(), target);
        }
    }

    let mut targets = Vec::new();
    collect_refs(&file.structure, &mut targets);
    if let Some(target) = targets.into_iter().find(|t| !file.groups.contains_key(*t)) {
        return Err(Error::invalid_grammar(format!(
            "structure references unknown group {target}"
        )));
    }

    Ok(())
}

/// Group names referenced from a child list, inline rules searched too
fn collect_refs<'a>(rules: &'a [RuleFile], targets: &mut Vec<&'a str>) {
    for rule in rules {
        match rule {
            RuleFile::Ref(r) => targets.push(&r.target),
            RuleFile::Inline(def) => collect_refs(&def.children, targets),
        }
    }
}

fn convert_rule(rule: &RuleFile, groups: &HashMap<String, RuleDef>) -> Result<StructuralRule> {
    match rule {
        RuleFile::Inline(def) => convert_def(def, None, groups),
        RuleFile::Ref(r) => {
            let def = groups.get(&r.target).ok_or_else(|| {
                Error::invalid_grammar(format!("unknown group {}", r.target))
            })?;
            let mut converted = convert_def(def, Some(&r.target), groups)?;
            if let Some(min) = r.min {
                converted.min_occurs = min;
            }
            if let Some(max) = &r.max {
                converted.max_occurs = convert_max(max)?;
            }
            Ok(converted)
        }
    }
}

fn convert_def(
    def: &RuleDef,
    group_name: Option<&str>,
    groups: &HashMap<String, RuleDef>,
) -> Result<StructuralRule> {
    let name = def
        .name
        .as_deref()
        .or(group_name)
        .unwrap_or(&def.code)
        .to_string();

    let max_occurs = match &def.max {
        Some(max) => convert_max(max)?,
        None => Some(1),
    };

    let children = def
        .children
        .iter()
        .map(|child| convert_rule(child, groups))
        .collect::<Result<Vec<_>>>()?;

    Ok(StructuralRule {
        code: def.code.clone(),
        name,
        min_occurs: def.min,
        max_occurs,
        qualifier: def.qualifier.as_ref().map(|q| Qualifier {
            element: q.element,
            component: q.component,
            values: q.values.clone(),
        }),
        children,
    })
}

fn convert_max(max: &MaxFile) -> Result<Option<usize>> {
    match max {
        MaxFile::Count(count) => Ok(Some(*count)),
        MaxFile::Keyword(keyword) => match keyword.to_ascii_lowercase().as_str() {
            "unbounded" | "*" | ">1" => Ok(None),
            other => Err(Error::invalid_format(format!(
                "invalid maximum occurrence '{other}'"
            ))),
        },
    }
}

fn convert_fields(fields: Vec<FieldFile>) -> Result<Vec<FieldRule>> {
    fields
        .into_iter()
        .enumerate()
        .map(|(i, field)| {
            let data_type: DataType = field.data_type.parse()?;
            Ok(FieldRule {
                position: field.position.unwrap_or(i + 1),
                id: field.id,
                data_type,
                min_length: field.min_length,
                max_length: field.max_length,
                mandatory: field.mandatory,
                max_repeat: field.max_repeat,
                components: convert_fields(field.components)?,
            })
        })
        .collect()
}
