//! Grammar model definitions
//!
//! A [`Grammar`] is plain data: an ordered forest of [`StructuralRule`]s
//! describing which segments may appear where, and a map from segment code
//! to the [`FieldRule`]s of that segment's record.
#![allow(clippy::must_use_candidate)] // Builder API reads fine without pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)]

use crate::{Error, Result};
use edi_ir::RawSegment;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Default maximum field length when a grammar does not declare one
pub const DEFAULT_MAX_LENGTH: usize = 35;

/// One message type's structural rules and record definitions
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    pub message_type: String,
    pub version: String,
    /// Top-level rules, in declared order
    pub structure: Vec<StructuralRule>,
    /// Segment code → record definition
    pub records: HashMap<String, Vec<FieldRule>>,
}

/// One entry of the nested segment-occurrence tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralRule {
    /// Segment code the rule matches
    pub code: String,
    /// Loop or segment name used for tree nodes and paths
    pub name: String,
    pub min_occurs: usize,
    /// `None` means unbounded
    pub max_occurs: Option<usize>,
    /// Further restriction on which segments the rule matches
    pub qualifier: Option<Qualifier>,
    /// Members of the loop opened by this rule, in declared order
    pub children: Vec<StructuralRule>,
}

/// Qualifying element check (e.g. `NM101` must be `41`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    /// 1-based element position
    pub element: usize,
    /// 1-based component position
    pub component: usize,
    /// Accepted values
    pub values: Vec<String>,
}

/// One declared field slot (or component slot) of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// 1-based position within the segment (or composite)
    pub position: usize,
    /// Element code (e.g. `1082`, `NM101`)
    pub id: String,
    pub data_type: DataType,
    pub min_length: usize,
    pub max_length: usize,
    pub mandatory: bool,
    /// Number of repetitions allowed
    pub max_repeat: usize,
    /// Component rules for composite elements
    pub components: Vec<FieldRule>,
}

/// Declared data types of simple elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Letters and spaces
    Alphabetic,
    /// Any printable characters
    Alphanumeric,
    /// Code value, printable characters
    Identifier,
    /// Optionally signed digits with an implied number of decimals
    Numeric { implied_decimals: u8 },
    /// Optionally signed number with an explicit decimal mark
    Decimal,
    /// `YYMMDD` or `CCYYMMDD`
    Date,
    /// `HHMM`, `HHMMSS` or `HHMMSS` followed by decimal seconds
    Time,
}

impl Grammar {
    /// Create an empty grammar
    pub fn new(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            version: version.into(),
            structure: Vec::new(),
            records: HashMap::new(),
        }
    }

    /// Append a top-level rule
    pub fn with_rule(mut self, rule: StructuralRule) -> Self {
        self.structure.push(rule);
        self
    }

    /// Add the record definition of a segment
    pub fn with_record(mut self, code: impl Into<String>, fields: Vec<FieldRule>) -> Self {
        self.records.insert(code.into(), fields);
        self
    }

    /// Record definition of a segment code
    pub fn rule_for(&self, code: &str) -> Option<&[FieldRule]> {
        self.records.get(code).map(Vec::as_slice)
    }

    /// Cache key of this grammar
    pub fn key(&self) -> String {
        registry_key(&self.message_type, &self.version)
    }

    /// Deepest nesting level of the structure (top-level rules are depth 1)
    pub fn depth(&self) -> usize {
        fn depth_of(rules: &[StructuralRule]) -> usize {
            rules
                .iter()
                .map(|r| 1 + depth_of(&r.children))
                .max()
                .unwrap_or(0)
        }
        depth_of(&self.structure)
    }

    /// Check the invariants every loaded grammar must satisfy
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrammarDefinition`] for occurrence bounds with
    /// `min > max` or `max == 0`, ambiguous sibling rules, and malformed
    /// field rules.
    pub fn check(&self) -> Result<()> {
        check_rules(&self.structure, &self.message_type)?;

        for (code, fields) in &self.records {
            check_fields(fields, code)?;
        }

        Ok(())
    }
}

fn check_rules(rules: &[StructuralRule], parent: &str) -> Result<()> {
    for rule in rules {
        if let Some(max) = rule.max_occurs {
            if max == 0 {
                return Err(Error::invalid_grammar(format!(
                    "rule {} in {parent}: maximum occurrence is 0",
                    rule.name
                )));
            }
            if rule.min_occurs > max {
                return Err(Error::invalid_grammar(format!(
                    "rule {} in {parent}: minimum {} exceeds maximum {max}",
                    rule.name, rule.min_occurs
                )));
            }
        }
        if let Some(qualifier) = &rule.qualifier {
            if qualifier.element == 0 || qualifier.component == 0 || qualifier.values.is_empty() {
                return Err(Error::invalid_grammar(format!(
                    "rule {} in {parent}: qualifier needs 1-based positions and at least one value",
                    rule.name
                )));
            }
        }
        check_rules(&rule.children, &rule.name)?;
    }

    check_siblings(rules, parent)
}

/// Two siblings are ambiguous when a segment could be taken by either of
/// them: the earlier one still accepts more occurrences and every rule in
/// between may be skipped.
fn check_siblings(rules: &[StructuralRule], parent: &str) -> Result<()> {
    for (i, earlier) in rules.iter().enumerate() {
        if earlier.max_occurs == Some(earlier.min_occurs) {
            continue;
        }
        for (j, later) in rules.iter().enumerate().skip(i + 1) {
            if earlier.overlaps(later) {
                return Err(Error::invalid_grammar(format!(
                    "rules {} and {} in {parent} both accept segment {} (positions {} and {})",
                    earlier.name,
                    later.name,
                    later.code,
                    i + 1,
                    j + 1
                )));
            }
            if later.is_mandatory() {
                break;
            }
        }
    }
    Ok(())
}

fn check_fields(fields: &[FieldRule], owner: &str) -> Result<()> {
    let mut positions = HashSet::new();
    for field in fields {
        if field.position == 0 {
            return Err(Error::invalid_grammar(format!(
                "{owner}: field {} has position 0",
                field.id
            )));
        }
        if !positions.insert(field.position) {
            return Err(Error::invalid_grammar(format!(
                "{owner}: duplicate field position {}",
                field.position
            )));
        }
        if field.min_length > field.max_length {
            return Err(Error::invalid_grammar(format!(
                "{owner}: field {} minimum length {} exceeds maximum length {}",
                field.id, field.min_length, field.max_length
            )));
        }
        if field.max_repeat == 0 {
            return Err(Error::invalid_grammar(format!(
                "{owner}: field {} allows 0 repetitions",
                field.id
            )));
        }
        check_fields(&field.components, &format!("{owner}/{}", field.id))?;
    }
    Ok(())
}

impl StructuralRule {
    /// Optional, non-repeating rule for a segment code
    pub fn segment(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            name: code.clone(),
            code,
            min_occurs: 0,
            max_occurs: Some(1),
            qualifier: None,
            children: Vec::new(),
        }
    }

    /// Set the name used for nodes and paths
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the occurrence bounds (`None` for unbounded)
    pub fn occurs(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    /// Require at least one occurrence
    pub fn mandatory(mut self) -> Self {
        self.min_occurs = self.min_occurs.max(1);
        self
    }

    /// Restrict matching to segments whose qualifying element holds one of
    /// `values`
    pub fn qualified<I, S>(mut self, element: usize, component: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.qualifier = Some(Qualifier {
            element,
            component,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the loop members
    pub fn with_children(mut self, children: Vec<StructuralRule>) -> Self {
        self.children = children;
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.min_occurs > 0
    }

    /// Whether the rule opens a loop
    pub fn is_loop(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether another occurrence is allowed after `count` occurrences
    pub fn allows_another(&self, count: usize) -> bool {
        self.max_occurs.is_none_or(|max| count < max)
    }

    /// Whether the rule accepts this segment
    pub fn matches(&self, segment: &RawSegment) -> bool {
        self.code == segment.code
            && self
                .qualifier
                .as_ref()
                .is_none_or(|q| q.matches(segment))
    }

    /// Whether some segment could match both rules
    pub fn overlaps(&self, other: &StructuralRule) -> bool {
        if self.code != other.code {
            return false;
        }
        match (&self.qualifier, &other.qualifier) {
            (Some(a), Some(b)) if a.element == b.element && a.component == b.component => {
                a.values.iter().any(|v| b.values.contains(v))
            }
            _ => true,
        }
    }
}

impl fmt::Display for StructuralRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..", self.name, self.min_occurs)?;
        match self.max_occurs {
            Some(max) => write!(f, "{max}]"),
            None => f.write_str("*]"),
        }
    }
}

impl Qualifier {
    /// Whether the segment's qualifying value is one of the accepted values
    pub fn matches(&self, segment: &RawSegment) -> bool {
        segment
            .value(self.element, self.component)
            .is_some_and(|v| self.values.iter().any(|accepted| accepted == v))
    }
}

impl FieldRule {
    /// Optional, non-repeating field with the default length bounds
    pub fn new(position: usize, id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            position,
            id: id.into(),
            data_type,
            min_length: 0,
            max_length: DEFAULT_MAX_LENGTH,
            mandatory: false,
            max_repeat: 1,
            components: Vec::new(),
        }
    }

    /// Mark the field as mandatory
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Set the length bounds
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Allow up to `count` repetitions
    pub fn repeat(mut self, count: usize) -> Self {
        self.max_repeat = count;
        self
    }

    /// Make the field a composite with the given component rules
    pub fn with_components(mut self, components: Vec<FieldRule>) -> Self {
        self.components = components;
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.components.is_empty()
    }
}

impl DataType {
    /// Whether length is counted in digits only
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Numeric { .. } | DataType::Decimal)
    }

    /// Short code as used in implementation guides
    pub fn code(self) -> String {
        match self {
            DataType::Alphabetic => "A".to_string(),
            DataType::Alphanumeric => "AN".to_string(),
            DataType::Identifier => "ID".to_string(),
            DataType::Numeric { implied_decimals } => format!("N{implied_decimals}"),
            DataType::Decimal => "R".to_string(),
            DataType::Date => "DT".to_string(),
            DataType::Time => "TM".to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let data_type = match s {
            "A" | "a" | "alphabetic" => DataType::Alphabetic,
            "AN" | "an" | "alphanumeric" => DataType::Alphanumeric,
            "ID" | "id" | "identifier" => DataType::Identifier,
            "N" | "numeric" => DataType::Numeric { implied_decimals: 0 },
            "R" | "n" | "decimal" => DataType::Decimal,
            "DT" | "date" => DataType::Date,
            "TM" | "time" => DataType::Time,
            other => match other.strip_prefix('N').and_then(|d| d.parse::<u8>().ok()) {
                Some(implied_decimals) if implied_decimals <= 9 => DataType::Numeric { implied_decimals },
                _ => {
                    return Err(Error::invalid_format(format!("unknown data type '{s}'")));
                }
            },
        };
        Ok(data_type)
    }
}

/// Cache key for a message type and version
pub fn registry_key(message_type: &str, version: &str) -> String {
    format!("{message_type}:{version}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_ir::{Position, RawField};

    fn nm1(qualifier: &str) -> RawSegment {
        RawSegment::new("NM1", 1, Position::default())
            .with_field(RawField::simple(qualifier))
            .with_field(RawField::simple("2"))
    }

    fn orders() -> Grammar {
        Grammar::new("ORDERS", "D96A")
            .with_rule(StructuralRule::segment("UNH").mandatory())
            .with_rule(StructuralRule::segment("BGM").mandatory())
            .with_rule(StructuralRule::segment("DTM").occurs(0, Some(35)))
            .with_rule(
                StructuralRule::segment("LIN")
                    .named("SG25")
                    .occurs(0, None)
                    .with_children(vec![StructuralRule::segment("QTY").occurs(0, Some(10))]),
            )
            .with_rule(StructuralRule::segment("UNT").mandatory())
            .with_record(
                "BGM",
                vec![
                    FieldRule::new(1, "1001", DataType::Identifier).length(1, 3),
                    FieldRule::new(2, "1004", DataType::Alphanumeric).mandatory(),
                ],
            )
    }

    #[test]
    fn test_grammar_lookup() {
        let grammar = orders();
        assert_eq!(grammar.rule_for("BGM").map(<[FieldRule]>::len), Some(2));
        assert!(grammar.rule_for("XYZ").is_none());
        assert_eq!(grammar.key(), "ORDERS:D96A");
        assert_eq!(grammar.depth(), 2);
        assert!(grammar.check().is_ok());
    }

    #[test]
    fn test_occurrence_helpers() {
        let rule = StructuralRule::segment("DTM").occurs(0, Some(2));
        assert!(rule.allows_another(1));
        assert!(!rule.allows_another(2));
        assert!(StructuralRule::segment("LIN").occurs(0, None).allows_another(10_000));
        assert_eq!(rule.to_string(), "DTM [0..2]");
    }

    #[test]
    fn test_qualified_match() {
        let rule = StructuralRule::segment("NM1").qualified(1, 1, ["41"]);
        assert!(rule.matches(&nm1("41")));
        assert!(!rule.matches(&nm1("40")));
        assert!(StructuralRule::segment("NM1").matches(&nm1("40")));
    }

    #[test]
    fn test_min_exceeds_max_rejected() {
        let grammar = Grammar::new("T", "1")
            .with_rule(StructuralRule::segment("HDR").occurs(2, Some(1)));
        assert!(matches!(
            grammar.check(),
            Err(Error::InvalidGrammarDefinition(_))
        ));

        let grammar = Grammar::new("T", "1").with_rule(
            StructuralRule::segment("HDR")
                .with_children(vec![StructuralRule::segment("X").occurs(0, Some(0))]),
        );
        assert!(grammar.check().is_err());
    }

    #[test]
    fn test_sibling_ambiguity_rejected() {
        let grammar = Grammar::new("T", "1")
            .with_rule(StructuralRule::segment("DTM").occurs(0, Some(2)))
            .with_rule(StructuralRule::segment("FTX"))
            .with_rule(StructuralRule::segment("DTM"));
        assert!(grammar.check().is_err());

        // A mandatory rule in between separates the two windows.
        let grammar = Grammar::new("T", "1")
            .with_rule(StructuralRule::segment("DTM").occurs(0, Some(2)))
            .with_rule(StructuralRule::segment("FTX").mandatory())
            .with_rule(StructuralRule::segment("DTM"));
        assert!(grammar.check().is_ok());

        // Fixed occurrence counts are unambiguous.
        let grammar = Grammar::new("T", "1")
            .with_rule(StructuralRule::segment("DTM").occurs(1, Some(1)))
            .with_rule(StructuralRule::segment("DTM"));
        assert!(grammar.check().is_ok());
    }

    #[test]
    fn test_disjoint_qualifiers_are_not_ambiguous() {
        let grammar = Grammar::new("837", "005010X222A1")
            .with_rule(StructuralRule::segment("NM1").named("1000A").qualified(1, 1, ["41"]).occurs(0, Some(2)))
            .with_rule(StructuralRule::segment("NM1").named("1000B").qualified(1, 1, ["40"]));
        assert!(grammar.check().is_ok());

        let grammar = Grammar::new("837", "005010X222A1")
            .with_rule(StructuralRule::segment("NM1").qualified(1, 1, ["41", "40"]).occurs(0, Some(2)))
            .with_rule(StructuralRule::segment("NM1").qualified(1, 1, ["40"]));
        assert!(grammar.check().is_err());
    }

    #[test]
    fn test_field_rule_checks() {
        let duplicate = Grammar::new("T", "1").with_record(
            "HDR",
            vec![
                FieldRule::new(1, "A", DataType::Alphanumeric),
                FieldRule::new(1, "B", DataType::Alphanumeric),
            ],
        );
        assert!(duplicate.check().is_err());

        let lengths = Grammar::new("T", "1").with_record(
            "HDR",
            vec![FieldRule::new(1, "A", DataType::Alphanumeric).length(5, 2)],
        );
        assert!(lengths.check().is_err());

        let component = Grammar::new("T", "1").with_record(
            "HDR",
            vec![FieldRule::new(1, "C", DataType::Alphanumeric).with_components(vec![
                FieldRule::new(1, "C1", DataType::Alphanumeric),
                FieldRule::new(2, "C2", DataType::Alphanumeric).repeat(0),
            ])],
        );
        assert!(component.check().is_err());
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("AN".parse::<DataType>().unwrap(), DataType::Alphanumeric);
        assert_eq!("a".parse::<DataType>().unwrap(), DataType::Alphabetic);
        assert_eq!(
            "N2".parse::<DataType>().unwrap(),
            DataType::Numeric { implied_decimals: 2 }
        );
        assert_eq!(
            "N".parse::<DataType>().unwrap(),
            DataType::Numeric { implied_decimals: 0 }
        );
        assert_eq!("n".parse::<DataType>().unwrap(), DataType::Decimal);
        assert_eq!("DT".parse::<DataType>().unwrap(), DataType::Date);
        assert!("N10".parse::<DataType>().is_err());
        assert!("X".parse::<DataType>().is_err());
        assert_eq!(DataType::Numeric { implied_decimals: 2 }.to_string(), "N2");
    }
}
