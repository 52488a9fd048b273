//! Parse entry points
//!
//! [`Parser`] lexes the input under a dialect configuration, matches the
//! segments against a grammar and validates their fields. Findings never
//! abort a parse: the [`ParseResult`] carries the tree built so far and
//! every finding in the order it was made.

use crate::matcher::Matcher;
use crate::Result;
use edi_ir::{Document, DocumentMetadata, Node, RawSegment, Severity};
use edi_lexer::{DialectConfig, LexError, LexIssue, LexMode, Lexer, Separators};
use edi_schema::{Grammar, GrammarRegistry};
use edi_validation::{
    ErrorCollector, ErrorKind, ErrorPosition, FieldValidator, Summary, ValidationError,
    ValidationMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Parse configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Failure policy
    pub mode: ValidationMode,

    /// Keep segment nodes whose fields failed validation. Only consulted in
    /// lenient mode; a strict parse always keeps them.
    pub include_invalid_nodes: bool,

    /// Let a segment match past a mandatory rule that has not occurred yet.
    /// The passed rule is reported as missing.
    pub skip_missing_mandatory: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Strict,
            include_invalid_nodes: true,
            skip_missing_mandatory: false,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lenient() -> Self {
        Self::default().with_mode(ValidationMode::Lenient)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_include_invalid_nodes(mut self, include: bool) -> Self {
        self.include_invalid_nodes = include;
        self
    }

    #[must_use]
    pub fn with_skip_missing_mandatory(mut self, skip: bool) -> Self {
        self.skip_missing_mandatory = skip;
        self
    }
}

/// Segment accounting of a parse
///
/// Every segment is either consumed into the tree or skipped with exactly
/// one finding, so `segments_consumed + segments_skipped == segments_total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub segments_total: usize,
    pub segments_consumed: usize,
    pub segments_skipped: usize,
}

/// Outcome of a parse
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    /// No blocking finding was recorded
    pub success: bool,
    pub document: Document,
    pub errors: Vec<ValidationError>,
    pub summary: Summary,
    pub stats: ParseStats,
    /// Separators in effect, absent when lexing failed
    #[serde(skip)]
    pub separators: Option<Separators>,
}

impl ParseResult {
    /// Findings of severity `Error` or `Fatal`
    pub fn blocking_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_blocking())
    }

    /// Findings of severity `Warning`
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.severity == Severity::Warning)
    }
}

/// Grammar-driven parser
#[derive(Debug, Clone)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    dialect: DialectConfig,
    options: ParseOptions,
}

impl<'g> Parser<'g> {
    /// Create a strict parser
    #[must_use]
    pub fn new(grammar: &'g Grammar, dialect: DialectConfig) -> Self {
        Self {
            grammar,
            dialect,
            options: ParseOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> ParseOptions {
        self.options
    }

    #[must_use]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Parse raw input
    #[must_use]
    pub fn parse(&self, input: &[u8]) -> ParseResult {
        let mut collector = ErrorCollector::new(self.options.mode);

        let lex_mode = match self.options.mode {
            ValidationMode::Strict => LexMode::Strict,
            ValidationMode::Lenient => LexMode::Lenient,
        };

        let lexed = match Lexer::new(self.dialect).with_mode(lex_mode).lex(input) {
            Ok(lexed) => lexed,
            Err(e) => {
                warn!(error = %e, "lexing failed");
                collector.record(lex_failure(&e));
                let document = Document::with_metadata(
                    Node::root(&self.grammar.message_type),
                    self.metadata(),
                );
                return finish(collector, document, ParseStats::default(), None);
            }
        };

        for issue in &lexed.issues {
            collector.record(lex_issue(issue));
        }

        self.match_segments(&lexed.segments, lexed.separators, collector)
    }

    /// Parse segments that were lexed elsewhere
    #[must_use]
    pub fn parse_segments(&self, segments: &[RawSegment], separators: Separators) -> ParseResult {
        self.match_segments(segments, separators, ErrorCollector::new(self.options.mode))
    }

    fn match_segments(
        &self,
        segments: &[RawSegment],
        separators: Separators,
        mut collector: ErrorCollector,
    ) -> ParseResult {
        let validator = FieldValidator::new().with_decimal_mark(char::from(separators.decimal));
        let matcher = Matcher::new(self.grammar, validator, self.options);
        let (document, stats) = matcher.run(segments, &mut collector);

        finish(collector, document, stats, Some(separators))
    }

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            source: None,
            message_type: Some(self.grammar.message_type.clone()),
            version: Some(self.grammar.version.clone()),
        }
    }
}

fn finish(
    collector: ErrorCollector,
    document: Document,
    stats: ParseStats,
    separators: Option<Separators>,
) -> ParseResult {
    let summary = collector.summary();
    let success = summary.is_clean();

    debug!(
        success,
        segments = stats.segments_total,
        skipped = stats.segments_skipped,
        %summary,
        "parse complete"
    );

    ParseResult {
        success,
        document,
        errors: collector.into_errors(),
        summary,
        stats,
        separators,
    }
}

fn lex_failure(error: &LexError) -> ValidationError {
    match error {
        LexError::UnterminatedSegment {
            index, code, line, ..
        } => ValidationError::new(
            ErrorKind::UnterminatedSegment,
            ErrorPosition {
                segment_index: *index,
                segment_code: Some(code.clone()),
                line: Some(*line),
                ..ErrorPosition::default()
            },
            error.to_string(),
        )
        .with_severity(Severity::Fatal)
        .with_value(code.clone()),
        LexError::ConflictingDelimiters { character, .. } => ValidationError::new(
            ErrorKind::ConflictingDelimiters,
            ErrorPosition::default(),
            error.to_string(),
        )
        .with_severity(Severity::Fatal)
        .with_value(character.to_string()),
    }
}

fn lex_issue(issue: &LexIssue) -> ValidationError {
    match issue {
        LexIssue::UnterminatedSegment {
            index,
            code,
            position,
        } => ValidationError::new(
            ErrorKind::UnterminatedSegment,
            ErrorPosition {
                segment_index: *index,
                segment_code: Some(code.clone()),
                line: Some(position.line),
                ..ErrorPosition::default()
            },
            format!("segment {code} is not terminated, kept as read"),
        )
        .with_severity(Severity::Warning)
        .with_value(code.clone()),
        LexIssue::NonUtf8Value {
            index,
            code,
            position,
        } => ValidationError::new(
            ErrorKind::InvalidEncoding,
            ErrorPosition {
                segment_index: *index,
                segment_code: Some(code.clone()),
                line: Some(position.line),
                ..ErrorPosition::default()
            },
            format!("segment {code} is not valid UTF-8, decoded as Latin-1"),
        )
        .with_value(code.clone()),
    }
}

/// Parse `input` with a grammar under the given policy
#[must_use]
pub fn parse(
    input: &[u8],
    dialect: &DialectConfig,
    grammar: &Grammar,
    mode: ValidationMode,
) -> ParseResult {
    Parser::new(grammar, *dialect)
        .with_options(ParseOptions::default().with_mode(mode))
        .parse(input)
}

/// Strict parse returning only the findings
#[must_use]
pub fn validate(input: &[u8], dialect: &DialectConfig, grammar: &Grammar) -> Vec<ValidationError> {
    parse(input, dialect, grammar, ValidationMode::Strict).errors
}

/// Parse with a grammar resolved through a registry
///
/// # Errors
///
/// Returns [`Error::Grammar`](crate::Error::Grammar) when the grammar is
/// neither registered nor loadable.
pub fn parse_with_registry(
    input: &[u8],
    dialect: &DialectConfig,
    registry: &GrammarRegistry,
    message_type: &str,
    version: &str,
    options: ParseOptions,
) -> Result<ParseResult> {
    let grammar = registry.load(message_type, version)?;
    Ok(Parser::new(&grammar, *dialect).with_options(options).parse(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_ir::{FieldStatus, NodeType, Value};
    use edi_schema::{DataType, FieldRule, StructuralRule};

    /// UNH, BGM, DTM 0..2, loop LIN { QTY 0..1 } 0..unbounded, UNT
    fn orders() -> Grammar {
        Grammar::new("ORDERS", "D96A")
            .with_rule(StructuralRule::segment("UNH").mandatory())
            .with_rule(StructuralRule::segment("BGM").mandatory())
            .with_rule(StructuralRule::segment("DTM").occurs(0, Some(2)))
            .with_rule(
                StructuralRule::segment("LIN")
                    .named("SG25")
                    .occurs(0, None)
                    .with_children(vec![StructuralRule::segment("QTY")]),
            )
            .with_rule(StructuralRule::segment("UNT").mandatory())
            .with_record(
                "QTY",
                vec![FieldRule::new(1, "C186", DataType::Alphanumeric)
                    .mandatory()
                    .with_components(vec![
                        FieldRule::new(1, "6063", DataType::Identifier).mandatory().length(1, 3),
                        FieldRule::new(2, "6060", DataType::Decimal).mandatory().length(1, 15),
                    ])],
            )
    }

    fn run(input: &str, options: ParseOptions) -> ParseResult {
        Parser::new(&orders(), DialectConfig::edifact())
            .with_options(options)
            .parse(input.as_bytes())
    }

    fn kinds(result: &ParseResult) -> Vec<ErrorKind> {
        result.errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_clean_parse_builds_tree() {
        let result = run(
            "UNH+1'BGM+220'LIN+1'QTY+21:10'LIN+2'UNT+6+1'",
            ParseOptions::strict(),
        );

        assert!(result.success, "{:?}", result.errors);
        assert!(result.errors.is_empty());

        let root = &result.document.root;
        assert_eq!(root.name, "ORDERS");
        let names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["UNH", "BGM", "SG25", "SG25", "UNT"]);

        let first = &root.children[2];
        assert_eq!(first.node_type, NodeType::Loop);
        assert_eq!(first.occurrence, 0);
        assert_eq!(first.children[0].code, "QTY");
        assert_eq!(
            first.children[0].fields[0].components[1].value,
            Some(Value::Decimal(10.0))
        );
        assert_eq!(root.children[3].occurrence, 1);
        assert!(root.children[3].children.is_empty());

        assert_eq!(
            result.stats,
            ParseStats {
                segments_total: 6,
                segments_consumed: 6,
                segments_skipped: 0
            }
        );
        assert_eq!(result.separators, Some(Separators::edifact()));
    }

    #[test]
    fn test_missing_mandatory_reported_where_window_closes() {
        let result = run("UNH+1'LIN+1'UNT+3+1'", ParseOptions::strict());

        // BGM blocks the scan, so LIN and UNT cannot be placed.
        assert!(!result.success);
        assert_eq!(
            kinds(&result),
            vec![
                ErrorKind::UnmatchedSegment,
                ErrorKind::UnmatchedSegment,
                ErrorKind::MissingMandatorySegment,
                ErrorKind::MissingMandatorySegment,
            ]
        );
        let missing = &result.errors[2];
        assert_eq!(missing.path, "ORDERS/BGM");
        assert_eq!(missing.position.segment_index, 4);
        assert_eq!(missing.position.segment_code, None);
        assert_eq!(result.stats.segments_skipped, 2);
    }

    #[test]
    fn test_skip_missing_mandatory_recovers() {
        let result = run(
            "UNH+1'LIN+1'UNT+3+1'",
            ParseOptions::strict().with_skip_missing_mandatory(true),
        );

        assert_eq!(kinds(&result), vec![ErrorKind::MissingMandatorySegment]);
        assert_eq!(result.errors[0].path, "ORDERS/BGM");
        assert_eq!(result.errors[0].position.segment_code.as_deref(), Some("LIN"));
        assert_eq!(result.stats.segments_consumed, 3);
    }

    #[test]
    fn test_max_occurrence_exceeded() {
        let result = run(
            "UNH+1'BGM+220'DTM+137:20240101:102'DTM+2:20240105:102'DTM+63:20240110:102'UNT+6+1'",
            ParseOptions::strict(),
        );

        assert_eq!(kinds(&result), vec![ErrorKind::MaxOccurrenceExceeded]);
        let error = &result.errors[0];
        assert_eq!(error.position.segment_index, 5);
        assert_eq!(error.path, "ORDERS/DTM");
        assert_eq!(error.expected.as_deref(), Some("2"));
        assert_eq!(error.actual.as_deref(), Some("3"));
        assert_eq!(result.document.root.find_children("DTM").len(), 2);
    }

    #[test]
    fn test_field_errors_keep_node_flagged() {
        let result = run(
            "UNH+1'BGM+220'LIN+1'QTY+21:1x'UNT+5+1'",
            ParseOptions::strict(),
        );

        assert!(!result.success);
        assert_eq!(kinds(&result), vec![ErrorKind::InvalidDataType]);
        assert_eq!(result.errors[0].path, "ORDERS/SG25[0]/QTY/QTY01-2");

        let qty = &result.document.root.children[2].children[0];
        assert!(!qty.is_valid);
        assert_eq!(
            qty.fields[0].components[1].status,
            FieldStatus::InvalidDataType
        );
    }

    #[test]
    fn test_lenient_downgrades_and_can_drop_invalid_nodes() {
        let input = "UNH+1'BGM+220'LIN+1'QTY+21:1x'XXX+1'UNT+5+1'";

        let kept = run(input, ParseOptions::lenient());
        assert!(kept.success);
        assert_eq!(kept.summary.warnings, 2);
        assert_eq!(kept.document.segment_count(), 5);

        let dropped = run(input, ParseOptions::lenient().with_include_invalid_nodes(false));
        assert!(dropped.success);
        assert_eq!(dropped.document.segment_count(), 4);
        assert_eq!(dropped.stats.segments_consumed, 5);
        assert_eq!(dropped.stats.segments_skipped, 1);
    }

    #[test]
    fn test_strict_unterminated_is_fatal() {
        let result = run("UNH+1'BGM+220", ParseOptions::strict());

        assert!(!result.success);
        assert_eq!(kinds(&result), vec![ErrorKind::UnterminatedSegment]);
        assert_eq!(result.errors[0].severity, Severity::Fatal);
        assert!(result.document.root.children.is_empty());
        assert_eq!(result.separators, None);
    }

    #[test]
    fn test_lenient_unterminated_is_warning() {
        let result = run("UNH+1'BGM+220'UNT+3+1", ParseOptions::lenient());

        assert!(result.success);
        assert_eq!(kinds(&result), vec![ErrorKind::UnterminatedSegment]);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(result.document.segment_count(), 3);
    }

    #[test]
    fn test_conflicting_delimiters_fatal_in_both_modes() {
        for options in [ParseOptions::strict(), ParseOptions::lenient()] {
            let result = run("UNA++.? 'UNH+1'", options);
            assert!(!result.success);
            assert_eq!(kinds(&result), vec![ErrorKind::ConflictingDelimiters]);
        }
    }

    #[test]
    fn test_latin1_value_kept_with_warning() {
        let result = Parser::new(&orders(), DialectConfig::edifact())
            .parse(b"UNH+1'BGM+Caf\xE9'UNT+3+1'");

        assert!(result.success);
        assert_eq!(kinds(&result), vec![ErrorKind::InvalidEncoding]);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(result.errors[0].position.segment_index, 2);

        let bgm = result.document.root.find_child("BGM").unwrap();
        assert_eq!(bgm.raw_value(1, None), Some("Caf\u{e9}"));
    }

    #[test]
    fn test_validate_returns_findings() {
        let errors = validate(
            b"UNH+1'BGM+220'",
            &DialectConfig::edifact(),
            &orders(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingMandatorySegment);
        assert_eq!(errors[0].path, "ORDERS/UNT");
    }

    #[test]
    fn test_parse_with_registry() {
        let registry = GrammarRegistry::new();
        registry.register(orders()).unwrap();

        let result = parse_with_registry(
            b"UNH+1'BGM+220'UNT+3+1'",
            &DialectConfig::edifact(),
            &registry,
            "ORDERS",
            "D96A",
            ParseOptions::default(),
        )
        .unwrap();
        assert!(result.success);

        let missing = parse_with_registry(
            b"",
            &DialectConfig::edifact(),
            &registry,
            "INVOIC",
            "D96A",
            ParseOptions::default(),
        );
        assert!(matches!(missing, Err(crate::Error::Grammar(_))));
    }

    #[test]
    fn test_result_serializes() {
        let result = run("UNH+1'BGM+220'UNT+3+1'", ParseOptions::strict());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["stats"]["segments_total"], 3);
        assert_eq!(json["document"]["root"]["name"], "ORDERS");
    }
}
