//! Field validation engine
//!
//! Validates the raw fields of one segment against the segment's record
//! definition. Every field is evaluated; a failing field never stops the
//! validation of its siblings.

use crate::collector::ErrorCollector;
use crate::error::{ErrorKind, ErrorPosition, ValidationError};
use crate::rules::{significant_length, validate_data_type, validate_length};
use edi_ir::{Field, FieldStatus, RawField, RawSegment};
use edi_schema::FieldRule;

/// Validates segments field by field
#[derive(Debug, Clone, Copy)]
pub struct FieldValidator {
    decimal_mark: char,
}

/// Where in a segment a value sits, for error positions
#[derive(Clone, Copy)]
struct Slot<'a> {
    segment: &'a RawSegment,
    path: &'a str,
    element: usize,
    component: Option<usize>,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldValidator {
    #[must_use]
    pub fn new() -> Self {
        Self { decimal_mark: '.' }
    }

    /// Use a different decimal mark for `R`/decimal values
    #[must_use]
    pub fn with_decimal_mark(mut self, decimal_mark: char) -> Self {
        self.decimal_mark = decimal_mark;
        self
    }

    /// Validate all fields of a segment
    ///
    /// With no record definition the raw values are returned as text without
    /// checks. Declared fields absent from the segment are returned as empty
    /// fields, undeclared non-empty values as `Unexpected` fields.
    pub fn validate_segment(
        &self,
        segment: &RawSegment,
        rules: Option<&[FieldRule]>,
        path: &str,
        collector: &mut ErrorCollector,
    ) -> Vec<Field> {
        let Some(rules) = rules else {
            return unchecked_fields(segment);
        };

        let mut ordered: Vec<&FieldRule> = rules.iter().collect();
        ordered.sort_by_key(|r| r.position);

        let mut fields = Vec::new();
        for rule in &ordered {
            let slot = Slot {
                segment,
                path,
                element: rule.position,
                component: None,
            };
            self.validate_element(rule, segment.field(rule.position), slot, collector, &mut fields);
        }

        for (i, raw) in segment.fields.iter().enumerate() {
            let position = i + 1;
            if raw.is_empty() || ordered.iter().any(|r| r.position == position) {
                continue;
            }
            let slot = Slot {
                segment,
                path,
                element: position,
                component: None,
            };
            fields.push(unexpected(
                slot,
                &render(raw),
                format!("element {position:02} is not defined for segment {}", segment.code),
                collector,
            ));
        }

        fields.sort_by_key(|f| (f.position, f.repetition));
        fields
    }

    fn validate_element(
        &self,
        rule: &FieldRule,
        raw: Option<&RawField>,
        slot: Slot<'_>,
        collector: &mut ErrorCollector,
        out: &mut Vec<Field>,
    ) {
        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                out.push(missing(rule, slot, collector));
                return;
            }
        };

        for (repetition, components) in raw.repetitions.iter().enumerate() {
            let present = components.iter().any(|c| !c.is_empty());

            if repetition >= rule.max_repeat {
                if present {
                    let mut field = unexpected(
                        slot,
                        &components.join(":"),
                        format!(
                            "element {} repeats more than {} time(s)",
                            rule.id, rule.max_repeat
                        ),
                        collector,
                    );
                    field.id.clone_from(&rule.id);
                    field.repetition = repetition;
                    out.push(field);
                }
                continue;
            }

            if !present && repetition > 0 {
                continue;
            }

            let mut field = if rule.is_composite() {
                self.validate_composite(rule, components, slot, collector)
            } else {
                self.validate_simple_element(rule, components, slot, collector)
            };
            field.repetition = repetition;
            out.push(field);
        }
    }

    fn validate_simple_element(
        &self,
        rule: &FieldRule,
        components: &[String],
        slot: Slot<'_>,
        collector: &mut ErrorCollector,
    ) -> Field {
        let value = components.first().map_or("", String::as_str);
        let mut field = self.validate_value(rule, value, slot, collector);

        for (i, extra) in components.iter().enumerate().skip(1) {
            if extra.is_empty() {
                continue;
            }
            let position = i + 1;
            let component_slot = Slot {
                component: Some(position),
                ..slot
            };
            field.components.push(unexpected(
                component_slot,
                extra,
                format!("element {} is not a composite (component {position})", rule.id),
                collector,
            ));
        }

        field
    }

    fn validate_composite(
        &self,
        rule: &FieldRule,
        components: &[String],
        slot: Slot<'_>,
        collector: &mut ErrorCollector,
    ) -> Field {
        if components.iter().all(String::is_empty) {
            // Empty first repetition followed by non-empty ones.
            return missing(rule, slot, collector);
        }

        let mut field = Field::new(&rule.id, rule.position, "");

        let mut ordered: Vec<&FieldRule> = rule.components.iter().collect();
        ordered.sort_by_key(|r| r.position);

        for component_rule in &ordered {
            let value = component_rule
                .position
                .checked_sub(1)
                .and_then(|i| components.get(i))
                .map_or("", String::as_str);
            let component_slot = Slot {
                component: Some(component_rule.position),
                ..slot
            };
            field
                .components
                .push(self.validate_value(component_rule, value, component_slot, collector));
        }

        for (i, extra) in components.iter().enumerate() {
            let position = i + 1;
            if extra.is_empty() || ordered.iter().any(|r| r.position == position) {
                continue;
            }
            let component_slot = Slot {
                component: Some(position),
                ..slot
            };
            field.components.push(unexpected(
                component_slot,
                extra,
                format!("component {position} is not defined for composite {}", rule.id),
                collector,
            ));
        }

        field
    }

    /// Mandatory, type and length checks of one simple value
    fn validate_value(
        &self,
        rule: &FieldRule,
        value: &str,
        slot: Slot<'_>,
        collector: &mut ErrorCollector,
    ) -> Field {
        let mut field = Field::new(&rule.id, rule.position, value);

        if value.is_empty() {
            if rule.mandatory {
                field.status = FieldStatus::MissingMandatory;
                record_missing(rule, slot, collector);
            }
            return field;
        }

        let typed = validate_data_type(value, rule.data_type, self.decimal_mark);
        if !typed.is_valid {
            field.status = FieldStatus::InvalidDataType;
            collector.record(
                error_at(
                    ErrorKind::InvalidDataType,
                    slot,
                    format!(
                        "{}: {}",
                        rule.id,
                        typed.message.as_deref().unwrap_or("invalid value")
                    ),
                )
                .with_value(value)
                .with_expected(rule.data_type.code()),
            );
            // Length is only meaningful for a well-typed value
            return field;
        }

        let length = validate_length(value, rule);
        if !length.is_valid {
            field.status = FieldStatus::LengthViolation;
            collector.record(
                error_at(
                    ErrorKind::LengthViolation,
                    slot,
                    format!(
                        "{}: {}",
                        rule.id,
                        length.message.as_deref().unwrap_or("invalid length")
                    ),
                )
                .with_value(value)
                .with_expected(format!("{}..{}", rule.min_length, rule.max_length))
                .with_actual(significant_length(value, rule.data_type).to_string()),
            );
        }

        if field.status == FieldStatus::Ok {
            field.value = typed.value;
        }
        field
    }
}

fn error_at(kind: ErrorKind, slot: Slot<'_>, message: String) -> ValidationError {
    let position = ErrorPosition::segment(slot.segment)
        .with_field(slot.element)
        .with_component(slot.component);

    let mut path = format!("{}/{}{:02}", slot.path, slot.segment.code, slot.element);
    if let Some(component) = slot.component {
        path.push_str(&format!("-{component}"));
    }

    ValidationError::new(kind, position, message).at_path(path)
}

fn record_missing(rule: &FieldRule, slot: Slot<'_>, collector: &mut ErrorCollector) {
    collector.record(
        error_at(
            ErrorKind::MissingMandatoryField,
            slot,
            format!("mandatory element {} is missing", rule.id),
        )
        .with_expected(rule.id.clone()),
    );
}

/// Field for a declared element that has no value
fn missing(rule: &FieldRule, slot: Slot<'_>, collector: &mut ErrorCollector) -> Field {
    let mut field = empty_field(rule);
    if rule.mandatory {
        field.status = FieldStatus::MissingMandatory;
        record_missing(rule, slot, collector);
    }
    field
}

fn empty_field(rule: &FieldRule) -> Field {
    let mut field = Field::new(&rule.id, rule.position, "");
    field.components = rule.components.iter().map(empty_field).collect();
    field
}

fn unexpected(slot: Slot<'_>, value: &str, message: String, collector: &mut ErrorCollector) -> Field {
    collector.record(error_at(ErrorKind::UnexpectedField, slot, message).with_value(value));

    let mut field = Field::new("", slot.component.unwrap_or(slot.element), value);
    field.status = FieldStatus::Unexpected;
    field
}

/// Raw values rendered as text, for segments without a record definition
fn unchecked_fields(segment: &RawSegment) -> Vec<Field> {
    segment
        .fields
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let position = i + 1;
            let id = format!("{}{position:02}", segment.code);
            let mut field = Field::new(id.clone(), position, "");
            let components = raw.components();
            if components.len() > 1 {
                field.components = components
                    .iter()
                    .enumerate()
                    .map(|(j, c)| Field::new(format!("{id}-{}", j + 1), j + 1, c.as_str()))
                    .collect();
            } else {
                field.raw = raw.value().to_string();
            }
            field
        })
        .collect()
}

/// Raw field as one string, components joined with `:` and repetitions
/// with `^`
fn render(raw: &RawField) -> String {
    raw.repetitions
        .iter()
        .map(|components| components.join(":"))
        .collect::<Vec<_>>()
        .join("^")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ValidationMode;
    use edi_ir::{Position, Value};
    use edi_schema::DataType;

    fn segment(code: &str, fields: Vec<RawField>) -> RawSegment {
        RawSegment {
            code: code.to_string(),
            index: 4,
            position: Position::new(4, 1, 0, 0),
            fields,
        }
    }

    fn qty_rules() -> Vec<FieldRule> {
        vec![
            FieldRule::new(1, "C186", DataType::Alphanumeric)
                .mandatory()
                .with_components(vec![
                    FieldRule::new(1, "6063", DataType::Alphanumeric).mandatory().length(1, 3),
                    FieldRule::new(2, "6060", DataType::Decimal).mandatory().length(1, 15),
                    FieldRule::new(3, "6411", DataType::Alphanumeric).length(1, 3),
                ]),
        ]
    }

    fn run(segment: &RawSegment, rules: &[FieldRule]) -> (Vec<Field>, Vec<ValidationError>) {
        let mut collector = ErrorCollector::new(ValidationMode::Strict);
        let fields = FieldValidator::new().validate_segment(segment, Some(rules), "ORDERS", &mut collector);
        (fields, collector.into_errors())
    }

    #[test]
    fn test_valid_composite() {
        let seg = segment("QTY", vec![RawField::composite(["21", "48"])]);
        let (fields, errors) = run(&seg, &qty_rules());

        assert!(errors.is_empty());
        assert_eq!(fields.len(), 1);
        let composite = &fields[0];
        assert_eq!(composite.components.len(), 3);
        assert_eq!(composite.components[1].value, Some(Value::Decimal(48.0)));
        assert!(composite.components[2].is_empty());
        assert!(composite.is_ok());
    }

    #[test]
    fn test_missing_mandatory_component() {
        let seg = segment("QTY", vec![RawField::composite(["21"])]);
        let (fields, errors) = run(&seg, &qty_rules());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingMandatoryField);
        assert_eq!(errors[0].position.field, Some(1));
        assert_eq!(errors[0].position.component, Some(2));
        assert_eq!(errors[0].path, "ORDERS/QTY01-2");
        assert_eq!(fields[0].components[1].status, FieldStatus::MissingMandatory);
    }

    #[test]
    fn test_missing_mandatory_element() {
        let seg = segment("QTY", vec![]);
        let (fields, errors) = run(&seg, &qty_rules());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingMandatoryField);
        assert_eq!(errors[0].position.component, None);
        assert_eq!(fields[0].status, FieldStatus::MissingMandatory);
        assert_eq!(fields[0].components.len(), 3);
    }

    #[test]
    fn test_invalid_type_skips_length_check() {
        let rules = vec![
            FieldRule::new(1, "QTY01", DataType::Numeric { implied_decimals: 0 })
                .mandatory()
                .length(1, 5),
        ];
        let seg = segment("ITEM", vec![RawField::simple("abc")]);
        let (fields, errors) = run(&seg, &rules);

        let kinds: Vec<ErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::InvalidDataType]);
        assert_eq!(fields[0].status, FieldStatus::InvalidDataType);
        assert_eq!(fields[0].value, None);
        assert_eq!(errors[0].value.as_deref(), Some("abc"));
    }

    #[test]
    fn test_numeric_length_counts_digits() {
        let rules = vec![FieldRule::new(1, "QTY01", DataType::Decimal).length(1, 3)];
        let seg = segment("ITEM", vec![RawField::simple("-12.50")]);
        let (_, errors) = run(&seg, &rules);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::LengthViolation);
        assert_eq!(errors[0].actual.as_deref(), Some("4"));
    }

    #[test]
    fn test_unexpected_values_are_warnings() {
        let rules = vec![FieldRule::new(1, "1004", DataType::Alphanumeric)];
        let seg = segment(
            "BGM",
            vec![
                RawField::composite(["PO1", "X"]),
                RawField::simple(""),
                RawField::simple("EXTRA"),
            ],
        );
        let (fields, errors) = run(&seg, &rules);

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::UnexpectedField && !e.is_blocking()));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].raw, "PO1");
        assert_eq!(fields[0].components[0].status, FieldStatus::Unexpected);
        assert_eq!(fields[1].position, 3);
        assert_eq!(fields[1].status, FieldStatus::Unexpected);
        assert!(!fields.iter().any(Field::has_violation));
    }

    #[test]
    fn test_repetitions() {
        let rules = vec![FieldRule::new(1, "REF02", DataType::Alphanumeric).repeat(2)];
        let raw = RawField {
            repetitions: vec![vec!["A".into()], vec!["B".into()], vec!["C".into()]],
        };
        let (fields, errors) = run(&segment("REF", vec![raw]), &rules);

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].repetition, 1);
        assert!(fields[1].is_ok());
        assert_eq!(fields[2].status, FieldStatus::Unexpected);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnexpectedField);
    }

    #[test]
    fn test_optional_empty_composite_skips_components() {
        let rules = vec![
            FieldRule::new(1, "3035", DataType::Identifier).mandatory(),
            FieldRule::new(2, "C082", DataType::Alphanumeric).with_components(vec![
                FieldRule::new(1, "3039", DataType::Alphanumeric).mandatory(),
                FieldRule::new(2, "1131", DataType::Alphanumeric),
            ]),
        ];
        let seg = segment("NAD", vec![RawField::simple("BY"), RawField::composite(["", ""])]);
        let (fields, errors) = run(&seg, &rules);

        assert!(errors.is_empty());
        assert_eq!(fields[1].components.len(), 2);
        assert!(fields[1].is_empty());
    }

    #[test]
    fn test_without_record_definition() {
        let seg = segment("FTX", vec![RawField::simple("AAI"), RawField::composite(["A", "B"])]);
        let mut collector = ErrorCollector::default();
        let fields = FieldValidator::new().validate_segment(&seg, None, "T", &mut collector);

        assert!(collector.is_empty());
        assert_eq!(fields[0].id, "FTX01");
        assert_eq!(fields[0].raw, "AAI");
        assert_eq!(fields[1].components[1].raw, "B");
    }

    #[test]
    fn test_lenient_mode_downgrades_field_errors() {
        let rules = vec![FieldRule::new(1, "QTY01", DataType::Numeric { implied_decimals: 0 }).mandatory()];
        let seg = segment("ITEM", vec![RawField::simple("abc")]);
        let mut collector = ErrorCollector::new(ValidationMode::Lenient);
        let fields = FieldValidator::new().validate_segment(&seg, Some(&rules), "T", &mut collector);

        assert!(!collector.has_blocking());
        assert_eq!(collector.len(), 1);
        assert!(fields[0].has_violation());
    }
}
