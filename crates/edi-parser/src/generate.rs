//! Sample document generation
//!
//! Produces the smallest document a grammar accepts: every rule occurs
//! exactly `min_occurs` times, loops include their own mandatory members,
//! and only mandatory fields are filled, with values of the minimum legal
//! length. Qualified rules get their first accepted qualifier value.
//!
//! Service headers (`ISA`, `UNA`) are not synthesized; the output is meant
//! to be read back with explicit separators.

use crate::Result;
use edi_ir::{Position, RawField, RawSegment};
use edi_lexer::{SegmentWriter, Separators};
use edi_schema::{DataType, FieldRule, Grammar, StructuralRule};
use tracing::debug;

/// Generate the minimal segment sequence for a grammar
#[must_use]
pub fn generate(grammar: &Grammar) -> Vec<RawSegment> {
    let mut segments = Vec::new();
    emit(grammar, &grammar.structure, &mut segments);

    debug!(
        message_type = %grammar.message_type,
        segments = segments.len(),
        "generated sample document"
    );
    segments
}

/// Generate the minimal document for a grammar and render it
///
/// # Errors
///
/// Returns [`Error::Write`](crate::Error::Write) when a qualifier value
/// contains a separator that cannot be escaped.
pub fn generate_document(grammar: &Grammar, separators: Separators) -> Result<Vec<u8>> {
    let segments = generate(grammar);
    let writer = SegmentWriter::new(separators).with_line_breaks(true);
    Ok(writer.write(&segments)?)
}

fn emit(grammar: &Grammar, rules: &[StructuralRule], out: &mut Vec<RawSegment>) {
    for rule in rules {
        for _ in 0..rule.min_occurs {
            let index = out.len() + 1;
            out.push(sample_segment(grammar, rule, index));
            emit(grammar, &rule.children, out);
        }
    }
}

fn sample_segment(grammar: &Grammar, rule: &StructuralRule, index: usize) -> RawSegment {
    // Element position -> component values
    let mut elements: Vec<Vec<String>> = Vec::new();

    for field in grammar.rule_for(&rule.code).unwrap_or_default() {
        if !field.mandatory {
            continue;
        }

        if field.is_composite() {
            let mandatory: Vec<&FieldRule> =
                field.components.iter().filter(|c| c.mandatory).collect();
            let filled: Vec<&FieldRule> = if mandatory.is_empty() {
                field.components.iter().take(1).collect()
            } else {
                mandatory
            };
            for component in filled {
                set_value(&mut elements, field.position, component.position, sample_value(component));
            }
        } else {
            set_value(&mut elements, field.position, 1, sample_value(field));
        }
    }

    if let Some(qualifier) = &rule.qualifier {
        if let Some(value) = qualifier.values.first() {
            set_value(&mut elements, qualifier.element, qualifier.component, value.clone());
        }
    }

    RawSegment {
        code: rule.code.clone(),
        index,
        position: Position::default(),
        fields: elements
            .into_iter()
            .map(|components| RawField {
                repetitions: vec![components],
            })
            .collect(),
    }
}

fn set_value(elements: &mut Vec<Vec<String>>, element: usize, component: usize, value: String) {
    if element == 0 || component == 0 {
        return;
    }
    if elements.len() < element {
        elements.resize_with(element, || vec![String::new()]);
    }
    let components = &mut elements[element - 1];
    if components.len() < component {
        components.resize(component, String::new());
    }
    components[component - 1] = value;
}

/// Shortest value of the field's type that satisfies its length bounds
fn sample_value(field: &FieldRule) -> String {
    let length = field.min_length.max(1).min(field.max_length.max(1));

    match field.data_type {
        DataType::Alphabetic | DataType::Alphanumeric | DataType::Identifier => "A".repeat(length),
        DataType::Numeric { .. } | DataType::Decimal => "1".repeat(length),
        DataType::Date if field.max_length >= 8 => "20240101".to_string(),
        DataType::Date => "240101".to_string(),
        DataType::Time if field.min_length > 4 => "120000".to_string(),
        DataType::Time => "1200".to_string(),
    }
}
