//! Structural matching
//!
//! Places each segment in the grammar tree. The matcher keeps a stack of
//! open frames, one per loop iteration plus the message root. A frame
//! remembers which of its child rules is current (`cursor`) and how often
//! each child has occurred; rules before the cursor are closed for good.
//!
//! A segment is searched for from the innermost frame outwards. Within a
//! frame the scan starts at the cursor and may pass optional or satisfied
//! rules, but stops at a mandatory rule that has not reached its minimum.
//! Finding a match in an outer frame closes the frames above it; the
//! mandatory rules left unsatisfied in a closed frame are reported there.

use crate::parser::{ParseOptions, ParseStats};
use edi_ir::{Document, DocumentMetadata, Field, Node, NodeType, RawSegment};
use edi_schema::{Grammar, StructuralRule};
use edi_validation::{
    ErrorCollector, ErrorKind, ErrorPosition, FieldValidator, ValidationError, ValidationMode,
};
use std::ops::Range;
use tracing::{debug, trace};

/// An open window of sibling rules
struct Frame<'g> {
    children: &'g [StructuralRule],
    cursor: usize,
    counts: Vec<usize>,
    node: Node,
    path: String,
}

impl<'g> Frame<'g> {
    fn new(children: &'g [StructuralRule], node: Node, path: String) -> Self {
        Self {
            children,
            cursor: 0,
            counts: vec![0; children.len()],
            node,
            path,
        }
    }
}

enum Search {
    Found { depth: usize, index: usize },
    /// `exhausted` names the first rule that matched but was at its maximum
    NotFound { exhausted: Option<(usize, usize)> },
}

pub(crate) struct Matcher<'g> {
    grammar: &'g Grammar,
    validator: FieldValidator,
    options: ParseOptions,
    stack: Vec<Frame<'g>>,
    stats: ParseStats,
}

impl<'g> Matcher<'g> {
    pub(crate) fn new(grammar: &'g Grammar, validator: FieldValidator, options: ParseOptions) -> Self {
        let root = Frame::new(
            &grammar.structure,
            Node::root(&grammar.message_type),
            grammar.message_type.clone(),
        );

        Self {
            grammar,
            validator,
            options,
            stack: vec![root],
            stats: ParseStats::default(),
        }
    }

    /// Match all segments and build the document
    pub(crate) fn run(
        mut self,
        segments: &[RawSegment],
        collector: &mut ErrorCollector,
    ) -> (Document, ParseStats) {
        self.stats.segments_total = segments.len();

        for segment in segments {
            self.feed(segment, collector);
        }

        let end = ErrorPosition::end_of_input(segments.len());
        while self.stack.len() > 1 {
            self.close_frame(&end, collector);
        }
        let root = self
            .close_frame(&end, collector)
            .unwrap_or_else(|| Node::root(&self.grammar.message_type));

        let metadata = DocumentMetadata {
            source: None,
            message_type: Some(self.grammar.message_type.clone()),
            version: Some(self.grammar.version.clone()),
        };

        (Document::with_metadata(root, metadata), self.stats)
    }

    fn feed(&mut self, segment: &RawSegment, collector: &mut ErrorCollector) {
        let search = match self.search(segment, false) {
            Search::NotFound { .. } if self.options.skip_missing_mandatory => {
                self.search(segment, true)
            }
            found => found,
        };

        match search {
            Search::Found { depth, index } => self.place(segment, depth, index, collector),
            Search::NotFound { exhausted } => self.skip(segment, exhausted, collector),
        }
    }

    /// Find the frame and rule that take `segment`, innermost frame first
    ///
    /// With `recover` set, unsatisfied mandatory rules do not stop the scan.
    fn search(&self, segment: &RawSegment, recover: bool) -> Search {
        let mut exhausted = None;

        for depth in (0..self.stack.len()).rev() {
            let frame = &self.stack[depth];
            for index in frame.cursor..frame.children.len() {
                let rule = &frame.children[index];
                let count = frame.counts[index];

                if rule.matches(segment) {
                    if rule.allows_another(count) {
                        return Search::Found { depth, index };
                    }
                    exhausted.get_or_insert((depth, index));
                }

                if count < rule.min_occurs && !recover {
                    break;
                }
            }
        }

        Search::NotFound { exhausted }
    }

    fn place(
        &mut self,
        segment: &RawSegment,
        depth: usize,
        index: usize,
        collector: &mut ErrorCollector,
    ) {
        let at = ErrorPosition::segment(segment);
        while self.stack.len() > depth + 1 {
            self.close_frame(&at, collector);
        }

        // Only non-empty under recovery: rules passed over on the way.
        let cursor = self.stack[depth].cursor;
        report_missing(&self.stack[depth], cursor..index, &at, collector);

        let frame = &mut self.stack[depth];
        let children = frame.children;
        let rule = &children[index];
        let occurrence = frame.counts[index];
        frame.cursor = index;
        frame.counts[index] += 1;
        let path = node_path(&frame.path, rule, occurrence);

        let fields = self.validator.validate_segment(
            segment,
            self.grammar.rule_for(&segment.code),
            &path,
            collector,
        );

        let node_type = if rule.is_loop() {
            NodeType::Loop
        } else {
            NodeType::Segment
        };
        let mut node = Node::segment(&rule.name, &segment.code, node_type, occurrence)
            .at(segment.index, segment.position)
            .with_fields(fields);
        node.is_valid = !node.fields.iter().any(Field::has_violation);

        self.stats.segments_consumed += 1;
        trace!(index = segment.index, code = %segment.code, path = %path, "segment placed");

        if rule.is_loop() {
            self.stack.push(Frame::new(&rule.children, node, path));
        } else if node.is_valid || self.keeps_invalid_nodes() {
            self.stack[depth].node.add_child(node);
        } else {
            debug!(index = segment.index, path = %path, "omitting invalid segment");
        }
    }

    fn skip(
        &mut self,
        segment: &RawSegment,
        exhausted: Option<(usize, usize)>,
        collector: &mut ErrorCollector,
    ) {
        let at = ErrorPosition::segment(segment);

        let error = match exhausted {
            Some((depth, index)) => {
                let frame = &self.stack[depth];
                let rule = &frame.children[index];
                ValidationError::new(
                    ErrorKind::MaxOccurrenceExceeded,
                    at,
                    format!(
                        "segment {} occurs more often than allowed by {rule}",
                        segment.code
                    ),
                )
                .at_path(format!("{}/{}", frame.path, rule.name))
                .with_expected(rule.max_occurs.map_or_else(|| "unbounded".to_string(), |m| m.to_string()))
                .with_actual((frame.counts[index] + 1).to_string())
            }
            None => {
                let path = self.stack.last().map_or("", |f| f.path.as_str());
                ValidationError::new(
                    ErrorKind::UnmatchedSegment,
                    at,
                    format!("segment {} is not expected here", segment.code),
                )
                .at_path(format!("{path}/{}", segment.code))
            }
        };

        debug!(index = segment.index, code = %segment.code, kind = %error.kind, "segment skipped");
        collector.record(error.with_value(segment.code.clone()));
        self.stats.segments_skipped += 1;
    }

    /// Pop the innermost frame, attaching its node to the parent
    ///
    /// Returns the node when the popped frame was the root.
    fn close_frame(&mut self, at: &ErrorPosition, collector: &mut ErrorCollector) -> Option<Node> {
        let frame = self.stack.pop()?;
        report_missing(&frame, frame.cursor..frame.children.len(), at, collector);

        match self.stack.last_mut() {
            Some(parent) => {
                parent.node.add_child(frame.node);
                None
            }
            None => Some(frame.node),
        }
    }

    fn keeps_invalid_nodes(&self) -> bool {
        self.options.include_invalid_nodes || self.options.mode == ValidationMode::Strict
    }
}

fn report_missing(
    frame: &Frame<'_>,
    range: Range<usize>,
    at: &ErrorPosition,
    collector: &mut ErrorCollector,
) {
    let rules = &frame.children[range.clone()];
    for (rule, &count) in rules.iter().zip(&frame.counts[range]) {
        if count < rule.min_occurs {
            collector.record(
                ValidationError::new(
                    ErrorKind::MissingMandatorySegment,
                    at.clone(),
                    format!("mandatory segment {} ({}) is missing", rule.name, rule.code),
                )
                .at_path(format!("{}/{}", frame.path, rule.name))
                .with_expected(format!("at least {}", rule.min_occurs))
                .with_actual(count.to_string()),
            );
        }
    }
}

/// Occurrence indexes are shown for loops and repeatable segments
fn node_path(parent: &str, rule: &StructuralRule, occurrence: usize) -> String {
    if rule.is_loop() || rule.max_occurs != Some(1) {
        format!("{parent}/{}[{occurrence}]", rule.name)
    } else {
        format!("{parent}/{}", rule.name)
    }
}
