//! Parse tree nodes and field values

use crate::metadata::Position;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A node in the parse tree
///
/// Every node except the root stands for one segment of the input. A loop
/// node carries the fields of the segment that opened the loop iteration and
/// owns the rest of the iteration as children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Loop name when the grammar declares one, otherwise the segment code
    pub name: String,

    /// Segment code (empty for the root)
    pub code: String,

    /// Node type
    pub node_type: NodeType,

    /// 0-based occurrence among siblings instantiated from the same rule
    pub occurrence: usize,

    /// 1-based index of the originating segment in the input
    pub segment_index: Option<usize>,

    /// Source position of the originating segment
    pub position: Option<Position>,

    /// Validated fields of the originating segment
    pub fields: Vec<Field>,

    /// Child nodes, in input order
    pub children: Vec<Node>,

    /// False when a field of the originating segment failed validation
    pub is_valid: bool,
}

/// Types of nodes in the parse tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Synthetic root named after the message type
    Root,

    /// Segment that opened a loop iteration
    Loop,

    /// Segment without nested members
    Segment,
}

/// A validated (or error-flagged) data element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Element code from the grammar (e.g. `0062`, `NM101`)
    pub id: String,

    /// 1-based element or component position
    pub position: usize,

    /// 0-based repetition index
    pub repetition: usize,

    /// Raw value as lexed, empty for composites (see `components`)
    pub raw: String,

    /// Typed value, absent when empty or invalid
    pub value: Option<Value>,

    /// Validation outcome
    pub status: FieldStatus,

    /// Components of a composite element
    pub components: Vec<Field>,
}

/// Outcome of validating one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldStatus {
    /// Valid, or empty and optional
    Ok,
    /// Mandatory but empty
    MissingMandatory,
    /// Characters outside the declared data type
    InvalidDataType,
    /// Shorter or longer than the declared bounds
    LengthViolation,
    /// Present but not declared by the grammar
    Unexpected,
}

/// Typed field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Alphabetic, alphanumeric or identifier value
    Text(String),

    /// Numeric value without decimals
    Integer(i64),

    /// Numeric value with explicit or implied decimals
    Decimal(f64),

    /// Calendar date
    Date(NaiveDate),

    /// Time of day
    Time(NaiveTime),
}

impl Node {
    /// Create the synthetic root node
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: String::new(),
            node_type: NodeType::Root,
            occurrence: 0,
            segment_index: None,
            position: None,
            fields: Vec::new(),
            children: Vec::new(),
            is_valid: true,
        }
    }

    /// Create a node for a segment
    pub fn segment(
        name: impl Into<String>,
        code: impl Into<String>,
        node_type: NodeType,
        occurrence: usize,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            node_type,
            occurrence,
            segment_index: None,
            position: None,
            fields: Vec::new(),
            children: Vec::new(),
            is_valid: true,
        }
    }

    /// Record where the originating segment was found
    #[must_use]
    pub fn at(mut self, segment_index: usize, position: Position) -> Self {
        self.segment_index = Some(segment_index);
        self.position = Some(position);
        self
    }

    /// Attach validated fields
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Find the first child by name
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find all children by name
    #[must_use]
    pub fn find_children(&self, name: &str) -> Vec<&Node> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    /// Get a field by 1-based element position (first repetition)
    #[must_use]
    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.position == position && f.repetition == 0)
    }

    /// Raw value of a simple field, or of a composite's component
    #[must_use]
    pub fn raw_value(&self, element: usize, component: Option<usize>) -> Option<&str> {
        let field = self.field(element)?;
        match component {
            Some(position) => field
                .components
                .iter()
                .find(|c| c.position == position)
                .map(|c| c.raw.as_str()),
            None => Some(field.raw.as_str()),
        }
    }

    /// Number of segment nodes in this subtree, the node itself included
    /// unless it is the root
    #[must_use]
    pub fn segment_count(&self) -> usize {
        let own = usize::from(self.node_type != NodeType::Root);
        own + self.children.iter().map(Node::segment_count).sum::<usize>()
    }
}

impl Field {
    /// Create a field with a raw value and no typed value yet
    pub fn new(id: impl Into<String>, position: usize, raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            repetition: 0,
            raw: raw.into(),
            value: None,
            status: FieldStatus::Ok,
            components: Vec::new(),
        }
    }

    /// Whether the field carries no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.components.iter().all(Field::is_empty)
    }

    /// Whether the field and all its components validated
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == FieldStatus::Ok && self.components.iter().all(Field::is_ok)
    }

    /// Whether the field or one of its components violates its rule
    #[must_use]
    pub fn has_violation(&self) -> bool {
        self.status.is_violation() || self.components.iter().any(Field::has_violation)
    }
}

impl FieldStatus {
    /// Missing, mistyped or mis-sized values; undeclared values are not
    /// violations of a rule
    #[must_use]
    pub fn is_violation(self) -> bool {
        matches!(
            self,
            FieldStatus::MissingMandatory | FieldStatus::InvalidDataType | FieldStatus::LengthViolation
        )
    }
}

impl Value {
    /// Convert value to string
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
        }
    }

    /// Text content, if this is a text value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_loop() -> Node {
        let mut lin = Node::segment("LIN", "LIN", NodeType::Loop, 0)
            .at(4, Position::new(4, 1, 60, 12))
            .with_fields(vec![Field::new("1082", 1, "1")]);
        lin.add_child(Node::segment("QTY", "QTY", NodeType::Segment, 0).at(5, Position::default()));
        lin.add_child(Node::segment("QTY", "QTY", NodeType::Segment, 1).at(6, Position::default()));
        lin
    }

    #[test]
    fn test_root_node() {
        let root = Node::root("ORDERS");
        assert_eq!(root.node_type, NodeType::Root);
        assert!(root.code.is_empty());
        assert!(root.segment_index.is_none());
        assert_eq!(root.segment_count(), 0);
    }

    #[test]
    fn test_find_children() {
        let lin = sample_loop();
        assert_eq!(lin.find_children("QTY").len(), 2);
        assert_eq!(lin.find_child("QTY").map(|n| n.occurrence), Some(0));
        assert!(lin.find_child("PRI").is_none());
    }

    #[test]
    fn test_segment_count() {
        let mut root = Node::root("ORDERS");
        root.add_child(sample_loop());
        assert_eq!(root.segment_count(), 3);
    }

    #[test]
    fn test_raw_value_lookup() {
        let mut composite = Field::new("C212", 3, "");
        composite.components = vec![Field::new("7140", 1, "5412345000013"), Field::new("7143", 2, "EN")];

        let node = Node::segment("LIN", "LIN", NodeType::Loop, 0)
            .with_fields(vec![Field::new("1082", 1, "1"), composite]);

        assert_eq!(node.raw_value(1, None), Some("1"));
        assert_eq!(node.raw_value(3, Some(2)), Some("EN"));
        assert_eq!(node.raw_value(3, Some(3)), None);
        assert_eq!(node.raw_value(2, None), None);
    }

    #[test]
    fn test_field_emptiness_and_status() {
        let mut composite = Field::new("C082", 2, "");
        composite.components = vec![Field::new("3039", 1, ""), Field::new("1131", 2, "")];
        assert!(composite.is_empty());
        assert!(composite.is_ok());

        composite.components[1].status = FieldStatus::LengthViolation;
        assert!(!composite.is_ok());
        assert!(composite.has_violation());

        let mut extra = Field::new("", 9, "X");
        extra.status = FieldStatus::Unexpected;
        assert!(!extra.is_ok());
        assert!(!extra.has_violation());
    }

    #[test]
    fn test_value_as_string() {
        assert_eq!(Value::Integer(42).as_string(), "42");
        assert_eq!(Value::Decimal(1.5).as_string(), "1.5");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).as_string(), "2024-03-09");
        let time = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(Value::Time(time).as_string(), "14:30:00");
        assert_eq!(Value::Text("ABC".into()).as_text(), Some("ABC"));
        assert_eq!(Value::Integer(1).as_text(), None);
    }
}
