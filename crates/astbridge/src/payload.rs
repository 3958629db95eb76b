//! Decoded parser output.
//!
//! The parser prints one JSON record on success:
//!
//! ```json
//! {
//!   "tree": {"kind": 9000, "children": [0, {"kind": 9002, "children": [1, 2]}]},
//!   "stream": [
//!     {"kind": 1, "value": "<?php ", "offset": 0},
//!     {"kind": 3, "value": "$x", "offset": 6},
//!     {"kind": 4, "value": ";", "offset": 8}
//!   ]
//! }
//! ```
//!
//! Decoding only checks the shape of the record. Whether indexes, kinds and
//! offsets make sense is checked when the [`SyntaxTree`](crate::SyntaxTree) is
//! built, and a child that is neither an index nor a node record is kept as
//! [`ChildRef::Invalid`] so that it is reported as a malformed tree rather
//! than a decoding failure.
//!
//! Real trees nest deeply (long concatenation chains, nested closures), so
//! the JSON is read without a recursion limit on a growable stack and the
//! node records are assembled without recursion.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One parse of one source text, as reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    /// The root node.
    pub tree: NodeRecord,
    /// Every token of the source, in source order.
    pub stream: Vec<TokenRecord>,
}

#[derive(Deserialize)]
struct RawParseResult {
    tree: Value,
    stream: Vec<TokenRecord>,
}

impl ParseResult {
    /// Decode the parser's stdout.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the bytes are not a record with `tree` and
    /// `stream` fields of the expected shape.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        deserializer.disable_recursion_limit();
        let raw = RawParseResult::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;

        let tree = NodeRecord::from_value(raw.tree).map_err(|_| {
            serde_json::Error::custom("`tree` is not a node record with a numeric `kind`")
        })?;
        Ok(Self {
            tree,
            stream: raw.stream,
        })
    }
}

/// A node of the nested tree description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Raw node kind id.
    pub kind: u32,
    /// Children in document order.
    pub children: Vec<ChildRef>,
}

impl NodeRecord {
    /// Create a node record.
    #[must_use]
    pub fn new(kind: u32, children: Vec<ChildRef>) -> Self {
        Self { kind, children }
    }

    /// Assemble a record and all of its descendants from decoded JSON.
    ///
    /// Hands the value back if it is not a node record itself.
    fn from_value(value: Value) -> Result<Self, Value> {
        let mut current = OpenRecord::new(value)?;
        let mut ancestors = Vec::new();

        loop {
            if let Some(child) = current.rest.next() {
                match ChildRef::from_value(child) {
                    Ok(child) => current.children.push(child),
                    Err(nested) => ancestors.push(std::mem::replace(&mut current, nested)),
                }
                continue;
            }

            let record = Self::new(current.kind, std::mem::take(&mut current.children));
            let Some(parent) = ancestors.pop() else {
                return Ok(record);
            };
            current = parent;
            current.children.push(ChildRef::Node(record));
        }
    }
}

/// A node record whose children are still being assembled.
struct OpenRecord {
    kind: u32,
    rest: std::vec::IntoIter<Value>,
    children: Vec<ChildRef>,
}

impl OpenRecord {
    fn new(value: Value) -> Result<Self, Value> {
        let Value::Object(mut fields) = value else {
            return Err(value);
        };
        let Some(kind) = fields
            .get("kind")
            .and_then(Value::as_u64)
            .and_then(|kind| u32::try_from(kind).ok())
        else {
            return Err(Value::Object(fields));
        };

        let rest = match fields.remove("children") {
            None => Vec::new(),
            Some(Value::Array(children)) => children,
            Some(other) => return Err(restore(fields, other)),
        };
        Ok(Self {
            kind,
            children: Vec::with_capacity(rest.len()),
            rest: rest.into_iter(),
        })
    }
}

fn restore(mut fields: Map<String, Value>, children: Value) -> Value {
    fields.insert("children".to_string(), children);
    Value::Object(fields)
}

/// A child reference inside a [`NodeRecord`].
///
/// Anything that is neither an index nor a node record ends up as
/// [`ChildRef::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
    /// Index into the token stream.
    Token(usize),
    /// A nested node.
    Node(NodeRecord),
    /// Anything else the parser put in a children list.
    Invalid(Value),
}

impl ChildRef {
    /// Classify one entry of a children list. Node records come back open so
    /// the caller can assemble them without recursing.
    fn from_value(value: Value) -> Result<Self, OpenRecord> {
        if let Some(index) = value.as_u64().and_then(|index| usize::try_from(index).ok()) {
            return Ok(Self::Token(index));
        }
        if !value.is_object() {
            return Ok(Self::Invalid(value));
        }
        match OpenRecord::new(value) {
            Ok(open) => Err(open),
            Err(value) => Ok(Self::Invalid(value)),
        }
    }
}

/// A token of the flat token stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenRecord {
    /// Raw token kind id.
    pub kind: u32,
    /// Literal token text.
    pub value: String,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

impl TokenRecord {
    /// Create a token record.
    #[must_use]
    pub fn new(kind: u32, value: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_nested_tree_and_stream() {
        let json = br#"{
            "tree": {"kind": 9000, "children": [0, {"kind": 9002, "children": [1]}]},
            "stream": [
                {"kind": 1, "value": "<?php ", "offset": 0},
                {"kind": 3, "value": "$x", "offset": 6}
            ]
        }"#;

        let result = ParseResult::from_json(json).expect("valid payload");

        assert_eq!(result.stream.len(), 2);
        assert_eq!(result.stream[1], TokenRecord::new(3, "$x", 6));
        assert_eq!(
            result.tree,
            NodeRecord::new(
                9000,
                vec![
                    ChildRef::Token(0),
                    ChildRef::Node(NodeRecord::new(9002, vec![ChildRef::Token(1)]))
                ]
            )
        );
    }

    #[test]
    fn missing_children_means_no_children() {
        let result = ParseResult::from_json(br#"{"tree": {"kind": 1}, "stream": []}"#)
            .expect("valid payload");
        assert!(result.tree.children.is_empty());
    }

    #[test]
    fn unexpected_child_shapes_are_kept_as_invalid() {
        let json = br#"{"tree": {"kind": 1, "children": [-1, "x", null, [1, 2], 2.5]}, "stream": []}"#;

        let result = ParseResult::from_json(json).expect("shape is still a record");

        assert_eq!(
            result.tree.children,
            vec![
                ChildRef::Invalid(json!(-1)),
                ChildRef::Invalid(json!("x")),
                ChildRef::Invalid(Value::Null),
                ChildRef::Invalid(json!([1, 2])),
                ChildRef::Invalid(json!(2.5)),
            ]
        );
    }

    #[test]
    fn missing_stream_is_a_decode_error() {
        assert!(ParseResult::from_json(br#"{"tree": {"kind": 1}}"#).is_err());
    }

    #[test]
    fn truncated_output_is_a_decode_error() {
        assert!(ParseResult::from_json(br#"{"tree": {"kind": 1, "children": [0"#).is_err());
    }

    #[test]
    fn nested_record_without_kind_is_kept_as_invalid() {
        let json = br#"{"tree": {"kind": 1, "children": [{"children": []}]}, "stream": []}"#;

        let result = ParseResult::from_json(json).expect("shape is still a record");

        assert_eq!(
            result.tree.children,
            vec![ChildRef::Invalid(json!({"children": []}))]
        );
    }

    #[test]
    fn root_without_kind_is_a_decode_error() {
        assert!(ParseResult::from_json(br#"{"tree": {"children": []}, "stream": []}"#).is_err());
    }

    #[test]
    fn deeply_nested_tree_decodes() {
        let depth = 2_000;
        let json = format!(
            r#"{{"tree": {}0{}, "stream": []}}"#,
            r#"{"kind": 7, "children": ["#.repeat(depth),
            "]}".repeat(depth)
        );

        let result = ParseResult::from_json(json.as_bytes()).expect("deep payload");

        let mut depth_seen = 1;
        let mut node = &result.tree;
        while let [ChildRef::Node(child)] = node.children.as_slice() {
            depth_seen += 1;
            node = child;
        }
        assert_eq!(depth_seen, depth);
        assert_eq!(node.children, vec![ChildRef::Token(0)]);
    }

    #[test]
    fn trailing_garbage_is_a_decode_error() {
        assert!(ParseResult::from_json(br#"{"tree": {"kind": 1}, "stream": []} x"#).is_err());
    }
}
