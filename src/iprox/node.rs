//! Normalized form of the IPROX document tree.
//!
//! The raw export is JSON whose grammar is
//! `{Nam, payload-fields..., cluster: [child...] | child, veld: entry | [entry...]}`
//! recursively: `cluster` and `veld` are an object for a single element and
//! an array otherwise. That shape ambiguity is resolved here, once, at
//! parse time; the walker and the scrapers only ever see the explicit
//! variants below.

use serde_json::Value;

/// One node of an IPROX document.
///
/// A node is terminal when it carries a `veld` payload, interior when it
/// carries a `cluster` of children. Nodes with neither are structural
/// leftovers and carry nothing worth harvesting.
#[derive(Debug, Clone, PartialEq)]
pub enum IproxNode {
    /// Terminal node: tag plus its payload entries.
    Leaf { tag: String, fields: Vec<Value> },
    /// Interior node: tag plus child nodes, in document order.
    Branch { tag: String, children: Vec<IproxNode> },
    /// A bare sequence of sibling nodes (the top-level `cluster` shape).
    Sequence(Vec<IproxNode>),
    /// Tagged node without payload or children.
    Empty { tag: String },
}

impl IproxNode {
    /// Normalize a decoded JSON value into a node tree.
    ///
    /// Malformed input never fails: missing tags become empty strings,
    /// non-object scalars where a node was expected become tagless
    /// `Empty` nodes and fall out of every later match.
    pub fn from_value(value: &Value) -> IproxNode {
        match value {
            Value::Array(items) => {
                IproxNode::Sequence(items.iter().map(IproxNode::from_value).collect())
            }
            Value::Object(map) => {
                let tag = map
                    .get("Nam")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                if let Some(veld) = map.get("veld") {
                    IproxNode::Leaf { tag, fields: normalize_entries(veld) }
                } else if let Some(cluster) = map.get("cluster") {
                    let children = match cluster {
                        Value::Array(items) => {
                            items.iter().map(IproxNode::from_value).collect()
                        }
                        single => vec![IproxNode::from_value(single)],
                    };
                    IproxNode::Branch { tag, children }
                } else {
                    IproxNode::Empty { tag }
                }
            }
            _ => IproxNode::Empty { tag: String::new() },
        }
    }

    /// The node's tag, empty for bare sequences.
    pub fn tag(&self) -> &str {
        match self {
            IproxNode::Leaf { tag, .. }
            | IproxNode::Branch { tag, .. }
            | IproxNode::Empty { tag } => tag,
            IproxNode::Sequence(_) => "",
        }
    }
}

/// Flatten a `veld` value into its entry list (singleton object → one entry).
fn normalize_entries(veld: &Value) -> Vec<Value> {
    match veld {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    }
}
