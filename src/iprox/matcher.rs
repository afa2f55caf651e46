//! Recursive target-tag filter over an IPROX tree.
//!
//! The walk carries no knowledge of field names; callers supply the tag
//! vocabulary they care about and get back the matching payloads in
//! document order.
//!
//! A node whose tag is not in the target set is skipped together with its
//! entire subtree, even when a descendant's tag would have matched. The
//! scrapers' target lists include interior tags (`Blok`, `Lijst`, `Meta`,
//! ...) precisely so the walk can pass through them. Do not "fix" this
//! without checking every downstream vocabulary.

use serde_json::Value;

use super::node::IproxNode;

/// A harvested payload: the matched leaf's tag and its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub tag: String,
    pub fields: Vec<Value>,
}

impl Extracted {
    /// Iterate entries that are JSON objects (anything else is noise).
    pub fn entries(&self) -> impl Iterator<Item = &serde_json::Map<String, Value>> {
        self.fields.iter().filter_map(Value::as_object)
    }
}

/// Collect every targeted leaf payload under `node`, in document order.
pub fn filter(node: &IproxNode, targets: &[&str]) -> Vec<Extracted> {
    let mut result = Vec::new();
    walk(node, targets, &mut result);
    result
}

fn walk(node: &IproxNode, targets: &[&str], result: &mut Vec<Extracted>) {
    match node {
        IproxNode::Sequence(items) => {
            // Siblings are tested independently; one miss never hides the next.
            for item in items {
                walk(item, targets, result);
            }
        }
        IproxNode::Leaf { tag, fields } => {
            if targets.contains(&tag.as_str()) {
                result.push(Extracted { tag: tag.clone(), fields: fields.clone() });
            }
        }
        IproxNode::Branch { tag, children } => {
            if targets.contains(&tag.as_str()) {
                for child in children {
                    walk(child, targets, result);
                }
            }
        }
        IproxNode::Empty { .. } => {}
    }
}
