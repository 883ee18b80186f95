//! Structural tree comparison.
//!
//! Two comparers share one definition of structural equality: same node
//! type, same properties in iterator order, same attributes, structurally
//! equal children; object identity, locations and round-trip data are
//! ignored by [`compare`], and round-trip data also by [`deep_compare`]:
//!
//! - [`compare`] answers with a bare boolean.
//! - [`deep_compare`] walks both trees in parallel, like the shallow
//!   comparer, but reports the *first* difference it finds as a typed
//!   [`Difference`] carrying a reason code and the two offending values.
//!   A returned `Difference` is the normal "trees differ" channel, not an
//!   unexpected failure.

use core::fmt;
use core::hash::{Hash, Hasher};

use ecow::EcoString;
use thiserror::Error;

use crate::node::Node;

/// Shallow comparison: true when the two trees are structurally equal.
pub fn compare(a: &dyn Node, b: &dyn Node) -> bool {
    if !a.node_type().is(b.node_type()) {
        return false;
    }
    for index in 0..a.property_count() {
        if a.property(index) != b.property(index) {
            return false;
        }
    }
    if !attributes_eq(a, b) {
        return false;
    }
    if a.size() != b.size() {
        return false;
    }
    a.children()
        .zip(b.children())
        .all(|(left, right)| compare(left, right))
}

/// Structural hash consistent with [`compare`]: equal trees hash equally.
pub fn structural_hash<H: Hasher>(node: &dyn Node, state: &mut H) {
    node.node_type().kind.hash(state);
    node.node_type().name.hash(state);
    state.write_usize(node.property_count());
    for index in 0..node.property_count() {
        node.property(index).hash(state);
    }
    match node.attributes() {
        Some(attrs) if !attrs.is_empty() => attrs.hash(state),
        _ => state.write_u8(0),
    }
    state.write_usize(node.size());
    for child in node.children() {
        structural_hash(child, state);
    }
}

/// Deep comparison reporting the first difference found.
///
/// Unlike [`compare`], mismatching locations count as a difference here;
/// the deep comparer exists for diagnostics, and "same tree parsed from a
/// different place" is worth reporting.
pub fn deep_compare(a: &dyn Node, b: &dyn Node) -> Result<(), Difference> {
    if !a.node_type().is(b.node_type()) {
        return Err(Difference::of(DifferenceKind::NodeType, a, b));
    }
    deep_compare_matched(a, b)
}

// Both roots are known to share a node type.
fn deep_compare_matched(a: &dyn Node, b: &dyn Node) -> Result<(), Difference> {
    if a.location() != b.location() {
        return Err(Difference {
            kind: DifferenceKind::Location,
            left: render_location(a),
            right: render_location(b),
        });
    }
    if a.size() != b.size() {
        return Err(Difference {
            kind: DifferenceKind::ChildCount,
            left: format!("{} with {} children", a.node_type(), a.size()),
            right: format!("{} with {} children", b.node_type(), b.size()),
        });
    }
    for index in 0..a.property_count() {
        let left = a.property(index);
        let right = b.property(index);
        if left != right {
            return Err(Difference {
                kind: DifferenceKind::Property {
                    name: a.property_name(index).unwrap_or("?"),
                },
                left: render_value(&left),
                right: render_value(&right),
            });
        }
    }
    if let Some(name) = first_attribute_difference(a, b) {
        return Err(Difference {
            kind: DifferenceKind::Attribute {
                name: name.to_string(),
            },
            left: render_value(&a.attribute(&name).cloned()),
            right: render_value(&b.attribute(&name).cloned()),
        });
    }
    for index in 0..a.size() {
        let (Some(left), Some(right)) = (a.child(index), b.child(index)) else {
            break;
        };
        if !left.node_type().is(right.node_type()) {
            return Err(Difference::of(DifferenceKind::Children { index }, left, right));
        }
        deep_compare_matched(left, right)?;
    }
    Ok(())
}

fn attributes_eq(a: &dyn Node, b: &dyn Node) -> bool {
    // An absent table and an empty one are the same thing.
    match (a.attributes(), b.attributes()) {
        (None, None) => true,
        (Some(attrs), None) | (None, Some(attrs)) => attrs.is_empty(),
        (Some(left), Some(right)) => left == right,
    }
}

/// First attribute name (in sorted order) whose values disagree.
fn first_attribute_difference(a: &dyn Node, b: &dyn Node) -> Option<EcoString> {
    let mut names: Vec<&EcoString> = Vec::new();
    if let Some(attrs) = a.attributes() {
        names.extend(attrs.sorted_names());
    }
    if let Some(attrs) = b.attributes() {
        names.extend(attrs.sorted_names());
    }
    names.sort();
    names.dedup();
    names
        .into_iter()
        .find(|name| a.attribute(name.as_str()) != b.attribute(name.as_str()))
        .cloned()
}

fn render_location(node: &dyn Node) -> String {
    match node.location() {
        Some(location) => location.to_string(),
        None => "<no location>".to_owned(),
    }
}

fn render_value(value: &Option<crate::attr::Value>) -> String {
    match value {
        Some(value) => format!("{} `{}`", value.type_name(), value),
        None => "<absent>".to_owned(),
    }
}

/// The first difference found by [`deep_compare`]: a reason code plus the
/// two offending values rendered for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: left is {left}, right is {right}")]
pub struct Difference {
    pub kind: DifferenceKind,
    pub left: String,
    pub right: String,
}

impl Difference {
    fn of(kind: DifferenceKind, a: &dyn Node, b: &dyn Node) -> Self {
        Self {
            kind,
            left: format!("{} {:?}", a.node_type(), a),
            right: format!("{} {:?}", b.node_type(), b),
        }
    }
}

/// Reason code of a [`Difference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DifferenceKind {
    /// The locations of two matched nodes differ.
    Location,
    /// The two roots have different node types.
    NodeType,
    /// Two matched nodes disagree on their number of children.
    ChildCount,
    /// A property value differs.
    Property { name: &'static str },
    /// An attribute is absent on one side or differs in value.
    Attribute { name: String },
    /// The children at `index` have different node types.
    Children { index: usize },
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifferenceKind::Location => write!(f, "locations differ"),
            DifferenceKind::NodeType => write!(f, "node types differ"),
            DifferenceKind::ChildCount => write!(f, "child counts differ"),
            DifferenceKind::Property { name } => write!(f, "property `{}` differs", name),
            DifferenceKind::Attribute { name } => write!(f, "attribute `{}` differs", name),
            DifferenceKind::Children { index } => write!(f, "children at index {} differ", index),
        }
    }
}
