//! The tree data model: node types, the `Node` trait and common node state.
//!
//! Concrete node types are normally emitted by a node-class generator; this
//! module defines the contract those types satisfy. A concrete type declares
//! a static [`NodeType`] descriptor (its kind tag, name, supertypes and
//! fixed child-slot names), embeds a [`NodeBase`] for the per-instance state
//! shared by every node (location, attributes, round-trip data), and
//! implements [`Node`] for its children and properties.
//!
//! Two node shapes exist: fixed arity (a handful of named child slots, each
//! always holding exactly one node) and variable arity ([`NodeList`]). The
//! arity classification of a node never changes during its lifetime.

use core::any::Any;
use core::fmt::{self, Debug};
use core::hash::{Hash, Hasher};

use thiserror::Error;

use crate::attr::{AttrMap, Value};
use crate::location::Location;
use crate::rtdata::RtData;

mod list;
mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use list::NodeList;
pub use text::TextNode;

/// Integer tag identifying a concrete node type.
///
/// Kind tags are stable and programmer-assigned; they exist for fast checks
/// ("is this a list", "is this text") without full type identity. Tags below
/// [`builtin::USER_KIND_BASE`] are reserved for the built-in types.
pub type NodeKind = u16;

/// Static descriptor of a concrete (or abstract) node type.
///
/// Descriptors are declared as `static` items and identified by address:
/// two `&'static NodeType` values denote the same type exactly when they
/// point at the same static. `supertypes` lists the direct supertypes in
/// resolution order (superclass first, then interfaces) and drives the
/// breadth-first handler search of the dispatch engine. Abstract types
/// (never instantiated, only dispatched on) are declared the same way with
/// an empty `child_names`.
#[derive(Debug)]
pub struct NodeType {
    pub name: &'static str,
    pub kind: NodeKind,
    pub supertypes: &'static [&'static NodeType],
    pub child_names: &'static [&'static str],
}

impl NodeType {
    /// Address-based identity, usable as a map key.
    pub fn id(&'static self) -> NodeTypeId {
        NodeTypeId(self as *const NodeType as usize)
    }

    /// True when `self` and `other` are the same descriptor.
    pub fn is(&'static self, other: &'static NodeType) -> bool {
        core::ptr::eq(self, other)
    }

    /// Reflexive reachability through the supertype graph.
    pub fn is_subtype_of(&'static self, other: &'static NodeType) -> bool {
        if self.is(other) {
            return true;
        }
        self.supertypes.iter().any(|sup| sup.is_subtype_of(other))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for NodeType {}

impl Hash for NodeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const NodeType as usize).hash(state);
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Opaque identity of a [`NodeType`], derived from its static address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTypeId(usize);

/// Built-in node type descriptors and their reserved kind tags.
pub mod builtin {
    use super::{NodeKind, NodeType};

    pub const NODE_KIND: NodeKind = 0;
    pub const LIST_KIND: NodeKind = 1;
    pub const STRING_KIND: NodeKind = 2;
    pub const TEXT_KIND: NodeKind = 3;

    /// First kind tag available to generated node types.
    pub const USER_KIND_BASE: NodeKind = 16;

    /// Root of the supertype graph; a handler for `NODE` catches every node.
    pub static NODE: NodeType = NodeType {
        name: "Node",
        kind: NODE_KIND,
        supertypes: &[],
        child_names: &[],
    };

    /// Variable-arity node type.
    pub static LIST: NodeType = NodeType {
        name: "NodeList",
        kind: LIST_KIND,
        supertypes: &[&NODE],
        child_names: &[],
    };

    /// Abstract string-content family.
    pub static STRING: NodeType = NodeType {
        name: "String",
        kind: STRING_KIND,
        supertypes: &[&NODE],
        child_names: &[],
    };

    /// Concrete text leaf.
    pub static TEXT: NodeType = NodeType {
        name: "Text",
        kind: TEXT_KIND,
        supertypes: &[&STRING],
        child_names: &[],
    };
}

/// Owned handle to a tree node.
///
/// Ownership is strictly hierarchical: a child belongs to exactly one parent
/// at a time, and moving a subtree between parents means removing it from
/// the old parent first. Absent children are unrepresentable.
pub type NodeRef = Box<dyn Node>;

/// Per-instance state shared by every node: optional source location, the
/// lazily created attribute table and optional round-trip data.
#[derive(Debug, Default)]
pub struct NodeBase {
    location: Option<Location>,
    attributes: Option<Box<AttrMap>>,
    rt_data: Option<Box<RtData>>,
}

impl NodeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    pub fn attributes(&self) -> Option<&AttrMap> {
        self.attributes.as_deref()
    }

    /// The attribute table, created on first use.
    pub fn attributes_mut(&mut self) -> &mut AttrMap {
        self.attributes.get_or_insert_with(Box::default)
    }

    pub fn has_attributes(&self) -> bool {
        self.attributes.as_ref().is_some_and(|attrs| !attrs.is_empty())
    }

    pub fn rt_data(&self) -> Option<&RtData> {
        self.rt_data.as_deref()
    }

    pub fn rt_data_mut(&mut self) -> Option<&mut RtData> {
        self.rt_data.as_deref_mut()
    }

    pub fn set_rt_data(&mut self, rt_data: RtData) {
        self.rt_data = Some(Box::new(rt_data));
    }

    pub fn take_rt_data(&mut self) -> Option<RtData> {
        self.rt_data.take().map(|boxed| *boxed)
    }
}

/// A tree node.
///
/// The children surface is uniform over both node shapes: `size`,
/// `child(i)`, `child_mut(i)` and `set_child(i, node)` (which returns the
/// node previously in that position). Fixed-arity implementations use
/// [`replace_fixed_child`] in `set_child` so a list value is rejected with
/// [`TreeError::WrongArity`]; a fixed slot holds exactly one node, never a
/// flattenable sequence.
///
/// Properties are the fixed, reflectively enumerable typed fields of a node
/// type (distinct from children and from attributes), exposed positionally
/// so generic algorithms (printers, comparers, serializers) can walk any
/// node's fields without per-type code.
pub trait Node: Any + Debug {
    /// Static descriptor of this node's concrete type.
    fn node_type(&self) -> &'static NodeType;

    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    /// Number of children.
    fn size(&self) -> usize {
        0
    }

    fn child(&self, index: usize) -> Option<&dyn Node> {
        let _ = index;
        None
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        let _ = index;
        None
    }

    /// Replaces the child in `index`, returning the previous one.
    fn set_child(&mut self, index: usize, node: NodeRef) -> Result<NodeRef, TreeError> {
        let _ = node;
        Err(TreeError::IndexOutOfBounds {
            node_type: self.node_type().name,
            index,
            len: self.size(),
        })
    }

    /// Whether this node is variable-arity. Immutable for the node's lifetime.
    fn is_list(&self) -> bool {
        false
    }

    /// Names of the fixed child slots; one entry per child, stable per type.
    fn child_names(&self) -> &'static [&'static str] {
        self.node_type().child_names
    }

    fn property_count(&self) -> usize {
        0
    }

    fn property_name(&self, index: usize) -> Option<&'static str> {
        let _ = index;
        None
    }

    fn property(&self, index: usize) -> Option<Value> {
        let _ = index;
        None
    }

    fn set_property(&mut self, index: usize, value: Value) -> Result<(), TreeError> {
        let _ = value;
        Err(TreeError::NoSuchProperty {
            node_type: self.node_type().name,
            index,
        })
    }

    // Shared per-instance state, delegated to the embedded NodeBase.

    fn kind(&self) -> NodeKind {
        self.node_type().kind
    }

    fn location(&self) -> Option<&Location> {
        self.base().location()
    }

    fn set_location(&mut self, location: Location) {
        self.base_mut().set_location(location);
    }

    fn attributes(&self) -> Option<&AttrMap> {
        self.base().attributes()
    }

    fn attributes_mut(&mut self) -> &mut AttrMap {
        self.base_mut().attributes_mut()
    }

    fn has_attributes(&self) -> bool {
        self.base().has_attributes()
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes().and_then(|attrs| attrs.get(name))
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Option<Value> {
        self.attributes_mut().set(name, value)
    }

    fn rt_data(&self) -> Option<&RtData> {
        self.base().rt_data()
    }

    fn rt_data_mut(&mut self) -> Option<&mut RtData> {
        self.base_mut().rt_data_mut()
    }

    fn set_rt_data(&mut self, rt_data: RtData) {
        self.base_mut().set_rt_data(rt_data);
    }

    fn take_rt_data(&mut self) -> Option<RtData> {
        self.base_mut().take_rt_data()
    }
}

impl dyn Node {
    /// Iterates this node's children in slot order.
    pub fn children(&self) -> Children<'_> {
        Children {
            node: self,
            index: 0,
        }
    }

    pub fn is<T: Node>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Node>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut::<T>()
    }
}

/// Iterator over a node's children.
pub struct Children<'a> {
    node: &'a dyn Node,
    index: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a dyn Node;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.node.child(self.index)?;
        self.index += 1;
        Some(child)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.node.size().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Replaces a fixed child slot, rejecting variable-arity values.
///
/// Fixed-arity `Node` implementations call this from `set_child` so the
/// arity check lives in one place.
pub fn replace_fixed_child(
    owner: &'static NodeType,
    slot: usize,
    current: &mut NodeRef,
    replacement: NodeRef,
) -> Result<NodeRef, TreeError> {
    if replacement.is_list() {
        return Err(TreeError::WrongArity {
            node_type: owner.name,
            slot: owner.child_names.get(slot).copied().unwrap_or("?"),
        });
    }
    Ok(core::mem::replace(current, replacement))
}

/// Structural misuse of the tree API. Always a programming error in the
/// caller; never retried and never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("child index {index} is out of range for `{node_type}` with {len} children")]
    IndexOutOfBounds {
        node_type: &'static str,
        index: usize,
        len: usize,
    },

    #[error("a list node cannot occupy the fixed child slot `{slot}` of `{node_type}`")]
    WrongArity {
        node_type: &'static str,
        slot: &'static str,
    },

    #[error("the fixed child slot `{slot}` of `{node_type}` cannot be removed")]
    RemoveFromFixed {
        node_type: &'static str,
        slot: &'static str,
    },

    #[error("`{node_type}` has no property at index {index}")]
    NoSuchProperty {
        node_type: &'static str,
        index: usize,
    },

    #[error("property `{name}` of `{node_type}` holds {expected}, not {given}")]
    PropertyType {
        node_type: &'static str,
        name: &'static str,
        expected: &'static str,
        given: &'static str,
    },
}
