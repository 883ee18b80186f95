//! arbo-core - reusable AST infrastructure for parser toolkits.
//!
//! The crate pairs two tightly coupled subsystems:
//!
//! - **The tree data model** ([`node`], [`attr`], [`location`],
//!   [`rtdata`]): typed nodes with fixed- or variable-arity children,
//!   sparse per-instance attributes, fixed per-type reflectable
//!   properties, optional source locations and optional round-trip glue.
//!   Variable-arity lists normalize themselves: no nested lists, no
//!   absent elements, no fragmented runs of text.
//! - **The visitor dispatch engine** ([`visit`]): runtime,
//!   type-hierarchy-directed handler resolution with a shared bounded
//!   cache, single-visitor and stacked multi-visitor invocation
//!   protocols, and the in-place tree rewrite protocol.
//!
//! [`compare`] adds structural comparers over the data model: a boolean
//! check and a diagnostic first-difference walk.
//!
//! This crate deliberately stops at the tree: it does not parse source
//! text, print trees or serialize them. Parsers, printers and serializers
//! are collaborators consuming the read-only traversal surface.

pub mod attr;
pub mod compare;
pub mod location;
pub mod node;
pub mod rtdata;
pub mod visit;

pub use attr::{AttrMap, Value};
pub use compare::{compare, deep_compare, structural_hash, Difference, DifferenceKind};
pub use location::Location;
pub use node::{
    builtin, replace_fixed_child, Children, Node, NodeBase, NodeKind, NodeList, NodeRef,
    NodeType, NodeTypeId, TextNode, TreeError,
};
pub use rtdata::{RtData, RtField, RtFragment};
pub use visit::{
    node_downcast, node_downcast_ref, visitor_downcast, Action, ChainCache, DispatchCache,
    Dispatcher, Flow, HandlerEntry, HandlerFn, VisitError, Visitor, VisitorStack,
};
