//! Arbo - reusable AST infrastructure for parser toolkits
//!
//! # Overview
//!
//! Arbo provides the tree half of a parser toolkit: a typed AST data model
//! and a generic mechanism for walking, querying and rewriting that tree
//! without every algorithm hard-coding the full set of node types. It is
//! not a parser: parsers (typically generated) produce Arbo trees, and
//! printers, serializers and analyses consume them.
//!
//! Common use cases include:
//!
//! - Generated node classes for a grammar, sharing one traversal surface
//! - Analyses and rewrites written as visitors over that surface
//! - Structural comparison of trees with precise difference reporting
//! - Exact-text reconstruction via per-node round-trip data
//!
//! # Quick Start
//!
//! ```
//! use arbo::{compare, NodeList, TextNode};
//!
//! // Variable-arity lists normalize themselves: adjacent plain text
//! // merges, nested lists flatten.
//! let mut list = NodeList::new();
//! list.push(Box::new(TextNode::new("hello ")));
//! list.push(Box::new(TextNode::new("world")));
//! assert_eq!(list.len(), 1);
//!
//! let mut same = NodeList::new();
//! same.push(Box::new(TextNode::new("hello world")));
//! assert!(compare(&list, &same));
//! ```
//!
//! # Visitors
//!
//! A visitor declares handlers for the node types it cares about; the
//! dispatcher resolves the most specific one for each node's runtime type
//! through the supertype graph, with results memoized in a shared bounded
//! cache. See [`visit`](arbo_core::visit) for the single-visitor protocol,
//! [`VisitorStack`] for running several visitors in one pass, and the
//! `Dispatcher::map_in_place` family for tree rewriting.

// Re-export public API from arbo_core
pub use arbo_core::{
    builtin, deep_compare, node_downcast, node_downcast_ref, replace_fixed_child,
    structural_hash, visitor_downcast, Action, AttrMap, ChainCache, Children, Difference,
    DifferenceKind, DispatchCache, Dispatcher, Flow, HandlerEntry, HandlerFn, Location, Node,
    NodeBase, NodeKind, NodeList, NodeRef, NodeType, NodeTypeId, RtData, RtField, RtFragment,
    TextNode, TreeError, Value, VisitError, Visitor, VisitorStack,
};

// `compare` is both the module and its main entry point
pub use arbo_core::compare;

// Module-level access for qualified paths
pub use arbo_core::{attr, location, node, rtdata, visit};
