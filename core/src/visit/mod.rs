//! The visitor dispatch engine.
//!
//! A [`Visitor`] declares `visit` handlers for the node types it cares
//! about; the [`Dispatcher`] finds the most specific handler for a node's
//! runtime type by searching breadth-first up the node type's supertype
//! graph, memoizing the result in a shared, bounded [`DispatchCache`]. The
//! concrete node type is only known once the tree is built, so resolution
//! happens at runtime, but for a fixed visitor type and node type it is
//! deterministic, cold cache or warm.
//!
//! # Invocation protocol
//!
//! [`Dispatcher::go`] brackets dispatch with the visitor's `before` and
//! `after` hooks: `before` may abort (skipping both the handler and
//! `after`), the resolved handler (or the `not_found` hook) produces an
//! [`Action`], and `after` observes the node and that action. Errors from
//! inside a handler are wrapped exactly once in [`VisitError::Visiting`];
//! an already-wrapped error unwinds through nested dispatches unchanged.
//!
//! # Writing a visitor
//!
//! Handlers are plain functions registered in a static table; they
//! downcast the visitor and node to their concrete types with
//! [`visitor_downcast`] and [`node_downcast`]:
//!
//! ```
//! use arbo_core::node::{builtin, Node, TextNode};
//! use arbo_core::visit::{
//!     visitor_downcast, Action, Dispatcher, HandlerEntry, VisitError, Visitor,
//! };
//!
//! #[derive(Default)]
//! struct CountTexts {
//!     seen: usize,
//! }
//!
//! fn on_text(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
//!     visitor_downcast::<CountTexts>(visitor)?.seen += 1;
//!     Ok(Action::Keep)
//! }
//!
//! impl Visitor for CountTexts {
//!     fn name(&self) -> &'static str {
//!         "CountTexts"
//!     }
//!
//!     fn handlers(&self) -> &'static [HandlerEntry] {
//!         static HANDLERS: [HandlerEntry; 1] = [HandlerEntry {
//!             target: &builtin::TEXT,
//!             run: on_text,
//!         }];
//!         &HANDLERS
//!     }
//! }
//!
//! let mut visitor = CountTexts::default();
//! let mut node = TextNode::new("hi");
//! Dispatcher::new().go(&mut visitor, &mut node).unwrap();
//! assert_eq!(visitor.seen, 1);
//! ```

use core::any::{Any, TypeId};
use std::error::Error as StdError;

use thiserror::Error;

use crate::location::Location;
use crate::node::{Node, NodeType, TreeError};

mod cache;
mod resolve;
mod rewrite;
mod stack;

#[cfg(test)]
mod visit_test;

pub use cache::{DispatchCache, DEFAULT_LOWER_CAPACITY, DEFAULT_UPPER_CAPACITY};
pub use stack::{ChainCache, VisitorStack};

pub(crate) use resolve::{resolve, Resolution};

/// What a handler decided about the node it was invoked on.
///
/// The same sum type drives both the visitor-stack chaining and the
/// in-place rewrite protocol: `Keep` leaves the input untouched, `Replace`
/// substitutes a new value, and `Remove` is the explicit deletion marker.
#[derive(Debug)]
pub enum Action {
    /// The input node stands; nothing to apply.
    Keep,
    /// Replace the input node with this value. During an in-place rewrite
    /// of a list, a list value splices its elements in place.
    Replace(crate::node::NodeRef),
    /// Delete the input node from its owning list.
    Remove,
}

/// Result of a visitor's `before` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Abort,
}

/// Type-erased handler: downcasts its visitor and node internally.
pub type HandlerFn = fn(&mut dyn Visitor, &mut dyn Node) -> Result<Action, VisitError>;

/// One declared handler: the node type it accepts and the function to run.
#[derive(Debug, Clone, Copy)]
pub struct HandlerEntry {
    pub target: &'static NodeType,
    pub run: HandlerFn,
}

/// A tree visitor.
///
/// Implementations declare their handlers in a static table; resolution
/// against a node's runtime type is the dispatcher's job. The `before`,
/// `after` and `not_found` hooks default to: continue, do nothing, and
/// fail with [`VisitError::HandlerNotFound`].
pub trait Visitor: Any {
    /// The visitor's display name, used in error messages.
    fn name(&self) -> &'static str;

    /// The handler table, one entry per handled node type.
    fn handlers(&self) -> &'static [HandlerEntry];

    /// Runs before dispatch; returning [`Flow::Abort`] skips the handler
    /// and the `after` hook for this node.
    fn before(&mut self, node: &dyn Node) -> Flow {
        let _ = node;
        Flow::Continue
    }

    /// Runs after a non-aborted dispatch, observing the produced action.
    fn after(&mut self, node: &dyn Node, action: &Action) {
        let _ = (node, action);
    }

    /// Fallback when no handler exists for the node's type. Override to
    /// supply a default action instead of failing.
    fn not_found(&mut self, node: &mut dyn Node) -> Result<Action, VisitError> {
        Err(VisitError::HandlerNotFound {
            node_type: node.node_type().name,
            visitor: self.name(),
        })
    }
}

/// Downcasts a visitor to its concrete type inside a handler.
pub fn visitor_downcast<V: Visitor>(visitor: &mut dyn Visitor) -> Result<&mut V, VisitError> {
    let name = visitor.name();
    let any: &mut dyn Any = visitor;
    any.downcast_mut::<V>().ok_or(VisitError::VisitorCast {
        visitor: name,
        expected: core::any::type_name::<V>(),
    })
}

/// Downcasts a node to its concrete type inside a handler.
pub fn node_downcast<N: Node>(node: &mut dyn Node) -> Result<&mut N, VisitError> {
    let node_type = node.node_type().name;
    node.downcast_mut::<N>().ok_or(VisitError::NodeCast {
        node_type,
        expected: core::any::type_name::<N>(),
    })
}

/// Shared-reference variant of [`node_downcast`].
pub fn node_downcast_ref<N: Node>(node: &dyn Node) -> Result<&N, VisitError> {
    let node_type = node.node_type().name;
    node.downcast_ref::<N>().ok_or(VisitError::NodeCast {
        node_type,
        expected: core::any::type_name::<N>(),
    })
}

/// Identity of the concrete visitor type behind a `dyn Visitor`.
pub(crate) fn visitor_type_id(visitor: &dyn Visitor) -> TypeId {
    let any: &dyn Any = visitor;
    Any::type_id(any)
}

/// Dispatch failure taxonomy.
///
/// Structural, not-found and ambiguity errors indicate a defect in tree
/// construction or visitor definition; they surface to the caller of the
/// pass and are never silently recovered. A pass has no partial-success
/// semantics: the first error aborts the whole pass.
#[derive(Debug, Error)]
pub enum VisitError {
    /// The visitor declares no applicable handler for the node's type.
    #[error("no `visit` handler for node type `{node_type}` in visitor `{visitor}`")]
    HandlerNotFound {
        node_type: &'static str,
        visitor: &'static str,
    },

    /// Two equally specific handlers exist for one node type. Deterministic
    /// and stable: the same pair is reported on every dispatch, cached or
    /// not.
    #[error(
        "ambiguous handlers in visitor `{visitor}` for node type `{node_type}`: \
         `{first}` and `{second}` are equally specific"
    )]
    AmbiguousHandler {
        visitor: &'static str,
        node_type: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// An error escaped a handler; wraps the cause exactly once, carrying
    /// the offending node's type and location.
    #[error("error while visiting node of type `{node_type}`: {source}")]
    Visiting {
        node_type: &'static str,
        location: Option<Location>,
        #[source]
        source: Box<VisitError>,
    },

    /// Application-specific handler failure.
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn StdError + Send + Sync>),

    /// A handler received a visitor of an unexpected concrete type.
    #[error("visitor `{visitor}` is not a `{expected}`")]
    VisitorCast {
        visitor: &'static str,
        expected: &'static str,
    },

    /// A handler received a node of an unexpected concrete type.
    #[error("node of type `{node_type}` is not a `{expected}`")]
    NodeCast {
        node_type: &'static str,
        expected: &'static str,
    },

    /// Structural misuse detected while applying a rewrite action.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A visitor stack was paired with a chain cache built for a different
    /// sequence of visitor types.
    #[error("visitor stack does not match the definition its chain cache was built for")]
    StackMismatch,
}

impl VisitError {
    /// Wraps an application error for returning from a handler.
    pub fn handler(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        VisitError::Handler(err.into())
    }
}

/// Resolves and invokes visitor handlers against nodes.
///
/// A dispatcher borrows its cache; [`Dispatcher::new`] uses the shared
/// process-wide one, [`Dispatcher::with_cache`] an explicit (for example
/// test-isolated) cache.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'cache> {
    cache: &'cache DispatchCache,
}

impl Dispatcher<'static> {
    pub fn new() -> Self {
        Self {
            cache: DispatchCache::shared(),
        }
    }
}

impl Default for Dispatcher<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'cache> Dispatcher<'cache> {
    pub fn with_cache(cache: &'cache DispatchCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'cache DispatchCache {
        self.cache
    }

    /// Full invocation protocol: `before`, dispatch, `after`.
    pub fn go(&self, visitor: &mut dyn Visitor, node: &mut dyn Node) -> Result<Action, VisitError> {
        if visitor.before(node) == Flow::Abort {
            return Ok(Action::Keep);
        }
        let action = self.dispatch(visitor, node)?;
        visitor.after(node, &action);
        Ok(action)
    }

    /// Resolves and runs the most specific handler, without the
    /// `before`/`after` brackets.
    pub fn dispatch(
        &self,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<Action, VisitError> {
        let node_type = node.node_type();
        match self.cache.lookup(visitor, node_type) {
            Resolution::Found(run) => Self::invoke(run, visitor, node),
            Resolution::NotFound => visitor.not_found(node),
            Resolution::Ambiguous { first, second } => Err(VisitError::AmbiguousHandler {
                visitor: visitor.name(),
                node_type: node_type.name,
                first: first.name,
                second: second.name,
            }),
        }
    }

    /// Runs a resolved handler, wrapping an escaping error exactly once.
    pub(crate) fn invoke(
        run: HandlerFn,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<Action, VisitError> {
        let node_type = node.node_type().name;
        let location = node.location().cloned();
        match run(visitor, node) {
            Ok(action) => Ok(action),
            Err(err @ VisitError::Visiting { .. }) => Err(err),
            Err(err) => Err(VisitError::Visiting {
                node_type,
                location,
                source: Box::new(err),
            }),
        }
    }
}
