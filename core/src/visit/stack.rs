//! Multi-visitor chaining: one traversal pass, many visitors.
//!
//! A [`VisitorStack`] applies an ordered list of independent visitors to
//! the same node, each able to transform the node before the next sees it,
//! without re-walking the tree once per visitor. For a given node type the
//! stack records its *chain*: the ordered sublist of members that actually
//! declare an applicable handler (resolved per visitor exactly like single
//! dispatch). Chains are cached per stack *definition*, the sequence of
//! visitor types, not instances, and shared by every stack with an
//! identical definition.

use core::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::node::{Node, NodeType, NodeTypeId};
use crate::visit::{
    resolve, visitor_type_id, Action, Dispatcher, Flow, HandlerFn, Resolution, VisitError,
    Visitor,
};

/// One chain member: which stack slot it sits in and its resolved handler.
#[derive(Clone, Copy)]
struct ChainLink {
    index: usize,
    run: HandlerFn,
}

/// Cached chain construction result; ambiguity is as cacheable as success
/// and reproduces identically on every later pass.
#[derive(Clone)]
enum ChainResolution {
    Chain(Arc<[ChainLink]>),
    Ambiguous {
        visitor: &'static str,
        node_type: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

/// Per-definition chain cache, keyed by node runtime type.
///
/// All stack instances with the same visitor-type sequence share one
/// `ChainCache` through a process-wide registry; pairing a stack with a
/// cache built for a different sequence is rejected.
pub struct ChainCache {
    definition: Vec<TypeId>,
    chains: DashMap<NodeTypeId, ChainResolution, FxBuildHasher>,
}

static CHAIN_CACHES: Lazy<DashMap<Vec<TypeId>, Arc<ChainCache>, FxBuildHasher>> =
    Lazy::new(|| DashMap::with_hasher(FxBuildHasher::default()));

impl ChainCache {
    fn definition_of(visitors: &[StackEntry]) -> Vec<TypeId> {
        visitors
            .iter()
            .map(|entry| visitor_type_id(entry.visitor.as_ref()))
            .collect()
    }

    fn for_definition(definition: Vec<TypeId>) -> Arc<ChainCache> {
        CHAIN_CACHES
            .entry(definition.clone())
            .or_insert_with(|| {
                Arc::new(ChainCache {
                    definition,
                    chains: DashMap::with_hasher(FxBuildHasher::default()),
                })
            })
            .clone()
    }

    /// Structural equality check between this cache's definition and a
    /// stack's actual visitor-type sequence.
    fn matches(&self, entries: &[StackEntry]) -> bool {
        self.definition == Self::definition_of(entries)
    }

    /// The chain for `node_type`, building and caching it on first use.
    fn chain_for(&self, node_type: &'static NodeType, entries: &[StackEntry]) -> ChainResolution {
        if let Some(cached) = self.chains.get(&node_type.id()) {
            return cached.clone();
        }

        let mut links: Vec<ChainLink> = Vec::new();
        let mut result: Option<ChainResolution> = None;
        for (index, entry) in entries.iter().enumerate() {
            match resolve(entry.visitor.handlers(), node_type) {
                Resolution::Found(run) => links.push(ChainLink { index, run }),
                // Members without an applicable handler are skipped, not
                // an error.
                Resolution::NotFound => {}
                Resolution::Ambiguous { first, second } => {
                    result = Some(ChainResolution::Ambiguous {
                        visitor: entry.visitor.name(),
                        node_type: node_type.name,
                        first: first.name,
                        second: second.name,
                    });
                    break;
                }
            }
        }
        let built = result.unwrap_or_else(|| {
            debug!(
                target: "arbo::dispatch",
                node_type = node_type.name,
                members = links.len(),
                "chain built"
            );
            ChainResolution::Chain(links.into())
        });

        self.chains
            .entry(node_type.id())
            .or_insert_with(|| built)
            .clone()
    }
}

struct StackEntry {
    visitor: Box<dyn Visitor>,
    enabled: bool,
}

/// An ordered, individually switchable list of visitors run as one pass.
///
/// Per node, every enabled member receives its `before`/`after` brackets;
/// dispatch threads the node through the chain members in order. A member
/// returning [`Action::Replace`] hands the replacement to the next member,
/// unless the replacement's runtime type differs from the node type the
/// chain was built for: then the chain stops early and that value is the
/// pass's result. [`Action::Remove`] is terminal the same way.
pub struct VisitorStack {
    entries: Vec<StackEntry>,
    chains: Arc<ChainCache>,
}

impl VisitorStack {
    /// Builds a stack and acquires the shared chain cache for its
    /// definition.
    pub fn new(visitors: Vec<Box<dyn Visitor>>) -> Self {
        let entries: Vec<StackEntry> = visitors
            .into_iter()
            .map(|visitor| StackEntry {
                visitor,
                enabled: true,
            })
            .collect();
        let chains = ChainCache::for_definition(ChainCache::definition_of(&entries));
        Self { entries, chains }
    }

    /// Builds a stack over an explicit chain cache, validating that the
    /// cache was built for this exact sequence of visitor types.
    pub fn with_chain_cache(
        visitors: Vec<Box<dyn Visitor>>,
        chains: Arc<ChainCache>,
    ) -> Result<Self, VisitError> {
        let entries: Vec<StackEntry> = visitors
            .into_iter()
            .map(|visitor| StackEntry {
                visitor,
                enabled: true,
            })
            .collect();
        if !chains.matches(&entries) {
            return Err(VisitError::StackMismatch);
        }
        Ok(Self { entries, chains })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The chain cache this stack shares with identically defined stacks.
    pub fn chain_cache(&self) -> &Arc<ChainCache> {
        &self.chains
    }

    pub fn visitor(&self, index: usize) -> Option<&dyn Visitor> {
        self.entries.get(index).map(|entry| entry.visitor.as_ref())
    }

    pub fn visitor_mut(&mut self, index: usize) -> Option<&mut dyn Visitor> {
        self.entries
            .get_mut(index)
            .map(|entry| entry.visitor.as_mut())
    }

    /// Enables or disables the member at `index`. Disabling skips its
    /// handler without altering the cached chains. Returns false when no
    /// such member exists.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|entry| entry.enabled)
    }

    /// Runs the pass over one node.
    ///
    /// Returns what the whole stack decided: [`Action::Keep`] when the node
    /// came through unreplaced, [`Action::Replace`] carrying the final
    /// replacement, or [`Action::Remove`]. Applying the action to the
    /// node's owner is the caller's business.
    pub fn run(&mut self, node: &mut dyn Node) -> Result<Action, VisitError> {
        let node_type = node.node_type();
        let chain = match self.chains.chain_for(node_type, &self.entries) {
            ChainResolution::Chain(links) => links,
            ChainResolution::Ambiguous {
                visitor,
                node_type,
                first,
                second,
            } => {
                return Err(VisitError::AmbiguousHandler {
                    visitor,
                    node_type,
                    first,
                    second,
                })
            }
        };

        let mut replacement: Option<crate::node::NodeRef> = None;
        let mut removed = false;
        let mut alive = true;
        let mut link_cursor = 0usize;

        for index in 0..self.entries.len() {
            while link_cursor < chain.len() && chain[link_cursor].index < index {
                link_cursor += 1;
            }
            let entry = &mut self.entries[index];
            if !entry.enabled {
                continue;
            }

            let current: &mut dyn Node = match replacement.as_mut() {
                Some(node) => node.as_mut(),
                None => &mut *node,
            };

            if entry.visitor.before(current) == Flow::Abort {
                // Aborting in `before` disables this member for the
                // remainder of the pass; no dispatch, no `after`.
                entry.enabled = false;
                continue;
            }

            let has_link = link_cursor < chain.len() && chain[link_cursor].index == index;
            let produced = if has_link && alive && !removed {
                let run = chain[link_cursor].run;
                Dispatcher::invoke(run, entry.visitor.as_mut(), current)?
            } else {
                Action::Keep
            };

            let after_node: &dyn Node = match &produced {
                Action::Replace(new_node) => new_node.as_ref(),
                _ => match &replacement {
                    Some(node) => node.as_ref(),
                    None => &*node,
                },
            };
            entry.visitor.after(after_node, &produced);

            match produced {
                Action::Keep => {}
                Action::Remove => {
                    removed = true;
                    alive = false;
                    replacement = None;
                }
                Action::Replace(new_node) => {
                    if !new_node.node_type().is(node_type) {
                        alive = false;
                    }
                    replacement = Some(new_node);
                }
            }
        }

        Ok(if removed {
            Action::Remove
        } else if let Some(new_node) = replacement {
            Action::Replace(new_node)
        } else {
            Action::Keep
        })
    }
}

impl std::fmt::Debug for VisitorStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitorStack")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
