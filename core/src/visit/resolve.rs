//! Handler resolution: breadth-first search over the supertype graph.

use tracing::trace;

use crate::node::{NodeType, NodeTypeId};
use crate::visit::{HandlerEntry, HandlerFn};

/// Outcome of resolving one (visitor type, node type) pair.
///
/// All three outcomes are cacheable: a miss or an ambiguity reproduces
/// identically on every later dispatch of the same pair.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolution {
    Found(HandlerFn),
    NotFound,
    Ambiguous {
        first: &'static NodeType,
        second: &'static NodeType,
    },
}

/// Finds the most specific handler in `table` for `node_type`.
///
/// The search walks the supertype graph breadth-first starting at the
/// node's concrete type: all direct supertypes of the current layer are
/// candidates before the search moves further up. The first layer that
/// contains any declared handler decides; within that layer a candidate
/// that is a subtype of every other candidate shadows them (a diamond can
/// put a type and its supertype in one layer), and two mutually
/// incomparable candidates are equally specific, a configuration error in
/// the visitor, not a per-node condition.
pub(crate) fn resolve(table: &[HandlerEntry], node_type: &'static NodeType) -> Resolution {
    let mut layer: Vec<&'static NodeType> = vec![node_type];
    let mut seen: Vec<NodeTypeId> = vec![node_type.id()];

    while !layer.is_empty() {
        let mut found: Vec<(&'static NodeType, HandlerFn)> = Vec::new();
        for &ty in &layer {
            if let Some(entry) = table.iter().find(|entry| entry.target.is(ty)) {
                found.push((ty, entry.run));
            }
        }

        match found.len() {
            0 => {}
            1 => {
                let (winner, run) = found[0];
                trace!(
                    target: "arbo::dispatch",
                    node_type = node_type.name,
                    handler = winner.name,
                    "resolved"
                );
                return Resolution::Found(run);
            }
            _ => return disambiguate(node_type, &found),
        }

        let mut next: Vec<&'static NodeType> = Vec::new();
        for &ty in &layer {
            for &sup in ty.supertypes {
                if !seen.contains(&sup.id()) {
                    seen.push(sup.id());
                    next.push(sup);
                }
            }
        }
        layer = next;
    }

    Resolution::NotFound
}

/// Several candidates in one layer: a subtype of all the others shadows
/// them, otherwise the first mutually incomparable pair is the ambiguity.
fn disambiguate(
    node_type: &'static NodeType,
    found: &[(&'static NodeType, HandlerFn)],
) -> Resolution {
    for &(candidate, run) in found {
        if found
            .iter()
            .all(|&(other, _)| candidate.is_subtype_of(other))
        {
            trace!(
                target: "arbo::dispatch",
                node_type = node_type.name,
                handler = candidate.name,
                "resolved"
            );
            return Resolution::Found(run);
        }
    }
    for (index, &(first, _)) in found.iter().enumerate() {
        for &(second, _) in &found[index + 1..] {
            if !first.is_subtype_of(second) && !second.is_subtype_of(first) {
                return Resolution::Ambiguous { first, second };
            }
        }
    }
    // Mutually comparable candidates always contain a least element in a
    // finite supertype graph.
    Resolution::Ambiguous {
        first: found[0].0,
        second: found[1].0,
    }
}
