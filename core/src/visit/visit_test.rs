//! Dispatch engine tests: resolution, protocol brackets, caching, errors.

use pretty_assertions::assert_eq;

use crate::node::testing::{Ident, Lit, Pair, EXPR, LIT, LOADABLE, STORABLE};
use crate::node::{builtin, Node, NodeList, TextNode};
use crate::visit::{
    visitor_downcast, Action, DispatchCache, Dispatcher, Flow, HandlerEntry, VisitError,
    Visitor,
};

// === Tally: one handler per concrete type plus an Expr fallback ===

#[derive(Default)]
struct Tally {
    lits: usize,
    exprs: usize,
    texts: usize,
}

fn tally_lit(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    visitor_downcast::<Tally>(visitor)?.lits += 1;
    Ok(Action::Keep)
}

fn tally_expr(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    visitor_downcast::<Tally>(visitor)?.exprs += 1;
    Ok(Action::Keep)
}

fn tally_text(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    visitor_downcast::<Tally>(visitor)?.texts += 1;
    Ok(Action::Keep)
}

impl Visitor for Tally {
    fn name(&self) -> &'static str {
        "Tally"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        static HANDLERS: [HandlerEntry; 3] = [
            HandlerEntry {
                target: &LIT,
                run: tally_lit,
            },
            HandlerEntry {
                target: &EXPR,
                run: tally_expr,
            },
            HandlerEntry {
                target: &builtin::TEXT,
                run: tally_text,
            },
        ];
        &HANDLERS
    }
}

// === CatchAll: a single handler at the root of the supertype graph ===

#[derive(Default)]
struct CatchAll {
    seen: usize,
}

fn catch_all(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    visitor_downcast::<CatchAll>(visitor)?.seen += 1;
    Ok(Action::Keep)
}

impl Visitor for CatchAll {
    fn name(&self) -> &'static str {
        "CatchAll"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        static HANDLERS: [HandlerEntry; 1] = [HandlerEntry {
            target: &builtin::NODE,
            run: catch_all,
        }];
        &HANDLERS
    }
}

// === NoHandlers / Defaulting: the not-found hook ===

struct NoHandlers;

impl Visitor for NoHandlers {
    fn name(&self) -> &'static str {
        "NoHandlers"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        &[]
    }
}

#[derive(Default)]
struct Defaulting {
    defaulted: usize,
}

impl Visitor for Defaulting {
    fn name(&self) -> &'static str {
        "Defaulting"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        &[]
    }

    fn not_found(&mut self, _node: &mut dyn Node) -> Result<Action, VisitError> {
        self.defaulted += 1;
        Ok(Action::Keep)
    }
}

// === Picky: handlers for two sibling interfaces, ambiguous on Ident ===

struct Picky;

fn picky_loadable(_visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    Ok(Action::Keep)
}

fn picky_storable(_visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    Ok(Action::Keep)
}

impl Visitor for Picky {
    fn name(&self) -> &'static str {
        "Picky"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        static HANDLERS: [HandlerEntry; 2] = [
            HandlerEntry {
                target: &LOADABLE,
                run: picky_loadable,
            },
            HandlerEntry {
                target: &STORABLE,
                run: picky_storable,
            },
        ];
        &HANDLERS
    }
}

// === Bracket: before/after bookkeeping, aborting on text nodes ===

#[derive(Default)]
struct Bracket {
    befores: usize,
    afters: usize,
    handled: usize,
}

fn bracket_any(visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    visitor_downcast::<Bracket>(visitor)?.handled += 1;
    Ok(Action::Keep)
}

impl Visitor for Bracket {
    fn name(&self) -> &'static str {
        "Bracket"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        static HANDLERS: [HandlerEntry; 1] = [HandlerEntry {
            target: &builtin::NODE,
            run: bracket_any,
        }];
        &HANDLERS
    }

    fn before(&mut self, node: &dyn Node) -> Flow {
        self.befores += 1;
        if node.kind() == builtin::TEXT_KIND {
            Flow::Abort
        } else {
            Flow::Continue
        }
    }

    fn after(&mut self, _node: &dyn Node, _action: &Action) {
        self.afters += 1;
    }
}

// === Deep: recursive dispatch, plus a failing leaf handler ===

struct Deep {
    dispatcher: Dispatcher<'static>,
}

fn deep_pair(visitor: &mut dyn Visitor, node: &mut dyn Node) -> Result<Action, VisitError> {
    let dispatcher = visitor_downcast::<Deep>(visitor)?.dispatcher;
    for index in 0..node.size() {
        let Some(child) = node.child_mut(index) else {
            break;
        };
        dispatcher.go(visitor, child)?;
    }
    Ok(Action::Keep)
}

fn deep_lit(_visitor: &mut dyn Visitor, _node: &mut dyn Node) -> Result<Action, VisitError> {
    Err(VisitError::handler("boom"))
}

impl Visitor for Deep {
    fn name(&self) -> &'static str {
        "Deep"
    }

    fn handlers(&self) -> &'static [HandlerEntry] {
        static HANDLERS: [HandlerEntry; 2] = [
            HandlerEntry {
                target: &crate::node::testing::PAIR,
                run: deep_pair,
            },
            HandlerEntry {
                target: &LIT,
                run: deep_lit,
            },
        ];
        &HANDLERS
    }
}

// === Tests ===

#[test]
fn exact_handler_shadows_the_supertype_handler() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut tally = Tally::default();

    let mut lit = Lit::new(7);
    dispatcher.go(&mut tally, &mut lit).unwrap();
    assert_eq!((tally.lits, tally.exprs), (1, 0));
}

#[test]
fn unhandled_subtype_falls_back_to_its_supertype() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut tally = Tally::default();

    // No Pair handler is declared; Expr is the nearest supertype.
    let mut pair = Pair::new(Lit::boxed(1), Lit::boxed(2));
    dispatcher.go(&mut tally, &mut pair).unwrap();
    assert_eq!((tally.lits, tally.exprs), (0, 1));
}

#[test]
fn root_handler_catches_every_node_type() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut catcher = CatchAll::default();

    dispatcher.go(&mut catcher, &mut Lit::new(1)).unwrap();
    dispatcher.go(&mut catcher, &mut Ident::new("x")).unwrap();
    dispatcher.go(&mut catcher, &mut TextNode::new("t")).unwrap();
    dispatcher.go(&mut catcher, &mut NodeList::new()).unwrap();
    assert_eq!(catcher.seen, 4);
}

#[test]
fn missing_handler_fails_with_both_names() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);

    let err = dispatcher
        .go(&mut NoHandlers, &mut Lit::new(1))
        .unwrap_err();
    assert!(matches!(
        err,
        VisitError::HandlerNotFound {
            node_type: "Lit",
            visitor: "NoHandlers",
        }
    ));
}

#[test]
fn overridden_not_found_supplies_a_default() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut visitor = Defaulting::default();

    let action = dispatcher.go(&mut visitor, &mut Lit::new(1)).unwrap();
    assert!(matches!(action, Action::Keep));
    assert_eq!(visitor.defaulted, 1);
}

#[test]
fn ambiguity_is_deterministic_and_stable() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);

    let expected = ("Picky", "Ident", "Loadable", "Storable");
    for round in 0..3 {
        if round == 2 {
            // A cleared cache re-resolves to the identical ambiguity.
            cache.clear();
        }
        let err = dispatcher.go(&mut Picky, &mut Ident::new("x")).unwrap_err();
        match err {
            VisitError::AmbiguousHandler {
                visitor,
                node_type,
                first,
                second,
            } => assert_eq!((visitor, node_type, first, second), expected),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }
}

#[test]
fn ambiguous_interfaces_do_not_affect_unrelated_types() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);

    // Lit reaches neither interface; Picky simply has no handler for it.
    let err = dispatcher.go(&mut Picky, &mut Lit::new(1)).unwrap_err();
    assert!(matches!(err, VisitError::HandlerNotFound { .. }));
}

#[test]
fn before_abort_skips_handler_and_after() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut bracket = Bracket::default();

    let action = dispatcher
        .go(&mut bracket, &mut TextNode::new("skip me"))
        .unwrap();
    assert!(matches!(action, Action::Keep));
    assert_eq!((bracket.befores, bracket.handled, bracket.afters), (1, 0, 0));

    dispatcher.go(&mut bracket, &mut Lit::new(1)).unwrap();
    assert_eq!((bracket.befores, bracket.handled, bracket.afters), (2, 1, 1));
}

#[test]
fn handler_errors_are_wrapped_exactly_once() {
    let dispatcher = Dispatcher::new();
    let mut deep = Deep { dispatcher };

    let mut lone = Lit::new(1);
    let err = dispatcher.go(&mut deep, &mut lone).unwrap_err();
    let VisitError::Visiting {
        node_type, source, ..
    } = err
    else {
        panic!("expected a wrapped error");
    };
    assert_eq!(node_type, "Lit");
    assert!(matches!(*source, VisitError::Handler(_)));
}

#[test]
fn nested_dispatch_does_not_rewrap() {
    let dispatcher = Dispatcher::new();
    let mut deep = Deep { dispatcher };

    // The failure happens two levels down; the wrap still names the Lit,
    // not the Pair the error unwound through.
    let mut tree = Pair::new(Lit::boxed(1), Ident::boxed("x"));
    let err = dispatcher.go(&mut deep, &mut tree).unwrap_err();
    let VisitError::Visiting {
        node_type, source, ..
    } = err
    else {
        panic!("expected a wrapped error");
    };
    assert_eq!(node_type, "Lit");
    assert!(matches!(*source, VisitError::Handler(_)));
}

#[test]
fn resolution_is_identical_cold_and_warm() {
    let cache = DispatchCache::new();
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut tally = Tally::default();

    dispatcher.go(&mut tally, &mut Lit::new(1)).unwrap(); // cold
    dispatcher.go(&mut tally, &mut Lit::new(2)).unwrap(); // warm
    cache.clear();
    dispatcher.go(&mut tally, &mut Lit::new(3)).unwrap(); // cold again
    assert_eq!((tally.lits, tally.exprs), (3, 0));
}

#[test]
fn eviction_keeps_the_cache_bounded_and_correct() {
    let cache = DispatchCache::with_capacity(4, 2);
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut catcher = CatchAll::default();
    let mut tally = Tally::default();

    // Seven distinct (visitor type, node type) pairs through a cache that
    // sweeps above four entries.
    dispatcher.go(&mut catcher, &mut Lit::new(1)).unwrap();
    dispatcher.go(&mut catcher, &mut Ident::new("x")).unwrap();
    dispatcher.go(&mut catcher, &mut TextNode::new("t")).unwrap();
    dispatcher.go(&mut catcher, &mut NodeList::new()).unwrap();
    dispatcher
        .go(&mut catcher, &mut Pair::new(Lit::boxed(1), Lit::boxed(2)))
        .unwrap();
    dispatcher.go(&mut tally, &mut Lit::new(2)).unwrap();
    dispatcher.go(&mut tally, &mut TextNode::new("u")).unwrap();

    assert!(cache.len() <= 4, "population {} after sweeps", cache.len());

    // Evicted pairs re-resolve to the same handlers.
    dispatcher.go(&mut catcher, &mut Lit::new(3)).unwrap();
    dispatcher.go(&mut tally, &mut Lit::new(4)).unwrap();
    assert_eq!(catcher.seen, 6);
    assert_eq!((tally.lits, tally.texts, tally.exprs), (2, 1, 0));
}

#[test]
fn dispatch_uses_the_fallback_after_eviction() {
    let cache = DispatchCache::with_capacity(1, 0);
    let dispatcher = Dispatcher::with_cache(&cache);
    let mut tally = Tally::default();

    for _ in 0..3 {
        dispatcher.go(&mut tally, &mut Lit::new(1)).unwrap();
        dispatcher
            .go(&mut tally, &mut Pair::new(Lit::boxed(1), Lit::boxed(2)))
            .unwrap();
    }
    assert_eq!((tally.lits, tally.exprs), (3, 3));
}
