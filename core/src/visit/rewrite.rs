//! The tree rewrite protocol: traversal helpers built atop dispatch.
//!
//! Three passes over a node's children, all dispatching through the full
//! `before`/`dispatch`/`after` protocol per child:
//!
//! - [`Dispatcher::iterate`]: side effects only, actions discarded.
//! - [`Dispatcher::map`]: collect the actions in child order, the node
//!   itself untouched.
//! - [`Dispatcher::map_in_place`]: walk a cursor over the children and
//!   apply each action where it stands: delete on [`Action::Remove`],
//!   leave alone on [`Action::Keep`], splice a list result's elements into
//!   a list owner (continuing past them without re-visiting), otherwise
//!   replace one-for-one. Fixed-arity owners can only replace one-for-one:
//!   a list result is a wrong-arity error and a remove marker is a
//!   structural error, since a fixed slot cannot be empty.

use core::any::Any;

use crate::node::{Node, NodeList, TreeError};
use crate::visit::{Action, Dispatcher, VisitError, Visitor};

impl Dispatcher<'_> {
    /// Dispatches over each child for its side effects only.
    pub fn iterate(
        &self,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<(), VisitError> {
        for index in 0..node.size() {
            let Some(child) = node.child_mut(index) else {
                break;
            };
            self.go(visitor, child)?;
        }
        Ok(())
    }

    /// Dispatches over each child, collecting the actions in order; the
    /// node itself is not modified.
    pub fn map(
        &self,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<Vec<Action>, VisitError> {
        let mut actions = Vec::with_capacity(node.size());
        for index in 0..node.size() {
            let Some(child) = node.child_mut(index) else {
                break;
            };
            actions.push(self.go(visitor, child)?);
        }
        Ok(actions)
    }

    /// Dispatches over each child and applies the actions in place.
    pub fn map_in_place(
        &self,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<(), VisitError> {
        if node.is_list() {
            let node_type = node.node_type().name;
            let any: &mut dyn Any = node;
            let Some(list) = any.downcast_mut::<NodeList>() else {
                return Err(VisitError::NodeCast {
                    node_type,
                    expected: core::any::type_name::<NodeList>(),
                });
            };
            self.map_list_in_place(visitor, list)
        } else {
            self.map_fixed_in_place(visitor, node)
        }
    }

    fn map_list_in_place(
        &self,
        visitor: &mut dyn Visitor,
        list: &mut NodeList,
    ) -> Result<(), VisitError> {
        let mut index = 0;
        while index < list.len() {
            let Some(child) = list.child_mut(index) else {
                break;
            };
            match self.go(visitor, child)? {
                Action::Keep => index += 1,
                Action::Remove => {
                    // The cursor stays: the next element slid into `index`.
                    list.remove(index)?;
                }
                Action::Replace(replacement) => {
                    // A list replacement splices its elements; either way
                    // the cursor continues past the inserted material.
                    let (_old, next) = list.replace_normalized(index, replacement);
                    index = next;
                }
            }
        }
        Ok(())
    }

    fn map_fixed_in_place(
        &self,
        visitor: &mut dyn Visitor,
        node: &mut dyn Node,
    ) -> Result<(), VisitError> {
        for index in 0..node.size() {
            let Some(child) = node.child_mut(index) else {
                break;
            };
            match self.go(visitor, child)? {
                Action::Keep => {}
                Action::Remove => {
                    return Err(VisitError::Tree(TreeError::RemoveFromFixed {
                        node_type: node.node_type().name,
                        slot: node.child_names().get(index).copied().unwrap_or("?"),
                    }));
                }
                Action::Replace(replacement) => {
                    node.set_child(index, replacement)?;
                }
            }
        }
        Ok(())
    }
}
