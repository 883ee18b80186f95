//! Round-trip data: the literal separator material around child slots.
//!
//! A parser that wants exact-text reconstruction records the "glue" it
//! consumed between children (whitespace, commas, comments) as one
//! [`RtField`] per gap: a node with `n` children carries `n + 1` fields.
//! Round-trip data is purely additive; it never participates in structural
//! equality or hashing, only in reconstructing the original text.

use core::fmt::Write as _;

use ecow::EcoString;

use crate::attr::Value;
use crate::node::Node;

/// One fragment of glue: literal text or a non-textual carrier value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtFragment {
    Text(EcoString),
    Value(Value),
}

/// The glue recorded for one gap around a child slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtField {
    fragments: Vec<RtFragment>,
}

impl RtField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, text: impl Into<EcoString>) {
        self.fragments.push(RtFragment::Text(text.into()));
    }

    pub fn push_value(&mut self, value: impl Into<Value>) {
        self.fragments.push(RtFragment::Value(value.into()));
    }

    pub fn fragments(&self) -> &[RtFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Renders the field back to text, value fragments via their display
    /// form.
    pub fn render(&self) -> EcoString {
        let mut out = EcoString::new();
        for fragment in &self.fragments {
            match fragment {
                RtFragment::Text(text) => out.push_str(text),
                RtFragment::Value(value) => {
                    let _ = write!(out, "{}", value);
                }
            }
        }
        out
    }
}

/// Per-node round-trip data: one field per gap, `size() + 1` in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtData {
    fields: Vec<RtField>,
}

impl RtData {
    /// Creates empty round-trip data with the given number of fields.
    pub fn with_field_count(count: usize) -> Self {
        Self {
            fields: vec![RtField::new(); count],
        }
    }

    /// Creates round-trip data aligned with `node`'s current child count.
    pub fn for_node(node: &dyn Node) -> Self {
        Self::with_field_count(node.size() + 1)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&RtField> {
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut RtField> {
        self.fields.get_mut(index)
    }

    /// Whether this data still matches a node with `child_count` children.
    pub fn aligned_with(&self, child_count: usize) -> bool {
        self.fields.len() == child_count + 1
    }
}
