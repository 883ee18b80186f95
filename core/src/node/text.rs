//! Text leaves.

use ecow::EcoString;

use crate::attr::Value;
use crate::node::{builtin, Node, NodeBase, NodeType, TreeError};

/// Leaf node wrapping a run of text.
///
/// Text nodes have no children and a single property, `content`. Inside a
/// [`NodeList`](crate::node::NodeList), adjacent attribute-less text nodes
/// are merged into one and empty attribute-less text nodes are dropped, so
/// a normalized list never fragments a run of text.
#[derive(Debug, Default)]
pub struct TextNode {
    base: NodeBase,
    content: EcoString,
}

impl TextNode {
    pub fn new(content: impl Into<EcoString>) -> Self {
        Self {
            base: NodeBase::new(),
            content: content.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<EcoString>) {
        self.content = content.into();
    }

    pub(crate) fn append(&mut self, more: &str) {
        self.content.push_str(more);
    }

    pub(crate) fn prepend(&mut self, more: &str) {
        let mut merged = EcoString::from(more);
        merged.push_str(&self.content);
        self.content = merged;
    }

    pub(crate) fn into_content(self) -> EcoString {
        self.content
    }
}

impl Node for TextNode {
    fn node_type(&self) -> &'static NodeType {
        &builtin::TEXT
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn property_count(&self) -> usize {
        1
    }

    fn property_name(&self, index: usize) -> Option<&'static str> {
        (index == 0).then_some("content")
    }

    fn property(&self, index: usize) -> Option<Value> {
        (index == 0).then(|| Value::Text(self.content.clone()))
    }

    fn set_property(&mut self, index: usize, value: Value) -> Result<(), TreeError> {
        if index != 0 {
            return Err(TreeError::NoSuchProperty {
                node_type: self.node_type().name,
                index,
            });
        }
        match value {
            Value::Text(text) => {
                self.content = text;
                Ok(())
            }
            other => Err(TreeError::PropertyType {
                node_type: self.node_type().name,
                name: "content",
                expected: "text",
                given: other.type_name(),
            }),
        }
    }
}
