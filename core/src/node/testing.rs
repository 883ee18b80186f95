//! Test-specific node types: a tiny expression tree exercising fixed and
//! variable arity, properties and a diamond of supertypes.

use ecow::EcoString;

use crate::attr::Value;
use crate::node::{
    builtin, replace_fixed_child, Node, NodeBase, NodeRef, NodeType, TreeError,
};

/// Abstract expression supertype.
pub(crate) static EXPR: NodeType = NodeType {
    name: "Expr",
    kind: builtin::USER_KIND_BASE,
    supertypes: &[&builtin::NODE],
    child_names: &[],
};

/// Two sibling interfaces; `Ident` implements both, so a visitor that
/// declares handlers for both is ambiguous on `Ident`.
pub(crate) static LOADABLE: NodeType = NodeType {
    name: "Loadable",
    kind: builtin::USER_KIND_BASE + 1,
    supertypes: &[&builtin::NODE],
    child_names: &[],
};

pub(crate) static STORABLE: NodeType = NodeType {
    name: "Storable",
    kind: builtin::USER_KIND_BASE + 2,
    supertypes: &[&builtin::NODE],
    child_names: &[],
};

pub(crate) static LIT: NodeType = NodeType {
    name: "Lit",
    kind: builtin::USER_KIND_BASE + 3,
    supertypes: &[&EXPR],
    child_names: &[],
};

pub(crate) static IDENT: NodeType = NodeType {
    name: "Ident",
    kind: builtin::USER_KIND_BASE + 4,
    supertypes: &[&EXPR, &LOADABLE, &STORABLE],
    child_names: &[],
};

pub(crate) static PAIR: NodeType = NodeType {
    name: "Pair",
    kind: builtin::USER_KIND_BASE + 5,
    supertypes: &[&EXPR],
    child_names: &["left", "right"],
};

/// Integer literal with a single `value` property.
#[derive(Debug)]
pub(crate) struct Lit {
    base: NodeBase,
    pub value: i64,
}

impl Lit {
    pub fn new(value: i64) -> Self {
        Self {
            base: NodeBase::new(),
            value,
        }
    }

    pub fn boxed(value: i64) -> NodeRef {
        Box::new(Self::new(value))
    }
}

impl Node for Lit {
    fn node_type(&self) -> &'static NodeType {
        &LIT
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
        (index == 0).then_some("value")
    }

    fn property(&self, index: usize) -> Option<Value> {
        (index == 0).then_some(Value::Int(self.value))
    }

    fn set_property(&mut self, index: usize, value: Value) -> Result<(), TreeError> {
        match (index, value) {
            (0, Value::Int(value)) => {
                self.value = value;
                Ok(())
            }
            (0, other) => Err(TreeError::PropertyType {
                node_type: LIT.name,
                name: "value",
                expected: "int",
                given: other.type_name(),
            }),
            (index, _) => Err(TreeError::NoSuchProperty {
                node_type: LIT.name,
                index,
            }),
        }
    }
}

/// Identifier implementing both `Loadable` and `Storable`.
#[derive(Debug)]
pub(crate) struct Ident {
    base: NodeBase,
    pub name: EcoString,
}

impl Ident {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            base: NodeBase::new(),
            name: name.into(),
        }
    }

    pub fn boxed(name: impl Into<EcoString>) -> NodeRef {
        Box::new(Self::new(name))
    }
}

impl Node for Ident {
    fn node_type(&self) -> &'static NodeType {
        &IDENT
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
        (index == 0).then_some("name")
    }

    fn property(&self, index: usize) -> Option<Value> {
        (index == 0).then(|| Value::Text(self.name.clone()))
    }

    fn set_property(&mut self, index: usize, value: Value) -> Result<(), TreeError> {
        match (index, value) {
            (0, Value::Text(name)) => {
                self.name = name;
                Ok(())
            }
            (0, other) => Err(TreeError::PropertyType {
                node_type: IDENT.name,
                name: "name",
                expected: "text",
                given: other.type_name(),
            }),
            (index, _) => Err(TreeError::NoSuchProperty {
                node_type: IDENT.name,
                index,
            }),
        }
    }
}

/// Fixed-arity node with two named child slots.
#[derive(Debug)]
pub(crate) struct Pair {
    base: NodeBase,
    children: [NodeRef; 2],
}

impl Pair {
    pub fn new(left: NodeRef, right: NodeRef) -> Self {
        Self {
            base: NodeBase::new(),
            children: [left, right],
        }
    }
}

impl Node for Pair {
    fn node_type(&self) -> &'static NodeType {
        &PAIR
    }

    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn size(&self) -> usize {
        2
    }

    fn child(&self, index: usize) -> Option<&dyn Node> {
        self.children.get(index).map(|child| child.as_ref())
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.children.get_mut(index).map(|child| child.as_mut())
    }

    fn set_child(&mut self, index: usize, node: NodeRef) -> Result<NodeRef, TreeError> {
        let Some(slot) = self.children.get_mut(index) else {
            return Err(TreeError::IndexOutOfBounds {
                node_type: PAIR.name,
                index,
                len: 2,
            });
        };
        replace_fixed_child(&PAIR, index, slot, node)
    }
}
