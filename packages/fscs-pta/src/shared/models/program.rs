//! The whole-program input of the analysis
//!
//! A `Program` is an immutable arena of values, functions and globals built by
//! the front-end through [`ProgramBuilder`](super::ProgramBuilder). The engine
//! only refers to its contents through the handles in [`ids`](super::ids).

use rustc_hash::FxHashMap;

use super::cfg::{Cfg, CfgNode, CfgNodeKind};
use super::ids::{FunctionId, NodeRef, TypeLayoutId, ValueId};
use super::type_layout::TypeLayoutTable;

/// What a program value is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// The null pointer constant
    Null,
    /// An undefined value
    Undef,
    /// A pointer synthesized from an integer
    IntToPtr,
    /// An integer constant (allocation sizes)
    ConstantInt(u64),
    /// Address of a global variable
    Global,
    /// Address of a function
    Function(FunctionId),
    /// Formal parameter
    Argument { function: FunctionId, index: u32 },
    /// Result of a CFG node
    Local { function: FunctionId },
    /// No-op pointer cast of another value
    Cast { source: ValueId },
    /// Merge of control-flow dependent values
    Phi { incoming: Vec<ValueId> },
}

/// A program value
#[derive(Debug, Clone)]
pub struct ValueInfo {
    pub name: Option<String>,
    pub kind: ValueKind,
    pub is_pointer: bool,
}

impl ValueInfo {
    pub fn is_global_value(&self) -> bool {
        matches!(self.kind, ValueKind::Global | ValueKind::Function(_))
    }
}

/// A function, defined (with a CFG) or external
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// The function's address as a value
    pub value: ValueId,
    pub params: Vec<ValueId>,
    pub returns_pointer: bool,
    pub is_var_arg: bool,
    pub address_taken: bool,
    /// Debug/no-op intrinsics never extend a context
    pub intrinsic: bool,
    pub cfg: Option<Cfg>,
}

impl Function {
    /// External functions have no body and are modeled by the effect table
    pub fn is_declaration(&self) -> bool {
        self.cfg.is_none()
    }
}

/// A global variable and its pointer-valued initializers
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub value: ValueId,
    pub name: String,
    pub layout: TypeLayoutId,
    /// `(byte offset, initializer value)`
    pub initializers: Vec<(u64, ValueId)>,
}

/// Immutable program handed to the engine
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) values: Vec<ValueInfo>,
    pub(crate) functions: Vec<Function>,
    pub(crate) globals: Vec<GlobalVariable>,
    pub(crate) layouts: TypeLayoutTable,
    pub(crate) function_index: FxHashMap<String, FunctionId>,
    pub(crate) defining_nodes: FxHashMap<ValueId, NodeRef>,
}

impl Program {
    /// Canonical null constant
    pub const NULL: ValueId = ValueId(0);
    /// Canonical undef constant; stands for "any pointer"
    pub const UNDEF: ValueId = ValueId(1);

    pub fn value(&self, id: ValueId) -> &ValueInfo {
        &self.values[id.index()]
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> impl Iterator<Item = (ValueId, &ValueInfo)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (ValueId(i as u32), v))
    }

    pub fn is_pointer(&self, id: ValueId) -> bool {
        self.value(id).is_pointer
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.function_index.get(name).copied()
    }

    pub fn globals(&self) -> &[GlobalVariable] {
        &self.globals
    }

    pub fn layouts(&self) -> &TypeLayoutTable {
        &self.layouts
    }

    pub fn cfg(&self, function: FunctionId) -> Option<&Cfg> {
        self.function(function).cfg.as_ref()
    }

    pub fn node(&self, node: NodeRef) -> Option<&CfgNode> {
        self.cfg(node.function).and_then(|cfg| cfg.node(node.node))
    }

    /// The CFG node defining a local value, if any
    pub fn defining_node(&self, value: ValueId) -> Option<NodeRef> {
        self.defining_nodes.get(&value).copied()
    }

    /// The function a function-address value names
    pub fn function_of_value(&self, value: ValueId) -> Option<FunctionId> {
        match self.value(self.strip_casts(value)).kind {
            ValueKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Follow no-op casts to the underlying value
    pub fn strip_casts(&self, mut value: ValueId) -> ValueId {
        // Cast chains are acyclic by construction; bound the walk anyway.
        for _ in 0..self.values.len() {
            match self.value(value).kind {
                ValueKind::Cast { source } => value = source,
                _ => break,
            }
        }
        value
    }

    /// Integer constant behind a value, if any
    pub fn constant_int(&self, value: ValueId) -> Option<u64> {
        match self.value(self.strip_casts(value)).kind {
            ValueKind::ConstantInt(n) => Some(n),
            _ => None,
        }
    }

    /// Pointer-typed formal parameters of a function
    pub fn pointer_params(&self, function: FunctionId) -> Vec<ValueId> {
        self.function(function)
            .params
            .iter()
            .copied()
            .filter(|&p| self.is_pointer(p))
            .collect()
    }

    /// Pointer-typed actual arguments of a call
    pub fn pointer_args<'a>(&'a self, args: &'a [ValueId]) -> impl Iterator<Item = ValueId> + 'a {
        args.iter().copied().filter(move |&a| self.is_pointer(a))
    }

    pub fn address_taken_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.address_taken)
    }

    /// Every call node in the program
    pub fn call_sites(&self) -> impl Iterator<Item = (NodeRef, &CfgNode)> {
        self.defined_nodes()
            .filter(|(_, node)| matches!(node.kind, CfgNodeKind::Call { .. }))
    }

    /// Every node of every defined function
    pub fn defined_nodes(&self) -> impl Iterator<Item = (NodeRef, &CfgNode)> {
        self.functions.iter().flat_map(|f| {
            f.cfg
                .iter()
                .flat_map(move |cfg| cfg.nodes().map(move |n| (NodeRef::new(f.id, n.id), n)))
        })
    }

    /// Function owning a parameter or local value
    pub fn owner_of(&self, value: ValueId) -> Option<FunctionId> {
        match self.value(value).kind {
            ValueKind::Argument { function, .. } | ValueKind::Local { function } => Some(function),
            _ => None,
        }
    }
}
