//! Program construction API for front-ends and tests

use rustc_hash::FxHashMap;

use super::cfg::{CfgBuilder, CfgNodeKind};
use super::ids::{FunctionId, NodeRef, TypeLayoutId, ValueId};
use super::program::{Function, GlobalVariable, Program, ValueInfo, ValueKind};
use super::type_layout::TypeLayoutTable;
use crate::errors::{FscsError, Result};

/// Builder for [`Program`]
///
/// # Example
/// ```rust,ignore
/// let mut b = ProgramBuilder::new();
/// let main = b.declare_function("main", &[], false);
/// let x = b.local(main, "x", true);
/// let ptr = b.layouts_mut().pointer(8);
/// let mut body = b.body(main);
/// body.alloc(x, ptr);
/// body.ret(None);
/// b.define(main, body);
/// let program = b.build()?;
/// ```
#[derive(Debug)]
pub struct ProgramBuilder {
    values: Vec<ValueInfo>,
    functions: Vec<Function>,
    globals: Vec<GlobalVariable>,
    layouts: TypeLayoutTable,
    bodies: Vec<CfgBuilder>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            values: Vec::new(),
            functions: Vec::new(),
            globals: Vec::new(),
            layouts: TypeLayoutTable::new(),
            bodies: Vec::new(),
        };
        builder.push_value(Some("null"), ValueKind::Null, true);
        builder.push_value(Some("undef"), ValueKind::Undef, true);
        builder
    }

    pub fn layouts(&self) -> &TypeLayoutTable {
        &self.layouts
    }

    pub fn layouts_mut(&mut self) -> &mut TypeLayoutTable {
        &mut self.layouts
    }

    fn push_value(&mut self, name: Option<&str>, kind: ValueKind, is_pointer: bool) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueInfo {
            name: name.map(str::to_string),
            kind,
            is_pointer,
        });
        id
    }

    pub fn null(&self) -> ValueId {
        Program::NULL
    }

    pub fn undef(&self) -> ValueId {
        Program::UNDEF
    }

    pub fn constant_int(&mut self, n: u64) -> ValueId {
        self.push_value(None, ValueKind::ConstantInt(n), false)
    }

    pub fn int_to_ptr(&mut self) -> ValueId {
        self.push_value(None, ValueKind::IntToPtr, true)
    }

    pub fn cast(&mut self, source: ValueId) -> ValueId {
        self.push_value(None, ValueKind::Cast { source }, true)
    }

    pub fn phi(&mut self, name: &str, incoming: &[ValueId]) -> ValueId {
        self.push_value(
            Some(name),
            ValueKind::Phi {
                incoming: incoming.to_vec(),
            },
            true,
        )
    }

    /// A global variable; the value is its address
    pub fn global(&mut self, name: &str, layout: TypeLayoutId) -> ValueId {
        let value = self.push_value(Some(name), ValueKind::Global, true);
        self.globals.push(GlobalVariable {
            value,
            name: name.to_string(),
            layout,
            initializers: Vec::new(),
        });
        value
    }

    /// Record that `global + offset` initially holds `init`
    pub fn global_initializer(&mut self, global: ValueId, offset: u64, init: ValueId) -> &mut Self {
        if let Some(g) = self.globals.iter_mut().find(|g| g.value == global) {
            g.initializers.push((offset, init));
        }
        self
    }

    /// Declare a function. `params` gives the pointer-ness of each formal.
    /// Functions without a later `define` are external.
    pub fn declare_function(&mut self, name: &str, params: &[bool], returns_pointer: bool) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        let value = self.push_value(Some(name), ValueKind::Function(id), true);
        let params: Vec<ValueId> = params
            .iter()
            .enumerate()
            .map(|(index, &is_pointer)| {
                let param_name = format!("{}.arg{}", name, index);
                self.push_value(
                    Some(&param_name),
                    ValueKind::Argument {
                        function: id,
                        index: index as u32,
                    },
                    is_pointer,
                )
            })
            .collect();
        self.functions.push(Function {
            id,
            name: name.to_string(),
            value,
            params,
            returns_pointer,
            is_var_arg: false,
            address_taken: false,
            intrinsic: false,
            cfg: None,
        });
        id
    }

    pub fn function_value(&self, function: FunctionId) -> ValueId {
        self.functions[function.index()].value
    }

    /// Formal parameter `index` of `function`
    ///
    /// # Panics
    /// Panics if the function has fewer parameters.
    pub fn param(&self, function: FunctionId, index: usize) -> ValueId {
        self.functions[function.index()].params[index]
    }

    /// A value defined by a node of `function`
    pub fn local(&mut self, function: FunctionId, name: &str, is_pointer: bool) -> ValueId {
        self.push_value(Some(name), ValueKind::Local { function }, is_pointer)
    }

    pub fn set_var_arg(&mut self, function: FunctionId) -> &mut Self {
        self.functions[function.index()].is_var_arg = true;
        self
    }

    pub fn set_address_taken(&mut self, function: FunctionId) -> &mut Self {
        self.functions[function.index()].address_taken = true;
        self
    }

    pub fn set_intrinsic(&mut self, function: FunctionId) -> &mut Self {
        self.functions[function.index()].intrinsic = true;
        self
    }

    /// Start a body for `function`
    pub fn body(&self, function: FunctionId) -> CfgBuilder {
        CfgBuilder::new(function)
    }

    pub fn define(&mut self, function: FunctionId, body: CfgBuilder) -> &mut Self {
        debug_assert_eq!(body.function(), function);
        self.bodies.push(body);
        self
    }

    /// Validate everything and freeze the program
    pub fn build(self) -> Result<Program> {
        let ProgramBuilder {
            values,
            mut functions,
            globals,
            layouts,
            bodies,
        } = self;

        let mut function_index = FxHashMap::default();
        for function in &functions {
            if function_index
                .insert(function.name.clone(), function.id)
                .is_some()
            {
                return Err(FscsError::invalid_program(format!(
                    "duplicate function name '{}'",
                    function.name
                )));
            }
        }

        for global in &globals {
            if !layouts.contains(global.layout) {
                return Err(FscsError::invalid_program(format!(
                    "global '{}' has an unknown type layout",
                    global.name
                )));
            }
            for &(_, init) in &global.initializers {
                if init.index() >= values.len() {
                    return Err(FscsError::invalid_program(format!(
                        "global '{}' has a dangling initializer {}",
                        global.name, init
                    )));
                }
            }
        }

        let mut defining_nodes = FxHashMap::default();
        for body in bodies {
            let function_id = body.function();
            let function = functions.get_mut(function_id.index()).ok_or_else(|| {
                FscsError::invalid_program(format!("body for unknown function {}", function_id))
            })?;
            if function.cfg.is_some() {
                return Err(FscsError::invalid_cfg(&function.name, "defined twice"));
            }
            let cfg = body.build(&function.name, &values, &function.params)?;
            for node in cfg.nodes() {
                if let Some(layout) = node_layout(&node.kind) {
                    if !layouts.contains(layout) {
                        return Err(FscsError::invalid_cfg(
                            &function.name,
                            format!("node {} uses an unknown type layout", node.id.0),
                        ));
                    }
                }
                if let Some(dest) = node.kind.defined_value() {
                    defining_nodes.insert(dest, NodeRef::new(function_id, node.id));
                }
            }
            function.cfg = Some(cfg);
        }

        Ok(Program {
            values,
            functions,
            globals,
            layouts,
            function_index,
            defining_nodes,
        })
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Type layout a node refers to, if any
fn node_layout(kind: &CfgNodeKind) -> Option<TypeLayoutId> {
    match kind {
        CfgNodeKind::Alloc { layout, .. } => Some(*layout),
        CfgNodeKind::Call { alloc_hint, .. } => *alloc_hint,
        _ => None,
    }
}
