//! Semi-sparse control-flow graphs
//!
//! Each defined function carries one `Cfg`. Nodes come in two flavours:
//! - top-level nodes (`Alloc`, `Copy`, `Offset`) only touch the pointer
//!   environment and are linked to their users through def-use edges;
//! - memory-level nodes (`Entry`, `Load`, `Store`, `Call`, `Ret`) additionally
//!   read or write the store and are linked through control-flow edges.
//!
//! `CfgBuilder::build` derives both edge sets plus a per-node priority from the
//! raw control-flow graph supplied by the front-end.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use super::ids::{FunctionId, NodeId, TypeLayoutId, ValueId};
use super::program::{ValueInfo, ValueKind};
use crate::errors::{FscsError, Result};

/// Node kinds of the semi-sparse CFG
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgNodeKind {
    Entry,
    Alloc {
        dest: ValueId,
        layout: TypeLayoutId,
    },
    Copy {
        dest: ValueId,
        sources: Vec<ValueId>,
    },
    /// `dest = source + offset`, or `source + i * offset` for an unknown `i`
    /// when `array_ref` is set
    Offset {
        dest: ValueId,
        source: ValueId,
        offset: u64,
        array_ref: bool,
    },
    Load {
        dest: ValueId,
        source: ValueId,
    },
    /// `*dest = source`
    Store {
        dest: ValueId,
        source: ValueId,
    },
    Call {
        dest: Option<ValueId>,
        callee: ValueId,
        args: Vec<ValueId>,
        /// Pointee layout of an allocation call's result, when known
        alloc_hint: Option<TypeLayoutId>,
    },
    Ret {
        value: Option<ValueId>,
    },
}

impl CfgNodeKind {
    /// Nodes that never read or write the store
    pub fn is_top_level(&self) -> bool {
        matches!(
            self,
            CfgNodeKind::Alloc { .. } | CfgNodeKind::Copy { .. } | CfgNodeKind::Offset { .. }
        )
    }

    pub fn defined_value(&self) -> Option<ValueId> {
        match self {
            CfgNodeKind::Alloc { dest, .. }
            | CfgNodeKind::Copy { dest, .. }
            | CfgNodeKind::Offset { dest, .. }
            | CfgNodeKind::Load { dest, .. } => Some(*dest),
            CfgNodeKind::Call { dest, .. } => *dest,
            _ => None,
        }
    }

    pub fn used_values(&self) -> Vec<ValueId> {
        match self {
            CfgNodeKind::Entry | CfgNodeKind::Alloc { .. } => Vec::new(),
            CfgNodeKind::Copy { sources, .. } => sources.clone(),
            CfgNodeKind::Offset { source, .. } | CfgNodeKind::Load { source, .. } => vec![*source],
            CfgNodeKind::Store { dest, source } => vec![*dest, *source],
            CfgNodeKind::Call { callee, args, .. } => {
                let mut used = Vec::with_capacity(args.len() + 1);
                used.push(*callee);
                used.extend_from_slice(args);
                used
            }
            CfgNodeKind::Ret { value } => value.iter().copied().collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CfgNodeKind::Entry => "entry",
            CfgNodeKind::Alloc { .. } => "alloc",
            CfgNodeKind::Copy { .. } => "copy",
            CfgNodeKind::Offset { .. } => "offset",
            CfgNodeKind::Load { .. } => "load",
            CfgNodeKind::Store { .. } => "store",
            CfgNodeKind::Call { .. } => "call",
            CfgNodeKind::Ret { .. } => "ret",
        }
    }
}

/// A node with its derived edges
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub id: NodeId,
    pub kind: CfgNodeKind,
    succs: Vec<NodeId>,
    preds: Vec<NodeId>,
    uses: Vec<NodeId>,
    priority: u32,
}

impl CfgNode {
    /// Memory-level successors
    pub fn succs(&self) -> &[NodeId] {
        &self.succs
    }

    /// Memory-level predecessors
    pub fn preds(&self) -> &[NodeId] {
        &self.preds
    }

    /// Def-use successors
    pub fn uses(&self) -> &[NodeId] {
        &self.uses
    }

    /// Lower values are visited first within a function
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn is_top_level(&self) -> bool {
        self.kind.is_top_level()
    }
}

/// Control-flow graph of one function
#[derive(Debug, Clone)]
pub struct Cfg {
    function: FunctionId,
    nodes: Vec<CfgNode>,
    entry: NodeId,
    exit: Option<NodeId>,
}

impl Cfg {
    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// The return node, if the function can return
    pub fn exit(&self) -> Option<NodeId> {
        self.exit
    }

    pub fn does_not_return(&self) -> bool {
        self.exit.is_none()
    }

    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Incremental CFG construction
///
/// `new` starts with an entry node and appends nodes in sequence; branches are
/// expressed with `set_cursor` and `add_edge`. `empty` starts from nothing, for
/// front-ends that wire every edge themselves.
#[derive(Debug, Clone)]
pub struct CfgBuilder {
    function: FunctionId,
    kinds: Vec<CfgNodeKind>,
    edges: Vec<(NodeId, NodeId)>,
    entry: Option<NodeId>,
    cursor: Option<NodeId>,
}

impl CfgBuilder {
    pub fn new(function: FunctionId) -> Self {
        let mut builder = Self::empty(function);
        let entry = builder.add_node(CfgNodeKind::Entry);
        builder.entry = Some(entry);
        builder.cursor = Some(entry);
        builder
    }

    pub fn empty(function: FunctionId) -> Self {
        Self {
            function,
            kinds: Vec::new(),
            edges: Vec::new(),
            entry: None,
            cursor: None,
        }
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    pub fn set_entry(&mut self, node: NodeId) -> &mut Self {
        self.entry = Some(node);
        self
    }

    /// Add a node without connecting it
    pub fn add_node(&mut self, kind: CfgNodeKind) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Continue appending after `node`
    pub fn set_cursor(&mut self, node: NodeId) -> &mut Self {
        self.cursor = Some(node);
        self
    }

    /// Add a node after the cursor and move the cursor onto it
    pub fn append(&mut self, kind: CfgNodeKind) -> NodeId {
        let id = self.add_node(kind);
        if let Some(prev) = self.cursor {
            self.edges.push((prev, id));
        }
        self.cursor = Some(id);
        id
    }

    pub fn alloc(&mut self, dest: ValueId, layout: TypeLayoutId) -> NodeId {
        self.append(CfgNodeKind::Alloc { dest, layout })
    }

    pub fn copy(&mut self, dest: ValueId, sources: &[ValueId]) -> NodeId {
        self.append(CfgNodeKind::Copy {
            dest,
            sources: sources.to_vec(),
        })
    }

    pub fn offset(&mut self, dest: ValueId, source: ValueId, offset: u64) -> NodeId {
        self.append(CfgNodeKind::Offset {
            dest,
            source,
            offset,
            array_ref: false,
        })
    }

    pub fn array_offset(&mut self, dest: ValueId, source: ValueId, stride: u64) -> NodeId {
        self.append(CfgNodeKind::Offset {
            dest,
            source,
            offset: stride,
            array_ref: true,
        })
    }

    pub fn load(&mut self, dest: ValueId, source: ValueId) -> NodeId {
        self.append(CfgNodeKind::Load { dest, source })
    }

    pub fn store(&mut self, dest: ValueId, source: ValueId) -> NodeId {
        self.append(CfgNodeKind::Store { dest, source })
    }

    pub fn call(&mut self, dest: Option<ValueId>, callee: ValueId, args: &[ValueId]) -> NodeId {
        self.append(CfgNodeKind::Call {
            dest,
            callee,
            args: args.to_vec(),
            alloc_hint: None,
        })
    }

    pub fn alloc_call(
        &mut self,
        dest: ValueId,
        callee: ValueId,
        args: &[ValueId],
        hint: TypeLayoutId,
    ) -> NodeId {
        self.append(CfgNodeKind::Call {
            dest: Some(dest),
            callee,
            args: args.to_vec(),
            alloc_hint: Some(hint),
        })
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> NodeId {
        self.append(CfgNodeKind::Ret { value })
    }

    /// Validate and derive edges. `params` are the function's formals,
    /// which the entry node defines.
    pub(crate) fn build(
        self,
        function_name: &str,
        values: &[ValueInfo],
        params: &[ValueId],
    ) -> Result<Cfg> {
        let count = self.kinds.len();
        let invalid = |reason: String| FscsError::invalid_cfg(function_name, reason);

        let entry = self
            .entry
            .ok_or_else(|| invalid("missing entry node".to_string()))?;
        match self.kinds.get(entry.index()) {
            Some(CfgNodeKind::Entry) => {}
            Some(other) => {
                return Err(invalid(format!(
                    "entry node {} is a {} node",
                    entry.0,
                    other.name()
                )))
            }
            None => return Err(invalid(format!("dangling entry node reference {}", entry.0))),
        }
        if self
            .kinds
            .iter()
            .enumerate()
            .any(|(i, k)| matches!(k, CfgNodeKind::Entry) && i != entry.index())
        {
            return Err(invalid("more than one entry node".to_string()));
        }

        for &(from, to) in &self.edges {
            if from.index() >= count || to.index() >= count {
                return Err(invalid(format!(
                    "dangling node reference in edge {} -> {}",
                    from.0, to.0
                )));
            }
        }

        for kind in &self.kinds {
            let referenced = kind.defined_value().into_iter().chain(kind.used_values());
            for value in referenced {
                if value.index() >= values.len() {
                    return Err(invalid(format!("dangling value reference {}", value)));
                }
            }
        }

        // Raw control flow
        let mut control: Vec<Vec<NodeId>> = vec![Vec::new(); count];
        for &(from, to) in &self.edges {
            if !control[from.index()].contains(&to) {
                control[from.index()].push(to);
            }
        }

        let succs = sparse_successors(&self.kinds, &control);
        let uses = def_use_successors(&self.kinds, values, params, entry);
        let priorities = node_priorities(count, entry, &succs, &uses);

        let mut preds: Vec<Vec<NodeId>> = vec![Vec::new(); count];
        for (from, targets) in succs.iter().enumerate() {
            for to in targets {
                preds[to.index()].push(NodeId(from as u32));
            }
        }

        let exit = self
            .kinds
            .iter()
            .position(|k| matches!(k, CfgNodeKind::Ret { .. }))
            .map(|i| NodeId(i as u32));

        let nodes = self
            .kinds
            .into_iter()
            .zip(succs)
            .zip(preds)
            .zip(uses)
            .enumerate()
            .map(|(i, (((kind, succs), preds), uses))| CfgNode {
                id: NodeId(i as u32),
                kind,
                succs,
                preds,
                uses,
                priority: priorities[i],
            })
            .collect();

        Ok(Cfg {
            function: self.function,
            nodes,
            entry,
            exit,
        })
    }
}

/// Memory-level successors: the nearest memory-level nodes reachable through
/// control flow, looking through top-level nodes.
fn sparse_successors(kinds: &[CfgNodeKind], control: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let mut result = vec![Vec::new(); kinds.len()];
    for (from, kind) in kinds.iter().enumerate() {
        if kind.is_top_level() {
            continue;
        }
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = control[from].iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            if kinds[next.index()].is_top_level() {
                queue.extend(control[next.index()].iter().copied());
            } else if !result[from].contains(&next) {
                result[from].push(next);
            }
        }
    }
    result
}

/// Def-use successors. Nodes without an in-function definition among their
/// operands hang off the entry node so they are evaluated at least once.
fn def_use_successors(
    kinds: &[CfgNodeKind],
    values: &[ValueInfo],
    params: &[ValueId],
    entry: NodeId,
) -> Vec<Vec<NodeId>> {
    let mut defs: FxHashMap<ValueId, NodeId> = FxHashMap::default();
    for &param in params {
        defs.insert(param, entry);
    }
    for (i, kind) in kinds.iter().enumerate() {
        if let Some(dest) = kind.defined_value() {
            defs.insert(dest, NodeId(i as u32));
        }
    }

    let mut result: Vec<Vec<NodeId>> = vec![Vec::new(); kinds.len()];
    for (i, kind) in kinds.iter().enumerate() {
        let user = NodeId(i as u32);
        if user == entry {
            continue;
        }
        let mut has_def = false;
        for value in kind.used_values() {
            for root in value_roots(value, values) {
                if let Some(&def) = defs.get(&root) {
                    has_def = true;
                    if def != user && !result[def.index()].contains(&user) {
                        result[def.index()].push(user);
                    }
                }
            }
        }
        if !has_def && !result[entry.index()].contains(&user) {
            result[entry.index()].push(user);
        }
    }
    result
}

/// Values a use may depend on: casts are looked through, phis fan out.
fn value_roots(value: ValueId, values: &[ValueInfo]) -> Vec<ValueId> {
    let mut roots = Vec::new();
    let mut seen: FxHashSet<ValueId> = FxHashSet::default();
    let mut stack = vec![value];
    while let Some(v) = stack.pop() {
        if !seen.insert(v) {
            continue;
        }
        roots.push(v);
        match values.get(v.index()).map(|info| &info.kind) {
            Some(ValueKind::Cast { source }) => stack.push(*source),
            Some(ValueKind::Phi { incoming }) => stack.extend(incoming.iter().copied()),
            _ => {}
        }
    }
    roots
}

/// Reverse post-order over memory-level and def-use edges from the entry.
/// Unreachable nodes are ranked after every reachable one.
fn node_priorities(
    count: usize,
    entry: NodeId,
    succs: &[Vec<NodeId>],
    uses: &[Vec<NodeId>],
) -> Vec<u32> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(count, count * 2);
    let indices: Vec<NodeIndex> = (0..count).map(|_| graph.add_node(())).collect();
    for from in 0..count {
        for to in succs[from].iter().chain(uses[from].iter()) {
            graph.add_edge(indices[from], indices[to.index()], ());
        }
    }

    let mut order = Vec::with_capacity(count);
    let mut dfs = DfsPostOrder::new(&graph, indices[entry.index()]);
    while let Some(nx) = dfs.next(&graph) {
        order.push(nx.index());
    }
    order.reverse();

    let mut priorities = vec![u32::MAX; count];
    for (rank, &idx) in order.iter().enumerate() {
        priorities[idx] = rank as u32;
    }
    let mut next = order.len() as u32;
    for priority in priorities.iter_mut().filter(|p| **p == u32::MAX) {
        *priority = next;
        next += 1;
    }
    priorities
}
