//! Memory block/object interning and offset arithmetic

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::features::context::ContextId;
use crate::features::memory_model::domain::{
    AllocSite, BlockId, MemoryBlock, MemoryObject, MemoryObjectId,
};
use crate::shared::models::{FunctionId, TypeLayout, TypeLayoutId, TypeLayoutTable, ValueId};

/// Owns every memory block and object created during one analysis run
#[derive(Debug, Clone)]
pub struct MemoryManager {
    layouts: TypeLayoutTable,
    blocks: Vec<MemoryBlock>,
    block_index: FxHashMap<AllocSite, BlockId>,
    objects: Vec<MemoryObject>,
    object_index: FxHashMap<MemoryObject, MemoryObjectId>,
}

impl MemoryManager {
    pub fn new(layouts: TypeLayoutTable) -> Self {
        let mut manager = Self {
            layouts,
            blocks: Vec::new(),
            block_index: FxHashMap::default(),
            objects: Vec::new(),
            object_index: FxHashMap::default(),
        };
        let universal = manager.block_for(AllocSite::Universal, TypeLayoutTable::BYTE_ARRAY);
        let null = manager.block_for(AllocSite::Null, TypeLayoutTable::FUNCTION);
        let u = manager.intern_object(universal, 0, true);
        let n = manager.intern_object(null, 0, false);
        debug_assert_eq!(u, MemoryObjectId::UNIVERSAL);
        debug_assert_eq!(n, MemoryObjectId::NULL);
        manager
    }

    pub fn layouts(&self) -> &TypeLayoutTable {
        &self.layouts
    }

    pub fn layouts_mut(&mut self) -> &mut TypeLayoutTable {
        &mut self.layouts
    }

    fn block_for(&mut self, site: AllocSite, layout: TypeLayoutId) -> BlockId {
        if let Some(&block) = self.block_index.get(&site) {
            if self.blocks[block.index()].layout != layout {
                debug!(?site, "allocation site re-allocated with a different layout; keeping the first");
            }
            return block;
        }
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(MemoryBlock { site, layout });
        self.block_index.insert(site, id);
        id
    }

    fn intern_object(&mut self, block: BlockId, offset: u64, summary: bool) -> MemoryObjectId {
        let object = MemoryObject {
            block,
            offset,
            summary,
        };
        if let Some(&id) = self.object_index.get(&object) {
            return id;
        }
        let id = MemoryObjectId(self.objects.len() as u32);
        self.objects.push(object);
        self.object_index.insert(object, id);
        id
    }

    /// First object of a non-heap block: summary iff the layout starts with
    /// an array region
    fn start_object(&mut self, site: AllocSite, layout: TypeLayoutId) -> MemoryObjectId {
        let block = self.block_for(site, layout);
        let block_layout = self.blocks[block.index()].layout;
        let (_, hit_array) = self.layouts.get(block_layout).offset_into(0);
        self.intern_object(block, 0, hit_array)
    }

    pub fn allocate_global(&mut self, value: ValueId, layout: TypeLayoutId) -> MemoryObjectId {
        self.start_object(AllocSite::Global(value), layout)
    }

    pub fn allocate_function(&mut self, function: FunctionId) -> MemoryObjectId {
        let block = self.block_for(AllocSite::Function(function), TypeLayoutTable::FUNCTION);
        self.intern_object(block, 0, false)
    }

    pub fn allocate_stack(&mut self, ctx: ContextId, value: ValueId, layout: TypeLayoutId) -> MemoryObjectId {
        self.start_object(AllocSite::Stack { ctx, value }, layout)
    }

    /// Heap objects are always summaries
    pub fn allocate_heap(&mut self, ctx: ContextId, value: ValueId, layout: TypeLayoutId) -> MemoryObjectId {
        let block = self.block_for(AllocSite::Heap { ctx, value }, layout);
        self.intern_object(block, 0, true)
    }

    /// Memory handed to the entry function by its environment (argv, envp)
    pub fn allocate_startup(&mut self, value: ValueId) -> MemoryObjectId {
        let site = AllocSite::Stack {
            ctx: ContextId::GLOBAL,
            value,
        };
        let block = self.block_for(site, TypeLayoutTable::BYTE_ARRAY);
        self.intern_object(block, 0, true)
    }

    /// Object at `offset` in `block`, normalized by the block's layout.
    /// Offsets past the end degrade to the universal object.
    pub fn offset_block(&mut self, block: BlockId, offset: u64) -> MemoryObjectId {
        let MemoryBlock { site, layout } = self.blocks[block.index()];
        if matches!(site, AllocSite::Universal | AllocSite::Null) {
            return MemoryObjectId::UNIVERSAL;
        }
        let layout: &TypeLayout = self.layouts.get(layout);
        let (adjusted, hit_array) = layout.offset_into(offset);
        if adjusted >= layout.size {
            return MemoryObjectId::UNIVERSAL;
        }
        self.intern_object(block, adjusted, hit_array || site.is_heap())
    }

    /// `object + delta`, folded through array regions
    pub fn offset_memory(&mut self, object: MemoryObjectId, delta: u64) -> MemoryObjectId {
        if delta == 0 {
            return object;
        }
        if object.is_special() {
            return MemoryObjectId::UNIVERSAL;
        }
        let MemoryObject { block, offset, .. } = self.objects[object.index()];
        match offset.checked_add(delta) {
            Some(target) => self.offset_block(block, target),
            None => MemoryObjectId::UNIVERSAL,
        }
    }

    /// Objects at pointer-holding offsets after `object` in the same block
    pub fn reachable_pointer_objects(&mut self, object: MemoryObjectId, include_self: bool) -> Vec<MemoryObjectId> {
        let mut result = Vec::new();
        if include_self {
            result.push(object);
        }
        if object.is_special() {
            return result;
        }

        let MemoryObject { block, offset, .. } = self.objects[object.index()];
        let layout = self.blocks[block.index()].layout;
        let offsets: Vec<u64> = self.layouts.get(layout).pointers.offsets_after(offset).collect();
        for target in offsets {
            let reached = self.offset_block(block, target);
            if !reached.is_special() && !result.contains(&reached) {
                result.push(reached);
            }
        }
        result
    }

    pub fn object(&self, id: MemoryObjectId) -> &MemoryObject {
        &self.objects[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &MemoryBlock {
        &self.blocks[id.index()]
    }

    pub fn block_of(&self, id: MemoryObjectId) -> &MemoryBlock {
        self.block(self.object(id).block)
    }

    pub fn alloc_site(&self, id: MemoryObjectId) -> AllocSite {
        self.block_of(id).site
    }

    pub fn is_summary(&self, id: MemoryObjectId) -> bool {
        self.object(id).summary
    }

    pub fn is_stack(&self, id: MemoryObjectId) -> bool {
        self.alloc_site(id).is_stack()
    }

    pub fn is_heap(&self, id: MemoryObjectId) -> bool {
        self.alloc_site(id).is_heap()
    }

    pub fn is_global(&self, id: MemoryObjectId) -> bool {
        self.alloc_site(id).is_global()
    }

    /// The function a function object stands for
    pub fn function_of(&self, id: MemoryObjectId) -> Option<FunctionId> {
        match self.alloc_site(id) {
            AllocSite::Function(f) if self.object(id).offset == 0 => Some(f),
            _ => None,
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = (MemoryObjectId, &MemoryObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (MemoryObjectId(i as u32), o))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(layout: impl FnOnce(&mut TypeLayoutTable) -> TypeLayoutId) -> (MemoryManager, TypeLayoutId) {
        let mut table = TypeLayoutTable::new();
        let id = layout(&mut table);
        (MemoryManager::new(table), id)
    }

    #[test]
    fn test_special_objects() {
        let (mut mm, _) = manager_with(|t| t.pointer(8));
        assert!(mm.is_summary(MemoryObjectId::UNIVERSAL));
        assert!(!mm.is_summary(MemoryObjectId::NULL));
        assert_eq!(mm.offset_memory(MemoryObjectId::NULL, 8), MemoryObjectId::UNIVERSAL);
        assert_eq!(mm.offset_memory(MemoryObjectId::UNIVERSAL, 0), MemoryObjectId::UNIVERSAL);
        assert_eq!(
            mm.reachable_pointer_objects(MemoryObjectId::UNIVERSAL, true),
            vec![MemoryObjectId::UNIVERSAL]
        );
    }

    #[test]
    fn test_allocation_is_interned() {
        let (mut mm, ptr) = manager_with(|t| t.pointer(8));
        let a = mm.allocate_stack(ContextId::GLOBAL, ValueId(5), ptr);
        let b = mm.allocate_stack(ContextId::GLOBAL, ValueId(5), ptr);
        let c = mm.allocate_stack(ContextId(1), ValueId(5), ptr);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!mm.is_summary(a));
        assert!(mm.is_stack(a));
    }

    #[test]
    fn test_summary_rules() {
        let (mut mm, arr) = manager_with(|t| {
            let p = t.pointer(8);
            t.array_of(p, 4)
        });
        let global = mm.allocate_global(ValueId(3), arr);
        assert!(mm.is_summary(global));

        let scalar = mm.layouts_mut().scalar(8);
        let heap = mm.allocate_heap(ContextId::GLOBAL, ValueId(4), scalar);
        assert!(mm.is_summary(heap));
        assert!(mm.is_heap(heap));

        let function = mm.allocate_function(FunctionId(2));
        assert_eq!(mm.function_of(function), Some(FunctionId(2)));
        assert!(!mm.is_summary(function));
    }

    #[test]
    fn test_offset_fields_and_bounds() {
        // struct { void* a; void* b; }
        let (mut mm, st) = manager_with(|t| {
            let p = t.pointer(8);
            t.structure(16, &[(0, p), (8, p)])
        });
        let obj = mm.allocate_stack(ContextId::GLOBAL, ValueId(2), st);
        let field_b = mm.offset_memory(obj, 8);
        assert_ne!(field_b, obj);
        assert_eq!(mm.object(field_b).offset, 8);
        assert_eq!(mm.offset_memory(obj, 0), obj);
        // Past the end
        assert_eq!(mm.offset_memory(obj, 16), MemoryObjectId::UNIVERSAL);
        assert_eq!(mm.offset_memory(field_b, u64::MAX), MemoryObjectId::UNIVERSAL);
    }

    #[test]
    fn test_offset_folds_into_array() {
        // struct { long n; void* items[8]; }
        let (mut mm, st) = manager_with(|t| {
            let long = t.scalar(8);
            let p = t.pointer(8);
            let items = t.array_of(p, 8);
            t.structure(72, &[(0, long), (8, items)])
        });
        let obj = mm.allocate_stack(ContextId::GLOBAL, ValueId(2), st);
        assert!(!mm.is_summary(obj));

        let item0 = mm.offset_memory(obj, 8);
        let item5 = mm.offset_memory(obj, 8 + 5 * 8);
        assert_eq!(item0, item5);
        assert!(mm.is_summary(item0));
        assert_eq!(mm.offset_memory(item0, 16), item0);
    }

    #[test]
    fn test_heap_byte_array_folds_everything() {
        let (mut mm, _) = manager_with(|t| t.pointer(8));
        let heap = mm.allocate_heap(ContextId::GLOBAL, ValueId(2), TypeLayoutTable::BYTE_ARRAY);
        assert_eq!(mm.offset_memory(heap, 13), heap);
    }

    #[test]
    fn test_reachable_pointer_objects() {
        // struct { void* a; long n; void* b; void* c; }
        let (mut mm, st) = manager_with(|t| {
            let p = t.pointer(8);
            let long = t.scalar(8);
            t.structure(32, &[(0, p), (8, long), (16, p), (24, p)])
        });
        let obj = mm.allocate_stack(ContextId::GLOBAL, ValueId(2), st);
        let b = mm.offset_memory(obj, 16);
        let c = mm.offset_memory(obj, 24);

        assert_eq!(mm.reachable_pointer_objects(obj, true), vec![obj, b, c]);
        assert_eq!(mm.reachable_pointer_objects(obj, false), vec![b, c]);
        assert_eq!(mm.reachable_pointer_objects(b, false), vec![c]);
    }
}
