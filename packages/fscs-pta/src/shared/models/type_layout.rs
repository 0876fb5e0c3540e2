//! Type layouts: the field/array/pointer structure of allocated memory
//!
//! A layout is what the memory model consults when turning a byte offset into
//! a canonical field location:
//! - `ArrayLayout` lists `[start, end)` regions with an element stride. Offsets
//!   inside a region fold onto the first element (array smashing).
//! - `PointerLayout` lists the offsets that hold pointers.
//!
//! Layouts are produced by the front-end and interned in a `TypeLayoutTable`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::TypeLayoutId;

/// One array region `[start, end)` whose elements are `stride` bytes apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayTriple {
    pub start: u64,
    pub end: u64,
    pub stride: u64,
}

impl ArrayTriple {
    #[inline]
    pub fn new(start: u64, end: u64, stride: u64) -> Self {
        Self { start, end, stride }
    }

    #[inline]
    fn shifted(self, delta: u64) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
            stride: self.stride,
        }
    }
}

/// Sorted array regions of a type (outer regions before nested ones)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ArrayLayout {
    triples: Vec<ArrayTriple>,
}

impl ArrayLayout {
    /// Build a layout, dropping degenerate regions and ordering the rest by
    /// start offset (larger strides first for equal starts).
    pub fn new(triples: Vec<ArrayTriple>) -> Self {
        let mut triples: Vec<ArrayTriple> = triples
            .into_iter()
            .filter(|t| t.stride > 0 && t.end > t.start)
            .collect();
        triples.sort_by(|a, b| a.start.cmp(&b.start).then(b.stride.cmp(&a.stride)));
        triples.dedup();
        Self { triples }
    }

    pub fn triples(&self) -> &[ArrayTriple] {
        &self.triples
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Normalize `offset` through every array region containing it.
    ///
    /// Returns the folded offset and whether any array region was hit.
    pub fn offset_into(&self, mut offset: u64) -> (u64, bool) {
        let mut hit_array = false;
        for triple in &self.triples {
            if triple.start > offset {
                break;
            }
            if offset < triple.end {
                offset = triple.start + (offset - triple.start) % triple.stride;
                hit_array = true;
            }
        }
        (offset, hit_array)
    }
}

/// Offsets holding pointer values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PointerLayout {
    offsets: BTreeSet<u64>,
}

impl PointerLayout {
    pub fn new(offsets: impl IntoIterator<Item = u64>) -> Self {
        Self {
            offsets: offsets.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A single pointer at offset 0
    pub fn single() -> Self {
        Self::new([0])
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.offsets.contains(&offset)
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.offsets.iter().copied()
    }

    /// Pointer offsets strictly greater than `offset`
    pub fn offsets_after(&self, offset: u64) -> impl Iterator<Item = u64> + '_ {
        use std::ops::Bound::{Excluded, Unbounded};
        self.offsets.range((Excluded(offset), Unbounded)).copied()
    }

    /// Union of two layouts
    pub fn merge(lhs: &PointerLayout, rhs: &PointerLayout) -> PointerLayout {
        PointerLayout {
            offsets: lhs.offsets.union(&rhs.offsets).copied().collect(),
        }
    }

    fn shifted(&self, delta: u64) -> PointerLayout {
        PointerLayout::new(self.offsets.iter().map(|o| o.saturating_add(delta)))
    }
}

/// Complete layout of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeLayout {
    pub size: u64,
    pub arrays: ArrayLayout,
    pub pointers: PointerLayout,
}

impl TypeLayout {
    pub fn new(size: u64, arrays: ArrayLayout, pointers: PointerLayout) -> Self {
        Self {
            size,
            arrays,
            pointers,
        }
    }

    /// Untyped memory: every byte folds onto offset 0, which may hold a pointer
    pub fn byte_array() -> Self {
        Self::new(
            1,
            ArrayLayout::new(vec![ArrayTriple::new(0, u64::MAX, 1)]),
            PointerLayout::single(),
        )
    }

    /// A pointer-typed scalar
    pub fn pointer(size: u64) -> Self {
        Self::new(size, ArrayLayout::default(), PointerLayout::single())
    }

    /// A non-pointer scalar
    pub fn scalar(size: u64) -> Self {
        Self::new(size, ArrayLayout::default(), PointerLayout::empty())
    }

    #[inline]
    pub fn offset_into(&self, offset: u64) -> (u64, bool) {
        self.arrays.offset_into(offset)
    }
}

/// Interning table for type layouts
#[derive(Debug, Clone)]
pub struct TypeLayoutTable {
    layouts: Vec<TypeLayout>,
    index: FxHashMap<TypeLayout, TypeLayoutId>,
}

impl TypeLayoutTable {
    /// Untyped byte array, always interned
    pub const BYTE_ARRAY: TypeLayoutId = TypeLayoutId(0);
    /// Layout of function objects, always interned
    pub const FUNCTION: TypeLayoutId = TypeLayoutId(1);

    pub fn new() -> Self {
        let mut table = Self {
            layouts: Vec::new(),
            index: FxHashMap::default(),
        };
        table.intern(TypeLayout::byte_array());
        table.intern(TypeLayout::scalar(0));
        table
    }

    /// Intern a layout, returning the existing handle for an equal one
    pub fn intern(&mut self, layout: TypeLayout) -> TypeLayoutId {
        if let Some(&id) = self.index.get(&layout) {
            return id;
        }
        let id = TypeLayoutId(self.layouts.len() as u32);
        self.layouts.push(layout.clone());
        self.index.insert(layout, id);
        id
    }

    /// Look up a layout. Handles are only minted by this table.
    pub fn get(&self, id: TypeLayoutId) -> &TypeLayout {
        &self.layouts[id.index()]
    }

    pub fn contains(&self, id: TypeLayoutId) -> bool {
        id.index() < self.layouts.len()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn byte_array(&self) -> TypeLayoutId {
        Self::BYTE_ARRAY
    }

    pub fn pointer(&mut self, size: u64) -> TypeLayoutId {
        self.intern(TypeLayout::pointer(size))
    }

    pub fn scalar(&mut self, size: u64) -> TypeLayoutId {
        self.intern(TypeLayout::scalar(size))
    }

    /// `count` consecutive elements of `elem`.
    ///
    /// The element's own regions and pointer offsets are kept relative to the
    /// first element, since every other element folds onto it.
    pub fn array_of(&mut self, elem: TypeLayoutId, count: u64) -> TypeLayoutId {
        let elem_layout = self.get(elem).clone();
        let size = elem_layout.size.saturating_mul(count);

        let mut triples = Vec::with_capacity(elem_layout.arrays.triples().len() + 1);
        if elem_layout.size > 0 && count > 0 {
            triples.push(ArrayTriple::new(0, size, elem_layout.size));
        }
        triples.extend_from_slice(elem_layout.arrays.triples());

        self.intern(TypeLayout::new(
            size,
            ArrayLayout::new(triples),
            elem_layout.pointers,
        ))
    }

    /// A record type of `size` bytes with the given `(offset, layout)` fields
    pub fn structure(&mut self, size: u64, fields: &[(u64, TypeLayoutId)]) -> TypeLayoutId {
        let mut triples = Vec::new();
        let mut pointers = PointerLayout::empty();
        for &(offset, field) in fields {
            let field_layout = self.get(field);
            triples.extend(field_layout.arrays.triples().iter().map(|t| t.shifted(offset)));
            pointers = PointerLayout::merge(&pointers, &field_layout.pointers.shifted(offset));
        }
        self.intern(TypeLayout::new(size, ArrayLayout::new(triples), pointers))
    }
}

impl Default for TypeLayoutTable {
    fn default() -> Self {
        Self::new()
    }
}
