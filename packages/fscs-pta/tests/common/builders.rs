//! Small programs exercised by several test files

use fscs_pta::{FunctionId, NodeRef, Program, ProgramBuilder, ValueId};

/// `p = &x; q = p;`
pub struct CopyChain {
    pub program: Program,
    pub x: ValueId,
    pub p: ValueId,
    pub q: ValueId,
}

pub fn copy_chain() -> CopyChain {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let int = b.layouts_mut().scalar(4);
    let x = b.local(main, "x", true);
    let p = b.local(main, "p", true);
    let q = b.local(main, "q", true);

    let mut body = b.body(main);
    body.alloc(x, int);
    body.copy(p, &[x]);
    body.copy(q, &[p]);
    body.ret(None);
    b.define(main, body);

    CopyChain {
        program: b.build().expect("valid program"),
        x,
        p,
        q,
    }
}

/// `slot = alloca int*; y = alloca int; *slot = y; z = *slot;`
pub struct StoreLoad {
    pub program: Program,
    pub slot: ValueId,
    pub y: ValueId,
    pub z: ValueId,
    pub store: NodeRef,
    pub load: NodeRef,
}

pub fn store_load() -> StoreLoad {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let ptr = b.layouts_mut().pointer(8);
    let int = b.layouts_mut().scalar(4);
    let slot = b.local(main, "slot", true);
    let y = b.local(main, "y", true);
    let z = b.local(main, "z", true);

    let mut body = b.body(main);
    body.alloc(slot, ptr);
    body.alloc(y, int);
    let store = body.store(slot, y);
    let load = body.load(z, slot);
    body.ret(None);
    b.define(main, body);

    StoreLoad {
        program: b.build().expect("valid program"),
        slot,
        y,
        z,
        store: NodeRef::new(main, store),
        load: NodeRef::new(main, load),
    }
}

/// `make(v)` wraps `malloc` and stores `v` into the new block; `main` calls
/// it twice: `a = make(&x); b = make(&y); la = *a; lb = *b;`
pub struct HeapWrapper {
    pub program: Program,
    pub x: ValueId,
    pub y: ValueId,
    pub a: ValueId,
    pub b: ValueId,
    pub loaded_a: ValueId,
    pub loaded_b: ValueId,
    pub first: NodeRef,
    pub second: NodeRef,
}

pub fn heap_wrapper() -> HeapWrapper {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let make = b.declare_function("make", &[true], true);
    let malloc = b.declare_function("malloc", &[false], true);
    let int = b.layouts_mut().scalar(4);
    let size = b.constant_int(8);
    let v = b.param(make, 0);
    let r = b.local(make, "r", true);
    let x = b.local(main, "x", true);
    let y = b.local(main, "y", true);
    let first_result = b.local(main, "a", true);
    let second_result = b.local(main, "b", true);
    let loaded_a = b.local(main, "la", true);
    let loaded_b = b.local(main, "lb", true);
    let make_value = b.function_value(make);
    let malloc_value = b.function_value(malloc);

    let mut body = b.body(make);
    body.call(Some(r), malloc_value, &[size]);
    body.store(r, v);
    body.ret(Some(r));
    b.define(make, body);

    let mut body = b.body(main);
    body.alloc(x, int);
    body.alloc(y, int);
    let first = body.call(Some(first_result), make_value, &[x]);
    let second = body.call(Some(second_result), make_value, &[y]);
    body.load(loaded_a, first_result);
    body.load(loaded_b, second_result);
    body.ret(None);
    b.define(main, body);

    HeapWrapper {
        program: b.build().expect("valid program"),
        x,
        y,
        a: first_result,
        b: second_result,
        loaded_a,
        loaded_b,
        first: NodeRef::new(main, first),
        second: NodeRef::new(main, second),
    }
}

/// `id(p) { return p; }` called three times with distinct locals
pub struct IdentityCalls {
    pub program: Program,
    pub args: [ValueId; 3],
    pub results: [ValueId; 3],
    pub sites: [NodeRef; 3],
}

pub fn identity_calls() -> IdentityCalls {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let id = b.declare_function("id", &[true], true);
    let int = b.layouts_mut().scalar(4);
    let param = b.param(id, 0);
    let id_value = b.function_value(id);

    let args = [
        b.local(main, "x", true),
        b.local(main, "y", true),
        b.local(main, "z", true),
    ];
    let results = [
        b.local(main, "r0", true),
        b.local(main, "r1", true),
        b.local(main, "r2", true),
    ];

    let mut body = b.body(id);
    body.ret(Some(param));
    b.define(id, body);

    let mut body = b.body(main);
    for &arg in &args {
        body.alloc(arg, int);
    }
    let mut sites = [NodeRef::new(main, fscs_pta::NodeId(0)); 3];
    for i in 0..3 {
        let node = body.call(Some(results[i]), id_value, &[args[i]]);
        sites[i] = NodeRef::new(main, node);
    }
    body.ret(None);
    b.define(main, body);

    IdentityCalls {
        program: b.build().expect("valid program"),
        args,
        results,
        sites,
    }
}

/// An indirect call through a pointer forged from an integer. Four
/// address-taken candidates; only `f1` and `f2` match the call's shape.
pub struct UniversalCall {
    pub program: Program,
    pub site: NodeRef,
    pub f1: FunctionId,
    pub f2: FunctionId,
    pub result: ValueId,
    pub arg: ValueId,
}

pub fn universal_call() -> UniversalCall {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let f1 = b.declare_function("f1", &[true], true);
    let f2 = b.declare_function("f2", &[true], true);
    let two_args = b.declare_function("two_args", &[true, true], true);
    let no_ret = b.declare_function("no_ret", &[true], false);
    for f in [f1, f2, two_args, no_ret] {
        b.set_address_taken(f);
    }

    let int = b.layouts_mut().scalar(4);
    let forged = b.int_to_ptr();
    let fp = b.local(main, "fp", true);
    let x = b.local(main, "x", true);
    let result = b.local(main, "r", true);

    for f in [f1, f2] {
        let param = b.param(f, 0);
        let mut body = b.body(f);
        body.ret(Some(param));
        b.define(f, body);
    }
    let mut body = b.body(no_ret);
    body.ret(None);
    b.define(no_ret, body);
    let param = b.param(two_args, 1);
    let mut body = b.body(two_args);
    body.ret(Some(param));
    b.define(two_args, body);

    let mut body = b.body(main);
    body.alloc(x, int);
    body.copy(fp, &[forged]);
    let site = body.call(Some(result), fp, &[x]);
    body.ret(None);
    b.define(main, body);

    UniversalCall {
        program: b.build().expect("valid program"),
        site: NodeRef::new(main, site),
        f1,
        f2,
        result,
        arg: x,
    }
}


/// A loop that rewrites one cell, then a self-recursive call:
///
/// ```text
/// main: cell = &x; loop { t = *cell; *cell = &y; } r = rec(t); u = *cell;
/// rec(p): if .. { s = rec(p) } return phi(p, s);
/// ```
pub struct LoopRecursion {
    pub program: Program,
    pub x: ValueId,
    pub y: ValueId,
    pub t: ValueId,
    pub r: ValueId,
    pub u: ValueId,
    pub p: ValueId,
    pub s: ValueId,
}

impl LoopRecursion {
    pub fn pointer_values(&self) -> [ValueId; 7] {
        [self.x, self.y, self.t, self.r, self.u, self.p, self.s]
    }
}

pub fn loop_recursion() -> LoopRecursion {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let rec = b.declare_function("rec", &[true], true);
    let ptr = b.layouts_mut().pointer(8);
    let int = b.layouts_mut().scalar(4);
    let p = b.param(rec, 0);
    let s = b.local(rec, "s", true);
    let merged = b.phi("merged", &[p, s]);
    let x = b.local(main, "x", true);
    let y = b.local(main, "y", true);
    let cell = b.local(main, "cell", true);
    let t = b.local(main, "t", true);
    let r = b.local(main, "r", true);
    let u = b.local(main, "u", true);
    let rec_value = b.function_value(rec);

    let mut body = b.body(rec);
    let entry = body.entry().expect("fresh body has an entry");
    body.call(Some(s), rec_value, &[p]);
    let ret = body.ret(Some(merged));
    body.add_edge(entry, ret);
    b.define(rec, body);

    let mut body = b.body(main);
    body.alloc(x, int);
    body.alloc(y, int);
    body.alloc(cell, ptr);
    body.store(cell, x);
    let head = body.load(t, cell);
    let latch = body.store(cell, y);
    body.add_edge(latch, head);
    body.call(Some(r), rec_value, &[t]);
    body.load(u, cell);
    body.ret(None);
    b.define(main, body);

    LoopRecursion {
        program: b.build().expect("valid program"),
        x,
        y,
        t,
        r,
        u,
        p,
        s,
    }
}
