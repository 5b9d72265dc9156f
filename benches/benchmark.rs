//! Benchmarks of endor-shared.
//!
//! Each operation is measured against its `std::rc` counterpart, which serves as the performance goal.

use std::rc::{Rc, Weak};

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use endor_shared::{make_shared, SelfSlot, SharedFromSelf, StrongRef, WeakRef};

criterion_main!(construction, handles, self_aware);

const HANDLES: usize = 1024;

criterion_group!(construction, construction_rc, construction_in_place, construction_owning);

//  Time to construct then drop a shared value, the control for the in place strategy.
fn construction_rc(c: &mut Criterion) {
    c.bench_function("construction rc", |b| b.iter(|| black_box(Rc::new(black_box(42u64)))));
}

//  Time to construct then drop a shared value within its control block.
fn construction_in_place(c: &mut Criterion) {
    c.bench_function("construction in place", |b| {
        b.iter(|| black_box(make_shared(black_box(42u64))))
    });
}

//  Time to construct then drop a shared value in its own allocation, hence two allocations.
fn construction_owning(c: &mut Criterion) {
    c.bench_function("construction owning", |b| {
        b.iter(|| black_box(StrongRef::from_box(Box::new(black_box(42u64)))))
    });
}

criterion_group!(
    handles,
    clone_rc,
    clone_strong,
    downgrade_rc,
    downgrade_strong,
    upgrade_rc,
    lock_weak,
);

//  Time to clone, then drop, a shared handle `HANDLES` times.
fn clone_rc(c: &mut Criterion) {
    let rc = Rc::new(42u64);

    c.bench_function("clone rc", |b| {
        b.iter_batched_ref(
            || Vec::with_capacity(HANDLES),
            |pool| {
                pool.extend((0..HANDLES).map(|_| Rc::clone(&rc)));
                pool.clear();
            },
            BatchSize::SmallInput,
        )
    });
}

fn clone_strong(c: &mut Criterion) {
    let strong = make_shared(42u64);

    c.bench_function("clone strong", |b| {
        b.iter_batched_ref(
            || Vec::with_capacity(HANDLES),
            |pool| {
                pool.extend((0..HANDLES).map(|_| StrongRef::clone(&strong)));
                pool.clear();
            },
            BatchSize::SmallInput,
        )
    });
}

//  Time to downgrade, then drop, a shared handle `HANDLES` times.
fn downgrade_rc(c: &mut Criterion) {
    let rc = Rc::new(42u64);

    c.bench_function("downgrade rc", |b| {
        b.iter_batched_ref(
            || Vec::with_capacity(HANDLES),
            |pool| {
                pool.extend((0..HANDLES).map(|_| Rc::downgrade(&rc)));
                pool.clear();
            },
            BatchSize::SmallInput,
        )
    });
}

fn downgrade_strong(c: &mut Criterion) {
    let strong = make_shared(42u64);

    c.bench_function("downgrade strong", |b| {
        b.iter_batched_ref(
            || Vec::with_capacity(HANDLES),
            |pool| {
                pool.extend((0..HANDLES).map(|_| StrongRef::downgrade(&strong)));
                pool.clear();
            },
            BatchSize::SmallInput,
        )
    });
}

//  Time to promote a weak handle, then drop the result, `HANDLES` times.
fn upgrade_rc(c: &mut Criterion) {
    let rc = Rc::new(42u64);
    let weak: Weak<u64> = Rc::downgrade(&rc);

    c.bench_function("upgrade rc", |b| {
        b.iter(|| {
            for _ in 0..HANDLES {
                black_box(weak.upgrade());
            }
        })
    });
}

fn lock_weak(c: &mut Criterion) {
    let strong = make_shared(42u64);
    let weak: WeakRef<u64> = StrongRef::downgrade(&strong);

    c.bench_function("lock weak", |b| {
        b.iter(|| {
            for _ in 0..HANDLES {
                black_box(weak.lock());
            }
        })
    });
}

criterion_group!(self_aware, shared_from_self, construction_self_aware);

struct Node {
    slot: SelfSlot<Node>,
    _value: u64,
}

impl Node {
    fn new() -> Self {
        Self {
            slot: SelfSlot::new(),
            _value: 42,
        }
    }
}

impl SharedFromSelf for Node {
    fn self_slot(&self) -> &SelfSlot<Self> {
        &self.slot
    }
}

//  Time to obtain, then drop, a strong handle from the value itself `HANDLES` times.
fn shared_from_self(c: &mut Criterion) {
    let node = StrongRef::new_self_aware(Node::new());

    c.bench_function("shared from self", |b| {
        b.iter(|| {
            for _ in 0..HANDLES {
                black_box(node.shared_from_self());
            }
        })
    });
}

//  Time to construct then drop a self-aware value, including its binding.
fn construction_self_aware(c: &mut Criterion) {
    c.bench_function("construction self-aware", |b| {
        b.iter(|| black_box(StrongRef::new_self_aware(Node::new())))
    });
}
