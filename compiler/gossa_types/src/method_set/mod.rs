//! Method-set computation with embedding promotion.
//!
//! A method set is computed by a breadth-first walk over embedded fields.
//! Each level of the walk is one embedding depth:
//!
//! - a method found at a shallower depth hides every deeper method of the
//!   same name
//! - two methods of the same name at the same depth cancel each other and
//!   also hide deeper ones
//! - a named type already visited at a shallower depth is skipped, which
//!   breaks cycles through embedded pointers (`type T struct{ *T }`); the
//!   same type embedded twice at one depth collides with itself
//!
//! Results are cached per type in a [`MethodSets`] table.

use std::cell::RefCell;
use std::rc::Rc;

use gossa_ir::{FuncId, Name};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{Idx, Pool, Tag};

/// Where a promoted or declared method is implemented.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MethodTarget {
    /// A method declared on `recv` (a named type, possibly a generic
    /// instance). `func` is `None` for runtime-provided methods.
    Concrete {
        func: Option<FuncId>,
        recv: Idx,
        ptr_recv: bool,
    },
    /// A method of an embedded interface field; calls dispatch dynamically
    /// on the field's value.
    Interface { iface: Idx },
}

/// One entry of a method set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodEntry {
    pub name: Name,
    /// Signature without receiver.
    pub sig: Idx,
    pub target: MethodTarget,
    /// Field indices from the outer type down to the embedded field that
    /// declares the method. Empty for directly declared methods.
    pub path: SmallVec<[u32; 4]>,
    /// The walk dereferenced a pointer to reach the declaring type, either
    /// because the outer type is a pointer or through an embedded pointer.
    pub indirect: bool,
}

impl MethodEntry {
    /// Pointer-receiver methods are only in the set when the receiver is
    /// reachable through a pointer.
    fn in_set(&self) -> bool {
        match self.target {
            MethodTarget::Concrete { ptr_recv, .. } => !ptr_recv || self.indirect,
            MethodTarget::Interface { .. } => true,
        }
    }
}

/// The methods callable on values of one type, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodSet {
    entries: Vec<MethodEntry>,
}

impl MethodSet {
    pub fn entries(&self) -> &[MethodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a method by name.
    pub fn lookup(&self, name: Name) -> Option<&MethodEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Per-type method-set cache.
///
/// Uses `RefCell` so lookups work through a shared reference; the
/// interpreter consults it on every interface call.
#[derive(Default)]
pub struct MethodSets {
    cache: RefCell<FxHashMap<Idx, Rc<MethodSet>>>,
}

/// A node on the breadth-first embedding walk.
struct Candidate {
    ty: Idx,
    path: SmallVec<[u32; 4]>,
    indirect: bool,
}

/// Outcome for one method name at one depth.
enum Found {
    One(MethodEntry),
    Collision,
}

impl MethodSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Method set of `ty`. For `*T` this includes pointer-receiver methods
    /// of `T`; for interfaces it is the interface's own method list.
    pub fn method_set(&self, pool: &Pool, ty: Idx) -> Rc<MethodSet> {
        if let Some(cached) = self.cache.borrow().get(&ty) {
            return Rc::clone(cached);
        }
        let set = Rc::new(Self::compute(pool, ty));
        self.cache.borrow_mut().insert(ty, Rc::clone(&set));
        set
    }

    /// Find method `name` of `ty`.
    pub fn lookup(&self, pool: &Pool, ty: Idx, name: Name) -> Option<MethodEntry> {
        self.method_set(pool, ty).lookup(name).cloned()
    }

    /// Number of cached method sets.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    fn compute(pool: &Pool, ty: Idx) -> MethodSet {
        if pool.is_interface(ty) {
            let entries = pool
                .interface_methods(ty)
                .into_iter()
                .map(|m| MethodEntry {
                    name: m.name,
                    sig: m.sig,
                    target: MethodTarget::Interface { iface: ty },
                    path: SmallVec::new(),
                    indirect: false,
                })
                .collect();
            return MethodSet { entries };
        }

        let (start, indirect) = match pool.tag(ty) {
            Tag::Pointer => (pool.elem(ty), true),
            _ => (ty, false),
        };
        // `*I` where I is an interface has no methods.
        if indirect && pool.is_interface(start) {
            return MethodSet::default();
        }

        let mut result: FxHashMap<Name, Option<MethodEntry>> = FxHashMap::default();
        let mut visited: FxHashSet<Idx> = FxHashSet::default();
        let mut current = vec![Candidate {
            ty: start,
            path: SmallVec::new(),
            indirect,
        }];

        while !current.is_empty() {
            let mut level: FxHashMap<Name, Found> = FxHashMap::default();
            let mut this_level: FxHashSet<Idx> = FxHashSet::default();
            let mut next = Vec::new();

            for cand in current {
                let mut ty = cand.ty;
                if pool.is_named(ty) {
                    if visited.contains(&ty) {
                        continue;
                    }
                    this_level.insert(ty);
                    for m in &pool.named_info(ty).methods {
                        Self::record(
                            &mut level,
                            MethodEntry {
                                name: m.name,
                                sig: m.sig,
                                target: MethodTarget::Concrete {
                                    func: m.func,
                                    recv: ty,
                                    ptr_recv: m.ptr_recv,
                                },
                                path: cand.path.clone(),
                                indirect: cand.indirect,
                            },
                        );
                    }
                    ty = pool.underlying(ty);
                }

                match pool.tag(ty) {
                    Tag::Struct => {
                        for (i, field) in pool.fields(ty).into_iter().enumerate() {
                            if !field.embedded {
                                continue;
                            }
                            let (fty, through_ptr) = if pool.tag(field.ty) == Tag::Pointer {
                                (pool.elem(field.ty), true)
                            } else {
                                (field.ty, false)
                            };
                            let mut path = cand.path.clone();
                            path.push(i as u32);
                            next.push(Candidate {
                                ty: fty,
                                path,
                                indirect: cand.indirect || through_ptr,
                            });
                        }
                    }
                    // Embedded interface field: its methods are promoted.
                    Tag::Interface if !cand.path.is_empty() => {
                        for m in pool.interface_methods(ty) {
                            Self::record(
                                &mut level,
                                MethodEntry {
                                    name: m.name,
                                    sig: m.sig,
                                    target: MethodTarget::Interface { iface: cand.ty },
                                    path: cand.path.clone(),
                                    indirect: cand.indirect,
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }

            for (name, found) in level {
                result.entry(name).or_insert(match found {
                    Found::One(entry) => Some(entry),
                    Found::Collision => None,
                });
            }
            visited.extend(this_level);
            current = next;
        }

        let mut entries: Vec<MethodEntry> = result
            .into_values()
            .flatten()
            .filter(MethodEntry::in_set)
            .collect();
        entries.sort_by(|a, b| pool.name_str(a.name).cmp(pool.name_str(b.name)));
        MethodSet { entries }
    }

    fn record(level: &mut FxHashMap<Name, Found>, entry: MethodEntry) {
        match level.get_mut(&entry.name) {
            None => {
                level.insert(entry.name, Found::One(entry));
            }
            Some(slot) => *slot = Found::Collision,
        }
    }
}

#[cfg(test)]
mod tests;
