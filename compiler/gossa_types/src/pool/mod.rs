//! The type pool: one arena holding every type of a program.
//!
//! # Storage
//!
//! - `items[i]`: tag + data word of type `i`
//! - `flags[i]`: pre-computed [`TypeFlags`]
//! - `extra`: variable-length payloads (struct fields, signatures, ...)
//! - `named` / `type_params`: side tables for nominal types, which are never
//!   hash-consed
//!
//! Structural types are interned: constructing the same shape twice returns
//! the same [`Idx`]. Named types and type parameters allocate a fresh index
//! per declaration. Generic instances go through the instance cache keyed by
//! `(template, type arguments)`.

mod construct;
mod format;

use gossa_ir::{FuncId, Name, SharedInterner, StringInterner};
use rustc_hash::FxHashMap;

use crate::{ChanDir, Idx, Item, Tag, TypeFlags};

/// A struct field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: Name,
    pub ty: Idx,
    /// Anonymous (embedded) field.
    pub embedded: bool,
    /// Struct tag text, `Name::EMPTY` when absent.
    pub tag: Name,
}

impl Field {
    pub fn new(name: Name, ty: Idx) -> Self {
        Field {
            name,
            ty,
            embedded: false,
            tag: Name::EMPTY,
        }
    }

    pub fn embedded(name: Name, ty: Idx) -> Self {
        Field {
            name,
            ty,
            embedded: true,
            tag: Name::EMPTY,
        }
    }
}

/// An interface method: name and signature (without receiver).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IfaceMethod {
    pub name: Name,
    pub sig: Idx,
}

/// One term of a union constraint: `T` or `~T`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnionTerm {
    pub tilde: bool,
    pub ty: Idx,
}

/// A method declared on a named type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Method {
    pub name: Name,
    /// The declaration. `None` for methods the runtime provides natively
    /// (`runtime.Error.Error`).
    pub func: Option<FuncId>,
    /// Signature without receiver. For instances of a generic type this is
    /// already substituted with the instance's type arguments.
    pub sig: Idx,
    /// Declared with a pointer receiver.
    pub ptr_recv: bool,
}

/// Side-table entry for a named type.
#[derive(Clone, Debug)]
pub struct NamedInfo {
    /// Package name used for rendering (`main`), `Name::EMPTY` for
    /// predeclared types.
    pub pkg: Name,
    pub name: Name,
    /// `Idx::NONE` until [`Pool::set_underlying`] runs.
    pub underlying: Idx,
    /// Declared type parameters (generic templates only).
    pub type_params: Vec<Idx>,
    /// Type arguments (instances only).
    pub type_args: Vec<Idx>,
    /// The generic template this is an instance of.
    pub origin: Option<Idx>,
    pub methods: Vec<Method>,
}

impl NamedInfo {
    /// A template with type parameters and no arguments.
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty() && self.origin.is_none()
    }
}

/// Side-table entry for a type parameter.
#[derive(Copy, Clone, Debug)]
pub struct TypeParamInfo {
    pub name: Name,
    /// Position in the declaring type/function's parameter list.
    pub index: u32,
    /// Constraint interface.
    pub constraint: Idx,
}

/// Unified storage for all types.
#[derive(Clone)]
pub struct Pool {
    items: Vec<Item>,
    flags: Vec<TypeFlags>,
    extra: Vec<u32>,
    intern_map: FxHashMap<(Tag, Box<[u32]>), Idx>,
    named: Vec<NamedInfo>,
    type_params: Vec<TypeParamInfo>,
    /// `(template, args) -> instance`.
    instances: FxHashMap<(Idx, Box<[Idx]>), Idx>,
    /// `template -> instances`, for deferred underlying/method propagation.
    instances_of: FxHashMap<Idx, Vec<Idx>>,
    interner: SharedInterner,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create a pool with its own interner.
    pub fn new() -> Self {
        Self::with_interner(StringInterner::shared())
    }

    /// Create a pool that shares the front end's interner.
    pub fn with_interner(interner: SharedInterner) -> Self {
        let mut pool = Pool {
            items: Vec::with_capacity(256),
            flags: Vec::with_capacity(256),
            extra: Vec::with_capacity(1024),
            intern_map: FxHashMap::default(),
            named: Vec::new(),
            type_params: Vec::new(),
            instances: FxHashMap::default(),
            instances_of: FxHashMap::default(),
            interner,
        };
        pool.init_predeclared();
        pool
    }

    fn init_predeclared(&mut self) {
        for tag in Tag::BASICS {
            self.items.push(Item::basic(tag));
            self.flags.push(TypeFlags::for_basic(tag));
        }

        let error_name = self.interner.intern("Error");
        let empty = self.tuple(&[]);
        debug_assert_eq!(empty, Idx::EMPTY_TUPLE);
        let error_sig = self.signature(&[], &[Idx::STRING], false);
        debug_assert_eq!(error_sig, Idx::ERROR_SIG);
        let error_iface = self.interface(
            &[IfaceMethod {
                name: error_name,
                sig: error_sig,
            }],
            None,
        );
        debug_assert_eq!(error_iface, Idx::ERROR_IFACE);
        let any = self.interface(&[], None);
        debug_assert_eq!(any, Idx::ANY);

        let error = self.new_named(Name::EMPTY, self.interner.intern("error"));
        self.set_underlying(error, error_iface);
        debug_assert_eq!(error, Idx::ERROR);

        let runtime = self.interner.intern("runtime");
        let rt_error = self.new_named(runtime, error_name);
        self.set_underlying(rt_error, Idx::STRING);
        self.add_method(
            rt_error,
            Method {
                name: error_name,
                func: None,
                sig: error_sig,
                ptr_recv: false,
            },
        );
        debug_assert_eq!(rt_error, Idx::RUNTIME_ERROR);

        while self.items.len() < Idx::FIRST_DYNAMIC as usize {
            self.items.push(Item::basic(Tag::Reserved));
            self.flags.push(TypeFlags::empty());
        }
    }

    // === Raw access ===

    /// Number of types in the pool (including the reserved range).
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The pool always contains the predeclared types.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn item(&self, idx: Idx) -> Item {
        self.items[idx.index()]
    }

    #[inline]
    pub fn tag(&self, idx: Idx) -> Tag {
        self.items[idx.index()].tag
    }

    #[inline]
    pub fn data(&self, idx: Idx) -> u32 {
        self.items[idx.index()].data
    }

    #[inline]
    pub fn flags(&self, idx: Idx) -> TypeFlags {
        self.flags[idx.index()]
    }

    #[inline]
    pub(crate) fn extra_at(&self, offset: usize) -> u32 {
        self.extra[offset]
    }

    #[inline]
    fn extra_start(&self, idx: Idx) -> usize {
        debug_assert!(self.tag(idx).uses_extra(), "{:?} has no extra data", self.tag(idx));
        self.data(idx) as usize
    }

    /// The interner used for every `Name` stored in the pool.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Resolve a name through the pool's interner.
    pub fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Intern a string through the pool's interner.
    pub fn intern_name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    // === Interning ===

    fn push(&mut self, item: Item, flags: TypeFlags) -> Idx {
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(item);
        self.flags.push(flags);
        idx
    }

    pub(crate) fn intern_single(&mut self, tag: Tag, child: Idx, flags: TypeFlags) -> Idx {
        let key = (tag, vec![child.raw()].into_boxed_slice());
        if let Some(&idx) = self.intern_map.get(&key) {
            return idx;
        }
        let idx = self.push(Item::new(tag, child.raw()), flags);
        self.intern_map.insert(key, idx);
        idx
    }

    pub(crate) fn intern_extra(&mut self, tag: Tag, payload: Vec<u32>, flags: TypeFlags) -> Idx {
        let key = (tag, payload.into_boxed_slice());
        if let Some(&idx) = self.intern_map.get(&key) {
            return idx;
        }
        let start = self.extra.len() as u32;
        self.extra.extend_from_slice(&key.1);
        let idx = self.push(Item::new(tag, start), flags);
        self.intern_map.insert(key, idx);
        idx
    }

    // === Named types and type parameters ===

    /// Allocate a fresh named type. Its underlying type is assigned later
    /// with [`Pool::set_underlying`].
    pub fn new_named(&mut self, pkg: Name, name: Name) -> Idx {
        let slot = self.named.len() as u32;
        self.named.push(NamedInfo {
            pkg,
            name,
            underlying: Idx::NONE,
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
            methods: Vec::new(),
        });
        self.push(Item::new(Tag::Named, slot), TypeFlags::IS_NAMED)
    }

    /// Assign the underlying type of a named type. Happens exactly once per
    /// named type; instances created before this call receive their
    /// substituted underlying type now.
    pub fn set_underlying(&mut self, named: Idx, underlying: Idx) {
        let underlying = self.underlying(underlying);
        let slot = self.named_slot(named);
        debug_assert!(
            self.named[slot].underlying.is_none(),
            "underlying type of {} assigned twice",
            self.format_type(named)
        );
        self.named[slot].underlying = underlying;
        let category = self.flags(underlying).intersection(TypeFlags::CATEGORY_MASK);
        self.flags[named.index()] |= category;

        let pending: Vec<Idx> = self
            .instances_of
            .get(&named)
            .map(|v| {
                v.iter()
                    .copied()
                    .filter(|&i| self.named_info(i).underlying.is_none())
                    .collect()
            })
            .unwrap_or_default();
        for inst in pending {
            self.complete_instance(inst);
        }
    }

    /// Attach the type parameters of a generic named type.
    pub fn set_type_params(&mut self, named: Idx, params: Vec<Idx>) {
        let slot = self.named_slot(named);
        self.named[slot].type_params = params;
    }

    /// Declare a method on a named type. Existing instances of a generic
    /// template receive the substituted method as well.
    pub fn add_method(&mut self, named: Idx, method: Method) {
        let slot = self.named_slot(named);
        self.named[slot].methods.push(method);

        let instances = self.instances_of.get(&named).cloned().unwrap_or_default();
        for inst in instances {
            let substituted = self.instance_method(inst, method);
            let slot = self.named_slot(inst);
            self.named[slot].methods.push(substituted);
        }
    }

    /// Allocate a fresh type parameter.
    pub fn new_type_param(&mut self, name: Name, index: u32, constraint: Idx) -> Idx {
        let slot = self.type_params.len() as u32;
        self.type_params.push(TypeParamInfo {
            name,
            index,
            constraint,
        });
        self.push(Item::new(Tag::TypeParam, slot), TypeFlags::HAS_TYPE_PARAM)
    }

    /// Replace the constraint of a type parameter (constraints may refer to
    /// the parameter itself, so they are often known only after allocation).
    pub fn set_constraint(&mut self, param: Idx, constraint: Idx) {
        debug_assert_eq!(self.tag(param), Tag::TypeParam);
        let slot = self.data(param) as usize;
        self.type_params[slot].constraint = constraint;
    }

    fn named_slot(&self, named: Idx) -> usize {
        debug_assert_eq!(self.tag(named), Tag::Named, "not a named type");
        self.data(named) as usize
    }

    /// Side-table entry of a named type.
    #[inline]
    pub fn named_info(&self, named: Idx) -> &NamedInfo {
        &self.named[self.named_slot(named)]
    }

    /// Side-table entry of a type parameter.
    #[inline]
    pub fn type_param_info(&self, param: Idx) -> TypeParamInfo {
        debug_assert_eq!(self.tag(param), Tag::TypeParam);
        self.type_params[self.data(param) as usize]
    }

    /// Look up a cached instance without creating it.
    pub fn cached_instance(&self, template: Idx, args: &[Idx]) -> Option<Idx> {
        self.instances
            .get(&(template, args.to_vec().into_boxed_slice()))
            .copied()
    }

    pub(crate) fn record_instance(&mut self, template: Idx, args: &[Idx], inst: Idx) {
        self.instances
            .insert((template, args.to_vec().into_boxed_slice()), inst);
        self.instances_of.entry(template).or_default().push(inst);
    }

    pub(crate) fn alloc_instance(&mut self, template: Idx, args: &[Idx]) -> Idx {
        let info = self.named_info(template);
        let (pkg, name) = (info.pkg, info.name);
        let slot = self.named.len() as u32;
        self.named.push(NamedInfo {
            pkg,
            name,
            underlying: Idx::NONE,
            type_params: Vec::new(),
            type_args: args.to_vec(),
            origin: Some(template),
            methods: Vec::new(),
        });
        let flags = TypeFlags::IS_NAMED | TypeFlags::propagate_all(args.iter().map(|&a| self.flags(a)));
        self.push(Item::new(Tag::Named, slot), flags)
    }

    pub(crate) fn set_instance_parts(&mut self, inst: Idx, underlying: Idx, methods: Vec<Method>) {
        let slot = self.named_slot(inst);
        self.named[slot].underlying = underlying;
        self.named[slot].methods = methods;
        if !underlying.is_none() {
            let category = self.flags(underlying).intersection(TypeFlags::CATEGORY_MASK);
            self.flags[inst.index()] |= category;
        }
    }

    // === Queries ===

    /// The underlying type. Named types resolve to their declared
    /// underlying type (`INVALID` while unset), type parameters to the
    /// underlying type of their constraint, everything else to itself.
    pub fn underlying(&self, idx: Idx) -> Idx {
        match self.tag(idx) {
            Tag::Named => {
                let u = self.named_info(idx).underlying;
                if u.is_none() {
                    Idx::INVALID
                } else {
                    u
                }
            }
            Tag::TypeParam => {
                let c = self.type_param_info(idx).constraint;
                if c.is_none() {
                    Idx::ANY
                } else {
                    self.underlying(c)
                }
            }
            _ => idx,
        }
    }

    /// Tag of the underlying type.
    #[inline]
    pub fn under_tag(&self, idx: Idx) -> Tag {
        self.tag(self.underlying(idx))
    }

    /// Basic kind of the underlying type, if it is basic.
    pub fn basic_kind(&self, idx: Idx) -> Option<Tag> {
        let tag = self.under_tag(idx);
        tag.is_basic().then_some(tag)
    }

    #[inline]
    pub fn is_named(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Named
    }

    #[inline]
    pub fn is_interface(&self, idx: Idx) -> bool {
        self.under_tag(idx) == Tag::Interface
    }

    #[inline]
    pub fn is_type_param(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::TypeParam
    }

    /// Element type of a pointer, slice, array, map (value) or channel.
    /// Strings yield `byte`.
    pub fn elem(&self, idx: Idx) -> Idx {
        let u = self.underlying(idx);
        match self.tag(u) {
            Tag::Pointer | Tag::Slice => self.item(u).child(),
            Tag::Array => Idx::from_raw(self.extra_at(self.extra_start(u) + 2)),
            Tag::Map => Idx::from_raw(self.extra_at(self.extra_start(u) + 1)),
            Tag::Chan => Idx::from_raw(self.extra_at(self.extra_start(u) + 1)),
            Tag::String | Tag::UntypedString => Idx::BYTE,
            tag => panic!("elem of non-container type {tag}"),
        }
    }

    /// Pointer base type, or the type itself if it is not a pointer.
    pub fn deref(&self, idx: Idx) -> Idx {
        let u = self.underlying(idx);
        if self.tag(u) == Tag::Pointer {
            self.item(u).child()
        } else {
            idx
        }
    }

    /// Key type of a map.
    pub fn key(&self, idx: Idx) -> Idx {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Map);
        Idx::from_raw(self.extra_at(self.extra_start(u)))
    }

    /// Length of an array type.
    pub fn array_len(&self, idx: Idx) -> u64 {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Array);
        let start = self.extra_start(u);
        u64::from(self.extra_at(start)) | (u64::from(self.extra_at(start + 1)) << 32)
    }

    /// Direction of a channel type.
    pub fn chan_dir(&self, idx: Idx) -> ChanDir {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Chan);
        ChanDir::from_raw(self.extra_at(self.extra_start(u)))
    }

    /// Number of fields of a struct type.
    pub fn num_fields(&self, idx: Idx) -> usize {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Struct);
        self.extra_at(self.extra_start(u)) as usize
    }

    /// Field `i` of a struct type.
    pub fn field(&self, idx: Idx, i: usize) -> Field {
        let u = self.underlying(idx);
        let base = self.extra_start(u) + 1 + i * 4;
        Field {
            name: Name::from_raw(self.extra_at(base)),
            ty: Idx::from_raw(self.extra_at(base + 1)),
            embedded: self.extra_at(base + 2) != 0,
            tag: Name::from_raw(self.extra_at(base + 3)),
        }
    }

    /// All fields of a struct type, in declaration order.
    pub fn fields(&self, idx: Idx) -> Vec<Field> {
        (0..self.num_fields(idx)).map(|i| self.field(idx, i)).collect()
    }

    /// Parameter types of a signature. A variadic final parameter is
    /// reported as its slice type.
    pub fn params(&self, sig: Idx) -> Vec<Idx> {
        let u = self.underlying(sig);
        debug_assert_eq!(self.tag(u), Tag::Signature);
        let start = self.extra_start(u);
        let np = self.extra_at(start + 1) as usize;
        (0..np)
            .map(|i| Idx::from_raw(self.extra_at(start + 2 + i)))
            .collect()
    }

    /// Result types of a signature.
    pub fn results(&self, sig: Idx) -> Vec<Idx> {
        let u = self.underlying(sig);
        debug_assert_eq!(self.tag(u), Tag::Signature);
        let start = self.extra_start(u);
        let np = self.extra_at(start + 1) as usize;
        let nr = self.extra_at(start + 2 + np) as usize;
        (0..nr)
            .map(|i| Idx::from_raw(self.extra_at(start + 3 + np + i)))
            .collect()
    }

    /// The final parameter is `...T`.
    pub fn is_variadic(&self, sig: Idx) -> bool {
        let u = self.underlying(sig);
        debug_assert_eq!(self.tag(u), Tag::Signature);
        self.extra_at(self.extra_start(u)) != 0
    }

    /// Element types of a tuple.
    pub fn tuple_elems(&self, idx: Idx) -> Vec<Idx> {
        debug_assert_eq!(self.tag(idx), Tag::Tuple);
        let start = self.extra_start(idx);
        let n = self.extra_at(start) as usize;
        (0..n)
            .map(|i| Idx::from_raw(self.extra_at(start + 1 + i)))
            .collect()
    }

    /// Methods of an interface type, sorted by name.
    pub fn interface_methods(&self, idx: Idx) -> Vec<IfaceMethod> {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Interface);
        let start = self.extra_start(u);
        let n = self.extra_at(start) as usize;
        (0..n)
            .map(|i| IfaceMethod {
                name: Name::from_raw(self.extra_at(start + 1 + i * 2)),
                sig: Idx::from_raw(self.extra_at(start + 2 + i * 2)),
            })
            .collect()
    }

    /// Type set of a constraint interface (`Idx::NONE` for an ordinary
    /// method-only interface).
    pub fn interface_type_set(&self, idx: Idx) -> Idx {
        let u = self.underlying(idx);
        debug_assert_eq!(self.tag(u), Tag::Interface);
        let start = self.extra_start(u);
        let n = self.extra_at(start) as usize;
        Idx::from_raw(self.extra_at(start + 1 + n * 2))
    }

    /// Terms of a union.
    pub fn union_terms(&self, idx: Idx) -> Vec<UnionTerm> {
        debug_assert_eq!(self.tag(idx), Tag::Union);
        let start = self.extra_start(idx);
        let n = self.extra_at(start) as usize;
        (0..n)
            .map(|i| UnionTerm {
                tilde: self.extra_at(start + 1 + i * 2) != 0,
                ty: Idx::from_raw(self.extra_at(start + 2 + i * 2)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
