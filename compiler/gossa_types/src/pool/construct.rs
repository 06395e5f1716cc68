//! Type construction helpers for the Pool.
//!
//! Every constructor hash-conses: building the same shape twice returns the
//! same [`Idx`].

use gossa_ir::Name;

use super::{Field, IfaceMethod, UnionTerm};
use crate::{ChanDir, Idx, Pool, Tag, TypeFlags};

impl Pool {
    fn child_flags(&self, children: impl IntoIterator<Item = Idx>) -> TypeFlags {
        TypeFlags::propagate_all(
            children
                .into_iter()
                .filter(|c| !c.is_none())
                .map(|c| self.flags(c)),
        )
    }

    // === Single-child constructors ===

    /// `*elem`
    pub fn pointer(&mut self, elem: Idx) -> Idx {
        let flags = TypeFlags::HAS_NIL | self.child_flags([elem]);
        self.intern_single(Tag::Pointer, elem, flags)
    }

    /// `[]elem`
    pub fn slice(&mut self, elem: Idx) -> Idx {
        let flags = TypeFlags::HAS_NIL | self.child_flags([elem]);
        self.intern_single(Tag::Slice, elem, flags)
    }

    // === Extra-array constructors ===

    /// `[len]elem`
    pub fn array(&mut self, elem: Idx, len: u64) -> Idx {
        let flags = self.child_flags([elem]);
        let payload = vec![len as u32, (len >> 32) as u32, elem.raw()];
        self.intern_extra(Tag::Array, payload, flags)
    }

    /// `map[key]value`
    pub fn map(&mut self, key: Idx, value: Idx) -> Idx {
        let flags = TypeFlags::HAS_NIL | self.child_flags([key, value]);
        self.intern_extra(Tag::Map, vec![key.raw(), value.raw()], flags)
    }

    /// `chan elem`, `chan<- elem` or `<-chan elem`
    pub fn chan(&mut self, dir: ChanDir, elem: Idx) -> Idx {
        let flags = TypeFlags::HAS_NIL | self.child_flags([elem]);
        self.intern_extra(Tag::Chan, vec![dir as u32, elem.raw()], flags)
    }

    /// Multi-value result type. A one-element list is still a tuple.
    pub fn tuple(&mut self, elems: &[Idx]) -> Idx {
        let mut payload = Vec::with_capacity(elems.len() + 1);
        payload.push(elems.len() as u32);
        payload.extend(elems.iter().map(|e| e.raw()));
        let flags = self.child_flags(elems.iter().copied());
        self.intern_extra(Tag::Tuple, payload, flags)
    }

    /// Function signature without receiver. When `variadic` is set the last
    /// parameter must be a slice type.
    pub fn signature(&mut self, params: &[Idx], results: &[Idx], variadic: bool) -> Idx {
        debug_assert!(
            !variadic || params.last().is_some_and(|&p| self.tag(p) == Tag::Slice),
            "variadic signature needs a trailing slice parameter"
        );
        let mut payload = Vec::with_capacity(params.len() + results.len() + 3);
        payload.push(u32::from(variadic));
        payload.push(params.len() as u32);
        payload.extend(params.iter().map(|p| p.raw()));
        payload.push(results.len() as u32);
        payload.extend(results.iter().map(|r| r.raw()));
        let flags = TypeFlags::HAS_NIL | self.child_flags(params.iter().chain(results).copied());
        self.intern_extra(Tag::Signature, payload, flags)
    }

    /// Struct type. Field order, names, types, embedding and tags all take
    /// part in identity.
    pub fn struct_type(&mut self, fields: &[Field]) -> Idx {
        let mut payload = Vec::with_capacity(fields.len() * 4 + 1);
        payload.push(fields.len() as u32);
        for f in fields {
            payload.extend([f.name.raw(), f.ty.raw(), u32::from(f.embedded), f.tag.raw()]);
        }
        let flags = self.child_flags(fields.iter().map(|f| f.ty));
        self.intern_extra(Tag::Struct, payload, flags)
    }

    /// Interface type with an explicit (already flattened) method list and an
    /// optional type set. Methods are canonicalized by sorting on name.
    pub fn interface(&mut self, methods: &[IfaceMethod], type_set: Option<Idx>) -> Idx {
        let mut sorted = methods.to_vec();
        sorted.sort_by(|a, b| self.name_str(a.name).cmp(self.name_str(b.name)));
        sorted.dedup_by_key(|m| m.name);

        let type_set = type_set.unwrap_or(Idx::NONE);
        let mut payload = Vec::with_capacity(sorted.len() * 2 + 2);
        payload.push(sorted.len() as u32);
        for m in &sorted {
            payload.extend([m.name.raw(), m.sig.raw()]);
        }
        payload.push(type_set.raw());
        let flags = TypeFlags::IS_INTERFACE
            | TypeFlags::HAS_NIL
            | self.child_flags(sorted.iter().map(|m| m.sig).chain([type_set]));
        self.intern_extra(Tag::Interface, payload, flags)
    }

    /// Interface with embedded interfaces flattened into its method list.
    pub fn interface_with_embeds(&mut self, methods: &[IfaceMethod], embeds: &[Idx]) -> Idx {
        let mut all = methods.to_vec();
        for &e in embeds {
            all.extend(self.interface_methods(e));
        }
        self.interface(&all, None)
    }

    /// `~A | B | ...`
    pub fn union(&mut self, terms: &[UnionTerm]) -> Idx {
        let mut payload = Vec::with_capacity(terms.len() * 2 + 1);
        payload.push(terms.len() as u32);
        for t in terms {
            payload.extend([u32::from(t.tilde), t.ty.raw()]);
        }
        let flags = self.child_flags(terms.iter().map(|t| t.ty));
        self.intern_extra(Tag::Union, payload, flags)
    }

    /// Constraint interface `interface{ ~A | B }`.
    pub fn constraint(&mut self, terms: &[UnionTerm]) -> Idx {
        let union = self.union(terms);
        self.interface(&[], Some(union))
    }

    /// Declare a named type and assign its underlying type in one step.
    pub fn named(&mut self, pkg: &str, name: &str, underlying: Idx) -> Idx {
        let pkg = self.intern_name(pkg);
        let name: Name = self.intern_name(name);
        let idx = self.new_named(pkg, name);
        self.set_underlying(idx, underlying);
        idx
    }
}
