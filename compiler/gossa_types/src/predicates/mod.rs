//! Type predicates: identity, assignability, comparability, nilness and
//! interface satisfaction.

use gossa_ir::Name;

use crate::{Idx, MethodSets, Pool, Tag, TypeFlags};

/// Why a type does not implement an interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MissingMethod {
    pub name: Name,
    /// A method of that name exists but its signature differs.
    pub wrong_type: bool,
    /// The method exists with a pointer receiver and the type is not a
    /// pointer.
    pub ptr_recv: bool,
}

impl Pool {
    /// Type identity. Structural types are hash-consed and named types are
    /// unique per declaration or instance, so identity is index equality.
    #[inline]
    pub fn identical(&self, a: Idx, b: Idx) -> bool {
        a == b
    }

    /// Whether the zero value of `ty` is `nil`.
    pub fn has_nil(&self, ty: Idx) -> bool {
        if self.is_type_param(ty) {
            return false;
        }
        self.flags(self.underlying(ty)).contains(TypeFlags::HAS_NIL)
    }

    /// Whether values of `ty` support `==` (and so may be map keys).
    pub fn comparable(&self, ty: Idx) -> bool {
        let u = self.underlying(ty);
        match self.tag(u) {
            Tag::Slice | Tag::Map | Tag::Signature | Tag::UntypedNil | Tag::Invalid => false,
            Tag::Struct => self.fields(u).iter().all(|f| self.comparable(f.ty)),
            Tag::Array => self.comparable(self.elem(u)),
            Tag::Interface if self.is_type_param(ty) => {
                let set = self.interface_type_set(u);
                !set.is_none() && self.union_terms(set).iter().all(|t| self.comparable(t.ty))
            }
            _ => true,
        }
    }

    /// Default type of an untyped constant type; other types map to
    /// themselves.
    pub fn default_type(&self, ty: Idx) -> Idx {
        match ty {
            Idx::UNTYPED_BOOL => Idx::BOOL,
            Idx::UNTYPED_INT => Idx::INT,
            Idx::UNTYPED_RUNE => Idx::RUNE,
            Idx::UNTYPED_FLOAT => Idx::FLOAT64,
            Idx::UNTYPED_COMPLEX => Idx::COMPLEX128,
            Idx::UNTYPED_STRING => Idx::STRING,
            _ => ty,
        }
    }

    /// The first interface method `v` lacks. A method matches only when its
    /// name and full signature are identical.
    pub fn missing_method(&self, v: Idx, iface: Idx, msets: &MethodSets) -> Option<MissingMethod> {
        let wanted = self.interface_methods(iface);
        if wanted.is_empty() {
            return None;
        }
        let have = msets.method_set(self, v);
        for m in wanted {
            match have.lookup(m.name) {
                Some(entry) if entry.sig == m.sig => {}
                Some(_) => {
                    return Some(MissingMethod {
                        name: m.name,
                        wrong_type: true,
                        ptr_recv: false,
                    })
                }
                None => {
                    // Distinguish "only *T has it" for better messages.
                    let ptr_recv = self.tag(v) != Tag::Pointer
                        && !self.is_interface(v)
                        && self.named_method(v, m.name).is_some_and(|pm| pm.ptr_recv);
                    return Some(MissingMethod {
                        name: m.name,
                        wrong_type: false,
                        ptr_recv,
                    });
                }
            }
        }
        None
    }

    fn named_method(&self, ty: Idx, name: Name) -> Option<crate::Method> {
        if !self.is_named(ty) {
            return None;
        }
        self.named_info(ty)
            .methods
            .iter()
            .find(|m| m.name == name)
            .copied()
    }

    /// Whether `v` implements interface `iface`: every method is present
    /// and, for constraint interfaces, `v` is in the type set.
    pub fn implements(&self, v: Idx, iface: Idx, msets: &MethodSets) -> bool {
        if v == Idx::INVALID {
            return false;
        }
        let set = self.interface_type_set(iface);
        if !set.is_none() && !self.in_type_set(v, set) {
            return false;
        }
        self.missing_method(v, iface, msets).is_none()
    }

    fn in_type_set(&self, v: Idx, union: Idx) -> bool {
        self.union_terms(union).iter().any(|term| {
            if term.tilde {
                self.underlying(v) == self.underlying(term.ty)
            } else {
                v == term.ty
            }
        })
    }

    /// Whether a value of type `v` may be assigned to a variable of type `t`.
    pub fn assignable(&self, v: Idx, t: Idx, msets: &MethodSets) -> bool {
        if v == t {
            return true;
        }
        if v == Idx::INVALID || t == Idx::INVALID {
            return false;
        }

        let vf = self.flags(v);
        if vf.contains(TypeFlags::IS_UNTYPED) {
            return self.untyped_assignable(v, t, msets);
        }

        let (vu, tu) = (self.underlying(v), self.underlying(t));
        let v_param = self.is_type_param(v);
        let t_param = self.is_type_param(t);

        // Identical underlying types, at least one side unnamed.
        if vu == tu && !v_param && !t_param && (!self.is_named(v) || !self.is_named(t)) {
            return true;
        }

        if self.tag(tu) == Tag::Interface && !t_param {
            return self.implements(v, t, msets);
        }

        // Bidirectional channel to directional channel of identical element.
        if self.tag(vu) == Tag::Chan
            && self.tag(tu) == Tag::Chan
            && self.chan_dir(vu) == crate::ChanDir::Both
            && self.elem(vu) == self.elem(tu)
            && (!self.is_named(v) || !self.is_named(t))
        {
            return true;
        }

        false
    }

    fn untyped_assignable(&self, v: Idx, t: Idx, msets: &MethodSets) -> bool {
        if v == Idx::UNTYPED_NIL {
            return self.has_nil(t);
        }
        let tu = self.underlying(t);
        if self.tag(tu) == Tag::Interface && !self.is_type_param(t) {
            return self.implements(self.default_type(v), t, msets);
        }
        let tf = self.flags(tu);
        if tf.contains(TypeFlags::IS_UNTYPED) {
            return false;
        }
        match v {
            Idx::UNTYPED_BOOL => tf.contains(TypeFlags::IS_BOOLEAN),
            Idx::UNTYPED_STRING => tf.contains(TypeFlags::IS_STRING),
            Idx::UNTYPED_INT | Idx::UNTYPED_RUNE | Idx::UNTYPED_FLOAT | Idx::UNTYPED_COMPLEX => {
                tf.is_numeric()
            }
            _ => false,
        }
    }
}
