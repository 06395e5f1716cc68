//! Type-parameter substitution and generic instantiation.
//!
//! Substitution is a memoized rewrite over the pool. It only descends into
//! types flagged [`TypeFlags::HAS_TYPE_PARAM`], and named instances are
//! rebuilt through [`Pool::instantiate`], whose cache entry is recorded
//! before the instance's underlying type is computed. A recursive generic
//! type (`type t[A, B any] struct{ next *t[A, B] }`) therefore reaches its
//! own cache entry instead of recursing forever.
//!
//! [`TypeFlags::HAS_TYPE_PARAM`]: crate::TypeFlags::HAS_TYPE_PARAM

use gossa_ir::ensure_sufficient_stack;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::pool::{Field, IfaceMethod, Method, UnionTerm};
use crate::{Idx, Pool, Tag};

/// A mapping from type parameters to type arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SubstMap {
    params: Vec<Idx>,
    args: Vec<Idx>,
}

impl SubstMap {
    /// Pair parameters with arguments positionally.
    pub fn new(params: Vec<Idx>, args: Vec<Idx>) -> Self {
        debug_assert_eq!(params.len(), args.len(), "type argument count mismatch");
        SubstMap { params, args }
    }

    /// The replacement for `param`, if it is mapped.
    #[inline]
    pub fn lookup(&self, param: Idx) -> Option<Idx> {
        self.params
            .iter()
            .position(|&p| p == param)
            .map(|i| self.args[i])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The type arguments, in parameter order.
    pub fn args(&self) -> &[Idx] {
        &self.args
    }
}

impl Pool {
    /// Replace type parameters in `ty` according to `map`.
    pub fn substitute(&mut self, ty: Idx, map: &SubstMap) -> Idx {
        if map.is_empty() {
            return ty;
        }
        let mut memo = FxHashMap::default();
        self.subst_rec(ty, map, &mut memo)
    }

    fn subst_rec(&mut self, ty: Idx, map: &SubstMap, memo: &mut FxHashMap<Idx, Idx>) -> Idx {
        if ty.is_none() || !self.flags(ty).has_type_params() {
            return ty;
        }
        if let Some(&done) = memo.get(&ty) {
            return done;
        }
        let result = ensure_sufficient_stack(|| self.subst_node(ty, map, memo));
        memo.insert(ty, result);
        result
    }

    fn subst_node(&mut self, ty: Idx, map: &SubstMap, memo: &mut FxHashMap<Idx, Idx>) -> Idx {
        match self.tag(ty) {
            Tag::TypeParam => map.lookup(ty).unwrap_or(ty),
            Tag::Pointer => {
                let elem = self.subst_rec(self.item(ty).child(), map, memo);
                self.pointer(elem)
            }
            Tag::Slice => {
                let elem = self.subst_rec(self.item(ty).child(), map, memo);
                self.slice(elem)
            }
            Tag::Array => {
                let len = self.array_len(ty);
                let elem = self.subst_rec(self.elem(ty), map, memo);
                self.array(elem, len)
            }
            Tag::Map => {
                let key = self.subst_rec(self.key(ty), map, memo);
                let value = self.subst_rec(self.elem(ty), map, memo);
                self.map(key, value)
            }
            Tag::Chan => {
                let dir = self.chan_dir(ty);
                let elem = self.subst_rec(self.elem(ty), map, memo);
                self.chan(dir, elem)
            }
            Tag::Tuple => {
                let elems: Vec<Idx> = self
                    .tuple_elems(ty)
                    .into_iter()
                    .map(|e| self.subst_rec(e, map, memo))
                    .collect();
                self.tuple(&elems)
            }
            Tag::Signature => {
                let variadic = self.is_variadic(ty);
                let params: Vec<Idx> = self
                    .params(ty)
                    .into_iter()
                    .map(|p| self.subst_rec(p, map, memo))
                    .collect();
                let results: Vec<Idx> = self
                    .results(ty)
                    .into_iter()
                    .map(|r| self.subst_rec(r, map, memo))
                    .collect();
                self.signature(&params, &results, variadic)
            }
            Tag::Struct => {
                let fields: Vec<Field> = self
                    .fields(ty)
                    .into_iter()
                    .map(|f| Field {
                        ty: self.subst_rec(f.ty, map, memo),
                        ..f
                    })
                    .collect();
                self.struct_type(&fields)
            }
            Tag::Interface => {
                let methods: Vec<IfaceMethod> = self
                    .interface_methods(ty)
                    .into_iter()
                    .map(|m| IfaceMethod {
                        sig: self.subst_rec(m.sig, map, memo),
                        ..m
                    })
                    .collect();
                let type_set = self.interface_type_set(ty);
                let type_set = (!type_set.is_none()).then(|| self.subst_rec(type_set, map, memo));
                self.interface(&methods, type_set)
            }
            Tag::Union => {
                let terms: Vec<UnionTerm> = self
                    .union_terms(ty)
                    .into_iter()
                    .map(|t| UnionTerm {
                        ty: self.subst_rec(t.ty, map, memo),
                        ..t
                    })
                    .collect();
                self.union(&terms)
            }
            Tag::Named => {
                let info = self.named_info(ty);
                let Some(origin) = info.origin else {
                    return ty;
                };
                let args = info.type_args.clone();
                let args: Vec<Idx> = args
                    .into_iter()
                    .map(|a| self.subst_rec(a, map, memo))
                    .collect();
                self.instantiate(origin, &args)
            }
            _ => ty,
        }
    }

    /// Instantiate a generic named type. Equal argument lists yield the same
    /// `Idx`; different argument lists never do.
    pub fn instantiate(&mut self, template: Idx, args: &[Idx]) -> Idx {
        debug_assert!(
            self.named_info(template).is_generic(),
            "instantiate on non-generic {}",
            self.format_type(template)
        );
        debug_assert_eq!(self.named_info(template).type_params.len(), args.len());

        if let Some(inst) = self.cached_instance(template, args) {
            return inst;
        }
        let inst = self.alloc_instance(template, args);
        self.record_instance(template, args, inst);
        debug!(
            template = %self.format_type(template),
            instance = %self.format_type(inst),
            "instantiated named type"
        );
        self.complete_instance(inst);
        inst
    }

    /// Fill in the underlying type and methods of an instance from its
    /// template. No-op while the template's underlying type is still unset.
    pub(crate) fn complete_instance(&mut self, inst: Idx) {
        let info = self.named_info(inst);
        let Some(origin) = info.origin else {
            return;
        };
        let args = info.type_args.clone();
        let template = self.named_info(origin);
        if template.underlying.is_none() {
            return;
        }
        let underlying = template.underlying;
        let methods = template.methods.clone();
        let map = SubstMap::new(template.type_params.clone(), args);

        let underlying = self.substitute(underlying, &map);
        let underlying = self.underlying(underlying);
        let methods = methods
            .into_iter()
            .map(|m| Method {
                sig: self.substitute(m.sig, &map),
                ..m
            })
            .collect();
        self.set_instance_parts(inst, underlying, methods);
    }

    /// A template method as seen from one of its instances.
    pub(crate) fn instance_method(&mut self, inst: Idx, method: Method) -> Method {
        let map = self.instance_subst(inst);
        Method {
            sig: self.substitute(method.sig, &map),
            ..method
        }
    }

    /// The substitution that turns an instance's template into the instance.
    pub fn instance_subst(&self, inst: Idx) -> SubstMap {
        let info = self.named_info(inst);
        match info.origin {
            Some(origin) => SubstMap::new(
                self.named_info(origin).type_params.clone(),
                info.type_args.clone(),
            ),
            None => SubstMap::default(),
        }
    }
}

#[cfg(test)]
mod tests;
