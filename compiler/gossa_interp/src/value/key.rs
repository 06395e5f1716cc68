//! Hashable projection of comparable values, used as map keys.

use std::cmp::Ordering;
use std::sync::Arc;

use gossa_types::{Idx, Pool};

use super::{ChanId, Pointer, Value};
use crate::errors::RuntimeFault;

/// Two keys are equal exactly when Go's `==` holds for the values they
/// were made from (NaN aside: NaN keys compare by bit pattern).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    /// Bit pattern, with `-0.0` folded into `0.0`.
    Float(u64),
    Complex(u64, u64),
    Str(Arc<[u8]>),
    Pointer(Pointer),
    Chan(ChanId),
    Type(Idx),
    /// `None` is the nil interface.
    Iface(Option<Box<(Idx, MapKey)>>),
    /// Struct fields or array elements.
    Agg(Vec<MapKey>),
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl MapKey {
    /// Key for value `v` of static type `ty`. Fails when an interface holds
    /// a value whose dynamic type is not comparable.
    pub fn of(pool: &Pool, ty: Idx, v: &Value) -> Result<MapKey, RuntimeFault> {
        Ok(match v {
            Value::Nil => MapKey::Nil,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(i) => MapKey::Int(*i),
            Value::Uint(u) => MapKey::Uint(*u),
            Value::Float(f) => MapKey::Float(float_bits(*f)),
            Value::Complex(re, im) => MapKey::Complex(float_bits(*re), float_bits(*im)),
            Value::Str(s) => MapKey::Str(Arc::clone(s)),
            Value::Pointer(p) => MapKey::Pointer(p.clone()),
            Value::Chan(c) => MapKey::Chan(*c),
            Value::ReflectType(t) => MapKey::Type(*t),
            Value::Interface(None) => MapKey::Iface(None),
            Value::Interface(Some(b)) => {
                if !pool.comparable(b.ty) {
                    return Err(RuntimeFault::Unhashable(pool.format_type(b.ty)));
                }
                let inner = MapKey::of(pool, b.ty, &b.value)?;
                MapKey::Iface(Some(Box::new((b.ty, inner))))
            }
            Value::Struct(fields) => MapKey::Agg(
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| MapKey::of(pool, pool.field(ty, i).ty, f))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Array(elems) => {
                let et = pool.elem(ty);
                MapKey::Agg(
                    elems
                        .iter()
                        .map(|e| MapKey::of(pool, et, e))
                        .collect::<Result<_, _>>()?,
                )
            }
            Value::Slice(_)
            | Value::Map(_)
            | Value::Func(_)
            | Value::Void
            | Value::Tuple(_)
            | Value::Iter(_)
            | Value::ReflectValue(_) => {
                return Err(RuntimeFault::Unhashable(pool.format_type(ty)));
            }
        })
    }

    /// Printing order for map keys: numbers numerically, strings bytewise,
    /// `false` before `true`, nil first, interfaces by type then value.
    pub fn sort_cmp(&self, other: &MapKey) -> Ordering {
        match (self, other) {
            (MapKey::Int(a), MapKey::Int(b)) => a.cmp(b),
            (MapKey::Uint(a), MapKey::Uint(b)) => a.cmp(b),
            (MapKey::Float(a), MapKey::Float(b)) => {
                let (a, b) = (f64::from_bits(*a), f64::from_bits(*b));
                a.partial_cmp(&b)
                    .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()).reverse())
            }
            (MapKey::Complex(ar, ai), MapKey::Complex(br, bi)) => MapKey::Float(*ar)
                .sort_cmp(&MapKey::Float(*br))
                .then_with(|| MapKey::Float(*ai).sort_cmp(&MapKey::Float(*bi))),
            (MapKey::Str(a), MapKey::Str(b)) => a.cmp(b),
            (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
            (MapKey::Pointer(a), MapKey::Pointer(b)) => a.address().cmp(&b.address()),
            (MapKey::Chan(a), MapKey::Chan(b)) => a.cmp(b),
            (MapKey::Type(a), MapKey::Type(b)) => a.cmp(b),
            (MapKey::Agg(a), MapKey::Agg(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.sort_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (MapKey::Iface(None), MapKey::Iface(None)) | (MapKey::Nil, MapKey::Nil) => {
                Ordering::Equal
            }
            (MapKey::Iface(None), _) | (MapKey::Nil, _) => Ordering::Less,
            (_, MapKey::Iface(None)) | (_, MapKey::Nil) => Ordering::Greater,
            (MapKey::Iface(Some(a)), MapKey::Iface(Some(b))) => {
                a.0.cmp(&b.0).then_with(|| a.1.sort_cmp(&b.1))
            }
            _ => Ordering::Equal,
        }
    }
}
