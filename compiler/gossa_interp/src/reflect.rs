//! The subset of package `reflect` interpreted programs can use.
//!
//! A `reflect.Type` is a [`Value::ReflectType`] holding a pool index; a
//! `reflect.Value` is a [`Value::ReflectValue`] holding the same box an
//! interface would. Everything is derived from the type pool and the heap;
//! there is no separate runtime type information.

use gossa_ast::Intrinsic;
use gossa_types::{Idx, Pool, Tag};

use crate::errors::{internal, ExecResult, RuntimeFault};
use crate::heap::Heap;
use crate::ops::value_kind;
use crate::sched::Scheduler;
use crate::value::{chan_address, map_address, Boxed, Value, FUNC_ADDRESS};

/// `reflect.Kind`, numbered as Go numbers it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Invalid = 0,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Pointer,
    Slice,
    String,
    Struct,
    UnsafePointer,
}

const KINDS: [Kind; 27] = [
    Kind::Invalid,
    Kind::Bool,
    Kind::Int,
    Kind::Int8,
    Kind::Int16,
    Kind::Int32,
    Kind::Int64,
    Kind::Uint,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Uintptr,
    Kind::Float32,
    Kind::Float64,
    Kind::Complex64,
    Kind::Complex128,
    Kind::Array,
    Kind::Chan,
    Kind::Func,
    Kind::Interface,
    Kind::Map,
    Kind::Pointer,
    Kind::Slice,
    Kind::String,
    Kind::Struct,
    Kind::UnsafePointer,
];

impl Kind {
    pub fn of(pool: &Pool, ty: Idx) -> Kind {
        let tag = value_kind(pool, ty);
        // Basic tags up to `complex128` share Go's kind numbering.
        if (tag as u8) <= Tag::Complex128 as u8 {
            return KINDS[tag as usize];
        }
        match tag {
            Tag::String => Kind::String,
            Tag::UnsafePointer => Kind::UnsafePointer,
            Tag::Pointer => Kind::Pointer,
            Tag::Slice => Kind::Slice,
            Tag::Array => Kind::Array,
            Tag::Map => Kind::Map,
            Tag::Chan => Kind::Chan,
            Tag::Struct => Kind::Struct,
            Tag::Interface => Kind::Interface,
            Tag::Signature => Kind::Func,
            _ => Kind::Invalid,
        }
    }

    pub fn from_raw(raw: u64) -> Option<Kind> {
        usize::try_from(raw).ok().and_then(|i| KINDS.get(i)).copied()
    }

    /// `Kind.String()`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Pointer => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }
}

/// `Type.Name()`: the declared name without package qualifier, empty for
/// unnamed types.
pub fn type_name(pool: &Pool, ty: Idx) -> String {
    if !pool.is_named(ty) {
        return String::new();
    }
    let full = pool.format_type(ty);
    let info = pool.named_info(ty);
    if info.pkg.is_empty() {
        return full;
    }
    let prefix_len = pool.name_str(info.pkg).len() + 1;
    full.get(prefix_len..).map_or(full.clone(), str::to_owned)
}

/// What the reflection intrinsics read.
pub(crate) struct Reflector<'a> {
    pub pool: &'a Pool,
    pub heap: &'a Heap,
    pub sched: &'a Scheduler,
}

fn misuse(method: &'static str, kind: Kind) -> RuntimeFault {
    RuntimeFault::Reflect {
        method,
        kind: kind.name().to_owned(),
    }
}

fn zero_value(method: &'static str) -> RuntimeFault {
    RuntimeFault::Reflect {
        method,
        kind: "zero".to_owned(),
    }
}

fn value_of(b: Boxed) -> Value {
    Value::ReflectValue(Some(Box::new(b)))
}

fn int_arg(args: &[Value], i: usize) -> ExecResult<i64> {
    args.get(i)
        .and_then(Value::as_i64)
        .ok_or_else(|| internal("reflection call without an integer argument"))
}

impl Reflector<'_> {
    /// Run reflection intrinsic `intr`. Methods take their receiver first.
    pub fn call(&self, intr: Intrinsic, args: &[Value]) -> ExecResult<Value> {
        let recv = args
            .first()
            .ok_or_else(|| internal(format!("{intr} without receiver")))?;
        match intr {
            Intrinsic::ReflectTypeOf => Ok(match recv {
                Value::Interface(Some(b)) => Value::ReflectType(b.ty),
                _ => Value::Interface(None),
            }),
            Intrinsic::ReflectValueOf => Ok(match recv {
                Value::Interface(Some(b)) => value_of((**b).clone()),
                _ => Value::ReflectValue(None),
            }),
            Intrinsic::TypeKind
            | Intrinsic::TypeElem
            | Intrinsic::TypeKey
            | Intrinsic::TypeLen
            | Intrinsic::TypeNumField
            | Intrinsic::TypeFieldName
            | Intrinsic::TypeString
            | Intrinsic::TypeName => {
                let Value::ReflectType(t) = recv else {
                    return Err(RuntimeFault::NilDeref.into());
                };
                self.type_method(intr, *t, args)
            }
            _ => {
                let b = match recv {
                    Value::ReflectValue(b) => b.as_deref(),
                    _ => return Err(internal(format!("{intr} on a non-Value receiver"))),
                };
                self.value_method(intr, b, args)
            }
        }
    }

    fn type_method(&self, intr: Intrinsic, t: Idx, args: &[Value]) -> ExecResult<Value> {
        let pool = self.pool;
        let kind = Kind::of(pool, t);
        let usage = |what: &str| -> ExecResult<Value> {
            Err(RuntimeFault::ReflectUsage(format!("{what} {}", pool.format_type(t))).into())
        };
        match intr {
            Intrinsic::TypeKind => Ok(Value::Uint(kind as u64)),
            Intrinsic::TypeElem => match kind {
                Kind::Pointer | Kind::Slice | Kind::Array | Kind::Map | Kind::Chan => {
                    let u = pool.underlying(t);
                    Ok(Value::ReflectType(pool.elem(u)))
                }
                _ => usage("Elem of invalid type"),
            },
            Intrinsic::TypeKey => match kind {
                Kind::Map => Ok(Value::ReflectType(pool.key(pool.underlying(t)))),
                _ => usage("Key of non-map type"),
            },
            Intrinsic::TypeLen => match kind {
                Kind::Array => Ok(Value::Int(pool.array_len(pool.underlying(t)) as i64)),
                _ => usage("Len of non-array type"),
            },
            Intrinsic::TypeNumField => match kind {
                Kind::Struct => Ok(Value::Int(pool.num_fields(pool.underlying(t)) as i64)),
                _ => usage("NumField of non-struct type"),
            },
            Intrinsic::TypeFieldName => {
                if kind != Kind::Struct {
                    return usage("Field of non-struct type");
                }
                let u = pool.underlying(t);
                let i = int_arg(args, 1)?;
                match usize::try_from(i).ok().filter(|&i| i < pool.num_fields(u)) {
                    Some(i) => Ok(Value::str(pool.name_str(pool.field(u, i).name))),
                    None => Err(RuntimeFault::ReflectUsage("Field index out of bounds".into()).into()),
                }
            }
            Intrinsic::TypeString => Ok(Value::str(&pool.format_type(t))),
            Intrinsic::TypeName => Ok(Value::str(&type_name(pool, t))),
            _ => Err(internal(format!("{intr} is not a Type method"))),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn value_method(&self, intr: Intrinsic, b: Option<&Boxed>, args: &[Value]) -> ExecResult<Value> {
        let pool = self.pool;
        let Some(b) = b else {
            return match intr {
                Intrinsic::ValueKind => Ok(Value::Uint(Kind::Invalid as u64)),
                Intrinsic::ValueIsValid => Ok(Value::Bool(false)),
                Intrinsic::ValueString => Ok(Value::str("<invalid Value>")),
                _ => Err(zero_value(method_name(intr)).into()),
            };
        };
        let kind = Kind::of(pool, b.ty);
        let u = pool.underlying(b.ty);
        let bad = || -> ExecResult<Value> { Err(misuse(method_name(intr), kind).into()) };
        match intr {
            Intrinsic::ValueKind => Ok(Value::Uint(kind as u64)),
            Intrinsic::ValueIsValid => Ok(Value::Bool(true)),
            Intrinsic::ValueType => Ok(Value::ReflectType(b.ty)),
            Intrinsic::ValueInterface => Ok(match kind {
                Kind::Interface => b.value.clone(),
                _ => Value::Interface(Some(Box::new(b.clone()))),
            }),
            Intrinsic::ValueElem => match (kind, &b.value) {
                (Kind::Interface, Value::Interface(inner)) => {
                    Ok(Value::ReflectValue(inner.clone()))
                }
                (Kind::Pointer, Value::Pointer(p)) => Ok(value_of(Boxed {
                    ty: pool.elem(u),
                    value: self.heap.load(p)?,
                })),
                (Kind::Pointer, _) => Ok(Value::ReflectValue(None)),
                _ => bad(),
            },
            Intrinsic::ValueNumField => match kind {
                Kind::Struct => Ok(Value::Int(pool.num_fields(u) as i64)),
                _ => bad(),
            },
            Intrinsic::ValueField => {
                let Value::Struct(fields) = &b.value else {
                    return bad();
                };
                let i = int_arg(args, 1)?;
                let Some(field) = usize::try_from(i).ok().and_then(|i| fields.get(i)) else {
                    return Err(RuntimeFault::ReflectUsage("Field index out of range".into()).into());
                };
                Ok(value_of(Boxed {
                    ty: pool.field(u, i as usize).ty,
                    value: field.clone(),
                }))
            }
            Intrinsic::ValueIndex => {
                let i = int_arg(args, 1)?;
                let (elems, what, elem_ty) = match (&b.value, kind) {
                    (Value::Str(s), Kind::String) => (
                        s.iter().map(|&c| Value::Uint(u64::from(c))).collect(),
                        "string",
                        Idx::UINT8,
                    ),
                    (Value::Array(xs), Kind::Array) => (xs.clone(), "array", pool.elem(u)),
                    (v, Kind::Slice) => (self.heap.elems_of(v)?, "slice", pool.elem(u)),
                    _ => return bad(),
                };
                match usize::try_from(i).ok().and_then(|i| elems.into_iter().nth(i)) {
                    Some(value) => Ok(value_of(Boxed { ty: elem_ty, value })),
                    None => Err(RuntimeFault::ReflectUsage(format!("{what} index out of range")).into()),
                }
            }
            Intrinsic::ValueLen => Ok(Value::Int(match (&b.value, kind) {
                (Value::Str(s), Kind::String) => s.len(),
                (Value::Array(xs), Kind::Array) => xs.len(),
                (Value::Slice(s), Kind::Slice) => s.len,
                (Value::Map(m), Kind::Map) => self.heap.map(*m).len(),
                (Value::Chan(c), Kind::Chan) => self.sched.chan_len(*c),
                (Value::Nil, Kind::Slice | Kind::Map | Kind::Chan) => 0,
                _ => return bad(),
            } as i64)),
            Intrinsic::ValueInt => match b.value {
                Value::Int(i) => Ok(Value::Int(i)),
                _ => bad(),
            },
            Intrinsic::ValueUint => match b.value {
                Value::Uint(x) => Ok(Value::Uint(x)),
                _ => bad(),
            },
            Intrinsic::ValueFloat => match b.value {
                Value::Float(f) => Ok(Value::Float(f)),
                _ => bad(),
            },
            Intrinsic::ValueBool => match b.value {
                Value::Bool(x) => Ok(Value::Bool(x)),
                _ => bad(),
            },
            Intrinsic::ValueString => Ok(match (&b.value, kind) {
                (Value::Str(s), Kind::String) => Value::Str(s.clone()),
                _ => Value::str(&format!("<{} Value>", pool.format_type(b.ty))),
            }),
            Intrinsic::ValuePointer => Ok(Value::Uint(match (&b.value, kind) {
                (Value::Pointer(p), _) => p.address(),
                (Value::Slice(s), _) => s.elem(0).address(),
                (Value::Map(m), _) => map_address(*m),
                (Value::Chan(c), _) => chan_address(*c),
                (Value::Nil, Kind::Pointer | Kind::Slice | Kind::Map | Kind::Chan | Kind::Func) => 0,
                (Value::Func(_), _) => FUNC_ADDRESS,
                _ => return bad(),
            })),
            Intrinsic::ValueIsNil => match kind {
                Kind::Pointer | Kind::Map | Kind::Slice | Kind::Chan | Kind::Func | Kind::Interface => {
                    Ok(Value::Bool(b.value.is_nil()))
                }
                _ => bad(),
            },
            _ => Err(internal(format!("{intr} is not a Value method"))),
        }
    }
}

/// `Value.X` for reflection panic messages.
fn method_name(intr: Intrinsic) -> &'static str {
    intr.name().trim_start_matches("reflect.")
}

#[cfg(test)]
mod tests;
