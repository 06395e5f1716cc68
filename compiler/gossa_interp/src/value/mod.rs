//! Runtime values.
//!
//! A [`Value`] is what one SSA register holds. Aggregates (structs,
//! arrays) are held by value and copied on assignment, as Go copies them.
//! Everything addressable lives in a heap cell and is reached through a
//! [`Pointer`]: a cell plus a projection path, so `&s.f` and `&a[i]` alias
//! the cell that holds `s` or `a`.
//!
//! Values carry no types. Instructions supply the static type when one is
//! needed; interfaces box their dynamic type next to the value.

mod key;

use std::fmt;
use std::sync::Arc;

use gossa_ast::{Builtin, Intrinsic};
use gossa_ir::ConstValue;
use gossa_ssa::FnId;
use gossa_types::{Idx, Pool, Tag};
use smallvec::SmallVec;

use crate::ops::{round_float, value_kind, wrap_signed, wrap_unsigned};

pub use key::MapKey;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// A heap cell.
    CellId,
    "cell"
);
handle!(
    /// A map object in the heap.
    MapId,
    "map"
);
handle!(
    /// A channel in the scheduler's table.
    ChanId,
    "chan"
);
handle!(
    /// A range iterator in the heap.
    IterId,
    "iter"
);

/// Address of a storage location: a cell and a path of field or element
/// indices into the aggregate it holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub cell: CellId,
    pub path: SmallVec<[u32; 4]>,
}

impl Pointer {
    pub fn to_cell(cell: CellId) -> Self {
        Pointer {
            cell,
            path: SmallVec::new(),
        }
    }

    /// Address of field or element `step` of the pointee.
    #[must_use]
    pub fn project(&self, step: u32) -> Pointer {
        let mut path = self.path.clone();
        path.push(step);
        Pointer {
            cell: self.cell,
            path,
        }
    }

    /// Synthetic address for printing; stable for a given location.
    pub fn address(&self) -> u64 {
        let offset: u64 = self.path.iter().map(|&s| u64::from(s) + 1).sum();
        0x00c0_0001_0000 + (self.cell.index() as u64) * 0x100 + offset * 8
    }
}

/// Synthetic address of a map object, for printing.
pub fn map_address(id: MapId) -> u64 {
    0x00c0_0008_0000 + id.index() as u64 * 0x30
}

/// Synthetic address of a channel, for printing.
pub fn chan_address(id: ChanId) -> u64 {
    0x00c0_000a_0000 + id.index() as u64 * 0x60
}

/// Printed address of every non-nil function value.
pub const FUNC_ADDRESS: u64 = 0x0047_b0e0;

/// A slice header. `array` points at the backing array (an `Array` value).
#[derive(Clone, Debug, PartialEq)]
pub struct SliceRef {
    pub array: Pointer,
    pub offset: usize,
    pub len: usize,
    pub cap: usize,
}

impl SliceRef {
    /// Address of element `i`, which must be below `cap`.
    pub fn elem(&self, i: usize) -> Pointer {
        self.array.project((self.offset + i) as u32)
    }
}

/// A value with its dynamic type, as held by an interface.
#[derive(Clone, Debug, PartialEq)]
pub struct Boxed {
    pub ty: Idx,
    pub value: Value,
}

/// Methods whose implementation the runtime provides.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NativeMethod {
    /// `runtime.Error.Error`: the receiver is the message.
    RuntimeErrorError,
    /// `(*errors.errorString).Error`: field 0 of the pointee.
    ErrorStringError,
}

/// Something that can be called.
#[derive(Clone, Debug, PartialEq)]
pub enum Callable {
    /// Function code. `free` holds the captured cells of a closure; `recv`
    /// is prepended to the arguments of a bound method value.
    Code {
        func: FnId,
        free: Vec<Value>,
        recv: Option<Value>,
    },
    Native {
        method: NativeMethod,
        recv: Value,
    },
    Builtin(Builtin),
    Intrinsic(Intrinsic),
}

impl Callable {
    pub fn func(func: FnId) -> Self {
        Callable::Code {
            func,
            free: Vec::new(),
            recv: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Result of a call with no results.
    Void,
    Bool(bool),
    /// Every signed integer kind, already wrapped to its width.
    Int(i64),
    /// Every unsigned integer kind, already wrapped to its width.
    Uint(u64),
    /// `float32` values are kept rounded to single precision.
    Float(f64),
    Complex(f64, f64),
    /// Go strings are byte strings; they need not be valid UTF-8.
    Str(Arc<[u8]>),
    /// Nil pointer, slice, map, channel or function.
    Nil,
    Pointer(Pointer),
    Slice(SliceRef),
    Map(MapId),
    Chan(ChanId),
    Func(Arc<Callable>),
    /// `None` is the nil interface. A boxed nil pointer is not nil.
    Interface(Option<Box<Boxed>>),
    Struct(Vec<Value>),
    Array(Vec<Value>),
    /// Multiple results.
    Tuple(Vec<Value>),
    Iter(IterId),
    /// `reflect.Type`.
    ReflectType(Idx),
    /// `reflect.Value`; `None` is the invalid (zero) Value.
    ReflectValue(Option<Box<Boxed>>),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s.as_bytes()))
    }

    pub fn bytes(b: &[u8]) -> Value {
        Value::Str(Arc::from(b))
    }

    /// Box `value` with dynamic type `ty`.
    pub fn boxed(ty: Idx, value: Value) -> Value {
        Value::Interface(Some(Box::new(Boxed { ty, value })))
    }

    /// Integer payload, reinterpreting unsigned values.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Uint(u) => Some(u as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The string payload, with invalid UTF-8 replaced.
    pub fn to_str_lossy(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Whether this is a nil pointer, slice, map, channel, function or
    /// interface.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil | Value::Interface(None))
    }
}

/// The zero value of `ty`.
pub fn zero(pool: &Pool, ty: Idx) -> Value {
    if pool.tag(ty) == Tag::Tuple {
        return Value::Tuple(pool.tuple_elems(ty).into_iter().map(|t| zero(pool, t)).collect());
    }
    let tag = value_kind(pool, ty);
    match tag {
        Tag::Bool => Value::Bool(false),
        t if t.is_unsigned() => Value::Uint(0),
        t if t.is_integer() => Value::Int(0),
        t if t.is_float() => Value::Float(0.0),
        t if t.is_complex() => Value::Complex(0.0, 0.0),
        Tag::String => Value::Str(Arc::from(&b""[..])),
        Tag::Struct => Value::Struct(
            pool.fields(ty)
                .into_iter()
                .map(|f| zero(pool, f.ty))
                .collect(),
        ),
        Tag::Array => {
            let elem = zero(pool, pool.elem(ty));
            Value::Array(vec![elem; pool.array_len(ty) as usize])
        }
        Tag::Interface => Value::Interface(None),
        _ => Value::Nil,
    }
}

/// Materialize constant `c` at type `ty`. `Nil` stands for the zero value;
/// constants of interface type are boxed at their default type.
pub fn from_const(pool: &Pool, ty: Idx, c: &ConstValue) -> Value {
    if matches!(c, ConstValue::Nil) {
        return zero(pool, ty);
    }
    let tag = value_kind(pool, ty);
    if tag == Tag::Interface {
        let dyn_ty = match c {
            ConstValue::Bool(_) => Idx::BOOL,
            ConstValue::Int(_) => Idx::INT,
            ConstValue::Float(_) => Idx::FLOAT64,
            ConstValue::Complex(..) => Idx::COMPLEX128,
            ConstValue::Str(_) | ConstValue::Nil => Idx::STRING,
        };
        return Value::boxed(dyn_ty, from_const(pool, dyn_ty, c));
    }
    match *c {
        ConstValue::Bool(b) => Value::Bool(b),
        ConstValue::Int(i) => match tag {
            t if t.is_unsigned() => Value::Uint(wrap_unsigned(t, i as u64)),
            t if t.is_float() => Value::Float(round_float(t, i as f64)),
            t if t.is_complex() => Value::Complex(round_float(t, i as f64), 0.0),
            t => Value::Int(wrap_signed(t, i as i64)),
        },
        ConstValue::Float(f) => match tag {
            t if t.is_unsigned() => Value::Uint(wrap_unsigned(t, f as u64)),
            t if t.is_integer() => Value::Int(wrap_signed(t, f as i64)),
            t if t.is_complex() => Value::Complex(round_float(t, f), 0.0),
            t => Value::Float(round_float(t, f)),
        },
        ConstValue::Complex(re, im) => match tag {
            t if t.is_float() => Value::Float(round_float(t, re)),
            t => Value::Complex(round_float(t, re), round_float(t, im)),
        },
        ConstValue::Str(ref s) => Value::str(s),
        ConstValue::Nil => Value::Nil,
    }
}
