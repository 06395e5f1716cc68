//! Type kind tag for tag-driven dispatch.
//!
//! Each type in the pool has a `Tag` that identifies its kind. The tag
//! determines how to interpret the associated `data` field:
//!
//! - 0-31: basic types (data unused)
//! - 32-47: single-child types (data = child Idx)
//! - 48-79: extra-array types (data = extra index)
//! - 80-95: side-table types (data = index into the named / type-parameter
//!   tables)
//! - 255: reserved slot

use std::fmt;

/// Type kind discriminant.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum Tag {
    // === Basic (0-31) ===
    Invalid = 0,
    Bool = 1,
    Int = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint = 7,
    Uint8 = 8,
    Uint16 = 9,
    Uint32 = 10,
    Uint64 = 11,
    Uintptr = 12,
    Float32 = 13,
    Float64 = 14,
    Complex64 = 15,
    Complex128 = 16,
    String = 17,
    UnsafePointer = 18,
    UntypedBool = 19,
    UntypedInt = 20,
    UntypedRune = 21,
    UntypedFloat = 22,
    UntypedComplex = 23,
    UntypedString = 24,
    UntypedNil = 25,

    // === Single child (32-47) ===
    /// `*T`
    Pointer = 32,
    /// `[]T`
    Slice = 33,

    // === Extra array (48-79) ===
    /// `[N]T`: extra = `[len_lo, len_hi, elem]`
    Array = 48,
    /// `map[K]V`: extra = `[key, value]`
    Map = 49,
    /// `chan T`: extra = `[dir, elem]`
    Chan = 50,
    /// `struct{...}`: extra = `[n, (name, type, embedded, tag)*n]`
    Struct = 51,
    /// `interface{...}`: extra = `[n, (name, sig)*n, type_set]`
    Interface = 52,
    /// `func(...) ...`: extra = `[variadic, np, params*np, nr, results*nr]`
    Signature = 53,
    /// Multiple results: extra = `[n, elems*n]`
    Tuple = 54,
    /// `~A | B`: extra = `[n, (tilde, type)*n]`
    Union = 55,

    // === Side table (80-95) ===
    /// Declared type; data = index into the named table.
    Named = 80,
    /// Type parameter; data = index into the type-parameter table.
    TypeParam = 81,

    /// Unused slot in the reserved predeclared range.
    Reserved = 255,
}

impl Tag {
    /// Tags for the 26 basic types, in `Idx` order.
    pub const BASICS: [Tag; 26] = [
        Tag::Invalid,
        Tag::Bool,
        Tag::Int,
        Tag::Int8,
        Tag::Int16,
        Tag::Int32,
        Tag::Int64,
        Tag::Uint,
        Tag::Uint8,
        Tag::Uint16,
        Tag::Uint32,
        Tag::Uint64,
        Tag::Uintptr,
        Tag::Float32,
        Tag::Float64,
        Tag::Complex64,
        Tag::Complex128,
        Tag::String,
        Tag::UnsafePointer,
        Tag::UntypedBool,
        Tag::UntypedInt,
        Tag::UntypedRune,
        Tag::UntypedFloat,
        Tag::UntypedComplex,
        Tag::UntypedString,
        Tag::UntypedNil,
    ];

    /// Basic types carry no data.
    #[inline]
    pub const fn is_basic(self) -> bool {
        (self as u8) < 32
    }

    /// `data` holds a child `Idx` directly.
    #[inline]
    pub const fn is_single_child(self) -> bool {
        matches!(self, Tag::Pointer | Tag::Slice)
    }

    /// `data` indexes the extra array.
    #[inline]
    pub const fn uses_extra(self) -> bool {
        let v = self as u8;
        v >= 48 && v < 80
    }

    /// Integer kinds, signed or unsigned, excluding untyped.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Tag::Int
                | Tag::Int8
                | Tag::Int16
                | Tag::Int32
                | Tag::Int64
                | Tag::Uint
                | Tag::Uint8
                | Tag::Uint16
                | Tag::Uint32
                | Tag::Uint64
                | Tag::Uintptr
        )
    }

    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Tag::Uint | Tag::Uint8 | Tag::Uint16 | Tag::Uint32 | Tag::Uint64 | Tag::Uintptr
        )
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Tag::Float32 | Tag::Float64)
    }

    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Tag::Complex64 | Tag::Complex128)
    }

    #[inline]
    pub const fn is_untyped(self) -> bool {
        matches!(
            self,
            Tag::UntypedBool
                | Tag::UntypedInt
                | Tag::UntypedRune
                | Tag::UntypedFloat
                | Tag::UntypedComplex
                | Tag::UntypedString
                | Tag::UntypedNil
        )
    }

    /// Bit width of a sized numeric kind. `int`, `uint` and `uintptr` are
    /// 64-bit.
    pub const fn bit_width(self) -> Option<u32> {
        Some(match self {
            Tag::Int8 | Tag::Uint8 => 8,
            Tag::Int16 | Tag::Uint16 => 16,
            Tag::Int32 | Tag::Uint32 | Tag::Float32 => 32,
            Tag::Int
            | Tag::Int64
            | Tag::Uint
            | Tag::Uint64
            | Tag::Uintptr
            | Tag::Float64
            | Tag::Complex64 => 64,
            Tag::Complex128 => 128,
            _ => return None,
        })
    }

    /// Get the tag name for debugging.
    pub const fn name(self) -> &'static str {
        match self {
            Tag::Invalid => "invalid",
            Tag::Bool => "bool",
            Tag::Int => "int",
            Tag::Int8 => "int8",
            Tag::Int16 => "int16",
            Tag::Int32 => "int32",
            Tag::Int64 => "int64",
            Tag::Uint => "uint",
            Tag::Uint8 => "uint8",
            Tag::Uint16 => "uint16",
            Tag::Uint32 => "uint32",
            Tag::Uint64 => "uint64",
            Tag::Uintptr => "uintptr",
            Tag::Float32 => "float32",
            Tag::Float64 => "float64",
            Tag::Complex64 => "complex64",
            Tag::Complex128 => "complex128",
            Tag::String => "string",
            Tag::UnsafePointer => "unsafe.Pointer",
            Tag::UntypedBool => "untyped bool",
            Tag::UntypedInt => "untyped int",
            Tag::UntypedRune => "untyped rune",
            Tag::UntypedFloat => "untyped float",
            Tag::UntypedComplex => "untyped complex",
            Tag::UntypedString => "untyped string",
            Tag::UntypedNil => "untyped nil",
            Tag::Pointer => "pointer",
            Tag::Slice => "slice",
            Tag::Array => "array",
            Tag::Map => "map",
            Tag::Chan => "chan",
            Tag::Struct => "struct",
            Tag::Interface => "interface",
            Tag::Signature => "func",
            Tag::Tuple => "tuple",
            Tag::Union => "union",
            Tag::Named => "named",
            Tag::TypeParam => "type parameter",
            Tag::Reserved => "reserved",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel direction.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum ChanDir {
    /// `chan T`
    Both = 0,
    /// `chan<- T`
    Send = 1,
    /// `<-chan T`
    Recv = 2,
}

impl ChanDir {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ChanDir::Send,
            2 => ChanDir::Recv,
            _ => ChanDir::Both,
        }
    }

    /// Sends are allowed.
    pub const fn can_send(self) -> bool {
        !matches!(self, ChanDir::Recv)
    }

    /// Receives are allowed.
    pub const fn can_recv(self) -> bool {
        !matches!(self, ChanDir::Send)
    }
}
