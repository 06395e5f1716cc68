//! Type index handle.
//!
//! `Idx` is the only type representation. Every type lives in the [`Pool`]
//! and is referenced by its 32-bit index. Structural types are hash-consed,
//! so type identity is index equality.
//!
//! [`Pool`]: crate::Pool

use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Basic types (indices 0-25) ===
    // Pre-interned at pool creation, in this order.

    /// Result of a failed type check; never produced by a well-typed tree.
    pub const INVALID: Self = Self(0);
    pub const BOOL: Self = Self(1);
    pub const INT: Self = Self(2);
    pub const INT8: Self = Self(3);
    pub const INT16: Self = Self(4);
    pub const INT32: Self = Self(5);
    pub const INT64: Self = Self(6);
    pub const UINT: Self = Self(7);
    pub const UINT8: Self = Self(8);
    pub const UINT16: Self = Self(9);
    pub const UINT32: Self = Self(10);
    pub const UINT64: Self = Self(11);
    pub const UINTPTR: Self = Self(12);
    pub const FLOAT32: Self = Self(13);
    pub const FLOAT64: Self = Self(14);
    pub const COMPLEX64: Self = Self(15);
    pub const COMPLEX128: Self = Self(16);
    pub const STRING: Self = Self(17);
    pub const UNSAFE_POINTER: Self = Self(18);
    pub const UNTYPED_BOOL: Self = Self(19);
    pub const UNTYPED_INT: Self = Self(20);
    pub const UNTYPED_RUNE: Self = Self(21);
    pub const UNTYPED_FLOAT: Self = Self(22);
    pub const UNTYPED_COMPLEX: Self = Self(23);
    pub const UNTYPED_STRING: Self = Self(24);
    pub const UNTYPED_NIL: Self = Self(25);

    /// `byte` is an alias of `uint8`.
    pub const BYTE: Self = Self::UINT8;
    /// `rune` is an alias of `int32`.
    pub const RUNE: Self = Self::INT32;

    // === Predeclared compound types (indices 26-31) ===

    /// The empty tuple: result type of a call with no results.
    pub const EMPTY_TUPLE: Self = Self(26);
    /// `func() string`, the signature of `Error`.
    pub const ERROR_SIG: Self = Self(27);
    /// `interface{ Error() string }`
    pub const ERROR_IFACE: Self = Self(28);
    /// `interface{}` (also spelled `any`).
    pub const ANY: Self = Self(29);
    /// The predeclared `error` named type.
    pub const ERROR: Self = Self(30);
    /// `runtime.Error`: the dynamic type of panics raised by the interpreter
    /// itself (index out of range, nil map write, ...).
    pub const RUNTIME_ERROR: Self = Self(31);

    // === Reserved Range (32-63) ===

    /// First index for dynamically allocated types.
    pub const FIRST_DYNAMIC: u32 = 64;

    /// Number of basic types.
    pub const BASIC_COUNT: u32 = 26;

    /// Sentinel value indicating no type (an unset named underlying, an
    /// interface without a type set).
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is one of the pre-interned basic types.
    #[inline]
    pub const fn is_basic(self) -> bool {
        self.0 < Self::BASIC_COUNT
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Go spelling of a basic type, `None` for everything else.
    #[inline]
    pub const fn basic_name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "invalid type",
            1 => "bool",
            2 => "int",
            3 => "int8",
            4 => "int16",
            5 => "int32",
            6 => "int64",
            7 => "uint",
            8 => "uint8",
            9 => "uint16",
            10 => "uint32",
            11 => "uint64",
            12 => "uintptr",
            13 => "float32",
            14 => "float64",
            15 => "complex64",
            16 => "complex128",
            17 => "string",
            18 => "unsafe.Pointer",
            19 => "untyped bool",
            20 => "untyped int",
            21 => "untyped rune",
            22 => "untyped float",
            23 => "untyped complex",
            24 => "untyped string",
            25 => "untyped nil",
            _ => return None,
        })
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.basic_name() {
            write!(f, "Idx({name})")
        } else if self.is_none() {
            write!(f, "Idx::NONE")
        } else {
            write!(f, "Idx({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_share_indices() {
        assert_eq!(Idx::BYTE, Idx::UINT8);
        assert_eq!(Idx::RUNE, Idx::INT32);
    }

    #[test]
    fn basic_range() {
        assert!(Idx::UNTYPED_NIL.is_basic());
        assert!(!Idx::ERROR.is_basic());
        assert_eq!(Idx::UINTPTR.basic_name(), Some("uintptr"));
        assert_eq!(Idx::ANY.basic_name(), None);
        assert!(Idx::NONE.is_none());
    }

    #[test]
    fn debug_names_basics() {
        assert_eq!(format!("{:?}", Idx::STRING), "Idx(string)");
        assert_eq!(format!("{:?}", Idx::from_raw(70)), "Idx(70)");
    }
}
