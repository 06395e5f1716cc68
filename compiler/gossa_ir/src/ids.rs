//! Declaration identifiers resolved by the external type checker.
//!
//! The front end numbers every function declaration, package-level variable
//! and local variable object densely from zero. The core never invents these
//! ids; it only uses them as keys.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into `Vec`s).
            #[inline]
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

define_id!(
    /// A function or method declaration (`FuncDecl` in the typed AST).
    FuncId,
    "fn"
);

define_id!(
    /// A package-level variable.
    GlobalId,
    "g"
);

define_id!(
    /// A local variable object: parameter, result, `:=` binding, range
    /// variable or type-switch clause symbol.
    LocalId,
    "l"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_raw() {
        assert_eq!(FuncId::new(3).raw(), 3);
        assert_eq!(GlobalId::new(7).index(), 7);
        assert!(LocalId::new(1) < LocalId::new(2));
    }

    #[test]
    fn debug_uses_prefix() {
        assert_eq!(format!("{:?}", FuncId::new(4)), "fn4");
        assert_eq!(format!("{:?}", LocalId::new(0)), "l0");
    }
}
