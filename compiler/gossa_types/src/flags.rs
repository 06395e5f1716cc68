//! Pre-computed type metadata flags.
//!
//! `TypeFlags` are computed once at interning time and cached, so the hot
//! predicates (is this numeric? does substitution need to look inside?) are
//! a single bit test.

use bitflags::bitflags;

use crate::Tag;

bitflags! {
    /// Pre-computed type properties for O(1) queries.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        // === Presence Flags (bits 0-7) ===

        /// Mentions a type parameter somewhere inside. Gates substitution.
        const HAS_TYPE_PARAM = 1 << 0;
        /// Mentions the invalid type.
        const HAS_INVALID = 1 << 1;

        // === Category Flags (bits 8-23) ===
        // Named types inherit these from their underlying type.

        const IS_BOOLEAN = 1 << 8;
        const IS_INTEGER = 1 << 9;
        const IS_UNSIGNED = 1 << 10;
        const IS_FLOAT = 1 << 11;
        const IS_COMPLEX = 1 << 12;
        const IS_STRING = 1 << 13;
        const IS_UNTYPED = 1 << 14;
        /// Underlying type is an interface.
        const IS_INTERFACE = 1 << 15;
        /// Zero value is `nil`: pointer, slice, map, chan, func, interface,
        /// unsafe pointer.
        const HAS_NIL = 1 << 16;

        // === Kind Flags (bits 24-31) ===

        /// Declared (nominal) type.
        const IS_NAMED = 1 << 24;
        /// Pre-interned basic type.
        const IS_BASIC = 1 << 25;
    }
}

impl TypeFlags {
    /// Flags that propagate from child types to parents.
    pub const PROPAGATE_MASK: Self =
        Self::from_bits_truncate(Self::HAS_TYPE_PARAM.bits() | Self::HAS_INVALID.bits());

    /// Flags a named type copies from its underlying type.
    pub const CATEGORY_MASK: Self = Self::from_bits_truncate(
        Self::IS_BOOLEAN.bits()
            | Self::IS_INTEGER.bits()
            | Self::IS_UNSIGNED.bits()
            | Self::IS_FLOAT.bits()
            | Self::IS_COMPLEX.bits()
            | Self::IS_STRING.bits()
            | Self::IS_INTERFACE.bits()
            | Self::HAS_NIL.bits(),
    );

    /// Numeric: integer, float or complex (typed or untyped).
    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.intersects(
            Self::IS_INTEGER
                .union(Self::IS_FLOAT)
                .union(Self::IS_COMPLEX),
        )
    }

    /// Ordered: supports `<`, `<=`, `>`, `>=`.
    #[inline]
    pub const fn is_ordered(self) -> bool {
        self.intersects(
            Self::IS_INTEGER
                .union(Self::IS_FLOAT)
                .union(Self::IS_STRING),
        )
    }

    /// Check if substitution has work to do.
    #[inline]
    pub const fn has_type_params(self) -> bool {
        self.contains(Self::HAS_TYPE_PARAM)
    }

    /// Combine propagated flags from multiple children.
    #[inline]
    pub fn propagate_all(children: impl IntoIterator<Item = Self>) -> Self {
        let mut result = Self::empty();
        for child in children {
            result = result.union(child.intersection(Self::PROPAGATE_MASK));
        }
        result
    }

    /// Category flags of a basic type.
    pub(crate) fn for_basic(tag: Tag) -> Self {
        let mut flags = Self::IS_BASIC;
        if tag.is_integer() {
            flags |= Self::IS_INTEGER;
        }
        if tag.is_unsigned() {
            flags |= Self::IS_UNSIGNED;
        }
        if tag.is_float() {
            flags |= Self::IS_FLOAT;
        }
        if tag.is_complex() {
            flags |= Self::IS_COMPLEX;
        }
        if tag.is_untyped() {
            flags |= Self::IS_UNTYPED;
        }
        match tag {
            Tag::Bool | Tag::UntypedBool => flags |= Self::IS_BOOLEAN,
            Tag::String | Tag::UntypedString => flags |= Self::IS_STRING,
            Tag::UntypedInt | Tag::UntypedRune => flags |= Self::IS_INTEGER,
            Tag::UntypedFloat => flags |= Self::IS_FLOAT,
            Tag::UntypedComplex => flags |= Self::IS_COMPLEX,
            Tag::UnsafePointer | Tag::UntypedNil => flags |= Self::HAS_NIL,
            Tag::Invalid => flags |= Self::HAS_INVALID,
            _ => {}
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_categories() {
        let uint8 = TypeFlags::for_basic(Tag::Uint8);
        assert!(uint8.contains(TypeFlags::IS_INTEGER | TypeFlags::IS_UNSIGNED));
        assert!(uint8.is_numeric());
        assert!(uint8.is_ordered());

        let untyped_rune = TypeFlags::for_basic(Tag::UntypedRune);
        assert!(untyped_rune.contains(TypeFlags::IS_UNTYPED | TypeFlags::IS_INTEGER));

        let c = TypeFlags::for_basic(Tag::Complex64);
        assert!(c.is_numeric());
        assert!(!c.is_ordered());
    }

    #[test]
    fn propagation_keeps_presence_only() {
        let child = TypeFlags::HAS_TYPE_PARAM | TypeFlags::IS_INTEGER | TypeFlags::IS_NAMED;
        assert_eq!(TypeFlags::propagate_all([child]), TypeFlags::HAS_TYPE_PARAM);
    }
}
