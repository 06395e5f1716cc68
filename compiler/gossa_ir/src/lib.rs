//! gossa IR - foundation types shared by every phase.
//!
//! This crate has no knowledge of Go types or syntax. It provides the small
//! vocabulary the other crates agree on:
//!
//! - [`Span`] for source locations supplied by the external front end
//! - [`Name`] / [`StringInterner`] for identifiers
//! - [`FuncId`], [`GlobalId`], [`LocalId`] for declarations resolved by the
//!   type checker
//! - [`BinaryOp`] / [`UnaryOp`] for operators
//! - [`ConstValue`] for constant operands
//! - [`ensure_sufficient_stack`] for recursive tree walks
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: identifiers are `Name(u32)`, types are `Idx(u32)`
//!   (in `gossa_types`), declarations are dense `u32` ids.
//! - **Copy handles**: every id is `Copy` and compares in O(1).

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-copied types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod constant;
mod ids;
mod interner;
mod name;
mod ops;
mod span;
mod stack;

pub use constant::ConstValue;
pub use ids::{FuncId, GlobalId, LocalId};
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use ops::{BinaryOp, UnaryOp};
pub use span::Span;
pub use stack::ensure_sufficient_stack;
