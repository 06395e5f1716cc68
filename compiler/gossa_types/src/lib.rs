//! Go type model.
//!
//! All types of a program live in one [`Pool`] and are addressed by a 32-bit
//! [`Idx`]. The pool is filled by the external type checker (through the
//! constructors in `pool/construct.rs`) and extended by the SSA builder when
//! it instantiates generic code; after building, the interpreter only reads
//! it.
//!
//! # Identity
//!
//! - Structural types are hash-consed, so structural identity is `Idx`
//!   equality.
//! - Named types and type parameters are nominal: one `Idx` per
//!   declaration.
//! - Generic instances are cached by `(template, type arguments)`.
//!
//! # Modules
//!
//! - [`idx`], [`tag`], [`item`], [`flags`]: the compact representation
//! - [`pool`]: storage, construction, queries, formatting
//! - [`predicates`]: assignability, comparability, interface satisfaction
//! - [`method_set`]: cached method sets with embedding promotion
//! - [`subst`]: substitution and instantiation

pub mod flags;
pub mod idx;
pub mod item;
pub mod method_set;
pub mod pool;
pub mod predicates;
pub mod subst;
pub mod tag;

pub use flags::TypeFlags;
pub use idx::Idx;
pub use item::Item;
pub use method_set::{MethodEntry, MethodSet, MethodSets, MethodTarget};
pub use pool::{Field, IfaceMethod, Method, NamedInfo, Pool, TypeParamInfo, UnionTerm};
pub use predicates::MissingMethod;
pub use subst::SubstMap;
pub use tag::{ChanDir, Tag};
