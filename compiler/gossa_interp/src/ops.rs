//! Operators and scalar conversions on [`Value`]s.
//!
//! Integer arithmetic wraps to the width of the operand type; only integer
//! division by zero and negative shift counts fault. Float arithmetic
//! follows IEEE 754, with `float32` results rounded back to single
//! precision.

use std::cmp::Ordering;
use std::sync::Arc;

use gossa_ir::{BinaryOp, UnaryOp};
use gossa_types::{Idx, Pool, Tag};

use crate::errors::RuntimeFault;
use crate::value::Value;

/// Kind that decides a value's representation: the basic kind of the
/// underlying type with untyped kinds mapped to their defaults, else the
/// underlying tag.
pub fn value_kind(pool: &Pool, ty: Idx) -> Tag {
    match pool.under_tag(ty) {
        Tag::UntypedBool => Tag::Bool,
        Tag::UntypedInt | Tag::UntypedRune => Tag::Int,
        Tag::UntypedFloat => Tag::Float64,
        Tag::UntypedComplex => Tag::Complex128,
        Tag::UntypedString => Tag::String,
        t => t,
    }
}

pub fn wrap_signed(tag: Tag, v: i64) -> i64 {
    match tag {
        Tag::Int8 => i64::from(v as i8),
        Tag::Int16 => i64::from(v as i16),
        Tag::Int32 => i64::from(v as i32),
        _ => v,
    }
}

pub fn wrap_unsigned(tag: Tag, v: u64) -> u64 {
    match tag {
        Tag::Uint8 => u64::from(v as u8),
        Tag::Uint16 => u64::from(v as u16),
        Tag::Uint32 => u64::from(v as u32),
        _ => v,
    }
}

/// Round to the precision of `tag` (`float32` and `complex64` parts).
pub fn round_float(tag: Tag, f: f64) -> f64 {
    if matches!(tag, Tag::Float32 | Tag::Complex64) {
        f64::from(f as f32)
    } else {
        f
    }
}

fn unsupported(op: BinaryOp, pool: &Pool, ty: Idx) -> RuntimeFault {
    RuntimeFault::Unsupported(format!(
        "operator {} on {}",
        op.as_symbol(),
        pool.format_type(ty)
    ))
}

/// `x op y` where both operands have type `ty` (for shifts, `ty` is the
/// type of `x`).
pub fn binary(
    pool: &Pool,
    op: BinaryOp,
    ty: Idx,
    x: &Value,
    y: &Value,
) -> Result<Value, RuntimeFault> {
    if op.is_comparison() {
        return compare(pool, op, ty, x, y).map(Value::Bool);
    }
    let tag = value_kind(pool, ty);
    match (x, y) {
        (Value::Int(a), _) => int_op(tag, op, *a, y).ok_or_else(|| unsupported(op, pool, ty))?,
        (Value::Uint(a), _) => uint_op(tag, op, *a, y).ok_or_else(|| unsupported(op, pool, ty))?,
        (Value::Float(a), Value::Float(b)) => {
            let r = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => return Err(unsupported(op, pool, ty)),
            };
            Ok(Value::Float(round_float(tag, r)))
        }
        (Value::Complex(ar, ai), Value::Complex(br, bi)) => {
            let (re, im) = match op {
                BinaryOp::Add => (ar + br, ai + bi),
                BinaryOp::Sub => (ar - br, ai - bi),
                BinaryOp::Mul => (ar * br - ai * bi, ar * bi + ai * br),
                BinaryOp::Div => {
                    let d = br * br + bi * bi;
                    ((ar * br + ai * bi) / d, (ai * br - ar * bi) / d)
                }
                _ => return Err(unsupported(op, pool, ty)),
            };
            Ok(Value::Complex(round_float(tag, re), round_float(tag, im)))
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            let mut s = Vec::with_capacity(a.len() + b.len());
            s.extend_from_slice(a);
            s.extend_from_slice(b);
            Ok(Value::Str(Arc::from(s)))
        }
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::LogAnd => Ok(Value::Bool(*a && *b)),
            BinaryOp::LogOr => Ok(Value::Bool(*a || *b)),
            _ => Err(unsupported(op, pool, ty)),
        },
        _ => Err(unsupported(op, pool, ty)),
    }
}

fn shift_count(y: &Value) -> Result<u64, RuntimeFault> {
    match *y {
        Value::Int(c) if c < 0 => Err(RuntimeFault::NegativeShift),
        Value::Int(c) => Ok(c as u64),
        Value::Uint(c) => Ok(c),
        _ => Err(RuntimeFault::Unsupported("non-integer shift count".into())),
    }
}

/// `None` for an operator integers do not support.
fn int_op(tag: Tag, op: BinaryOp, a: i64, y: &Value) -> Option<Result<Value, RuntimeFault>> {
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        let n = match shift_count(y) {
            Ok(n) => n,
            Err(e) => return Some(Err(e)),
        };
        let r = match (op, n >= 64) {
            (BinaryOp::Shl, true) => 0,
            (BinaryOp::Shl, false) => a.wrapping_shl(n as u32),
            (_, true) => {
                if a < 0 {
                    -1
                } else {
                    0
                }
            }
            (_, false) => a >> n,
        };
        return Some(Ok(Value::Int(wrap_signed(tag, r))));
    }
    let b = y.as_i64()?;
    let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => {
            return Some(Err(RuntimeFault::DivideByZero))
        }
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::AndNot => a & !b,
        _ => return None,
    };
    Some(Ok(Value::Int(wrap_signed(tag, r))))
}

fn uint_op(tag: Tag, op: BinaryOp, a: u64, y: &Value) -> Option<Result<Value, RuntimeFault>> {
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        let n = match shift_count(y) {
            Ok(n) => n,
            Err(e) => return Some(Err(e)),
        };
        let r = match (op, n >= 64) {
            (_, true) => 0,
            (BinaryOp::Shl, false) => a.wrapping_shl(n as u32),
            (_, false) => a >> n,
        };
        return Some(Ok(Value::Uint(wrap_unsigned(tag, r))));
    }
    let b = y.as_i64()? as u64;
    let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => {
            return Some(Err(RuntimeFault::DivideByZero))
        }
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::AndNot => a & !b,
        _ => return None,
    };
    Some(Ok(Value::Uint(wrap_unsigned(tag, r))))
}

fn compare(pool: &Pool, op: BinaryOp, ty: Idx, x: &Value, y: &Value) -> Result<bool, RuntimeFault> {
    match op {
        BinaryOp::Eq => equal(pool, ty, x, y),
        BinaryOp::NotEq => equal(pool, ty, x, y).map(|e| !e),
        _ => {
            let Some(ord) = order(x, y) else {
                // NaN compares false with everything.
                return Ok(false);
            };
            Ok(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
    }
}

/// Ordering of two ordered values (integers, floats, strings).
pub fn order(x: &Value, y: &Value) -> Option<Ordering> {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Go's `==` for two values of type `ty`. Comparing interfaces whose
/// dynamic type is not comparable faults.
pub fn equal(pool: &Pool, ty: Idx, x: &Value, y: &Value) -> Result<bool, RuntimeFault> {
    Ok(match (x, y) {
        (Value::Interface(a), Value::Interface(b)) => match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if a.ty != b.ty {
                    false
                } else if !pool.comparable(a.ty) {
                    return Err(RuntimeFault::Uncomparable(pool.format_type(a.ty)));
                } else {
                    equal(pool, a.ty, &a.value, &b.value)?
                }
            }
            _ => false,
        },
        (Value::Struct(a), Value::Struct(b)) => {
            for (i, (fa, fb)) in a.iter().zip(b).enumerate() {
                if !equal(pool, pool.field(ty, i).ty, fa, fb)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Array(a), Value::Array(b)) => {
            let et = pool.elem(ty);
            for (ea, eb) in a.iter().zip(b) {
                if !equal(pool, et, ea, eb)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
        _ => x == y,
    })
}

pub fn unary(pool: &Pool, op: UnaryOp, ty: Idx, x: &Value) -> Result<Value, RuntimeFault> {
    let tag = value_kind(pool, ty);
    Ok(match (op, x) {
        (UnaryOp::Plus, v) => v.clone(),
        (UnaryOp::Neg, Value::Int(a)) => Value::Int(wrap_signed(tag, a.wrapping_neg())),
        (UnaryOp::Neg, Value::Uint(a)) => Value::Uint(wrap_unsigned(tag, a.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
        (UnaryOp::Neg, Value::Complex(re, im)) => Value::Complex(-re, -im),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Complement, Value::Int(a)) => Value::Int(wrap_signed(tag, !a)),
        (UnaryOp::Complement, Value::Uint(a)) => Value::Uint(wrap_unsigned(tag, !a)),
        _ => {
            return Err(RuntimeFault::Unsupported(format!(
                "operator {} on {}",
                op.as_symbol(),
                pool.format_type(ty)
            )))
        }
    })
}

fn float_to_u64(f: f64) -> u64 {
    if f < 0.0 {
        (f as i64) as u64
    } else {
        f as u64
    }
}

/// Numeric conversions and integer-to-string, to type `to`. Anything else
/// passes through unchanged.
pub fn convert_scalar(pool: &Pool, to: Idx, v: &Value) -> Value {
    let t = value_kind(pool, to);
    match *v {
        Value::Int(i) if t.is_unsigned() => Value::Uint(wrap_unsigned(t, i as u64)),
        Value::Uint(u) if t.is_unsigned() => Value::Uint(wrap_unsigned(t, u)),
        Value::Float(f) if t.is_unsigned() => Value::Uint(wrap_unsigned(t, float_to_u64(f))),
        Value::Int(i) if t.is_integer() => Value::Int(wrap_signed(t, i)),
        Value::Uint(u) if t.is_integer() => Value::Int(wrap_signed(t, u as i64)),
        Value::Float(f) if t.is_integer() => Value::Int(wrap_signed(t, f as i64)),
        Value::Int(i) if t.is_float() => Value::Float(round_float(t, i as f64)),
        Value::Uint(u) if t.is_float() => Value::Float(round_float(t, u as f64)),
        Value::Float(f) if t.is_float() => Value::Float(round_float(t, f)),
        Value::Complex(re, im) if t.is_complex() => {
            Value::Complex(round_float(t, re), round_float(t, im))
        }
        Value::Int(i) if t == Tag::String => Value::str(&rune_string(i)),
        Value::Uint(u) if t == Tag::String => {
            Value::str(&rune_string(i64::try_from(u).unwrap_or(-1)))
        }
        _ => v.clone(),
    }
}

/// UTF-8 encoding of rune `r`; invalid code points become U+FFFD.
pub fn rune_string(r: i64) -> String {
    u32::try_from(r)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string()
}

/// First rune of `b` and its width in bytes. Invalid encodings yield
/// `(U+FFFD, 1)`, as Go's range-over-string does.
pub fn decode_rune(b: &[u8]) -> (i64, usize) {
    const ERROR: (i64, usize) = (0xFFFD, 1);
    let Some(&b0) = b.first() else {
        return (0xFFFD, 0);
    };
    if b0 < 0x80 {
        return (i64::from(b0), 1);
    }
    let width = match b0 {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return ERROR,
    };
    let Some(head) = b.get(..width) else {
        return ERROR;
    };
    match std::str::from_utf8(head) {
        Ok(s) => s
            .chars()
            .next()
            .map_or(ERROR, |c| (i64::from(u32::from(c)), width)),
        Err(_) => ERROR,
    }
}

#[cfg(test)]
mod tests;
