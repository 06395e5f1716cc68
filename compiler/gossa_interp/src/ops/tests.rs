use gossa_ir::{BinaryOp, UnaryOp};
use gossa_types::{Field, Idx, Pool};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::RuntimeFault;
use crate::value::Value;

fn bin(pool: &Pool, op: BinaryOp, ty: Idx, x: Value, y: Value) -> Value {
    binary(pool, op, ty, &x, &y).unwrap()
}

#[test]
fn integer_arithmetic_wraps_to_width() {
    let pool = Pool::new();
    assert_eq!(
        bin(&pool, BinaryOp::Add, Idx::INT8, Value::Int(127), Value::Int(1)),
        Value::Int(-128)
    );
    assert_eq!(
        bin(&pool, BinaryOp::Sub, Idx::UINT8, Value::Uint(0), Value::Uint(1)),
        Value::Uint(255)
    );
    assert_eq!(
        bin(&pool, BinaryOp::Div, Idx::INT8, Value::Int(-128), Value::Int(-1)),
        Value::Int(-128)
    );
    assert_eq!(
        bin(&pool, BinaryOp::Mul, Idx::INT, Value::Int(i64::MAX), Value::Int(2)),
        Value::Int(-2)
    );
    assert_eq!(
        bin(&pool, BinaryOp::AndNot, Idx::UINT, Value::Uint(0b1111), Value::Uint(0b0101)),
        Value::Uint(0b1010)
    );
}

#[test]
fn division_by_zero_faults_for_integers_only() {
    let pool = Pool::new();
    let err = binary(&pool, BinaryOp::Rem, Idx::INT, &Value::Int(1), &Value::Int(0)).unwrap_err();
    assert!(matches!(err, RuntimeFault::DivideByZero));
    let inf = bin(&pool, BinaryOp::Div, Idx::FLOAT64, Value::Float(1.0), Value::Float(0.0));
    assert_eq!(inf, Value::Float(f64::INFINITY));
}

#[test]
fn shifts_saturate_and_reject_negative_counts() {
    let pool = Pool::new();
    assert_eq!(
        bin(&pool, BinaryOp::Shl, Idx::INT32, Value::Int(1), Value::Uint(31)),
        Value::Int(i64::from(i32::MIN))
    );
    assert_eq!(
        bin(&pool, BinaryOp::Shl, Idx::INT, Value::Int(1), Value::Uint(64)),
        Value::Int(0)
    );
    assert_eq!(
        bin(&pool, BinaryOp::Shr, Idx::INT, Value::Int(-8), Value::Uint(100)),
        Value::Int(-1)
    );
    assert_eq!(
        bin(&pool, BinaryOp::Shr, Idx::UINT8, Value::Uint(0x80), Value::Int(7)),
        Value::Uint(1)
    );
    let err = binary(&pool, BinaryOp::Shl, Idx::INT, &Value::Int(1), &Value::Int(-1)).unwrap_err();
    assert!(matches!(err, RuntimeFault::NegativeShift));
}

#[test]
fn float32_results_round_to_single_precision() {
    let pool = Pool::new();
    let v = bin(&pool, BinaryOp::Add, Idx::FLOAT32, Value::Float(0.1), Value::Float(0.2));
    assert_eq!(v, Value::Float(f64::from(0.1f32 + 0.2f32)));
}

#[test]
fn string_concatenation_and_ordering() {
    let pool = Pool::new();
    assert_eq!(
        bin(&pool, BinaryOp::Add, Idx::STRING, Value::str("go"), Value::str("ssa")),
        Value::str("gossa")
    );
    assert_eq!(
        bin(&pool, BinaryOp::Lt, Idx::STRING, Value::str("a"), Value::str("b")),
        Value::Bool(true)
    );
    assert_eq!(
        bin(&pool, BinaryOp::GtEq, Idx::FLOAT64, Value::Float(f64::NAN), Value::Float(1.0)),
        Value::Bool(false)
    );
}

#[test]
fn interface_equality_compares_dynamic_types() {
    let pool = Pool::new();
    let one_int = Value::boxed(Idx::INT, Value::Int(1));
    let one_i64 = Value::boxed(Idx::INT64, Value::Int(1));
    assert_eq!(equal(&pool, Idx::ANY, &one_int, &one_int.clone()).unwrap(), true);
    assert_eq!(equal(&pool, Idx::ANY, &one_int, &one_i64).unwrap(), false);
    assert_eq!(
        equal(&pool, Idx::ANY, &Value::Interface(None), &one_int).unwrap(),
        false
    );
}

#[test]
fn comparing_uncomparable_dynamic_types_faults() {
    let mut pool = Pool::new();
    let slice = pool.slice(Idx::INT);
    let a = Value::boxed(slice, Value::Nil);
    let err = equal(&pool, Idx::ANY, &a, &a.clone()).unwrap_err();
    assert_eq!(err.to_string(), "runtime error: comparing uncomparable type []int");
}

#[test]
fn struct_equality_recurses_with_field_types() {
    let mut pool = Pool::new();
    let x = pool.intern_name("X");
    let y = pool.intern_name("Y");
    let st = pool.struct_type(&[Field::new(x, Idx::INT), Field::new(y, Idx::ANY)]);
    let a = Value::Struct(vec![Value::Int(1), Value::boxed(Idx::STRING, Value::str("s"))]);
    let b = Value::Struct(vec![Value::Int(1), Value::boxed(Idx::STRING, Value::str("s"))]);
    let c = Value::Struct(vec![Value::Int(2), Value::Interface(None)]);
    assert!(equal(&pool, st, &a, &b).unwrap());
    assert!(!equal(&pool, st, &a, &c).unwrap());
}

#[test]
fn unary_operators() {
    let pool = Pool::new();
    assert_eq!(
        unary(&pool, UnaryOp::Neg, Idx::INT8, &Value::Int(-128)).unwrap(),
        Value::Int(-128)
    );
    assert_eq!(
        unary(&pool, UnaryOp::Complement, Idx::UINT8, &Value::Uint(0)).unwrap(),
        Value::Uint(255)
    );
    assert_eq!(
        unary(&pool, UnaryOp::Not, Idx::BOOL, &Value::Bool(true)).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn scalar_conversions() {
    let pool = Pool::new();
    assert_eq!(convert_scalar(&pool, Idx::UINT8, &Value::Int(-1)), Value::Uint(255));
    assert_eq!(convert_scalar(&pool, Idx::INT8, &Value::Uint(200)), Value::Int(-56));
    assert_eq!(convert_scalar(&pool, Idx::INT, &Value::Float(-3.9)), Value::Int(-3));
    assert_eq!(convert_scalar(&pool, Idx::FLOAT64, &Value::Int(3)), Value::Float(3.0));
    assert_eq!(convert_scalar(&pool, Idx::STRING, &Value::Int(0x4e16)), Value::str("世"));
    assert_eq!(convert_scalar(&pool, Idx::STRING, &Value::Int(-1)), Value::str("\u{FFFD}"));
}

#[test]
fn rune_decoding() {
    assert_eq!(decode_rune(b"a"), (97, 1));
    assert_eq!(decode_rune("é".as_bytes()), (0xe9, 2));
    assert_eq!(decode_rune(&[0xff, b'a']), (0xFFFD, 1));
    // Truncated sequence.
    assert_eq!(decode_rune(&[0xe4, 0xb8]), (0xFFFD, 1));
    assert_eq!(decode_rune(b""), (0xFFFD, 0));
}
