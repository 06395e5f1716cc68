use pretty_assertions::assert_eq;

use super::*;

#[test]
fn shortest_floats_match_go() {
    let cases: &[(f64, &str)] = &[
        (3.14, "3.14"),
        (100.0, "100"),
        (123_456.0, "123456"),
        (1_234_567.0, "1.234567e+06"),
        (1e21, "1e+21"),
        (0.0001, "0.0001"),
        (0.00001, "1e-05"),
        (-2.5, "-2.5"),
        (0.0, "0"),
        (f64::INFINITY, "+Inf"),
        (f64::NAN, "NaN"),
    ];
    for &(f, want) in cases {
        assert_eq!(format_float_g(f, None, false), want, "{f}");
    }
    assert_eq!(format_float_g(f64::from(0.1f32), None, true), "0.1");
}

#[test]
fn float32_shortest_uses_single_precision_digits() {
    assert_eq!(format_float_g(f64::from(1.1f32), None, true), "1.1");
    assert_eq!(format_float_g(f64::from(1.1f32), None, false), "1.100000023841858");
    assert_eq!(format_float_g(f64::from(16_777_216f32), None, true), "1.6777216e+07");
}

#[test]
fn precision_floats() {
    assert_eq!(format_float_f(3.14159, Some(2)), "3.14");
    assert_eq!(format_float_f(2.0, None), "2.000000");
    assert_eq!(format_float_e(1234.5678, Some(2)), "1.23e+03");
    assert_eq!(format_float_g(1.0, Some(3), false), "1");
    assert_eq!(format_float_g(123_456.0, Some(3), false), "1.23e+05");
    assert_eq!(format_float_g(f64::from(1.1f32), Some(3), true), "1.1");
    assert_eq!(runtime_float(1.5), "+1.500000e+000");
    assert_eq!(runtime_float(-0.25), "-2.500000e-001");
}

#[test]
fn quoting() {
    assert_eq!(quote(b"hi\n"), r#""hi\n""#);
    assert_eq!(quote("say \"x\"".as_bytes()), r#""say \"x\"""#);
    assert_eq!(quote("héllo".as_bytes()), "\"héllo\"");
    assert_eq!(quote(&[0xff]), r#""\xff""#);
    assert_eq!(quote(b"\x01"), r#""\x01""#);
    assert_eq!(quote_rune(i64::from(b'a')), "'a'");
    assert_eq!(quote_rune(i64::from(b'\'')), r"'\''");
}

#[test]
fn padding() {
    assert_eq!(pad("42", 5, false, false), "   42");
    assert_eq!(pad("42", 5, true, false), "42   ");
    assert_eq!(pad("-42", 5, false, true), "-0042");
    assert_eq!(pad("long", 2, false, false), "long");
}

#[test]
fn parses_directives() {
    let pieces = parse_format(b"x=%-5d|%+.2f%%%v%");
    assert_eq!(pieces.len(), 7);
    assert_eq!(pieces[0], Piece::Lit(b"x=".to_vec()));
    let Piece::Verb(d) = &pieces[1] else {
        panic!("expected a verb");
    };
    assert!(d.minus);
    assert_eq!(d.width, Count::Lit(5));
    assert_eq!(d.verb, 'd');
    let Piece::Verb(f) = &pieces[3] else {
        panic!("expected a verb");
    };
    assert!(f.plus);
    assert_eq!(f.prec, Count::Lit(2));
    assert_eq!(pieces[4], Piece::Lit(b"%".to_vec()));
    assert!(matches!(&pieces[5], Piece::Verb(v) if v.verb == 'v'));
    assert_eq!(pieces[6], Piece::NoVerb);
}

#[test]
fn integer_bases() {
    let d = Directive {
        sharp: true,
        ..Directive::default()
    };
    assert_eq!(format_int(false, 255, 'x', &d), "0xff");
    assert_eq!(format_int(true, 5, 'b', &Directive::default()), "-101");
    assert_eq!(format_int(false, 8, 'o', &d), "010");
    assert_eq!(hex_bytes(b"hi", false, false), "6869");
}
