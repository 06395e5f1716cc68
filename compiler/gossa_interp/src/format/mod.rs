//! Text rendering helpers shared by the `fmt` intrinsics and the `print`
//! builtins: float formatting, quoting, padding, and parsing of `Printf`
//! format strings.
//!
//! Rendering of whole values lives with the interpreter
//! (`interpreter/printing.rs`) because `Error` and `String` methods may run
//! user code.

use std::fmt::Write as _;

/// Parsed `%` directive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directive {
    pub plus: bool,
    pub minus: bool,
    pub sharp: bool,
    pub zero: bool,
    pub space: bool,
    pub width: Count,
    pub prec: Count,
    pub verb: char,
}

/// A width or precision.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Count {
    #[default]
    None,
    Lit(usize),
    /// `*`: taken from the next operand.
    Arg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Piece {
    Lit(Vec<u8>),
    Verb(Directive),
    /// `%` at the end of the format.
    NoVerb,
}

/// Split a `Printf` format into literal text and directives. `%%` becomes
/// literal text.
pub fn parse_format(format: &[u8]) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut lit = Vec::new();
    let mut i = 0;
    while i < format.len() {
        let b = format[i];
        if b != b'%' {
            lit.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let mut d = Directive::default();
        while let Some(&f) = format.get(i) {
            match f {
                b'+' => d.plus = true,
                b'-' => d.minus = true,
                b'#' => d.sharp = true,
                b'0' => d.zero = true,
                b' ' => d.space = true,
                _ => break,
            }
            i += 1;
        }
        d.width = parse_count(format, &mut i);
        if format.get(i) == Some(&b'.') {
            i += 1;
            d.prec = match parse_count(format, &mut i) {
                Count::None => Count::Lit(0),
                c => c,
            };
        }
        let Some(rest) = format.get(i..).filter(|r| !r.is_empty()) else {
            flush(&mut pieces, &mut lit);
            pieces.push(Piece::NoVerb);
            break;
        };
        let (verb, width) = first_char(rest);
        i += width;
        if verb == '%' {
            lit.push(b'%');
            continue;
        }
        d.verb = verb;
        flush(&mut pieces, &mut lit);
        pieces.push(Piece::Verb(d));
    }
    flush(&mut pieces, &mut lit);
    pieces
}

fn flush(pieces: &mut Vec<Piece>, lit: &mut Vec<u8>) {
    if !lit.is_empty() {
        pieces.push(Piece::Lit(std::mem::take(lit)));
    }
}

fn parse_count(format: &[u8], i: &mut usize) -> Count {
    if format.get(*i) == Some(&b'*') {
        *i += 1;
        return Count::Arg;
    }
    let start = *i;
    let mut n = 0usize;
    while let Some(&c) = format.get(*i).filter(|c| c.is_ascii_digit()) {
        n = n.saturating_mul(10).saturating_add(usize::from(c - b'0'));
        *i += 1;
    }
    if *i == start {
        Count::None
    } else {
        Count::Lit(n)
    }
}

fn first_char(b: &[u8]) -> (char, usize) {
    let (r, w) = crate::ops::decode_rune(b);
    let c = u32::try_from(r)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    (c, w.max(1))
}

/// Pad `s` to `width` characters. Zero padding goes after any sign.
pub fn pad(s: &str, width: usize, left: bool, zero: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_owned();
    }
    let fill = width - len;
    if left {
        return format!("{s}{}", " ".repeat(fill));
    }
    if zero {
        let (sign, digits) = match s.as_bytes().first() {
            Some(b'-' | b'+' | b' ') => s.split_at(1),
            _ => ("", s),
        };
        return format!("{sign}{}{digits}", "0".repeat(fill));
    }
    format!("{}{s}", " ".repeat(fill))
}

fn special_float(f: f64) -> Option<String> {
    if f.is_nan() {
        Some("NaN".to_owned())
    } else if f.is_infinite() {
        Some(if f > 0.0 { "+Inf" } else { "-Inf" }.to_owned())
    } else {
        None
    }
}

/// Split Rust's `{:e}` output into sign, digits and decimal exponent.
fn decimal_parts(sci: &str) -> (bool, String, i32) {
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci, "0"));
    let neg = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    (neg, digits, exp.parse().unwrap_or(0))
}

fn exponent(buf: &mut String, exp: i32, min_digits: usize) {
    buf.push('e');
    buf.push(if exp < 0 { '-' } else { '+' });
    let _ = write!(buf, "{:0min_digits$}", exp.unsigned_abs());
}

fn sci_from_digits(neg: bool, digits: &str, exp: i32) -> String {
    let mut buf = String::new();
    if neg {
        buf.push('-');
    }
    buf.push_str(&digits[..1]);
    if digits.len() > 1 {
        buf.push('.');
        buf.push_str(&digits[1..]);
    }
    exponent(&mut buf, exp, 2);
    buf
}

fn fixed_from_digits(neg: bool, digits: &str, exp: i32) -> String {
    let mut buf = String::new();
    if neg {
        buf.push('-');
    }
    if exp < 0 {
        buf.push_str("0.");
        buf.push_str(&"0".repeat((-exp - 1) as usize));
        buf.push_str(digits);
        return buf;
    }
    let int_len = exp as usize + 1;
    if digits.len() <= int_len {
        buf.push_str(digits);
        buf.push_str(&"0".repeat(int_len - digits.len()));
    } else {
        buf.push_str(&digits[..int_len]);
        buf.push('.');
        buf.push_str(&digits[int_len..]);
    }
    buf
}

fn strip_zeros(digits: &str) -> &str {
    let t = digits.trim_end_matches('0');
    if t.is_empty() {
        "0"
    } else {
        t
    }
}

/// Go's `%v` / `%g` for floats. `prec` is the number of significant
/// digits (`None`: shortest representation that round-trips at the given
/// size).
pub fn format_float_g(f: f64, prec: Option<usize>, single: bool) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    let sci = match (prec, single) {
        (Some(p), _) => format!("{:.*e}", p.max(1) - 1, f),
        (None, true) => format!("{:e}", f as f32),
        (None, false) => format!("{f:e}"),
    };
    let (neg, digits, exp) = decimal_parts(&sci);
    let digits = strip_zeros(&digits);
    let eprec = match prec {
        Some(p) => p.max(1) as i32,
        None => 6,
    };
    let eprec = if prec.is_some() && eprec > digits.len() as i32 && digits.len() as i32 >= exp + 1 {
        digits.len() as i32
    } else {
        eprec
    };
    if exp < -4 || exp >= eprec {
        sci_from_digits(neg, digits, exp)
    } else {
        fixed_from_digits(neg, digits, exp)
    }
}

/// Go's `%e` with `prec` digits after the point (default 6).
pub fn format_float_e(f: f64, prec: Option<usize>) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    let sci = format!("{:.*e}", prec.unwrap_or(6), f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let mut buf = mantissa.to_owned();
    exponent(&mut buf, exp.parse().unwrap_or(0), 2);
    buf
}

/// Go's `%f` with `prec` digits after the point (default 6).
pub fn format_float_f(f: f64, prec: Option<usize>) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    format!("{:.*}", prec.unwrap_or(6), f)
}

/// Float rendering of the `print`/`println` builtins: `+1.500000e+000`.
pub fn runtime_float(f: f64) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    let sci = format!("{:.6e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let mut buf = String::new();
    buf.push(if f.is_sign_negative() { '-' } else { '+' });
    buf.push_str(mantissa);
    exponent(&mut buf, exp.parse().unwrap_or(0), 3);
    buf
}

/// `strconv.Quote`: a double-quoted Go string literal.
pub fn quote(bytes: &[u8]) -> String {
    let mut buf = String::with_capacity(bytes.len() + 2);
    buf.push('"');
    let mut rest = bytes;
    while !rest.is_empty() {
        let (r, w) = crate::ops::decode_rune(rest);
        if r == 0xFFFD && w == 1 && !rest.starts_with("\u{FFFD}".as_bytes()) {
            let _ = write!(buf, "\\x{:02x}", rest[0]);
        } else {
            escape_rune(&mut buf, r, '"');
        }
        rest = &rest[w.max(1)..];
    }
    buf.push('"');
    buf
}

/// `strconv.QuoteRune`: a single-quoted Go rune literal.
pub fn quote_rune(r: i64) -> String {
    let mut buf = String::from("'");
    let r = if u32::try_from(r).ok().and_then(char::from_u32).is_some() {
        r
    } else {
        0xFFFD
    };
    escape_rune(&mut buf, r, '\'');
    buf.push('\'');
    buf
}

fn escape_rune(buf: &mut String, r: i64, quote: char) {
    let Some(c) = u32::try_from(r).ok().and_then(char::from_u32) else {
        buf.push(char::REPLACEMENT_CHARACTER);
        return;
    };
    match c {
        '\x07' => buf.push_str("\\a"),
        '\x08' => buf.push_str("\\b"),
        '\x0c' => buf.push_str("\\f"),
        '\n' => buf.push_str("\\n"),
        '\r' => buf.push_str("\\r"),
        '\t' => buf.push_str("\\t"),
        '\x0b' => buf.push_str("\\v"),
        '\\' => buf.push_str("\\\\"),
        c if c == quote => {
            buf.push('\\');
            buf.push(c);
        }
        c if (c as u32) < 0x20 || c == '\x7f' => {
            let _ = write!(buf, "\\x{:02x}", c as u32);
        }
        c if c.is_control() => {
            if (c as u32) < 0x10000 {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            } else {
                let _ = write!(buf, "\\U{:08x}", c as u32);
            }
        }
        c => buf.push(c),
    }
}

/// Integer in base `base` with Go's `#` prefixes.
pub fn format_int(neg: bool, magnitude: u64, verb: char, d: &Directive) -> String {
    let digits = match verb {
        'b' => format!("{magnitude:b}"),
        'o' | 'O' => format!("{magnitude:o}"),
        'x' => format!("{magnitude:x}"),
        'X' => format!("{magnitude:X}"),
        _ => magnitude.to_string(),
    };
    let digits = match d.prec {
        Count::Lit(p) if digits.len() < p => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    };
    let prefix = match (verb, d.sharp) {
        ('b', true) => "0b",
        ('o', true) => "0",
        ('O', _) => "0o",
        ('x', true) => "0x",
        ('X', true) => "0X",
        _ => "",
    };
    let sign = if neg {
        "-"
    } else if d.plus {
        "+"
    } else if d.space {
        " "
    } else {
        ""
    };
    format!("{sign}{prefix}{digits}")
}

/// Lowercase (or uppercase) hex of `bytes`, as `%x` renders strings.
pub fn hex_bytes(bytes: &[u8], upper: bool, spaced: bool) -> String {
    let mut buf = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if spaced && i > 0 {
            buf.push(' ');
        }
        if upper {
            let _ = write!(buf, "{b:02X}");
        } else {
            let _ = write!(buf, "{b:02x}");
        }
    }
    buf
}

#[cfg(test)]
mod tests;
