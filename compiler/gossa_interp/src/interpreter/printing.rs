//! `fmt` rendering of values.
//!
//! Operands arrive boxed in interfaces, as elements of the `[]any` the
//! print functions take. `Error` and `String` methods run as user code, so
//! rendering lives on [`Execution`].

use gossa_types::{Idx, Tag};

use super::Execution;
use crate::errors::{internal, ExecResult, Trap};
use crate::format::{
    format_float_e, format_float_f, format_float_g, format_int, hex_bytes, pad, parse_format,
    quote, quote_rune, Count, Directive, Piece,
};
use crate::ops::value_kind;
use crate::reflect::Kind;
use crate::value::{chan_address, map_address, MapKey, Value, FUNC_ADDRESS};

/// A directive with `%+v` and `%#v` split out of the flags, since they
/// change structure rendering rather than number rendering.
#[derive(Clone, Debug)]
struct Spec {
    d: Directive,
    plus_v: bool,
    sharp_v: bool,
}

impl Spec {
    fn new(mut d: Directive) -> Self {
        let (plus_v, sharp_v) = if d.verb == 'v' {
            (std::mem::take(&mut d.plus), std::mem::take(&mut d.sharp))
        } else {
            (false, false)
        };
        Spec { d, plus_v, sharp_v }
    }

    fn plain() -> Self {
        Spec::new(Directive {
            verb: 'v',
            ..Directive::default()
        })
    }

    fn verb(&self) -> char {
        self.d.verb
    }

    fn prec(&self) -> Option<usize> {
        match self.d.prec {
            Count::Lit(p) => Some(p),
            _ => None,
        }
    }

    fn pad(&self, s: &str, numeric: bool) -> String {
        match self.d.width {
            Count::Lit(w) => pad(s, w, self.d.minus, numeric && self.d.zero && !self.d.minus),
            _ => s.to_owned(),
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn lossy(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}

impl<'p> Execution<'p> {
    /// `fmt.Sprint` (`line` false) and `fmt.Sprintln`.
    pub(super) fn sprint(&mut self, args: &[Value], line: bool) -> ExecResult<String> {
        let pool = self.pool;
        let is_string = |v: &Value| {
            matches!(v, Value::Interface(Some(b)) if value_kind(pool, b.ty) == Tag::String)
        };
        let spec = Spec::plain();
        let mut out = String::new();
        for (i, a) in args.iter().enumerate() {
            if i > 0 && (line || !(is_string(a) || is_string(&args[i - 1]))) {
                out.push(' ');
            }
            self.fmt_arg(&mut out, a, &spec)?;
        }
        if line {
            out.push('\n');
        }
        Ok(out)
    }

    /// `fmt.Sprintf`. With `wrap`, `%w` renders as `%v` (`fmt.Errorf`).
    pub(super) fn sprintf(&mut self, format: &[u8], args: &[Value], wrap: bool) -> ExecResult<String> {
        let mut out = String::new();
        let mut next = 0;
        for piece in parse_format(format) {
            let mut d = match piece {
                Piece::Lit(text) => {
                    out.push_str(&lossy(&text));
                    continue;
                }
                Piece::NoVerb => {
                    out.push_str("%!(NOVERB)");
                    continue;
                }
                Piece::Verb(d) => d,
            };
            if wrap && d.verb == 'w' {
                d.verb = 'v';
            }
            if d.width == Count::Arg {
                d.width = match args.get(next).and_then(|a| self.int_operand(a)) {
                    Some(w) if w < 0 => {
                        d.minus = true;
                        Count::Lit(w.unsigned_abs() as usize)
                    }
                    Some(w) => Count::Lit(w as usize),
                    None => {
                        out.push_str("%!(BADWIDTH)");
                        Count::None
                    }
                };
                next += 1;
            }
            if d.prec == Count::Arg {
                d.prec = match args.get(next).and_then(|a| self.int_operand(a)) {
                    Some(p) if p >= 0 => Count::Lit(p as usize),
                    _ => {
                        out.push_str("%!(BADPREC)");
                        Count::None
                    }
                };
                next += 1;
            }
            match args.get(next) {
                Some(a) => {
                    self.fmt_arg(&mut out, a, &Spec::new(d))?;
                    next += 1;
                }
                None => {
                    out.push_str("%!");
                    out.push(d.verb);
                    out.push_str("(MISSING)");
                }
            }
        }
        if next < args.len() {
            out.push_str("%!(EXTRA ");
            for (i, a) in args[next..].iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match a {
                    Value::Interface(Some(b)) => {
                        out.push_str(&self.pool.format_type(b.ty));
                        out.push('=');
                        self.fmt_value(&mut out, b.ty, &b.value, &Spec::plain(), 0, true)?;
                    }
                    _ => out.push_str("<nil>"),
                }
            }
            out.push(')');
        }
        Ok(out)
    }

    fn int_operand(&self, a: &Value) -> Option<i64> {
        match a {
            Value::Interface(Some(b)) if value_kind(self.pool, b.ty).is_integer() => b.value.as_i64(),
            _ => None,
        }
    }

    /// Render one `[]any` element.
    fn fmt_arg(&mut self, out: &mut String, arg: &Value, spec: &Spec) -> ExecResult<()> {
        let Value::Interface(Some(b)) = arg else {
            match spec.verb() {
                'T' | 'v' => out.push_str(&spec.pad("<nil>", false)),
                verb => {
                    out.push_str("%!");
                    out.push(verb);
                    out.push_str("(<nil>)");
                }
            }
            return Ok(());
        };
        match spec.verb() {
            'T' => {
                out.push_str(&spec.pad(&self.pool.format_type(b.ty), false));
                Ok(())
            }
            'p' => {
                let addr = match &b.value {
                    Value::Pointer(p) => Some(p.address()),
                    Value::Slice(s) => Some(s.elem(0).address()),
                    Value::Map(id) => Some(map_address(*id)),
                    Value::Chan(id) => Some(chan_address(*id)),
                    Value::Func(_) => Some(FUNC_ADDRESS),
                    Value::Nil => Some(0),
                    _ => None,
                };
                match addr {
                    Some(a) => out.push_str(&spec.pad(&format!("{a:#x}"), false)),
                    None => self.bad_verb(out, b.ty, &b.value, spec)?,
                }
                Ok(())
            }
            _ => self.fmt_value(out, b.ty, &b.value, spec, 0, true),
        }
    }

    /// `%!d(string=hi)`.
    fn bad_verb(&mut self, out: &mut String, ty: Idx, v: &Value, spec: &Spec) -> ExecResult<()> {
        out.push_str("%!");
        out.push(spec.verb());
        out.push('(');
        out.push_str(&self.pool.format_type(ty));
        out.push('=');
        self.fmt_value(out, ty, v, &Spec::plain(), 0, false)?;
        out.push(')');
        Ok(())
    }

    /// Result of an `Error` or `String` method, if `ty` has one and the
    /// verb renders through it.
    fn method_text(&mut self, ty: Idx, v: &Value, spec: &Spec) -> ExecResult<Option<String>> {
        if spec.sharp_v || !matches!(spec.verb(), 'v' | 's' | 'x' | 'X' | 'q') {
            return Ok(None);
        }
        let pool = self.pool;
        for name in [self.names.error, self.names.string] {
            let has = self.program.method(ty, name).is_some()
                && self
                    .msets
                    .lookup(pool, ty, name)
                    .is_some_and(|m| m.sig == Idx::ERROR_SIG);
            if !has {
                continue;
            }
            let boxed = Value::boxed(ty, v.clone());
            let result = match self.resolve_invoke(&boxed, name) {
                Ok(callee) => self.call_sync(callee, Vec::new())?,
                Err(Trap::Fault(f)) => Err(self.fault_value(f)),
                Err(trap) => return Err(trap),
            };
            return Ok(Some(match result {
                Ok(Value::Str(s)) => lossy(&s),
                Ok(other) => return Err(internal(format!("{} returned {other:?}", pool.name_str(name)))),
                Err(_) if v.is_nil() => "<nil>".to_owned(),
                Err(panic) => {
                    let msg = self.panic_message(&panic);
                    format!("%!{}(PANIC={} method: {msg})", spec.verb(), pool.name_str(name))
                }
            }));
        }
        Ok(None)
    }

    fn is_reflect_kind(&self, ty: Idx) -> bool {
        let pool = self.pool;
        pool.is_named(ty) && {
            let info = pool.named_info(ty);
            pool.name_str(info.pkg) == "reflect" && pool.name_str(info.name) == "Kind"
        }
    }

    /// Render `v` of static type `ty`. `methods` is false below unexported
    /// struct fields, where `Error` and `String` are not consulted.
    #[allow(clippy::too_many_lines)]
    fn fmt_value(
        &mut self,
        out: &mut String,
        ty: Idx,
        v: &Value,
        spec: &Spec,
        depth: usize,
        methods: bool,
    ) -> ExecResult<()> {
        if methods {
            if let Some(text) = self.method_text(ty, v, spec)? {
                match self.fmt_string(text.as_bytes(), spec) {
                    Some(s) => out.push_str(&s),
                    None => out.push_str(&text),
                }
                return Ok(());
            }
        }
        let pool = self.pool;
        let verb = spec.verb();
        match v {
            Value::Uint(k) if self.is_reflect_kind(ty) && matches!(verb, 'v' | 's') => {
                let name = Kind::from_raw(*k).map_or("invalid", Kind::name);
                out.push_str(&spec.pad(name, false));
            }
            Value::Bool(b) => match verb {
                'v' | 't' => out.push_str(&spec.pad(&b.to_string(), false)),
                _ => self.bad_verb(out, ty, v, spec)?,
            },
            Value::Int(i) => match self.fmt_integer(i.is_negative(), i.unsigned_abs(), spec) {
                Some(s) => out.push_str(&s),
                None => self.bad_verb(out, ty, v, spec)?,
            },
            Value::Uint(u) => match self.fmt_integer(false, *u, spec) {
                Some(s) => out.push_str(&s),
                None => self.bad_verb(out, ty, v, spec)?,
            },
            Value::Float(f) => {
                let single = value_kind(pool, ty) == Tag::Float32;
                match fmt_float(*f, spec, single) {
                    Some(s) => out.push_str(&spec.pad(&s, true)),
                    None => self.bad_verb(out, ty, v, spec)?,
                }
            }
            Value::Complex(re, im) => {
                let single = value_kind(pool, ty) == Tag::Complex64;
                let im_spec = Spec::new(Directive {
                    plus: true,
                    ..spec.d.clone()
                });
                match (fmt_float(*re, spec, single), fmt_float(*im, &im_spec, single)) {
                    (Some(r), Some(i)) => out.push_str(&spec.pad(&format!("({r}{i}i)"), false)),
                    _ => self.bad_verb(out, ty, v, spec)?,
                }
            }
            Value::Str(s) => match self.fmt_string(s, spec) {
                Some(text) => out.push_str(&text),
                None => self.bad_verb(out, ty, v, spec)?,
            },
            Value::Interface(None) => {
                if spec.sharp_v {
                    out.push_str(&pool.format_type(ty));
                    out.push_str("(nil)");
                } else {
                    out.push_str(&spec.pad("<nil>", false));
                }
            }
            Value::Interface(Some(b)) | Value::ReflectValue(Some(b)) => {
                self.fmt_value(out, b.ty, &b.value, spec, depth + 1, methods)?;
            }
            Value::ReflectValue(None) => out.push_str("<invalid reflect.Value>"),
            Value::ReflectType(t) => {
                let name = pool.format_type(*t);
                out.push_str(&self.fmt_string(name.as_bytes(), spec).unwrap_or(name));
            }
            Value::Nil => {
                let kind = value_kind(pool, ty);
                if spec.sharp_v {
                    out.push_str(&format!("{}(nil)", pool.format_type(ty)));
                } else {
                    match (kind, verb) {
                        (Tag::Slice, 'v' | 'd' | 's' | 'q' | 'x' | 'X') => out.push_str("[]"),
                        (Tag::Map, 'v') => out.push_str("map[]"),
                        (_, 'v') => out.push_str(&spec.pad("<nil>", false)),
                        _ => self.bad_verb(out, ty, v, spec)?,
                    }
                }
            }
            Value::Pointer(p) => {
                let elem = pool.deref(ty);
                let aggregate = matches!(
                    value_kind(pool, elem),
                    Tag::Struct | Tag::Array | Tag::Slice | Tag::Map
                );
                if depth == 0 && verb == 'v' && aggregate {
                    out.push('&');
                    let pointee = self.heap.load(p)?;
                    return self.fmt_value(out, elem, &pointee, spec, depth + 1, methods);
                }
                match verb {
                    'v' | 'x' | 'X' if spec.sharp_v => {
                        out.push_str(&format!("({}){:#x}", pool.format_type(ty), p.address()));
                    }
                    'v' => out.push_str(&spec.pad(&format!("{:#x}", p.address()), false)),
                    'x' => out.push_str(&spec.pad(&format!("{:x}", p.address()), false)),
                    'X' => out.push_str(&spec.pad(&format!("{:X}", p.address()), false)),
                    _ => self.bad_verb(out, ty, v, spec)?,
                }
            }
            Value::Slice(_) | Value::Array(_) => {
                let elem = pool.elem(ty);
                let elems = match v {
                    Value::Array(xs) => xs.clone(),
                    _ => self.heap.elems_of(v)?,
                };
                if value_kind(pool, elem) == Tag::Uint8 && matches!(verb, 's' | 'q' | 'x' | 'X') {
                    let bytes: Vec<u8> = elems.iter().filter_map(Value::as_i64).map(|b| b as u8).collect();
                    if let Some(s) = self.fmt_string(&bytes, spec) {
                        out.push_str(&s);
                        return Ok(());
                    }
                }
                if spec.sharp_v {
                    out.push_str(&pool.format_type(ty));
                    out.push('{');
                } else {
                    out.push('[');
                }
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push_str(if spec.sharp_v { ", " } else { " " });
                    }
                    self.fmt_value(out, elem, e, spec, depth + 1, methods)?;
                }
                out.push(if spec.sharp_v { '}' } else { ']' });
            }
            Value::Map(id) => {
                let (kt, et) = (pool.key(ty), pool.elem(ty));
                let mut entries: Vec<(MapKey, Value, Value)> = self
                    .heap
                    .map(*id)
                    .entries()
                    .iter()
                    .map(|e| (e.key.clone(), e.k.clone(), e.v.clone()))
                    .collect();
                entries.sort_by(|a, b| a.0.sort_cmp(&b.0));
                if spec.sharp_v {
                    out.push_str(&pool.format_type(ty));
                    out.push('{');
                } else {
                    out.push_str("map[");
                }
                for (i, (_, k, e)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(if spec.sharp_v { ", " } else { " " });
                    }
                    self.fmt_value(out, kt, k, spec, depth + 1, methods)?;
                    out.push(':');
                    self.fmt_value(out, et, e, spec, depth + 1, methods)?;
                }
                out.push(if spec.sharp_v { '}' } else { ']' });
            }
            Value::Struct(fields) => {
                if spec.sharp_v {
                    out.push_str(&pool.format_type(ty));
                }
                out.push('{');
                for (i, (fv, f)) in fields.iter().zip(pool.fields(ty)).enumerate() {
                    if i > 0 {
                        out.push_str(if spec.sharp_v { ", " } else { " " });
                    }
                    let name = pool.name_str(f.name);
                    if spec.plus_v || spec.sharp_v {
                        out.push_str(name);
                        out.push(':');
                    }
                    self.fmt_value(out, f.ty, fv, spec, depth + 1, methods && is_exported(name))?;
                }
                out.push('}');
            }
            Value::Chan(id) => out.push_str(&spec.pad(&format!("{:#x}", chan_address(*id)), false)),
            Value::Func(_) => out.push_str(&spec.pad(&format!("{FUNC_ADDRESS:#x}"), false)),
            Value::Void | Value::Tuple(_) | Value::Iter(_) => {
                return Err(internal(format!("formatting non-value {v:?}")));
            }
        }
        Ok(())
    }

    fn fmt_integer(&self, neg: bool, mag: u64, spec: &Spec) -> Option<String> {
        let d = &spec.d;
        let text = match d.verb {
            'v' | 'd' => format_int(neg, mag, 'd', d),
            'b' | 'o' | 'O' | 'x' | 'X' => format_int(neg, mag, d.verb, d),
            'c' => {
                let r = if neg { -1 } else { i64::try_from(mag).unwrap_or(-1) };
                crate::ops::rune_string(r)
            }
            'q' => quote_rune(if neg { -1 } else { i64::try_from(mag).unwrap_or(-1) }),
            'U' => format!("U+{mag:04X}"),
            _ => return None,
        };
        let numeric = !matches!(d.verb, 'c' | 'q' | 'U');
        Some(spec.pad(&text, numeric))
    }

    /// Render a string or byte slice; `None` for verbs strings do not take.
    fn fmt_string(&self, s: &[u8], spec: &Spec) -> Option<String> {
        let text = match spec.verb() {
            'v' if spec.sharp_v => quote(s),
            'v' | 's' => {
                let text = lossy(s);
                match spec.prec() {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
            'q' => quote(s),
            'x' => hex_bytes(s, false, spec.d.space),
            'X' => hex_bytes(s, true, spec.d.space),
            _ => return None,
        };
        Some(spec.pad(&text, false))
    }
}

fn fmt_float(f: f64, spec: &Spec, single: bool) -> Option<String> {
    let prec = spec.prec();
    let text = match spec.verb() {
        'v' | 'g' => format_float_g(f, prec, single),
        'G' => format_float_g(f, prec, single).to_uppercase(),
        'e' => format_float_e(f, prec),
        'E' => format_float_e(f, prec).to_uppercase(),
        'f' | 'F' => format_float_f(f, prec),
        _ => return None,
    };
    Some(if spec.d.plus && !text.starts_with(['-', '+']) {
        format!("+{text}")
    } else {
        text
    })
}
