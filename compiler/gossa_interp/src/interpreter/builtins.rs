//! Builtin functions.

use std::cmp::Ordering;

use gossa_ast::Builtin;
use gossa_types::{Idx, Tag};

use super::Execution;
use crate::errors::{internal, ExecResult, RuntimeFault};
use crate::format::runtime_float;
use crate::ops::{order, round_float, value_kind};
use crate::sched::Goroutine;
use crate::value::{chan_address, map_address, zero, MapKey, SliceRef, Value, FUNC_ADDRESS};

fn arg(args: &[Value], i: usize) -> ExecResult<&Value> {
    args.get(i)
        .ok_or_else(|| internal(format!("builtin call without argument {i}")))
}

fn arg_type(types: &[Idx], i: usize) -> ExecResult<Idx> {
    types
        .get(i)
        .copied()
        .ok_or_else(|| internal(format!("builtin call without the type of argument {i}")))
}

fn is_nan(v: &Value) -> bool {
    matches!(v, Value::Float(f) if f.is_nan())
}

impl<'p> Execution<'p> {
    pub(super) fn builtin(
        &mut self,
        g: &mut Goroutine,
        b: Builtin,
        args: &[Value],
        types: &[Idx],
        ty: Idx,
    ) -> ExecResult<Value> {
        let pool = self.pool;
        match b {
            Builtin::Len | Builtin::Cap => self.len_cap(b == Builtin::Cap, arg(args, 0)?, arg_type(types, 0)?),
            Builtin::Append => self.append(ty, arg(args, 0)?, arg(args, 1)?),
            Builtin::Copy => self.copy(arg(args, 0)?, arg(args, 1)?),
            Builtin::Delete => {
                if let Value::Map(id) = arg(args, 0)? {
                    let key = MapKey::of(pool, pool.key(arg_type(types, 0)?), arg(args, 1)?)?;
                    self.heap.map_mut(*id).remove(&key);
                }
                Ok(Value::Void)
            }
            Builtin::Close => match arg(args, 0)? {
                Value::Chan(ch) => {
                    self.sched.close(*ch)?;
                    Ok(Value::Void)
                }
                _ => Err(RuntimeFault::CloseOfNil.into()),
            },
            Builtin::Panic => Err(RuntimeFault::Panic(arg(args, 0)?.clone()).into()),
            Builtin::Recover => {
                let direct = g.frames.last().is_some_and(|f| f.can_recover);
                Ok(match &mut g.panic {
                    Some(p) if direct && !p.recovered => {
                        p.recovered = true;
                        p.value.clone()
                    }
                    _ => Value::Interface(None),
                })
            }
            Builtin::Print | Builtin::Println => {
                let newline = b == Builtin::Println;
                let mut text = String::new();
                for (i, v) in args.iter().enumerate() {
                    if newline && i > 0 {
                        text.push(' ');
                    }
                    text.push_str(&self.runtime_print(v));
                }
                if newline {
                    text.push('\n');
                }
                self.print.write(&text);
                Ok(Value::Void)
            }
            Builtin::Min | Builtin::Max => {
                let want = if b == Builtin::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best = arg(args, 0)?;
                for v in args.iter().skip(1) {
                    if is_nan(best) {
                        break;
                    }
                    if is_nan(v) || order(v, best) == Some(want) {
                        best = v;
                    }
                }
                Ok(best.clone())
            }
            Builtin::Clear => {
                match arg(args, 0)? {
                    Value::Map(id) => self.heap.map_mut(*id).clear(),
                    Value::Slice(s) => {
                        let elem = zero(pool, pool.elem(arg_type(types, 0)?));
                        for i in 0..s.len {
                            self.heap.store(&s.elem(i), elem.clone())?;
                        }
                    }
                    _ => {}
                }
                Ok(Value::Void)
            }
            Builtin::Complex => match (arg(args, 0)?, arg(args, 1)?) {
                (Value::Float(re), Value::Float(im)) => Ok(Value::Complex(*re, *im)),
                (re, im) => Err(internal(format!("complex({re:?}, {im:?})"))),
            },
            Builtin::Real | Builtin::Imag => match arg(args, 0)? {
                Value::Complex(re, im) => {
                    let part = if b == Builtin::Real { *re } else { *im };
                    Ok(Value::Float(round_float(value_kind(pool, ty), part)))
                }
                v => Err(internal(format!("{b} of {v:?}"))),
            },
            Builtin::Make | Builtin::New => Err(internal(format!("{b} reached the interpreter as a call"))),
        }
    }

    fn len_cap(&self, cap: bool, v: &Value, ty: Idx) -> ExecResult<Value> {
        let pool = self.pool;
        let n = match v {
            Value::Str(s) => s.len(),
            Value::Slice(s) if cap => s.cap,
            Value::Slice(s) => s.len,
            Value::Array(xs) => xs.len(),
            Value::Map(id) => self.heap.map(*id).len(),
            Value::Chan(ch) if cap => self.sched.chan_cap(*ch),
            Value::Chan(ch) => self.sched.chan_len(*ch),
            Value::Pointer(_) | Value::Nil if pool.under_tag(ty) == Tag::Pointer => {
                pool.array_len(pool.deref(ty)) as usize
            }
            Value::Nil => 0,
            other => return Err(internal(format!("len of {other:?}"))),
        };
        Ok(Value::Int(n as i64))
    }

    /// `append(s, extra...)`. Grows in place while capacity allows;
    /// otherwise copies into a new array of at least twice the capacity.
    fn append(&mut self, ty: Idx, s: &Value, extra: &Value) -> ExecResult<Value> {
        let extra: Vec<Value> = match extra {
            Value::Str(bytes) => bytes.iter().map(|&c| Value::Uint(u64::from(c))).collect(),
            v => self.heap.elems_of(v)?,
        };
        if extra.is_empty() {
            return Ok(s.clone());
        }
        let n = extra.len();
        if let Value::Slice(s) = s {
            if s.len + n <= s.cap {
                for (i, v) in extra.into_iter().enumerate() {
                    self.heap.store(&s.elem(s.len + i), v)?;
                }
                return Ok(Value::Slice(SliceRef {
                    len: s.len + n,
                    ..s.clone()
                }));
            }
        }
        let old_cap = match s {
            Value::Slice(s) => s.cap,
            _ => 0,
        };
        let mut elems = self.heap.elems_of(s)?;
        let len = elems.len() + n;
        let cap = (old_cap * 2).max(len);
        elems.extend(extra);
        elems.resize(cap, zero(self.pool, self.pool.elem(ty)));
        let array = self.heap.alloc(Value::Array(elems));
        Ok(Value::Slice(SliceRef {
            array,
            offset: 0,
            len,
            cap,
        }))
    }

    /// `copy(dst, src)`. The source is read in full before any store, so
    /// overlapping slices copy correctly.
    fn copy(&mut self, dst: &Value, src: &Value) -> ExecResult<Value> {
        let Value::Slice(d) = dst else {
            return Ok(Value::Int(0));
        };
        let src: Vec<Value> = match src {
            Value::Str(bytes) => bytes.iter().map(|&c| Value::Uint(u64::from(c))).collect(),
            v => self.heap.elems_of(v)?,
        };
        let n = d.len.min(src.len());
        for (i, v) in src.into_iter().take(n).enumerate() {
            self.heap.store(&d.elem(i), v)?;
        }
        Ok(Value::Int(n as i64))
    }

    /// `print`/`println` rendering of one operand.
    fn runtime_print(&self, v: &Value) -> String {
        match v {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Uint(u) => u.to_string(),
            Value::Float(f) => runtime_float(*f),
            Value::Complex(re, im) => format!("({}{}i)", runtime_float(*re), runtime_float(*im)),
            Value::Str(s) => String::from_utf8_lossy(s).into_owned(),
            Value::Nil | Value::Interface(None) => "0x0".to_owned(),
            Value::Pointer(p) => format!("{:#x}", p.address()),
            Value::Slice(s) => format!("[{}/{}]{:#x}", s.len, s.cap, s.array.address()),
            Value::Interface(Some(b)) => format!("({:#x},{})", 0x0049_0000 + u64::from(b.ty.raw()) * 0x20, self.runtime_print(&b.value)),
            Value::Map(id) => format!("{:#x}", map_address(*id)),
            Value::Chan(id) => format!("{:#x}", chan_address(*id)),
            Value::Func(_) => format!("{FUNC_ADDRESS:#x}"),
            other => format!("{other:?}"),
        }
    }
}
