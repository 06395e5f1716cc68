//! Instruction execution, φ transitions and terminators.

use std::sync::Arc;

use gossa_ssa::{BlockId, BoundTarget, Function, Instr, Terminator, VarId};
use gossa_types::{Idx, Tag};
use smallvec::SmallVec;
use tracing::trace;

use super::frame::{Frame, FrameMode, ReturnTo};
use super::{Execution, Flow};
use crate::errors::{internal, ExecResult, RuntimeFault};
use crate::heap::IterState;
use crate::ops::{self, decode_rune, value_kind};
use crate::sched::Goroutine;
use crate::value::{from_const, zero, Callable, MapKey, SliceRef, Value};

/// Largest `make` length or capacity accepted.
const MAX_MAKE: i64 = 1 << 31;

pub(super) fn top(g: &mut Goroutine) -> ExecResult<&mut Frame> {
    g.frames
        .last_mut()
        .ok_or_else(|| internal("goroutine has no active frame"))
}

/// Results of a call as one register value.
pub(super) fn pack(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Void,
        1 => values.pop().unwrap_or(Value::Void),
        _ => Value::Tuple(values),
    }
}

fn int_of(v: &Value) -> ExecResult<i64> {
    v.as_i64()
        .ok_or_else(|| internal(format!("expected an integer, found {v:?}")))
}

fn check_index(index: i64, len: usize) -> Result<usize, RuntimeFault> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(RuntimeFault::IndexOutOfRange { index, len })
}

/// Validate `x[low:high:max]` against `cap` (the length, for strings).
fn check_slice(
    low: i64,
    high: i64,
    max: Option<i64>,
    cap: usize,
    string: bool,
) -> Result<(usize, usize, usize), RuntimeFault> {
    let cap_i = cap as i64;
    let bounds = |msg: String| RuntimeFault::SliceBounds(msg);
    let what = if string { "length" } else { "capacity" };
    if let Some(m) = max {
        if m < 0 || m > cap_i {
            return Err(bounds(format!("[::{m}] with capacity {cap}")));
        }
        if high < 0 || high > m {
            return Err(bounds(format!("[:{high}:{m}]")));
        }
        if low < 0 || low > high {
            return Err(bounds(format!("[{low}:{high}:]")));
        }
        return Ok((low as usize, high as usize, m as usize));
    }
    if high < 0 || high > cap_i {
        return Err(bounds(format!("[:{high}] with {what} {cap}")));
    }
    if low < 0 || low > high {
        return Err(bounds(format!("[{low}:{high}]")));
    }
    Ok((low as usize, high as usize, cap))
}

impl<'p> Execution<'p> {
    /// Run the next instruction or terminator of `g`'s top frame.
    pub(super) fn step(&mut self, g: &mut Goroutine) -> ExecResult<Flow> {
        let Some(frame) = g.frames.last() else {
            return Ok(Flow::Done);
        };
        match frame.mode {
            FrameMode::Unwinding => return self.unwind_step(g),
            FrameMode::Recovered => return self.recovered_step(g),
            FrameMode::Normal => {}
        }
        let program = self.program;
        let f = program.func(frame.func);
        let block = f.block(frame.block);
        match block.instrs.get(frame.pc) {
            Some(instr) => {
                if self.config.trace {
                    trace!(
                        goroutine = %g.id,
                        func = %f.name,
                        block = %block.id,
                        "{}",
                        gossa_ssa::format_instr(f, instr, self.pool)
                    );
                }
                self.exec(g, f, instr)
            }
            None => self.terminate(g, f, &block.term),
        }
    }

    fn exec(&mut self, g: &mut Goroutine, f: &'p Function, instr: &'p Instr) -> ExecResult<Flow> {
        match instr {
            Instr::Call {
                dst,
                ty,
                callee,
                args,
            } => self.exec_call(g, f, *dst, *ty, callee, args),
            Instr::Go { callee, args } => self.exec_go(g, f, callee, args),
            Instr::Defer { callee, args } => self.exec_defer(g, f, callee, args),
            Instr::RunDefers => self.run_defers(g),
            Instr::Send { ch, value } => self.exec_send(g, *ch, *value),
            Instr::Recv { dst, ch, comma_ok, .. } => self.exec_recv(g, *dst, *ch, *comma_ok),
            Instr::Select {
                dst,
                ty,
                states,
                blocking,
            } => self.exec_select(g, *dst, *ty, states, *blocking),
            _ => {
                let fr = top(g)?;
                let v = self.eval(fr, f, instr)?;
                if let (Some(dst), Some(v)) = (instr.dst(), v) {
                    fr.set(dst, v);
                }
                fr.pc += 1;
                Ok(Flow::Continue)
            }
        }
    }

    /// Instructions that neither call nor block. `None` for those without
    /// a result.
    #[allow(clippy::too_many_lines)]
    fn eval(&mut self, fr: &Frame, f: &Function, instr: &Instr) -> ExecResult<Option<Value>> {
        let pool = self.pool;
        let v = match instr {
            Instr::Phi { .. } => {
                return Err(internal(format!("{}: φ after the head of a block", f.name)))
            }
            Instr::Const { ty, value, .. } => from_const(pool, *ty, value),
            Instr::Global { global, .. } => Value::Pointer(
                self.globals
                    .get(global.index())
                    .cloned()
                    .ok_or_else(|| internal(format!("unknown global {}", global.index())))?,
            ),
            Instr::FuncValue { func, .. } => Value::Func(Arc::new(Callable::func(*func))),
            Instr::MakeClosure { func, bindings, .. } => Value::Func(Arc::new(Callable::Code {
                func: *func,
                free: bindings.iter().map(|&b| fr.get(b)).collect(),
                recv: None,
            })),
            Instr::MakeBound { recv, target, .. } => {
                let r = fr.get(*recv);
                let c = match *target {
                    BoundTarget::Static(func) => Callable::Code {
                        func,
                        free: Vec::new(),
                        recv: Some(r),
                    },
                    BoundTarget::Invoke(method) => self.resolve_invoke(&r, method)?,
                };
                Value::Func(Arc::new(c))
            }
            Instr::Alloc { elem, .. } => Value::Pointer(self.heap.alloc(zero(pool, *elem))),
            Instr::Load { addr, .. } => match fr.get(*addr) {
                Value::Pointer(p) => self.heap.load(&p)?,
                _ => return Err(RuntimeFault::NilDeref.into()),
            },
            Instr::Store { addr, value } => {
                let Value::Pointer(p) = fr.get(*addr) else {
                    return Err(RuntimeFault::NilDeref.into());
                };
                self.heap.store(&p, fr.get(*value))?;
                return Ok(None);
            }
            Instr::FieldAddr { x, field, .. } => match fr.get(*x) {
                Value::Pointer(p) => Value::Pointer(p.project(*field)),
                _ => return Err(RuntimeFault::NilDeref.into()),
            },
            Instr::IndexAddr { x, index, .. } => {
                let i = int_of(&fr.get(*index))?;
                let xt = f.var_type(*x);
                match fr.get(*x) {
                    Value::Slice(s) => Value::Pointer(s.elem(check_index(i, s.len)?)),
                    Value::Pointer(p) => {
                        let len = pool.array_len(pool.underlying(pool.deref(xt))) as usize;
                        Value::Pointer(p.project(check_index(i, len)? as u32))
                    }
                    _ if pool.under_tag(xt) == Tag::Slice => {
                        return Err(RuntimeFault::IndexOutOfRange { index: i, len: 0 }.into())
                    }
                    _ => return Err(RuntimeFault::NilDeref.into()),
                }
            }
            Instr::Field { x, field, .. } => match fr.get(*x) {
                Value::Struct(mut fields) if (*field as usize) < fields.len() => {
                    fields.swap_remove(*field as usize)
                }
                other => return Err(internal(format!("field {field} of {other:?}"))),
            },
            Instr::Index { x, index, .. } => {
                let i = int_of(&fr.get(*index))?;
                match fr.get(*x) {
                    Value::Array(mut xs) => {
                        let i = check_index(i, xs.len())?;
                        xs.swap_remove(i)
                    }
                    Value::Str(s) => Value::Uint(u64::from(s[check_index(i, s.len())?])),
                    other => return Err(internal(format!("index into {other:?}"))),
                }
            }
            Instr::Lookup {
                map, key, comma_ok, ..
            } => {
                let mt = pool.underlying(f.var_type(*map));
                let key = MapKey::of(pool, pool.key(mt), &fr.get(*key))?;
                let found = match fr.get(*map) {
                    Value::Map(id) => self.heap.map(id).get(&key).cloned(),
                    _ => None,
                };
                if *comma_ok {
                    let ok = found.is_some();
                    let v = found.unwrap_or_else(|| zero(pool, pool.elem(mt)));
                    Value::Tuple(vec![v, Value::Bool(ok)])
                } else {
                    found.unwrap_or_else(|| zero(pool, pool.elem(mt)))
                }
            }
            Instr::Slice {
                x, low, high, max, ..
            } => {
                let get = |v: &Option<VarId>| v.map(|v| int_of(&fr.get(v))).transpose();
                let (low, high, max) = (get(low)?, get(high)?, get(max)?);
                self.slice(f.var_type(*x), fr.get(*x), low, high, max)?
            }
            Instr::BinOp { op, x, y, .. } => {
                ops::binary(pool, *op, f.var_type(*x), &fr.get(*x), &fr.get(*y))?
            }
            Instr::UnOp { op, ty, x, .. } => ops::unary(pool, *op, *ty, &fr.get(*x))?,
            Instr::Convert { ty, x, .. } => self.convert(f.var_type(*x), *ty, fr.get(*x))?,
            Instr::MakeInterface { x, .. } => {
                let xt = f.var_type(*x);
                match fr.get(*x) {
                    v @ Value::Interface(_) if pool.is_interface(xt) => v,
                    v => Value::boxed(xt, v),
                }
            }
            Instr::TypeAssert {
                x,
                asserted,
                comma_ok,
                ..
            } => self.type_assert(f.var_type(*x), fr.get(*x), *asserted, *comma_ok)?,
            Instr::MakeSlice { ty, len, cap, .. } => {
                let (len, cap) = (int_of(&fr.get(*len))?, int_of(&fr.get(*cap))?);
                if !(0..=MAX_MAKE).contains(&len) {
                    return Err(RuntimeFault::MakeOutOfRange("makeslice: len").into());
                }
                if cap < len || cap > MAX_MAKE {
                    return Err(RuntimeFault::MakeOutOfRange("makeslice: cap").into());
                }
                let elem = zero(pool, pool.elem(pool.underlying(*ty)));
                let array = self.heap.alloc(Value::Array(vec![elem; cap as usize]));
                Value::Slice(SliceRef {
                    array,
                    offset: 0,
                    len: len as usize,
                    cap: cap as usize,
                })
            }
            Instr::MakeMap { .. } => Value::Map(self.heap.new_map()),
            Instr::MakeChan { ty, size, .. } => {
                let size = int_of(&fr.get(*size))?;
                if !(0..=MAX_MAKE).contains(&size) {
                    return Err(RuntimeFault::MakeOutOfRange("makechan: size").into());
                }
                let elem = zero(pool, pool.elem(pool.underlying(*ty)));
                Value::Chan(self.sched.make_chan(size as usize, elem))
            }
            Instr::MapUpdate { map, key, value } => {
                let mt = pool.underlying(f.var_type(*map));
                let k = fr.get(*key);
                let mk = MapKey::of(pool, pool.key(mt), &k)?;
                let Value::Map(id) = fr.get(*map) else {
                    return Err(RuntimeFault::NilMapWrite.into());
                };
                self.heap.map_mut(id).insert(mk, k, fr.get(*value));
                return Ok(None);
            }
            Instr::Extract { tuple, index, .. } => match fr.get(*tuple) {
                Value::Tuple(mut xs) if (*index as usize) < xs.len() => {
                    xs.swap_remove(*index as usize)
                }
                other => return Err(internal(format!("extract {index} from {other:?}"))),
            },
            Instr::Range { x, .. } => {
                let state = match fr.get(*x) {
                    Value::Str(bytes) => IterState::Str { bytes, pos: 0 },
                    Value::Map(id) => IterState::Map {
                        map: Some(id),
                        keys: self.heap.map(id).keys(),
                        pos: 0,
                    },
                    _ => IterState::Map {
                        map: None,
                        keys: Vec::new(),
                        pos: 0,
                    },
                };
                Value::Iter(self.heap.new_iter(state))
            }
            Instr::Next { ty, iter, .. } => {
                let Value::Iter(id) = fr.get(*iter) else {
                    return Err(internal("next on a non-iterator"));
                };
                self.next(id, *ty)
            }
            Instr::Call { .. }
            | Instr::Go { .. }
            | Instr::Defer { .. }
            | Instr::RunDefers
            | Instr::Send { .. }
            | Instr::Recv { .. }
            | Instr::Select { .. } => {
                return Err(internal("control instruction evaluated as data"))
            }
        };
        Ok(Some(v))
    }

    fn slice(
        &mut self,
        xt: Idx,
        x: Value,
        low: Option<i64>,
        high: Option<i64>,
        max: Option<i64>,
    ) -> ExecResult<Value> {
        let low = low.unwrap_or(0);
        Ok(match x {
            Value::Str(s) => {
                let (l, h, _) = check_slice(low, high.unwrap_or(s.len() as i64), None, s.len(), true)?;
                Value::bytes(&s[l..h])
            }
            Value::Slice(s) => {
                let (l, h, m) = check_slice(low, high.unwrap_or(s.len as i64), max, s.cap, false)?;
                Value::Slice(SliceRef {
                    array: s.array.clone(),
                    offset: s.offset + l,
                    len: h - l,
                    cap: m - l,
                })
            }
            Value::Pointer(p) => {
                let n = self.pool.array_len(self.pool.underlying(self.pool.deref(xt))) as usize;
                let (l, h, m) = check_slice(low, high.unwrap_or(n as i64), max, n, false)?;
                Value::Slice(SliceRef {
                    array: p,
                    offset: l,
                    len: h - l,
                    cap: m - l,
                })
            }
            _ if self.pool.under_tag(xt) == Tag::Slice => {
                check_slice(low, high.unwrap_or(0), max, 0, false)?;
                Value::Nil
            }
            _ => return Err(RuntimeFault::NilDeref.into()),
        })
    }

    /// Conversions other than boxing into an interface.
    pub(super) fn convert(&mut self, from: Idx, to: Idx, v: Value) -> ExecResult<Value> {
        let pool = self.pool;
        if pool.is_interface(to) {
            return Ok(match v {
                Value::Interface(_) => v,
                v => Value::boxed(from, v),
            });
        }
        let (ft, tt) = (value_kind(pool, from), value_kind(pool, to));
        Ok(match (ft, tt, v) {
            (Tag::String, Tag::Slice, Value::Str(s)) => {
                let runes = value_kind(pool, pool.elem(pool.underlying(to))) == Tag::Int32;
                let elems = if runes {
                    let mut out = Vec::new();
                    let mut rest = &s[..];
                    while !rest.is_empty() {
                        let (r, w) = decode_rune(rest);
                        out.push(Value::Int(r));
                        rest = &rest[w.max(1)..];
                    }
                    out
                } else {
                    s.iter().map(|&b| Value::Uint(u64::from(b))).collect()
                };
                self.heap.alloc_slice(elems)
            }
            (Tag::Slice, Tag::String, v) => {
                let elems = self.heap.elems_of(&v)?;
                let mut out = Vec::with_capacity(elems.len());
                for e in &elems {
                    match *e {
                        Value::Uint(b) => out.push(b as u8),
                        Value::Int(r) => out.extend_from_slice(ops::rune_string(r).as_bytes()),
                        _ => return Err(internal("string from a non-integer slice")),
                    }
                }
                Value::bytes(&out)
            }
            (_, _, v) => ops::convert_scalar(pool, to, &v),
        })
    }

    fn type_assert(&self, xt: Idx, x: Value, asserted: Idx, comma_ok: bool) -> ExecResult<Value> {
        let pool = self.pool;
        let Value::Interface(b) = x else {
            return Err(internal("type assertion on a non-interface"));
        };
        let to_iface = pool.is_interface(asserted);
        let hit = match &b {
            Some(bx) if to_iface && pool.implements(bx.ty, asserted, &self.msets) => {
                Some(Value::Interface(b.clone()))
            }
            Some(bx) if !to_iface && bx.ty == asserted => Some(bx.value.clone()),
            _ => None,
        };
        if comma_ok {
            let ok = hit.is_some();
            let v = hit.unwrap_or_else(|| zero(pool, asserted));
            return Ok(Value::Tuple(vec![v, Value::Bool(ok)]));
        }
        hit.ok_or_else(|| {
            let missing = match &b {
                Some(bx) if to_iface => pool
                    .missing_method(bx.ty, asserted, &self.msets)
                    .map(|m| pool.name_str(m.name).to_owned()),
                _ => None,
            };
            RuntimeFault::TypeAssertion {
                iface: pool.format_type(xt),
                actual: b.as_ref().map(|bx| pool.format_type(bx.ty)),
                wanted: pool.format_type(asserted),
                missing,
            }
            .into()
        })
    }

    /// Advance a range iterator: `(ok, key, value)`.
    fn next(&mut self, id: crate::value::IterId, ty: Idx) -> Value {
        let pool = self.pool;
        let done = || {
            let mut elems = vec![Value::Bool(false)];
            elems.extend(pool.tuple_elems(ty).into_iter().skip(1).map(|t| zero(pool, t)));
            Value::Tuple(elems)
        };
        loop {
            let (map, key) = match self.heap.iter_mut(id) {
                IterState::Str { bytes, pos } => {
                    if *pos >= bytes.len() {
                        return done();
                    }
                    let (r, w) = decode_rune(&bytes[*pos..]);
                    let at = *pos;
                    *pos += w.max(1);
                    return Value::Tuple(vec![Value::Bool(true), Value::Int(at as i64), Value::Int(r)]);
                }
                IterState::Map { map, keys, pos } => {
                    let key = keys.get(*pos).cloned();
                    *pos += 1;
                    (*map, key)
                }
            };
            let (Some(map), Some(key)) = (map, key) else {
                return done();
            };
            // Entries deleted since the range started are skipped.
            if let Some(e) = self.heap.map(map).entry(&key) {
                return Value::Tuple(vec![Value::Bool(true), e.k.clone(), e.v.clone()]);
            }
        }
    }

    fn terminate(&mut self, g: &mut Goroutine, f: &'p Function, term: &'p Terminator) -> ExecResult<Flow> {
        match term {
            Terminator::Jump(to) => {
                self.enter_block(top(g)?, f, *to)?;
                Ok(Flow::Continue)
            }
            Terminator::If { cond, then, els } => {
                let fr = top(g)?;
                let c = fr
                    .get(*cond)
                    .as_bool()
                    .ok_or_else(|| internal("non-boolean branch condition"))?;
                self.enter_block(fr, f, if c { *then } else { *els })?;
                Ok(Flow::Continue)
            }
            Terminator::Return(vs) => {
                let fr = top(g)?;
                let result = pack(vs.iter().map(|&v| fr.get(v)).collect());
                self.return_from(g, result)
            }
            Terminator::Panic(v) => Err(RuntimeFault::Panic(top(g)?.get(*v)).into()),
            Terminator::Unreachable => Err(internal(format!("{}: reached an unreachable block", f.name))),
        }
    }

    /// Move `fr` into block `to`, assigning its φs in parallel from the
    /// edge the frame arrives on.
    pub(super) fn enter_block(&self, fr: &mut Frame, f: &Function, to: BlockId) -> ExecResult<()> {
        let from = fr.block;
        let target = f.block(to);
        let edge = target.preds.iter().position(|&p| p == from);
        let mut incoming: SmallVec<[(VarId, Value); 4]> = SmallVec::new();
        for phi in target.phis() {
            let Instr::Phi { dst, edges, .. } = phi else {
                continue;
            };
            let operand = edge
                .and_then(|i| edges.get(i))
                .ok_or_else(|| internal(format!("{}: no φ edge from {from} into {to}", f.name)))?;
            incoming.push((*dst, fr.get(*operand)));
        }
        let n = incoming.len();
        for (dst, v) in incoming {
            fr.set(dst, v);
        }
        if self.config.trace {
            trace!(func = %f.name, %from, %to, phis = n, "jump");
        }
        fr.block = to;
        fr.pc = n;
        Ok(())
    }

    /// Pop the top frame and deliver `result` where its caller wants it.
    pub(super) fn return_from(&mut self, g: &mut Goroutine, result: Value) -> ExecResult<Flow> {
        let frame = g
            .frames
            .pop()
            .ok_or_else(|| internal("return without a frame"))?;
        match frame.ret {
            ReturnTo::Value(dst) => {
                let caller = top(g)?;
                caller.set(dst, result);
                caller.pc += 1;
                Ok(Flow::Continue)
            }
            ReturnTo::Deferred => self.deferred_returned(g),
            ReturnTo::Discard => {
                if !g.frames.is_empty() {
                    return Ok(Flow::Continue);
                }
                match g.then.take() {
                    Some(next) => {
                        self.push_call(g, Callable::func(next), Vec::new(), ReturnTo::Discard, false)?;
                        Ok(Flow::Continue)
                    }
                    None => Ok(Flow::Done),
                }
            }
            ReturnTo::Sync => Ok(Flow::Returned(result)),
        }
    }
}
