//! Textual listings of built functions.
//!
//! ```text
//! func main.f(t0 int) int
//! b0 entry  succs: b1 b2
//!     t1 = const 3 untyped int
//!     ...
//! ```
//!
//! Dead blocks are marked `(dead)`; types follow each defined value.

#![allow(clippy::format_push_string)]

use std::fmt::Write as _;

use gossa_ir::ConstValue;
use gossa_types::{Idx, Pool};

use crate::ir::{BoundTarget, Callee, FnId, Function, Instr, Program, SelectDir, Terminator, VarId};

struct Printer<'a> {
    pool: &'a Pool,
    program: Option<&'a Program>,
}

/// Listing of one function. Callees print as `f<n>`.
pub fn format_function(f: &Function, pool: &Pool) -> String {
    let mut buf = String::new();
    Printer {
        pool,
        program: None,
    }
    .function(f, &mut buf);
    buf
}

/// Listing of every function of `program`, in build order.
pub fn format_program(program: &Program, pool: &Pool) -> String {
    let p = Printer {
        pool,
        program: Some(program),
    };
    let mut buf = String::new();
    for (i, f) in program.functions.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        p.function(f, &mut buf);
    }
    buf
}

/// One instruction as listed, without indentation.
pub fn format_instr(f: &Function, instr: &Instr, pool: &Pool) -> String {
    let mut buf = String::new();
    Printer {
        pool,
        program: None,
    }
    .instr(f, instr, &mut buf);
    buf
}

fn list(vs: &[VarId]) -> String {
    vs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl Printer<'_> {
    fn ty(&self, t: Idx) -> String {
        self.pool.format_type(t)
    }

    fn fn_name(&self, id: FnId) -> String {
        match self.program {
            Some(p) if id.index() < p.functions.len() => p.func(id).name.clone(),
            _ => id.to_string(),
        }
    }

    fn callee(&self, c: &Callee) -> String {
        match c {
            Callee::Static(f) => self.fn_name(*f),
            Callee::Value(v) => v.to_string(),
            Callee::Invoke { recv, method } => {
                format!("invoke {recv}.{}", self.pool.name_str(*method))
            }
            Callee::Builtin(b) => b.to_string(),
            Callee::Intrinsic(i) => i.to_string(),
        }
    }

    fn function(&self, f: &Function, buf: &mut String) {
        let params = f
            .params
            .iter()
            .map(|&p| format!("{p} {}", self.ty(f.var_type(p))))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(buf, "func {}({params}) : {}", f.name, self.ty(f.sig));
        if !f.free_vars.is_empty() {
            let _ = writeln!(buf, "# free: {}", list(&f.free_vars));
        }
        if !f.has_body() {
            buf.push_str("# external\n");
            return;
        }
        if let Some(r) = f.recover {
            let _ = writeln!(buf, "# recover: {r}");
        }
        for block in &f.blocks {
            let _ = write!(buf, "{} {}", block.id, block.comment);
            if !block.live {
                buf.push_str(" (dead)");
            }
            if !block.preds.is_empty() {
                let preds: Vec<String> = block.preds.iter().map(ToString::to_string).collect();
                let _ = write!(buf, "  preds: {}", preds.join(" "));
            }
            if !block.succs.is_empty() {
                let succs: Vec<String> = block.succs.iter().map(ToString::to_string).collect();
                let _ = write!(buf, "  succs: {}", succs.join(" "));
            }
            buf.push('\n');
            for instr in &block.instrs {
                buf.push_str("    ");
                self.instr(f, instr, buf);
                buf.push('\n');
            }
            buf.push_str("    ");
            self.term(&block.term, buf);
            buf.push('\n');
        }
    }

    fn instr(&self, f: &Function, instr: &Instr, buf: &mut String) {
        if let Some(d) = instr.dst() {
            let _ = write!(buf, "{d} = ");
        }
        let body = match instr {
            Instr::Phi { edges, .. } => format!("phi [{}]", list(edges)),
            Instr::Const { value, .. } => match value {
                ConstValue::Nil => "zero".to_owned(),
                ConstValue::Str(s) => format!("const {s:?}"),
                v => format!("const {v}"),
            },
            Instr::Global { global, .. } => match self.program {
                Some(p) => format!("&{}", p.globals[global.index()].name),
                None => format!("&g{}", global.raw()),
            },
            Instr::FuncValue { func, .. } => format!("func {}", self.fn_name(*func)),
            Instr::MakeClosure { func, bindings, .. } => {
                format!("closure {} [{}]", self.fn_name(*func), list(bindings))
            }
            Instr::MakeBound { recv, target, .. } => match target {
                BoundTarget::Static(func) => format!("bound {recv} {}", self.fn_name(*func)),
                BoundTarget::Invoke(m) => format!("bound {recv}.{}", self.pool.name_str(*m)),
            },
            Instr::Alloc { elem, .. } => format!("alloc {}", self.ty(*elem)),
            Instr::Load { addr, .. } => format!("*{addr}"),
            Instr::Store { addr, value } => format!("*{addr} = {value}"),
            Instr::FieldAddr { x, field, .. } => format!("&{x}.#{field}"),
            Instr::IndexAddr { x, index, .. } => format!("&{x}[{index}]"),
            Instr::Field { x, field, .. } => format!("{x}.#{field}"),
            Instr::Index { x, index, .. } => format!("{x}[{index}]"),
            Instr::Lookup {
                map, key, comma_ok, ..
            } => format!("{map}[{key}]{}", if *comma_ok { ",ok" } else { "" }),
            Instr::Slice {
                x, low, high, max, ..
            } => {
                let opt = |v: &Option<VarId>| v.map(|v| v.to_string()).unwrap_or_default();
                match max {
                    Some(m) => format!("slice {x}[{}:{}:{m}]", opt(low), opt(high)),
                    None => format!("slice {x}[{}:{}]", opt(low), opt(high)),
                }
            }
            Instr::BinOp { op, x, y, .. } => format!("{x} {} {y}", op.as_symbol()),
            Instr::UnOp { op, x, .. } => format!("{}{x}", op.as_symbol()),
            Instr::Convert { x, .. } => format!("convert {x}"),
            Instr::MakeInterface { x, .. } => {
                format!("make interface {x} ({})", self.ty(f.var_type(*x)))
            }
            Instr::TypeAssert {
                x,
                asserted,
                comma_ok,
                ..
            } => format!(
                "typeassert{} {x}.({})",
                if *comma_ok { ",ok" } else { "" },
                self.ty(*asserted)
            ),
            Instr::MakeSlice { len, cap, .. } => format!("make slice {len}, {cap}"),
            Instr::MakeMap { .. } => "make map".to_owned(),
            Instr::MakeChan { size, .. } => format!("make chan {size}"),
            Instr::MapUpdate { map, key, value } => format!("{map}[{key}] = {value}"),
            Instr::Call { callee, args, .. } => format!("{}({})", self.callee(callee), list(args)),
            Instr::Go { callee, args } => format!("go {}({})", self.callee(callee), list(args)),
            Instr::Defer { callee, args } => {
                format!("defer {}({})", self.callee(callee), list(args))
            }
            Instr::RunDefers => "rundefers".to_owned(),
            Instr::Send { ch, value } => format!("send {ch} <- {value}"),
            Instr::Recv { ch, comma_ok, .. } => {
                format!("<-{ch}{}", if *comma_ok { ",ok" } else { "" })
            }
            Instr::Select {
                states, blocking, ..
            } => {
                let states: Vec<String> = states
                    .iter()
                    .map(|s| match (s.dir, s.value) {
                        (SelectDir::Send, Some(v)) => format!("{}<-{v}", s.ch),
                        _ => format!("<-{}", s.ch),
                    })
                    .collect();
                format!(
                    "select {}[{}]",
                    if *blocking { "blocking " } else { "nonblocking " },
                    states.join(", ")
                )
            }
            Instr::Extract { tuple, index, .. } => format!("extract {tuple} #{index}"),
            Instr::Range { x, .. } => format!("range {x}"),
            Instr::Next { iter, .. } => format!("next {iter}"),
        };
        buf.push_str(&body);
        if let Some(d) = instr.dst() {
            let t = f.var_type(d);
            // Iterators have no Go type.
            if t != Idx::INVALID {
                let _ = write!(buf, " {}", self.ty(t));
            }
        }
    }

    fn term(&self, term: &Terminator, buf: &mut String) {
        let _ = match term {
            Terminator::Jump(t) => write!(buf, "jump {t}"),
            Terminator::If { cond, then, els } => write!(buf, "if {cond} goto {then} else {els}"),
            Terminator::Return(vs) if vs.is_empty() => write!(buf, "return"),
            Terminator::Return(vs) => write!(buf, "return {}", list(vs)),
            Terminator::Panic(v) => write!(buf, "panic {v}"),
            Terminator::Unreachable => write!(buf, "unreachable"),
        };
    }
}
