//! AST → SSA lowering.
//!
//! # Architecture
//!
//! - [`ProgramBuilder`] owns program-wide state: the function table, the
//!   generic-instance cache, the queue of functions still to build, the
//!   interface method registry and the collected diagnostics.
//! - `FuncBuilder` (in `func.rs`) owns one function's blocks and values and
//!   places φ-nodes.
//! - `FnLowerer` (in `lower.rs`) walks one body and drives the
//!   `FuncBuilder`; `expr.rs`, `call.rs`, `stmt.rs` and `control.rs` hold
//!   its lowering rules.
//! - `escape.rs` decides which locals live in heap cells.
//!
//! # Generic code
//!
//! A generic declaration is built once per distinct type-argument list.
//! While an instance's body is lowered, the instance's substitution is
//! installed in [`ProgramBuilder::subst`] and every type read from the AST
//! goes through it. The substitution is only ever installed around body
//! lowering: instances without a body, and instances merely referenced
//! while another body is lowered, are created with it untouched.

mod call;
mod control;
mod escape;
mod expr;
mod func;
mod lower;
mod stmt;

use std::collections::VecDeque;

use gossa_ast::{FuncDecl, Package};
use gossa_diagnostic::{invalid_ssa, Diagnostic, DiagnosticConfig, DiagnosticQueue};
use gossa_ir::{FuncId, Name, Span};
use gossa_types::{Field, Idx, Method, MethodSets, MethodTarget, Pool, SubstMap, Tag};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ir::{FnId, Function, GlobalInfo, MethodImpl, Program, Synthetic};
use crate::{sanity, BuildConfig};

use self::lower::FnLowerer;

/// A built program and everything that went wrong while building it.
#[derive(Debug)]
pub struct BuildOutput {
    pub program: Program,
    /// Sorted by source position.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutput {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Build every function of `pkg`.
///
/// `pkg` and `pool` must share one interner. The pool is extended with
/// the types generic instantiation creates.
pub fn build_program(pkg: &Package, pool: &mut Pool, config: &BuildConfig) -> BuildOutput {
    let mut pb = ProgramBuilder::new(pkg, pool, config);
    pb.build_package();
    pb.finish()
}

/// Program-wide builder state.
pub(crate) struct ProgramBuilder<'p> {
    pub(crate) pkg: &'p Package,
    pub(crate) pool: &'p mut Pool,
    pub(crate) msets: MethodSets,
    config: &'p BuildConfig,
    functions: Vec<Function>,
    /// `(declaration, type arguments) -> function`.
    instances: FxHashMap<(FuncId, Box<[Idx]>), FnId>,
    pending: VecDeque<FnId>,
    diagnostics: DiagnosticQueue,
    /// Substitution of the instance whose body is being lowered.
    pub(crate) subst: Option<SubstMap>,
    methods: FxHashMap<(Idx, Name), MethodImpl>,
    needed: FxHashSet<Idx>,
    closures: FxHashMap<FnId, u32>,
    pub(crate) error_string: Idx,
}

impl<'p> ProgramBuilder<'p> {
    pub(crate) fn new(pkg: &'p Package, pool: &'p mut Pool, config: &'p BuildConfig) -> Self {
        let error_string = declare_error_string(pool);
        ProgramBuilder {
            pkg,
            pool,
            msets: MethodSets::new(),
            config,
            functions: Vec::new(),
            instances: FxHashMap::default(),
            pending: VecDeque::new(),
            diagnostics: DiagnosticQueue::with_config(DiagnosticConfig::unlimited()),
            subst: None,
            methods: FxHashMap::default(),
            needed: FxHashSet::default(),
            closures: FxHashMap::default(),
            error_string,
        }
    }

    // Types

    /// A type read from the AST, as seen from the body being lowered.
    pub(crate) fn ty(&mut self, t: Idx) -> Idx {
        match &self.subst {
            Some(map) if self.pool.flags(t).has_type_params() => self.pool.substitute(t, map),
            _ => t,
        }
    }

    pub(crate) fn report(&mut self, diag: Diagnostic) {
        self.diagnostics.add(diag);
    }

    pub(crate) fn oracle(&self) -> &'p dyn gossa_cfg::MayReturn {
        let config: &'p BuildConfig = self.config;
        &*config.oracle
    }

    // Functions

    fn alloc_fn(&mut self, mut func: Function) -> FnId {
        let id = FnId::new(self.functions.len() as u32);
        func.id = id;
        self.functions.push(func);
        id
    }

    pub(crate) fn function(&self, id: FnId) -> &Function {
        &self.functions[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FnId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    /// The function for `decl` instantiated with `type_args` (empty for
    /// non-generic declarations). Created and queued on first request.
    pub(crate) fn fn_for(&mut self, decl: FuncId, type_args: Vec<Idx>) -> FnId {
        let key = (decl, type_args.into_boxed_slice());
        if let Some(&id) = self.instances.get(&key) {
            return id;
        }
        let d = self.pkg.func(decl);
        let type_args = key.1.to_vec();
        // The instance's own substitution, never the scratch one: this may
        // run while an unrelated instance is being lowered.
        let sig = if type_args.is_empty() {
            d.sig
        } else {
            let map = SubstMap::new(d.type_params.clone(), type_args.clone());
            self.pool.substitute(d.sig, &map)
        };
        let name = self.decl_name(d, &type_args);
        let id = self.alloc_fn(Function {
            id: FnId::new(0),
            name,
            sig,
            decl: Some(decl),
            type_args,
            synthetic: None,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            var_types: Vec::new(),
            recover: None,
            span: d.span,
        });
        self.instances.insert(key, id);
        if d.body.is_some() {
            self.pending.push_back(id);
        }
        id
    }

    /// The function implementing method `decl` for receiver base type
    /// `recv` (a named type, possibly a generic instance).
    pub(crate) fn method_fn(&mut self, decl: FuncId, recv: Idx) -> FnId {
        let type_args = if self.pkg.func(decl).is_generic() && self.pool.is_named(recv) {
            self.pool.named_info(recv).type_args.clone()
        } else {
            Vec::new()
        };
        self.fn_for(decl, type_args)
    }

    /// Allocate a function for a literal nested in `parent`.
    pub(crate) fn closure_fn(&mut self, parent: FnId, sig: Idx, span: Span) -> FnId {
        let n = self.closures.entry(parent).or_insert(0);
        *n += 1;
        let n = *n;
        let parent_fn = self.function(parent);
        let name = format!("{}${n}", parent_fn.name);
        let type_args = parent_fn.type_args.clone();
        self.alloc_fn(Function {
            id: FnId::new(0),
            name,
            sig,
            decl: None,
            type_args,
            synthetic: None,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            var_types: Vec::new(),
            recover: None,
            span,
        })
    }

    fn decl_name(&self, d: &FuncDecl, type_args: &[Idx]) -> String {
        let pool = &*self.pool;
        let mut name = String::from(pool.name_str(self.pkg.name));
        name.push('.');
        if let Some(recv) = d.recv {
            let (ptr, base) = if pool.tag(recv.ty) == Tag::Pointer {
                (true, pool.elem(recv.ty))
            } else {
                (false, recv.ty)
            };
            let base_name = if pool.is_named(base) {
                let info = pool.named_info(base);
                let origin = info.origin.map_or(info, |o| pool.named_info(o));
                pool.name_str(origin.name)
            } else {
                "?"
            };
            if ptr {
                name.push_str(&format!("(*{base_name})."));
            } else {
                name.push_str(&format!("{base_name}."));
            }
        }
        let fn_name = pool.name_str(d.name);
        name.push_str(fn_name);
        if d.recv.is_none() && fn_name == "init" {
            let nth = self.pkg.inits.iter().position(|&i| i == d.id).unwrap_or(0) + 1;
            name.push_str(&format!("#{nth}"));
        }
        if !type_args.is_empty() {
            name.push('[');
            for (i, &t) in type_args.iter().enumerate() {
                if i > 0 {
                    name.push(',');
                }
                pool.format_type_into(t, &mut name);
            }
            name.push(']');
        }
        name
    }

    // Interface method registry

    /// Register the methods of `ty` (and of the types it is built from)
    /// for dynamic dispatch. Called whenever a value of `ty` may reach an
    /// interface.
    pub(crate) fn need_methods(&mut self, ty: Idx) {
        if !self.needed.insert(ty) || self.pool.is_interface(ty) || self.pool.is_type_param(ty) {
            return;
        }
        let set = self.msets.method_set(self.pool, ty);
        for entry in set.entries() {
            let imp = match entry.target {
                MethodTarget::Concrete {
                    func: Some(decl),
                    recv,
                    ptr_recv,
                } => MethodImpl::Func {
                    func: self.method_fn(decl, recv),
                    path: entry.path.clone(),
                    ptr_recv,
                },
                MethodTarget::Concrete {
                    func: None,
                    recv,
                    ptr_recv,
                } => MethodImpl::Native {
                    path: entry.path.clone(),
                    recv,
                    ptr_recv,
                },
                MethodTarget::Interface { .. } => MethodImpl::Embedded {
                    path: entry.path.clone(),
                },
            };
            self.methods.insert((ty, entry.name), imp);
        }

        let pool = &*self.pool;
        let mut parts: Vec<Idx> = Vec::new();
        match pool.tag(ty) {
            Tag::Named => {
                parts.push(pool.underlying(ty));
                if !pool.is_interface(ty) {
                    // `*T` is needed too: reflection and method values can
                    // produce it from a `T`.
                    parts.push(Idx::NONE);
                }
            }
            Tag::Pointer | Tag::Slice | Tag::Array | Tag::Chan => parts.push(pool.elem(ty)),
            Tag::Map => {
                parts.push(pool.key(ty));
                parts.push(pool.elem(ty));
            }
            Tag::Struct => parts.extend(pool.fields(ty).into_iter().map(|f| f.ty)),
            _ => {}
        }
        for part in parts {
            let part = if part.is_none() {
                self.pool.pointer(ty)
            } else {
                part
            };
            self.need_methods(part);
        }
    }

    // Driver

    fn build_package(&mut self) {
        let name = format!("{}.init", self.pool.name_str(self.pkg.name));
        let sig = self.pool.signature(&[], &[], false);
        let init = self.alloc_fn(Function {
            id: FnId::new(0),
            name,
            sig,
            decl: None,
            type_args: Vec::new(),
            synthetic: Some(Synthetic::PackageInit),
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            var_types: Vec::new(),
            recover: None,
            span: Span::DUMMY,
        });
        debug_assert_eq!(init, FnId::new(0));

        self.need_methods(Idx::RUNTIME_ERROR);
        self.need_methods(self.error_string);

        let pkg = self.pkg;
        for d in &pkg.funcs {
            if !d.is_generic() {
                self.fn_for(d.id, Vec::new());
            }
        }
        let user_inits: Vec<FnId> = pkg
            .inits
            .iter()
            .map(|&i| self.fn_for(i, Vec::new()))
            .collect();

        FnLowerer::lower_package_init(self, init, &user_inits);
        self.drain();
    }

    /// Build queued functions until the queue is empty. Lowering a body may
    /// queue more (generic instances, methods needed for interfaces).
    pub(crate) fn drain(&mut self) {
        while let Some(id) = self.pending.pop_front() {
            let Some(decl) = self.function(id).decl else {
                continue;
            };
            let type_args = self.function(id).type_args.clone();
            let pkg = self.pkg;
            let d = pkg.func(decl);
            debug_assert!(self.subst.is_none(), "substitution installed across bodies");
            self.subst =
                (!type_args.is_empty()).then(|| SubstMap::new(d.type_params.clone(), type_args));
            FnLowerer::lower_decl(self, id, d);
            self.subst = None;
        }
    }

    /// Run the statement-level CFG over `body` for its label and branch
    /// diagnostics.
    pub(crate) fn check_branches(&mut self, body: &[gossa_ast::StmtId]) {
        let cfg = gossa_cfg::build(self.pkg, self.pool.interner(), body, self.oracle());
        self.diagnostics.extend(cfg.diagnostics);
    }

    fn finish(mut self) -> BuildOutput {
        if self.config.sanity_check {
            for f in &self.functions {
                for problem in sanity::check(f) {
                    self.diagnostics.add(invalid_ssa(f.span, &f.name, &problem));
                }
            }
        }
        let main = self
            .pkg
            .main
            .and_then(|m| self.instances.get(&(m, Box::default())).copied());
        let globals = self
            .pkg
            .globals
            .iter()
            .map(|g| GlobalInfo {
                name: self.pool.name_str(g.name).to_owned(),
                ty: g.ty,
            })
            .collect();
        debug!(
            functions = self.functions.len(),
            instances = self.instances.len(),
            methods = self.methods.len(),
            "built program"
        );
        BuildOutput {
            program: Program {
                functions: self.functions,
                globals,
                init: FnId::new(0),
                main,
                methods: self.methods,
                error_string: self.error_string,
            },
            diagnostics: self.diagnostics.flush(),
        }
    }
}

/// `*errors.errorString`, the dynamic type of `errors.New` results. Its
/// `Error` method is provided by the interpreter.
fn declare_error_string(pool: &mut Pool) -> Idx {
    let s = pool.intern_name("s");
    let underlying = pool.struct_type(&[Field::new(s, Idx::STRING)]);
    let named = pool.named("errors", "errorString", underlying);
    let error = pool.intern_name("Error");
    pool.add_method(
        named,
        Method {
            name: error,
            func: None,
            sig: Idx::ERROR_SIG,
            ptr_recv: true,
        },
    );
    pool.pointer(named)
}
