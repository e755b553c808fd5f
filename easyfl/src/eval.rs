//! Call-by-need evaluation of formula trees.
//!
//! Entering a call pushes a frame holding the call's argument formulas unevaluated. An
//! argument is evaluated the first time the callee asks for it and the value is kept in
//! the frame, so it is computed at most once per invocation. Extended functions evaluate
//! their body with the frame of their own call as the scope that `$n` refers to.
use lazybytes::TreePath;
use smallvec::SmallVec;

use crate::{
    error::{EvalFault, FaultKind},
    formula::Formula,
    library::{EvalResult, FuncId, FunctionKind, Library},
};

/// Data a constraint can reach beyond its own arguments.
///
/// Every capability defaults to unavailable, so hosts implement only what they provide.
pub trait GlobalData {
    /// Path of the constraint being evaluated inside the data tree.
    fn invocation_path(&self) -> Option<TreePath> {
        None
    }

    fn bytes_at_path(&self, path: &[u8]) -> Result<Vec<u8>, FaultKind> {
        let _ = path;
        Err(FaultKind::CapabilityUnavailable {
            capability: "bytes_at_path",
        })
    }
}

/// No global data at all.
impl GlobalData for () {}

struct Frame<'a> {
    args: &'a [Formula],
    /// Frame that argument references inside `args` resolve against.
    scope: usize,
    values: SmallVec<Option<Vec<u8>>, 4>,
}

impl<'a> Frame<'a> {
    fn new(args: &'a [Formula], scope: usize) -> Self {
        Self {
            args,
            scope,
            values: args.iter().map(|_| None).collect(),
        }
    }
}

pub struct RunContext<'a> {
    library: &'a Library,
    global: &'a dyn GlobalData,
    frames: Vec<Frame<'a>>,
}

impl<'a> RunContext<'a> {
    fn new(library: &'a Library, global: &'a dyn GlobalData, args: &'a [Formula]) -> Self {
        Self {
            library,
            global,
            frames: vec![Frame::new(args, 0)],
        }
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }

    pub fn global(&self) -> &'a dyn GlobalData {
        self.global
    }

    /// Number of arguments of the current call.
    pub fn arity(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.args.len())
    }

    /// Value of argument `n` of the current call, evaluated on first use.
    pub fn arg(&mut self, n: usize) -> EvalResult {
        let top = self.frames.len() - 1;
        self.force(top, n)
    }

    /// Whether argument `n` evaluates to a non-empty value.
    pub fn arg_is_true(&mut self, n: usize) -> Result<bool, EvalFault> {
        Ok(!self.arg(n)?.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn force(&mut self, frame: usize, n: usize) -> EvalResult {
        let current = &self.frames[frame];
        let args: &'a [Formula] = current.args;
        let Some(formula) = args.get(n) else {
            return Err(FaultKind::ArgumentOutOfBounds {
                index: n,
                arity: args.len(),
            }
            .into());
        };
        if let Some(value) = &current.values[n] {
            return Ok(value.clone());
        }

        let scope = current.scope;
        let value = self.eval(formula, scope)?;
        self.frames[frame].values[n] = Some(value.clone());
        Ok(value)
    }

    fn eval(&mut self, formula: &'a Formula, scope: usize) -> EvalResult {
        match formula {
            Formula::Data(data) => Ok(data.clone()),
            Formula::ArgRef(n) => self.force(scope, *n as usize),
            Formula::Call { func, args } => self.call(*func, args, scope),
        }
    }

    fn call(&mut self, func: FuncId, args: &'a [Formula], scope: usize) -> EvalResult {
        let library = self.library;
        let descriptor = library.descriptor(func);
        if self.depth() >= library.max_call_depth() {
            return Err(EvalFault::from(FaultKind::StackOverflow {
                depth: library.max_call_depth(),
            })
            .within(&descriptor.symbol));
        }

        self.frames.push(Frame::new(args, scope));
        let result = match &descriptor.kind {
            FunctionKind::EmbeddedShort(f) | FunctionKind::EmbeddedLong(f) => f.call(self),
            FunctionKind::Extended { body, .. } => {
                let own = self.frames.len() - 1;
                self.eval(body, own)
            }
        };
        self.frames.pop();

        result.map_err(|fault| fault.within(&descriptor.symbol))
    }
}

/// Evaluate `formula` with `args` bound to `$0`..`$n`.
///
/// Faults carry the innermost function that raised them and the invocation path exposed by
/// `global`, if any.
pub fn evaluate<A: AsRef<[u8]>>(
    library: &Library,
    global: &dyn GlobalData,
    formula: &Formula,
    args: &[A],
) -> Result<Vec<u8>, EvalFault> {
    let bound: Vec<Formula> = args
        .iter()
        .map(|arg| Formula::Data(arg.as_ref().to_vec()))
        .collect();
    let mut ctx = RunContext::new(library, global, &bound);
    ctx.eval(formula, 0).map_err(|fault| match global.invocation_path() {
        Some(path) if fault.path.is_none() => fault.at_path(path),
        _ => fault,
    })
}
