// ABOUTME: Public façade tying lexer, parser, environment, and evaluator together

use crate::ast::Stmt;
use crate::diagnostic::Diagnostic;
use crate::env::Environment;
use crate::eval;
use crate::host::{HostContext, HostRegistry};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::value::{Callable, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Result of a successful `evaluate` call.
pub struct Evaluation {
    pub ok: bool,
    pub result: Value,
    pub diagnostics: Vec<Diagnostic>,
}

/// An embeddable interpreter instance. Create one, optionally register host
/// functions, `parse` source, then `evaluate` against a data store and
/// output sink.
pub struct Interpreter {
    registry: HostRegistry,
    program: Option<Vec<Stmt>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a fresh instance with an empty host registry plus the three
    /// built-ins (`console_put`, `io_get`, `io_put`).
    pub fn new() -> Self {
        Interpreter {
            registry: crate::host::with_builtins(),
            program: None,
        }
    }

    /// Adds or replaces a host function. Returns `self` for chaining.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        may_suspend: bool,
        implementation: impl Fn(&[Value], &mut HostContext) -> Result<Value, crate::error::RuntimeError>
            + 'static,
    ) -> &mut Self {
        self.registry.register(name, may_suspend, implementation);
        self
    }

    /// Tokenizes and parses `source`, retaining the AST internally for a
    /// subsequent `evaluate` call. Diagnostics carry phase `lex` or `parse`.
    pub fn parse(&mut self, source: &str) -> (bool, Vec<Diagnostic>) {
        let parser = Parser::new(Lexer::new(source));
        let (program, diagnostics) = parser.parse_program();
        let ok = diagnostics.is_empty();
        self.program = Some(program);
        (ok, diagnostics)
    }

    /// Evaluates the most recently parsed program against `data_store` and
    /// `output_sink`, mutating/appending to them in program order. Requires a
    /// prior successful `parse`.
    pub fn evaluate(
        &self,
        data_store: &mut HashMap<String, Value>,
        output_sink: &mut Vec<String>,
    ) -> Evaluation {
        let Some(program) = &self.program else {
            return Evaluation {
                ok: false,
                result: Value::Null,
                diagnostics: vec![Diagnostic::runtime(
                    "evaluate called before a successful parse",
                    crate::position::Position::unknown(),
                )],
            };
        };

        let root = Environment::new();
        for (name, host_fn) in self.registry.iter() {
            root.define(
                name.clone(),
                Value::Callable(Callable::Host(Rc::clone(host_fn))),
            );
        }

        let mut ctx = HostContext {
            data: data_store,
            output: output_sink,
        };

        match eval::eval_program(program, &root, &mut ctx) {
            Ok(result) => Evaluation {
                ok: true,
                result,
                diagnostics: Vec::new(),
            },
            Err(failure) => Evaluation {
                ok: false,
                result: Value::Null,
                diagnostics: vec![Diagnostic::runtime(
                    failure.error.to_string(),
                    failure.position,
                )],
            },
        }
    }
}
