// ABOUTME: Tree-walking evaluator: AST + environment + execution context -> value

use crate::ast::{Expr, InfixOp, PrefixOp, Stmt};
use crate::env::Environment;
use crate::error::{EvalFailure, RuntimeError};
use crate::host::HostContext;
use crate::value::{Callable, Value};
use std::rc::Rc;

/// How executing a statement concluded: an ordinary value, or a `return`
/// signal that must short-circuit enclosing blocks/loops up to the nearest
/// function-call boundary.
enum Flow {
    Value(Value),
    Return(Value),
}

/// Evaluates a whole program: the value of its last top-level statement
/// (or the value carried by a `return` signal reaching the top level). An
/// empty program yields `Null`.
pub fn eval_program(
    statements: &[Stmt],
    env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Value, EvalFailure> {
    match eval_block(statements, env, ctx)? {
        Flow::Value(v) => Ok(v),
        Flow::Return(v) => Ok(v),
    }
}

/// Runs a user function's body against its freshly created call frame and
/// unwraps any `return` signal into the function's result. Called back into
/// from `Value::call`; a function call is the only place a `Return` signal
/// is absorbed rather than propagated.
pub fn call_user_function(
    body: &Stmt,
    call_env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Value, EvalFailure> {
    match eval_stmt(body, call_env, ctx)? {
        Flow::Value(_) => Ok(Value::Null),
        Flow::Return(v) => Ok(v),
    }
}

fn eval_block(
    statements: &[Stmt],
    env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Flow, EvalFailure> {
    let mut last = Value::Null;
    for stmt in statements {
        match eval_stmt(stmt, env, ctx)? {
            Flow::Value(v) => last = v,
            returned @ Flow::Return(_) => return Ok(returned),
        }
    }
    Ok(Flow::Value(last))
}

fn eval_stmt(
    stmt: &Stmt,
    env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Flow, EvalFailure> {
    match stmt {
        // A block does NOT introduce a new lexical scope: declarations made
        // inside escape to the enclosing function scope.
        Stmt::Block(statements, _) => eval_block(statements, env, ctx),

        Stmt::ExpressionStatement(expr, _) => Ok(Flow::Value(eval_expr(expr, env, ctx)?)),

        Stmt::VarDecl { name, init, .. } => {
            let value = match init {
                Some(expr) => eval_expr(expr, env, ctx)?,
                None => Value::Null,
            };
            env.define(name.clone(), value.clone());
            Ok(Flow::Value(value))
        }

        Stmt::Assign {
            name,
            expr,
            position,
        } => {
            let value = eval_expr(expr, env, ctx)?;
            env.assign(name, value.clone())
                .map_err(|e| e.at(*position))?;
            Ok(Flow::Value(value))
        }

        Stmt::FunctionDecl {
            name, params, body, ..
        } => {
            let function = Value::Callable(Callable::User {
                name: Some(name.clone()),
                params: Rc::new(params.clone()),
                body: Rc::new((**body).clone()),
                env: Rc::clone(env),
            });
            env.define(name.clone(), function.clone());
            Ok(Flow::Value(function))
        }

        Stmt::Return { expr, .. } => {
            let value = match expr {
                Some(expr) => eval_expr(expr, env, ctx)?,
                None => Value::Null,
            };
            Ok(Flow::Return(value))
        }

        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            if eval_expr(condition, env, ctx)?.is_truthy() {
                eval_stmt(then_branch, env, ctx)
            } else if let Some(else_branch) = else_branch {
                eval_stmt(else_branch, env, ctx)
            } else {
                Ok(Flow::Value(Value::Null))
            }
        }

        Stmt::While {
            condition, body, ..
        } => {
            while eval_expr(condition, env, ctx)?.is_truthy() {
                if let Flow::Return(v) = eval_stmt(body, env, ctx)? {
                    return Ok(Flow::Return(v));
                }
            }
            Ok(Flow::Value(Value::Null))
        }
    }
}

fn eval_expr(
    expr: &Expr,
    env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Value, EvalFailure> {
    match expr {
        Expr::Ident(name, position) => env
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedSymbol(name.clone()).at(*position)),

        Expr::Number(n, _) => Ok(Value::Number(*n)),
        Expr::String(s, _) => Ok(Value::String(s.clone())),
        Expr::Bool(b, _) => Ok(Value::Bool(*b)),
        Expr::Null(_) => Ok(Value::Null),

        Expr::Prefix { op, rhs, position } => {
            let value = eval_expr(rhs, env, ctx)?;
            match op {
                PrefixOp::Neg => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(RuntimeError::type_mismatch(
                        "unary -",
                        "number",
                        other.type_name(),
                    )
                    .at(*position)),
                },
                PrefixOp::Not => Ok(Value::Bool(!value.is_truthy())),
            }
        }

        Expr::Infix {
            lhs,
            op,
            rhs,
            position,
        } => eval_infix(*op, lhs, rhs, *position, env, ctx),

        Expr::Call {
            callee,
            args,
            position,
        } => {
            let callee_value = eval_expr(callee, env, ctx)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(eval_expr(arg, env, ctx)?);
            }
            callee_value.call(&arg_values, ctx, *position)
        }

        Expr::Member {
            object,
            property,
            position,
        } => {
            let object_value = eval_expr(object, env, ctx)?;
            member_access(&object_value, property, *position)
        }

        Expr::Index {
            object,
            index,
            position,
        } => {
            let object_value = eval_expr(object, env, ctx)?;
            let index_value = eval_expr(index, env, ctx)?;
            index_access(&object_value, &index_value, *position)
        }

        Expr::ArrayLit { elements, .. } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(eval_expr(element, env, ctx)?);
            }
            Ok(Value::array(items))
        }

        Expr::FunctionLit { params, body, .. } => Ok(Value::Callable(Callable::User {
            name: None,
            params: Rc::new(params.clone()),
            body: Rc::new((**body).clone()),
            env: Rc::clone(env),
        })),
    }
}

fn eval_infix(
    op: InfixOp,
    lhs: &Expr,
    rhs: &Expr,
    position: crate::position::Position,
    env: &Rc<Environment>,
    ctx: &mut HostContext,
) -> Result<Value, EvalFailure> {
    // Short-circuit operators evaluate the left operand only, returning it
    // raw (not coerced) when it already settles the result.
    match op {
        InfixOp::And => {
            let left = eval_expr(lhs, env, ctx)?;
            return if !left.is_truthy() {
                Ok(left)
            } else {
                eval_expr(rhs, env, ctx)
            };
        }
        InfixOp::Or => {
            let left = eval_expr(lhs, env, ctx)?;
            return if left.is_truthy() {
                Ok(left)
            } else {
                eval_expr(rhs, env, ctx)
            };
        }
        _ => {}
    }

    let left = eval_expr(lhs, env, ctx)?;
    let right = eval_expr(rhs, env, ctx)?;

    match op {
        InfixOp::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{left}{right}")))
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            _ => Err(
                RuntimeError::type_mismatch("+", "number", mismatched_type(&left, &right))
                    .at(position),
            ),
        },
        InfixOp::Sub => numeric(left, right, position, "-", |a, b| Ok(a - b)),
        InfixOp::Mul => numeric(left, right, position, "*", |a, b| Ok(a * b)),
        InfixOp::Div => numeric(left, right, position, "/", |a, b| {
            if b == 0.0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }),
        InfixOp::Mod => numeric(left, right, position, "%", |a, b| {
            if b == 0.0 {
                Err(RuntimeError::ModuloByZero)
            } else {
                Ok(a % b)
            }
        }),
        InfixOp::Eq => Ok(Value::Bool(left.value_eq(&right))),
        InfixOp::NotEq => Ok(Value::Bool(!left.value_eq(&right))),
        InfixOp::Lt | InfixOp::Gt | InfixOp::LtEq | InfixOp::GtEq => {
            compare(op, left, right, position)
        }
        InfixOp::And | InfixOp::Or => unreachable!("handled above"),
    }
}

fn mismatched_type(left: &Value, right: &Value) -> &'static str {
    if matches!(left, Value::Number(_)) {
        right.type_name()
    } else {
        left.type_name()
    }
}

fn numeric(
    left: Value,
    right: Value,
    position: crate::position::Position,
    op_name: &'static str,
    apply: impl Fn(f64, f64) -> Result<f64, RuntimeError>,
) -> Result<Value, EvalFailure> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            apply(a, b).map(Value::Number).map_err(|e| e.at(position))
        }
        (left, right) => Err(
            RuntimeError::type_mismatch(op_name, "number", mismatched_type(&left, &right))
                .at(position),
        ),
    }
}

fn compare(
    op: InfixOp,
    left: Value,
    right: Value,
    position: crate::position::Position,
) -> Result<Value, EvalFailure> {
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(RuntimeError::type_mismatch(
                "comparison",
                "two numbers or two strings",
                mismatched_type(&left, &right),
            )
            .at(position))
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false)); // NaN comparisons are never true
    };
    let result = match op {
        InfixOp::Lt => ordering.is_lt(),
        InfixOp::Gt => ordering.is_gt(),
        InfixOp::LtEq => ordering.is_le(),
        InfixOp::GtEq => ordering.is_ge(),
        _ => unreachable!("only ordering operators reach here"),
    };
    Ok(Value::Bool(result))
}

fn member_access(
    object: &Value,
    property: &str,
    position: crate::position::Position,
) -> Result<Value, EvalFailure> {
    match object {
        Value::Null => Err(RuntimeError::NullAccess.at(position)),
        Value::Record(fields) => Ok(fields
            .borrow()
            .get(property)
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Array(items) if property == "length" => {
            Ok(Value::Number(items.borrow().len() as f64))
        }
        Value::Array(_) => Ok(Value::Null),
        _ => Ok(Value::Null),
    }
}

fn index_access(
    object: &Value,
    index: &Value,
    position: crate::position::Position,
) -> Result<Value, EvalFailure> {
    match object {
        Value::Null => Err(RuntimeError::NullAccess.at(position)),
        Value::Array(items) => {
            let Value::Number(n) = index else {
                return Ok(Value::Null);
            };
            if *n < 0.0 {
                return Ok(Value::Null); // negative indices are NOT wrapped
            }
            let idx = *n as usize;
            Ok(items.borrow().get(idx).cloned().unwrap_or(Value::Null))
        }
        Value::Record(fields) => {
            let key = index.to_string();
            Ok(fields.borrow().get(&key).cloned().unwrap_or(Value::Null))
        }
        _ => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use std::collections::HashMap;

    fn run(source: &str) -> (Value, Vec<String>, HashMap<String, Value>) {
        let parser = Parser::new(Lexer::new(source));
        let (program, diagnostics) = parser.parse_program();
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics: {diagnostics:?}"
        );
        let registry = crate::host::with_builtins();
        let root = Environment::new();
        for (name, host_fn) in registry.iter() {
            root.define(
                name.clone(),
                Value::Callable(Callable::Host(Rc::clone(host_fn))),
            );
        }
        let mut data = HashMap::new();
        let mut output = Vec::new();
        let mut ctx = HostContext {
            data: &mut data,
            output: &mut output,
        };
        let result = eval_program(&program, &root, &mut ctx).unwrap();
        (result, output, data)
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let (result, _, _) = run("1 + 2 * 3;");
        assert!(matches!(result, Value::Number(n) if n == 7.0));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let (result, _, _) = run("1 - 2 - 3;");
        assert!(matches!(result, Value::Number(n) if n == -4.0));
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiply() {
        let (result, _, _) = run("let x = 2; let y = 3; -x * y;");
        assert!(matches!(result, Value::Number(n) if n == -6.0));
    }

    #[test]
    fn short_circuit_and_skips_right_side_effect() {
        let (_, output, _) = run("false && console_put(1); 0;");
        assert!(output.is_empty());
    }

    #[test]
    fn short_circuit_or_skips_right_side_effect() {
        let (_, output, _) = run("true || console_put(1); 0;");
        assert!(output.is_empty());
    }

    #[test]
    fn closure_reads_current_value_of_outer_binding() {
        let (result, _, _) = run(
            "let x = 10; def make() { return def() { return x; }; } let f = make(); x = 20; f();",
        );
        assert!(matches!(result, Value::Number(n) if n == 20.0));
    }

    #[test]
    fn recursion_factorial() {
        let (result, _, _) = run(
            "def fact(n) { if (n <= 1) { return 1; } else { return n * fact(n - 1); } } fact(5);",
        );
        assert!(matches!(result, Value::Number(n) if n == 120.0));
    }

    #[test]
    fn string_concatenation_coercion() {
        let (result, _, _) = run(r#""sum=" + (1 + 2);"#);
        assert!(matches!(result, Value::String(ref s) if s == "sum=3"));
    }

    #[test]
    fn division_by_zero_is_runtime_error() {
        let parser = Parser::new(Lexer::new("1/0;"));
        let (program, diagnostics) = parser.parse_program();
        assert!(diagnostics.is_empty());
        let root = Environment::new();
        let mut data = HashMap::new();
        let mut output = Vec::new();
        let mut ctx = HostContext {
            data: &mut data,
            output: &mut output,
        };
        let err = eval_program(&program, &root, &mut ctx).unwrap_err();
        assert!(matches!(err.error, RuntimeError::DivisionByZero));
    }

    #[test]
    fn arity_mismatch_pads_missing_with_null_and_ignores_extra() {
        let (result, _, _) = run("def f(a, b) { return a == null; } f();");
        assert!(matches!(result, Value::Bool(true)));
        let (result2, _, _) = run("def g(a) { return a; } g(1, 2, 3);");
        assert!(matches!(result2, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn negative_index_is_null_not_wrapped() {
        let (result, _, _) = run("let a = [1,2,3]; a[-1];");
        assert!(matches!(result, Value::Null));
    }

    #[test]
    fn host_function_shadowed_lexically_within_scope() {
        let (result, output, _) =
            run("def inner() { let console_put = 5; return console_put; } inner();");
        assert!(matches!(result, Value::Number(n) if n == 5.0));
        assert!(output.is_empty());
    }
}
