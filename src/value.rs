// ABOUTME: The dynamic value universe and callable representation

use crate::env::Environment;
use crate::error::{EvalFailure, RuntimeError};
use crate::host::{HostContext, HostFunction};
use crate::position::Position;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Record(Rc<RefCell<HashMap<String, Value>>>),
    Callable(Callable),
}

#[derive(Clone)]
pub enum Callable {
    User {
        name: Option<String>,
        params: Rc<Vec<String>>,
        body: Rc<crate::ast::Stmt>,
        env: Rc<Environment>,
    },
    Host(Rc<HostFunction>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn record(fields: HashMap<String, Value>) -> Self {
        Value::Record(Rc::new(RefCell::new(fields)))
    }

    /// A shallow copy: array elements and record values are cloned as `Value`s
    /// (cheap, since nested arrays/records are themselves `Rc` handles), but a
    /// *new* backing container is allocated so mutating the copy never
    /// mutates the original's storage.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Array(items) => Value::array(items.borrow().clone()),
            Value::Record(fields) => Value::record(fields.borrow().clone()),
            other => other.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Callable(_) => "callable",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 || n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Record(_) | Value::Callable(_) => true,
        }
    }

    /// Structural equality on primitives; reference identity on
    /// arrays/records/callables.
    pub fn value_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(Callable::Host(a)), Value::Callable(Callable::Host(b))) => {
                Rc::ptr_eq(a, b)
            }
            (
                Value::Callable(Callable::User { body: a, .. }),
                Value::Callable(Callable::User { body: b, .. }),
            ) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn call(
        &self,
        args: &[Value],
        ctx: &mut HostContext,
        position: Position,
    ) -> Result<Value, EvalFailure> {
        match self {
            Value::Callable(c) => c.invoke(args, ctx, position),
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            }
            .at(position)),
        }
    }
}

impl Callable {
    fn invoke(
        &self,
        args: &[Value],
        ctx: &mut HostContext,
        position: Position,
    ) -> Result<Value, EvalFailure> {
        match self {
            Callable::User {
                params, body, env, ..
            } => {
                let call_env = Environment::with_parent(Rc::clone(env));
                for (i, param) in params.iter().enumerate() {
                    let value = args.get(i).cloned().unwrap_or(Value::Null);
                    call_env.define(param.clone(), value);
                }
                crate::eval::call_user_function(body, &call_env, ctx)
            }
            Callable::Host(host) => (host.func)(args, ctx).map_err(|e| e.at(position)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                let items = items.borrow();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                let fields = fields.borrow();
                let mut keys: Vec<&String> = fields.keys().collect();
                keys.sort();
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{key}:{}", fields[*key])?;
                }
                write!(f, "}}")
            }
            Value::Callable(Callable::User { name: Some(n), .. }) => write!(f, "<function {n}>"),
            Value::Callable(_) => write!(f, "<function>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_render_without_trailing_zero() {
        assert_eq!(Value::Number(20.0).to_string(), "20");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
    }

    #[test]
    fn null_and_bools_render_as_keywords() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn strings_render_unquoted() {
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
    }

    #[test]
    fn arrays_render_with_no_spaces() {
        let v = Value::array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(v.to_string(), "[1,2,3]");
    }

    #[test]
    fn records_render_sorted_with_no_spaces() {
        let mut fields = HashMap::new();
        fields.insert("b".to_string(), Value::Number(2.0));
        fields.insert("a".to_string(), Value::Number(1.0));
        let v = Value::record(fields);
        assert_eq!(v.to_string(), "{a:1,b:2}");
    }

    #[test]
    fn truthiness_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(f64::NAN).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(!Value::array(vec![]).is_truthy());
        assert!(Value::array(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn array_equality_is_reference_identity() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        assert!(!a.value_eq(&b));
        assert!(a.value_eq(&a.clone()));
    }

    #[test]
    fn shallow_copy_detaches_backing_storage() {
        let original = Value::array(vec![Value::Number(1.0)]);
        let copy = original.shallow_copy();
        if let Value::Array(items) = &copy {
            items.borrow_mut().push(Value::Number(2.0));
        }
        if let Value::Array(items) = &original {
            assert_eq!(items.borrow().len(), 1);
        } else {
            panic!("expected array");
        }
    }
}
