// ABOUTME: Host function registry: name -> (implementation, may-suspend flag)

use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// The borrowed view of the data store and output sink handed to a host
/// function implementation for the duration of one call. Rust's borrow
/// checker, rather than documentation alone, enforces that the evaluator
/// exclusively owns these for the call's duration.
pub struct HostContext<'a> {
    pub data: &'a mut HashMap<String, Value>,
    pub output: &'a mut Vec<String>,
}

pub type HostImpl = Rc<dyn Fn(&[Value], &mut HostContext) -> Result<Value, RuntimeError>>;

pub struct HostFunction {
    pub name: String,
    pub func: HostImpl,
    pub may_suspend: bool,
}

/// Name -> host function. Overlays the global root environment: a name
/// registered here is visible as a callable at every scope until shadowed by
/// a user `let`/`def`.
#[derive(Default)]
pub struct HostRegistry {
    functions: HashMap<String, Rc<HostFunction>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        HostRegistry {
            functions: HashMap::new(),
        }
    }

    /// Registers a host function, replacing any prior registration under the
    /// same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        may_suspend: bool,
        implementation: impl Fn(&[Value], &mut HostContext) -> Result<Value, RuntimeError> + 'static,
    ) {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            Rc::new(HostFunction {
                name,
                func: Rc::new(implementation),
                may_suspend,
            }),
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rc<HostFunction>)> {
        self.functions.iter()
    }
}

/// `console_put(value)`: stringify the argument and append as one line to
/// the output sink. Result: the argument unchanged.
fn console_put(args: &[Value], ctx: &mut HostContext) -> Result<Value, RuntimeError> {
    let value = args.first().cloned().unwrap_or(Value::Null);
    ctx.output.push(value.to_string());
    Ok(value)
}

/// `io_get(key)`: value stored at `key`, or `Null` if absent. Arrays are
/// defensively (shallow) copied before being handed to the program.
fn io_get(args: &[Value], ctx: &mut HostContext) -> Result<Value, RuntimeError> {
    let key = args.first().map(|v| v.to_string()).unwrap_or_default();
    match ctx.data.get(&key) {
        Some(value) => Ok(value.shallow_copy()),
        None => Ok(Value::Null),
    }
}

/// `io_put(key, value)`: write `value` at `key`; return `value`. `key` is
/// coerced to a string.
fn io_put(args: &[Value], ctx: &mut HostContext) -> Result<Value, RuntimeError> {
    let key = args.first().map(|v| v.to_string()).unwrap_or_default();
    let value = args.get(1).cloned().unwrap_or(Value::Null);
    ctx.data.insert(key, value.clone());
    Ok(value)
}

/// Registers the three always-present built-ins into a fresh registry.
pub fn with_builtins() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry.register("console_put", false, console_put);
    registry.register("io_get", false, io_get);
    registry.register("io_put", false, io_put);
    registry
}
