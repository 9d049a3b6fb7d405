// ABOUTME: End-to-end scenarios and universal invariants for the interpreter façade

use scriptling::value::Value;
use scriptling::Interpreter;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

fn data_store(pairs: &[(&str, f64)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Number(*v)))
        .collect()
}

// S1 — Built-ins, mutation, recursion.
#[test]
fn s1_builtins_mutation_recursion_positive() {
    let source = r#"
        def foo(x) {
          if (x > 0) {
            let y = x;
            let i = 0;
            while (i < 2) { y = y * 2; i = i + 1; }
            return y;
          } else { return x * -2; }
        }
        let a = io_get('value1');
        console_put("old:"); console_put(a);
        let b = foo(a);
        io_put('value1', b);
        console_put("new:"); console_put(b);
    "#;
    let mut interp = Interpreter::new();
    let (ok, diags) = interp.parse(source);
    assert!(ok, "{diags:?}");
    let mut data = data_store(&[("value1", 5.0)]);
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(evaluation.ok, "{:?}", evaluation.diagnostics);
    assert_eq!(output, vec!["old:", "5", "new:", "20"]);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 20.0));
    assert!(matches!(data.get("value1"), Some(Value::Number(n)) if *n == 20.0));
}

#[test]
fn s1_builtins_mutation_recursion_negative() {
    let source = r#"
        def foo(x) {
          if (x > 0) {
            let y = x;
            let i = 0;
            while (i < 2) { y = y * 2; i = i + 1; }
            return y;
          } else { return x * -2; }
        }
        let a = io_get('value1');
        let b = foo(a);
        io_put('value1', b);
        b;
    "#;
    let mut interp = Interpreter::new();
    let (ok, diags) = interp.parse(source);
    assert!(ok, "{diags:?}");
    let mut data = data_store(&[("value1", -3.0)]);
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(evaluation.ok, "{:?}", evaluation.diagnostics);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 6.0));
    assert!(matches!(data.get("value1"), Some(Value::Number(n)) if *n == 6.0));
}

// S2 — Closure captures updated outer.
#[test]
fn s2_closure_captures_updated_outer() {
    let source =
        "let x = 10; def make() { return def() { return x; }; } let f = make(); x = 20; f();";
    let mut interp = Interpreter::new();
    let (ok, _) = interp.parse(source);
    assert!(ok);
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 20.0));
}

// S3 — Recursion.
#[test]
fn s3_recursion_factorial() {
    let source = "def fact(n) { if (n <= 1) { return 1; } else { return n * fact(n-1); } } fact(5);";
    let mut interp = Interpreter::new();
    let (ok, _) = interp.parse(source);
    assert!(ok);
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 120.0));
}

// S4 — String concatenation coercion.
#[test]
fn s4_string_concatenation_coercion() {
    let source = r#""sum=" + (1 + 2);"#;
    let mut interp = Interpreter::new();
    let (ok, _) = interp.parse(source);
    assert!(ok);
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(matches!(evaluation.result, Value::String(ref s) if s == "sum=3"));
}

// S5 — Array and member access via a host function.
#[test]
fn s5_array_and_member_access() {
    let source = "let r = users(); r.items[1] + r.items.length;";
    let mut interp = Interpreter::new();
    interp.register("users", false, |_args, _ctx| {
        let mut fields = HashMap::new();
        fields.insert(
            "items".to_string(),
            Value::array(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
            ]),
        );
        Ok(Value::record(fields))
    });
    let (ok, _) = interp.parse(source);
    assert!(ok);
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(evaluation.ok, "{:?}", evaluation.diagnostics);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 5.0));
}

// S6 — Division by zero.
#[test]
fn s6_division_by_zero() {
    let mut interp = Interpreter::new();
    let (ok, _) = interp.parse("1/0;");
    assert!(ok); // parses fine; fails at runtime
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(!evaluation.ok);
    assert_eq!(evaluation.diagnostics.len(), 1);
    assert_eq!(evaluation.diagnostics[0].phase, scriptling::Phase::Runtime);
}

// Universal invariant: lexer totality (token stream always terminates, positions
// monotonic) is covered directly in src/lexer.rs's unit tests.

// Universal invariant: parser totality — parse never throws on arbitrary input.
#[test]
fn parser_totality_on_garbage_input() {
    let mut interp = Interpreter::new();
    let (_ok, _diags) = interp.parse("@@@ ]]] {{{ def def let let ===");
    // Reaching this line without a panic demonstrates totality.
}

// Universal invariant: error positions are line >= 1 and column >= 1, except
// the (0,0) sentinel for a missing position.
#[test]
fn error_positions_are_valid_or_sentinel() {
    let mut interp = Interpreter::new();
    interp.parse("1/0;");
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    let position = evaluation.diagnostics[0].position;
    let is_sentinel = position.line == 0 && position.column == 0;
    assert!(is_sentinel || (position.line >= 1 && position.column >= 1));
}

// Universal invariant: mutating the array handed back by a host function's
// own reference does not retroactively change what a later io_get(k) sees
// unless io_put(k, ...) writes it back — the data store is only ever
// touched through the registered built-ins, never aliased into the script.
#[test]
fn data_store_defensive_copy_across_io_get_calls() {
    let source = "let first = io_get('items'); let second = io_get('items'); first;";
    let mut interp = Interpreter::new();
    let (ok, diags) = interp.parse(source);
    assert!(ok, "{diags:?}");
    let original = Rc::new(RefCell::new(vec![Value::Number(1.0), Value::Number(2.0)]));
    let mut data = HashMap::new();
    data.insert("items".to_string(), Value::Array(Rc::clone(&original)));
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(evaluation.ok, "{:?}", evaluation.diagnostics);
    if let Value::Array(returned) = evaluation.result {
        assert!(!Rc::ptr_eq(&returned, &original));
    } else {
        panic!("expected array result");
    }
    assert_eq!(original.borrow().len(), 2);
}

#[test]
fn explicit_io_put_updates_the_store() {
    let source = "io_put('k', 7); io_get('k');";
    let mut interp = Interpreter::new();
    let (ok, _) = interp.parse(source);
    assert!(ok);
    let mut data = HashMap::new();
    let mut output = Vec::new();
    let evaluation = interp.evaluate(&mut data, &mut output);
    assert!(matches!(evaluation.result, Value::Number(n) if n == 7.0));
    assert!(matches!(data.get("k"), Some(Value::Number(n)) if *n == 7.0));
}
