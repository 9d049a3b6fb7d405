// ABOUTME: Demo CLI: run a script file or drop into a line-oriented REPL

use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use scriptling::config;
use scriptling::{Interpreter, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

/// An embeddable scripting-language interpreter demo.
#[derive(ClapParser, Debug)]
#[command(name = "scriptling", version = config::VERSION)]
struct CliArgs {
    /// Script file to run. Omit to start an interactive REPL.
    script: Option<PathBuf>,

    /// JSON file providing the initial data store (an object of key/value
    /// pairs).
    #[arg(long)]
    data: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match args.script {
        Some(path) => run_script(&path, args.data.as_deref()),
        None => run_repl(),
    }
}

fn run_script(path: &std::path::Path, data_path: Option<&std::path::Path>) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut data_store = match data_path {
        Some(path) => match load_data_store(path) {
            Ok(store) => store,
            Err(err) => {
                eprintln!("error reading {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => HashMap::new(),
    };

    let mut interpreter = Interpreter::new();
    let (ok, diagnostics) = interpreter.parse(&source);
    if !ok {
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        return ExitCode::FAILURE;
    }

    let mut output_sink = Vec::new();
    let evaluation = interpreter.evaluate(&mut data_store, &mut output_sink);
    for line in &output_sink {
        println!("{line}");
    }
    if !evaluation.ok {
        for diagnostic in &evaluation.diagnostics {
            eprintln!("{diagnostic}");
        }
        return ExitCode::FAILURE;
    }
    println!("=> {}", evaluation.result);
    ExitCode::SUCCESS
}

fn run_repl() -> ExitCode {
    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    let mut interpreter = Interpreter::new();
    let mut data_store = HashMap::new();
    let history_path = ".scriptling_history";

    let Ok(mut editor) = DefaultEditor::new() else {
        eprintln!("failed to initialize line editor");
        return ExitCode::FAILURE;
    };
    let _ = editor.load_history(history_path);

    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                if trimmed == "quit" || trimmed == "exit" {
                    break;
                }

                let (ok, diagnostics) = interpreter.parse(trimmed);
                if !ok {
                    for diagnostic in &diagnostics {
                        eprintln!("{diagnostic}");
                    }
                    continue;
                }

                let mut output_sink = Vec::new();
                let evaluation = interpreter.evaluate(&mut data_store, &mut output_sink);
                for line in &output_sink {
                    println!("{line}");
                }
                if evaluation.ok {
                    println!("=> {}", evaluation.result);
                } else {
                    for diagnostic in &evaluation.diagnostics {
                        eprintln!("{diagnostic}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }

    let _ = editor.save_history(history_path);
    ExitCode::SUCCESS
}

fn load_data_store(path: &std::path::Path) -> Result<HashMap<String, Value>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    let serde_json::Value::Object(map) = json else {
        return Err("data file must contain a JSON object".to_string());
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| (k, json_to_value(v)))
        .collect())
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(fields) => Value::record(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_becomes_record() {
        let json: serde_json::Value = serde_json::json!({"a": 1, "b": [1, 2]});
        let value = json_to_value(json);
        assert!(matches!(value, Value::Record(_)));
    }

    #[test]
    fn cli_args_parse_script_and_data() {
        let args = CliArgs::parse_from(["scriptling", "prog.scr", "--data", "data.json"]);
        assert_eq!(args.script, Some(PathBuf::from("prog.scr")));
        assert_eq!(args.data, Some(PathBuf::from("data.json")));
    }
}
