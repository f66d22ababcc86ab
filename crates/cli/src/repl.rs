//! Interactive read-compile-run loop
//!
//! Each submitted line is compiled through the full front end and
//! executed on a fresh virtual machine, so declarations do not persist
//! between entries. Errors print and the loop continues.

use rill_vm::Vm;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

pub fn run() -> Result<(), String> {
    let mut editor = DefaultEditor::new().map_err(|e| format!("cannot start editor: {}", e))?;
    println!("rill repl - enter a program, :quit to exit");

    loop {
        match editor.readline("rill> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ":quit" || line == ":q" {
                    break;
                }
                let _ = editor.add_history_entry(line);
                evaluate(line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(format!("readline error: {}", e)),
        }
    }

    Ok(())
}

fn evaluate(source: &str) {
    let compilation = match rillc::compile(source) {
        Ok(compilation) => compilation,
        Err(e) => {
            eprintln!("error: {}", e);
            return;
        }
    };
    for warning in &compilation.analysis.warnings {
        eprintln!("warning: {}", warning);
    }

    let mut vm = Vm::new();
    if let Err(e) = vm.load(&compilation.assembly) {
        eprintln!("error: {}", e);
        return;
    }
    if let Err(e) = vm.run() {
        eprintln!("error: {}", e);
        return;
    }

    let mut entries: Vec<(&String, &rill_vm::Value)> = vm.memory().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in entries {
        println!("{} = {}", name, value);
    }
}
