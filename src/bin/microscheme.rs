// MicroScheme command-line driver: evaluates a source file, or starts an
// interactive REPL when no file is given.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use microscheme::runtime::Runtime;
use microscheme::Value;

#[derive(Parser)]
#[command(name = "microscheme")]
#[command(about = "MicroScheme interpreter: evaluate a file, or start a REPL")]
struct Args {
    /// Source file to evaluate; the REPL starts when omitted
    file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let code = match args.file {
        Some(path) => run_file(&path),
        None => run_repl(),
    };
    std::process::exit(code);
}

fn run_file(path: &Path) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", path.display(), e);
            return 1;
        }
    };
    let program = match microscheme::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    let runtime = Runtime::new();
    let failures = runtime.run_program(&program);
    if failures == 0 {
        0
    } else {
        1
    }
}

fn run_repl() -> i32 {
    println!("MicroScheme REPL. Type 'quit' to exit.");

    let runtime = Runtime::new();
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("error: cannot start line editor: {}", e);
            return 1;
        }
    };

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "ms> " } else { "  > " };
        match editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim_end();
                if buffer.is_empty() {
                    match line.trim() {
                        "" => continue,
                        "quit" | "exit" => break,
                        _ => {}
                    }
                }
                if !line.is_empty() {
                    let _ = editor.add_history_entry(line);
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(line);

                // Keep reading while parentheses are unbalanced, so pasted
                // multi-line forms work.
                if open_parens(&buffer) > 0 {
                    continue;
                }
                let input = std::mem::take(&mut buffer);
                process_input(&runtime, &input);
            }
            Err(ReadlineError::Interrupted) => {
                if buffer.is_empty() {
                    break;
                }
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("error: {}", e);
                return 1;
            }
        }
    }
    0
}

fn process_input(runtime: &Runtime, input: &str) {
    let program = match microscheme::parse(input) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    for form in &program.forms {
        match runtime.evaluator().eval_toplevel(form) {
            Ok(Value::Unspecified) => {}
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("error: {}", e),
        }
    }
}

fn open_parens(text: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => in_comment = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}
