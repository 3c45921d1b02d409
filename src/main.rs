use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use minic::{ast, bytecode, lexer, parser, semantics, vm};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut dump_dir: Option<PathBuf> = None;
    let mut no_run = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-dir" | "-d" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing directory after {arg}"))?;
                dump_dir = Some(PathBuf::from(dir));
            }
            "--no-run" => {
                no_run = true;
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    if let Some(dir) = &dump_dir {
        fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
    }

    let tokens = lexer::tokenize(&source);
    if let Some(dir) = &dump_dir {
        let mut dump = String::new();
        for token in &tokens {
            dump.push_str(&token.to_string());
            dump.push('\n');
        }
        write_dump(dir, "tokens.txt", &dump)?;
    }

    let (program, syntax_errors) = parser::parse_tokens(tokens);
    if let Some(dir) = &dump_dir {
        let mut dump = ast::dump_program(&program);
        if syntax_errors.is_empty() {
            dump.push_str("\n=== No syntax errors ===\n");
        } else {
            dump.push_str("\n=== Syntax errors ===\n");
            for error in &syntax_errors {
                dump.push_str(&error.to_string());
                dump.push('\n');
            }
        }
        write_dump(dir, "syntax.txt", &dump)?;
    }
    if !syntax_errors.is_empty() {
        for error in &syntax_errors {
            eprintln!("{error}");
        }
        std::process::exit(1);
    }

    let semantic_errors = semantics::analyze(&program);
    if let Some(dir) = &dump_dir {
        let dump = if semantic_errors.is_empty() {
            "=== No semantic errors ===\n".to_string()
        } else {
            let mut dump = "=== Semantic errors ===\n".to_string();
            for error in &semantic_errors {
                dump.push_str(&error.to_string());
                dump.push('\n');
            }
            dump
        };
        write_dump(dir, "semantics.txt", &dump)?;
    }
    if !semantic_errors.is_empty() {
        for error in &semantic_errors {
            eprintln!("{error}");
        }
        std::process::exit(1);
    }

    let code = bytecode::generate(&program);
    if let Some(dir) = &dump_dir {
        write_dump(dir, "bytecode.txt", &bytecode::dump(&code))?;
    }

    if !no_run {
        vm::Vm::new(&code).run_stdio().context("Executing program")?;
    }

    Ok(())
}

fn write_dump(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("Writing {}", path.display()))
}
