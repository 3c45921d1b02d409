use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::builtins::Builtin;
use crate::bytecode::{Instruction, OpCode};

pub mod value;

pub use value::Value;

/// Fatal runtime failures. Data errors (missing variable, out-of-bounds
/// index, integer division by zero) produce zero values instead and keep
/// executing.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unknown label for {op}: {label}")]
    UnknownLabel { op: &'static str, label: String },
    #[error("unknown function label: {0}")]
    UnknownFunctionLabel(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One function activation: the caller's resume point plus the local
/// bindings of this invocation.
#[derive(Debug)]
struct Frame {
    ret_ip: usize,
    locals: HashMap<String, Value>,
}

/// Stack virtual machine over the labeled instruction list.
///
/// Execution begins at the `main` label when present (with a sentinel frame
/// whose return address is the end of code), otherwise at instruction 0,
/// and runs until the instruction pointer leaves the code or a `RET` pops
/// the sentinel frame.
pub struct Vm<'a> {
    code: &'a [Instruction],
    labels: HashMap<String, usize>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
}

impl<'a> Vm<'a> {
    pub fn new(code: &'a [Instruction]) -> Self {
        let mut labels = HashMap::new();
        for (index, instruction) in code.iter().enumerate() {
            if instruction.op == OpCode::Label {
                labels.insert(instruction.arg.clone(), index);
            }
        }
        Self {
            code,
            labels,
            stack: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Runs against the process's standard streams.
    pub fn run_stdio(&mut self) -> Result<(), VmError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut input = stdin.lock();
        let mut output = stdout.lock();
        self.run(&mut input, &mut output)
    }

    pub fn run(
        &mut self,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), VmError> {
        let code = self.code;
        let mut ip = 0;
        if let Some(&main_ip) = self.labels.get("main") {
            ip = main_ip;
            self.frames.push(Frame {
                ret_ip: code.len(),
                locals: HashMap::new(),
            });
        }

        while ip < code.len() {
            let instruction = &code[ip];
            match instruction.op {
                OpCode::Label => ip += 1,
                OpCode::Pop => {
                    self.pop()?;
                    ip += 1;
                }
                OpCode::PushInt => {
                    let value = instruction.arg.parse().unwrap_or(0);
                    self.stack.push(Value::Int(value));
                    ip += 1;
                }
                OpCode::PushDouble => {
                    let value = instruction.arg.parse().unwrap_or(0.0);
                    self.stack.push(Value::Double(value));
                    ip += 1;
                }
                OpCode::PushString => {
                    self.stack.push(Value::Str(strip_quotes(&instruction.arg)));
                    ip += 1;
                }
                OpCode::Load => {
                    let value = self
                        .frames
                        .last()
                        .and_then(|frame| frame.locals.get(&instruction.arg))
                        .cloned()
                        .unwrap_or(Value::Int(0));
                    self.stack.push(value);
                    ip += 1;
                }
                OpCode::Store => {
                    let value = self.pop()?;
                    self.bottom_frame_on_demand();
                    let frame = self.frames.last_mut().expect("frame pushed above");
                    frame.locals.insert(instruction.arg.clone(), value);
                    ip += 1;
                }
                OpCode::NewArray => {
                    let n = self.pop()?.as_int().max(0);
                    self.stack.push(Value::zero_array(n as usize));
                    ip += 1;
                }
                OpCode::LoadIndex => {
                    let index = self.pop()?.as_int();
                    let base = self.pop()?;
                    self.stack.push(load_index(&base, index));
                    ip += 1;
                }
                OpCode::StoreIndex => {
                    let index = self.pop()?.as_int();
                    let value = self.pop()?;
                    self.bottom_frame_on_demand();
                    let frame = self.frames.last_mut().expect("frame pushed above");
                    store_index(&mut frame.locals, &instruction.arg, index, value);
                    ip += 1;
                }
                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::Eq
                | OpCode::Neq
                | OpCode::Lt
                | OpCode::Gt
                | OpCode::Le
                | OpCode::Ge => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(binary_op(instruction.op, &a, &b));
                    ip += 1;
                }
                OpCode::Neg => {
                    let v = self.pop()?;
                    let negated = match v {
                        Value::Double(d) => Value::Double(-d),
                        other => Value::Int(-other.as_int()),
                    };
                    self.stack.push(negated);
                    ip += 1;
                }
                OpCode::Not => {
                    let v = self.pop()?;
                    self.stack.push(Value::Int(i64::from(v.is_zero())));
                    ip += 1;
                }
                OpCode::Jmp => {
                    ip = self.label_target("JMP", &instruction.arg)?;
                }
                OpCode::Jz => {
                    let v = self.pop()?;
                    if v.is_zero() {
                        ip = self.label_target("JZ", &instruction.arg)?;
                    } else {
                        ip += 1;
                    }
                }
                OpCode::Call => {
                    if let Some(builtin) = Builtin::from_name(&instruction.arg) {
                        self.call_builtin(builtin, input, output)?;
                        ip += 1;
                    } else {
                        let target = *self
                            .labels
                            .get(&instruction.arg)
                            .ok_or_else(|| {
                                VmError::UnknownFunctionLabel(instruction.arg.clone())
                            })?;
                        self.frames.push(Frame {
                            ret_ip: ip + 1,
                            locals: HashMap::new(),
                        });
                        ip = target;
                    }
                }
                OpCode::Ret => {
                    let Some(frame) = self.frames.pop() else {
                        break;
                    };
                    if self.frames.is_empty() {
                        // the sentinel frame was popped
                        break;
                    }
                    ip = frame.ret_ip;
                }
            }
        }

        output.flush()?;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Top-level statements execute before any CALL; give them a bottom
    /// frame the first time they store.
    fn bottom_frame_on_demand(&mut self) {
        if self.frames.is_empty() {
            self.frames.push(Frame {
                ret_ip: self.code.len(),
                locals: HashMap::new(),
            });
        }
    }

    fn label_target(&self, op: &'static str, label: &str) -> Result<usize, VmError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| VmError::UnknownLabel {
                op,
                label: label.to_string(),
            })
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), VmError> {
        match builtin {
            Builtin::PrintInt => {
                let v = self.pop()?;
                write!(output, "{}", v.as_int())?;
            }
            Builtin::PrintDouble => {
                let v = self.pop()?;
                write!(output, "{}", v.as_double())?;
            }
            Builtin::PrintStr => {
                let v = self.pop()?;
                write!(output, "{}", v.as_string())?;
            }
            Builtin::InputInt => {
                let word = read_word(input)?;
                self.stack.push(Value::Int(word.parse().unwrap_or(0)));
            }
            Builtin::InputDouble => {
                let word = read_word(input)?;
                self.stack.push(Value::Double(word.parse().unwrap_or(0.0)));
            }
            Builtin::InputStr => {
                self.stack.push(Value::Str(read_line(input)?));
            }
        }
        Ok(())
    }
}

fn strip_quotes(arg: &str) -> String {
    let bytes = arg.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        arg[1..arg.len() - 1].to_string()
    } else {
        arg.to_string()
    }
}

fn load_index(base: &Value, index: i64) -> Value {
    match base {
        Value::Array(values) => {
            if index < 0 || index as usize >= values.len() {
                Value::Int(0)
            } else {
                values[index as usize].clone()
            }
        }
        Value::Str(s) => {
            // byte-indexed single-byte substring
            if index < 0 || index as usize >= s.len() {
                Value::Str(String::new())
            } else {
                Value::Str((s.as_bytes()[index as usize] as char).to_string())
            }
        }
        _ => Value::Int(0),
    }
}

fn store_index(locals: &mut HashMap<String, Value>, name: &str, index: i64, value: Value) {
    let needed = index.max(0) as usize + 1;
    let slot = locals
        .entry(name.to_string())
        .or_insert_with(|| Value::zero_array(needed));
    if !matches!(slot, Value::Array(_)) {
        *slot = Value::zero_array(needed);
    }
    if index < 0 {
        return;
    }
    if let Value::Array(values) = slot {
        if index as usize >= values.len() {
            values.resize(index as usize + 1, Value::Int(0));
        }
        values[index as usize] = value;
    }
}

fn binary_op(op: OpCode, a: &Value, b: &Value) -> Value {
    let either_double = a.is_double() || b.is_double();
    match op {
        OpCode::Add => {
            if matches!(a, Value::Str(_)) || matches!(b, Value::Str(_)) {
                Value::Str(a.as_string() + &b.as_string())
            } else if either_double {
                Value::Double(a.as_double() + b.as_double())
            } else {
                Value::Int(a.as_int() + b.as_int())
            }
        }
        OpCode::Sub => {
            if either_double {
                Value::Double(a.as_double() - b.as_double())
            } else {
                Value::Int(a.as_int() - b.as_int())
            }
        }
        OpCode::Mul => {
            if either_double {
                Value::Double(a.as_double() * b.as_double())
            } else {
                Value::Int(a.as_int() * b.as_int())
            }
        }
        OpCode::Div => {
            if either_double {
                Value::Double(a.as_double() / b.as_double())
            } else {
                let divisor = b.as_int();
                if divisor == 0 {
                    Value::Int(0)
                } else {
                    Value::Int(a.as_int() / divisor)
                }
            }
        }
        OpCode::Mod => {
            if either_double {
                Value::Double(a.as_double() % b.as_double())
            } else {
                let divisor = b.as_int();
                if divisor == 0 {
                    Value::Int(0)
                } else {
                    Value::Int(a.as_int() % divisor)
                }
            }
        }
        OpCode::Eq => Value::Int(i64::from(a.as_string() == b.as_string())),
        OpCode::Neq => Value::Int(i64::from(a.as_string() != b.as_string())),
        OpCode::Lt | OpCode::Gt | OpCode::Le | OpCode::Ge => {
            let holds = if either_double {
                let (x, y) = (a.as_double(), b.as_double());
                match op {
                    OpCode::Lt => x < y,
                    OpCode::Gt => x > y,
                    OpCode::Le => x <= y,
                    _ => x >= y,
                }
            } else {
                let (x, y) = (a.as_int(), b.as_int());
                match op {
                    OpCode::Lt => x < y,
                    OpCode::Gt => x > y,
                    OpCode::Le => x <= y,
                    _ => x >= y,
                }
            };
            Value::Int(i64::from(holds))
        }
        _ => unreachable!("not a binary opcode: {op:?}"),
    }
}

/// Reads one whitespace-separated token, leaving the trailing delimiter in
/// the stream.
fn read_word(input: &mut dyn BufRead) -> io::Result<String> {
    let mut word = Vec::new();
    loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let mut used = 0;
        let mut done = false;
        for &byte in buf {
            if byte.is_ascii_whitespace() {
                if word.is_empty() {
                    used += 1;
                    continue;
                }
                done = true;
                break;
            }
            word.push(byte);
            used += 1;
        }
        input.consume(used);
        if done {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&word).into_owned())
}

/// Reads one line without its newline. An empty line left over from a
/// preceding token read is skipped once.
fn read_line(input: &mut dyn BufRead) -> io::Result<String> {
    let mut line = String::new();
    let n = input.read_line(&mut line)?;
    let mut text = trim_newline(line);
    if text.is_empty() && n > 0 {
        let mut again = String::new();
        input.read_line(&mut again)?;
        text = trim_newline(again);
    }
    Ok(text)
}

fn trim_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{self, Instruction};
    use crate::{lexer, parser, semantics};
    use indoc::indoc;

    fn compile(source: &str) -> Vec<Instruction> {
        let (program, errors) = parser::parse_tokens(lexer::tokenize(source));
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        let semantic_errors = semantics::analyze(&program);
        assert!(
            semantic_errors.is_empty(),
            "unexpected semantic errors: {semantic_errors:?}"
        );
        bytecode::generate(&program)
    }

    fn run_with_input(source: &str, input: &str) -> String {
        let code = compile(source);
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(input.as_bytes().to_vec());
        let mut stdout = Vec::new();
        vm.run(&mut stdin, &mut stdout).expect("vm run failed");
        String::from_utf8(stdout).expect("vm output is utf-8")
    }

    fn run(source: &str) -> String {
        run_with_input(source, "")
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(run("fn int main() { printInt(1+2*3); return 0; }"), "7");
    }

    #[test]
    fn for_loop_accumulates() {
        let source = "fn int main() { int s=0; for(int i=1;i<=5;i=i+1){s=s+i;} printInt(s); return 0; }";
        assert_eq!(run(source), "15");
    }

    #[test]
    fn arrays_store_and_load() {
        let source = "fn int main() { int a[3]; a[0]=10; a[1]=20; a[2]=30; printInt(a[0]+a[1]+a[2]); return 0; }";
        assert_eq!(run(source), "60");
    }

    #[test]
    fn recursion_computes_factorial() {
        let source = indoc! {"
            fn int fact(int n){ if(n<=1){return 1;} return n*fact(n-1); }
            fn int main(){ printInt(fact(5)); return 0; }
        "};
        assert_eq!(run(source), "120");
    }

    #[test]
    fn string_concatenation() {
        let source = "fn int main(){ string s=\"hi\"; printStr(s+\" \"+\"there\"); return 0; }";
        assert_eq!(run(source), "hi there");
    }

    #[test]
    fn expression_statements_leave_no_residue() {
        let code = compile("fn int main() { int x = 2; x; printInt(x); return x - 2; }");
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        vm.run(&mut stdin, &mut stdout).expect("vm run failed");
        // the bare `x;` statement was popped; only main's return value stays
        assert_eq!(vm.stack, vec![Value::Int(0)]);
        assert_eq!(stdout, b"2");
    }

    #[test]
    fn while_and_break_continue() {
        let source = indoc! {"
            fn int main() {
                int i = 0, s = 0;
                while (1) {
                    i = i + 1;
                    if (i % 2 == 0) { continue; }
                    if (i > 7) { break; }
                    s = s + i;
                }
                printInt(s);
                return 0;
            }
        "};
        // 1 + 3 + 5 + 7
        assert_eq!(run(source), "16");
    }

    #[test]
    fn do_while_runs_body_at_least_once() {
        let source = "fn int main() { int i = 9; do { printInt(i); i = i + 1; } while (i < 5); return 0; }";
        assert_eq!(run(source), "9");
    }

    #[test]
    fn else_if_chain_dispatches() {
        let source = indoc! {"
            fn string grade(int score) {
                if (score >= 90) { return \"A\"; }
                else if (score >= 80) { return \"B\"; }
                else if (score >= 70) { return \"C\"; }
                else { return \"F\"; }
            }
            fn int main() {
                printStr(grade(95));
                printStr(grade(81));
                printStr(grade(70));
                printStr(grade(12));
                return 0;
            }
        "};
        assert_eq!(run(source), "ABCF");
    }

    #[test]
    fn int_to_double_promotion_in_arithmetic() {
        assert_eq!(run("fn int main() { printDouble(7 / 2.0); return 0; }"), "3.5");
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(run("fn int main() { printInt(7 / 2); return 0; }"), "3");
    }

    #[test]
    fn division_and_modulus_by_zero_yield_zero() {
        assert_eq!(
            run("fn int main() { int z = 0; printInt(9 / z); printInt(9 % z); return 0; }"),
            "00"
        );
    }

    #[test]
    fn out_of_bounds_load_yields_zero() {
        assert_eq!(
            run("fn int main() { int a[2]; printInt(a[5]); printInt(a[0-1]); return 0; }"),
            "00"
        );
    }

    #[test]
    fn negative_array_size_yields_empty_array() {
        let source = "fn int main() { int a[0-3]; printInt(a[0]); return 0; }";
        assert_eq!(run(source), "0");
    }

    #[test]
    fn store_index_grows_with_zero_fill() {
        let source = indoc! {"
            fn int main() {
                int a[1];
                a[4] = 9;
                printInt(a[4]);
                printInt(a[2]);
                return 0;
            }
        "};
        assert_eq!(run(source), "90");
    }

    #[test]
    fn string_indexing_yields_single_byte() {
        let source = indoc! {"
            fn int main() {
                string xs[1];
                xs[0] = \"abc\";
                printStr(xs[0][1]);
                printStr(xs[0][9]);
                return 0;
            }
        "};
        // out of range gives the empty string
        assert_eq!(run(source), "b");
    }

    #[test]
    fn string_equality_compares_contents() {
        let source = indoc! {"
            fn int main() {
                string a = \"x\" + \"y\";
                if (a == \"xy\") { printInt(1); }
                if (a != \"yz\") { printInt(2); }
                return 0;
            }
        "};
        assert_eq!(run(source), "12");
    }

    #[test]
    fn comparisons_promote_through_double() {
        let source = "fn int main() { if (1 < 1.5) { printInt(1); } if (2.5 >= 2) { printInt(2); } return 0; }";
        assert_eq!(run(source), "12");
    }

    #[test]
    fn arguments_bind_left_to_right() {
        let source = indoc! {"
            fn int sub(int a, int b) { return a - b; }
            fn int main() { printInt(sub(10, 4)); return 0; }
        "};
        assert_eq!(run(source), "6");
    }

    #[test]
    fn locals_are_per_frame() {
        let source = indoc! {"
            fn int clobber(int x) { x = 99; return x; }
            fn int main() {
                int x = 7;
                clobber(x);
                printInt(x);
                return 0;
            }
        "};
        assert_eq!(run(source), "7");
    }

    #[test]
    fn arrays_copy_between_variables() {
        let source = indoc! {"
            fn int main() {
                int a[2], b[2];
                a[0] = 5;
                b = a;
                a[1] = 9;
                printInt(b[0]);
                printInt(b[1]);
                return 0;
            }
        "};
        // `b = a` copies the contents; later writes to `a` stay unseen
        assert_eq!(run(source), "50");
    }

    #[test]
    fn input_builtins_read_tokens_and_lines() {
        let source = indoc! {"
            fn int main() {
                int x = inputInt();
                double d = inputDouble();
                string s = inputStr();
                printInt(x + 1);
                printDouble(d);
                printStr(s);
                return 0;
            }
        "};
        assert_eq!(run_with_input(source, "41 2.5\nhello\n"), "422.5hello");
    }

    #[test]
    fn input_parse_failure_pushes_zero() {
        let source = "fn int main() { printInt(inputInt()); return 0; }";
        assert_eq!(run_with_input(source, "notanint"), "0");
    }

    #[test]
    fn input_at_eof_pushes_zero() {
        let source = "fn int main() { printInt(inputInt()); return 0; }";
        assert_eq!(run_with_input(source, ""), "0");
    }

    #[test]
    fn missing_variable_loads_zero() {
        let code = vec![
            Instruction::with_arg(OpCode::Load, "ghost"),
            Instruction::with_arg(OpCode::Call, "printInt"),
        ];
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        vm.run(&mut stdin, &mut stdout).expect("vm run failed");
        assert_eq!(stdout, b"0");
    }

    #[test]
    fn top_level_statements_run_without_main() {
        let source = "int x = 6; printInt(x * 7);";
        assert_eq!(run(source), "42");
    }

    #[test]
    fn jump_to_unknown_label_is_fatal() {
        let code = vec![Instruction::with_arg(OpCode::Jmp, "nowhere")];
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let error = vm
            .run(&mut stdin, &mut stdout)
            .expect_err("expected unknown label failure");
        assert_eq!(error.to_string(), "unknown label for JMP: nowhere");
    }

    #[test]
    fn call_to_unknown_function_is_fatal() {
        let code = vec![Instruction::with_arg(OpCode::Call, "missing")];
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let error = vm
            .run(&mut stdin, &mut stdout)
            .expect_err("expected unknown function failure");
        assert_eq!(error.to_string(), "unknown function label: missing");
    }

    #[test]
    fn pop_on_empty_stack_is_fatal() {
        let code = vec![Instruction::new(OpCode::Pop)];
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let error = vm
            .run(&mut stdin, &mut stdout)
            .expect_err("expected stack underflow");
        assert_eq!(error.to_string(), "stack underflow");
    }

    #[test]
    fn push_string_strips_outer_quotes() {
        let code = vec![
            Instruction::with_arg(OpCode::PushString, "\"quoted\""),
            Instruction::with_arg(OpCode::Call, "printStr"),
        ];
        let mut vm = Vm::new(&code);
        let mut stdin = io::Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        vm.run(&mut stdin, &mut stdout).expect("vm run failed");
        assert_eq!(stdout, b"quoted");
    }
}
