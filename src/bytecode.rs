use std::fmt;

use crate::ast::{BinaryOp, Expr, Function, Item, Program, Stmt, UnaryOp, VarDecl};

/// Closed opcode set of the linear stack instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    PushInt,
    PushDouble,
    PushString,

    Load,
    Store,

    LoadIndex,
    StoreIndex,
    NewArray,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Not,

    Jmp,
    Jz,

    Call,
    Ret,

    Pop,

    Label,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::PushInt => "PUSH_INT",
            OpCode::PushDouble => "PUSH_DOUBLE",
            OpCode::PushString => "PUSH_STRING",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::LoadIndex => "LOAD_INDEX",
            OpCode::StoreIndex => "STORE_INDEX",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Neg => "NEG",
            OpCode::Eq => "EQ",
            OpCode::Neq => "NEQ",
            OpCode::Lt => "LT",
            OpCode::Gt => "GT",
            OpCode::Le => "LE",
            OpCode::Ge => "GE",
            OpCode::Not => "NOT",
            OpCode::Jmp => "JMP",
            OpCode::Jz => "JZ",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Pop => "POP",
            OpCode::Label => "LABEL",
        }
    }
}

/// One instruction: an opcode plus a string argument carrying a label name,
/// a variable name, or a literal payload, interpreted by the opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub arg: String,
}

impl Instruction {
    pub fn new(op: OpCode) -> Self {
        Self {
            op,
            arg: String::new(),
        }
    }

    pub fn with_arg(op: OpCode, arg: impl Into<String>) -> Self {
        Self {
            op,
            arg: arg.into(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arg.is_empty() {
            write!(f, "{}", self.op.mnemonic())
        } else {
            write!(f, "{} {}", self.op.mnemonic(), self.arg)
        }
    }
}

/// Bytecode dump: one `<index>: <OPCODE> [<arg>]` line per instruction.
pub fn dump(code: &[Instruction]) -> String {
    let mut out = String::new();
    for (index, instruction) in code.iter().enumerate() {
        out.push_str(&format!("{index}: {instruction}\n"));
    }
    out
}

/// Lowers the AST to the flat instruction list.
///
/// Structured control is realized with fresh `L<n>` labels; nested loops
/// keep per-level stacks of break and continue targets.
pub struct Generator {
    code: Vec<Instruction>,
    label_counter: u32,
    break_labels: Vec<String>,
    continue_labels: Vec<String>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            label_counter: 0,
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
        }
    }

    pub fn generate(&mut self, program: &Program) -> Vec<Instruction> {
        self.code.clear();
        self.label_counter = 0;
        self.break_labels.clear();
        self.continue_labels.clear();

        for item in &program.items {
            match item {
                Item::Function(function) => self.gen_function(function),
                Item::Stmt(stmt) => self.gen_stmt(stmt),
            }
        }

        std::mem::take(&mut self.code)
    }

    fn new_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn emit(&mut self, op: OpCode) {
        self.code.push(Instruction::new(op));
    }

    fn emit_arg(&mut self, op: OpCode, arg: impl Into<String>) {
        self.code.push(Instruction::with_arg(op, arg));
    }

    fn gen_function(&mut self, function: &Function) {
        self.emit_arg(OpCode::Label, &function.name);

        // the caller pushed arguments left-to-right, so the top of stack
        // binds to the last parameter
        for param in function.params.iter().rev() {
            self.emit_arg(OpCode::Store, &param.name);
        }

        for stmt in &function.body {
            self.gen_stmt(stmt);
        }

        if self.code.last().map(|i| i.op) != Some(OpCode::Ret) {
            self.emit(OpCode::Ret);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(body) => {
                for stmt in body {
                    self.gen_stmt(stmt);
                }
            }
            Stmt::Expr(expr) => self.gen_expr_statement(expr),
            Stmt::VarDeclList { decls, .. } => {
                for decl in decls {
                    self.gen_var_decl(decl);
                }
            }
            Stmt::If {
                cond,
                then_body,
                else_ifs,
                else_body,
            } => self.gen_if(cond, then_body, else_ifs, else_body.as_deref()),
            Stmt::While { cond, body } => {
                let start = self.new_label();
                let end = self.new_label();

                self.break_labels.push(end.clone());
                self.continue_labels.push(start.clone());

                self.emit_arg(OpCode::Label, &start);
                self.gen_expr(cond);
                self.emit_arg(OpCode::Jz, &end);
                for stmt in body {
                    self.gen_stmt(stmt);
                }
                self.emit_arg(OpCode::Jmp, &start);
                self.emit_arg(OpCode::Label, &end);

                self.break_labels.pop();
                self.continue_labels.pop();
            }
            Stmt::DoWhile { body, cond } => {
                let start = self.new_label();
                let end = self.new_label();

                self.break_labels.push(end.clone());
                self.continue_labels.push(start.clone());

                self.emit_arg(OpCode::Label, &start);
                for stmt in body {
                    self.gen_stmt(stmt);
                }
                self.gen_expr(cond);
                self.emit_arg(OpCode::Jz, &end);
                self.emit_arg(OpCode::Jmp, &start);
                self.emit_arg(OpCode::Label, &end);

                self.break_labels.pop();
                self.continue_labels.pop();
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let start = self.new_label();
                let end = self.new_label();
                let step_label = self.new_label();

                self.break_labels.push(end.clone());
                self.continue_labels.push(step_label.clone());

                if let Some(init) = init {
                    self.gen_stmt(init);
                }

                self.emit_arg(OpCode::Label, &start);
                if let Some(cond) = cond {
                    self.gen_expr(cond);
                    self.emit_arg(OpCode::Jz, &end);
                }
                for stmt in body {
                    self.gen_stmt(stmt);
                }
                self.emit_arg(OpCode::Label, &step_label);
                if let Some(step) = step {
                    self.gen_expr_statement(step);
                }
                self.emit_arg(OpCode::Jmp, &start);
                self.emit_arg(OpCode::Label, &end);

                self.break_labels.pop();
                self.continue_labels.pop();
            }
            Stmt::Break => {
                // the semantic pass has already diagnosed a stray break
                if let Some(label) = self.break_labels.last().cloned() {
                    self.emit_arg(OpCode::Jmp, label);
                }
            }
            Stmt::Continue => {
                if let Some(label) = self.continue_labels.last().cloned() {
                    self.emit_arg(OpCode::Jmp, label);
                }
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.gen_expr(value);
                }
                self.emit(OpCode::Ret);
            }
        }
    }

    /// An expression in statement position; anything that leaves a value on
    /// the stack is popped, while `STORE`/built-in calls already leave none.
    fn gen_expr_statement(&mut self, expr: &Expr) {
        self.gen_expr(expr);
        if !matches!(expr, Expr::Call { .. } | Expr::Assign { .. }) {
            self.emit(OpCode::Pop);
        }
    }

    fn gen_var_decl(&mut self, decl: &VarDecl) {
        if decl.is_array {
            match &decl.size {
                Some(size) => self.gen_expr(size),
                None => self.emit_arg(OpCode::PushInt, "0"),
            }
            self.emit(OpCode::NewArray);
        } else {
            match &decl.init {
                Some(init) => self.gen_expr(init),
                None => self.emit_arg(OpCode::PushInt, "0"),
            }
        }
        self.emit_arg(OpCode::Store, &decl.name);
    }

    fn gen_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_ifs: &[crate::ast::ElseIf],
        else_body: Option<&[Stmt]>,
    ) {
        let end = self.new_label();
        let next = self.new_label();

        self.gen_expr(cond);
        self.emit_arg(OpCode::Jz, &next);
        for stmt in then_body {
            self.gen_stmt(stmt);
        }
        self.emit_arg(OpCode::Jmp, &end);
        self.emit_arg(OpCode::Label, &next);

        for else_if in else_ifs {
            let next = self.new_label();
            self.gen_expr(&else_if.cond);
            self.emit_arg(OpCode::Jz, &next);
            for stmt in &else_if.body {
                self.gen_stmt(stmt);
            }
            self.emit_arg(OpCode::Jmp, &end);
            self.emit_arg(OpCode::Label, &next);
        }

        if let Some(else_body) = else_body {
            for stmt in else_body {
                self.gen_stmt(stmt);
            }
        }

        self.emit_arg(OpCode::Label, &end);
    }

    fn gen_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(text) => {
                if text.contains(['.', 'e', 'E']) {
                    self.emit_arg(OpCode::PushDouble, text);
                } else {
                    self.emit_arg(OpCode::PushInt, text);
                }
            }
            Expr::Str(text) => self.emit_arg(OpCode::PushString, text),
            Expr::Identifier(name) => self.emit_arg(OpCode::Load, name),
            Expr::Unary { op, operand } => {
                self.gen_expr(operand);
                match op {
                    UnaryOp::Neg => self.emit(OpCode::Neg),
                    UnaryOp::Not => self.emit(OpCode::Not),
                    UnaryOp::Plus => {}
                }
            }
            Expr::Binary { op, left, right } => {
                self.gen_expr(left);
                self.gen_expr(right);
                self.emit(binary_opcode(*op));
            }
            Expr::Assign { target, value } => match &**target {
                Expr::Identifier(name) => {
                    let name = name.clone();
                    self.gen_expr(value);
                    self.emit_arg(OpCode::Store, name);
                }
                Expr::Index { base, index } => {
                    if let Expr::Identifier(name) = &**base {
                        let name = name.clone();
                        self.gen_expr(value);
                        self.gen_expr(index);
                        self.emit_arg(OpCode::StoreIndex, name);
                    } else {
                        // non-identifier base was diagnosed upstream; keep
                        // the stack balanced
                        self.gen_expr(value);
                        self.emit(OpCode::Pop);
                    }
                }
                _ => {
                    self.gen_expr(value);
                    self.emit(OpCode::Pop);
                }
            },
            Expr::Comma { left, right } => {
                // both results stay on the stack; the flattened list is the
                // caller's argument tuple
                self.gen_expr(left);
                self.gen_expr(right);
            }
            Expr::Call { callee, args } => {
                for arg in args {
                    self.gen_expr(arg);
                }
                if let Expr::Identifier(name) = &**callee {
                    let name = name.clone();
                    self.emit_arg(OpCode::Call, name);
                }
            }
            Expr::Index { base, index } => {
                self.gen_expr(base);
                self.gen_expr(index);
                self.emit(OpCode::LoadIndex);
            }
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Eq,
        BinaryOp::Neq => OpCode::Neq,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
    }
}

/// Lowers a checked program to bytecode.
pub fn generate(program: &Program) -> Vec<Instruction> {
    Generator::new().generate(program)
}
