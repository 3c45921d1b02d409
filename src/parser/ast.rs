//! Syntax tree shared by the semantic analyzer and the bytecode generator.
//!
//! The parser builds these nodes once; downstream stages walk them read-only.

/// Declared types of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Double,
    String,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Char => "char",
            Type::Double => "double",
            Type::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level items: functions or plain statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(Function),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_type: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub is_array: bool,
}

/// One declarator of a `VarDeclList`; `size` is present for the
/// `name[expr]` array form.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub is_array: bool,
    pub init: Option<Expr>,
    pub size: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    VarDeclList {
        ty: Type,
        decls: Vec<VarDecl>,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_ifs: Vec<ElseIf>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    /// All four parts are optional in the grammar except the body.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as raw text; a `.`/`e`/`E` in the text makes it
    /// a double literal.
    Number(String),
    Str(String),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Right-associative; the target must be an `Identifier` or `Index`.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Expr::Identifier(_) | Expr::Index { .. })
    }
}

/// Indented one-node-per-line tree dump, a diagnostic aid for the syntax
/// dump file.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    line(&mut out, 0, "Program");
    for item in &program.items {
        match item {
            Item::Function(function) => dump_function(&mut out, 1, function),
            Item::Stmt(stmt) => dump_stmt(&mut out, 1, stmt),
        }
    }
    out
}

fn line(out: &mut String, indent: usize, text: &str) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

fn dump_function(out: &mut String, indent: usize, function: &Function) {
    line(out, indent, &format!("Function: {}", function.name));
    line(out, indent + 1, &format!("Type: {}", function.ret_type.name()));
    for param in &function.params {
        let marker = if param.is_array { " [array]" } else { "" };
        line(
            out,
            indent + 1,
            &format!("FuncArg: {} ({}){marker}", param.name, param.ty.name()),
        );
    }
    dump_block(out, indent + 1, &function.body);
}

fn dump_block(out: &mut String, indent: usize, body: &[Stmt]) {
    line(out, indent, "Block");
    for stmt in body {
        dump_stmt(out, indent + 1, stmt);
    }
}

fn dump_stmt(out: &mut String, indent: usize, stmt: &Stmt) {
    match stmt {
        Stmt::Block(body) => dump_block(out, indent, body),
        Stmt::VarDeclList { ty, decls } => {
            line(out, indent, "VarDeclList");
            line(out, indent + 1, &format!("Type: {}", ty.name()));
            for decl in decls {
                let marker = if decl.is_array { " [array]" } else { "" };
                line(out, indent + 1, &format!("VarDecl: {}{marker}", decl.name));
                if let Some(init) = &decl.init {
                    dump_expr(out, indent + 2, init);
                }
                if let Some(size) = &decl.size {
                    dump_expr(out, indent + 2, size);
                }
            }
        }
        Stmt::If {
            cond,
            then_body,
            else_ifs,
            else_body,
        } => {
            line(out, indent, "If");
            dump_expr(out, indent + 1, cond);
            dump_block(out, indent + 1, then_body);
            for else_if in else_ifs {
                line(out, indent + 1, "ElseIf");
                dump_expr(out, indent + 2, &else_if.cond);
                dump_block(out, indent + 2, &else_if.body);
            }
            if let Some(else_body) = else_body {
                dump_block(out, indent + 1, else_body);
            }
        }
        Stmt::While { cond, body } => {
            line(out, indent, "While");
            dump_expr(out, indent + 1, cond);
            dump_block(out, indent + 1, body);
        }
        Stmt::DoWhile { body, cond } => {
            line(out, indent, "DoWhile");
            dump_block(out, indent + 1, body);
            dump_expr(out, indent + 1, cond);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            line(out, indent, "For");
            if let Some(init) = init {
                dump_stmt(out, indent + 1, init);
            }
            if let Some(cond) = cond {
                dump_expr(out, indent + 1, cond);
            }
            if let Some(step) = step {
                dump_expr(out, indent + 1, step);
            }
            dump_block(out, indent + 1, body);
        }
        Stmt::Return(value) => {
            line(out, indent, "Return");
            if let Some(value) = value {
                dump_expr(out, indent + 1, value);
            }
        }
        Stmt::Break => line(out, indent, "Break"),
        Stmt::Continue => line(out, indent, "Continue"),
        Stmt::Expr(expr) => {
            line(out, indent, "ExprStmt");
            dump_expr(out, indent + 1, expr);
        }
    }
}

fn dump_expr(out: &mut String, indent: usize, expr: &Expr) {
    match expr {
        Expr::Number(text) => line(out, indent, &format!("Number: {text}")),
        Expr::Str(text) => line(out, indent, &format!("String: {text}")),
        Expr::Identifier(name) => line(out, indent, &format!("Identifier: {name}")),
        Expr::Unary { op, operand } => {
            line(out, indent, &format!("Unary: {}", op.symbol()));
            dump_expr(out, indent + 1, operand);
        }
        Expr::Binary { op, left, right } => {
            line(out, indent, &format!("Binary: {}", op.symbol()));
            dump_expr(out, indent + 1, left);
            dump_expr(out, indent + 1, right);
        }
        Expr::Assign { target, value } => {
            line(out, indent, "Assign: =");
            dump_expr(out, indent + 1, target);
            dump_expr(out, indent + 1, value);
        }
        Expr::Comma { left, right } => {
            line(out, indent, "CommaExpr: ,");
            dump_expr(out, indent + 1, left);
            dump_expr(out, indent + 1, right);
        }
        Expr::Call { callee, args } => {
            line(out, indent, "Call");
            dump_expr(out, indent + 1, callee);
            for arg in args {
                dump_expr(out, indent + 1, arg);
            }
        }
        Expr::Index { base, index } => {
            line(out, indent, "Index");
            dump_expr(out, indent + 1, base);
            dump_expr(out, indent + 1, index);
        }
    }
}
