use std::collections::BTreeMap;

use thiserror::Error;

use crate::ast::{BinaryOp, Expr, Function, Item, Program, Stmt, Type, VarDecl};
use crate::builtins::Builtin;

/// Types an expression can take during analysis. `Unknown` marks a
/// subexpression that already produced a diagnostic; it propagates without
/// triggering further errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Int,
    Char,
    Double,
    String,
    Void,
    Unknown,
}

impl TypeKind {
    fn is_numeric(self) -> bool {
        matches!(self, TypeKind::Int | TypeKind::Double)
    }
}

impl From<Type> for TypeKind {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Int => TypeKind::Int,
            Type::Char => TypeKind::Char,
            Type::Double => TypeKind::Double,
            Type::String => TypeKind::String,
        }
    }
}

/// One declared name: a variable or a function with its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeKind,
    pub is_array: bool,
    pub is_function: bool,
    pub param_types: Vec<TypeKind>,
    pub param_is_array: Vec<bool>,
}

impl Symbol {
    fn variable(name: impl Into<String>, ty: TypeKind, is_array: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array,
            is_function: false,
            param_types: Vec::new(),
            param_is_array: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    symbols: BTreeMap<String, Symbol>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Duplicate function: {0}")]
    DuplicateFunction(String),
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),
    #[error("Reserved name: {0}")]
    ReservedName(String),
    #[error("Undeclared variable: {0}")]
    UndeclaredVariable(String),
    #[error("Function used as value: {0}")]
    FunctionUsedAsValue(String),
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Assignment type mismatch")]
    AssignmentTypeMismatch,
    #[error("Initializer type mismatch")]
    InitializerTypeMismatch,
    #[error("Array size must be int")]
    ArraySizeNotInt,
    #[error("invalid operands to comparison operator")]
    InvalidComparisonOperands,
    #[error("invalid binary operation with string")]
    InvalidStringOperation,
    #[error("incompatible binary operand types")]
    IncompatibleOperands,
    #[error("Array index must be int")]
    IndexNotInt,
    #[error("Indexing non-array variable: {0}")]
    IndexingNonArray(String),
    #[error("Call target must be a function name")]
    CallTargetNotIdentifier,
    #[error("Call of non-function: {0}")]
    CallOfNonFunction(String),
    #[error("Call to undeclared function: {0}")]
    UndeclaredFunction(String),
    #[error("wrong number of arguments in call to {name} (expected {expected}, got {got})")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("argument {index} type mismatch in call to {name}")]
    ArgumentTypeMismatch { name: String, index: usize },
    #[error("{construct} condition must be int")]
    ConditionNotInt { construct: &'static str },
    #[error("break/continue outside loop")]
    BreakContinueOutsideLoop,
    #[error("return outside of function")]
    ReturnOutsideFunction,
    #[error("Return type mismatch")]
    ReturnTypeMismatch,
    #[error("Missing return value")]
    MissingReturnValue,
}

/// Scope- and type-checks a program in two passes: functions (and
/// built-ins) are predeclared in the global scope first, then every
/// function body and top-level statement is checked.
///
/// Analysis is best effort: errors accumulate and checking continues.
pub struct SemanticAnalyzer {
    scopes: Vec<Scope>,
    errors: Vec<SemanticError>,
    loop_depth: usize,
    current_return: Option<TypeKind>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            errors: Vec::new(),
            loop_depth: 0,
            current_return: None,
        }
    }

    pub fn analyze(mut self, program: &Program) -> Vec<SemanticError> {
        self.enter_scope();

        for builtin in Builtin::ALL {
            let symbol = Symbol {
                name: builtin.name().to_string(),
                ty: builtin.return_type(),
                is_array: false,
                is_function: true,
                param_types: builtin.param_types().to_vec(),
                param_is_array: vec![false; builtin.param_types().len()],
            };
            self.current_scope().symbols.insert(symbol.name.clone(), symbol);
        }

        // first pass: predeclare functions so calls may precede definitions
        for item in &program.items {
            if let Item::Function(function) = item {
                let symbol = Symbol {
                    name: function.name.clone(),
                    ty: function.ret_type.into(),
                    is_array: false,
                    is_function: true,
                    param_types: function.params.iter().map(|p| p.ty.into()).collect(),
                    param_is_array: function.params.iter().map(|p| p.is_array).collect(),
                };
                self.declare(symbol);
            }
        }

        // second pass
        for item in &program.items {
            match item {
                Item::Function(function) => self.check_function(function),
                Item::Stmt(stmt) => self.check_stmt(stmt),
            }
        }

        self.exit_scope();
        self.errors
    }

    // ---------------- scopes ----------------

    fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn current_scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("analysis keeps a scope open")
    }

    fn declare(&mut self, symbol: Symbol) {
        if is_reserved_label(&symbol.name) {
            self.errors.push(SemanticError::ReservedName(symbol.name.clone()));
        }
        if self.current_scope().symbols.contains_key(&symbol.name) {
            self.errors.push(if symbol.is_function {
                SemanticError::DuplicateFunction(symbol.name)
            } else {
                SemanticError::DuplicateVariable(symbol.name)
            });
            return;
        }
        self.current_scope()
            .symbols
            .insert(symbol.name.clone(), symbol);
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(name))
    }

    fn error(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    // ---------------- functions and statements ----------------

    fn check_function(&mut self, function: &Function) {
        self.current_return = Some(function.ret_type.into());
        self.enter_scope();

        for param in &function.params {
            self.declare(Symbol::variable(&param.name, param.ty.into(), param.is_array));
        }
        // the body block opens its own scope, so locals may shadow params
        self.check_block(&function.body);

        self.exit_scope();
        self.current_return = None;
    }

    fn check_block(&mut self, body: &[Stmt]) {
        self.enter_scope();
        for stmt in body {
            self.check_stmt(stmt);
        }
        self.exit_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(body) => self.check_block(body),
            Stmt::VarDeclList { ty, decls } => self.check_var_decl_list((*ty).into(), decls),
            Stmt::If {
                cond,
                then_body,
                else_ifs,
                else_body,
            } => {
                self.check_condition(cond, "If");
                self.check_block(then_body);
                for else_if in else_ifs {
                    self.check_condition(&else_if.cond, "If");
                    self.check_block(&else_if.body);
                }
                if let Some(else_body) = else_body {
                    self.check_block(else_body);
                }
            }
            Stmt::While { cond, body } => {
                self.check_condition(cond, "While");
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
            }
            Stmt::DoWhile { body, cond } => {
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.check_condition(cond, "Do-while");
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                // the for header opens a scope of its own
                self.enter_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_condition(cond, "For");
                }
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.exit_scope();
            }
            Stmt::Return(value) => self.check_return(value.as_ref()),
            Stmt::Break | Stmt::Continue => {
                if self.loop_depth == 0 {
                    self.error(SemanticError::BreakContinueOutsideLoop);
                }
            }
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_var_decl_list(&mut self, declared: TypeKind, decls: &[VarDecl]) {
        for decl in decls {
            self.declare(Symbol::variable(&decl.name, declared, decl.is_array));

            if let Some(size) = &decl.size {
                let size_type = self.check_expr(size);
                if size_type != TypeKind::Int && size_type != TypeKind::Unknown {
                    self.error(SemanticError::ArraySizeNotInt);
                }
            }

            if let Some(init) = &decl.init {
                let init_type = self.check_expr(init);
                if declared == TypeKind::Unknown || init_type == TypeKind::Unknown {
                    continue;
                }
                if !assignable(declared, init_type) {
                    self.error(SemanticError::InitializerTypeMismatch);
                }
            }
        }
    }

    fn check_condition(&mut self, cond: &Expr, construct: &'static str) {
        let ty = self.check_expr(cond);
        if ty != TypeKind::Int && ty != TypeKind::Unknown {
            self.error(SemanticError::ConditionNotInt { construct });
        }
    }

    fn check_return(&mut self, value: Option<&Expr>) {
        let Some(expected) = self.current_return else {
            self.error(SemanticError::ReturnOutsideFunction);
            return;
        };
        match value {
            Some(expr) => {
                let ty = self.check_expr(expr);
                if ty == TypeKind::Unknown || expected == TypeKind::Unknown {
                    return;
                }
                if !assignable(expected, ty) {
                    self.error(SemanticError::ReturnTypeMismatch);
                }
            }
            None => {
                if expected != TypeKind::Void {
                    self.error(SemanticError::MissingReturnValue);
                }
            }
        }
    }

    // ---------------- expressions ----------------

    fn check_expr(&mut self, expr: &Expr) -> TypeKind {
        match expr {
            Expr::Number(text) => number_literal_type(text),
            Expr::Str(_) => TypeKind::String,
            Expr::Identifier(name) => {
                let symbol = self.lookup(name).map(|s| (s.ty, s.is_function));
                match symbol {
                    Some((ty, is_function)) => {
                        if is_function {
                            self.error(SemanticError::FunctionUsedAsValue(name.clone()));
                        }
                        ty
                    }
                    None => {
                        self.error(SemanticError::UndeclaredVariable(name.clone()));
                        TypeKind::Unknown
                    }
                }
            }
            Expr::Unary { operand, .. } => self.check_expr(operand),
            Expr::Comma { left, right } => {
                self.check_expr(left);
                self.check_expr(right)
            }
            Expr::Assign { target, value } => self.check_assign(target, value),
            Expr::Binary { op, left, right } => self.check_binary(*op, left, right),
            Expr::Index { base, index } => self.check_index(base, index),
            Expr::Call { callee, args } => self.check_call(callee, args),
        }
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr) -> TypeKind {
        if !target.is_lvalue() {
            self.error(SemanticError::InvalidAssignmentTarget);
        }

        let target_type = self.check_expr(target);
        let value_type = self.check_expr(value);

        if target_type != TypeKind::Unknown
            && value_type != TypeKind::Unknown
            && !assignable(target_type, value_type)
        {
            self.error(SemanticError::AssignmentTypeMismatch);
        }
        target_type
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> TypeKind {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);

        if lt == TypeKind::Unknown || rt == TypeKind::Unknown {
            return TypeKind::Unknown;
        }

        if op.is_comparison() {
            if lt.is_numeric() && rt.is_numeric() {
                return TypeKind::Int;
            }
            if lt == TypeKind::String
                && rt == TypeKind::String
                && matches!(op, BinaryOp::Eq | BinaryOp::Neq)
            {
                return TypeKind::Int;
            }
            self.error(SemanticError::InvalidComparisonOperands);
            return TypeKind::Unknown;
        }

        if lt == TypeKind::String || rt == TypeKind::String {
            if op == BinaryOp::Add && lt == TypeKind::String && rt == TypeKind::String {
                return TypeKind::String;
            }
            self.error(SemanticError::InvalidStringOperation);
            return TypeKind::Unknown;
        }

        if lt.is_numeric() && rt.is_numeric() {
            if lt == TypeKind::Double || rt == TypeKind::Double {
                return TypeKind::Double;
            }
            return TypeKind::Int;
        }

        self.error(SemanticError::IncompatibleOperands);
        TypeKind::Unknown
    }

    fn check_index(&mut self, base: &Expr, index: &Expr) -> TypeKind {
        let base_type = self.check_expr(base);
        let index_type = self.check_expr(index);

        if index_type != TypeKind::Int && index_type != TypeKind::Unknown {
            self.error(SemanticError::IndexNotInt);
        }

        if let Expr::Identifier(name) = base {
            let indexes_non_array = self.lookup(name).is_some_and(|s| !s.is_array);
            if indexes_non_array {
                self.error(SemanticError::IndexingNonArray(name.clone()));
            }
        }

        base_type
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr]) -> TypeKind {
        let Expr::Identifier(name) = callee else {
            self.error(SemanticError::CallTargetNotIdentifier);
            return TypeKind::Unknown;
        };

        let Some(symbol) = self.lookup(name).cloned() else {
            self.error(SemanticError::UndeclaredFunction(name.clone()));
            return TypeKind::Unknown;
        };
        if !symbol.is_function {
            self.error(SemanticError::CallOfNonFunction(name.clone()));
        }

        let mut flat = Vec::new();
        for arg in args {
            collect_args(arg, &mut flat);
        }

        if flat.len() != symbol.param_types.len() {
            self.error(SemanticError::ArgumentCountMismatch {
                name: name.clone(),
                expected: symbol.param_types.len(),
                got: flat.len(),
            });
        }

        for (i, arg) in flat.iter().enumerate() {
            let arg_type = self.check_expr(arg);
            if let Some(&param_type) = symbol.param_types.get(i)
                && arg_type != TypeKind::Unknown
                && !assignable(param_type, arg_type)
            {
                self.error(SemanticError::ArgumentTypeMismatch {
                    name: name.clone(),
                    index: i + 1,
                });
            }
        }

        symbol.ty
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyzes a program and returns its accumulated diagnostics.
pub fn analyze(program: &Program) -> Vec<SemanticError> {
    SemanticAnalyzer::new().analyze(program)
}

/// A value of type `from` may be bound to a slot of type `to` when the types
/// match or when an implicit `int → double` widening applies.
fn assignable(to: TypeKind, from: TypeKind) -> bool {
    to == from || (to == TypeKind::Double && from == TypeKind::Int)
}

/// Numeric literals are `double` iff their text carries a fraction or
/// exponent marker, otherwise `int`.
fn number_literal_type(text: &str) -> TypeKind {
    if text.contains(['.', 'e', 'E']) {
        TypeKind::Double
    } else {
        TypeKind::Int
    }
}

/// Flattens a comma-expression tree into the plain argument list,
/// left-to-right.
fn collect_args<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let Expr::Comma { left, right } = expr {
        collect_args(left, out);
        collect_args(right, out);
        return;
    }
    out.push(expr);
}

/// Generated jump labels use the `L<digits>` shape, so user declarations may
/// not take it.
fn is_reserved_label(name: &str) -> bool {
    let Some(rest) = name.strip_prefix('L') else {
        return false;
    };
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};
    use indoc::indoc;

    fn analyze_source(source: &str) -> Vec<SemanticError> {
        let (program, errors) = parser::parse_tokens(lexer::tokenize(source));
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        analyze(&program)
    }

    #[test]
    fn accepts_well_typed_program() {
        let source = indoc! {"
            fn int add(int a, int b) { return a + b; }
            fn int main() {
                int s = 0;
                for (int i = 1; i <= 5; i = i + 1) { s = s + add(s, i); }
                printInt(s);
                return 0;
            }
        "};
        assert_eq!(analyze_source(source), vec![]);
    }

    #[test]
    fn rejects_assignment_type_mismatch() {
        let errors =
            analyze_source("fn int main() { int x = 1; string y = \"a\"; x = y; return 0; }");
        assert_eq!(errors, vec![SemanticError::AssignmentTypeMismatch]);
        assert!(errors[0].to_string().contains("Assignment type mismatch"));
    }

    #[test]
    fn allows_int_to_double_widening() {
        let source = indoc! {"
            fn double half(double x) { return x / 2.0; }
            fn int main() {
                double d = 1;
                d = 3;
                printDouble(half(7));
                return 0;
            }
        "};
        assert_eq!(analyze_source(source), vec![]);
    }

    #[test]
    fn rejects_double_to_int_narrowing() {
        let errors = analyze_source("fn int main() { int x = 1; x = 2.5; return 0; }");
        assert_eq!(errors, vec![SemanticError::AssignmentTypeMismatch]);
    }

    #[test]
    fn rejects_duplicate_variable_in_same_scope() {
        let errors = analyze_source("fn int main() { int x; int x; return 0; }");
        assert_eq!(
            errors,
            vec![SemanticError::DuplicateVariable("x".to_string())]
        );
    }

    #[test]
    fn allows_shadowing_in_inner_scope() {
        let errors = analyze_source("fn int main() { int x = 1; { int x = 2; } return x; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn local_may_shadow_parameter() {
        let errors = analyze_source("fn int f(int x) { int x = 2; return x; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn rejects_duplicate_function() {
        let errors = analyze_source("fn int f() { return 1; } fn int f() { return 2; }");
        assert_eq!(
            errors,
            vec![SemanticError::DuplicateFunction("f".to_string())]
        );
    }

    #[test]
    fn rejects_undeclared_variable_once() {
        let errors = analyze_source("fn int main() { y = 1; return 0; }");
        // the unknown lhs suppresses a cascading assignment mismatch
        assert_eq!(
            errors,
            vec![SemanticError::UndeclaredVariable("y".to_string())]
        );
    }

    #[test]
    fn calls_may_precede_definitions() {
        let source = indoc! {"
            fn int main() { return twice(21); }
            fn int twice(int x) { return x * 2; }
        "};
        assert_eq!(analyze_source(source), vec![]);
    }

    #[test]
    fn rejects_function_used_as_value() {
        let errors = analyze_source("fn int f() { return 1; } fn int main() { int x = f; return 0; }");
        assert!(errors.contains(&SemanticError::FunctionUsedAsValue("f".to_string())));
    }

    #[test]
    fn rejects_argument_count_mismatch() {
        let errors =
            analyze_source("fn int f(int a, int b) { return a; } fn int main() { return f(1); }");
        assert_eq!(
            errors,
            vec![SemanticError::ArgumentCountMismatch {
                name: "f".to_string(),
                expected: 2,
                got: 1,
            }]
        );
    }

    #[test]
    fn rejects_argument_type_mismatch() {
        let errors = analyze_source(
            "fn int f(string s) { return 0; } fn int main() { return f(1); }",
        );
        assert_eq!(
            errors,
            vec![SemanticError::ArgumentTypeMismatch {
                name: "f".to_string(),
                index: 1,
            }]
        );
    }

    #[test]
    fn int_argument_widens_to_double_parameter() {
        let errors = analyze_source(
            "fn double f(double d) { return d; } fn int main() { printDouble(f(3)); return 0; }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn comma_arguments_flatten_in_order() {
        let errors = analyze_source(
            "fn int f(int a, int b, int c) { return b; } fn int main() { return f(1, 2, 3); }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn condition_must_be_int() {
        let errors = analyze_source("fn int main() { if (1.5) { } return 0; }");
        assert_eq!(
            errors,
            vec![SemanticError::ConditionNotInt { construct: "If" }]
        );
        let errors = analyze_source("fn int main() { while (\"s\") { } return 0; }");
        assert_eq!(
            errors,
            vec![SemanticError::ConditionNotInt { construct: "While" }]
        );
    }

    #[test]
    fn comparison_yields_int_condition() {
        let errors = analyze_source("fn int main() { double d = 0.5; if (d < 1.0) { } return 0; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn string_equality_is_allowed() {
        let errors = analyze_source(
            "fn int main() { string a = \"x\"; if (a == \"x\") { printStr(a); } return 0; }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn string_arithmetic_other_than_concat_is_rejected() {
        let errors = analyze_source("fn int main() { string s = \"a\" - \"b\"; return 0; }");
        assert_eq!(errors, vec![SemanticError::InvalidStringOperation]);
        let errors = analyze_source("fn int main() { string s = \"a\" + 1; return 0; }");
        assert_eq!(errors, vec![SemanticError::InvalidStringOperation]);
    }

    #[test]
    fn string_concat_yields_string() {
        let errors =
            analyze_source("fn int main() { string s = \"a\" + \"b\"; printStr(s); return 0; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn char_is_not_numeric() {
        let errors = analyze_source("fn int main() { char c; int x = c + 1; return 0; }");
        assert_eq!(errors, vec![SemanticError::IncompatibleOperands]);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let errors = analyze_source("fn int main() { break; return 0; }");
        assert_eq!(errors, vec![SemanticError::BreakContinueOutsideLoop]);
    }

    #[test]
    fn continue_inside_do_while_is_allowed() {
        let errors =
            analyze_source("fn int main() { int i = 0; do { i = i + 1; continue; } while (i < 3); return 0; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let errors = analyze_source("return 1;");
        assert_eq!(errors, vec![SemanticError::ReturnOutsideFunction]);
    }

    #[test]
    fn bare_return_in_valued_function_is_rejected() {
        let errors = analyze_source("fn int main() { return; }");
        assert_eq!(errors, vec![SemanticError::MissingReturnValue]);
    }

    #[test]
    fn return_widens_int_to_double() {
        let errors = analyze_source("fn double f() { return 1; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn return_type_mismatch_is_rejected() {
        let errors = analyze_source("fn int f() { return \"s\"; }");
        assert_eq!(errors, vec![SemanticError::ReturnTypeMismatch]);
    }

    #[test]
    fn indexing_requires_array_and_int_index() {
        let errors = analyze_source("fn int main() { int x; int y = x[0]; return 0; }");
        assert_eq!(
            errors,
            vec![SemanticError::IndexingNonArray("x".to_string())]
        );
        let errors = analyze_source("fn int main() { int a[3]; int y = a[1.5]; return 0; }");
        assert_eq!(errors, vec![SemanticError::IndexNotInt]);
    }

    #[test]
    fn array_size_must_be_int() {
        let errors = analyze_source("fn int main() { int a[1.5]; return 0; }");
        assert_eq!(errors, vec![SemanticError::ArraySizeNotInt]);
    }

    #[test]
    fn for_header_declaration_is_scoped_to_the_loop() {
        let source = indoc! {"
            fn int main() {
                for (int i = 0; i < 3; i = i + 1) { }
                for (int i = 0; i < 3; i = i + 1) { }
                return 0;
            }
        "};
        assert_eq!(analyze_source(source), vec![]);
    }

    #[test]
    fn reserved_label_names_are_rejected() {
        let errors = analyze_source("fn int main() { int L0 = 1; return L0; }");
        assert!(errors.contains(&SemanticError::ReservedName("L0".to_string())));
        let errors = analyze_source("fn int L12() { return 1; } fn int main() { return L12(); }");
        assert!(errors.contains(&SemanticError::ReservedName("L12".to_string())));
        // 'L' alone and 'Lx1' are ordinary identifiers
        let errors = analyze_source("fn int main() { int L = 1; int Lx1 = 2; return L + Lx1; }");
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn unknown_types_do_not_cascade() {
        let errors = analyze_source("fn int main() { int x = y + 1; x = x + y; return 0; }");
        assert_eq!(
            errors,
            vec![
                SemanticError::UndeclaredVariable("y".to_string()),
                SemanticError::UndeclaredVariable("y".to_string()),
            ]
        );
    }

    #[test]
    fn builtins_are_predeclared() {
        let errors = analyze_source(
            "fn int main() { printInt(inputInt()); printStr(inputStr()); printDouble(inputDouble()); return 0; }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn builtin_argument_types_are_checked() {
        let errors = analyze_source("fn int main() { printInt(\"s\"); return 0; }");
        assert_eq!(
            errors,
            vec![SemanticError::ArgumentTypeMismatch {
                name: "printInt".to_string(),
                index: 1,
            }]
        );
    }
}
