/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! AST definitions for card formulas with precise source spans.
//!
//! The parser creates this AST first. The compiler then type-checks it and
//! lowers it into the slot-based IR held by [`crate::ExecutableUnit`].

use nom_locate::LocatedSpan;

/// Parser input span type carrying byte offsets and line/column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a span that starts at `self` and ends at `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

/// Declared type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    /// `double`, `float` or `decimal`.
    Double,
    /// `int` or `long`.
    Int,
    /// `string`.
    String,
    /// `bool`.
    Bool,
}

impl TypeName {
    /// Source keyword used in diagnostics.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeName::Double => "double",
            TypeName::Int => "int",
            TypeName::String => "string",
            TypeName::Bool => "bool",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (`-`).
    Neg,
    /// Identity (`+`).
    Plus,
    /// Logical not (`!`).
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition or string concatenation (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Remainder (`%`).
    Rem,
    /// Equality (`==`).
    Eq,
    /// Inequality (`!=`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
    /// Short-circuit and (`&&`).
    And,
    /// Short-circuit or (`||`).
    Or,
}

impl BinOp {
    /// Source token used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Floating-point literal (`1.5`, `2d`, `1e3`).
    Number(f64),
    /// Integer literal.
    Integer(i64),
    /// String literal with escapes already processed.
    Text(String),
    /// `true` / `false`.
    Bool(bool),
    /// Identifier reference, possibly dotted (`area`, `Math.PI`).
    Ident(String),
    /// Unary operation.
    Unary {
        /// Operator kind.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator kind.
        op: BinOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Explicit conversion (`(int)x`).
    Cast {
        /// Target type.
        ty: TypeName,
        /// Converted expression.
        operand: Box<Expr>,
    },
    /// Conditional expression (`c ? a : b`).
    Conditional {
        /// Condition.
        cond: Box<Expr>,
        /// Value when the condition holds.
        then_value: Box<Expr>,
        /// Value otherwise.
        else_value: Box<Expr>,
    },
    /// Function call; `name` may be dotted (`Math.Pow`).
    Call {
        /// Callee name.
        name: String,
        /// Call arguments.
        args: Vec<Expr>,
    },
}

/// Spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression payload.
    pub kind: ExprKind,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// One declarator of a local declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// Declared type; `None` for `var`.
    pub ty: Option<TypeName>,
    /// Whether the declaration is `const`.
    pub is_const: bool,
    /// Symbol name.
    pub name: String,
    /// Optional initializer expression.
    pub init: Option<Expr>,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
    /// `%=`
    Rem,
}

impl AssignOp {
    /// Arithmetic operator applied by a compound assignment.
    pub fn binary_op(self) -> Option<BinOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
            AssignOp::Rem => Some(BinOp::Rem),
        }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local declaration with one or more declarators.
    Let(Vec<Decl>),
    /// Assignment to a named local, parameter or output.
    Assign {
        /// Target name.
        target: String,
        /// Target location.
        target_span: SourceSpan,
        /// Plain or compound operator.
        op: AssignOp,
        /// Assigned expression.
        value: Expr,
    },
    /// `if (cond) then [else otherwise]`.
    If {
        /// Condition.
        cond: Expr,
        /// Statement run when the condition holds.
        then_branch: Box<Stmt>,
        /// Optional `else` statement.
        else_branch: Option<Box<Stmt>>,
    },
    /// `{ ... }`.
    Block(Vec<Stmt>),
    /// `return [expr];`.
    Return(Option<Expr>),
    /// `throw new Exception([message]);`.
    Throw {
        /// Exception type name as written.
        exception: String,
        /// Optional message expression.
        message: Option<Expr>,
    },
    /// Expression evaluated for its effect (`Helper(x);`).
    Expr(Expr),
}

/// Spanned statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement payload.
    pub kind: StmtKind,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// Parameter passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// Value parameter.
    In,
    /// `out` parameter.
    Out,
}

/// Method parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Passing mode.
    pub mode: ParamMode,
    /// Parameter type.
    pub ty: TypeName,
    /// Parameter name.
    pub name: String,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// Method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Return type; `None` for `void`.
    pub return_ty: Option<TypeName>,
    /// Typed parameter list.
    pub params: Vec<Param>,
    /// Body statements.
    pub body: Vec<Stmt>,
    /// Source location for diagnostics (header through closing brace).
    pub span: SourceSpan,
}

/// Class definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name.
    pub name: String,
    /// Whether the class was declared `abstract`.
    pub is_abstract: bool,
    /// Member methods.
    pub methods: Vec<Method>,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// Full parsed formula source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// `using` directives (ignored by the compiler).
    pub usings: Vec<String>,
    /// Top-level classes.
    pub classes: Vec<ClassDef>,
    /// Top-level methods (wrapped in an implicit class).
    pub methods: Vec<Method>,
    /// Bare statements (wrapped in an implicit `Calculate` method).
    pub statements: Vec<Stmt>,
}
