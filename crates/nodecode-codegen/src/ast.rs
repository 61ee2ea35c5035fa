//! Target-language syntax tree produced by the compiler.
//!
//! The tree models the TypeScript subset a board can express: function
//! declarations with typed parameters, `const` declarations, a single
//! `return`, and side-effect-free expressions. It carries no positions and no
//! node ids; it is what an external printer or emitter consumes.

use serde::{Deserialize, Serialize};

/// Every function compiled from one board.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<FunctionDecl>,
}

/// `function name(params): return_type { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    /// Local declarations in dependency order, followed by the return.
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `const name: ty = init;`
    Const {
        name: String,
        ty: Option<TypeAnnotation>,
        init: Expr,
    },
    /// `return value;`
    Return(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Parameter, local or function name.
    Ident(String),

    /// `left op right`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// `object.property`
    Member { object: Box<Expr>, property: String },

    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// Keyword types a node may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordType {
    Number,
    String,
    Boolean,
}

impl KeywordType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeywordType::Number => "number",
            KeywordType::String => "string",
            KeywordType::Boolean => "boolean",
        }
    }
}

/// A keyword type, optionally wrapped in an array type (`number[]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub keyword: KeywordType,
    pub array: bool,
}

/// Binary operators available on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,

    // Comparison
    Gt,
    Ge,
    Lt,
    Le,
    StrictEq,
    StrictNe,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Maps a stored operator token to an operator. `None` for unknown tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "**" => BinaryOp::Exp,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::StrictEq | BinaryOp::StrictNe => 3,
            BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
            BinaryOp::Exp => 7,
        }
    }

    /// `**` is the only right-associative operator.
    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Exp)
    }
}

// Builder methods for expressions
impl Expr {
    pub fn number(v: impl Into<f64>) -> Self {
        Expr::Literal(Literal::Number(v.into()))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(v.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }
}

/// Returns `true` if `name` can be written after a `.` in member access.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_tokens_roundtrip() {
        for token in [
            "+", "-", "*", "/", "%", "**", ">", ">=", "<", "<=", "===", "!==", "&&", "||",
        ] {
            let op = BinaryOp::from_token(token).unwrap();
            assert_eq!(op.token(), token);
        }
    }

    #[test]
    fn unknown_operator_token() {
        assert_eq!(BinaryOp::from_token("=="), None);
        assert_eq!(BinaryOp::from_token(""), None);
    }

    #[test]
    fn precedence_ordering() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() > BinaryOp::Lt.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
        assert!(BinaryOp::Exp.is_right_associative());
        assert!(!BinaryOp::Sub.is_right_associative());
    }

    #[test]
    fn identifier_names() {
        assert!(is_identifier_name("map"));
        assert!(is_identifier_name("_private"));
        assert!(is_identifier_name("$el2"));
        assert!(!is_identifier_name("2d"));
        assert!(!is_identifier_name("foo bar"));
        assert!(!is_identifier_name(""));
    }
}
