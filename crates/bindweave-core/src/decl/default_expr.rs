//! Default-value expressions.
//!
//! Defaults are kept as expressions, never as pre-computed values: a default
//! that constructs a fresh object must produce a fresh object on every call
//! that omits the argument. [`DefaultExpr::render`] re-embeds the expression
//! into emitted glue code; [`DefaultExpr::evaluate`] evaluates it once per
//! call inside the in-memory host.

use serde::{Deserialize, Serialize};

use crate::TypeRef;
use crate::error::DispatchError;
use crate::runtime::{Dynamic, ValueFactory};

/// A default-value expression attached to a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultExpr {
    /// Literal token: `2.0`, `0`, `true`, `"text"`.
    Literal(String),
    /// Value-initialized instance of a type: `T {}`.
    Construct(TypeRef),
    /// Freshly allocated shared instance: `std::make_shared<T>()`.
    MakeShared(TypeRef),
    /// Arbitrary constant expression text, e.g. `(DIM - DIM)`.
    Expr(String),
}

impl DefaultExpr {
    /// Render as native construction code.
    pub fn render(&self) -> String {
        match self {
            DefaultExpr::Literal(text) | DefaultExpr::Expr(text) => text.clone(),
            DefaultExpr::Construct(ty) => format!("{} {{}}", ty),
            DefaultExpr::MakeShared(ty) => format!("std::make_shared<{}>()", ty),
        }
    }

    /// Whether evaluation allocates a new object.
    pub fn constructs(&self) -> bool {
        matches!(self, DefaultExpr::Construct(_) | DefaultExpr::MakeShared(_))
    }

    /// Evaluate the expression for one call.
    pub fn evaluate(&self, factory: &dyn ValueFactory) -> Result<Dynamic, DispatchError> {
        match self {
            DefaultExpr::Literal(text) => parse_literal(text.trim()).ok_or_else(|| {
                DispatchError::InvalidDefault {
                    expr: text.clone(),
                }
            }),
            DefaultExpr::Construct(ty) | DefaultExpr::MakeShared(ty) => Ok(factory.construct(ty)),
            DefaultExpr::Expr(text) => {
                ConstEval::new(text)
                    .evaluate()
                    .ok_or_else(|| DispatchError::InvalidDefault { expr: text.clone() })
            }
        }
    }
}

fn parse_literal(text: &str) -> Option<Dynamic> {
    match text {
        "true" => return Some(Dynamic::Bool(true)),
        "false" => return Some(Dynamic::Bool(false)),
        "nullptr" => return Some(Dynamic::Void),
        _ => {}
    }
    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Some(Dynamic::String(inner.to_string()));
    }
    let numeric = text.trim_end_matches(['u', 'U', 'l', 'L', 'f', 'F']);
    if let Ok(value) = numeric.parse::<i64>() {
        return Some(Dynamic::Int(value));
    }
    numeric.parse::<f64>().ok().map(Dynamic::Float)
}

/// Tiny evaluator for constant arithmetic defaults (`+ - *`, parentheses).
struct ConstEval {
    tokens: Vec<String>,
    pos: usize,
}

impl ConstEval {
    fn new(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            if matches!(ch, '(' | ')' | '+' | '-' | '*') {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(ch.to_string());
            } else if ch.is_whitespace() {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            } else {
                current.push(ch);
            }
        }
        if !current.trim().is_empty() {
            tokens.push(current.trim().to_string());
        }
        Self { tokens, pos: 0 }
    }

    fn evaluate(mut self) -> Option<Dynamic> {
        let value = self.sum()?;
        (self.pos == self.tokens.len()).then_some(value)
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn sum(&mut self) -> Option<Dynamic> {
        let mut acc = self.product()?;
        while let Some(op) = self.peek().filter(|t| *t == "+" || *t == "-") {
            let add = op == "+";
            self.pos += 1;
            let rhs = self.product()?;
            acc = if add {
                arith(&acc, &rhs, i64::checked_add, |a, b| a + b)?
            } else {
                arith(&acc, &rhs, i64::checked_sub, |a, b| a - b)?
            };
        }
        Some(acc)
    }

    fn product(&mut self) -> Option<Dynamic> {
        let mut acc = self.atom()?;
        while self.peek() == Some("*") {
            self.pos += 1;
            let rhs = self.atom()?;
            acc = arith(&acc, &rhs, i64::checked_mul, |a, b| a * b)?;
        }
        Some(acc)
    }

    fn atom(&mut self) -> Option<Dynamic> {
        let token = self.peek()?.to_string();
        self.pos += 1;
        match token.as_str() {
            "(" => {
                let inner = self.sum()?;
                (self.peek() == Some(")")).then(|| {
                    self.pos += 1;
                    inner
                })
            }
            "-" => match self.atom()? {
                Dynamic::Int(v) => v.checked_neg().map(Dynamic::Int),
                Dynamic::Float(v) => Some(Dynamic::Float(-v)),
                _ => None,
            },
            literal => parse_literal(literal),
        }
    }
}

fn arith(
    lhs: &Dynamic,
    rhs: &Dynamic,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Option<Dynamic> {
    match (lhs, rhs) {
        (Dynamic::Int(a), Dynamic::Int(b)) => int_op(*a, *b).map(Dynamic::Int),
        (Dynamic::Float(a), Dynamic::Float(b)) => Some(Dynamic::Float(float_op(*a, *b))),
        (Dynamic::Int(a), Dynamic::Float(b)) => Some(Dynamic::Float(float_op(*a as f64, *b))),
        (Dynamic::Float(a), Dynamic::Int(b)) => Some(Dynamic::Float(float_op(*a, *b as f64))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ObjectRef;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter(AtomicU64);

    impl ValueFactory for Counter {
        fn construct(&self, ty: &TypeRef) -> Dynamic {
            Dynamic::Object(ObjectRef {
                type_name: ty.to_string(),
                id: self.0.fetch_add(1, Ordering::Relaxed),
            })
        }
    }

    #[test]
    fn render_forms() {
        let ty = TypeRef::parse("Point<3>").unwrap();
        assert_eq!(DefaultExpr::Literal("2.0".into()).render(), "2.0");
        assert_eq!(DefaultExpr::Construct(ty.clone()).render(), "Point<3> {}");
        assert_eq!(
            DefaultExpr::MakeShared(ty).render(),
            "std::make_shared<Point<3>>()"
        );
    }

    #[test]
    fn literals_evaluate() {
        let f = Counter(AtomicU64::new(0));
        assert_eq!(
            DefaultExpr::Literal("2.0".into()).evaluate(&f).unwrap(),
            Dynamic::Float(2.0)
        );
        assert_eq!(
            DefaultExpr::Literal("0u".into()).evaluate(&f).unwrap(),
            Dynamic::Int(0)
        );
        assert_eq!(
            DefaultExpr::Literal("true".into()).evaluate(&f).unwrap(),
            Dynamic::Bool(true)
        );
    }

    #[test]
    fn constant_expression_evaluates() {
        let f = Counter(AtomicU64::new(0));
        let value = DefaultExpr::Expr("(3 - 3)".into()).evaluate(&f).unwrap();
        assert_eq!(value, Dynamic::Int(0));
        let value = DefaultExpr::Expr("2 * (1 + 0.5)".into()).evaluate(&f).unwrap();
        assert_eq!(value, Dynamic::Float(3.0));
    }

    #[test]
    fn unbound_identifier_is_invalid() {
        let f = Counter(AtomicU64::new(0));
        let err = DefaultExpr::Expr("(DIM - DIM)".into()).evaluate(&f).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidDefault { .. }));
    }

    #[test]
    fn integer_overflow_is_invalid() {
        let f = Counter(AtomicU64::new(0));
        for text in [
            "9223372036854775807 * 2",
            "9223372036854775807 + 1",
            "(0 - 9223372036854775807) - 2",
            "-(0 - 9223372036854775807 - 1)",
        ] {
            let err = DefaultExpr::Expr(text.into()).evaluate(&f).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidDefault { .. }), "{text}");
        }
    }

    #[test]
    fn construction_is_fresh_each_time() {
        let f = Counter(AtomicU64::new(0));
        let expr = DefaultExpr::MakeShared(TypeRef::parse("Point<3>").unwrap());
        let a = expr.evaluate(&f).unwrap();
        let b = expr.evaluate(&f).unwrap();
        assert_ne!(a, b);
    }
}
