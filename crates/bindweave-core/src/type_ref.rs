//! Structured native type references.
//!
//! Signatures in the declaration model are written the way they appear in
//! native source (`"::std::vector<std::shared_ptr<Point<DIM>>> const &"`).
//! [`TypeRef::parse`] turns that text into a small tree so generic
//! parameters can be substituted structurally, and [`fmt::Display`] renders
//! it back in the form the emitted glue code expects.
//!
//! # Examples
//!
//! ```
//! use bindweave_core::TypeRef;
//!
//! let ty = TypeRef::parse("::Node<DIM> const &").unwrap();
//! assert_eq!(ty.path, "::Node");
//! assert!(ty.is_const);
//! assert_eq!(ty.to_string(), "::Node<DIM> const &");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference/pointer decoration on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Indirection {
    /// Plain value.
    #[default]
    None,
    /// `T &`
    Reference,
    /// `T *`
    Pointer,
}

/// A parsed native type reference.
///
/// Template arguments are themselves `TypeRef`s; integral template values
/// such as the `2` in `Node<2>` are stored as a path with no arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    /// Qualified path, possibly multi-word (`unsigned int`, `::std::vector`).
    pub path: String,
    /// Template arguments.
    pub args: Vec<TypeRef>,
    /// `const` qualified.
    pub is_const: bool,
    /// Reference or pointer decoration.
    pub indirection: Indirection,
}

/// Error produced when a type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    /// Input ended where a type name was expected.
    #[error("expected a type name in '{input}' at offset {offset}")]
    ExpectedType { input: String, offset: usize },

    /// A character that cannot appear in a type reference.
    #[error("unexpected '{ch}' in '{input}' at offset {offset}")]
    UnexpectedChar {
        ch: char,
        input: String,
        offset: usize,
    },

    /// `<` without a matching `>`.
    #[error("unterminated template argument list in '{input}'")]
    UnterminatedArgs { input: String },
}

impl TypeRef {
    /// Create an unqualified type with no template arguments.
    pub fn named(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            is_const: false,
            indirection: Indirection::None,
        }
    }

    /// The `void` type.
    pub fn void() -> Self {
        Self::named("void")
    }

    /// Parse a type reference from native source text.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = TypeParser::new(input);
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if let Some(ch) = parser.peek() {
            return Err(TypeParseError::UnexpectedChar {
                ch,
                input: input.to_string(),
                offset: parser.pos,
            });
        }
        Ok(ty)
    }

    // === Builder Methods ===

    /// Add a template argument.
    pub fn with_arg(mut self, arg: TypeRef) -> Self {
        self.args.push(arg);
        self
    }

    /// Mark as `const`.
    pub fn as_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Mark as a reference.
    pub fn as_reference(mut self) -> Self {
        self.indirection = Indirection::Reference;
        self
    }

    /// Mark as a pointer.
    pub fn as_pointer(mut self) -> Self {
        self.indirection = Indirection::Pointer;
        self
    }

    // === Queries ===

    /// Check for `void` (undecorated).
    pub fn is_void(&self) -> bool {
        self.path == "void" && self.args.is_empty() && self.indirection == Indirection::None
    }

    /// Check for a reference type.
    pub fn is_reference(&self) -> bool {
        self.indirection == Indirection::Reference
    }

    /// Check for a pointer type.
    pub fn is_pointer(&self) -> bool {
        self.indirection == Indirection::Pointer
    }

    /// Check whether this is a bare identifier (no args, no decoration).
    pub fn is_bare(&self) -> bool {
        self.args.is_empty() && !self.is_const && self.indirection == Indirection::None
    }

    /// The type with top-level `const` and indirection removed.
    pub fn unqualified(&self) -> TypeRef {
        TypeRef {
            path: self.path.clone(),
            args: self.args.clone(),
            is_const: false,
            indirection: Indirection::None,
        }
    }

    /// The form this type takes in the dynamic runtime's dispatch model.
    ///
    /// Qualifiers and indirection vanish, every integral type collapses to
    /// `int`, every floating point type to `float`, and smart pointers erase
    /// to their pointee. Two overloads whose parameters erase identically
    /// cannot be told apart by a dynamic caller.
    pub fn erased(&self) -> String {
        let path = self.path.trim_start_matches("::");
        if let Some(kind) = erased_primitive(path) {
            return kind.to_string();
        }
        if is_smart_pointer(path) && self.args.len() == 1 {
            return self.args[0].erased();
        }
        if self.args.is_empty() {
            return path.to_string();
        }
        let args: Vec<String> = self.args.iter().map(TypeRef::erased).collect();
        format!("{}<{}>", path, args.join(","))
    }
}

fn erased_primitive(path: &str) -> Option<&'static str> {
    match path {
        "int" | "unsigned" | "unsigned int" | "signed" | "signed int" | "short"
        | "unsigned short" | "long" | "unsigned long" | "long long"
        | "unsigned long long" | "size_t" | "std::size_t" | "int8_t" | "int16_t"
        | "int32_t" | "int64_t" | "uint8_t" | "uint16_t" | "uint32_t" | "uint64_t"
        | "std::int32_t" | "std::int64_t" | "std::uint32_t" | "std::uint64_t" => Some("int"),
        "float" | "double" | "long double" => Some("float"),
        "bool" => Some("bool"),
        "std::string" | "string" => Some("str"),
        _ => None,
    }
}

fn is_smart_pointer(path: &str) -> bool {
    matches!(
        path,
        "std::shared_ptr" | "std::unique_ptr" | "boost::shared_ptr"
    )
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        if self.is_const {
            f.write_str(" const")?;
        }
        match self.indirection {
            Indirection::None => Ok(()),
            Indirection::Reference => f.write_str(" &"),
            Indirection::Pointer => f.write_str(" *"),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

// ============================================================================
// Parser
// ============================================================================

struct TypeParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, ch: char) -> TypeParseError {
        TypeParseError::UnexpectedChar {
            ch,
            input: self.input.to_string(),
            offset: self.pos,
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut is_const = false;
        let mut words: Vec<String> = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '-' => {
                    let word = self.read_word();
                    if word == "const" {
                        is_const = true;
                    } else {
                        words.push(word);
                    }
                }
                _ => break,
            }
        }

        if words.is_empty() {
            return Err(TypeParseError::ExpectedType {
                input: self.input.to_string(),
                offset: self.pos,
            });
        }

        let mut ty = TypeRef::named(words.join(" "));

        if self.peek() == Some('<') {
            self.bump();
            loop {
                ty.args.push(self.parse_type()?);
                self.skip_ws();
                match self.bump() {
                    Some(',') => continue,
                    Some('>') => break,
                    Some(ch) => return Err(self.unexpected(ch)),
                    None => {
                        return Err(TypeParseError::UnterminatedArgs {
                            input: self.input.to_string(),
                        });
                    }
                }
            }
        }

        loop {
            self.skip_ws();
            match self.peek() {
                Some('&') => {
                    self.bump();
                    ty.indirection = Indirection::Reference;
                }
                Some('*') => {
                    self.bump();
                    ty.indirection = Indirection::Pointer;
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    let start = self.pos;
                    let word = self.read_word();
                    if word != "const" {
                        self.pos = start;
                        return Err(self.unexpected(c));
                    }
                    is_const = true;
                }
                _ => break,
            }
        }

        ty.is_const = is_const;
        Ok(ty)
    }
}
