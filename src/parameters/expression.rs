//! Expression parsing and evaluation for derived parameters
//!
//! Formulas are a small closed grammar: numeric literals, parameter
//! references, unary negation, the binary operators `+ - * / ^` (with `**` as a
//! synonym for `^`), and calls to a fixed set of element-wise functions.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := ident '(' args? ')' | ident | number | '(' expr ')'
//! ```
//!
//! Addition and multiplication chains are left-associative, powers are
//! right-associative and bind tighter than negation, so `-x^2` is `-(x^2)`.

use crate::parameters::value::Value;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("Cannot broadcast operands of length {left} and {right}")]
    ShapeMismatch { left: usize, right: usize },
}

/// Result type for expression evaluation
pub type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (^)
    Pow,
}

/// How many arguments a built-in function accepts
#[derive(Debug, Clone, Copy, PartialEq)]
enum Arity {
    One,
    AtLeastTwo,
}

fn arity(name: &str) -> Option<Arity> {
    match name {
        "sin" | "cos" | "tan" | "exp" | "log" | "ln" | "log10" | "sqrt" | "abs" => {
            Some(Arity::One)
        }
        "min" | "max" => Some(Arity::AtLeastTwo),
        _ => None,
    }
}

fn check_arity(name: &str, count: usize) -> ExprResult<()> {
    let message = match arity(name) {
        None => {
            return Err(ExpressionError::UndefinedFunction {
                name: name.to_string(),
            })
        }
        Some(Arity::One) if count != 1 => format!("{name}() requires 1 argument, got {count}"),
        Some(Arity::AtLeastTwo) if count < 2 => {
            format!("{name}() requires at least 2 arguments, got {count}")
        }
        Some(_) => return Ok(()),
    };
    Err(ExpressionError::InvalidOperation { message })
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<&Value>;

    /// Check if a variable exists
    fn has_variable(&self, name: &str) -> bool;

    /// Get the names of all variables
    fn variable_names(&self) -> Vec<String>;
}

/// Simple implementation of EvaluationContext using a HashMap
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    /// Map of variable names to values
    variables: HashMap<String, Value>,
}

impl SimpleContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Set a variable value
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    /// Remove a variable
    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }
}

impl EvaluationContext for SimpleContext {
    fn get_variable(&self, name: &str) -> ExprResult<&Value> {
        self.variables.get_variable(name)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }
}

impl EvaluationContext for HashMap<String, Value> {
    fn get_variable(&self, name: &str) -> ExprResult<&Value> {
        self.get(name)
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// Input that nests deeper than [`MAX_NESTING`] levels of parentheses,
    /// negations and powers is rejected with a parse error.
    pub fn parse(input: &str) -> ExprResult<Self> {
        let depth = nesting_depth(input);
        if depth > MAX_NESTING {
            return Err(ExpressionError::ParseError {
                message: format!("expression nests {depth} levels deep, the limit is {MAX_NESTING}"),
            });
        }

        match expr_parser(input.trim()) {
            Ok((remainder, expr)) => {
                // Make sure the entire input was consumed
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<Value> {
        match self {
            Self::Number(n) => Ok(Value::Scalar(*n)),

            Self::Variable(name) => context.get_variable(name).cloned(),

            Self::Unary(UnaryOp::Neg, expr) => Ok(expr.evaluate(context)?.map(|x| -x)),

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                match op {
                    BinaryOp::Add => lhs.zip_with(&rhs, |a, b| a + b),
                    BinaryOp::Sub => lhs.zip_with(&rhs, |a, b| a - b),
                    BinaryOp::Mul => lhs.zip_with(&rhs, |a, b| a * b),
                    BinaryOp::Div => {
                        if rhs.contains_zero() {
                            Err(ExpressionError::DivisionByZero)
                        } else {
                            lhs.zip_with(&rhs, |a, b| a / b)
                        }
                    }
                    BinaryOp::Pow => lhs.zip_with(&rhs, f64::powf),
                }
            }

            Self::Function(name, args) => {
                check_arity(name, args.len())?;

                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(arg.evaluate(context)?);
                }

                match name.as_str() {
                    "min" | "max" => {
                        let pick: fn(f64, f64) -> f64 =
                            if name == "min" { f64::min } else { f64::max };
                        let mut iter = evaluated.into_iter();
                        let first = iter.next().ok_or_else(|| ExpressionError::InvalidOperation {
                            message: format!("{name}() called without arguments"),
                        })?;
                        iter.try_fold(first, |acc, v| acc.zip_with(&v, pick))
                    }
                    _ => {
                        let f: fn(f64) -> f64 = match name.as_str() {
                            "sin" => f64::sin,
                            "cos" => f64::cos,
                            "tan" => f64::tan,
                            "exp" => f64::exp,
                            "log" | "ln" => f64::ln,
                            "log10" => f64::log10,
                            "sqrt" => f64::sqrt,
                            _ => f64::abs,
                        };
                        Ok(evaluated[0].map(f))
                    }
                }
            }
        }
    }

    /// Check that every function call names a known function with a valid argument count
    pub fn check(&self) -> ExprResult<()> {
        match self {
            Self::Number(_) | Self::Variable(_) => Ok(()),
            Self::Unary(_, expr) => expr.check(),
            Self::Binary(_, left, right) => {
                left.check()?;
                right.check()
            }
            Self::Function(name, args) => {
                check_arity(name, args.len())?;
                args.iter().try_for_each(Expression::check)
            }
        }
    }

    /// Find all variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Recursively collect all variable names used in the expression
    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}

            Self::Variable(name) => {
                vars.push(name.clone());
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

/// A parsed formula together with its source text
///
/// Formulas serialize as their source text and are re-parsed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Formula {
    source: String,
    expr: Expression,
}

impl Formula {
    /// Parse a formula
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::Formula;
    ///
    /// let formula = Formula::parse("sin(A) + B * C").unwrap();
    /// let deps: Vec<_> = formula.dependencies().into_iter().collect();
    /// assert_eq!(deps, vec!["A", "B", "C"]);
    /// ```
    pub fn parse(source: &str) -> ExprResult<Self> {
        let expr = Expression::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expression {
        &self.expr
    }

    /// Distinct parameter names referenced by the formula
    pub fn dependencies(&self) -> BTreeSet<String> {
        self.expr.variables().into_iter().collect()
    }

    /// Evaluate the formula with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<Value> {
        self.expr.evaluate(context)
    }
}

impl TryFrom<String> for Formula {
    type Error = ExpressionError;

    fn try_from(source: String) -> ExprResult<Self> {
        Formula::parse(&source)
    }
}

impl From<Formula> for String {
    fn from(formula: Formula) -> Self {
        formula.source
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Deepest nesting accepted by [`Expression::parse`]
pub const MAX_NESTING: usize = 64;

/// Upper bound on the parser's recursion depth for `input`
///
/// Each open parenthesis adds a level. Inside one level, unary minus and
/// power operators nest until the next binary operator or comma.
fn nesting_depth(input: &str) -> usize {
    let mut chains: Vec<usize> = vec![0];
    let mut deepest = 0;
    let mut prev: Option<char> = None;
    let mut before_prev: Option<char> = None;
    let mut chars = input.chars().filter(|c| !c.is_whitespace()).peekable();

    while let Some(c) = chars.next() {
        // Sign of a literal exponent such as `1e-5`
        let exponent_sign = matches!(c, '+' | '-')
            && matches!(prev, Some('e' | 'E'))
            && before_prev.map_or(false, |p| p.is_ascii_digit() || p == '.');
        let unary_minus =
            c == '-' && matches!(prev, None | Some('(' | ',' | '+' | '-' | '*' | '/' | '^'));

        match c {
            _ if exponent_sign => {}
            '(' => chains.push(0),
            ')' if chains.len() > 1 => {
                chains.pop();
            }
            '^' => {
                if let Some(chain) = chains.last_mut() {
                    *chain += 1;
                }
            }
            '-' if unary_minus => {
                if let Some(chain) = chains.last_mut() {
                    *chain += 1;
                }
            }
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if let Some(chain) = chains.last_mut() {
                    *chain += 1;
                }
            }
            '+' | '-' | '*' | '/' | ',' => {
                if let Some(chain) = chains.last_mut() {
                    *chain = 0;
                }
            }
            _ => {}
        }

        before_prev = prev;
        prev = Some(c);
        deepest = deepest.max(chains.len() - 1 + chains.iter().sum::<usize>());
    }
    deepest
}

// Parser functions using nom

/// Parse a single-character operator surrounded by optional whitespace
fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    move |input: &'a str| delimited(multispace0, char(c), multispace0).parse(input)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .map(|matched: &str| matched.to_string())
    .parse(input)
}

/// Parse a comma-separated list of expressions (for function arguments)
fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (mut input, first) = expr_parser(input)?;
    let mut args = vec![first];

    while let Ok((after_comma, _)) = symbol(',')(input) {
        let (after_expr, expr) = expr_parser(after_comma)?;
        args.push(expr);
        input = after_expr;
    }

    Ok((input, args))
}

/// Parse a function call
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = symbol('(')(input)?;

    // Handle empty arguments case
    if let Ok((input, _)) = symbol(')')(input) {
        return Ok((input, Expression::Function(name, vec![])));
    }

    let (input, args) = args_list(input)?;
    let (input, _) = symbol(')')(input)?;

    Ok((input, Expression::Function(name, args)))
}

/// Parse a number
fn number(input: &str) -> IResult<&str, Expression> {
    let parsed: IResult<&str, f64> = double(input);
    let (input, num) = parsed?;
    Ok((input, Expression::Number(num)))
}

/// Parse a variable reference
fn variable(input: &str) -> IResult<&str, Expression> {
    let (input, var_name) = identifier(input)?;
    Ok((input, Expression::Variable(var_name)))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> IResult<&str, Expression> {
    let (input, _) = symbol('(')(input)?;
    let (input, expr) = expr_parser(input)?;
    let (input, _) = symbol(')')(input)?;
    Ok((input, expr))
}

/// Parse a primary expression (function call, variable, number, or parenthesized expression)
fn primary(input: &str) -> IResult<&str, Expression> {
    let skipped: IResult<&str, &str> = multispace0(input);
    let (input, _) = skipped?;

    // Identifiers are tried before numbers so names such as `inf_scale` are
    // never taken for the float literal `inf`
    if let Ok(result) = function_call(input) {
        return Ok(result);
    }

    if let Ok(result) = variable(input) {
        return Ok(result);
    }

    if let Ok(result) = number(input) {
        return Ok(result);
    }

    parens(input)
}

/// Parse the power operator, `^` or `**`
fn power_op(input: &str) -> IResult<&str, &str> {
    delimited(multispace0, alt((tag("**"), tag("^"))), multispace0).parse(input)
}

/// Parse a power expression (primary ^ unary)
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;

    match power_op(input) {
        Ok((after_op, _)) => {
            let (remaining, exponent) = unary(after_op)?;
            Ok((
                remaining,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(_) => Ok((input, base)),
    }
}

/// Parse a unary expression (-expr)
fn unary(input: &str) -> IResult<&str, Expression> {
    match symbol('-')(input) {
        Ok((remaining, _)) => {
            let (remaining, expr) = unary(remaining)?;
            Ok((remaining, Expression::Unary(UnaryOp::Neg, Box::new(expr))))
        }
        Err(_) => power(input),
    }
}

/// Parse a multiplicative chain (expr * expr, expr / expr)
fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = unary(input)?;

    loop {
        let op = if let Ok((rest, _)) = symbol('*')(input) {
            (rest, BinaryOp::Mul)
        } else if let Ok((rest, _)) = symbol('/')(input) {
            (rest, BinaryOp::Div)
        } else {
            return Ok((input, left));
        };

        let (remaining, right) = unary(op.0)?;
        left = Expression::Binary(op.1, Box::new(left), Box::new(right));
        input = remaining;
    }
}

/// Parse an additive chain (expr + expr, expr - expr)
fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = term(input)?;

    loop {
        let op = if let Ok((rest, _)) = symbol('+')(input) {
            (rest, BinaryOp::Add)
        } else if let Ok((rest, _)) = symbol('-')(input) {
            (rest, BinaryOp::Sub)
        } else {
            return Ok((input, left));
        };

        let (remaining, right) = term(op.0)?;
        left = Expression::Binary(op.1, Box::new(left), Box::new(right));
        input = remaining;
    }
}
