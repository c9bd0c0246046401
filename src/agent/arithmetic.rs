//! Local evaluation of plain integer arithmetic such as `2 + 3*4`.
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

fn pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]+(\s*[+\-*/]\s*[0-9]+)+$").ok())
        .as_ref()
}

/// Whether the trimmed query is digits joined by `+ - * /` and nothing else.
pub fn is_arithmetic(query: &str) -> bool {
    pattern().is_some_and(|pattern| pattern.is_match(query.trim()))
}

/// Evaluate `query` if it is arithmetic. `*` and `/` bind tighter than `+`
/// and `-`; operators of equal precedence apply left to right; division
/// truncates toward zero.
pub fn evaluate(query: &str) -> Option<Result<i64, ArithmeticError>> {
    if !is_arithmetic(query) {
        return None;
    }
    Some(evaluate_tokens(&tokenize(query.trim())))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(String),
    Operator(char),
}

fn tokenize(expression: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut digits = String::new();
    for ch in expression.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if !digits.is_empty() {
            tokens.push(Token::Number(std::mem::take(&mut digits)));
        }
        if matches!(ch, '+' | '-' | '*' | '/') {
            tokens.push(Token::Operator(ch));
        }
    }
    if !digits.is_empty() {
        tokens.push(Token::Number(digits));
    }
    tokens
}

fn number(token: Option<&Token>) -> Result<i64, ArithmeticError> {
    match token {
        Some(Token::Number(digits)) => digits.parse().map_err(|_| ArithmeticError::Overflow),
        _ => Err(ArithmeticError::Overflow),
    }
}

fn evaluate_tokens(tokens: &[Token]) -> Result<i64, ArithmeticError> {
    let mut iter = tokens.iter();
    let mut total: i64 = 0;
    let mut pending = '+';
    let mut term = number(iter.next())?;

    while let Some(token) = iter.next() {
        let Token::Operator(op) = token else {
            return Err(ArithmeticError::Overflow);
        };
        let operand = number(iter.next())?;
        match op {
            '*' => term = term.checked_mul(operand).ok_or(ArithmeticError::Overflow)?,
            '/' => {
                if operand == 0 {
                    return Err(ArithmeticError::DivisionByZero);
                }
                term = term.checked_div(operand).ok_or(ArithmeticError::Overflow)?;
            }
            _ => {
                total = combine(total, pending, term)?;
                pending = *op;
                term = operand;
            }
        }
    }

    combine(total, pending, term)
}

fn combine(total: i64, op: char, term: i64) -> Result<i64, ArithmeticError> {
    let value = if op == '-' {
        total.checked_sub(term)
    } else {
        total.checked_add(term)
    };
    value.ok_or(ArithmeticError::Overflow)
}
