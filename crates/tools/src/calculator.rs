//! Calculator tool.
//!
//! Evaluates arithmetic expressions with `+`, `-`, `*`, `/`, `%`, `^`,
//! parentheses, and unary negation. Recursive-descent parser; `^` binds
//! tighter than `*`/`/` and is right-associative.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::tool::{Tool, ToolResult};

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Supports +, -, *, /, % (remainder), ^ (power), parentheses, and decimal numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(2 + 3) ^ 2 / 5'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let expression = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;

        match evaluate(expression) {
            Ok(value) => {
                let rendered = if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", value as i64)
                } else {
                    format!("{value}")
                };
                Ok(ToolResult::ok(
                    rendered,
                    Some(serde_json::json!({"expression": expression, "result": value})),
                ))
            }
            Err(reason) => Ok(ToolResult::error(format!(
                "Cannot evaluate '{expression}': {reason}"
            ))),
        }
    }
}

/// Evaluate an expression string to a number.
pub fn evaluate(input: &str) -> Result<f64, String> {
    let mut cursor = Cursor::new(input);
    let value = cursor.sum()?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(format!("trailing input at byte {}", cursor.pos));
    }
    Ok(value)
}

/// Character cursor over the expression, parsing as it scans.
///
/// Grammar:
///   sum     = product (('+' | '-') product)*
///   product = power (('*' | '/' | '%') power)*
///   power   = atom ('^' power)?
///   atom    = '-' atom | NUMBER | '(' sum ')'
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Peek the next non-whitespace byte without consuming it.
    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut acc = self.product()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.bump();
                    acc += self.product()?;
                }
                Some(b'-') => {
                    self.bump();
                    acc -= self.product()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn product(&mut self) -> Result<f64, String> {
        let mut acc = self.power()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.bump();
                    acc *= self.power()?;
                }
                Some(b'/') => {
                    self.bump();
                    let divisor = self.power()?;
                    if divisor == 0.0 {
                        return Err("division by zero".into());
                    }
                    acc /= divisor;
                }
                Some(b'%') => {
                    self.bump();
                    let divisor = self.power()?;
                    if divisor == 0.0 {
                        return Err("remainder by zero".into());
                    }
                    acc %= divisor;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.atom()?;
        if self.peek() == Some(b'^') {
            self.bump();
            let exponent = self.power()?;
            let value = base.powf(exponent);
            if !value.is_finite() {
                return Err(format!("{base} ^ {exponent} is not a finite number"));
            }
            return Ok(value);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(b'-') => {
                self.bump();
                Ok(-self.atom()?)
            }
            Some(b'(') => {
                self.bump();
                let value = self.sum()?;
                if self.peek() != Some(b')') {
                    return Err("expected closing parenthesis".into());
                }
                self.bump();
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_digit() || self.bytes[self.pos] == b'.')
        {
            self.pos += 1;
        }
        let literal = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        literal
            .parse()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}
