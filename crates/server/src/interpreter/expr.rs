use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{name} takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format_number(*n),
            Token::Ident(name) => name.clone(),
            Token::Op(c) => c.to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => tokens.push(Token::Number(read_number(&mut chars)?)),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || c == '_') {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token::Ident(name));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Result<f64, EvalError> {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        if !(c.is_ascii_digit() || c == '.') {
            break;
        }
        text.push(c);
        chars.next();
    }
    text.parse::<f64>().map_err(|_| EvalError::UnexpectedToken(text))
}

/// Recursive-descent evaluator over a flat token list.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/' | '%') unary)*
/// unary   := ('-' | '+') unary | power
/// power   := primary ('^' unary)?
/// primary := number | name | name '(' args ')' | '(' expr ')'
/// ```
struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    vars: &'a BTreeMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(EvalError::UnexpectedToken(token.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(EvalError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let args = self.args()?;
                    return call(&name, &args);
                }
                self.lookup(&name)
            }
            Some(token) => Err(EvalError::UnexpectedToken(token.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn args(&mut self) -> Result<Vec<f64>, EvalError> {
        let mut args = Vec::new();
        if let Some(Token::RParen) = self.peek() {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(EvalError::UnexpectedToken(token.describe())),
                None => return Err(EvalError::UnexpectedEnd),
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<f64, EvalError> {
        if let Some(value) = self.vars.get(name) {
            return Ok(*value);
        }
        match name {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            _ => Err(EvalError::UnknownVariable(name.to_string())),
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let unary: Option<fn(f64) -> f64> = match name {
        "sqrt" => Some(f64::sqrt),
        "abs" => Some(f64::abs),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        _ => None,
    };

    if let Some(f) = unary {
        return match args {
            [x] => Ok(f(*x)),
            _ => Err(arity(name, 1, args.len())),
        };
    }

    match (name, args) {
        ("min", [a, b]) => Ok(a.min(*b)),
        ("max", [a, b]) => Ok(a.max(*b)),
        ("min" | "max", _) => Err(arity(name, 2, args.len())),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn arity(name: &str, expected: usize, found: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected,
        found,
    }
}

/// Evaluates `source` against `vars`. Names shadow the built-in constants.
pub fn evaluate(source: &str, vars: &BTreeMap<String, f64>) -> Result<f64, EvalError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(EvalError::UnexpectedEnd);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        vars,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(EvalError::UnexpectedToken(token.describe()));
    }
    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

/// Integral values print without a fraction; others with up to six
/// decimals and trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.0}");
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        return "0".to_string();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<f64, EvalError> {
        evaluate(source, &BTreeMap::new())
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(eval("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(eval("2 ^ -1").unwrap(), 0.5);
        assert_eq!(eval("7 % 4").unwrap(), 3.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval("sqrt(16) + abs(-2)").unwrap(), 6.0);
        assert_eq!(eval("max(3, min(10, 7))").unwrap(), 7.0);
        assert_eq!(eval("floor(2.7) + ceil(0.2)").unwrap(), 3.0);
        assert!((eval("cos(pi)").unwrap() + 1.0).abs() < 1e-12);
        assert!((eval("e").unwrap() - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_variables_shadow_constants() {
        let mut vars = BTreeMap::new();
        vars.insert("x".to_string(), 4.0);
        vars.insert("e".to_string(), 1.0);
        assert_eq!(evaluate("x * 2 + e", &vars).unwrap(), 9.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("5 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("y + 1"), Err(EvalError::UnknownVariable("y".into())));
        assert_eq!(eval("foo(1)"), Err(EvalError::UnknownFunction("foo".into())));
        assert_eq!(eval("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("1 + 2)"), Err(EvalError::UnexpectedToken(")".into())));
        assert_eq!(eval("3 $ 4"), Err(EvalError::UnexpectedChar('$')));
        assert_eq!(eval("sqrt(-1)"), Err(EvalError::NotFinite));
        assert!(matches!(eval("min(1)"), Err(EvalError::Arity { expected: 2, found: 1, .. })));
        assert!(matches!(eval("1..2"), Err(EvalError::UnexpectedToken(_))));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e-9), "0");
    }
}
