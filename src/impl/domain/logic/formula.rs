use fractic_server_error::ServerError;

use crate::errors::InvalidFormula;

/// Safe evaluator for user-authored fee formulas.
///
/// Formulas are plain arithmetic expressions over two variables: `x` (the
/// absolute payment amount) and `y` (the user's overall payment frequency).
///
/// Supported syntax: numeric literals, `+ - * /`, `^` for exponentiation,
/// unary `+`/`-`, parentheses, and the functions `abs`, `sqrt`, `log`,
/// `sin`, `cos` (one argument) and `min`, `max` (two or more arguments).
/// Division by zero evaluates to 0. Anything else is rejected at parse
/// time, so a formula can never execute arbitrary code.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Variable {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Function {
    Abs,
    Min,
    Max,
    Sqrt,
    Log,
    Sin,
    Cos,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Variable(Variable),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

/// Evaluates `expression` with the given variable bindings. Fails if the
/// expression does not parse or the result is not finite.
pub(crate) fn evaluate_formula(expression: &str, x: f64, y: f64) -> Result<f64, ServerError> {
    let expr = parse(expression)?;
    let value = expr.evaluate(x, y);
    if !value.is_finite() {
        return Err(InvalidFormula::new("evaluation produced a non-finite value"));
    }
    Ok(value)
}

/// Returns true if `expression` is syntactically valid and evaluates to a
/// finite value at representative inputs. Intended for plan-configuration
/// workflows, before a formula is stored.
pub fn validate_formula(expression: &str) -> bool {
    evaluate_formula(expression, 1.0, 0.5).is_ok()
}

impl Expr {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Variable(Variable::X) => x,
            Expr::Variable(Variable::Y) => y,
            Expr::Negate(inner) => -inner.evaluate(x, y),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(x, y);
                let rhs = rhs.evaluate(x, y);
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    // Division by zero yields 0 rather than failing the
                    // whole computation.
                    BinaryOp::Div => {
                        if rhs == 0.0 {
                            0.0
                        } else {
                            lhs / rhs
                        }
                    }
                    BinaryOp::Pow => lhs.powf(rhs),
                }
            }
            Expr::Call(function, args) => {
                let args: Vec<f64> = args.iter().map(|a| a.evaluate(x, y)).collect();
                match function {
                    Function::Abs => args[0].abs(),
                    Function::Sqrt => args[0].sqrt(),
                    Function::Log => args[0].ln(),
                    Function::Sin => args[0].sin(),
                    Function::Cos => args[0].cos(),
                    Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
                    Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            }
        }
    }
}

// Parsing.
// ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    OpenParen,
    CloseParen,
    Comma,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ServerError> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::OpenParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::CloseParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|e| InvalidFormula::with_debug("invalid numeric literal", &e))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => {
                return Err(InvalidFormula::with_debug("unexpected character", &c));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

fn parse(expression: &str) -> Result<Expr, ServerError> {
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        position: 0,
    };
    let expr = parser.expression()?;
    if parser.peek().is_some() {
        return Err(InvalidFormula::new("trailing input after expression"));
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<(), ServerError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            _ => Err(InvalidFormula::new(context)),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ServerError> {
        let mut expr = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ServerError> {
        let mut expr = self.unary()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<Expr, ServerError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Negate(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := atom ('^' unary)?   (right-associative)
    fn power(&mut self) -> Result<Expr, ServerError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    // atom := number | variable | function '(' args ')' | '(' expression ')'
    fn atom(&mut self) -> Result<Expr, ServerError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::OpenParen) => {
                let expr = self.expression()?;
                self.expect(Token::CloseParen, "expected closing parenthesis")?;
                Ok(expr)
            }
            Some(Token::Ident(ident)) => match ident.as_str() {
                "x" => Ok(Expr::Variable(Variable::X)),
                "y" => Ok(Expr::Variable(Variable::Y)),
                name => {
                    let function = function_by_name(name)?;
                    self.expect(Token::OpenParen, "expected '(' after function name")?;
                    let args = self.arguments()?;
                    check_arity(function, args.len())?;
                    Ok(Expr::Call(function, args))
                }
            },
            _ => Err(InvalidFormula::new("expected a value")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ServerError> {
        let mut args = vec![self.expression()?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            args.push(self.expression()?);
        }
        self.expect(Token::CloseParen, "expected closing parenthesis")?;
        Ok(args)
    }
}

fn function_by_name(name: &str) -> Result<Function, ServerError> {
    match name {
        "abs" => Ok(Function::Abs),
        "min" => Ok(Function::Min),
        "max" => Ok(Function::Max),
        "sqrt" => Ok(Function::Sqrt),
        "log" => Ok(Function::Log),
        "sin" => Ok(Function::Sin),
        "cos" => Ok(Function::Cos),
        _ => Err(InvalidFormula::with_debug(
            "unknown variable or function",
            &name,
        )),
    }
}

fn check_arity(function: Function, arg_count: usize) -> Result<(), ServerError> {
    let valid = match function {
        Function::Min | Function::Max => arg_count >= 2,
        _ => arg_count == 1,
    };
    if !valid {
        return Err(InvalidFormula::new("wrong number of function arguments"));
    }
    Ok(())
}
