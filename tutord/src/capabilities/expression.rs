//! A small arithmetic expression language shared by the math capabilities.
//!
//! Supports `+ - * / ^` (and `**`), parentheses, unary minus, implicit
//! multiplication (`2x`, `3(x + 1)`), the functions `sin cos tan sqrt log exp abs`,
//! the constants `pi` and `e`, and the variables `x` and `y`.

use thiserror::Error;

const MAX_DEPTH: usize = 64;
// Binary chains nest one node per operator, so the token count bounds tree depth
const MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Empty expression")]
    Empty,
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("Unknown name '{0}'")]
    UnknownName(String),
    #[error("Unexpected {0}")]
    UnexpectedToken(String),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Expression is nested too deeply")]
    TooDeep,
    #[error("Expression is too long")]
    TooLong,
    #[error("No value for variable '{0}'")]
    UnboundVariable(char),
    #[error("Division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Sin,
    Cos,
    Tan,
    Sqrt,
    Log,
    Exp,
    Abs,
}

impl Func {
    fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Sqrt => v.sqrt(),
            Func::Log => v.ln(),
            Func::Exp => v.exp(),
            Func::Abs => v.abs(),
        }
    }
}

// Longest names first so `exp` wins over `e`
const WORDS: &[(&str, Token)] = &[
    ("sqrt", Token::Func(Func::Sqrt)),
    ("sin", Token::Func(Func::Sin)),
    ("cos", Token::Func(Func::Cos)),
    ("tan", Token::Func(Func::Tan)),
    ("log", Token::Func(Func::Log)),
    ("exp", Token::Func(Func::Exp)),
    ("abs", Token::Func(Func::Abs)),
    ("pi", Token::Num(std::f64::consts::PI)),
    ("e", Token::Num(std::f64::consts::E)),
    ("x", Token::Var('x')),
    ("y", Token::Var('y')),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Var(char),
    Func(Func),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(n) => format!("number {}", n),
            Token::Var(v) => format!("variable {}", v),
            Token::Func(f) => format!("function {:?}", f).to_lowercase(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }

    /// Tokens that may start an operand, used for implicit multiplication
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Num(_) | Token::Var(_) | Token::Func(_) | Token::LParen
        )
    }
}

fn starts_with_word(chars: &[char], word: &str) -> bool {
    let mut rest = chars.iter();
    word.chars().all(|w| rest.next() == Some(&w))
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let lower = source.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if tokens.len() > MAX_TOKENS {
            return Err(ExprError::TooLong);
        }
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnknownName(text.clone()))?;
                tokens.push(Token::Num(value));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' | '−' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' | '×' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' | '÷' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_alphabetic() => {
                match WORDS
                    .iter()
                    .find(|(word, _)| starts_with_word(&chars[i..], word))
                {
                    Some((word, token)) => {
                        tokens.push(*token);
                        i += word.chars().count();
                    }
                    None => {
                        let name: String = chars[i..]
                            .iter()
                            .take_while(|c| c.is_alphabetic())
                            .collect();
                        return Err(ExprError::UnknownName(name));
                    }
                }
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong);
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var(char),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Pow(Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Node, ExprError> {
        self.descend()?;
        let mut node = self.term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.pos += 1;
                    node = Node::Add(Box::new(node), Box::new(self.term()?));
                }
                Token::Minus => {
                    self.pos += 1;
                    node = Node::Sub(Box::new(node), Box::new(self.term()?));
                }
                _ => break,
            }
        }
        self.depth -= 1;
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut node = self.unary()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.pos += 1;
                    node = Node::Mul(Box::new(node), Box::new(self.unary()?));
                }
                Token::Slash => {
                    self.pos += 1;
                    node = Node::Div(Box::new(node), Box::new(self.unary()?));
                }
                t if t.starts_operand() => {
                    node = Node::Mul(Box::new(node), Box::new(self.power()?));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let operand = self.unary()?;
                self.depth -= 1;
                Ok(Node::Neg(Box::new(operand)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let operand = self.unary()?;
                self.depth -= 1;
                Ok(operand)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(Node::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Node::Num(n)),
            Some(Token::Var(v)) => Ok(Node::Var(v)),
            Some(Token::Func(f)) => {
                self.descend()?;
                let argument = match self.peek() {
                    Some(Token::LParen) => self.primary()?,
                    // `sin x`, `sqrt 2`
                    _ => self.power()?,
                };
                self.depth -= 1;
                Ok(Node::Call(f, Box::new(argument)))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken(other.describe())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(other.describe())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Values for the free variables of an expression
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bindings {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl Bindings {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn x(x: f64) -> Self {
        Self {
            x: Some(x),
            y: None,
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// A parsed expression, evaluated as often as needed
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expression()?;
        if let Some(extra) = parser.peek() {
            return Err(ExprError::UnexpectedToken(extra.describe()));
        }
        Ok(Self { root })
    }

    /// Whether the variable `name` occurs anywhere in the expression
    pub fn uses(&self, name: char) -> bool {
        fn walk(node: &Node, name: char) -> bool {
            match node {
                Node::Num(_) => false,
                Node::Var(v) => *v == name,
                Node::Neg(a) | Node::Call(_, a) => walk(a, name),
                Node::Add(a, b)
                | Node::Sub(a, b)
                | Node::Mul(a, b)
                | Node::Div(a, b)
                | Node::Pow(a, b) => walk(a, name) || walk(b, name),
            }
        }
        walk(&self.root, name)
    }

    /// Evaluate with IEEE semantics, except that an exact zero divisor is an error
    pub fn eval(&self, bindings: Bindings) -> Result<f64, ExprError> {
        fn walk(node: &Node, b: Bindings) -> Result<f64, ExprError> {
            Ok(match node {
                Node::Num(n) => *n,
                Node::Var('x') => b.x.ok_or(ExprError::UnboundVariable('x'))?,
                Node::Var('y') => b.y.ok_or(ExprError::UnboundVariable('y'))?,
                Node::Var(other) => return Err(ExprError::UnboundVariable(*other)),
                Node::Neg(a) => -walk(a, b)?,
                Node::Add(l, r) => walk(l, b)? + walk(r, b)?,
                Node::Sub(l, r) => walk(l, b)? - walk(r, b)?,
                Node::Mul(l, r) => walk(l, b)? * walk(r, b)?,
                Node::Div(l, r) => {
                    let divisor = walk(r, b)?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    walk(l, b)? / divisor
                }
                Node::Pow(l, r) => walk(l, b)?.powf(walk(r, b)?),
                Node::Call(f, a) => f.apply(walk(a, b)?),
            })
        }
        walk(&self.root, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> f64 {
        Expression::parse(source)
            .unwrap()
            .eval(Bindings::none())
            .unwrap()
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("2 ** 3"), 8.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("2 ^ -1"), 0.5);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval("sqrt(16) + 2"), 6.0);
        assert!((eval("sin(pi / 2)") - 1.0).abs() < 1e-12);
        assert!((eval("log(e)") - 1.0).abs() < 1e-12);
        assert_eq!(eval("abs(-3)"), 3.0);
        assert_eq!(eval("exp(0)"), 1.0);
    }

    #[test]
    fn test_implicit_multiplication_and_variables() {
        let expr = Expression::parse("2x^2 + 3(x - 1)").unwrap();
        assert!(expr.uses('x'));
        assert!(!expr.uses('y'));
        assert_eq!(expr.eval(Bindings::x(2.0)).unwrap(), 11.0);

        let surface = Expression::parse("x^2 + y^2").unwrap();
        assert_eq!(surface.eval(Bindings::xy(3.0, 4.0)).unwrap(), 25.0);
        assert_eq!(
            surface.eval(Bindings::x(1.0)),
            Err(ExprError::UnboundVariable('y'))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(Expression::parse("   "), Err(ExprError::Empty));
        assert_eq!(Expression::parse("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            Expression::parse("2 + foo"),
            Err(ExprError::UnknownName(_))
        ));
        assert_eq!(Expression::parse("2 $ 3"), Err(ExprError::UnexpectedChar('$')));
        assert_eq!(
            Expression::parse("1 / (2 - 2)").unwrap().eval(Bindings::none()),
            Err(ExprError::DivisionByZero)
        );
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(Expression::parse(&deep), Err(ExprError::TooDeep));
    }

    #[test]
    fn test_long_flat_chain_is_rejected() {
        let long_sum = format!("{}1", "1+".repeat(10_000));
        assert_eq!(Expression::parse(&long_sum), Err(ExprError::TooLong));

        let long_product = format!("{}2", "2*".repeat(10_000));
        assert_eq!(Expression::parse(&long_product), Err(ExprError::TooLong));

        let within_limit = format!("{}1", "1+".repeat(200));
        assert_eq!(eval(&within_limit), 201.0);
    }

    #[test]
    fn test_names_after_long_prose() {
        let prose = format!("{}x", "e".repeat(5_000));
        assert_eq!(Expression::parse(&prose), Err(ExprError::TooLong));
        assert_eq!(eval("exp(0) + pi - pi"), 1.0);
        assert_eq!(
            Expression::parse("sinh(1)"),
            Err(ExprError::UnknownName("h".to_string()))
        );
    }
}
