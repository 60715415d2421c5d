use super::error::SelectionError;
use super::lexer::{Span, Token, TokenKind, tokenize};
use std::fmt;
use std::iter::Peekable;
use std::vec::IntoIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
        })
    }
}

/// Parsed selection expression. `and`/`or` share one precedence and associate left.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    All,
    None,
    Model {
        model: String,
        kind: String,
        options: Vec<String>,
        span: Span,
    },
    Not {
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

const KEYWORDS: [&str; 5] = ["and", "or", "not", "all", "none"];

fn is_keyword(token: &Token) -> bool {
    KEYWORDS.iter().any(|k| token.is_word(k))
}

/// Parses a selection; blank input is `none`.
pub fn parse(input: &str) -> Result<Expr, SelectionError> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Ok(Expr::None);
    }
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        last: None,
    };
    let expr = parser.expr()?;
    match parser.tokens.next() {
        None => Ok(expr),
        Some(token) if token.kind == TokenKind::RParen => {
            Err(SelectionError::UnbalancedParenthesis { span: token.span })
        }
        Some(token) => Err(SelectionError::UnexpectedToken {
            token: token.text().to_string(),
            span: token.span,
        }),
    }
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    last: Option<Token>,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.next()?;
        self.last = Some(token.clone());
        Some(token)
    }

    fn unexpected_end(&self) -> SelectionError {
        let (after, span) = self
            .last
            .as_ref()
            .map(|t| (t.text().to_string(), t.span))
            .unwrap_or_default();
        SelectionError::UnexpectedEnd { after, span }
    }

    fn peek_op(&mut self) -> Option<LogicOp> {
        let token = self.tokens.peek()?;
        if token.is_word("and") {
            Some(LogicOp::And)
        } else if token.is_word("or") {
            Some(LogicOp::Or)
        } else {
            None
        }
    }

    fn expr(&mut self) -> Result<Expr, SelectionError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek_op() {
            self.next();
            let rhs = self.term()?;
            let span = expr_span(&lhs).join(expr_span(&rhs));
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, SelectionError> {
        if self.tokens.peek().is_some_and(|t| t.is_word("not")) {
            let not = self.next().map(|t| t.span).unwrap_or_default();
            let inner = self.term()?;
            let span = not.join(expr_span(&inner));
            return Ok(Expr::Not {
                expr: Box::new(inner),
                span,
            });
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, SelectionError> {
        let token = self.next().ok_or_else(|| self.unexpected_end())?;
        match &token.kind {
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(t) if t.kind == TokenKind::RParen => Ok(inner),
                    Some(t) => Err(SelectionError::UnexpectedToken {
                        token: t.text().to_string(),
                        span: t.span,
                    }),
                    None => Err(SelectionError::UnbalancedParenthesis { span: token.span }),
                }
            }
            TokenKind::RParen => Err(SelectionError::UnbalancedParenthesis { span: token.span }),
            TokenKind::Word(w) if w == "all" => Ok(Expr::All),
            TokenKind::Word(w) if w == "none" => Ok(Expr::None),
            TokenKind::Word(_) if is_keyword(&token) => Err(SelectionError::UnexpectedToken {
                token: token.text().to_string(),
                span: token.span,
            }),
            TokenKind::Word(model) => self.model_atom(model.clone(), token.span),
        }
    }

    fn model_atom(&mut self, model: String, start: Span) -> Result<Expr, SelectionError> {
        let has_kind = self
            .tokens
            .peek()
            .is_some_and(|t| matches!(t.kind, TokenKind::Word(_)) && !is_keyword(t));
        if !has_kind {
            return Err(SelectionError::MissingKind { model, span: start });
        }
        let kind = self.next().map(|t| t.text().to_string()).unwrap_or_default();
        let mut span = self.last.as_ref().map_or(start, |t| start.join(t.span));

        let mut options = Vec::new();
        while let Some(t) = self.tokens.peek() {
            let is_option =
                matches!(t.kind, TokenKind::Word(_)) && !t.is_word("and") && !t.is_word("or");
            if !is_option {
                break;
            }
            if let Some(t) = self.next() {
                span = span.join(t.span);
                options.push(t.text().to_string());
            }
        }

        Ok(Expr::Model {
            model,
            kind,
            options,
            span,
        })
    }
}

/// Source span of an expression; `all` and `none` carry none.
pub fn expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::All | Expr::None => Span::default(),
        Expr::Model { span, .. } | Expr::Not { span, .. } | Expr::Binary { span, .. } => *span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(model: &str, kind: &str, options: &[&str]) -> Expr {
        Expr::Model {
            model: model.to_string(),
            kind: kind.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            span: Span::default(),
        }
    }

    fn strip(expr: Expr) -> Expr {
        match expr {
            Expr::Model {
                model,
                kind,
                options,
                ..
            } => Expr::Model {
                model,
                kind,
                options,
                span: Span::default(),
            },
            Expr::Not { expr, .. } => Expr::Not {
                expr: Box::new(strip(*expr)),
                span: Span::default(),
            },
            Expr::Binary { op, lhs, rhs, .. } => Expr::Binary {
                op,
                lhs: Box::new(strip(*lhs)),
                rhs: Box::new(strip(*rhs)),
                span: Span::default(),
            },
            other => other,
        }
    }

    #[test]
    fn blank_selection_is_none() {
        assert_eq!(parse("   ").unwrap(), Expr::None);
    }

    #[test]
    fn model_atom_collects_options_until_operator() {
        let expr = strip(parse("A type X Y or B id 1:3").unwrap());
        assert_eq!(
            expr,
            Expr::Binary {
                op: LogicOp::Or,
                lhs: Box::new(model("A", "type", &["X", "Y"])),
                rhs: Box::new(model("B", "id", &["1:3"])),
                span: Span::default(),
            }
        );
    }

    #[test]
    fn operators_associate_left() {
        let expr = strip(parse("A id 0 or B id 0 and C id 0").unwrap());
        let Expr::Binary { op, lhs, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, LogicOp::And);
        assert!(matches!(*lhs, Expr::Binary { op: LogicOp::Or, .. }));
    }

    #[test]
    fn parentheses_override_association() {
        let expr = strip(parse("A id 0 or (B id 0 and C id 0)").unwrap());
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, LogicOp::Or);
        assert!(matches!(*rhs, Expr::Binary { op: LogicOp::And, .. }));
    }

    #[test]
    fn not_binds_to_the_following_atom() {
        let expr = strip(parse("not A type X and all").unwrap());
        let Expr::Binary { lhs, rhs, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert!(matches!(*lhs, Expr::Not { .. }));
        assert_eq!(*rhs, Expr::All);
    }

    #[test]
    fn model_span_covers_kind_and_options() {
        let Expr::Model { span, .. } = parse("A type X").unwrap() else {
            panic!("expected a model atom");
        };
        assert_eq!(span, Span::new(0, 8));
    }

    #[test]
    fn unbalanced_parentheses_are_reported() {
        assert!(matches!(
            parse("(A type X"),
            Err(SelectionError::UnbalancedParenthesis { span }) if span == Span::new(0, 1)
        ));
        assert!(matches!(
            parse("A type X)"),
            Err(SelectionError::UnbalancedParenthesis { span }) if span == Span::new(8, 9)
        ));
    }

    #[test]
    fn missing_kind_names_the_model() {
        assert_eq!(
            parse("A and B id 0"),
            Err(SelectionError::MissingKind {
                model: "A".to_string(),
                span: Span::new(0, 1)
            })
        );
    }

    #[test]
    fn dangling_operator_is_unexpected_end() {
        assert!(matches!(
            parse("A id 0 and"),
            Err(SelectionError::UnexpectedEnd { ref after, .. }) if after == "and"
        ));
    }

    #[test]
    fn empty_parentheses_are_rejected() {
        assert!(matches!(
            parse("()"),
            Err(SelectionError::UnbalancedParenthesis { .. })
        ));
    }
}
