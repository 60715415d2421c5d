use std::fmt;

/// A byte range into the selection source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn join(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    Word(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text(&self) -> &str {
        match &self.kind {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Word(w) => w,
        }
    }

    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(w) if w == word)
    }
}

/// Splits a selection into words and parentheses; whitespace only separates.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    let flush = |start: &mut Option<usize>, end: usize, tokens: &mut Vec<Token>| {
        if let Some(s) = start.take() {
            tokens.push(Token {
                kind: TokenKind::Word(input[s..end].to_string()),
                span: Span::new(s, end),
            });
        }
    };

    for (i, c) in input.char_indices() {
        match c {
            '(' | ')' => {
                flush(&mut word_start, i, &mut tokens);
                let kind = if c == '(' {
                    TokenKind::LParen
                } else {
                    TokenKind::RParen
                };
                tokens.push(Token {
                    kind,
                    span: Span::new(i, i + 1),
                });
            }
            c if c.is_whitespace() => flush(&mut word_start, i, &mut tokens),
            _ => {
                if word_start.is_none() {
                    word_start = Some(i);
                }
            }
        }
    }
    flush(&mut word_start, input.len(), &mut tokens);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).iter().map(|t| t.text().to_string()).collect()
    }

    #[test]
    fn parentheses_split_words() {
        assert_eq!(texts("(A type X)or(B id 1)"), vec![
            "(", "A", "type", "X", ")", "or", "(", "B", "id", "1", ")"
        ]);
    }

    #[test]
    fn spans_point_into_the_source() {
        let tokens = tokenize("  A  id 0:3");
        assert_eq!(tokens[0].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(8, 11));
        assert_eq!(tokens[2].span.to_string(), "8..11");
    }

    #[test]
    fn blank_input_has_no_tokens() {
        assert!(tokenize(" \t\n").is_empty());
    }
}
