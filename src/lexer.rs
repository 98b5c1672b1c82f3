use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::token::Token;

/// Longest accepted identifier, in characters.
pub const MAX_IDENT_LEN: usize = 11;
/// Longest accepted number literal, in digits.
pub const MAX_NUMBER_LEN: usize = 5;

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token() {
            tokens.push(tok);
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return None;
            }

            let ch = self.source[self.pos];

            if ch.is_ascii_alphabetic() {
                return Some(self.scan_ident_or_keyword());
            }

            if ch.is_ascii_digit() {
                return Some(self.scan_number());
            }

            if let Some(tok) = self.scan_symbol() {
                return Some(tok);
            }
            // scan_symbol recorded an error; keep going
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Comments are /* ... */ and do not nest.
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'*'
            {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos + 1 >= self.source.len() {
                        self.pos = self.source.len();
                        self.diagnostics.push(
                            Diagnostic::error(
                                "unterminated comment".to_string(),
                                Span::new(start as u32, self.pos as u32),
                            )
                            .with_help("every '/*' must be closed with '*/'".to_string()),
                        );
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_alphanumeric() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        if text.len() > MAX_IDENT_LEN {
            self.diagnostics.push(
                Diagnostic::error(
                    format!("identifier '{}' is too long", text),
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help(format!(
                    "identifiers may be at most {} characters",
                    MAX_IDENT_LEN
                )),
            );
        }
        Token::from_keyword(text).unwrap_or_else(|| Token::Ident(text.to_string()))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        if text.len() > MAX_NUMBER_LEN {
            self.diagnostics.push(
                Diagnostic::error(
                    format!("number '{}' is too long", text),
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help(format!("numbers may have at most {} digits", MAX_NUMBER_LEN)),
            );
        }
        if self.pos < self.source.len() && self.source[self.pos].is_ascii_alphabetic() {
            self.diagnostics.push(
                Diagnostic::error(
                    "identifier cannot begin with a digit".to_string(),
                    Span::new(start as u32, (self.pos + 1) as u32),
                )
                .with_help("identifiers must start with a letter".to_string()),
            );
        }
        Token::Number(text.to_string())
    }

    fn scan_symbol(&mut self) -> Option<Token> {
        let start = self.pos;
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'=' => Token::Eql,
            b',' => Token::Comma,
            b';' => Token::Semicolon,
            b'.' => Token::Period,
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    Token::Leq
                }
                Some(b'>') => {
                    self.pos += 1;
                    Token::Neq
                }
                _ => Token::Lss,
            },
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Token::Geq
                } else {
                    Token::Gtr
                }
            }
            b':' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Token::Becomes
                } else {
                    self.diagnostics.push(
                        Diagnostic::error(
                            "expected '=' after ':'".to_string(),
                            Span::new(start as u32, self.pos as u32),
                        )
                        .with_help("assignment is written ':='".to_string()),
                    );
                    return None;
                }
            }
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help("this character is not part of PL/0 syntax".to_string()),
                );
                return None;
            }
        };

        Some(token)
    }

    fn peek(&self) -> Option<u8> {
        if self.pos < self.source.len() {
            Some(self.source[self.pos])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
        tokens
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("const var procedure call begin end if then else while do read write odd");
        assert_eq!(
            tokens,
            vec![
                Token::Const,
                Token::Var,
                Token::Procedure,
                Token::Call,
                Token::Begin,
                Token::End,
                Token::If,
                Token::Then,
                Token::Else,
                Token::While,
                Token::Do,
                Token::Read,
                Token::Write,
                Token::Odd,
            ]
        );
    }

    #[test]
    fn test_symbols() {
        let tokens = lex("+ - * / ( ) = <> < <= > >= , ; . :=");
        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::LParen,
                Token::RParen,
                Token::Eql,
                Token::Neq,
                Token::Lss,
                Token::Leq,
                Token::Gtr,
                Token::Geq,
                Token::Comma,
                Token::Semicolon,
                Token::Period,
                Token::Becomes,
            ]
        );
    }

    #[test]
    fn test_numbers_keep_lexeme() {
        let tokens = lex("0 7 99999");
        assert_eq!(
            tokens,
            vec![
                Token::Number("0".into()),
                Token::Number("7".into()),
                Token::Number("99999".into()),
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("x y1 counter");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Ident("y1".into()),
                Token::Ident("counter".into()),
            ]
        );
    }

    #[test]
    fn test_adjacent_operators() {
        // ':=' must not be split, '<' must not eat an unrelated '='
        let tokens = lex("x:=y<z");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Becomes,
                Token::Ident("y".into()),
                Token::Lss,
                Token::Ident("z".into()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = lex("var /* the loop counter */ i;");
        assert_eq!(
            tokens,
            vec![Token::Var, Token::Ident("i".into()), Token::Semicolon]
        );
    }

    #[test]
    fn test_small_program() {
        let tokens = lex("var x;\nx := 0.");
        assert_eq!(
            tokens,
            vec![
                Token::Var,
                Token::Ident("x".into()),
                Token::Semicolon,
                Token::Ident("x".into()),
                Token::Becomes,
                Token::Number("0".into()),
                Token::Period,
            ]
        );
    }

    // --- Error path tests ---

    fn lex_with_errors(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        Lexer::new(source).tokenize()
    }

    #[test]
    fn test_error_unexpected_character() {
        let (_tokens, diags) = lex_with_errors("x # y");
        assert!(!diags.is_empty(), "should produce an error for '#'");
        assert!(
            diags[0].message.contains("unexpected character '#'"),
            "error should name the character, got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_lone_colon() {
        let (tokens, diags) = lex_with_errors("x : 1");
        assert!(!diags.is_empty(), "should produce an error for lone ':'");
        assert!(
            diags[0].help.as_deref().unwrap().contains(":="),
            "help should show the assignment operator"
        );
        // Lexing continues past the bad symbol.
        assert_eq!(
            tokens,
            vec![Token::Ident("x".into()), Token::Number("1".into())]
        );
    }

    #[test]
    fn test_error_unterminated_comment() {
        let (_tokens, diags) = lex_with_errors("var x; /* no close");
        assert!(!diags.is_empty(), "should report the open comment");
        assert!(
            diags[0].message.contains("unterminated comment"),
            "got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_identifier_too_long() {
        let (_tokens, diags) = lex_with_errors("averylongname1");
        assert!(!diags.is_empty(), "14-character identifier should error");
        assert!(
            diags[0].message.contains("too long"),
            "got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_number_too_long() {
        let (_tokens, diags) = lex_with_errors("123456");
        assert!(!diags.is_empty(), "6-digit number should error");
        assert!(
            diags[0].message.contains("too long"),
            "got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_digit_leading_identifier() {
        let (_tokens, diags) = lex_with_errors("1abc");
        assert!(!diags.is_empty());
        assert!(
            diags[0].message.contains("cannot begin with a digit"),
            "got: {}",
            diags[0].message
        );
    }
}
