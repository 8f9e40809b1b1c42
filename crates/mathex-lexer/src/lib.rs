//! Tokenizer for extracted formula text.
//!
//! Operator, separator and parenthesis symbols are configurable per math
//! definition, so the lexer only classifies the fixed shapes (identifiers,
//! numbers, placeholders) and emits every other character as a one-char
//! [`Token::Symbol`]. Multi-character symbols are matched on top of the token
//! stream by [`Cursor::at_symbol`].

use logos::Logos;

/// Leading character of every generated placeholder token (`$0`, `$1`, ...).
pub const PLACEHOLDER_SIGIL: char = '$';

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[regex(r"\$[0-9]+")]
    Placeholder,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
    /// `0x1F`, or `&h1F` once [`tokenize_detailed`] joins the `&` and `h1F`.
    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexNumber,
    #[regex(r"0[bB][01_]+")]
    BinaryNumber,
    // Scientific wins over Integer/Float by longest match
    #[regex(r"[0-9]+(\.[0-9]+)?[eE][+-]?[0-9]+")]
    Scientific,
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[^ \t\n\ra-zA-Z0-9_$]")]
    Symbol,

    Error,
}

impl Token {
    pub fn is_number(self) -> bool {
        matches!(
            self,
            Token::HexNumber
                | Token::BinaryNumber
                | Token::Scientific
                | Token::Float
                | Token::Integer
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub lexeme: String,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_detailed(input)
        .into_iter()
        .map(|t| t.token)
        .collect()
}

pub fn tokenize_detailed(input: &str) -> Vec<SpannedToken> {
    let mut lex = Token::lexer(input);
    let mut out: Vec<SpannedToken> = Vec::new();
    while let Some(res) = lex.next() {
        let span = lex.span();
        // A stray sigil without digits is the only input the patterns reject
        let token = res.unwrap_or(Token::Error);
        if token == Token::Ident && is_ampersand_hex(out.last(), lex.slice(), span.start) {
            if let Some(amp) = out.last_mut() {
                amp.token = Token::HexNumber;
                amp.lexeme.push_str(lex.slice());
                amp.end = span.end;
            }
            continue;
        }
        out.push(SpannedToken {
            token,
            lexeme: lex.slice().to_string(),
            start: span.start,
            end: span.end,
        });
    }
    out
}

/// `&` directly followed by `h` and hex digits, with no space between.
fn is_ampersand_hex(previous: Option<&SpannedToken>, ident: &str, start: usize) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    if prev.token != Token::Symbol || prev.lexeme != "&" || prev.end != start {
        return false;
    }
    match ident.strip_prefix(['h', 'H']) {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Formats the placeholder token for an ordinal.
pub fn placeholder_name(ordinal: usize) -> String {
    format!("{PLACEHOLDER_SIGIL}{ordinal}")
}

/// Returns the ordinal of a placeholder lexeme such as `$12`.
pub fn placeholder_ordinal(lexeme: &str) -> Option<usize> {
    lexeme
        .strip_prefix(PLACEHOLDER_SIGIL)
        .and_then(|digits| digits.parse().ok())
}

/// True when `text`, ignoring surrounding whitespace, is exactly one placeholder.
pub fn is_single_placeholder(text: &str) -> bool {
    let toks = tokenize(text);
    toks.len() == 1 && toks[0] == Token::Placeholder
}

/// Distinct placeholder lexemes referenced by `text`, in order of first appearance.
pub fn referenced_placeholders(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for t in tokenize_detailed(text) {
        if t.token == Token::Placeholder && !seen.contains(&t.lexeme) {
            seen.push(t.lexeme);
        }
    }
    seen
}

/// Forward-only cursor over the tokens of one piece of text.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: tokenize_detailed(input),
            pos: 0,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn tokens(&self) -> &[SpannedToken] {
        &self.tokens
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token, or the input length at end of input.
    pub fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.start)
            .unwrap_or(self.input.len())
    }

    pub fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    pub fn peek_at(&self, offset: usize) -> Option<&SpannedToken> {
        self.tokens.get(self.pos + offset)
    }

    pub fn previous(&self) -> Option<&SpannedToken> {
        self.pos.checked_sub(1).and_then(|p| self.tokens.get(p))
    }

    pub fn bump(&mut self) -> Option<SpannedToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Number of tokens `symbol` spans at the cursor, if the text there is
    /// exactly `symbol` and it ends on a token boundary.
    pub fn at_symbol(&self, symbol: &str) -> Option<usize> {
        let first = self.tokens.get(self.pos)?;
        if symbol.is_empty() || !self.input[first.start..].starts_with(symbol) {
            return None;
        }
        let end = first.start + symbol.len();
        for (n, tok) in self.tokens[self.pos..].iter().enumerate() {
            if tok.end == end {
                return Some(n + 1);
            }
            if tok.end > end {
                return None;
            }
        }
        None
    }

    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        match self.at_symbol(symbol) {
            Some(n) => {
                self.pos += n;
                true
            }
            None => false,
        }
    }
}
