//! Field selections for response shaping.
//!
//! A selection lists the fields to return for an entity, recursively for
//! relations, with type-conditioned fragments for union and interface
//! elements. Selections can be built in code or parsed from a compact text
//! form:
//!
//! ```text
//! id name writtenSubmissions { title } starred { ... on User { name } ... on Submission { title } }
//! ```

use crate::error::{MutationError, MutationResult};

/// One entry of a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionItem {
    /// A field, with a sub-selection for relations.
    Field {
        name: String,
        selection: Option<Selection>,
    },
    /// Fields applied only to elements of `type_name` or its subtypes.
    Fragment {
        type_name: String,
        selection: Selection,
    },
}

/// A field selection tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    items: Vec<SelectionItem>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a scalar field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.items.push(SelectionItem::Field {
            name: name.into(),
            selection: None,
        });
        self
    }

    /// Select several scalar fields.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.field(name);
        }
        self
    }

    /// Select a relation with a sub-selection.
    pub fn relation(mut self, name: impl Into<String>, selection: Selection) -> Self {
        self.items.push(SelectionItem::Field {
            name: name.into(),
            selection: Some(selection),
        });
        self
    }

    /// Add a type-conditioned fragment.
    pub fn on(mut self, type_name: impl Into<String>, selection: Selection) -> Self {
        self.items.push(SelectionItem::Fragment {
            type_name: type_name.into(),
            selection,
        });
        self
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse the compact text form. Commas are ignored.
    pub fn parse(source: &str) -> MutationResult<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        let selection = parser.selection()?;
        match parser.peek() {
            Token::Eof => Ok(selection),
            other => Err(parser.unexpected(other, "end of selection")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    LBrace,
    RBrace,
    Spread,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Name(name) => format!("`{}`", name),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::Spread => "`...`".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenize all input, tagging each token with its byte offset.
    fn tokenize(mut self) -> MutationResult<Vec<(usize, Token)>> {
        let mut tokens = Vec::new();
        while let Some(&(pos, c)) = self.chars.peek() {
            match c {
                c if c.is_whitespace() || c == ',' => {
                    self.chars.next();
                }
                '{' => {
                    self.chars.next();
                    tokens.push((pos, Token::LBrace));
                }
                '}' => {
                    self.chars.next();
                    tokens.push((pos, Token::RBrace));
                }
                '.' => {
                    for _ in 0..3 {
                        match self.chars.next() {
                            Some((_, '.')) => {}
                            _ => {
                                return Err(MutationError::validation(format!(
                                    "selection: expected `...` at {}",
                                    pos
                                )))
                            }
                        }
                    }
                    tokens.push((pos, Token::Spread));
                }
                c if c == '_' || c.is_ascii_alphabetic() => {
                    let mut name = String::new();
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '_' || c.is_ascii_alphanumeric() {
                            name.push(c);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push((pos, Token::Name(name)));
                }
                other => {
                    return Err(MutationError::validation(format!(
                        "selection: unexpected character `{}` at {}",
                        other, pos
                    )))
                }
            }
        }
        let end = tokens.last().map(|(pos, _)| pos + 1).unwrap_or(0);
        tokens.push((end, Token::Eof));
        Ok(tokens)
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Token {
        self.tokens
            .get(self.pos)
            .map(|(_, t)| t.clone())
            .unwrap_or(Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn unexpected(&self, found: Token, expected: &str) -> MutationError {
        MutationError::validation(format!(
            "selection: expected {}, found {} at {}",
            expected,
            found.describe(),
            self.offset()
        ))
    }

    /// selection := item*
    fn selection(&mut self) -> MutationResult<Selection> {
        let mut selection = Selection::new();
        loop {
            match self.peek() {
                Token::Name(_) => {
                    let Token::Name(name) = self.advance() else {
                        unreachable!("peeked a name");
                    };
                    let sub = if self.peek() == Token::LBrace {
                        Some(self.block()?)
                    } else {
                        None
                    };
                    selection.items.push(SelectionItem::Field {
                        name,
                        selection: sub,
                    });
                }
                Token::Spread => {
                    self.advance();
                    match self.advance() {
                        Token::Name(keyword) if keyword == "on" => {}
                        other => return Err(self.unexpected(other, "`on`")),
                    }
                    let type_name = match self.advance() {
                        Token::Name(name) => name,
                        other => return Err(self.unexpected(other, "a type name")),
                    };
                    let sub = self.block()?;
                    selection.items.push(SelectionItem::Fragment {
                        type_name,
                        selection: sub,
                    });
                }
                _ => return Ok(selection),
            }
        }
    }

    /// block := '{' selection '}'
    fn block(&mut self) -> MutationResult<Selection> {
        match self.advance() {
            Token::LBrace => {}
            other => return Err(self.unexpected(other, "`{`")),
        }
        let selection = self.selection()?;
        match self.advance() {
            Token::RBrace => Ok(selection),
            other => Err(self.unexpected(other, "`}`")),
        }
    }
}
