// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use crate::template::{TemplateError, TemplateResult};

pub static LEFT_DELIM: &str = "[[";
pub static RIGHT_DELIM: &str = "]]";
const TRIM_MARKER: char = '-';

/// A parsed template: literal text interleaved with actions
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action(Action),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A string literal printed as-is
    Literal(String),
    /// A function call whose arguments are string literals
    Call {
        name: String,
        args: Vec<String>,
        offset: usize,
    },
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
}

/// Parse template source into its node list
pub fn parse(source: &str) -> TemplateResult<Template> {
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut pos = 0;
    let mut trim_next_text = false;

    while let Some(found) = source[pos..].find(LEFT_DELIM) {
        let start = pos + found;
        push_text(&mut text, &source[pos..start], trim_next_text);

        let mut cursor = start + LEFT_DELIM.len();
        if starts_trim_marker(&source[cursor..]) {
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            cursor += TRIM_MARKER.len_utf8();
        }

        if !text.is_empty() {
            nodes.push(Node::Text(std::mem::take(&mut text)));
        }

        let mut lexer = Lexer::new(source, cursor);
        let (tokens, trim_right) = lexer.action_tokens(start)?;
        nodes.push(Node::Action(build_action(tokens, start)?));

        pos = lexer.pos;
        trim_next_text = trim_right;
    }

    push_text(&mut text, &source[pos..], trim_next_text);
    if !text.is_empty() {
        nodes.push(Node::Text(text));
    }

    Ok(Template { nodes })
}

fn push_text(text: &mut String, segment: &str, trim_start: bool) {
    if trim_start {
        text.push_str(segment.trim_start());
    } else {
        text.push_str(segment);
    }
}

/// `[[- ` trims preceding whitespace; the dash must be followed by a space
fn starts_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some(TRIM_MARKER) && chars.next().is_some_and(char::is_whitespace)
}

fn build_action(tokens: Vec<(Token, usize)>, start: usize) -> TemplateResult<Action> {
    let mut tokens = tokens.into_iter();

    match tokens.next() {
        None => Err(TemplateError::EmptyAction(start)),
        Some((Token::Str(value), _)) => match tokens.next() {
            None => Ok(Action::Literal(value)),
            Some((_, offset)) => Err(TemplateError::ArgumentsToNonFunction(offset)),
        },
        Some((Token::Ident(name), offset)) => {
            let args = tokens
                .map(|(token, offset)| match token {
                    Token::Str(value) => Ok(value),
                    Token::Ident(_) => Err(TemplateError::NonLiteralArgument(offset)),
                })
                .collect::<TemplateResult<Vec<_>>>()?;

            Ok(Action::Call { name, args, offset })
        }
    }
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, pos: usize) -> Self {
        Self { source, pos }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Read tokens up to and including the closing delimiter
    ///
    /// Returns the tokens and whether the action ended with a trim marker.
    fn action_tokens(&mut self, start: usize) -> TemplateResult<(Vec<(Token, usize)>, bool)> {
        let mut tokens = Vec::new();

        loop {
            let skipped_space = self.skip_whitespace();
            let rest = self.rest();

            if rest.is_empty() {
                return Err(TemplateError::UnclosedAction(start));
            }
            if rest.starts_with(RIGHT_DELIM) {
                self.pos += RIGHT_DELIM.len();
                return Ok((tokens, false));
            }
            if skipped_space && rest.starts_with(TRIM_MARKER) && rest[TRIM_MARKER.len_utf8()..].starts_with(RIGHT_DELIM) {
                self.pos += TRIM_MARKER.len_utf8() + RIGHT_DELIM.len();
                return Ok((tokens, true));
            }

            let offset = self.pos;
            let token = match self.peek() {
                Some('"') => Token::Str(self.quoted()?),
                Some('`') => Token::Str(self.raw()?),
                Some(ch) if ch.is_alphabetic() || ch == '_' => Token::Ident(self.ident()),
                Some(ch) => return Err(TemplateError::UnexpectedCharacter { ch, offset }),
                None => return Err(TemplateError::UnclosedAction(start)),
            };
            tokens.push((token, offset));
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let before = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != before
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_alphanumeric() || ch == '_') {
            self.bump();
        }
        self.source[start..self.pos].to_string()
    }

    fn quoted(&mut self) -> TemplateResult<String> {
        let start = self.pos;
        let mut value = String::new();
        self.bump();

        loop {
            match self.bump() {
                None | Some('\n') => return Err(TemplateError::UnterminatedString(start)),
                Some('"') => return Ok(value),
                Some('\\') => {
                    let offset = self.pos;
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(ch) => return Err(TemplateError::InvalidEscape { ch, offset }),
                        None => return Err(TemplateError::UnterminatedString(start)),
                    }
                }
                Some(ch) => value.push(ch),
            }
        }
    }

    fn raw(&mut self) -> TemplateResult<String> {
        let start = self.pos;
        self.bump();

        match self.rest().find('`') {
            Some(end) => {
                let value = self.rest()[..end].to_string();
                self.pos += end + 1;
                Ok(value)
            }
            None => Err(TemplateError::UnterminatedString(start)),
        }
    }
}
