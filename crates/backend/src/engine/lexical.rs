//! A small lexical engine for C-like sources.
//!
//! It tokenizes the file, checks bracket balance, finds declarations made
//! with builtin type specifiers and resolves identifiers against them with
//! block scoping. It is not a compiler front end. It gives the backend
//! something real to schedule when no external engine is plugged in.

use std::sync::Arc;

use codemodel_protocol::{Diagnostic, Severity, SourceLocation, SourceRange, TokenInfo, TokenKind};
use rustc_hash::FxHashSet;

use super::{ParseEngine, ParseInput, ParsedHandle, ParsedUnit, SymbolReferences};
use crate::error::EngineError;

const KEYWORDS: &[&str] = &[
	"auto", "bool", "break", "case", "char", "class", "const", "continue", "default", "delete", "do", "double", "else", "enum",
	"extern", "false", "float", "for", "goto", "if", "inline", "int", "long", "namespace", "new", "nullptr", "private",
	"protected", "public", "register", "return", "short", "signed", "sizeof", "static", "struct", "switch", "template", "this",
	"true", "typedef", "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

/// Keywords that may start a declaration.
const DECL_SPECIFIERS: &[&str] = &[
	"auto", "bool", "char", "const", "double", "extern", "float", "inline", "int", "long", "register", "short", "signed",
	"static", "unsigned", "void", "volatile",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalEngine;

impl ParseEngine for LexicalEngine {
	fn parse(&self, input: &ParseInput<'_>) -> Result<ParsedHandle, EngineError> {
		let source = input.source()?;
		let macros = input.project_part.define_names().map(str::to_owned).collect();
		Ok(Arc::new(LexicalUnit::analyze(&source, macros)))
	}
}

#[derive(Debug, Clone, Copy)]
struct Token {
	kind: TokenKind,
	start: usize,
	end: usize,
	location: SourceLocation,
	end_location: SourceLocation,
	length: u32,
}

/// Token index range of a `{ ... }` block, exclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
	open: usize,
	close: usize,
}

impl Block {
	fn contains(self, token: usize) -> bool {
		self.open < token && token < self.close
	}
}

#[derive(Debug, Clone)]
struct Declaration {
	name_token: usize,
	text: String,
	/// `None` for file scope.
	scope: Option<Block>,
}

#[derive(Debug)]
struct LexicalUnit {
	source: String,
	tokens: Vec<Token>,
	blocks: Vec<Block>,
	declarations: Vec<Declaration>,
	diagnostics: Vec<Diagnostic>,
	macros: FxHashSet<String>,
}

enum Terminator {
	Semicolon,
	OpenBrace(usize),
	CloseBrace,
	Eof,
}

impl LexicalUnit {
	fn analyze(source: &str, mut macros: FxHashSet<String>) -> Self {
		let mut diagnostics = Vec::new();
		let tokens = tokenize(source, &mut diagnostics);
		for token in tokens.iter().filter(|token| token.kind == TokenKind::Preprocessor) {
			if let Some(name) = defined_macro(&source[token.start..token.end]) {
				macros.insert(name.to_owned());
			}
		}

		let mut unit = Self {
			source: source.to_owned(),
			tokens,
			blocks: Vec::new(),
			declarations: Vec::new(),
			diagnostics,
			macros,
		};
		unit.match_brackets();
		unit.collect_statements();
		unit.diagnostics.sort_by_key(|diagnostic| diagnostic.location);
		unit
	}

	fn text(&self, token: usize) -> &str {
		let token = &self.tokens[token];
		&self.source[token.start..token.end]
	}

	fn is_punct(&self, token: usize, text: &str) -> bool {
		self.tokens[token].kind == TokenKind::Punctuation && self.text(token) == text
	}

	fn is_specifier(&self, token: usize) -> bool {
		self.tokens[token].kind == TokenKind::Keyword && DECL_SPECIFIERS.contains(&self.text(token))
	}

	fn code_tokens(&self) -> Vec<usize> {
		(0..self.tokens.len())
			.filter(|&i| !matches!(self.tokens[i].kind, TokenKind::Comment | TokenKind::Preprocessor))
			.collect()
	}

	fn match_brackets(&mut self) {
		let mut stack: Vec<(char, usize)> = Vec::new();
		for i in self.code_tokens() {
			if self.tokens[i].kind != TokenKind::Punctuation {
				continue;
			}
			let Some(c) = self.text(i).chars().next() else { continue };
			match c {
				'(' | '[' | '{' => stack.push((c, i)),
				')' | ']' | '}' => {
					let opener = match c {
						')' => '(',
						']' => '[',
						_ => '{',
					};
					if stack.last().is_some_and(|&(open, _)| open == opener) {
						if let Some((_, open)) = stack.pop()
							&& c == '}'
						{
							self.blocks.push(Block { open, close: i });
						}
					} else {
						self.error(self.tokens[i].location, format!("unexpected '{c}'"));
					}
				}
				_ => {}
			}
		}
		for (c, open) in stack {
			self.error(self.tokens[open].location, format!("unmatched '{c}'"));
			if c == '{' {
				self.blocks.push(Block {
					open,
					close: self.tokens.len(),
				});
			}
		}
	}

	fn collect_statements(&mut self) {
		let mut statement = Vec::new();
		let mut parens = 0usize;
		for i in self.code_tokens() {
			let terminator = if self.tokens[i].kind == TokenKind::Punctuation {
				match self.text(i) {
					"(" | "[" => {
						parens += 1;
						None
					}
					")" | "]" => {
						parens = parens.saturating_sub(1);
						None
					}
					";" if parens == 0 => Some(Terminator::Semicolon),
					"{" if parens == 0 => Some(Terminator::OpenBrace(i)),
					"}" if parens == 0 => Some(Terminator::CloseBrace),
					_ => None,
				}
			} else {
				None
			};
			match terminator {
				Some(terminator) => {
					self.finish_statement(&statement, terminator);
					statement.clear();
				}
				None => statement.push(i),
			}
		}
		self.finish_statement(&statement, Terminator::Eof);
	}

	fn finish_statement(&mut self, statement: &[usize], terminator: Terminator) {
		let Some(&first) = statement.first() else { return };
		if !self.is_specifier(first) {
			return;
		}

		let mut pos = 0;
		while pos < statement.len() && self.is_specifier(statement[pos]) {
			pos += 1;
		}
		let specifiers = self.joined(&statement[..pos]);
		let body = match terminator {
			Terminator::OpenBrace(open) => Some(open),
			_ => None,
		};
		self.declare_list(&statement[pos..], &specifiers, body);

		if matches!(terminator, Terminator::Eof | Terminator::CloseBrace)
			&& let Some(&last) = statement.last()
		{
			self.error(self.tokens[last].end_location, "expected ';' after declaration".to_owned());
		}
	}

	fn joined(&self, tokens: &[usize]) -> String {
		tokens.iter().map(|&i| self.text(i)).collect::<Vec<_>>().join(" ")
	}

	/// Declares every declarator of a comma separated list. `body` is the
	/// opening brace that ended the statement, if any.
	fn declare_list(&mut self, declarators: &[usize], specifiers: &str, body: Option<usize>) {
		let mut depth = 0usize;
		let mut start = 0;
		for (pos, &i) in declarators.iter().enumerate() {
			if self.tokens[i].kind != TokenKind::Punctuation {
				continue;
			}
			let split = match self.text(i) {
				"(" | "[" => {
					depth += 1;
					false
				}
				")" | "]" => {
					depth = depth.saturating_sub(1);
					false
				}
				"," => depth == 0,
				_ => false,
			};
			if split {
				self.declare_one(&declarators[start..pos], specifiers, body);
				start = pos + 1;
			}
		}
		self.declare_one(&declarators[start..], specifiers, body);
	}

	/// Declares one `*name`, `name = ...` or `name(params)` declarator.
	fn declare_one(&mut self, declarator: &[usize], specifiers: &str, body: Option<usize>) {
		let (prefix, pos) = self.pointer_prefix(declarator, 0);
		let Some(&name) = declarator.get(pos) else { return };
		if self.tokens[name].kind != TokenKind::Identifier {
			return;
		}

		let scope = self.innermost_block(name);
		let text = format!("{specifiers} {prefix}{}", self.text(name));
		self.declarations.push(Declaration {
			name_token: name,
			text,
			scope,
		});

		let is_function = declarator.get(pos + 1).is_some_and(|&next| self.is_punct(next, "("));
		if is_function && let Some(open) = body {
			self.declare_parameters(&declarator[pos + 2..], open);
		}
	}

	fn declare_parameters(&mut self, params: &[usize], body_open: usize) {
		let Some(body) = self.blocks.iter().copied().find(|block| block.open == body_open) else {
			return;
		};
		let params: Vec<&[usize]> = params
			.split(|&i| self.is_punct(i, ",") || self.is_punct(i, ")"))
			.collect();
		for param in params {
			let mut pos = 0;
			while pos < param.len() && self.is_specifier(param[pos]) {
				pos += 1;
			}
			if pos == 0 {
				continue;
			}
			let specifiers = self.joined(&param[..pos]);
			let (prefix, pos) = self.pointer_prefix(param, pos);
			if let Some(&name) = param.get(pos)
				&& self.tokens[name].kind == TokenKind::Identifier
			{
				let text = format!("{specifiers} {prefix}{}", self.text(name));
				self.declarations.push(Declaration {
					name_token: name,
					text,
					scope: Some(body),
				});
			}
		}
	}

	/// Collects `*` and `&` tokens starting at `pos`.
	fn pointer_prefix(&self, tokens: &[usize], mut pos: usize) -> (String, usize) {
		let mut prefix = String::new();
		while pos < tokens.len() && (self.is_punct(tokens[pos], "*") || self.is_punct(tokens[pos], "&")) {
			prefix.push_str(self.text(tokens[pos]));
			pos += 1;
		}
		(prefix, pos)
	}

	fn innermost_block(&self, token: usize) -> Option<Block> {
		self.blocks
			.iter()
			.copied()
			.filter(|block| block.contains(token))
			.max_by_key(|block| block.open)
	}

	fn error(&mut self, location: SourceLocation, text: String) {
		self.diagnostics.push(Diagnostic {
			severity: Severity::Error,
			location,
			text,
		});
	}

	fn token_at(&self, at: SourceLocation) -> Option<usize> {
		self.tokens.iter().position(|token| {
			token.location.line == at.line && token.location.column <= at.column && at.column < token.location.column + token.length
		})
	}

	fn name_kind(&self, token: usize) -> TokenKind {
		match self.tokens[token].kind {
			TokenKind::Identifier if self.macros.contains(self.text(token)) => TokenKind::Macro,
			kind => kind,
		}
	}

	/// The innermost visible declaration of the identifier at `token`.
	fn resolve(&self, token: usize) -> Option<&Declaration> {
		let name = self.text(token);
		self.declarations
			.iter()
			.filter(|decl| self.text(decl.name_token) == name)
			.filter(|decl| {
				decl.name_token == token || decl.scope.is_none_or(|scope| scope.contains(token) && decl.name_token <= token)
			})
			.max_by_key(|decl| decl.scope.map_or(0, |scope| scope.open + 1))
	}
}

impl ParsedUnit for LexicalUnit {
	fn reparse(&self, input: &ParseInput<'_>) -> Result<ParsedHandle, EngineError> {
		LexicalEngine.parse(input)
	}

	fn diagnostics(&self) -> Vec<Diagnostic> {
		self.diagnostics.clone()
	}

	fn token_infos(&self) -> Vec<TokenInfo> {
		(0..self.tokens.len())
			.map(|i| TokenInfo {
				location: self.tokens[i].location,
				length: self.tokens[i].length,
				kind: self.name_kind(i),
			})
			.collect()
	}

	fn references(&self, at: SourceLocation) -> SymbolReferences {
		let Some(token) = self.token_at(at).filter(|&i| self.tokens[i].kind == TokenKind::Identifier) else {
			return SymbolReferences::default();
		};
		let name = self.text(token);
		let target = self.resolve(token).map(|decl| decl.name_token);

		let locations = (0..self.tokens.len())
			.filter(|&i| self.tokens[i].kind == TokenKind::Identifier && self.text(i) == name)
			.filter(|&i| self.resolve(i).map(|decl| decl.name_token) == target)
			.map(|i| self.tokens[i].location)
			.collect();

		SymbolReferences {
			locations,
			is_local_variable: self.resolve(token).is_some_and(|decl| decl.scope.is_some()),
		}
	}

	fn tool_tip(&self, at: SourceLocation) -> Option<String> {
		let token = self.token_at(at)?;
		match self.name_kind(token) {
			TokenKind::Macro => Some(format!("macro {}", self.text(token))),
			TokenKind::Identifier => self.resolve(token).map(|decl| decl.text.clone()),
			_ => None,
		}
	}

	fn follow_symbol(&self, at: SourceLocation) -> Option<SourceRange> {
		let token = self.token_at(at).filter(|&i| self.tokens[i].kind == TokenKind::Identifier)?;
		let decl = &self.tokens[self.resolve(token)?.name_token];
		Some(SourceRange {
			start: decl.location,
			end: decl.end_location,
		})
	}
}

fn defined_macro(directive: &str) -> Option<&str> {
	let rest = directive.strip_prefix('#')?.trim_start().strip_prefix("define")?;
	if !rest.starts_with(char::is_whitespace) {
		return None;
	}
	let rest = rest.trim_start();
	let end = rest.find(|c: char| !(c == '_' || c.is_alphanumeric())).unwrap_or(rest.len());
	(end > 0).then(|| &rest[..end])
}

struct Cursor<'a> {
	source: &'a str,
	pos: usize,
	line: u32,
	column: u32,
}

impl Cursor<'_> {
	fn peek(&self) -> Option<char> {
		self.source[self.pos..].chars().next()
	}

	fn peek_second(&self) -> Option<char> {
		self.source[self.pos..].chars().nth(1)
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += c.len_utf8();
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
		while self.peek().is_some_and(&pred) {
			self.bump();
		}
	}

	fn location(&self) -> SourceLocation {
		SourceLocation::new(self.line, self.column)
	}
}

fn is_ident_char(c: char) -> bool {
	c == '_' || c.is_alphanumeric()
}

fn tokenize(source: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<Token> {
	let mut cursor = Cursor {
		source,
		pos: 0,
		line: 1,
		column: 1,
	};
	let mut tokens = Vec::new();
	let mut line_start = true;

	while let Some(c) = cursor.peek() {
		if c == '\n' {
			cursor.bump();
			line_start = true;
			continue;
		}
		if c.is_whitespace() {
			cursor.bump();
			continue;
		}

		let start = cursor.pos;
		let location = cursor.location();
		let kind = match c {
			'#' if line_start => {
				cursor.eat_while(|c| c != '\n');
				TokenKind::Preprocessor
			}
			'/' if cursor.peek_second() == Some('/') => {
				cursor.eat_while(|c| c != '\n');
				TokenKind::Comment
			}
			'/' if cursor.peek_second() == Some('*') => {
				cursor.bump();
				cursor.bump();
				let mut closed = false;
				while let Some(c) = cursor.bump() {
					if c == '*' && cursor.peek() == Some('/') {
						cursor.bump();
						closed = true;
						break;
					}
				}
				if !closed {
					diagnostics.push(Diagnostic {
						severity: Severity::Error,
						location,
						text: "unterminated comment".to_owned(),
					});
				}
				TokenKind::Comment
			}
			'"' | '\'' => {
				cursor.bump();
				let mut closed = false;
				while let Some(next) = cursor.peek() {
					if next == '\n' {
						break;
					}
					cursor.bump();
					if next == '\\' {
						cursor.bump();
					} else if next == c {
						closed = true;
						break;
					}
				}
				if !closed {
					diagnostics.push(Diagnostic {
						severity: Severity::Error,
						location,
						text: format!("missing terminating {c} character"),
					});
				}
				TokenKind::String
			}
			c if c.is_ascii_digit() => {
				cursor.eat_while(|c| is_ident_char(c) || c == '.');
				TokenKind::Number
			}
			c if is_ident_char(c) => {
				cursor.eat_while(is_ident_char);
				if KEYWORDS.contains(&&source[start..cursor.pos]) {
					TokenKind::Keyword
				} else {
					TokenKind::Identifier
				}
			}
			_ => {
				cursor.bump();
				TokenKind::Punctuation
			}
		};

		line_start = false;
		let text = &source[start..cursor.pos];
		tokens.push(Token {
			kind,
			start,
			end: cursor.pos,
			location,
			end_location: cursor.location(),
			length: text.chars().count() as u32,
		});
	}

	tokens
}

#[cfg(test)]
mod tests;
