// SPDX-License-Identifier: MIT OR Apache-2.0
//! The tokenizer
//!
//! Operates on a complete `&str`, one token per [`Tokenizer::advance`] call.
//! Token text borrows from the source whenever no escape processing was needed.

use std::borrow::Cow;
use std::mem;

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use tracing::trace;

use crate::diagnostic::{Error, ErrorKind};
use crate::temporal::{self, FieldError};

type PResult<T> = Result<T, Error>;

/// What the current token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// Identifier at the start of a line, or a synthesized `content`
	TagName,
	/// Identifier later in a line, the `=` has been consumed
	AttributeName,
	/// Double-quoted or backtick string
	String,
	/// Whole number without a suffix
	Integer,
	/// Whole number with the `L` suffix
	Long,
	/// Number with the `F` suffix
	Float,
	/// Number with a decimal point or the `D` suffix
	Double,
	/// `true`, `on`, `false` or `off`
	Bool,
	/// `YYYY/MM/DD`
	Date,
	/// `YYYY/MM/DD HH:MM:SS.mmm`
	DateTime,
	/// `-DDd:HH:MM:SS.mmm`
	TimeSpan,
	/// `[base64]`
	Binary,
	/// `null`
	Null,
	/// End of a logical line
	NewLine,
	/// `{`
	OpenBrace,
	/// `}`
	CloseBrace,
	/// No more tokens, repeats forever
	EndOfInput,
}

impl TokenKind {
	/// Is this a literal that decodes into a [`Value`](crate::Value)
	pub fn is_value(self) -> bool {
		matches!(
			self,
			Self::String
				| Self::Integer
				| Self::Long
				| Self::Float
				| Self::Double
				| Self::Bool
				| Self::Date
				| Self::DateTime
				| Self::TimeSpan
				| Self::Binary
				| Self::Null
		)
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
	None,
	Bool(bool),
	Integer(i64),
	Float(f64),
	DateTime(DateTime<Utc>),
	Duration(TimeDelta),
	Binary(Vec<u8>),
}

#[derive(Debug)]
struct Token<'text> {
	kind: TokenKind,
	start: usize,
	text: Cow<'text, str>,
	namespace: &'text str,
	payload: Payload,
}

impl<'text> Token<'text> {
	fn new(kind: TokenKind, at: Pos, text: impl Into<Cow<'text, str>>) -> Self {
		Self {
			kind,
			start: at.0,
			text: text.into(),
			namespace: "",
			payload: Payload::None,
		}
	}
	/// synthesized tag in front of a bare value, consumes nothing
	fn content(at: Pos) -> Self { Self::new(TokenKind::TagName, at, "content") }
	fn with_payload(mut self, payload: Payload) -> Self {
		self.payload = payload;
		self
	}
}

/// where the next token may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
	/// start of input or right after a newline
	LineStart,
	/// after a tag name or value
	InLine,
	/// right after `name=`
	AttributeValue,
	/// end of input or an error, never leaves
	Done,
}

/// parsing position
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
struct Pos(usize);

impl Pos {
	fn offset_bytes(self, n: usize) -> Self { Self(self.0 + n) }
	fn offset_char(self, ch: char) -> Self { self.offset_bytes(ch.len_utf8()) }
}

const BLANK: [char; 4] = [' ', '\t', '\n', '\r'];

/// standard alphabet, padding optional
const BINARY: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_decode_padding_mode(DecodePaddingMode::Indifferent)
		.with_decode_allow_trailing_bits(true),
);

fn field_error(kind: ErrorKind) -> impl Fn(FieldError) -> Error {
	move |err| Error::new(kind, err.offset, err.message)
}

struct Grammar<'text>(&'text str);

impl<'text> Grammar<'text> {
	fn tail(&self, at: Pos) -> &'text str { &self.0[at.0..] }
	fn top_char(&self, at: Pos) -> Option<char> { self.tail(at).chars().next() }
	fn byte(&self, at: Pos) -> Option<u8> { self.0.as_bytes().get(at.0).copied() }
	fn ident_start(ch: char) -> bool { ch == '_' || ch.is_ascii_alphabetic() }
	fn ident_continue(ch: u8) -> bool { ch.is_ascii_alphanumeric() || matches!(ch, b'_' | b'-' | b'.' | b'$') }
	/// spaces and tabs
	fn blank(&self, mut at: Pos) -> Pos {
		while let Some(b' ' | b'\t') = self.byte(at) {
			at = at.offset_bytes(1);
		}
		at
	}
	/// comments and line continuations, neither produces a token
	fn skip(&self, mut at: Pos) -> Pos {
		loop {
			at = self.blank(at);
			let tail = self.tail(at);
			if tail.starts_with("//") || tail.starts_with("--") || tail.starts_with('#') {
				// the newline is still a token
				at = at.offset_bytes(tail.find('\n').unwrap_or(tail.len()));
			} else if tail.starts_with("\\\n") {
				at = at.offset_bytes(2);
			} else if tail.starts_with("\\\r\n") {
				at = at.offset_bytes(3);
			} else {
				return at;
			}
		}
	}
	fn token(&self, at: Pos, line_start: bool) -> PResult<(Pos, Token<'text>)> {
		let at = self.skip(at);
		match self.top_char(at) {
			None => Ok((at, Token::new(TokenKind::EndOfInput, at, ""))),
			Some('\n') => Ok((at.offset_bytes(1), Token::new(TokenKind::NewLine, at, "\n"))),
			Some('\r') if self.tail(at).starts_with("\r\n") => {
				Ok((at.offset_bytes(2), Token::new(TokenKind::NewLine, at, "\r\n")))
			}
			Some('\r') => Err(Error::new(
				ErrorKind::MalformedNewline,
				at.0,
				"Stray '\\r' without a '\\n' following it",
			)),
			Some('{') => Ok((at.offset_bytes(1), Token::new(TokenKind::OpenBrace, at, "{"))),
			Some('}') => Ok((at.offset_bytes(1), Token::new(TokenKind::CloseBrace, at, "}"))),
			Some(ch) if Self::ident_start(ch) => self.word(at, line_start),
			Some(_) if line_start => Ok((at, Token::content(at))),
			Some('"') => {
				let (next, text) = self.quoted_string(at)?;
				Ok((next, Token::new(TokenKind::String, at, text)))
			}
			Some('`') => {
				let (next, text) = self.raw_string(at)?;
				Ok((next, Token::new(TokenKind::String, at, text)))
			}
			Some('[') => {
				let (next, text, bytes) = self.binary(at)?;
				Ok((next, Token::new(TokenKind::Binary, at, text).with_payload(Payload::Binary(bytes))))
			}
			Some('-' | '0'..='9') => self.number(at),
			Some(ch) => Err(Error::new(
				ErrorKind::UnexpectedCharacter,
				at.0,
				format!("Unexpected character '{}'", ch.escape_debug()),
			)),
		}
	}
	fn identifier(&self, start: Pos) -> (Pos, &'text str) {
		let len = self
			.tail(start)
			.bytes()
			.position(|ch| !Self::ident_continue(ch))
			.unwrap_or(self.0.len() - start.0);
		(start.offset_bytes(len), &self.0[start.0..start.0 + len])
	}
	/// keyword, tag name or attribute name
	fn word(&self, start: Pos, line_start: bool) -> PResult<(Pos, Token<'text>)> {
		let (end, first) = self.identifier(start);
		let keyword = match first {
			"true" | "on" => Some((TokenKind::Bool, "true", Payload::Bool(true))),
			"false" | "off" => Some((TokenKind::Bool, "false", Payload::Bool(false))),
			"null" => Some((TokenKind::Null, "null", Payload::None)),
			_ => None,
		};
		if let Some((kind, text, payload)) = keyword {
			if line_start {
				return Ok((start, Token::content(start)));
			}
			return Ok((end, Token::new(kind, start, text).with_payload(payload)));
		}
		let (end, namespace, name) = if self.byte(end) == Some(b':') {
			let after = end.offset_bytes(1);
			if !self.top_char(after).is_some_and(Self::ident_start) {
				return Err(Error::new(
					ErrorKind::UnexpectedCharacter,
					after.0,
					"Expected a name after the namespace ':'",
				));
			}
			let (end, name) = self.identifier(after);
			(end, first, name)
		} else {
			(end, "", first)
		};
		let (end, kind) = if line_start {
			(end, TokenKind::TagName)
		} else if self.byte(end) == Some(b'=') {
			(end.offset_bytes(1), TokenKind::AttributeName)
		} else {
			return Err(Error::new(
				ErrorKind::MissingEquals,
				end.0,
				"Expected '=' following the attribute name",
			));
		};
		let mut token = Token::new(kind, start, name);
		token.namespace = namespace;
		Ok((end, token))
	}
	/// `"…"`, starting at the opening quote
	fn quoted_string(&self, open: Pos) -> PResult<(Pos, Cow<'text, str>)> {
		let start = open.offset_char('"');
		// none = can be borrowed
		let mut text = None::<String>;
		let mut at = start;
		loop {
			match self.top_char(at) {
				Some('"') => {
					let text = text.map_or_else(|| Cow::Borrowed(&self.0[start.0..at.0]), Cow::Owned);
					return Ok((at.offset_char('"'), text));
				}
				Some('\\') => {
					let text = text.get_or_insert_with(|| self.0[start.0..at.0].to_owned());
					let escape = at.offset_char('\\');
					at = match self.top_char(escape) {
						Some('n') => {
							text.push('\n');
							escape.offset_bytes(1)
						}
						Some('t') => {
							text.push('\t');
							escape.offset_bytes(1)
						}
						Some('r') => {
							text.push('\r');
							escape.offset_bytes(1)
						}
						Some(ch @ ('"' | '\\')) => {
							text.push(ch);
							escape.offset_bytes(1)
						}
						// joins the next line, leading indent dropped
						Some('\n') => self.blank(escape.offset_bytes(1)),
						Some('\r') if self.tail(escape).starts_with("\r\n") => {
							self.blank(escape.offset_bytes(2))
						}
						None => break,
						Some(ch) => {
							return Err(Error::new(
								ErrorKind::InvalidEscape,
								at.0,
								format!(
									"Invalid escape '\\{}', only \\t, \\n, \\r, \\\" and \\\\ are allowed",
									ch.escape_debug()
								),
							));
						}
					};
				}
				Some('\n') | None => break,
				Some(ch) => {
					if let Some(text) = &mut text {
						text.push(ch);
					}
					at = at.offset_char(ch);
				}
			}
		}
		Err(Error::new(ErrorKind::UnterminatedString, open.0, "Unterminated string")
			.with_secondary(at.0, "Expected a terminating '\"' before the end of the line"))
	}
	/// `` `…` ``, no escapes, may span lines
	fn raw_string(&self, open: Pos) -> PResult<(Pos, Cow<'text, str>)> {
		let start = open.offset_char('`');
		let tail = self.tail(start);
		match tail.find(['`', '\r']) {
			Some(len) if tail.as_bytes()[len] == b'`' => {
				Ok((start.offset_bytes(len + 1), Cow::Borrowed(&tail[..len])))
			}
			Some(len) => Err(Error::new(
				ErrorKind::CarriageReturnInRawString,
				start.0 + len,
				"Backtick strings cannot contain '\\r'",
			)),
			None => Err(Error::new(ErrorKind::UnterminatedString, open.0, "Unterminated string")
				.with_secondary(self.0.len(), "Expected a terminating '`' before the end of input")),
		}
	}
	/// `[…]`, whitespace inside is dropped before decoding
	fn binary(&self, open: Pos) -> PResult<(Pos, Cow<'text, str>, Vec<u8>)> {
		let start = open.offset_char('[');
		let tail = self.tail(start);
		let Some(len) = tail.find(']') else {
			return Err(Error::new(ErrorKind::UnterminatedBinary, open.0, "Unterminated binary literal")
				.with_secondary(self.0.len(), "Expected a terminating ']' before the end of input"));
		};
		let raw = &tail[..len];
		let text = if raw.contains(BLANK) {
			Cow::Owned(raw.chars().filter(|ch| !BLANK.contains(ch)).collect())
		} else {
			Cow::Borrowed(raw)
		};
		let bytes = BINARY.decode(text.as_bytes()).map_err(|err| {
			Error::new(ErrorKind::InvalidBinary, open.0, format!("Invalid base64 in binary literal: {err}"))
		})?;
		Ok((start.offset_bytes(len + 1), text, bytes))
	}
	/// numeric literals must be followed by whitespace or the end of the line
	fn delimited(&self, at: Pos) -> PResult<Pos> {
		match self.byte(at) {
			None | Some(b' ' | b'\t' | b'\n' | b'\r') => Ok(at),
			Some(_) => Err(Error::new(
				ErrorKind::TrailingGarbageAfterNumber,
				at.0,
				"Expected whitespace or the end of the line after the number",
			)),
		}
	}
	/// numbers, dates, date-times and time spans
	fn number(&self, start: Pos) -> PResult<(Pos, Token<'text>)> {
		if self.byte(start).is_some_and(|ch| ch.is_ascii_digit()) && self.byte(start.offset_bytes(4)) == Some(b'/') {
			return self.date(start);
		}
		let digits = if self.byte(start) == Some(b'-') { start.offset_bytes(1) } else { start };
		if !self.byte(digits).is_some_and(|ch| ch.is_ascii_digit()) {
			return Err(Error::new(ErrorKind::UnexpectedCharacter, start.0, "Expected a digit after '-'"));
		}
		let mut at = digits;
		let mut dot = false;
		loop {
			match self.byte(at) {
				Some(b'.') if dot => {
					return Err(Error::new(
						ErrorKind::MultipleDecimalPoints,
						at.0,
						"There are multiple decimal points in this number",
					));
				}
				Some(b'.') => dot = true,
				Some(b'0'..=b'9') => {}
				_ => break,
			}
			at = at.offset_bytes(1);
		}
		if dot && self.0.as_bytes()[at.0 - 1] == b'.' {
			return Err(Error::new(
				ErrorKind::UnexpectedCharacter,
				at.0,
				"Expected a digit after the decimal point",
			));
		}
		if let Some(b'd' | b':') = self.byte(at) {
			return self.time_span(start, digits, at);
		}
		let literal = &self.0[start.0..at.0];
		let (kind, end) = match self.byte(at) {
			Some(b'L') => (TokenKind::Long, at.offset_bytes(1)),
			Some(b'F') => (TokenKind::Float, at.offset_bytes(1)),
			Some(b'D') => (TokenKind::Double, at.offset_bytes(1)),
			_ if dot => (TokenKind::Double, at),
			_ => (TokenKind::Integer, at),
		};
		let end = self.delimited(end)?;
		let payload = match kind {
			TokenKind::Integer | TokenKind::Long if dot => {
				return Err(Error::new(
					ErrorKind::TrailingGarbageAfterNumber,
					at.0,
					"A number with a decimal point cannot be a Long",
				));
			}
			TokenKind::Integer | TokenKind::Long => Payload::Integer(literal.parse().map_err(|_| {
				Error::new(ErrorKind::NumberOutOfRange, start.0, "This number does not fit in 64 bits")
			})?),
			_ => Payload::Float(literal.parse().map_err(|_| {
				Error::new(ErrorKind::NumberOutOfRange, start.0, "This number cannot be represented")
			})?),
		};
		Ok((end, Token::new(kind, start, literal).with_payload(payload)))
	}
	/// `-?(DDd:)?HH:MM:SS(.mmm)?`, `digits` is where the digit run after the sign starts
	/// and `at` is the `d` or `:` that ended it
	fn time_span(&self, start: Pos, digits: Pos, at: Pos) -> PResult<(Pos, Token<'text>)> {
		let negative = start.0 != digits.0;
		let (days, clock_at) = if self.byte(at) == Some(b'd') {
			if self.byte(at.offset_bytes(1)) != Some(b':') {
				return Err(Error::new(
					ErrorKind::MalformedTimeSpan,
					at.0 + 1,
					"Expected a ':' following the days of a time span",
				));
			}
			let days = self.0[digits.0..at.0].parse::<i64>().map_err(|_| {
				Error::new(ErrorKind::MalformedTimeSpan, digits.0, "Expected a whole number of days")
			})?;
			(days, at.offset_bytes(2))
		} else {
			// the digits already scanned are the hours
			(0, digits)
		};
		let (end, clock) = temporal::clock(self.0, clock_at.0).map_err(field_error(ErrorKind::MalformedTimeSpan))?;
		let span = temporal::span(days, clock)
			.ok_or_else(|| Error::new(ErrorKind::NumberOutOfRange, start.0, "This time span is too long"))?;
		let span = if negative { -span } else { span };
		let end = self.delimited(Pos(end))?;
		let token = Token::new(TokenKind::TimeSpan, start, &self.0[start.0..end.0]);
		Ok((end, token.with_payload(Payload::Duration(span))))
	}
	/// `YYYY/MM/DD`, optionally followed by a time of day on the same line
	fn date(&self, start: Pos) -> PResult<(Pos, Token<'text>)> {
		let (end, date) = temporal::date(self.0, start.0).map_err(field_error(ErrorKind::MalformedDate))?;
		let time_at = self.blank(Pos(end));
		let bytes = self.0.as_bytes();
		let has_time = time_at.0 > end
			&& bytes.get(time_at.0..time_at.0 + 3).is_some_and(|head| {
				head[0].is_ascii_digit() && head[1].is_ascii_digit() && head[2] == b':'
			});
		let (kind, end, value) = if has_time {
			let (end, time) =
				temporal::time_of_day(self.0, time_at.0).map_err(field_error(ErrorKind::MalformedDateTime))?;
			(TokenKind::DateTime, end, NaiveDateTime::new(date, time))
		} else {
			(TokenKind::Date, end, date.and_time(NaiveTime::MIN))
		};
		let end = self.delimited(Pos(end))?;
		let token = Token::new(kind, start, &self.0[start.0..end.0]);
		Ok((end, token.with_payload(Payload::DateTime(value.and_utc()))))
	}
}

/// A tokenizer over a complete document
///
/// Call [`advance`](Self::advance) to move to the next token, then inspect it
/// through the accessors. Once [`TokenKind::EndOfInput`] is reached, or any
/// error is returned, every further call yields `EndOfInput` again.
pub struct Tokenizer<'text> {
	grammar: Grammar<'text>,
	name: Option<String>,
	cursor: Pos,
	state: LexState,
	token: Token<'text>,
}

impl<'text> Tokenizer<'text> {
	/// Create a new tokenizer from a text string
	///
	/// Before the first [`advance`](Self::advance) the current token is a
	/// [`TokenKind::NewLine`] at offset 0.
	pub fn new(text: &'text str) -> Self {
		Self {
			grammar: Grammar(text),
			name: None,
			cursor: Pos(0),
			state: LexState::LineStart,
			token: Token::new(TokenKind::NewLine, Pos(0), ""),
		}
	}
	/// Set the display name attached to errors
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
	/// Display name attached to errors
	pub fn name(&self) -> Option<&str> { self.name.as_deref() }

	/// Move to the next token
	pub fn advance(&mut self) -> Result<(), Error> {
		if self.state == LexState::Done {
			let end = Pos(self.grammar.0.len());
			self.cursor = end;
			self.token = Token::new(TokenKind::EndOfInput, end, "");
			return Ok(());
		}
		let (cursor, token) = match self.grammar.token(self.cursor, self.state == LexState::LineStart) {
			Ok(next) => next,
			Err(err) => return Err(self.fail(err)),
		};
		if self.state == LexState::AttributeValue && !token.kind.is_value() {
			let err = Error::new(
				ErrorKind::MissingAttributeValue,
				token.start,
				"Expected a value following '='",
			);
			return Err(self.fail(err));
		}
		self.state = match token.kind {
			TokenKind::NewLine => LexState::LineStart,
			TokenKind::EndOfInput => LexState::Done,
			TokenKind::AttributeName => LexState::AttributeValue,
			_ => LexState::InLine,
		};
		trace!(kind = ?token.kind, offset = token.start, text = %token.text, "token");
		self.cursor = cursor;
		self.token = token;
		Ok(())
	}
	fn fail(&mut self, err: Error) -> Error {
		self.state = LexState::Done;
		trace!(kind = ?err.kind, offset = err.offset, "tokenizer halted");
		err.with_name(self.name.clone())
	}

	/// Kind of the current token
	pub fn kind(&self) -> TokenKind { self.token.kind }
	/// Byte offset where the current token starts
	pub fn offset(&self) -> usize { self.token.start }
	/// Primary text of the current token
	///
	/// The name for identifiers, the decoded value for strings, the digits
	/// without a type suffix for numbers, and the base64 text with whitespace
	/// removed for binary literals.
	pub fn text(&self) -> &str { &self.token.text }
	/// Namespace of a tag or attribute name, empty if there is none
	pub fn namespace(&self) -> &'text str { self.token.namespace }
	/// Value of a `true`/`on` or `false`/`off` keyword
	pub fn boolean(&self) -> Option<bool> {
		match self.token.payload {
			Payload::Bool(value) => Some(value),
			_ => None,
		}
	}
	/// Value of an `Integer` or `Long` literal
	pub fn integer(&self) -> Option<i64> {
		match self.token.payload {
			Payload::Integer(value) => Some(value),
			_ => None,
		}
	}
	/// Value of a `Float` or `Double` literal
	pub fn float(&self) -> Option<f64> {
		match self.token.payload {
			Payload::Float(value) => Some(value),
			_ => None,
		}
	}
	/// Dates are at midnight UTC
	pub fn date_time(&self) -> Option<DateTime<Utc>> {
		match self.token.payload {
			Payload::DateTime(value) => Some(value),
			_ => None,
		}
	}
	/// Length of a time span, negative for a leading `-`
	pub fn duration(&self) -> Option<TimeDelta> {
		match self.token.payload {
			Payload::Duration(value) => Some(value),
			_ => None,
		}
	}
	/// Decoded bytes of a binary literal
	pub fn binary(&self) -> Option<&[u8]> {
		match &self.token.payload {
			Payload::Binary(value) => Some(value),
			_ => None,
		}
	}

	pub(crate) fn take_text(&mut self) -> Cow<'text, str> { mem::take(&mut self.token.text) }
	pub(crate) fn take_binary(&mut self) -> Option<Vec<u8>> {
		match mem::replace(&mut self.token.payload, Payload::None) {
			Payload::Binary(value) => Some(value),
			_ => None,
		}
	}
}
