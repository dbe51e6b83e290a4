// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parse errors and where they happened
//!
//! An [`Error`] only carries byte offsets. Line and column numbers are worked
//! out on demand from the source text, see [`Position::locate`].

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label as Annotation, Report, ReportKind, Source};
use thiserror::Error;

/// The class of a parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum ErrorKind {
	#[error("stray carriage return")]
	MalformedNewline,
	#[error("attribute name without '='")]
	MissingEquals,
	#[error("attribute without a value")]
	MissingAttributeValue,
	#[error("invalid escape")]
	InvalidEscape,
	#[error("unterminated string")]
	UnterminatedString,
	#[error("carriage return in raw string")]
	CarriageReturnInRawString,
	#[error("unterminated binary")]
	UnterminatedBinary,
	#[error("invalid base64 in binary")]
	InvalidBinary,
	#[error("multiple decimal points")]
	MultipleDecimalPoints,
	#[error("trailing characters after number")]
	TrailingGarbageAfterNumber,
	#[error("number out of range")]
	NumberOutOfRange,
	#[error("malformed date")]
	MalformedDate,
	#[error("malformed date-time")]
	MalformedDateTime,
	#[error("malformed time span")]
	MalformedTimeSpan,
	#[error("tag name not at the start of a line")]
	TagNameNotAtLineStart,
	#[error("opening brace not on a tag line")]
	BraceNotOnTagLine,
	#[error("expected a newline after an opening brace")]
	ExpectedNewlineAfterBrace,
	#[error("closing brace not alone on its line")]
	CloseBraceNotAlone,
	#[error("expected a newline after a closing brace")]
	ExpectedNewlineAfterCloseBrace,
	#[error("closing brace without an opening brace")]
	UnmatchedCloseBrace,
	#[error("unclosed brace block")]
	UnterminatedBlock,
	#[error("unexpected character")]
	UnexpectedCharacter,
}

/// A second annotated location on an [`Error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
	/// Byte offset in the source text
	pub offset: usize,
	/// What happened here
	pub message: String,
}

/// A parsing error
///
/// Parsing stops at the first one, there is never more than one per parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct Error {
	/// The class of error
	pub kind: ErrorKind,
	/// Byte offset in the source text
	pub offset: usize,
	/// Human readable description
	pub message: String,
	/// Extra location, e.g. where a string was opened
	pub secondary: Option<Label>,
	/// Display name of the source, if one was given
	pub name: Option<String>,
}

impl Error {
	/// Create an error with a single location
	pub fn new(kind: ErrorKind, offset: usize, message: impl Into<String>) -> Self {
		Self {
			kind,
			offset,
			message: message.into(),
			secondary: None,
			name: None,
		}
	}
	/// Attach a second location
	pub fn with_secondary(mut self, offset: usize, message: impl Into<String>) -> Self {
		self.secondary = Some(Label {
			offset,
			message: message.into(),
		});
		self
	}
	/// Attach the display name of the source
	pub fn with_name(mut self, name: Option<String>) -> Self {
		self.name = name;
		self
	}
	/// Line and column of the primary location
	pub fn position(&self, source: &str) -> Position {
		Position::locate(source, self.offset)
	}
	/// Render a framed snippet of `source` around the error
	///
	/// `source` has to be the text the error was produced from.
	pub fn render(&self, source: &str, color: bool) -> String {
		let name = self.name.as_deref().unwrap_or("<input>");
		let config = Config::default()
			.with_color(color)
			.with_index_type(IndexType::Byte);
		let mut report = Report::build(ReportKind::Error, (name, span(source, self.offset)))
			.with_config(config)
			.with_message(self.kind.to_string())
			.with_label(
				Annotation::new((name, span(source, self.offset)))
					.with_message(self.message.clone())
					.with_color(Color::Red),
			);
		if let Some(secondary) = &self.secondary {
			report = report.with_label(
				Annotation::new((name, span(source, secondary.offset)))
					.with_message(secondary.message.clone())
					.with_color(Color::Blue),
			);
		}
		let mut output = Vec::new();
		if report
			.finish()
			.write((name, Source::from(source)), &mut output)
			.is_err()
		{
			return self.to_string();
		}
		String::from_utf8(output).unwrap_or_else(|_| self.to_string())
	}
}

/// one character wide, or empty at the end of input
fn span(source: &str, offset: usize) -> Range<usize> {
	let start = floor_char_boundary(source, offset);
	let end = source[start..]
		.chars()
		.next()
		.map_or(start, |ch| start + ch.len_utf8());
	start..end
}

fn floor_char_boundary(source: &str, offset: usize) -> usize {
	let mut at = offset.min(source.len());
	while !source.is_char_boundary(at) {
		at -= 1;
	}
	at
}

/// A location in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
	/// Byte offset
	pub offset: usize,
	/// 1-based line number
	pub line: usize,
	/// 1-based column, in characters
	pub column: usize,
}

impl Position {
	/// Work out the line and column of a byte offset
	///
	/// Offsets past the end are clamped to the end of the text.
	pub fn locate(source: &str, offset: usize) -> Self {
		let offset = floor_char_boundary(source, offset);
		let before = &source[..offset];
		let line_start = before.rfind('\n').map_or(0, |at| at + 1);
		Self {
			offset,
			line: before.matches('\n').count() + 1,
			column: before[line_start..].chars().count() + 1,
		}
	}
}
