// SPDX-License-Identifier: MIT OR Apache-2.0
//! Small [SDLang] parser, with a token-at-a-time interface underneath the tree
//!
//! ```
//! let root = sdlite::parse("server \"main\" port=8080 {\n  allow \"10.0.0.0/8\"\n}\n")?;
//! let server = root.child("server").unwrap();
//! assert_eq!(server.values[0].as_str(), Ok("main"));
//! assert_eq!(server.attribute("port").map(|port| port.as_int()), Some(Ok(8080)));
//! assert_eq!(server.children[0].name(), "allow");
//! # Ok::<(), sdlite::Error>(())
//! ```
//!
//! Strings without escapes borrow from the input, use `into_owned` to detach
//! a tree from it.
//!
//! For low-allocation consumption drive a [`Tokenizer`] directly:
//!
//! ```
//! use sdlite::{TokenKind, Tokenizer};
//!
//! let mut tokens = Tokenizer::new("size 10 20\n");
//! let mut total = 0;
//! loop {
//!   tokens.advance()?;
//!   match tokens.kind() {
//!     TokenKind::Integer => total += tokens.integer().unwrap_or(0),
//!     TokenKind::EndOfInput => break,
//!     _ => {}
//!   }
//! }
//! assert_eq!(total, 30);
//! # Ok::<(), sdlite::Error>(())
//! ```
//!
//! Parsing stops at the first error. [`Error::render`] turns one into a
//! framed snippet of the source.
//!
//! [SDLang]: https://sdlang.org

use std::borrow::Cow;

pub mod diagnostic;
pub mod dom;
pub mod stream;
mod temporal;
pub mod value;

#[cfg(test)]
mod tests;

pub use diagnostic::{Error, ErrorKind, Label, Position};
pub use dom::{Attribute, Node};
pub use stream::{TokenKind, Tokenizer};
pub use value::{TypeMismatch, Value};

/// Parse a whole document, returning the root node
pub fn parse(text: &str) -> Result<Node<'_>, Error> {
  Node::parse(text)
}

/// [`parse`] with a display name for diagnostics, usually the file name
pub fn parse_named<'text>(text: &'text str, name: impl Into<String>) -> Result<Node<'text>, Error> {
  Node::parse_named(text, name)
}

fn cow_static<T: ?Sized + ToOwned>(value: Cow<'_, T>) -> Cow<'static, T> {
  Cow::Owned(value.into_owned())
}
