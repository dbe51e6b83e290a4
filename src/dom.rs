// SPDX-License-Identifier: MIT OR Apache-2.0
//! document tree structures, start at [`Node::parse`]

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::cow_static;
use crate::diagnostic::{Error, ErrorKind};
use crate::stream::{TokenKind, Tokenizer};
use crate::value::Value;

/// `namespace:name`, or just `name` without a namespace
pub fn qualified_name<'a>(namespace: &str, name: &'a str) -> Cow<'a, str> {
  if namespace.is_empty() {
    Cow::Borrowed(name)
  } else {
    Cow::Owned(format!("{namespace}:{name}"))
  }
}

/// A named value on a tag, `namespace:name=value`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'text> {
  namespace: Cow<'text, str>,
  name: Cow<'text, str>,
  /// The attribute's value
  pub value: Value<'text>,
}

impl<'text> Attribute<'text> {
  /// Create a new attribute
  pub fn new(
    namespace: impl Into<Cow<'text, str>>,
    name: impl Into<Cow<'text, str>>,
    value: impl Into<Value<'text>>,
  ) -> Self {
    Self {
      namespace: namespace.into(),
      name: name.into(),
      value: value.into(),
    }
  }
  /// Convert into an owned value
  pub fn into_owned(self) -> Attribute<'static> {
    Attribute {
      namespace: cow_static(self.namespace),
      name: cow_static(self.name),
      value: self.value.into_owned(),
    }
  }
  pub fn namespace(&self) -> &str {
    &self.namespace
  }
  pub fn name(&self) -> &str {
    &self.name
  }
  /// The key this attribute is stored under
  pub fn qualified_name(&self) -> Cow<'_, str> {
    qualified_name(&self.namespace, &self.name)
  }
}

/// A tag, with its values, attributes and children
///
/// The root of a parsed document is a node with an empty name that only has
/// children.
#[derive(Default, Clone, PartialEq)]
pub struct Node<'text> {
  namespace: Cow<'text, str>,
  name: Cow<'text, str>,
  /// Child tags, in order
  pub children: Vec<Node<'text>>,
  /// Attributes by qualified name, a repeated name keeps the last value
  pub attributes: HashMap<String, Attribute<'text>>,
  /// Positional values, in order
  pub values: Vec<Value<'text>>,
}

impl<'text> Node<'text> {
  /// Create a node with no contents
  pub fn new(namespace: impl Into<Cow<'text, str>>, name: impl Into<Cow<'text, str>>) -> Self {
    Self {
      namespace: namespace.into(),
      name: name.into(),
      ..Self::default()
    }
  }
  /// Parse a whole document, returning the root node
  pub fn parse(text: &'text str) -> Result<Self, Error> {
    Builder::new(Tokenizer::new(text)).run()
  }
  /// [`parse`](Self::parse) with a display name attached to any error
  pub fn parse_named(text: &'text str, name: impl Into<String>) -> Result<Self, Error> {
    Builder::new(Tokenizer::new(text).with_name(name)).run()
  }
  /// Convert into an owned value
  pub fn into_owned(self) -> Node<'static> {
    Node {
      namespace: cow_static(self.namespace),
      name: cow_static(self.name),
      children: self.children.into_iter().map(Node::into_owned).collect(),
      attributes: self
        .attributes
        .into_iter()
        .map(|(key, attribute)| (key, attribute.into_owned()))
        .collect(),
      values: self.values.into_iter().map(Value::into_owned).collect(),
    }
  }
  pub fn namespace(&self) -> &str {
    &self.namespace
  }
  pub fn name(&self) -> &str {
    &self.name
  }
  pub fn qualified_name(&self) -> Cow<'_, str> {
    qualified_name(&self.namespace, &self.name)
  }
  /// Value of the attribute with this qualified name
  pub fn attribute(&self, qualified_name: &str) -> Option<&Value<'text>> {
    self.attributes.get(qualified_name).map(|attribute| &attribute.value)
  }
  /// Set an attribute, replacing any with the same qualified name
  pub fn set_attribute(&mut self, attribute: Attribute<'text>) {
    self.attributes.insert(attribute.qualified_name().into_owned(), attribute);
  }
  /// Iterator over every child passing `filter`
  pub fn children_where<F: FnMut(&Node<'text>) -> bool>(&self, mut filter: F) -> impl Iterator<Item = &Node<'text>> {
    self.children.iter().filter(move |node| filter(*node))
  }
  /// Iterator over every child with a particular name, namespace ignored
  pub fn children_named(&self, name: &str) -> impl Iterator<Item = &Node<'text>> {
    self.children_where(move |node| node.name() == name)
  }
  /// Iterator over every child in a particular namespace
  pub fn children_in_namespace(&self, namespace: &str) -> impl Iterator<Item = &Node<'text>> {
    self.children_where(move |node| node.namespace() == namespace)
  }
  /// First child with a particular name
  pub fn child(&self, name: &str) -> Option<&Node<'text>> {
    self.children_named(name).next()
  }
}

impl fmt::Debug for Node<'_> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Node")
      .field("name", &self.qualified_name())
      .field("values", &self.values)
      .field("attributes", &self.attributes)
      .field("children", &self.children)
      .finish()
  }
}

/// A node still on the parse stack
struct Frame<'text> {
  node: Node<'text>,
  /// offset of the `{` this node opened, if any
  brace: Option<usize>,
}

struct Builder<'text> {
  tokens: Tokenizer<'text>,
  /// `stack[0]` is the root and is never popped
  stack: Vec<Frame<'text>>,
  prev_was_newline: bool,
}

impl<'text> Builder<'text> {
  fn new(tokens: Tokenizer<'text>) -> Self {
    Self {
      tokens,
      stack: vec![Frame {
        node: Node::default(),
        brace: None,
      }],
      prev_was_newline: true,
    }
  }
  fn fail(&self, kind: ErrorKind, offset: usize, message: &str) -> Error {
    Error::new(kind, offset, message).with_name(self.tokens.name().map(str::to_owned))
  }
  fn top(&mut self) -> &mut Node<'text> {
    let last = self.stack.len() - 1;
    &mut self.stack[last].node
  }
  /// pop the top node into its parent
  fn close(&mut self) {
    if self.stack.len() < 2 {
      return;
    }
    if let Some(frame) = self.stack.pop() {
      debug!(name = %frame.node.qualified_name(), depth = self.stack.len(), "close node");
      self.top().children.push(frame.node);
    }
  }
  fn run(mut self) -> Result<Node<'text>, Error> {
    loop {
      self.tokens.advance()?;
      let offset = self.tokens.offset();
      match self.tokens.kind() {
        TokenKind::TagName => {
          if !self.prev_was_newline {
            return Err(self.fail(
              ErrorKind::TagNameNotAtLineStart,
              offset,
              "A tag name has to be at the start of a line",
            ));
          }
          let namespace = self.tokens.namespace();
          let node = Node::new(namespace, self.tokens.take_text());
          debug!(name = %node.qualified_name(), depth = self.stack.len(), "open node");
          self.stack.push(Frame { node, brace: None });
          self.prev_was_newline = false;
        }
        TokenKind::AttributeName => {
          let namespace = self.tokens.namespace();
          let name = self.tokens.take_text();
          self.tokens.advance()?;
          let value = decode_value(&mut self.tokens);
          self.top().set_attribute(Attribute::new(namespace, name, value));
          self.prev_was_newline = false;
        }
        TokenKind::NewLine => {
          if !self.prev_was_newline {
            self.close();
          }
          self.prev_was_newline = true;
        }
        TokenKind::OpenBrace => {
          if self.prev_was_newline {
            return Err(self.fail(
              ErrorKind::BraceNotOnTagLine,
              offset,
              "An opening brace has to be on the same line as its tag",
            ));
          }
          if let Some(frame) = self.stack.last_mut() {
            frame.brace = Some(offset);
          }
          self.tokens.advance()?;
          if self.tokens.kind() != TokenKind::NewLine {
            return Err(self.fail(
              ErrorKind::ExpectedNewlineAfterBrace,
              self.tokens.offset(),
              "Expected a newline after '{'",
            ));
          }
          debug!(depth = self.stack.len() - 1, "open block");
          self.prev_was_newline = true;
        }
        TokenKind::CloseBrace => {
          if !self.prev_was_newline {
            return Err(self.fail(
              ErrorKind::CloseBraceNotAlone,
              offset,
              "A closing brace has to be on a line of its own",
            ));
          }
          if self.stack.len() < 2 {
            return Err(self.fail(
              ErrorKind::UnmatchedCloseBrace,
              offset,
              "This '}' does not close any block",
            ));
          }
          self.tokens.advance()?;
          if !matches!(self.tokens.kind(), TokenKind::NewLine | TokenKind::EndOfInput) {
            return Err(self.fail(
              ErrorKind::ExpectedNewlineAfterCloseBrace,
              self.tokens.offset(),
              "Expected a newline after '}'",
            ));
          }
          self.close();
          self.prev_was_newline = true;
          if self.tokens.kind() == TokenKind::EndOfInput {
            return self.finish();
          }
        }
        TokenKind::EndOfInput => return self.finish(),
        _ => {
          let value = decode_value(&mut self.tokens);
          self.top().values.push(value);
          self.prev_was_newline = false;
        }
      }
    }
  }
  fn finish(mut self) -> Result<Node<'text>, Error> {
    if !self.prev_was_newline {
      self.close();
    }
    if let Some(brace) = self.stack.last().and_then(|frame| frame.brace) {
      let err = self.fail(
        ErrorKind::UnterminatedBlock,
        self.tokens.offset(),
        "Expected a '}' before the end of input",
      );
      return Err(err.with_secondary(brace, "This block is never closed"));
    }
    debug!(children = self.stack.first().map_or(0, |root| root.node.children.len()), "document done");
    Ok(self.stack.into_iter().next().map(|root| root.node).unwrap_or_default())
  }
}

/// Build a [`Value`] from the current token, which has to be a literal
fn decode_value<'text>(tokens: &mut Tokenizer<'text>) -> Value<'text> {
  let kind = tokens.kind();
  let value = match kind {
    TokenKind::Null => Some(Value::Null),
    TokenKind::String => Some(Value::String(tokens.take_text())),
    TokenKind::Integer | TokenKind::Long => tokens.integer().map(Value::Int),
    TokenKind::Float | TokenKind::Double => tokens.float().map(Value::Float),
    TokenKind::Bool => tokens.boolean().map(Value::Bool),
    TokenKind::Date | TokenKind::DateTime => tokens.date_time().map(Value::DateTime),
    TokenKind::TimeSpan => tokens.duration().map(Value::Duration),
    TokenKind::Binary => tokens.take_binary().map(Value::Binary),
    _ => None,
  };
  value.unwrap_or_else(|| unreachable!("{kind:?} token in value position at offset {}", tokens.offset()))
}
