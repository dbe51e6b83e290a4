// SPDX-License-Identifier: MIT OR Apache-2.0
//! literal values, see [`Value`]

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::cow_static;

/// A value was read as the wrong variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected a {expected} value, found {found}")]
pub struct TypeMismatch {
  /// The variant that was asked for
  pub expected: &'static str,
  /// The variant that is actually stored
  pub found: &'static str,
}

/// A literal value, either positional on a tag or the right side of an attribute
#[derive(Clone, PartialEq)]
pub enum Value<'text> {
  /// `null`
  Null,
  /// A double-quoted or backtick string
  String(Cow<'text, str>),
  /// An integer, with or without the `L` suffix
  Int(i64),
  /// A decimal number, with or without the `F`/`D` suffixes
  Float(f64),
  /// A date or date-time, always UTC, millisecond precision
  DateTime(DateTime<Utc>),
  /// A signed time span, millisecond precision
  Duration(TimeDelta),
  /// `true`/`on` or `false`/`off`
  Bool(bool),
  /// A decoded `[base64]` literal
  Binary(Vec<u8>),
}

impl Value<'_> {
  /// Convert into an owned value
  pub fn into_owned(self) -> Value<'static> {
    match self {
      Self::Null => Value::Null,
      Self::String(value) => Value::String(cow_static(value)),
      Self::Int(value) => Value::Int(value),
      Self::Float(value) => Value::Float(value),
      Self::DateTime(value) => Value::DateTime(value),
      Self::Duration(value) => Value::Duration(value),
      Self::Bool(value) => Value::Bool(value),
      Self::Binary(value) => Value::Binary(value),
    }
  }
  /// Name of the active variant, as used in [`TypeMismatch`]
  pub fn kind_name(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::String(_) => "string",
      Self::Int(_) => "integer",
      Self::Float(_) => "float",
      Self::DateTime(_) => "date-time",
      Self::Duration(_) => "duration",
      Self::Bool(_) => "bool",
      Self::Binary(_) => "binary",
    }
  }
  fn mismatch(&self, expected: &'static str) -> TypeMismatch {
    TypeMismatch {
      expected,
      found: self.kind_name(),
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Self::Null)
  }
  pub fn is_string(&self) -> bool {
    matches!(self, Self::String(_))
  }
  pub fn is_int(&self) -> bool {
    matches!(self, Self::Int(_))
  }
  pub fn is_float(&self) -> bool {
    matches!(self, Self::Float(_))
  }
  pub fn is_date_time(&self) -> bool {
    matches!(self, Self::DateTime(_))
  }
  pub fn is_duration(&self) -> bool {
    matches!(self, Self::Duration(_))
  }
  pub fn is_bool(&self) -> bool {
    matches!(self, Self::Bool(_))
  }
  pub fn is_binary(&self) -> bool {
    matches!(self, Self::Binary(_))
  }

  /// Read a string value
  pub fn as_str(&self) -> Result<&str, TypeMismatch> {
    match self {
      Self::String(value) => Ok(value),
      _ => Err(self.mismatch("string")),
    }
  }
  /// Read an integer value
  pub fn as_int(&self) -> Result<i64, TypeMismatch> {
    match *self {
      Self::Int(value) => Ok(value),
      _ => Err(self.mismatch("integer")),
    }
  }
  /// Read a float value, integers are not widened
  pub fn as_float(&self) -> Result<f64, TypeMismatch> {
    match *self {
      Self::Float(value) => Ok(value),
      _ => Err(self.mismatch("float")),
    }
  }
  /// Read a date or date-time value
  pub fn as_date_time(&self) -> Result<DateTime<Utc>, TypeMismatch> {
    match *self {
      Self::DateTime(value) => Ok(value),
      _ => Err(self.mismatch("date-time")),
    }
  }
  /// Read a duration value
  pub fn as_duration(&self) -> Result<TimeDelta, TypeMismatch> {
    match *self {
      Self::Duration(value) => Ok(value),
      _ => Err(self.mismatch("duration")),
    }
  }
  /// Read a bool value
  pub fn as_bool(&self) -> Result<bool, TypeMismatch> {
    match *self {
      Self::Bool(value) => Ok(value),
      _ => Err(self.mismatch("bool")),
    }
  }
  /// Read the bytes of a binary value
  pub fn as_binary(&self) -> Result<&[u8], TypeMismatch> {
    match self {
      Self::Binary(value) => Ok(value),
      _ => Err(self.mismatch("binary")),
    }
  }
}

impl fmt::Debug for Value<'_> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Null => f.write_str("null"),
      Self::String(value) => fmt::Debug::fmt(&**value, f),
      Self::Int(value) => fmt::Debug::fmt(value, f),
      Self::Float(value) => fmt::Debug::fmt(value, f),
      Self::DateTime(value) => write!(f, "DateTime({value:?})"),
      Self::Duration(value) => write!(f, "Duration({value:?})"),
      Self::Bool(value) => fmt::Debug::fmt(value, f),
      Self::Binary(value) => write!(f, "Binary({} bytes)", value.len()),
    }
  }
}

impl<'text> From<&'text str> for Value<'text> {
  fn from(value: &'text str) -> Self {
    Self::String(Cow::Borrowed(value))
  }
}
impl From<String> for Value<'_> {
  fn from(value: String) -> Self {
    Self::String(Cow::Owned(value))
  }
}
impl From<i64> for Value<'_> {
  fn from(value: i64) -> Self {
    Self::Int(value)
  }
}
impl From<f64> for Value<'_> {
  fn from(value: f64) -> Self {
    Self::Float(value)
  }
}
impl From<bool> for Value<'_> {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}
impl From<DateTime<Utc>> for Value<'_> {
  fn from(value: DateTime<Utc>) -> Self {
    Self::DateTime(value)
  }
}
impl From<TimeDelta> for Value<'_> {
  fn from(value: TimeDelta) -> Self {
    Self::Duration(value)
  }
}
impl From<Vec<u8>> for Value<'_> {
  fn from(value: Vec<u8>) -> Self {
    Self::Binary(value)
  }
}
impl From<()> for Value<'_> {
  fn from((): ()) -> Self {
    Self::Null
  }
}
impl<'text, T: Into<Value<'text>>> From<Option<T>> for Value<'text> {
  fn from(value: Option<T>) -> Self {
    match value {
      Some(v) => v.into(),
      _ => Self::Null,
    }
  }
}
