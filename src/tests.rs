// SPDX-License-Identifier: MIT OR Apache-2.0
//! whole-document tests
use std::fmt::Write;

use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::{ErrorKind, Node, Position, Value, parse, parse_named};

fn init_tracing() {
	// RUST_LOG=sdlite=trace to see every token
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn dump_value(out: &mut String, value: &Value) {
	let _ = match value {
		Value::Null => write!(out, "null"),
		Value::String(text) => write!(out, "{text:?}"),
		Value::Int(number) => write!(out, "{number}"),
		Value::Float(number) => write!(out, "{number:?}"),
		Value::Bool(value) => write!(out, "{value}"),
		Value::DateTime(time) => write!(out, "{}", time.format("%Y/%m/%d %H:%M:%S%.3f")),
		Value::Duration(span) => write!(out, "{}ms", span.num_milliseconds()),
		Value::Binary(bytes) => {
			out.push('[');
			for byte in bytes {
				let _ = write!(out, "{byte:02x}");
			}
			write!(out, "]")
		}
	};
}

/// stable text form, attributes sorted by key
fn dump_node(out: &mut String, node: &Node, depth: usize) {
	out.push_str(&"  ".repeat(depth));
	out.push_str(&node.qualified_name());
	for value in &node.values {
		out.push(' ');
		dump_value(out, value);
	}
	let mut keys = node.attributes.keys().collect::<Vec<_>>();
	keys.sort();
	for key in keys {
		let _ = write!(out, " {key}=");
		dump_value(out, &node.attributes[key].value);
	}
	if node.children.is_empty() {
		out.push('\n');
	} else {
		out.push_str(" {\n");
		for child in &node.children {
			dump_node(out, child, depth + 1);
		}
		out.push_str(&"  ".repeat(depth));
		out.push_str("}\n");
	}
}

fn dump(root: &Node) -> String {
	let mut out = String::new();
	for child in &root.children {
		dump_node(&mut out, child, 0);
	}
	out
}

enum Expect {
	Equal(&'static str),
	Fail(ErrorKind),
}

use Expect::{Equal, Fail};

fn run(input: &str, expect: Expect) {
	init_tracing();
	match (parse(input), expect) {
		(Ok(root), Equal(output)) => {
			assert!(root.values.is_empty() && root.attributes.is_empty());
			assert_eq!(dump(&root), output);
		}
		(Err(err), Fail(kind)) => assert_eq!(err.kind, kind, "{err}"),
		(Ok(root), Fail(kind)) => panic!("expected {kind:?}, parsed:\n{}", dump(&root)),
		(Err(err), Equal(_)) => panic!("{}", err.render(input, false)),
	}
}

macro_rules! test_case {
	($name:ident, $input:expr, $expect:expr $(,)?) => {
		#[test]
		fn $name() {
			run($input, $expect);
		}
	};
}

test_case! { empty, "", Equal("") }
test_case! { only_whitespace, " \t\n\r\n\n  \n", Equal("") }
test_case! { only_comments, "# one\n// two\n-- three", Equal("") }
test_case! { bare_tag, "my_tag\n", Equal("my_tag\n") }
test_case! { name_value_pairs,
	"first_name \"Akiko\"\nheight 68\n",
	Equal("first_name \"Akiko\"\nheight 68\n"),
}
test_case! { values_and_attributes,
	"person \"Akiko\" \"Johnson\" height=60\n",
	Equal("person \"Akiko\" \"Johnson\" height=60\n"),
}
test_case! { attribute_last_write_wins, "t a=1 a=2", Equal("t a=2\n") }
test_case! { namespaces,
	"ns:t ns:a=1 b=true\n",
	Equal("ns:t b=true ns:a=1\n"),
}
test_case! { keywords, "t true on false off null", Equal("t true true false false null\n") }
test_case! { keyword_line, "on\n", Equal("content true\n") }
test_case! { numbers,
	"n 123 123.456 -123 -123.456 123L 123.4F 2D",
	Equal("n 123 123.456 -123 -123.456 123 123.4 2.0\n"),
}
test_case! { date, "d 1111/12/01", Equal("d 1111/12/01 00:00:00.000\n") }
test_case! { date_time, "d 1111/12/01 11:22:33.456", Equal("d 1111/12/01 11:22:33.456\n") }
test_case! { date_time_without_millis, "d 2005/11/23 10:14:23 x=1", Equal("d 2005/11/23 10:14:23.000 x=1\n") }
test_case! { time_spans,
	"s -55d:11:22:33.444 -00:02:30 1d:00:00:00",
	Equal("s -4792953444ms -150000ms 86400000ms\n"),
}
test_case! { binary, "b [aGVs\n bG8=] []", Equal("b [68656c6c6f] []\n") }
test_case! { strings,
	"s \"a\\tb\" `raw \\t\nline` \"joined \\\n    here\"",
	Equal("s \"a\\tb\" \"raw \\\\t\\nline\" \"joined here\"\n"),
}
test_case! { continuation, "t 1 \\\n  2\nu", Equal("t 1 2\nu\n") }
test_case! { crlf, "a 1\r\nb {\r\n  c\r\n}\r\n", Equal("a 1\nb {\n  c\n}\n") }
test_case! { nested_block,
	"tag \"a\" {\n  child 1\n}\n",
	Equal("tag \"a\" {\n  child 1\n}\n"),
}
test_case! { content_block,
	"list {\n  \"x\" \"y\"\n  [AAE=]\n}\n",
	Equal("list {\n  content \"x\" \"y\"\n  content [0001]\n}\n"),
}
test_case! { trailing_space_after_brace, "t {   \n  c\n}   \n", Equal("t {\n  c\n}\n") }
test_case! { empty_block, "t {\n}\n", Equal("t\n") }

test_case! { fail_missing_equals, "t no:equals", Fail(ErrorKind::MissingEquals) }
test_case! { fail_missing_attribute_value, "t a=\n", Fail(ErrorKind::MissingAttributeValue) }
test_case! { fail_unterminated_string, "t \"abc\nu", Fail(ErrorKind::UnterminatedString) }
test_case! { fail_unterminated_raw_string, "t `abc", Fail(ErrorKind::UnterminatedString) }
test_case! { fail_invalid_escape, "t \"\\x\"", Fail(ErrorKind::InvalidEscape) }
test_case! { fail_raw_carriage_return, "t `a\rb`", Fail(ErrorKind::CarriageReturnInRawString) }
test_case! { fail_stray_carriage_return, "t\ru", Fail(ErrorKind::MalformedNewline) }
test_case! { fail_unterminated_binary, "t [abc", Fail(ErrorKind::UnterminatedBinary) }
test_case! { fail_invalid_binary, "t [a]", Fail(ErrorKind::InvalidBinary) }
test_case! { fail_decimal_points, "t 2..3", Fail(ErrorKind::MultipleDecimalPoints) }
test_case! { fail_trailing_garbage, "t 3b", Fail(ErrorKind::TrailingGarbageAfterNumber) }
test_case! { fail_out_of_range, "t 99999999999999999999", Fail(ErrorKind::NumberOutOfRange) }
test_case! { fail_date, "t 1111/1/11", Fail(ErrorKind::MalformedDate) }
test_case! { fail_date_time, "t 1111/12/01 11:2x:00", Fail(ErrorKind::MalformedDateTime) }
test_case! { fail_time_span, "t 1:00:00", Fail(ErrorKind::MalformedTimeSpan) }
test_case! { fail_brace_own_line, "t\n{\n}", Fail(ErrorKind::BraceNotOnTagLine) }
test_case! { fail_brace_one_line, "t { 1\n}", Fail(ErrorKind::ExpectedNewlineAfterBrace) }
test_case! { fail_close_brace_not_alone, "t {\n  c 1 }\n", Fail(ErrorKind::CloseBraceNotAlone) }
test_case! { fail_after_close_brace, "t {\n} 1", Fail(ErrorKind::ExpectedNewlineAfterCloseBrace) }
test_case! { fail_unmatched_close_brace, "t\n}\n", Fail(ErrorKind::UnmatchedCloseBrace) }
test_case! { fail_unterminated_block, "t {\n  c {\n  }\n", Fail(ErrorKind::UnterminatedBlock) }
test_case! { fail_unexpected_character, "t @", Fail(ErrorKind::UnexpectedCharacter) }

const DOCUMENT: &str = r#"# a tag having only a name
	my_tag

	# three tags acting as name value pairs
	first_name "Akiko"
	last_name "Johnson"
	height 68

	# a tag with a value list
	person "Akiko" "Johnson" 68

	# a tag with attributes
	person first_name="Akiko" last_name="Johnson" height=68

	# a tag with values and attributes
	person "Akiko" "Johnson" height=60

	# a tag with attributes using namespaces
	person name:first-name="Akiko" name:last-name="Johnson"

	# a tag with values, attributes, namespaces, and children
	my_namespace:person "Akiko" "Johnson" dimensions:height=68 {
		son "Nouhiro" "Johnson"
		daughter "Sabrina" "Johnson" location="Italy" {
			hobbies "swimming" "surfing"
			languages "English" "Italian"
			smoker false
		}
	}

	------------------------------------------------------------------
	// (notice the separator style comment above...)

	# a log entry
	#     note - this tag has two values (date_time and string) and an
	#            attribute (error)
	entry 2005/11/23 10:14:23.253 "Something bad happened" error=true

	# a long line
	mylist "something" "another" true "shoe" 2002/12/13 "rock" \
		"morestuff" "sink" "penny" 12:15:23.425

	# a long string
	text "this is a long rambling line of text with a continuation \
	   and it keeps going and going..."

	# anonymous tag examples

	files {
		"/folder1/file.txt"
		"/file2.txt"
	}

	# the files tag has two anonymous children named "content"

	matrix {
		1 2 3
		4 5 6
	}

	# rows of the matrix are "content" children too"#;

#[test]
fn sample_document() {
	init_tracing();
	let root = parse(DOCUMENT).unwrap();
	assert_eq!(root.children.len(), 14);
	assert_eq!(root.children[0].name(), "my_tag");

	let first_name = &root.children[1];
	assert_eq!(first_name.name(), "first_name");
	assert_eq!(first_name.values, [Value::from("Akiko")]);
	assert_eq!(root.children[2].values[0].as_str(), Ok("Johnson"));
	assert_eq!(root.children[3].values[0].as_int(), Ok(68));

	assert_eq!(root.children[5].attribute("first_name"), Some(&Value::from("Akiko")));
	assert_eq!(root.children[7].attribute("name:last-name"), Some(&Value::from("Johnson")));

	let person = &root.children[8];
	assert_eq!(person.qualified_name(), "my_namespace:person");
	assert_eq!(person.attribute("dimensions:height"), Some(&Value::Int(68)));
	assert_eq!(person.children.len(), 2);
	let daughter = person.child("daughter").unwrap();
	assert_eq!(daughter.attribute("location"), Some(&Value::from("Italy")));
	assert_eq!(daughter.children.len(), 3);
	assert_eq!(daughter.child("smoker").map(|node| &node.values[..]), Some(&[Value::Bool(false)][..]));

	let entry = &root.children[9];
	assert_eq!(entry.name(), "entry");
	let mut text = String::new();
	dump_value(&mut text, &entry.values[0]);
	assert_eq!(text, "2005/11/23 10:14:23.253");
	assert_eq!(entry.attribute("error"), Some(&Value::Bool(true)));

	let mylist = &root.children[10];
	assert_eq!(mylist.values.len(), 10);
	assert!(mylist.values[4].is_date_time());
	assert!(mylist.values[9].is_duration());

	assert_eq!(
		root.children[11].values[0].as_str(),
		Ok("this is a long rambling line of text with a continuation and it keeps going and going...")
	);

	let files = root.child("files").unwrap();
	let files = files
		.children_named("content")
		.map(|node| node.values[0].as_str().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(files, ["/folder1/file.txt", "/file2.txt"]);

	let matrix = root.child("matrix").unwrap();
	let rows = matrix
		.children
		.iter()
		.map(|row| row.values.iter().map(|cell| cell.as_int().unwrap()).collect::<Vec<_>>())
		.collect::<Vec<_>>();
	assert_eq!(rows, [[1, 2, 3], [4, 5, 6]]);
}

#[test]
fn error_position() {
	let text = "a 1\nb \"open\nc 2\n";
	let err = parse(text).unwrap_err();
	assert_eq!(err.kind, ErrorKind::UnterminatedString);
	assert_eq!(err.position(text), Position {
		offset: 6,
		line: 2,
		column: 3,
	});
	let end = err.secondary.as_ref().map(|label| Position::locate(text, label.offset));
	assert_eq!(end.map(|pos| (pos.line, pos.column)), Some((2, 8)));
}

#[test]
fn error_render() {
	let text = "server {\n  port 80\n";
	let err = parse_named(text, "server.sdl").unwrap_err();
	assert_eq!(err.kind, ErrorKind::UnterminatedBlock);
	let rendered = err.render(text, false);
	assert!(rendered.contains("server.sdl"), "{rendered}");
	assert!(rendered.contains("This block is never closed"), "{rendered}");
}

#[test]
fn owned_tree() {
	let root = {
		let text = String::from("t \"borrowed\" k=`raw`\n");
		parse(&text).unwrap().into_owned()
	};
	assert_eq!(root.children[0].values[0].as_str(), Ok("borrowed"));
	assert_eq!(root.children[0].attribute("k").map(Value::as_str), Some(Ok("raw")));
}

#[derive(Debug, Clone)]
enum Piece {
	Plain(char),
	Escape(char),
	/// `\` newline, then indentation
	Join(String),
}

fn piece() -> impl Strategy<Value = Piece> {
	prop_oneof![
		any::<char>()
			.prop_filter("needs escaping", |ch| !matches!(ch, '"' | '\\' | '\n'))
			.prop_map(Piece::Plain),
		prop::sample::select(vec!['n', 't', 'r', '"', '\\']).prop_map(Piece::Escape),
		"[ \t]{0,4}".prop_map(Piece::Join),
	]
}

proptest! {
	#[test]
	fn whitespace_only(text in "([ \t\n]|\r\n)*") {
		let root = parse(&text).unwrap();
		prop_assert!(root.children.is_empty());
	}

	#[test]
	fn string_escapes(pieces in prop::collection::vec(piece(), 0..24)) {
		let mut source = String::from("t \"");
		let mut expected = String::new();
		// indentation after a join is dropped
		let mut joining = false;
		for piece in &pieces {
			match piece {
				Piece::Plain(ch) => {
					source.push(*ch);
					if !(joining && matches!(ch, ' ' | '\t')) {
						joining = false;
						expected.push(*ch);
					}
				}
				Piece::Escape(ch) => {
					joining = false;
					source.push('\\');
					source.push(*ch);
					expected.push(match ch {
						'n' => '\n',
						't' => '\t',
						'r' => '\r',
						other => *other,
					});
				}
				Piece::Join(indent) => {
					joining = true;
					source.push_str("\\\n");
					source.push_str(indent);
				}
			}
		}
		source.push('"');
		let root = parse(&source).unwrap();
		prop_assert_eq!(&root.children[0].values, &vec![Value::String(expected.into())]);
	}

	#[test]
	fn integers(number: i64) {
		let text = format!("t {number} {number}L");
		let root = parse(&text).unwrap();
		prop_assert_eq!(&root.children[0].values, &vec![Value::Int(number), Value::Int(number)]);
	}

	#[test]
	fn decimals(negative: bool, whole in 0_u32..1_000_000, fraction in "[0-9]{1,6}", suffix in "[FD]?") {
		let sign = if negative { "-" } else { "" };
		let literal = format!("{sign}{whole}.{fraction}");
		let source = format!("t {literal}{suffix}");
		let root = parse(&source).unwrap();
		let expected = literal.parse::<f64>().unwrap();
		prop_assert_eq!(&root.children[0].values, &vec![Value::Float(expected)]);
	}
}
