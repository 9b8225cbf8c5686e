//! Bracket and quote aware scanner that turns JSON text into a tree.
//!
//! Each container level is split into element tokens in one left-to-right
//! pass. A stack of open brackets tracks nesting, a flag tracks whether the
//! cursor is inside a quoted string. Commas only separate elements at the
//! current level and outside quotes; whitespace outside quotes is dropped.
//!
//! Tokens are classified in a fixed order: array, object, integer, real,
//! string. Anything that is not a container and does not parse as a number
//! becomes a string.
//!
//! Containers nest at most [`MAX_DEPTH`] levels, the root counting as one.

use crate::error::{CodecError, CodecResult};
use crate::ogm::{Array, Field, Object, Value};

/// Deepest container nesting the scanner accepts.
pub(crate) const MAX_DEPTH: usize = 128;

/// A whitespace-stripped element of a container and where it started.
struct Token {
    text: String,
    offset: usize,
}

/// Parses a document whose root must be an object.
pub(crate) fn parse_document(text: &str) -> CodecResult<Object> {
    let trimmed = text.trim_start();
    let offset = text.len() - trimmed.len();
    if !trimmed.starts_with('{') {
        return Err(CodecError::malformed(
            "document root must be an object",
            offset,
        ));
    }
    parse_object(trimmed, offset, 1)
}

/// Parses any value, allowing surrounding whitespace.
pub(crate) fn parse_value_text(text: &str) -> CodecResult<Value> {
    let trimmed = text.trim_start();
    let offset = text.len() - trimmed.len();
    match trimmed.chars().next() {
        Some('[') => parse_array(trimmed, offset, 1).map(Value::Array),
        Some('{') => parse_object(trimmed, offset, 1).map(Value::Object),
        _ => classify(trimmed.trim_end(), offset),
    }
}

fn parse_value(token: &str, offset: usize, depth: usize) -> CodecResult<Value> {
    if token.starts_with('[') {
        parse_array(token, offset, depth + 1).map(Value::Array)
    } else if token.starts_with('{') {
        parse_object(token, offset, depth + 1).map(Value::Object)
    } else {
        classify(token, offset)
    }
}

fn classify(token: &str, offset: usize) -> CodecResult<Value> {
    if token.is_empty() {
        return Err(CodecError::malformed("missing value", offset));
    }
    if let Ok(v) = token.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = token.parse::<f64>() {
        return Ok(Value::Real(v));
    }
    Ok(Value::String(unquote(token).to_string()))
}

fn unquote(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

fn check_depth(depth: usize, offset: usize) -> CodecResult<()> {
    if depth > MAX_DEPTH {
        return Err(CodecError::malformed("nesting too deep", offset));
    }
    Ok(())
}

fn parse_array(text: &str, offset: usize, depth: usize) -> CodecResult<Array> {
    check_depth(depth, offset)?;
    split_elements(text, offset)?
        .into_iter()
        .map(|token| parse_value(&token.text, token.offset, depth))
        .collect()
}

fn parse_object(text: &str, offset: usize, depth: usize) -> CodecResult<Object> {
    check_depth(depth, offset)?;
    split_elements(text, offset)?
        .into_iter()
        .map(|token| parse_field(&token.text, token.offset, depth))
        .collect()
}

fn parse_field(token: &str, offset: usize, depth: usize) -> CodecResult<Field> {
    let mut in_string = false;
    let colon = token.char_indices().find_map(|(i, c)| match c {
        '"' => {
            in_string = !in_string;
            None
        }
        ':' if !in_string => Some(i),
        _ => None,
    });

    let Some(colon) = colon else {
        return Err(CodecError::malformed("field is missing ':'", offset));
    };

    let name = &token[..colon];
    if name.len() < 2 || !name.starts_with('"') || !name.ends_with('"') {
        return Err(CodecError::malformed("field name must be quoted", offset));
    }

    let value = parse_value(&token[colon + 1..], offset + colon + 1, depth)?;
    Ok(Field::new(&name[1..name.len() - 1], value))
}

const fn closing_for(open: char) -> char {
    if open == '[' { ']' } else { '}' }
}

/// Splits the container starting at `text[0]` into its element tokens.
fn split_elements(text: &str, offset: usize) -> CodecResult<Vec<Token>> {
    let mut chars = text.char_indices();
    let root = match chars.next() {
        Some((_, c @ ('[' | '{'))) => c,
        _ => return Err(CodecError::malformed("expected '[' or '{'", offset)),
    };

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = offset;
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut closed = false;

    let mut flush = |current: &mut String, start: usize, last: bool| -> CodecResult<()> {
        if current.is_empty() {
            // `[  ]` and `{  }` are the only places an empty token is allowed
            if last && tokens.is_empty() {
                return Ok(());
            }
            return Err(CodecError::malformed("empty element", start));
        }
        tokens.push(Token {
            text: std::mem::take(current),
            offset: start,
        });
        Ok(())
    };

    for (i, c) in chars {
        let at = offset + i;

        if closed {
            if !c.is_whitespace() {
                return Err(CodecError::malformed(
                    "unexpected content after closing bracket",
                    at,
                ));
            }
            continue;
        }

        if in_string {
            current.push(c);
            if c == '"' {
                in_string = false;
            }
            continue;
        }

        if current.is_empty() && !c.is_whitespace() {
            start = at;
        }

        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '[' | '{' => {
                stack.push(c);
                current.push(c);
            }
            ']' | '}' => match stack.pop() {
                Some(open) if closing_for(open) == c => current.push(c),
                Some(open) => {
                    return Err(CodecError::malformed(
                        format!("expected '{}' but found '{c}'", closing_for(open)),
                        at,
                    ));
                }
                None if closing_for(root) == c => {
                    flush(&mut current, start, true)?;
                    closed = true;
                }
                None => {
                    return Err(CodecError::malformed(
                        format!("expected '{}' but found '{c}'", closing_for(root)),
                        at,
                    ));
                }
            },
            ',' if stack.is_empty() => flush(&mut current, start, false)?,
            c if c.is_whitespace() => {}
            _ => current.push(c),
        }
    }

    if in_string {
        return Err(CodecError::malformed("unterminated string", offset + text.len()));
    }
    if !closed {
        return Err(CodecError::malformed(
            format!("missing '{}'", closing_for(root)),
            offset + text.len(),
        ));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(text: &str) -> String {
        match parse_document(text) {
            Err(CodecError::MalformedDocument { reason, .. }) => reason,
            Ok(object) => panic!("expected an error, parsed {object:?}"),
        }
    }

    #[test]
    fn nested_array_field() {
        let object = parse_document(r#"{ "a" : 1, "b" : [ 1, 2, 3 ] }"#).unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object.get("a"), Some(&Value::Int(1)));

        let array = object.field(1).value().as_array().unwrap();
        let items: Vec<_> = array.values().cloned().collect();
        assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn comma_inside_quotes_does_not_split() {
        let object = parse_document(r#"{ "n" : "a,b" }"#).unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object.get("n").and_then(Value::as_str), Some("a,b"));
    }

    #[test]
    fn whitespace_inside_quotes_is_kept() {
        let object = parse_document("{\n\t\"my key\" :  \"two  words\"\n}").unwrap();
        assert_eq!(object.get("my key").and_then(Value::as_str), Some("two  words"));
    }

    #[test]
    fn brackets_and_colons_inside_quotes_are_literal() {
        let object = parse_document(r#"{ "url" : "http://x/[a]{b}", "k:v" : 1 }"#).unwrap();
        assert_eq!(
            object.get("url").and_then(Value::as_str),
            Some("http://x/[a]{b}")
        );
        assert_eq!(object.get("k:v"), Some(&Value::Int(1)));
    }

    #[test]
    fn classification_order() {
        let object =
            parse_document(r#"{ "i" : -4, "r" : 2.5, "e" : 1e3, "s" : "5", "bare" : true }"#)
                .unwrap();
        assert_eq!(object.get("i"), Some(&Value::Int(-4)));
        assert_eq!(object.get("r"), Some(&Value::Real(2.5)));
        assert_eq!(object.get("e"), Some(&Value::Real(1000.0)));
        // a quoted number is a string
        assert_eq!(object.get("s"), Some(&Value::String("5".into())));
        assert_eq!(object.get("bare"), Some(&Value::String("true".into())));
    }

    #[test]
    fn malformed_numbers_fall_through_to_string() {
        let object = parse_document(r#"{ "v" : 12abc }"#).unwrap();
        assert_eq!(object.get("v"), Some(&Value::String("12abc".into())));
    }

    #[test]
    fn empty_containers() {
        let object = parse_document(r#"{ "a" : [  ], "o" : {  } }"#).unwrap();
        assert_eq!(object.get("a"), Some(&Value::Array(Array::new())));
        assert_eq!(object.get("o"), Some(&Value::Object(Object::new())));
        assert!(parse_document("{}").unwrap().is_empty());
    }

    #[test]
    fn deeply_nested() {
        let object = parse_document(r#"{ "x" : [ [ 1, [ 2 ] ], { "y" : { "z" : [ ] } } ] }"#)
            .unwrap();
        let outer = object.get("x").and_then(Value::as_array).unwrap();
        assert_eq!(outer.len(), 2);
        let first = outer.value(0).as_array().unwrap();
        assert_eq!(first.value(1).as_array().unwrap().value(0), &Value::Int(2));
        let z = outer
            .value(1)
            .as_object()
            .and_then(|o| o.get("y"))
            .and_then(Value::as_object)
            .and_then(|o| o.get("z"))
            .and_then(Value::as_array)
            .unwrap();
        assert!(z.is_empty());
    }

    fn nested_arrays(levels: usize) -> String {
        format!(
            "{{ \"a\" : {}1{} }}",
            "[".repeat(levels),
            "]".repeat(levels)
        )
    }

    #[test]
    fn nesting_limit_is_inclusive() {
        // the root object is the first level
        let object = parse_document(&nested_arrays(MAX_DEPTH - 1)).unwrap();
        assert!(object.get("a").and_then(Value::as_array).is_some());

        assert_eq!(malformed(&nested_arrays(MAX_DEPTH)), "nesting too deep");
    }

    #[test]
    fn hostile_nesting_is_malformed() {
        assert_eq!(malformed(&nested_arrays(50_000)), "nesting too deep");

        let text = format!("{}1{}", "[".repeat(50_000), "]".repeat(50_000));
        assert!(matches!(
            parse_value_text(&text),
            Err(CodecError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn duplicate_names_keep_order() {
        let object = parse_document(r#"{ "d" : 1, "d" : 2 }"#).unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object.get("d"), Some(&Value::Int(1)));
    }

    #[test]
    fn root_must_be_object() {
        assert_eq!(malformed("[ 1 ]"), "document root must be an object");
        assert_eq!(malformed("42"), "document root must be an object");
        assert_eq!(malformed(""), "document root must be an object");
    }

    #[test]
    fn unbalanced_brackets_are_malformed() {
        assert_eq!(malformed(r#"{ "a" : [ 1, 2 }"#), "expected ']' but found '}'");
        assert_eq!(malformed(r#"{ "a" : 1"#), "missing '}'");
        assert_eq!(malformed(r#"{ "a" : [ 1 }"#), "expected ']' but found '}'");
        assert_eq!(
            malformed(r#"{ "a" : 1 } }"#),
            "unexpected content after closing bracket"
        );
    }

    #[test]
    fn structural_errors_are_malformed() {
        assert_eq!(malformed(r#"{ "a" : "open }"#), "unterminated string");
        assert_eq!(malformed(r#"{ "a" 1 }"#), "field is missing ':'");
        assert_eq!(malformed(r#"{ a : 1 }"#), "field name must be quoted");
        assert_eq!(malformed(r#"{ "a" : }"#), "missing value");
        assert_eq!(malformed(r#"{ "a" : 1, }"#), "empty element");
        assert_eq!(malformed(r#"{ , "a" : 1 }"#), "empty element");
    }

    #[test]
    fn error_offset_points_into_input() {
        let text = r#"{ "a" : [ 1, 2 }"#;
        let err = parse_document(text).unwrap_err();
        assert_eq!(&text[err.offset()..err.offset() + 1], "}");
    }

    #[test]
    fn value_entry_point() {
        assert_eq!(parse_value_text(" 12 ").unwrap(), Value::Int(12));
        assert_eq!(parse_value_text("\"x\"").unwrap(), Value::String("x".into()));
        assert_eq!(
            parse_value_text("[ 1, \"a\" ]").unwrap(),
            Value::Array(Array::from_iter([Value::Int(1), Value::from("a")]))
        );
        assert!(parse_value_text("").is_err());
    }
}
