//! JSON text rendering.
//!
//! Output layout is fixed: `[ a, b ]`, `{ "k" : v }`, an empty container
//! renders as `[  ]` / `{  }`. String contents are written verbatim between
//! double quotes; embedded quotes are not escaped.

use std::fmt::Write;

use super::{DEFAULT_CONTENT_TYPE, Serializer, scanner};
use crate::error::CodecResult;
use crate::ogm::{Array, Field, Object, Value};

/// The JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        DEFAULT_CONTENT_TYPE
    }

    fn serialize_value(&self, value: &Value) -> String {
        let mut out = String::new();
        write_value(&mut out, value);
        out
    }

    fn serialize_array(&self, array: &Array) -> String {
        let mut out = String::new();
        write_array(&mut out, array);
        out
    }

    fn serialize_object(&self, object: &Object) -> String {
        let mut out = String::new();
        write_object(&mut out, object);
        out
    }

    fn serialize_field(&self, field: &Field) -> String {
        let mut out = String::new();
        write_field(&mut out, field);
        out
    }

    fn deserialize(&self, text: &str) -> CodecResult<Object> {
        scanner::parse_document(text)
    }

    fn deserialize_value(&self, text: &str) -> CodecResult<Value> {
        scanner::parse_value_text(text)
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Value::Real(v) => write_real(out, *v),
        Value::String(v) => {
            out.push('"');
            out.push_str(v);
            out.push('"');
        }
        Value::Array(v) => write_array(out, v),
        Value::Object(v) => write_object(out, v),
    }
}

// Finite reals always carry a '.' so they never read back as integers.
fn write_real(out: &mut String, v: f64) {
    let start = out.len();
    let _ = write!(out, "{v}");
    if v.is_finite() && !out[start..].contains('.') {
        out.push_str(".0");
    }
}

fn write_array(out: &mut String, array: &Array) {
    out.push_str("[ ");
    for (i, value) in array.values().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, value);
    }
    out.push_str(" ]");
}

fn write_object(out: &mut String, object: &Object) {
    out.push_str("{ ");
    for (i, field) in object.fields().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_field(out, field);
    }
    out.push_str(" }");
}

fn write_field(out: &mut String, field: &Field) {
    out.push('"');
    out.push_str(field.name());
    out.push_str("\" : ");
    write_value(out, field.value());
}
