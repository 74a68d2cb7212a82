//! Display rendering of console argument values.
//!
//! Rules are applied in order: primitives print their value, `undefined`
//! and `null` print their names, objects prefer the engine-provided
//! `description` over raw JSON, and anything else falls back to a JSON
//! serialization or a generic `[object X]` coercion. Rendering never fails.

use devtap_protocol::ConsoleArg;
use devtap_protocol::cdp::{ObjectPreview, PropertyPreview, RemoteObject};
use serde_json::Value;

/// Renders one typed protocol value as display text.
pub fn render_arg(arg: &RemoteObject) -> String {
    match arg.kind.as_str() {
        "string" => match &arg.value {
            Some(Value::String(s)) => s.clone(),
            Some(other) => value_text(other),
            None => arg.description.clone().unwrap_or_default(),
        },
        "number" | "boolean" | "bigint" => primitive_text(arg),
        "undefined" => "undefined".into(),
        "object" if arg.is_null() => "null".into(),
        _ => match &arg.description {
            Some(desc) => desc.clone(),
            None => serialize_or_coerce(arg),
        },
    }
}

/// Object-preferring rendering used by `%o` / `%O`.
///
/// Objects print their description when the engine supplied one, then a
/// rendering of their preview properties, then JSON. Primitives render as
/// with [`render_arg`].
pub fn render_object(arg: &RemoteObject) -> String {
    if !matches!(arg.kind.as_str(), "object" | "function") || arg.is_null() {
        return render_arg(arg);
    }
    if let Some(desc) = &arg.description {
        return desc.clone();
    }
    if let Some(preview) = &arg.preview {
        return render_preview(preview);
    }
    serialize_or_coerce(arg)
}

/// Renders an object preview the way DevTools abbreviates objects:
/// `{a: 1, b: "x"}` or `[1, 2, …]`.
pub fn render_preview(preview: &ObjectPreview) -> String {
    let is_array = preview.subtype.as_deref() == Some("array");
    let mut parts: Vec<String> = preview
        .properties
        .iter()
        .map(|prop| {
            let value = property_text(prop);
            if is_array {
                value
            } else {
                format!("{}: {value}", prop.name)
            }
        })
        .collect();
    if preview.overflow {
        parts.push("…".into());
    }

    let body = parts.join(", ");
    if is_array {
        format!("[{body}]")
    } else {
        format!("{{{body}}}")
    }
}

fn property_text(prop: &PropertyPreview) -> String {
    match (prop.kind.as_str(), &prop.value) {
        ("string", Some(v)) => format!("\"{v}\""),
        (_, Some(v)) => v.clone(),
        ("undefined", None) => "undefined".into(),
        (kind, None) => kind.to_string(),
    }
}

/// Renders a resolved JSON value: containers as indented JSON, strings
/// unquoted, everything else in its JSON text form.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => value_text(other),
    }
}

/// Renders one stored console argument in either representation.
pub fn render_console_arg(arg: &ConsoleArg) -> String {
    match arg {
        ConsoleArg::Value(value) => render_value(value),
        ConsoleArg::Remote(remote) => render_arg(remote),
    }
}

/// Textual form of a JSON value with strings left unquoted.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".into(),
        other => other.to_string(),
    }
}

fn primitive_text(arg: &RemoteObject) -> String {
    if let Some(raw) = &arg.unserializable_value {
        return raw.clone();
    }
    match &arg.value {
        Some(value) => value_text(value),
        None => arg
            .description
            .clone()
            .unwrap_or_else(|| generic_coercion(arg)),
    }
}

fn serialize_or_coerce(arg: &RemoteObject) -> String {
    match &arg.value {
        Some(value) => serde_json::to_string(value).unwrap_or_else(|_| generic_coercion(arg)),
        None => generic_coercion(arg),
    }
}

fn generic_coercion(arg: &RemoteObject) -> String {
    if let Some(raw) = &arg.unserializable_value {
        return raw.clone();
    }
    match arg.kind.as_str() {
        "object" => format!("[object {}]", arg.class_name.as_deref().unwrap_or("Object")),
        "" => "undefined".into(),
        other => other.to_string(),
    }
}
