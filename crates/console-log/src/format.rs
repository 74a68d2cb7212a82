//! `printf`-style interpolation of console arguments.
//!
//! The first argument is a format string only when it is a `string` value
//! containing `%`. Specifiers consume positional arguments left to right;
//! a specifier with no argument left is emitted verbatim, and arguments
//! that were never consumed are appended after a single space.

use devtap_protocol::cdp::RemoteObject;
use serde_json::Value;

use crate::render::{render_arg, render_object};

/// Interpolates a console argument list into one display string.
pub fn interpolate(args: &[RemoteObject]) -> String {
    let Some((first, rest)) = args.split_first() else {
        return String::new();
    };

    let format = match (first.kind.as_str(), &first.value) {
        ("string", Some(Value::String(s))) if s.contains('%') => s,
        _ => return join_rendered(args),
    };

    let mut out = String::with_capacity(format.len());
    let mut next = 0;
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        if spec == '%' {
            chars.next();
            out.push('%');
            continue;
        }
        if !matches!(spec, 's' | 'd' | 'i' | 'f' | 'o' | 'O' | 'c') {
            out.push('%');
            continue;
        }
        chars.next();
        match rest.get(next) {
            Some(arg) => {
                next += 1;
                out.push_str(&substitute(spec, arg));
            }
            None => {
                out.push('%');
                out.push(spec);
            }
        }
    }

    let leftover = &rest[next.min(rest.len())..];
    if !leftover.is_empty() {
        out.push(' ');
        out.push_str(&join_rendered(leftover));
    }
    out
}

fn join_rendered(args: &[RemoteObject]) -> String {
    args.iter().map(render_arg).collect::<Vec<_>>().join(" ")
}

fn substitute(spec: char, arg: &RemoteObject) -> String {
    match spec {
        's' => render_arg(arg),
        'd' | 'i' => integer_text(arg),
        'f' => float_text(arg),
        'o' | 'O' => render_object(arg),
        _ => String::new(),
    }
}

/// `%d` / `%i`: the integer part of a number, or the leading integer of a
/// string. Anything non-numeric becomes `0`.
fn integer_text(arg: &RemoteObject) -> String {
    if arg.kind == "number" {
        if let Some(n) = arg.value.as_ref().and_then(Value::as_f64) {
            return finite_text(n.trunc());
        }
    }
    let text = match arg.kind.as_str() {
        "bigint" => arg
            .unserializable_value
            .as_deref()
            .map(|s| s.trim_end_matches('n').to_string())
            .unwrap_or_default(),
        "string" | "number" => render_arg(arg),
        _ => String::new(),
    };
    integer_prefix(&text).unwrap_or_else(|| "0".into())
}

/// `%f`: a number's value, or the leading decimal number of a string.
/// Anything non-numeric becomes `0`.
fn float_text(arg: &RemoteObject) -> String {
    if arg.kind == "number" {
        if let Some(n) = arg.value.as_ref().and_then(Value::as_f64) {
            return finite_text(n);
        }
    }
    let text = match arg.kind.as_str() {
        "string" | "number" => render_arg(arg),
        "bigint" => arg
            .unserializable_value
            .as_deref()
            .map(|s| s.trim_end_matches('n').to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    float_prefix(&text)
        .map(finite_or_infinite_text)
        .unwrap_or_else(|| "0".into())
}

fn finite_text(n: f64) -> String {
    if n == 0.0 {
        // Folds -0 into 0.
        "0".into()
    } else {
        n.to_string()
    }
}

fn finite_or_infinite_text(n: f64) -> String {
    if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else {
        finite_text(n)
    }
}

/// Leading `[+-]digits` of `s` after whitespace, without leading zeros.
fn integer_prefix(s: &str) -> Option<String> {
    let s = s.trim_start();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = body.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some("0".into());
    }
    Some(if negative {
        format!("-{trimmed}")
    } else {
        trimmed.to_string()
    })
}

/// Longest leading decimal literal of `s` after whitespace.
fn float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'-' | b'+') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
