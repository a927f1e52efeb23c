use crate::message::MessagePart;
use regex::Regex;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::sync::OnceLock;

static ANSI_COLOUR_REGEX: OnceLock<Regex> = OnceLock::new();
static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Remove ANSI colour sequences (`ESC [ <params> m`) from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_COLOUR_REGEX
        .get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("Invalid ANSI colour regex"))
        .replace_all(text, "")
}

/// printf-style join of message parts.
///
/// When the first part is text it is treated as a template: `%s`, `%d`,
/// `%i`, `%f`, `%j`, `%o`, `%O` and `%c` each consume the next part and
/// `%%` yields a literal `%`. Placeholders without a matching part are
/// left as written. Parts that were not consumed are appended, separated
/// by single spaces; text is appended verbatim and everything else is
/// rendered with [`inspect`] (faults with their backtrace).
pub fn format_parts<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a MessagePart>,
{
    let items: Vec<&MessagePart> = parts.into_iter().collect();
    let mut out = String::new();
    let mut next = 0;

    if let Some(MessagePart::Text(template)) = items.first() {
        next = 1;
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O' | 'c')) if next < items.len() => {
                    chars.next();
                    out.push_str(&substitute(spec, items[next]));
                    next += 1;
                }
                _ => out.push('%'),
            }
        }
    }

    for (i, item) in items[next..].iter().enumerate() {
        if next > 0 || i > 0 {
            out.push(' ');
        }
        out.push_str(&display_part(item));
    }
    out
}

fn display_part(part: &MessagePart) -> String {
    match part {
        MessagePart::Text(text) => text.clone(),
        MessagePart::Value(value) => inspect(value),
        MessagePart::Fault(fault) => fault.render_stack(),
    }
}

fn substitute(spec: char, part: &MessagePart) -> String {
    match spec {
        's' => match part {
            MessagePart::Text(text) => text.clone(),
            MessagePart::Value(Value::String(text)) => text.clone(),
            MessagePart::Value(value) => inspect(value),
            MessagePart::Fault(fault) => fault.to_string(),
        },
        'd' => numeric(part).map(format_f64).unwrap_or_else(|| "NaN".to_string()),
        'i' => numeric(part)
            .map(|n| format_f64(n.trunc()))
            .unwrap_or_else(|| "NaN".to_string()),
        'f' => numeric(part).map(format_f64).unwrap_or_else(|| "NaN".to_string()),
        'j' => match part {
            MessagePart::Text(text) => Value::String(text.clone()).to_string(),
            MessagePart::Value(value) => value.to_string(),
            MessagePart::Fault(fault) => serde_json::to_string(fault.properties())
                .unwrap_or_else(|_| "{}".to_string()),
        },
        'c' => String::new(),
        _ => match part {
            MessagePart::Text(text) => quote(text),
            MessagePart::Value(value) => inspect(value),
            MessagePart::Fault(fault) => fault.render_stack(),
        },
    }
}

fn numeric(part: &MessagePart) -> Option<f64> {
    match part {
        MessagePart::Text(text) => text.trim().parse().ok(),
        MessagePart::Value(Value::Number(n)) => n.as_f64(),
        MessagePart::Value(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        MessagePart::Value(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    }
}

fn format_f64(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else {
        format!("{}", n)
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(format_f64).unwrap_or_else(|| n.to_string())
    }
}

/// Compact, single-line object-literal rendering of a JSON value:
/// `{ title: 'x', n: 1 }`, `[ 1, 2 ]`, `{}`.
pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    write_inspect(&mut out, value);
    out
}

fn write_inspect(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[ ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inspect(out, item);
            }
            out.push_str(" ]");
        }
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            out.push_str("{ ");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&quote(key));
                }
                out.push_str(": ");
                write_inspect(out, item);
            }
            out.push_str(" }");
        }
    }
}

fn is_identifier(key: &str) -> bool {
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Invalid identifier regex"))
        .is_match(key)
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// Bold, colour-coded lower-case HTTP method.
pub fn colorize_method(method: &str) -> String {
    let method = method.to_ascii_lowercase();
    let color = match method.as_str() {
        "get" => 32,
        "delete" => 31,
        "put" => 36,
        "post" => 33,
        _ => 34,
    };
    format!("\x1b[1;{}m{}\x1b[0m", color, method)
}

/// Status code coloured by class: 5xx red, 4xx yellow, 3xx cyan, else green.
pub fn colorize_status(status: u16) -> String {
    let color = match status {
        500..=u16::MAX => 31,
        400..=499 => 33,
        300..=399 => 36,
        _ => 32,
    };
    format!("\x1b[{}m{}\x1b[0m", color, status)
}
