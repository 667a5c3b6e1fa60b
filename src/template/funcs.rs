use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::exec::{print, truthy, type_name};

pub(crate) type Func = fn(&[Value]) -> Result<Value, String>;

/// Characters `escape` prefixes with a backslash.
const MARKDOWN_SPECIAL: &[char] = &[
    '\\', '*', '_', '#', '`', '[', ']', '(', ')', '>', '+', '-', '.', '!', '|', '~',
];

pub(crate) fn lookup(name: &str) -> Option<Func> {
    let func: Func = match name {
        "index" => index,
        "len" => len,
        "eq" => eq,
        "ne" => ne,
        "not" => not,
        "and" => and,
        "or" => or,
        "join" => join,
        "sub" => sub,
        "escape" => escape,
        _ => return None,
    };
    Some(func)
}

pub(crate) fn call(name: &str, args: &[Value]) -> Result<Value, String> {
    let func = lookup(name).ok_or_else(|| format!("function {:?} not defined", name))?;
    func(args).map_err(|e| format!("error calling {}: {}", name, e))
}

fn arity(args: &[Value], want: usize) -> Result<(), String> {
    if args.len() != want {
        return Err(format!("wrong number of args: want {} got {}", want, args.len()));
    }
    Ok(())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => {
            let mut out = String::new();
            print(other, &mut out);
            out
        }
    }
}

fn string_arg<'a>(value: &'a Value, what: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} must be a string, got {}", what, type_name(value)))
}

fn index(args: &[Value]) -> Result<Value, String> {
    let (first, keys) = args
        .split_first()
        .ok_or("wrong number of args: want at least 1 got 0")?;

    let mut current = first.clone();
    for key in keys {
        current = match (&current, key) {
            (Value::Array(items), Value::Number(n)) => {
                let i = n
                    .as_u64()
                    .ok_or_else(|| format!("cannot index slice/array with {}", n))?;
                items
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| format!("index out of range: {}", i))?
            }
            (Value::Object(map), Value::String(k)) => map.get(k).cloned().unwrap_or(Value::Null),
            (Value::Null, _) => return Err("index of untyped nil".to_string()),
            (container, key) => {
                return Err(format!(
                    "can't index item of type {} with {}",
                    type_name(container),
                    type_name(key)
                ))
            }
        };
    }
    Ok(current)
}

fn len(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => return Err(format!("len of type {}", type_name(other))),
    };
    Ok(Value::from(n))
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn eq(args: &[Value]) -> Result<Value, String> {
    let (first, rest) = args
        .split_first()
        .filter(|(_, rest)| !rest.is_empty())
        .ok_or("missing argument for comparison")?;
    Ok(Value::Bool(rest.iter().any(|other| equal(first, other))))
}

fn ne(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    Ok(Value::Bool(!equal(&args[0], &args[1])))
}

fn not(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::Bool(!truthy(&args[0])))
}

fn and(args: &[Value]) -> Result<Value, String> {
    let last = args.last().ok_or("wrong number of args: want at least 1 got 0")?;
    Ok(args.iter().find(|v| !truthy(v)).unwrap_or(last).clone())
}

fn or(args: &[Value]) -> Result<Value, String> {
    let last = args.last().ok_or("wrong number of args: want at least 1 got 0")?;
    Ok(args.iter().find(|v| truthy(v)).unwrap_or(last).clone())
}

/// `join list separator`
fn join(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    let separator = string_arg(&args[1], "separator")?;
    let joined = match &args[0] {
        Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(separator),
        Value::Null => String::new(),
        other => return Err(format!("can't join {}", type_name(other))),
    };
    Ok(Value::String(joined))
}

/// `sub text pattern replacement`
///
/// An invalid pattern is logged and the text is returned unchanged, so a
/// bad expression never aborts the render.
fn sub(args: &[Value]) -> Result<Value, String> {
    arity(args, 3)?;
    let input = text(&args[0]);
    let pattern = string_arg(&args[1], "pattern")?;
    let replacement = string_arg(&args[2], "replacement")?;

    match substitute(&input, pattern, replacement) {
        Ok(replaced) => Ok(Value::String(replaced)),
        Err(e) => {
            warn!("sub: {}", e);
            Ok(Value::String(input))
        }
    }
}

fn substitute(input: &str, pattern: &str, replacement: &str) -> crate::Result<String> {
    let re = Regex::new(pattern)?;
    Ok(re.replace_all(input, replacement).into_owned())
}

/// `escape text`
fn escape(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::String(markdown_escape(&text(&args[0]))))
}

/// Backslash-escapes markdown control characters in a single left to right
/// pass, so inserted backslashes are never escaped again.
pub fn markdown_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
