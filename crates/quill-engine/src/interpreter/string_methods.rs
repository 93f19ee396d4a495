//! String method implementations.
//!
//! Positions count characters, not bytes.

use crate::error::{Error, Result};
use crate::runtime::Value;
use crate::runtime::value::number_to_string;

/// Method names available on string values.
pub const METHODS: &[&str] = &[
    "at",
    "charAt",
    "charCodeAt",
    "concat",
    "endsWith",
    "includes",
    "indexOf",
    "lastIndexOf",
    "padEnd",
    "padStart",
    "repeat",
    "replace",
    "replaceAll",
    "slice",
    "split",
    "startsWith",
    "substr",
    "substring",
    "toLowerCase",
    "toString",
    "toUpperCase",
    "trim",
    "trimEnd",
    "trimStart",
    "valueOf",
];

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_js_string).unwrap_or_default()
}

/// An integer argument, or `default` when missing or undefined.
fn integer_arg(args: &[Value], index: usize, default: f64) -> f64 {
    match args.get(index) {
        None | Some(Value::Undefined) => default,
        Some(value) => {
            let n = value.to_number();
            if n.is_nan() { 0.0 } else { n.trunc() }
        }
    }
}

/// Resolves a possibly negative position against `len`.
fn relative(position: f64, len: usize) -> usize {
    let len = len as f64;
    let resolved = if position < 0.0 { (len + position).max(0.0) } else { position.min(len) };
    resolved as usize
}

fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices().nth(char_index).map_or(s.len(), |(offset, _)| offset)
}

fn char_index(s: &str, byte_offset: usize) -> usize {
    s[..byte_offset].chars().count()
}

fn substring(chars: &[char], start: usize, end: usize) -> Value {
    if start >= end {
        return Value::String(String::new());
    }
    Value::String(chars[start..end].iter().collect())
}

fn pad(s: &str, args: &[Value], at_start: bool) -> Value {
    let target = integer_arg(args, 0, 0.0).max(0.0) as usize;
    let fill = match args.get(1) {
        None | Some(Value::Undefined) => " ".to_string(),
        Some(value) => value.to_js_string(),
    };
    let len = s.chars().count();
    if target <= len || fill.is_empty() {
        return Value::from(s);
    }
    let padding: String = fill.chars().cycle().take(target - len).collect();
    Value::String(if at_start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    })
}

/// Calls a string method.
pub fn call_string_method(s: &str, method: &str, args: &[Value]) -> Result<Value> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();

    Ok(match method {
        "charAt" => {
            let index = integer_arg(args, 0, 0.0);
            match chars.get(index as usize) {
                Some(c) if index >= 0.0 => Value::String(c.to_string()),
                _ => Value::String(String::new()),
            }
        }
        "charCodeAt" => {
            let index = integer_arg(args, 0, 0.0);
            match chars.get(index as usize) {
                Some(c) if index >= 0.0 => Value::Number(*c as u32 as f64),
                _ => Value::Number(f64::NAN),
            }
        }
        "at" => {
            let index = integer_arg(args, 0, 0.0);
            let index = if index < 0.0 { len as f64 + index } else { index };
            match chars.get(index as usize) {
                Some(c) if index >= 0.0 => Value::String(c.to_string()),
                _ => Value::Undefined,
            }
        }
        "indexOf" => {
            let search = string_arg(args, 0);
            let start = relative(integer_arg(args, 1, 0.0).max(0.0), len);
            let from = byte_offset(s, start);
            match s[from..].find(&search) {
                Some(pos) => Value::from(char_index(s, from + pos)),
                None => Value::Number(-1.0),
            }
        }
        "lastIndexOf" => {
            let search = string_arg(args, 0);
            match s.rfind(&search) {
                Some(pos) => Value::from(char_index(s, pos)),
                None => Value::Number(-1.0),
            }
        }
        "includes" => {
            let start = byte_offset(s, relative(integer_arg(args, 1, 0.0).max(0.0), len));
            Value::Boolean(s[start..].contains(&string_arg(args, 0)))
        }
        "startsWith" => {
            let start = byte_offset(s, relative(integer_arg(args, 1, 0.0).max(0.0), len));
            Value::Boolean(s[start..].starts_with(&string_arg(args, 0)))
        }
        "endsWith" => {
            let end = byte_offset(s, relative(integer_arg(args, 1, len as f64), len));
            Value::Boolean(s[..end].ends_with(&string_arg(args, 0)))
        }
        "slice" => {
            let start = relative(integer_arg(args, 0, 0.0), len);
            let end = relative(integer_arg(args, 1, len as f64), len);
            substring(&chars, start, end)
        }
        "substring" => {
            let clamp = |n: f64| n.max(0.0).min(len as f64) as usize;
            let start = clamp(integer_arg(args, 0, 0.0));
            let end = clamp(integer_arg(args, 1, len as f64));
            substring(&chars, start.min(end), start.max(end))
        }
        "substr" => {
            let start = relative(integer_arg(args, 0, 0.0), len);
            let count = integer_arg(args, 1, len as f64).max(0.0) as usize;
            substring(&chars, start, start.saturating_add(count).min(len))
        }
        "toLowerCase" => Value::String(s.to_lowercase()),
        "toUpperCase" => Value::String(s.to_uppercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "split" => {
            let limit = match args.get(1) {
                None | Some(Value::Undefined) => usize::MAX,
                Some(value) => value.to_number().max(0.0) as usize,
            };
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(separator) => {
                    let separator = separator.to_js_string();
                    if separator.is_empty() {
                        chars.iter().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::array(parts.into_iter().take(limit).collect())
        }
        "replace" => Value::String(s.replacen(&string_arg(args, 0), &string_arg(args, 1), 1)),
        "replaceAll" => {
            let search = string_arg(args, 0);
            if search.is_empty() {
                return Err(Error::type_error("replaceAll requires a non-empty search string"));
            }
            Value::String(s.replace(&search, &string_arg(args, 1)))
        }
        "repeat" => {
            let count = integer_arg(args, 0, 0.0);
            if count < 0.0 || count.is_infinite() {
                return Err(Error::runtime(format!(
                    "RangeError: Invalid count value: {}",
                    number_to_string(count)
                )));
            }
            Value::String(s.repeat(count as usize))
        }
        "padStart" => pad(s, args, true),
        "padEnd" => pad(s, args, false),
        "concat" => {
            let mut result = s.to_string();
            for arg in args {
                result.push_str(&arg.to_js_string());
            }
            Value::String(result)
        }
        "toString" | "valueOf" => Value::from(s),
        _ => Value::Undefined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(s: &str, method: &str, args: &[Value]) -> Value {
        call_string_method(s, method, args).unwrap()
    }

    #[test]
    fn test_char_at() {
        assert_eq!(call("hello", "charAt", &[Value::from(1)]), Value::from("e"));
        assert_eq!(call("hello", "charAt", &[Value::from(10)]), Value::from(""));
        assert_eq!(call("abc", "charCodeAt", &[Value::from(0)]), Value::from(97));
        assert_eq!(call("abc", "at", &[Value::from(-1)]), Value::from("c"));
    }

    #[test]
    fn test_index_of() {
        assert_eq!(call("hello world", "indexOf", &[Value::from("world")]), Value::from(6));
        assert_eq!(call("hello world", "indexOf", &[Value::from("xyz")]), Value::from(-1));
        assert_eq!(call("aXbXc", "indexOf", &[Value::from("X"), Value::from(2)]), Value::from(3));
        assert_eq!(call("aXbXc", "lastIndexOf", &[Value::from("X")]), Value::from(3));
        assert_eq!(call("éa", "indexOf", &[Value::from("a")]), Value::from(1));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(call("HELLO", "toLowerCase", &[]), Value::from("hello"));
        assert_eq!(call("hello", "toUpperCase", &[]), Value::from("HELLO"));
        assert_eq!(call("  hello  ", "trim", &[]), Value::from("hello"));
        assert_eq!(call("  hello  ", "trimStart", &[]), Value::from("hello  "));
    }

    #[test]
    fn test_substring_and_slice() {
        assert_eq!(call("hello", "substring", &[Value::from(1), Value::from(3)]), Value::from("el"));
        assert_eq!(call("hello", "substring", &[Value::from(3), Value::from(1)]), Value::from("el"));
        assert_eq!(call("hello", "slice", &[Value::from(1), Value::from(3)]), Value::from("el"));
        assert_eq!(call("hello", "slice", &[Value::from(-2)]), Value::from("lo"));
        assert_eq!(call("hello", "substr", &[Value::from(1), Value::from(2)]), Value::from("el"));
    }

    #[test]
    fn test_split() {
        let parts = call("a,b,c", "split", &[Value::from(",")]);
        assert_eq!(parts.to_js_string(), "a,b,c");
        let Value::Array(array) = parts else { panic!("expected array") };
        assert_eq!(array.borrow().elements.len(), 3);

        let chars = call("abc", "split", &[Value::from("")]);
        assert_eq!(chars.inspect(), "[ 'a', 'b', 'c' ]");
        let limited = call("a b c", "split", &[Value::from(" "), Value::from(2)]);
        assert_eq!(limited.inspect(), "[ 'a', 'b' ]");
    }

    #[test]
    fn test_replace() {
        let args = [Value::from("o"), Value::from("0")];
        assert_eq!(call("foo boo", "replace", &args), Value::from("f0o boo"));
        assert_eq!(call("foo boo", "replaceAll", &args), Value::from("f00 b00"));
    }

    #[test]
    fn test_pad_and_repeat() {
        assert_eq!(call("5", "padStart", &[Value::from(3), Value::from("0")]), Value::from("005"));
        assert_eq!(call("ab", "padEnd", &[Value::from(5), Value::from("xy")]), Value::from("abxyx"));
        assert_eq!(call("ab", "repeat", &[Value::from(3)]), Value::from("ababab"));
        assert!(call_string_method("ab", "repeat", &[Value::from(-1)]).is_err());
    }

    #[test]
    fn test_concat() {
        let args = [Value::from(" "), Value::from("world")];
        assert_eq!(call("hello", "concat", &args), Value::from("hello world"));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(call("hello", "includes", &[Value::from("ell")]), Value::from(true));
        assert_eq!(call("hello", "startsWith", &[Value::from("he")]), Value::from(true));
        assert_eq!(call("hello", "endsWith", &[Value::from("lo")]), Value::from(true));
        assert_eq!(call("hello", "endsWith", &[Value::from("l"), Value::from(4)]), Value::from(true));
    }
}
