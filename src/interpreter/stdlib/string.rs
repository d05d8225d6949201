//! String emulation
//!
//! Instance methods apply to primitive-string receivers and to heap objects
//! whose class is `String`. Regex-backed methods (`matches`, `replaceAll`,
//! `replaceFirst`, `split`) use the `regex` crate; `matches` is anchored as
//! in Java. `hashCode` is the canonical `h = 31*h + c` fold in wrapping
//! 32-bit arithmetic.

use regex::Regex;

use crate::interpreter::engine::Simulator;
use crate::memory::value::{value_to_string, Value};

use super::StdlibResult;

/// Java's String.hashCode: 31-fold over UTF-16 code units, wrapping i32
pub fn string_hash_code(text: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash
}

fn ok(value: Value, description: String) -> StdlibResult {
    Some((Some(value), description))
}

impl Simulator {
    pub(crate) fn string_method(&mut self, text: &str, method: &str, args: &[Value]) -> StdlibResult {
        let arg_text = |i: usize| -> String {
            args.get(i)
                .map(|v| self.state.display_value(v))
                .unwrap_or_default()
        };
        let arg_int = |i: usize| -> i64 { args.get(i).and_then(Value::as_int).unwrap_or(0) };
        let chars: Vec<char> = text.chars().collect();

        let (value, note) = match (method, args.len()) {
            ("length", 0) => (Value::Int(chars.len() as i64), String::new()),
            ("charAt", 1) => {
                let index = arg_int(0).max(0) as usize;
                (
                    chars.get(index).map(|c| Value::Char(*c)).unwrap_or(Value::Char('\0')),
                    String::new(),
                )
            }
            ("codePointAt", 1) => {
                let index = arg_int(0).max(0) as usize;
                (
                    Value::Int(chars.get(index).map(|c| *c as i64).unwrap_or(0)),
                    String::new(),
                )
            }
            ("substring", 1) => {
                let start = (arg_int(0).max(0) as usize).min(chars.len());
                (
                    Value::Str(chars[start..].iter().collect()),
                    String::new(),
                )
            }
            ("substring", 2) => {
                let start = (arg_int(0).max(0) as usize).min(chars.len());
                let end = (arg_int(1).max(0) as usize).clamp(start, chars.len());
                (
                    Value::Str(chars[start..end].iter().collect()),
                    String::new(),
                )
            }
            ("indexOf", 1) => (
                Value::Int(char_index_of(&chars, &arg_text(0), 0)),
                String::new(),
            ),
            ("indexOf", 2) => (
                Value::Int(char_index_of(&chars, &arg_text(0), arg_int(1).max(0) as usize)),
                String::new(),
            ),
            ("lastIndexOf", 1) => {
                let needle: Vec<char> = arg_text(0).chars().collect();
                let mut found = -1i64;
                if !needle.is_empty() {
                    let mut start = 0usize;
                    while start + needle.len() <= chars.len() {
                        if chars[start..start + needle.len()] == needle[..] {
                            found = start as i64;
                        }
                        start += 1;
                    }
                }
                (Value::Int(found), String::new())
            }
            ("contains", 1) => (
                Value::Boolean(text.contains(&arg_text(0))),
                String::new(),
            ),
            ("startsWith", 1) => (
                Value::Boolean(text.starts_with(&arg_text(0))),
                String::new(),
            ),
            ("endsWith", 1) => (
                Value::Boolean(text.ends_with(&arg_text(0))),
                String::new(),
            ),
            ("toLowerCase", 0) => (Value::Str(text.to_lowercase()), String::new()),
            ("toUpperCase", 0) => (Value::Str(text.to_uppercase()), String::new()),
            ("trim", 0) | ("strip", 0) => (Value::Str(text.trim().to_string()), String::new()),
            ("stripLeading", 0) => (Value::Str(text.trim_start().to_string()), String::new()),
            ("stripTrailing", 0) => (Value::Str(text.trim_end().to_string()), String::new()),
            ("isBlank", 0) => (Value::Boolean(text.trim().is_empty()), String::new()),
            ("isEmpty", 0) => (Value::Boolean(text.is_empty()), String::new()),
            ("repeat", 1) => (
                Value::Str(text.repeat(arg_int(0).max(0) as usize)),
                String::new(),
            ),
            ("concat", 1) => (
                Value::Str(format!("{}{}", text, arg_text(0))),
                String::new(),
            ),
            ("replace", 2) => (
                Value::Str(text.replace(&arg_text(0), &arg_text(1))),
                String::new(),
            ),
            ("replaceAll", 2) => {
                let replaced = match Regex::new(&arg_text(0)) {
                    Ok(re) => re.replace_all(text, arg_text(1).as_str()).into_owned(),
                    Err(_) => text.replace(&arg_text(0), &arg_text(1)),
                };
                (Value::Str(replaced), String::new())
            }
            ("replaceFirst", 2) => {
                let replaced = match Regex::new(&arg_text(0)) {
                    Ok(re) => re.replacen(text, 1, arg_text(1).as_str()).into_owned(),
                    Err(_) => text.replacen(&arg_text(0), &arg_text(1), 1),
                };
                (Value::Str(replaced), String::new())
            }
            ("matches", 1) => {
                // Anchored, as in Java
                let matched = Regex::new(&format!("^(?:{})$", arg_text(0)))
                    .map(|re| re.is_match(text))
                    .unwrap_or(false);
                (Value::Boolean(matched), String::new())
            }
            ("equals", 1) => {
                let other = args
                    .first()
                    .and_then(|v| self.as_string_receiver(v));
                (
                    Value::Boolean(other.as_deref() == Some(text)),
                    String::new(),
                )
            }
            ("equalsIgnoreCase", 1) => (
                Value::Boolean(text.to_lowercase() == arg_text(0).to_lowercase()),
                String::new(),
            ),
            ("compareTo", 1) => (
                Value::Int(ordering_to_int(text.cmp(&arg_text(0)))),
                String::new(),
            ),
            ("compareToIgnoreCase", 1) => (
                Value::Int(ordering_to_int(
                    text.to_lowercase().cmp(&arg_text(0).to_lowercase()),
                )),
                String::new(),
            ),
            ("hashCode", 0) => (Value::Int(string_hash_code(text) as i64), String::new()),
            ("toString", 0) | ("intern", 0) => (Value::Str(text.to_string()), String::new()),
            ("toCharArray", 0) => {
                let elements = chars.iter().map(|c| Value::Char(*c)).collect();
                let step = self.state.step_number;
                let id = self.state.heap.alloc_array("char", elements, step);
                (
                    Value::Array {
                        id,
                        element_type: "char".to_string(),
                    },
                    String::new(),
                )
            }
            ("getBytes", 0) => {
                // UTF-16 code units as ints
                let elements = text.encode_utf16().map(|u| Value::Int(u as i64)).collect();
                let step = self.state.step_number;
                let id = self.state.heap.alloc_array("int", elements, step);
                (
                    Value::Array {
                        id,
                        element_type: "int".to_string(),
                    },
                    String::new(),
                )
            }
            ("split", 1) => {
                let pattern = arg_text(0);
                let array = self.split_string(text, &pattern, 0);
                (array, format!("String.split(\"{}\")", pattern))
            }
            ("split", 2) => {
                let pattern = arg_text(0);
                let limit = arg_int(1);
                let array = self.split_string(text, &pattern, limit);
                (array, format!("String.split(\"{}\", {})", pattern, limit))
            }
            ("chars", 0) => {
                let elements = chars.iter().map(|c| Value::Int(*c as i64)).collect();
                let step = self.state.step_number;
                let id = self.state.heap.alloc_array("int", elements, step);
                (
                    Value::Array {
                        id,
                        element_type: "int".to_string(),
                    },
                    String::new(),
                )
            }
            _ => return None,
        };

        let description = if note.is_empty() {
            format!("String.{} -> {}", method, value_to_string(&value))
        } else {
            note
        };
        Some((Some(value), description))
    }

    fn split_string(&mut self, text: &str, pattern: &str, limit: i64) -> Value {
        let mut parts: Vec<String> = match Regex::new(pattern) {
            Ok(re) => {
                if limit > 0 {
                    re.splitn(text, limit as usize).map(|s| s.to_string()).collect()
                } else {
                    re.split(text).map(|s| s.to_string()).collect()
                }
            }
            Err(_) => text.split(pattern).map(|s| s.to_string()).collect(),
        };
        // Java removes trailing empty strings when limit == 0
        if limit == 0 {
            while parts.last().is_some_and(|s| s.is_empty()) {
                parts.pop();
            }
        }
        let elements = parts.into_iter().map(Value::Str).collect();
        let step = self.state.step_number;
        let id = self.state.heap.alloc_array("String", elements, step);
        Value::Array {
            id,
            element_type: "String".to_string(),
        }
    }

    pub(crate) fn string_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        match (method, args.len()) {
            ("valueOf", 1) => {
                let text = self.state.display_value(&args[0]);
                ok(Value::Str(text.clone()), format!("String.valueOf -> {}", text))
            }
            ("format", _) if !args.is_empty() => {
                let template = self.state.display_value(&args[0]);
                let formatted = self.format_template(&template, &args[1..]);
                ok(
                    Value::Str(formatted.clone()),
                    format!("String.format -> {}", formatted),
                )
            }
            ("join", _) if !args.is_empty() => {
                let separator = self.state.display_value(&args[0]);
                let mut parts = Vec::new();
                for arg in &args[1..] {
                    // A single array/collection argument joins its elements
                    if let Some(obj) = arg.object_id().and_then(|id| self.state.heap.get(id)) {
                        if !obj.array_elements.is_empty() || args.len() == 2 {
                            let elements = obj.array_elements.clone();
                            for element in &elements {
                                parts.push(self.state.display_value(element));
                            }
                            continue;
                        }
                    }
                    parts.push(self.state.display_value(arg));
                }
                let joined = parts.join(&separator);
                ok(Value::Str(joined.clone()), format!("String.join -> {}", joined))
            }
            ("copyValueOf", 1) => {
                let text: String = args[0]
                    .object_id()
                    .and_then(|id| self.state.heap.get(id))
                    .map(|o| {
                        o.array_elements
                            .iter()
                            .map(|v| match v {
                                Value::Char(c) => *c,
                                other => other
                                    .as_int()
                                    .and_then(|n| char::from_u32(n as u32))
                                    .unwrap_or('\0'),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                ok(Value::Str(text.clone()), format!("String.copyValueOf -> {}", text))
            }
            _ => None,
        }
    }

    /// `String.format` / printf-style template expansion. Recognises
    /// `%d %i %o %u %x %X %e %f %g %s %c %b %n` and the `%%` escape; width
    /// and precision flags are not modelled.
    pub(crate) fn format_template(&self, template: &str, args: &[Value]) -> String {
        let mut output = String::new();
        let mut chars = template.chars().peekable();
        let mut arg_index = 0usize;

        let mut next_arg = |index: &mut usize| -> Value {
            let value = args.get(*index).cloned().unwrap_or(Value::Null);
            *index += 1;
            value
        };

        while let Some(ch) = chars.next() {
            if ch != '%' {
                output.push(ch);
                continue;
            }
            match chars.next() {
                Some('%') => output.push('%'),
                Some('n') => output.push('\n'),
                Some('d') | Some('i') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&v.as_int().unwrap_or(0).to_string());
                }
                Some('o') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{:o}", v.as_int().unwrap_or(0)));
                }
                Some('u') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&(v.as_int().unwrap_or(0) as u64).to_string());
                }
                Some('x') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{:x}", v.as_int().unwrap_or(0)));
                }
                Some('X') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{:X}", v.as_int().unwrap_or(0)));
                }
                Some('e') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{:e}", v.as_number().unwrap_or(0.0)));
                }
                Some('f') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{:.6}", v.as_number().unwrap_or(0.0)));
                }
                Some('g') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&format!("{}", v.as_number().unwrap_or(0.0)));
                }
                Some('s') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(&self.state.display_value(&v));
                }
                Some('c') => {
                    let v = next_arg(&mut arg_index);
                    match v {
                        Value::Char(c) => output.push(c),
                        other => {
                            let code = other.as_int().unwrap_or(0) as u32;
                            output.push(char::from_u32(code).unwrap_or('\0'));
                        }
                    }
                }
                Some('b') => {
                    let v = next_arg(&mut arg_index);
                    output.push_str(if v.is_truthy() { "true" } else { "false" });
                }
                Some(other) => {
                    output.push('%');
                    output.push(other);
                }
                None => output.push('%'),
            }
        }
        output
    }
}

fn ordering_to_int(ordering: std::cmp::Ordering) -> i64 {
    match ordering {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Char-indexed indexOf so results match Java's char-unit positions
fn char_index_of(haystack: &[char], needle: &str, from: usize) -> i64 {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return from.min(haystack.len()) as i64;
    }
    let mut start = from;
    while start + needle.len() <= haystack.len() {
        if haystack[start..start + needle.len()] == needle[..] {
            return start as i64;
        }
        start += 1;
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_code_matches_java_fold() {
        // Java: "hello".hashCode() == 99162322
        assert_eq!(string_hash_code("hello"), 99162322);
        assert_eq!(string_hash_code(""), 0);
        // Deterministic
        assert_eq!(string_hash_code("abc"), string_hash_code("abc"));
        // "abc" = 'a'*31^2 + 'b'*31 + 'c'
        assert_eq!(string_hash_code("abc"), 96354);
    }

    #[test]
    fn test_char_index_of() {
        let hay: Vec<char> = "banana".chars().collect();
        assert_eq!(char_index_of(&hay, "ana", 0), 1);
        assert_eq!(char_index_of(&hay, "ana", 2), 3);
        assert_eq!(char_index_of(&hay, "zzz", 0), -1);
        assert_eq!(char_index_of(&hay, "", 3), 3);
    }
}
