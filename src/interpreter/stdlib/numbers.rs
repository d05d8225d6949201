//! Boxed numerics, Character, Boolean and Math emulation
//!
//! Boxed values are just primitives in this machine, so instance methods
//! (`intValue`, `compareTo`, ...) dispatch on primitive receivers.

use rand::Rng;

use crate::interpreter::engine::Simulator;
use crate::memory::value::{value_to_string, Value};

use super::StdlibResult;

fn ok(value: Value, method: &str) -> StdlibResult {
    let text = value_to_string(&value);
    Some((Some(value), format!("{} -> {}", method, text)))
}

fn arg_number(args: &[Value], i: usize) -> f64 {
    args.get(i).and_then(Value::as_number).unwrap_or(0.0)
}

fn arg_int(args: &[Value], i: usize) -> i64 {
    args.get(i).and_then(Value::as_int).unwrap_or(0)
}

fn arg_char(args: &[Value], i: usize) -> char {
    match args.get(i) {
        Some(Value::Char(c)) => *c,
        Some(other) => other
            .as_int()
            .and_then(|n| char::from_u32(n as u32))
            .unwrap_or('\0'),
        None => '\0',
    }
}

impl Simulator {
    pub(crate) fn number_static(&mut self, class: &str, method: &str, args: &[Value]) -> StdlibResult {
        let text = args
            .first()
            .map(|v| self.state.display_value(v))
            .unwrap_or_default();
        let label = format!("{}.{}", class, method);

        if class == "Character" {
            return self.character_static(method, args, &label);
        }

        match method {
            "parseInt" => ok(Value::Int(text.trim().parse::<i64>().unwrap_or(0)), &label),
            "parseLong" => ok(Value::Long(text.trim().parse::<i64>().unwrap_or(0)), &label),
            "parseDouble" => ok(
                Value::Double(text.trim().parse::<f64>().unwrap_or(0.0)),
                &label,
            ),
            "parseFloat" => ok(
                Value::Float(text.trim().parse::<f64>().unwrap_or(0.0)),
                &label,
            ),
            "parseBoolean" => ok(Value::Boolean(text.trim().eq_ignore_ascii_case("true")), &label),
            "valueOf" => {
                let value = match class {
                    "Integer" => Value::Int(
                        args.first()
                            .and_then(Value::as_int)
                            .unwrap_or_else(|| text.trim().parse::<i64>().unwrap_or(0)),
                    ),
                    "Long" => Value::Long(
                        args.first()
                            .and_then(Value::as_int)
                            .unwrap_or_else(|| text.trim().parse::<i64>().unwrap_or(0)),
                    ),
                    "Double" => Value::Double(
                        args.first()
                            .and_then(Value::as_number)
                            .unwrap_or_else(|| text.trim().parse::<f64>().unwrap_or(0.0)),
                    ),
                    "Float" => Value::Float(
                        args.first()
                            .and_then(Value::as_number)
                            .unwrap_or_else(|| text.trim().parse::<f64>().unwrap_or(0.0)),
                    ),
                    "Boolean" => Value::Boolean(
                        args.first().map(Value::is_truthy).unwrap_or(false),
                    ),
                    _ => args.first().cloned().unwrap_or(Value::Null),
                };
                ok(value, &label)
            }
            "toString" => ok(Value::Str(text), &label),
            "max" if args.len() == 2 => {
                let (a, b) = (arg_number(args, 0), arg_number(args, 1));
                ok(number_result(class, a.max(b)), &label)
            }
            "min" if args.len() == 2 => {
                let (a, b) = (arg_number(args, 0), arg_number(args, 1));
                ok(number_result(class, a.min(b)), &label)
            }
            "sum" if args.len() == 2 => {
                ok(number_result(class, arg_number(args, 0) + arg_number(args, 1)), &label)
            }
            "compare" if args.len() == 2 => {
                let (a, b) = (arg_number(args, 0), arg_number(args, 1));
                ok(Value::Int(compare_f64(a, b)), &label)
            }
            "abs" => ok(number_result(class, arg_number(args, 0).abs()), &label),
            "isNaN" => ok(Value::Boolean(arg_number(args, 0).is_nan()), &label),
            _ => None,
        }
    }

    fn character_static(&mut self, method: &str, args: &[Value], label: &str) -> StdlibResult {
        let c = arg_char(args, 0);
        match method {
            "isDigit" => ok(Value::Boolean(c.is_ascii_digit()), label),
            "isLetter" => ok(Value::Boolean(c.is_alphabetic()), label),
            "isLetterOrDigit" => ok(Value::Boolean(c.is_alphanumeric()), label),
            "isWhitespace" => ok(Value::Boolean(c.is_whitespace()), label),
            "isUpperCase" => ok(Value::Boolean(c.is_uppercase()), label),
            "isLowerCase" => ok(Value::Boolean(c.is_lowercase()), label),
            "toUpperCase" => ok(
                Value::Char(c.to_uppercase().next().unwrap_or(c)),
                label,
            ),
            "toLowerCase" => ok(
                Value::Char(c.to_lowercase().next().unwrap_or(c)),
                label,
            ),
            "getNumericValue" => ok(
                Value::Int(c.to_digit(10).map(|d| d as i64).unwrap_or(-1)),
                label,
            ),
            "valueOf" => ok(Value::Char(c), label),
            "toString" => ok(Value::Str(c.to_string()), label),
            "compare" if args.len() == 2 => ok(
                Value::Int(compare_f64(
                    arg_char(args, 0) as u32 as f64,
                    arg_char(args, 1) as u32 as f64,
                )),
                label,
            ),
            _ => None,
        }
    }

    /// Instance methods on boxed-primitive receivers
    pub(crate) fn primitive_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        let label = format!("{}.{}", receiver.type_name(), method);
        match method {
            "intValue" => ok(Value::Int(receiver.as_number().unwrap_or(0.0) as i64), &label),
            "longValue" => ok(Value::Long(receiver.as_number().unwrap_or(0.0) as i64), &label),
            "doubleValue" => ok(Value::Double(receiver.as_number().unwrap_or(0.0)), &label),
            "floatValue" => ok(Value::Float(receiver.as_number().unwrap_or(0.0)), &label),
            "byteValue" => ok(Value::Byte(receiver.as_number().unwrap_or(0.0) as i64), &label),
            "shortValue" => ok(Value::Short(receiver.as_number().unwrap_or(0.0) as i64), &label),
            "booleanValue" => ok(Value::Boolean(receiver.is_truthy()), &label),
            "charValue" => ok(receiver.clone(), &label),
            "compareTo" if args.len() == 1 => {
                let a = receiver.as_number().unwrap_or(0.0);
                let b = arg_number(args, 0);
                ok(Value::Int(compare_f64(a, b)), &label)
            }
            "equals" if args.len() == 1 => {
                let equal = self.values_equal(receiver, &args[0]);
                ok(Value::Boolean(equal), &label)
            }
            "hashCode" => ok(Value::Int(receiver.as_int().unwrap_or(0)), &label),
            "toString" => ok(Value::Str(value_to_string(receiver)), &label),
            _ => None,
        }
    }

    pub(crate) fn math_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        let label = format!("Math.{}", method);
        let x = arg_number(args, 0);
        match method {
            "abs" => {
                let value = if args.first().is_some_and(|v| v.is_float()) {
                    Value::Double(x.abs())
                } else {
                    Value::Int(arg_int(args, 0).abs())
                };
                ok(value, &label)
            }
            "max" => {
                let value = if args.iter().any(Value::is_float) {
                    Value::Double(x.max(arg_number(args, 1)))
                } else {
                    Value::Int(arg_int(args, 0).max(arg_int(args, 1)))
                };
                ok(value, &label)
            }
            "min" => {
                let value = if args.iter().any(Value::is_float) {
                    Value::Double(x.min(arg_number(args, 1)))
                } else {
                    Value::Int(arg_int(args, 0).min(arg_int(args, 1)))
                };
                ok(value, &label)
            }
            "sqrt" => ok(Value::Double(x.sqrt()), &label),
            "pow" => ok(Value::Double(x.powf(arg_number(args, 1))), &label),
            "floor" => ok(Value::Double(x.floor()), &label),
            "ceil" => ok(Value::Double(x.ceil()), &label),
            "round" => ok(Value::Int(x.round() as i64), &label),
            "random" => {
                let r: f64 = rand::thread_rng().gen_range(0.0..1.0);
                ok(Value::Double(r), &label)
            }
            "log" => ok(Value::Double(x.ln()), &label),
            "log10" => ok(Value::Double(x.log10()), &label),
            "sin" => ok(Value::Double(x.sin()), &label),
            "cos" => ok(Value::Double(x.cos()), &label),
            "tan" => ok(Value::Double(x.tan()), &label),
            "PI" => ok(Value::Double(std::f64::consts::PI), &label),
            "E" => ok(Value::Double(std::f64::consts::E), &label),
            _ => None,
        }
    }
}

fn number_result(class: &str, value: f64) -> Value {
    match class {
        "Double" => Value::Double(value),
        "Float" => Value::Float(value),
        "Long" => Value::Long(value as i64),
        _ => Value::Int(value as i64),
    }
}

fn compare_f64(a: f64, b: f64) -> i64 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}
