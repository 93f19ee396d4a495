//! Array method implementations.
//!
//! Callbacks receive `(element, index, array)`. The array is never
//! borrowed while a callback runs, so callbacks may mutate it; iteration
//! covers the length observed when the method started.

use super::Interpreter;
use super::comparison::strict_equals;
use crate::error::{Error, Result};
use crate::runtime::{Array, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Method names available on arrays.
pub const METHODS: &[&str] = &[
    "at", "concat", "every", "fill", "filter", "find", "findIndex", "forEach", "includes",
    "indexOf", "join", "lastIndexOf", "map", "pop", "push", "reduce", "reverse", "shift",
    "slice", "some", "sort", "splice", "toString", "unshift",
];

type Receiver = Rc<RefCell<Array>>;

fn len(array: &Receiver) -> usize {
    array.borrow().elements.len()
}

fn element(array: &Receiver, index: usize) -> Value {
    array.borrow().elements.get(index).cloned().unwrap_or_default()
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Resolves a possibly negative position argument against `len`.
fn position(args: &[Value], index: usize, len: usize, default: usize) -> usize {
    match args.get(index) {
        None | Some(Value::Undefined) => default,
        Some(value) => {
            let n = value.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let len = len as f64;
            (if n < 0.0 { (len + n).max(0.0) } else { n.min(len) }) as usize
        }
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// Calls `callback(element, index, array)` for each index, stopping early
/// when `visit` returns false.
fn each(
    interp: &mut Interpreter,
    array: &Receiver,
    args: &[Value],
    mut visit: impl FnMut(usize, Value, Value) -> bool,
) -> Result<()> {
    let callback = arg(args, 0);
    if !callback.is_function() {
        return Err(Error::type_error(format!(
            "{} is not a function",
            callback.to_js_string()
        )));
    }
    let this = arg(args, 1);
    let target = Value::Array(array.clone());
    for index in 0..len(array) {
        let item = element(array, index);
        let result = interp.call_function(
            &callback,
            this.clone(),
            &[item.clone(), Value::from(index), target.clone()],
        )?;
        if !visit(index, item, result) {
            break;
        }
    }
    Ok(())
}

/// Calls an array method on `array`.
pub fn call_array_method(
    interp: &mut Interpreter,
    array: &Receiver,
    method: &str,
    args: &[Value],
) -> Result<Value> {
    let length = len(array);
    match method {
        "push" => {
            let mut array = array.borrow_mut();
            array.elements.extend_from_slice(args);
            Ok(Value::from(array.elements.len()))
        }
        "pop" => Ok(array.borrow_mut().elements.pop().unwrap_or_default()),
        "shift" => {
            let mut array = array.borrow_mut();
            if array.elements.is_empty() {
                Ok(Value::Undefined)
            } else {
                Ok(array.elements.remove(0))
            }
        }
        "unshift" => {
            let mut array = array.borrow_mut();
            array.elements.splice(0..0, args.iter().cloned());
            Ok(Value::from(array.elements.len()))
        }
        "at" => {
            let n = arg(args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let index = if n < 0.0 { length as f64 + n } else { n };
            if index < 0.0 {
                return Ok(Value::Undefined);
            }
            Ok(element(array, index as usize))
        }
        "slice" => {
            let start = position(args, 0, length, 0);
            let end = position(args, 1, length, length);
            let elements = array.borrow().elements.get(start..end).map(<[Value]>::to_vec);
            Ok(Value::array(elements.unwrap_or_default()))
        }
        "splice" => {
            let start = position(args, 0, length, 0);
            let count = match args.get(1) {
                None => length - start,
                Some(value) => (value.to_number().max(0.0) as usize).min(length - start),
            };
            let inserted = args.get(2..).unwrap_or_default().iter().cloned();
            let removed: Vec<Value> = array
                .borrow_mut()
                .elements
                .splice(start..start + count, inserted)
                .collect();
            Ok(Value::array(removed))
        }
        "concat" => {
            let mut elements = array.borrow().elements.clone();
            for value in args {
                match value {
                    Value::Array(other) => elements.extend(other.borrow().elements.iter().cloned()),
                    other => elements.push(other.clone()),
                }
            }
            Ok(Value::array(elements))
        }
        "join" | "toString" => {
            let separator = match args.first() {
                Some(value) if method == "join" && !value.is_undefined() => value.to_js_string(),
                _ => ",".to_string(),
            };
            let mut parts = Vec::with_capacity(length);
            for index in 0..length {
                let item = element(array, index);
                parts.push(match item {
                    Value::Undefined | Value::Null => String::new(),
                    Value::Array(ref inner) if Rc::ptr_eq(inner, array) => String::new(),
                    other => interp.stringify(&other)?,
                });
            }
            Ok(Value::String(parts.join(&separator)))
        }
        "indexOf" => {
            let search = arg(args, 0);
            let start = position(args, 1, length, 0);
            let found = array.borrow().elements[start.min(length)..]
                .iter()
                .position(|item| strict_equals(item, &search));
            Ok(Value::Number(found.map_or(-1.0, |i| (start + i) as f64)))
        }
        "lastIndexOf" => {
            let search = arg(args, 0);
            let found = array
                .borrow()
                .elements
                .iter()
                .rposition(|item| strict_equals(item, &search));
            Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
        }
        "includes" => {
            let search = arg(args, 0);
            let start = position(args, 1, length, 0);
            let found = array.borrow().elements[start.min(length)..]
                .iter()
                .any(|item| same_value_zero(item, &search));
            Ok(Value::Boolean(found))
        }
        "reverse" => {
            array.borrow_mut().elements.reverse();
            Ok(Value::Array(array.clone()))
        }
        "fill" => {
            let value = arg(args, 0);
            let start = position(args, 1, length, 0);
            let end = position(args, 2, length, length);
            if start < end {
                array.borrow_mut().elements[start..end].fill(value);
            }
            Ok(Value::Array(array.clone()))
        }
        "sort" => {
            let items = array.borrow().elements.clone();
            let comparator = arg(args, 0);
            let sorted = if comparator.is_undefined() {
                merge_sort(items, &mut |a, b| Ok(default_order(a, b)))?
            } else if comparator.is_function() {
                merge_sort(items, &mut |a, b| {
                    let result = interp.call_function(&comparator, Value::Undefined, &[a.clone(), b.clone()])?;
                    let n = result.to_number();
                    Ok(if n < 0.0 {
                        Ordering::Less
                    } else if n > 0.0 {
                        Ordering::Greater
                    } else {
                        Ordering::Equal
                    })
                })?
            } else {
                return Err(Error::type_error("The comparison function must be a function"));
            };
            array.borrow_mut().elements = sorted;
            Ok(Value::Array(array.clone()))
        }
        "forEach" => {
            each(interp, array, args, |_, _, _| true)?;
            Ok(Value::Undefined)
        }
        "map" => {
            let mut mapped = Vec::with_capacity(length);
            each(interp, array, args, |_, _, result| {
                mapped.push(result);
                true
            })?;
            Ok(Value::array(mapped))
        }
        "filter" => {
            let mut kept = Vec::new();
            each(interp, array, args, |_, item, result| {
                if result.to_boolean() {
                    kept.push(item);
                }
                true
            })?;
            Ok(Value::array(kept))
        }
        "find" | "findIndex" => {
            let mut found = None;
            each(interp, array, args, |index, item, result| {
                if result.to_boolean() {
                    found = Some((index, item));
                    return false;
                }
                true
            })?;
            Ok(match (method, found) {
                ("find", Some((_, item))) => item,
                ("find", None) => Value::Undefined,
                (_, Some((index, _))) => Value::from(index),
                (_, None) => Value::Number(-1.0),
            })
        }
        "some" => {
            let mut any = false;
            each(interp, array, args, |_, _, result| {
                any = result.to_boolean();
                !any
            })?;
            Ok(Value::Boolean(any))
        }
        "every" => {
            let mut all = true;
            each(interp, array, args, |_, _, result| {
                all = result.to_boolean();
                all
            })?;
            Ok(Value::Boolean(all))
        }
        "reduce" => {
            let callback = arg(args, 0);
            if !callback.is_function() {
                return Err(Error::type_error(format!(
                    "{} is not a function",
                    callback.to_js_string()
                )));
            }
            let (mut accumulator, start) = match args.get(1) {
                Some(initial) => (initial.clone(), 0),
                None if length > 0 => (element(array, 0), 1),
                None => {
                    return Err(Error::type_error("Reduce of empty array with no initial value"));
                }
            };
            let target = Value::Array(array.clone());
            for index in start..length.min(len(array)) {
                let item = element(array, index);
                accumulator = interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[accumulator, item, Value::from(index), target.clone()],
                )?;
            }
            Ok(accumulator)
        }
        _ => Ok(Value::Undefined),
    }
}

/// Numbers compare numerically, undefined sorts last, anything else by
/// string form.
fn default_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => Ordering::Equal,
        (Value::Undefined, _) => Ordering::Greater,
        (_, Value::Undefined) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => a.to_js_string().cmp(&b.to_js_string()),
    }
}

/// A stable merge sort whose comparator may fail. Inconsistent
/// comparators produce some permutation rather than a panic.
fn merge_sort(
    mut items: Vec<Value>,
    compare: &mut dyn FnMut(&Value, &Value) -> Result<Ordering>,
) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if compare(a, b)? == Ordering::Greater {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, run_err};
    use super::*;

    #[test]
    fn test_stack_and_queue_methods() {
        assert_eq!(run("const a = [1, 2]; a.push(3, 4); a.join('-')"), Value::from("1-2-3-4"));
        assert_eq!(run("const a = [1, 2]; a.pop() + a.length"), Value::from(3));
        assert_eq!(run("const a = [1, 2]; a.shift(); a.unshift(7, 8); a.join()"), Value::from("7,8,2"));
        assert_eq!(run("[].pop()"), Value::Undefined);
    }

    #[test]
    fn test_slice_and_splice() {
        assert_eq!(run("[1, 2, 3, 4].slice(1, -1).join()"), Value::from("2,3"));
        assert_eq!(
            run("const a = [1, 2, 3, 4]; const r = a.splice(1, 2, 'x'); a.join() + '|' + r.join()"),
            Value::from("1,x,4|2,3")
        );
        assert_eq!(run("const a = [1, 2, 3]; a.splice(1); a.length"), Value::from(1));
    }

    #[test]
    fn test_search_methods() {
        assert_eq!(run("[1, 2, 3].indexOf(2)"), Value::from(1));
        assert_eq!(run("[1, 2, 3].indexOf('2')"), Value::from(-1));
        assert_eq!(run("[NaN].includes(NaN)"), Value::from(true));
        assert_eq!(run("[1, 2, 1].lastIndexOf(1)"), Value::from(2));
        assert_eq!(run("[5, 12, 8].find(x => x > 6)"), Value::from(12));
        assert_eq!(run("[5, 12, 8].findIndex(x => x > 100)"), Value::from(-1));
    }

    #[test]
    fn test_iteration_methods() {
        assert_eq!(run("[1, 2, 3].map((x, i) => x * i).join()"), Value::from("0,2,6"));
        assert_eq!(run("[1, 2, 3, 4].filter(x => x % 2 == 0).join()"), Value::from("2,4"));
        assert_eq!(run("[1, 2, 3].reduce((a, b) => a + b)"), Value::from(6));
        assert_eq!(run("[1, 2, 3].reduce((a, b) => a + b, 10)"), Value::from(16));
        assert_eq!(run("[1, 2].some(x => x > 1) && ![1, 2].every(x => x > 1)"), Value::from(true));
        assert_eq!(run("let s = 0; [1, 2, 3].forEach(x => { s += x; }); s"), Value::from(6));
        assert!(run_err("[].reduce((a, b) => a)").message().contains("Reduce of empty array"));
        assert!(run_err("[1].map(5)").message().contains("is not a function"));
    }

    #[test]
    fn test_sort() {
        assert_eq!(run("[10, 9, 1, 100].sort().join()"), Value::from("1,9,10,100"));
        assert_eq!(run("['b', 'c', 'a'].sort().join()"), Value::from("a,b,c"));
        assert_eq!(run("[1, 3, 2].sort((a, b) => b - a).join()"), Value::from("3,2,1"));
        assert_eq!(
            run("const xs = [{ k: 1, v: 'a' }, { k: 0, v: 'b' }, { k: 1, v: 'c' }];
                 xs.sort((a, b) => a.k - b.k).map(x => x.v).join('')"),
            Value::from("bac")
        );
    }

    #[test]
    fn test_misc() {
        assert_eq!(run("[1, 2].concat([3], 4).join()"), Value::from("1,2,3,4"));
        assert_eq!(run("[1, 2, 3].reverse().join()"), Value::from("3,2,1"));
        assert_eq!(run("[1, 2, 3].at(-1)"), Value::from(3));
        assert_eq!(run("new Array(3).fill(0).join()"), Value::from("0,0,0"));
        assert_eq!(run("[1, [2, 3], null].join(';')"), Value::from("1;2,3;"));
    }

    #[test]
    fn test_callback_may_mutate() {
        assert_eq!(
            run("const a = [1, 2, 3]; a.forEach(x => a.push(x)); a.length"),
            Value::from(6)
        );
    }
}
