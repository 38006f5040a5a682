//! Operators on guest values

use std::cmp::Ordering;

use super::exception::{Exception, ExceptionKind};
use super::interp::Limits;
use super::value::{Value, MAX_VALUE_DEPTH};
use crate::frontend::parser::ast::{BinOp, CmpOp, UnOp};

fn unsupported(
    op: &str,
    a: &Value,
    b: &Value,
) -> Exception {
    Exception::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        a.type_name(),
        b.type_name()
    ))
}

/// Apply a binary arithmetic operator
pub fn binary(
    op: BinOp,
    a: &Value,
    b: &Value,
    limits: &Limits,
) -> Result<Value, Exception> {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        return int_binary(op, x, y);
    }
    if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
        return float_binary(op, x, y);
    }

    match (op, a, b) {
        (BinOp::Add, Value::Str(x), Value::Str(y)) => {
            let mut s = String::new();
            reserve_str(&mut s, x.len().checked_add(y.len()), limits)?;
            s.push_str(x);
            s.push_str(y);
            Ok(Value::str(s))
        }
        (BinOp::Add, Value::List(x), Value::List(y)) => {
            let x = x.lock().clone();
            let y = y.lock().clone();
            let mut items = Vec::new();
            reserve_items(&mut items, x.len().checked_add(y.len()), limits)?;
            items.extend(x);
            items.extend(y);
            Ok(Value::list(items))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let count = repeat_count(n)?;
            let mut out = String::new();
            reserve_str(&mut out, s.len().checked_mul(count), limits)?;
            for _ in 0..count {
                out.push_str(s);
            }
            Ok(Value::str(out))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let count = repeat_count(n)?;
            let items = items.lock().clone();
            let mut out = Vec::new();
            reserve_items(&mut out, items.len().checked_mul(count), limits)?;
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        _ => Err(unsupported(op.symbol(), a, b)),
    }
}

fn repeat_count(n: &Value) -> Result<usize, Exception> {
    let n = n.as_int().unwrap_or(0);
    usize::try_from(n.max(0)).map_err(|_| Exception::overflow())
}

/// Room for `len` bytes, or `MemoryError` past the sequence limit
fn reserve_str(
    s: &mut String,
    len: Option<usize>,
    limits: &Limits,
) -> Result<(), Exception> {
    match len {
        Some(len) if len <= limits.max_sequence_len => {
            s.try_reserve_exact(len).map_err(|_| Exception::memory_error())
        }
        _ => Err(Exception::memory_error()),
    }
}

/// Room for `len` items, or `MemoryError` past the sequence limit
fn reserve_items(
    items: &mut Vec<Value>,
    len: Option<usize>,
    limits: &Limits,
) -> Result<(), Exception> {
    match len {
        Some(len) if len <= limits.max_sequence_len => {
            items.try_reserve_exact(len).map_err(|_| Exception::memory_error())
        }
        _ => Err(Exception::memory_error()),
    }
}

fn int_binary(
    op: BinOp,
    x: i64,
    y: i64,
) -> Result<Value, Exception> {
    let result = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => {
            if y == 0 {
                return Err(Exception::zero_division("division by zero"));
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(Exception::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            x.checked_div(y).map(|q| {
                if x % y != 0 && ((x < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(Exception::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            x.checked_rem(y).map(|r| {
                if r != 0 && ((r < 0) != (y < 0)) {
                    r + y
                } else {
                    r
                }
            })
        }
        BinOp::Pow => {
            if y < 0 {
                return float_binary(op, x as f64, y as f64);
            }
            u32::try_from(y).ok().and_then(|e| x.checked_pow(e))
        }
    };
    result.map(Value::Int).ok_or_else(Exception::overflow)
}

fn float_binary(
    op: BinOp,
    x: f64,
    y: f64,
) -> Result<Value, Exception> {
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(Exception::zero_division("float division by zero"));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(Exception::zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(Exception::zero_division("float modulo"));
            }
            x - y * (x / y).floor()
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(Exception::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            x.powf(y)
        }
    };
    Ok(Value::Float(value))
}

/// Apply a unary operator
pub fn unary(
    op: UnOp,
    v: &Value,
) -> Result<Value, Exception> {
    match op {
        UnOp::Not => Ok(Value::Bool(!v.truthy())),
        UnOp::Neg => match v {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match other.as_int() {
                Some(i) => i.checked_neg().map(Value::Int).ok_or_else(Exception::overflow),
                None => Err(Exception::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
        },
        UnOp::Pos => match v {
            Value::Float(f) => Ok(Value::Float(*f)),
            other => match other.as_int() {
                Some(i) => Ok(Value::Int(i)),
                None => Err(Exception::type_error(format!(
                    "bad operand type for unary +: '{}'",
                    other.type_name()
                ))),
            },
        },
    }
}

/// Order two values for `<`, `min`, `max`
pub fn ordering(
    a: &Value,
    b: &Value,
    symbol: &str,
) -> Result<Ordering, Exception> {
    ordering_at(a, b, symbol, 0)
}

fn ordering_at(
    a: &Value,
    b: &Value,
    symbol: &str,
    depth: usize,
) -> Result<Ordering, Exception> {
    let not_supported = || {
        Exception::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            a.type_name(),
            b.type_name()
        ))
    };
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        return Ok(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
        return x.partial_cmp(&y).ok_or_else(not_supported);
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::List(x), Value::List(y)) => {
            if depth >= MAX_VALUE_DEPTH {
                return Err(Exception::new(
                    ExceptionKind::RecursionError,
                    "maximum recursion depth exceeded in comparison",
                ));
            }
            let x = x.lock().clone();
            let y = y.lock().clone();
            for (l, r) in x.iter().zip(y.iter()) {
                if !l.try_eq(r)? {
                    return ordering_at(l, r, symbol, depth + 1);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => Err(not_supported()),
    }
}

/// Evaluate one comparison link
pub fn compare(
    op: CmpOp,
    a: &Value,
    b: &Value,
) -> Result<bool, Exception> {
    match op {
        CmpOp::Eq => a.try_eq(b),
        CmpOp::Ne => a.try_eq(b).map(|equal| !equal),
        CmpOp::Is => Ok(a.is_same(b)),
        CmpOp::IsNot => Ok(!a.is_same(b)),
        CmpOp::In => contains(b, a),
        CmpOp::NotIn => contains(b, a).map(|found| !found),
        CmpOp::Lt => ordering(a, b, "<").map(|o| o == Ordering::Less),
        CmpOp::Le => ordering(a, b, "<=").map(|o| o != Ordering::Greater),
        CmpOp::Gt => ordering(a, b, ">").map(|o| o == Ordering::Greater),
        CmpOp::Ge => ordering(a, b, ">=").map(|o| o != Ordering::Less),
    }
}

/// `needle in container`
pub fn contains(
    container: &Value,
    needle: &Value,
) -> Result<bool, Exception> {
    match container {
        Value::Str(haystack) => match needle {
            Value::Str(n) => Ok(haystack.contains(&**n)),
            other => Err(Exception::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => {
            let items = items.lock().clone();
            for item in &items {
                if item.try_eq(needle)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Range(r) => Ok(match needle {
            Value::Float(f) if f.fract() == 0.0 => r.contains(*f as i64),
            other => other.as_int().is_some_and(|i| r.contains(i)),
        }),
        other => Err(Exception::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Materialize an iterable
pub fn iterate(value: &Value) -> Result<Vec<Value>, Exception> {
    match value {
        Value::List(items) => Ok(items.lock().clone()),
        Value::Range(r) => {
            let mut items = Vec::new();
            items
                .try_reserve_exact(r.len())
                .map_err(|_| Exception::memory_error())?;
            items.extend((0..r.len()).filter_map(|i| r.get(i)).map(Value::Int));
            Ok(items)
        }
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(Exception::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn normalize_index(
    index: &Value,
    len: usize,
    what: &str,
) -> Result<usize, Exception> {
    let i = index.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "{} indices must be integers, not {}",
            what,
            index.type_name()
        ))
    })?;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved as usize >= len {
        return Err(Exception::index_error(format!("{} index out of range", what)));
    }
    Ok(resolved as usize)
}

/// `value[index]`
pub fn get_item(
    value: &Value,
    index: &Value,
) -> Result<Value, Exception> {
    match value {
        Value::List(items) => {
            let items = items.lock();
            let i = normalize_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let i = normalize_index(index, len, "string")?;
            Ok(s
                .chars()
                .nth(i)
                .map(|c| Value::str(c.to_string()))
                .unwrap_or(Value::None))
        }
        Value::Range(r) => {
            let i = normalize_index(index, r.len(), "range object")?;
            Ok(r.get(i).map(Value::Int).unwrap_or(Value::None))
        }
        other => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `value[index] = item`
pub fn set_item(
    value: &Value,
    index: &Value,
    item: Value,
) -> Result<(), Exception> {
    match value {
        Value::List(items) => {
            let mut items = items.lock();
            let i = normalize_index(index, items.len(), "list assignment")?;
            items[i] = item;
            Ok(())
        }
        other => Err(Exception::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::exception::ExceptionKind;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    fn apply(
        op: BinOp,
        a: &Value,
        b: &Value,
    ) -> Result<Value, Exception> {
        binary(op, a, b, &Limits::default())
    }

    fn nested(depth: usize) -> Value {
        let mut value = Value::list(Vec::new());
        for _ in 0..depth {
            value = Value::list(vec![value]);
        }
        value
    }

    #[test]
    fn test_floor_semantics() {
        assert_eq!(apply(BinOp::FloorDiv, &int(-7), &int(2)).unwrap(), int(-4));
        assert_eq!(apply(BinOp::Mod, &int(-7), &int(2)).unwrap(), int(1));
        assert_eq!(apply(BinOp::Mod, &int(7), &int(-2)).unwrap(), int(-1));
        assert_eq!(
            apply(BinOp::Mod, &Value::Float(-7.0), &int(2)).unwrap(),
            Value::Float(1.0)
        );
    }

    #[test]
    fn test_division_by_zero() {
        let err = apply(BinOp::Div, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::ZeroDivisionError);
        assert_eq!(err.summary(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_overflow_and_pow() {
        let err = apply(BinOp::Mul, &int(i64::MAX), &int(2)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::OverflowError);
        assert_eq!(apply(BinOp::Pow, &int(2), &int(10)).unwrap(), int(1024));
        assert_eq!(
            apply(BinOp::Pow, &int(2), &int(-1)).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            apply(BinOp::Add, &Value::str("ab"), &Value::str("c")).unwrap(),
            Value::str("abc")
        );
        assert_eq!(
            apply(BinOp::Mul, &int(3), &Value::str("x")).unwrap(),
            Value::str("xxx")
        );
        let err = apply(BinOp::Add, &int(1), &Value::str("x")).unwrap_err();
        assert_eq!(
            err.summary(),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
    }

    #[test]
    fn test_repeat_past_limit_is_memory_error() {
        let pair = Value::list(vec![int(1), int(2)]);
        let err = apply(BinOp::Mul, &pair, &int(1 << 31)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);
        let err = apply(BinOp::Mul, &Value::str("ab"), &int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);

        let small = Limits {
            max_sequence_len: 4,
            ..Limits::default()
        };
        assert_eq!(
            binary(BinOp::Mul, &pair, &int(2), &small).unwrap(),
            Value::list(vec![int(1), int(2), int(1), int(2)])
        );
        let err = binary(BinOp::Mul, &pair, &int(3), &small).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);
        let err = binary(BinOp::Add, &Value::str("abc"), &Value::str("de"), &small).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);
        assert_eq!(apply(BinOp::Mul, &pair, &int(-3)).unwrap(), Value::list(Vec::new()));
    }

    #[test]
    fn test_deep_comparison_is_recursion_error() {
        let (a, b) = (nested(10_000), nested(10_000));
        let err = compare(CmpOp::Eq, &a, &b).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::RecursionError);
        assert!(compare(CmpOp::Lt, &a, &b).is_err());
        assert!(compare(CmpOp::In, &a, &Value::list(vec![b.clone()])).is_err());
        assert!(compare(CmpOp::Eq, &nested(50), &nested(50)).unwrap());
        assert!(compare(CmpOp::Eq, &a, &a).unwrap());
    }

    #[test]
    fn test_compare() {
        assert!(compare(CmpOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(CmpOp::In, &Value::str("b"), &Value::str("abc")).unwrap());
        assert!(compare(CmpOp::NotIn, &int(4), &Value::list(vec![int(1)])).unwrap());
        assert!(compare(CmpOp::Lt, &int(1), &Value::str("a")).is_err());
    }

    #[test]
    fn test_indexing() {
        let list = Value::list(vec![int(1), int(2), int(3)]);
        assert_eq!(get_item(&list, &int(-1)).unwrap(), int(3));
        assert_eq!(
            get_item(&list, &int(3)).unwrap_err().kind(),
            ExceptionKind::IndexError
        );
        set_item(&list, &int(0), int(9)).unwrap();
        assert_eq!(get_item(&list, &int(0)).unwrap(), int(9));
        assert_eq!(get_item(&Value::str("héllo"), &int(1)).unwrap(), Value::str("é"));
    }
}
