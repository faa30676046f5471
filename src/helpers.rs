use num_cmp::NumCmp;
use serde_json::{Map, Value};

macro_rules! num_cmp {
    ($left:expr, $right:expr) => {
        if let Some(b) = $right.as_u64() {
            NumCmp::num_eq($left, b)
        } else if let Some(b) = $right.as_i64() {
            NumCmp::num_eq($left, b)
        } else {
            NumCmp::num_eq($left, $right.as_f64().expect("Always valid"))
        }
    };
}

/// Deep JSON equality with cross-representation numeric comparison, so that
/// `1 == 1.0` holds for `const`, `enum` and `uniqueItems`.
#[inline]
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(left), Value::String(right)) => left == right,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Null, Value::Null) => true,
        (Value::Number(left), Value::Number(right)) => {
            if let Some(a) = left.as_u64() {
                num_cmp!(a, right)
            } else if let Some(a) = left.as_i64() {
                num_cmp!(a, right)
            } else {
                let a = left.as_f64().expect("Always valid");
                num_cmp!(a, right)
            }
        }
        (Value::Array(left), Value::Array(right)) => equal_arrays(left, right),
        (Value::Object(left), Value::Object(right)) => equal_objects(left, right),
        (_, _) => false,
    }
}

#[inline]
pub(crate) fn equal_arrays(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| equal(a, b))
}

#[inline]
pub(crate) fn equal_objects(left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.get(key).map_or(false, |other| equal(value, other)))
}

/// Escape a single reference token per RFC 6901.
pub(crate) fn escape_token(token: &str) -> String {
    if token.contains('~') || token.contains('/') {
        token.replace('~', "~0").replace('/', "~1")
    } else {
        token.to_string()
    }
}

/// Undo RFC 6901 escaping in a reference token.
pub(crate) fn unescape_token(token: &str) -> String {
    if token.contains('~') {
        token.replace("~1", "/").replace("~0", "~")
    } else {
        token.to_string()
    }
}

/// `<path>/<token>` with the token escaped.
pub(crate) fn join_key(path: &str, token: &str) -> String {
    let mut joined = String::with_capacity(path.len() + token.len() + 1);
    joined.push_str(path);
    joined.push('/');
    joined.push_str(&escape_token(token));
    joined
}

/// `<path>/<index>`.
pub(crate) fn join_index(path: &str, index: usize) -> String {
    let mut buffer = itoa::Buffer::new();
    let index = buffer.format(index);
    let mut joined = String::with_capacity(path.len() + index.len() + 1);
    joined.push_str(path);
    joined.push('/');
    joined.push_str(index);
    joined
}
