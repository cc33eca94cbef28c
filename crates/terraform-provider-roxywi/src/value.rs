// Helpers between Terraform's three-state values and plain Rust values.
//
// Request bodies treat null and unknown as the zero value; state refresh
// keeps an unset optional attribute null when the API reports nothing.

use tf_provider::value::Value;

pub type Str = Value<String>;
pub type Int = Value<i64>;
pub type Flag = Value<bool>;
pub type StrList = Value<Vec<Value<String>>>;
/// A list or set of nested blocks.
pub type Blocks<T> = Value<Vec<T>>;

pub fn known<T>(value: &Value<T>) -> Option<&T> {
    match value {
        Value::Value(inner) => Some(inner),
        Value::Null | Value::Unknown => None,
    }
}

pub fn is_unknown<T>(value: &Value<T>) -> bool {
    matches!(value, Value::Unknown)
}

pub fn text(value: &Str) -> String {
    known(value).cloned().unwrap_or_default()
}

pub fn as_str(value: &Str) -> &str {
    known(value).map_or("", String::as_str)
}

pub fn int(value: &Int) -> i64 {
    known(value).copied().unwrap_or_default()
}

pub fn flag(value: &Flag) -> bool {
    known(value).copied().unwrap_or_default()
}

/// Known elements of a string list; null and unknown entries are dropped.
pub fn strings(value: &StrList) -> Vec<String> {
    items(value).iter().filter_map(known).cloned().collect()
}

pub fn items<T>(value: &Value<Vec<T>>) -> &[T] {
    known(value).map_or(&[], Vec::as_slice)
}

pub fn items_mut<T>(value: &mut Value<Vec<T>>) -> &mut [T] {
    match value {
        Value::Value(inner) => inner.as_mut_slice(),
        Value::Null | Value::Unknown => Default::default(),
    }
}

pub fn first<T>(value: &Value<Vec<T>>) -> Option<&T> {
    items(value).first()
}

/// Fill a null attribute with its schema default. Unknown stays unknown.
pub fn default_to<T>(value: &mut Value<T>, default: T) {
    if matches!(value, Value::Null) {
        *value = Value::Value(default);
    }
}

pub fn string_list(values: Vec<String>) -> StrList {
    Value::Value(values.into_iter().map(Value::Value).collect())
}

/// A single-element block from an optional API object.
pub fn single<T>(item: Option<T>) -> Blocks<T> {
    Value::Value(item.into_iter().collect())
}

/// Server value for a refreshed attribute. An attribute the user left null
/// stays null while the API reports the zero value for it.
pub fn refreshed<T: Default + PartialEq>(prior: &Value<T>, fresh: T) -> Value<T> {
    if matches!(prior, Value::Null) && fresh == T::default() {
        Value::Null
    } else {
        Value::Value(fresh)
    }
}

/// Optional attribute inside a nested block: the API's zero value reads as null.
pub fn non_empty(fresh: String) -> Str {
    if fresh.is_empty() {
        Value::Null
    } else {
        Value::Value(fresh)
    }
}

pub fn non_zero(fresh: i64) -> Int {
    if fresh == 0 {
        Value::Null
    } else {
        Value::Value(fresh)
    }
}

/// Like [`refreshed`] for string lists.
pub fn refreshed_list(prior: &StrList, fresh: Vec<String>) -> StrList {
    if matches!(prior, Value::Null) && fresh.is_empty() {
        Value::Null
    } else {
        string_list(fresh)
    }
}

/// Split a composite ID on `-` into at least `min_parts` parts. The last
/// part keeps any further dashes.
pub fn split_id(id: &str, min_parts: usize) -> Result<Vec<&str>, crate::error::ProviderError> {
    let parts: Vec<&str> = id.splitn(min_parts, '-').collect();
    if parts.len() < min_parts.max(2) || parts.iter().any(|p| p.is_empty()) {
        return Err(crate::error::ProviderError::InvalidId(id.to_owned()));
    }
    Ok(parts)
}

/// Parse a numeric ID segment.
pub fn id_number(id: &str, part: &str) -> Result<i64, crate::error::ProviderError> {
    part.parse()
        .map_err(|_| crate::error::ProviderError::InvalidId(id.to_owned()))
}
