//! Classifiers for declared parameter type strings.
//!
//! Each `get_type_of_*` function returns `0` when the string is not of its kind and a
//! nonzero code otherwise. The codes are part of the backends' dispatch:
//!
//! | Classifier | Accepted | Code |
//! |---|---|---|
//! | [`get_type_of_int`] | `int`, `uintN`, `sintN` | `1`, `N`, `-N` |
//! | [`get_type_of_bool`] | `bool`, `bool8` | `1`, `8` |
//! | [`get_type_of_enum`] | `enum`, `enumN`, `signed_enumN` | `1`, `N`, `-N` |
//! | [`get_type_of_string`] | `string`, `wstring` | `1`, `2` |
//! | [`get_type_of_tuple`] | `string_tuple`, `int_tuple`, `strint_tuple`, `struint8_tuple` | `1`, `-1`, `2`, `8` |
//! | [`get_type_of_array`] | `uintN_array` | `N` |
//! | [`get_type_of_bag`] | `bag` | `1` |
//! | [`get_type_of_addr`] | `addr` | `1` |

const INT_WIDTHS: [i32; 4] = [8, 16, 32, 64];
const ENUM_WIDTHS: [i32; 3] = [8, 16, 32];
const ARRAY_WIDTHS: [i32; 3] = [8, 16, 32];

fn width_after(s: &str, prefix: &str, widths: &[i32]) -> i32 {
    s.strip_prefix(prefix)
        .and_then(|rest| rest.parse::<i32>().ok())
        .filter(|n| widths.contains(n))
        .unwrap_or(0)
}

pub fn get_type_of_int(s: &str) -> i32 {
    if s == "int" {
        return 1;
    }
    // uint8_array and friends fail the numeric parse and fall through to 0.
    let n = width_after(s, "uint", &INT_WIDTHS);
    if n != 0 {
        return n;
    }
    -width_after(s, "sint", &INT_WIDTHS)
}

pub fn get_type_of_bool(s: &str) -> i32 {
    match s {
        "bool" => 1,
        "bool8" => 8,
        _ => 0,
    }
}

pub fn get_type_of_enum(s: &str) -> i32 {
    if s == "enum" {
        return 1;
    }
    let n = width_after(s, "enum", &ENUM_WIDTHS);
    if n != 0 {
        return n;
    }
    -width_after(s, "signed_enum", &ENUM_WIDTHS)
}

pub fn get_type_of_string(s: &str) -> i32 {
    match s {
        "string" => 1,
        "wstring" => 2,
        _ => 0,
    }
}

pub fn get_type_of_tuple(s: &str) -> i32 {
    match s {
        "string_tuple" => 1,
        "int_tuple" => -1,
        "strint_tuple" => 2,
        "struint8_tuple" => 8,
        _ => 0,
    }
}

pub fn get_type_of_array(s: &str) -> i32 {
    s.strip_suffix("_array")
        .map(|base| width_after(base, "uint", &ARRAY_WIDTHS))
        .unwrap_or(0)
}

pub fn get_type_of_bag(s: &str) -> i32 {
    i32::from(s == "bag")
}

pub fn get_type_of_addr(s: &str) -> i32 {
    i32::from(s == "addr")
}

/// Result of classifying a type string: which kind it is and its classifier code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Int(i32),
    Bool(i32),
    Enum(i32),
    String(i32),
    Tuple(i32),
    Array(i32),
    Bag,
    Addr,
}

/// Run the classifiers in order; `None` for unrecognized type strings.
pub fn classify(s: &str) -> Option<TypeClass> {
    let checks: [(fn(&str) -> i32, fn(i32) -> TypeClass); 8] = [
        (get_type_of_int, TypeClass::Int),
        (get_type_of_bool, TypeClass::Bool),
        (get_type_of_enum, TypeClass::Enum),
        (get_type_of_string, TypeClass::String),
        (get_type_of_tuple, TypeClass::Tuple),
        (get_type_of_array, TypeClass::Array),
        (get_type_of_bag, |_| TypeClass::Bag),
        (get_type_of_addr, |_| TypeClass::Addr),
    ];
    checks
        .iter()
        .find_map(|(classify_fn, make)| match classify_fn(s) {
            0 => None,
            code => Some(make(code)),
        })
}

/// C struct field names `(key, value)` used by a tuple kind.
///
/// `strint` and `struint8` both take a string key pointer `key_p` and a plain `value`.
pub fn tuple_field_names(code: i32) -> (&'static str, &'static str) {
    match code {
        1 => ("key_p", "value_p"),
        -1 => ("key", "value"),
        2 | 8 => ("key_p", "value"),
        _ => ("key", "value"),
    }
}
