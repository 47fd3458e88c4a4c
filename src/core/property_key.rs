use std::rc::Rc;

/// Largest valid array index, `2^32 - 2`.
pub const MAX_ARRAY_INDEX: u64 = 4_294_967_294;

/// Largest valid integer index, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

#[derive(Debug)]
pub struct SymbolData {
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub enum PropertyKey {
    String(String),
    Symbol(Rc<SymbolData>),
}

impl PropertyKey {
    pub fn from_index(index: u64) -> Self {
        PropertyKey::String(index.to_string())
    }

    pub fn new_symbol(description: Option<&str>) -> Self {
        PropertyKey::Symbol(Rc::new(SymbolData {
            description: description.map(str::to_string),
        }))
    }

    /// Returns the numeric value when this key is the canonical form of an
    /// array index (`"0"` ..= `"4294967294"`, no sign, no leading zeros).
    pub fn array_index(&self) -> Option<u64> {
        match self {
            PropertyKey::String(s) => parse_array_index(s),
            PropertyKey::Symbol(_) => None,
        }
    }
}

pub fn parse_array_index(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        n = n * 10 + u64::from(b - b'0');
    }
    (n <= MAX_ARRAY_INDEX).then_some(n)
}

pub fn is_array_index(index: u64) -> bool {
    index <= MAX_ARRAY_INDEX
}

pub fn is_integer_index(index: u64) -> bool {
    index <= MAX_SAFE_INTEGER
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<&String> for PropertyKey {
    fn from(s: &String) -> Self {
        PropertyKey::String(s.clone())
    }
}

impl From<u64> for PropertyKey {
    fn from(index: u64) -> Self {
        PropertyKey::from_index(index)
    }
}

impl PartialEq for PropertyKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyKey::String(s1), PropertyKey::String(s2)) => s1 == s2,
            (PropertyKey::Symbol(sym1), PropertyKey::Symbol(sym2)) => Rc::ptr_eq(sym1, sym2),
            _ => false,
        }
    }
}

impl Eq for PropertyKey {}

impl std::hash::Hash for PropertyKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            PropertyKey::String(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            PropertyKey::Symbol(sym) => {
                1u8.hash(state);
                Rc::as_ptr(sym).hash(state);
            }
        }
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Symbol(sym) => match &sym.description {
                Some(d) => write!(f, "Symbol({})", d),
                None => write!(f, "Symbol()"),
            },
        }
    }
}
