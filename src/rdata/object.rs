//! In-memory form of a deserialized R object.

/// Named attributes in serialization order (`names`, `class`, `row.names`, ...).
pub type Attributes = Vec<(String, RObject)>;

#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Null,
    Symbol(String),
    Logical(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    /// Kept as raw doubles: `NA` and `NaN` both stay NaN, and `integer64` needs the bits.
    Real(Vec<f64>),
    Complex(Vec<(f64, f64)>),
    Character(Vec<Option<String>>),
    List(Vec<RObject>),
    PairList(Vec<(Option<String>, RObject)>),
    Raw(Vec<u8>),
    Environment,
    /// Parsed but not materialized: closures, calls, promises, builtins, S4 slots.
    Opaque(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RObject {
    pub value: RValue,
    pub attributes: Attributes,
}

impl RObject {
    pub fn new(value: RValue) -> Self {
        Self {
            value,
            attributes: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self::new(RValue::Null)
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&RObject> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Values of the `class` attribute, empty when unclassed.
    pub fn classes(&self) -> Vec<&str> {
        match self.attr("class").map(|c| &c.value) {
            Some(RValue::Character(v)) => v.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn inherits(&self, class: &str) -> bool {
        self.classes().iter().any(|c| *c == class)
    }

    /// Element names from the `names` attribute.
    pub fn names(&self) -> Option<&[Option<String>]> {
        match self.attr("names").map(|n| &n.value) {
            Some(RValue::Character(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.value {
            RValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// First element of a character vector, used for scalar attributes like `tzone`.
    pub fn as_scalar_string(&self) -> Option<&str> {
        match &self.value {
            RValue::Character(v) => v.first().and_then(|s| s.as_deref()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.value {
            RValue::Null | RValue::Environment | RValue::Opaque(_) => 0,
            RValue::Symbol(_) => 1,
            RValue::Logical(v) => v.len(),
            RValue::Integer(v) => v.len(),
            RValue::Real(v) => v.len(),
            RValue::Complex(v) => v.len(),
            RValue::Character(v) => v.len(),
            RValue::List(v) => v.len(),
            RValue::PairList(v) => v.len(),
            RValue::Raw(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn a tagged pairlist into attribute pairs, dropping untagged entries.
    pub fn into_attributes(self) -> Attributes {
        match self.value {
            RValue::PairList(items) => items
                .into_iter()
                .filter_map(|(tag, v)| tag.map(|t| (t, v)))
                .collect(),
            _ => Vec::new(),
        }
    }
}
