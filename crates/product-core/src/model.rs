use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Name of the partition key attribute of the products table.
pub const PRODUCT_ID_ATTRIBUTE: &str = "productId";

// ---------------------------------------------------------------------------
// ProductId
// ---------------------------------------------------------------------------

/// DynamoDB limit for a partition key value, in bytes.
const MAX_PRODUCT_ID_LENGTH: usize = 2048;

/// A validated product identifier: a non-empty string of at most 2048 bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Create a new `ProductId` after validation.
    pub fn new(s: impl Into<String>) -> Result<Self, ModelError> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError::EmptyProductId);
        }

        if s.len() > MAX_PRODUCT_ID_LENGTH {
            return Err(ModelError::ProductIdTooLong(s.len()));
        }

        Ok(Self(s))
    }
}

impl TryFrom<String> for ProductId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// AttributeName
// ---------------------------------------------------------------------------

const MAX_ATTRIBUTE_NAME_LENGTH: usize = 255;

/// A caller-supplied attribute name that is safe to target with an update.
///
/// Never empty, at most 255 bytes, free of control characters, and never the
/// partition key (the key of an existing record cannot be rewritten in place).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeName(String);

impl AttributeName {
    pub fn new(s: impl Into<String>) -> Result<Self, ModelError> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError::EmptyAttributeName);
        }

        if s.len() > MAX_ATTRIBUTE_NAME_LENGTH {
            return Err(ModelError::AttributeNameTooLong(s.len()));
        }

        if s.chars().any(char::is_control) {
            return Err(ModelError::InvalidAttributeName);
        }

        if s == PRODUCT_ID_ATTRIBUTE {
            return Err(ModelError::KeyAttribute);
        }

        Ok(Self(s))
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AttributeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// DynamoDB keeps at most 38 significant digits of a number.
const MAX_SIGNIFICANT_DIGITS: usize = 38;

/// Smallest and largest power of ten of a non-zero DynamoDB number's leading
/// digit (1e-130 up to 9.99..e125).
const MIN_EXPONENT: i64 = -130;
const MAX_EXPONENT: i64 = 125;

/// An exact decimal number as the store keeps it (the text of an `N`
/// attribute).
///
/// JSON encoding goes through `f64`, except for plain integer literals that
/// fit in 64 bits, which are written as JSON integers.
#[derive(Debug, Clone)]
pub struct Decimal {
    repr: String,
    value: f64,
}

impl Decimal {
    /// Validate `s` as a finite number within the store's precision and
    /// magnitude limits.
    pub fn new(s: impl Into<String>) -> Result<Self, ModelError> {
        let repr = s.into();
        let value = match repr.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => return Err(ModelError::InvalidNumber(repr)),
        };

        let Some((digits, exponent)) = significant_digits(&repr) else {
            return Err(ModelError::InvalidNumber(repr));
        };
        if digits > MAX_SIGNIFICANT_DIGITS {
            return Err(ModelError::NumberTooPrecise(repr));
        }
        if digits > 0 && !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(ModelError::NumberOutOfRange(repr));
        }

        Ok(Self { repr, value })
    }

    /// The exact textual representation.
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    pub fn to_f64(&self) -> f64 {
        self.value
    }

    fn is_integer_literal(&self) -> bool {
        let digits = self.repr.strip_prefix('-').unwrap_or(&self.repr);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Count the significant digits of a decimal literal and find the power of
/// ten of its leading one. Zero has no significant digits.
fn significant_digits(repr: &str) -> Option<(usize, i64)> {
    let unsigned = repr.trim_start_matches(['+', '-']);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes()).collect();
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let Some(first) = digits.iter().position(|&d| d != b'0') else {
        return Some((0, 0));
    };
    let last = digits.iter().rposition(|&d| d != b'0').unwrap_or(first);
    let leading_power = exponent + int_part.len() as i64 - 1 - first as i64;

    Some((last - first + 1, leading_power))
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Self {
            repr: v.to_string(),
            value: v as f64,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_integer_literal() {
            if let Ok(i) = self.repr.parse::<i64>() {
                return serializer.serialize_i64(i);
            }
            if let Ok(u) = self.repr.parse::<u64>() {
                return serializer.serialize_u64(u);
            }
        }
        serializer.serialize_f64(self.value)
    }
}

// ---------------------------------------------------------------------------
// AttrValue
// ---------------------------------------------------------------------------

/// A schemaless attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Decimal),
    String(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl TryFrom<Value> for AttrValue {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(Decimal::new(n.to_string())?),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| Ok((k, Self::try_from(v)?)))
                    .collect::<Result<_, ModelError>>()?,
            ),
        })
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Decimal> for AttrValue {
    fn from(d: Decimal) -> Self {
        Self::Number(d)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(d) => d.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(fields) => serializer.collect_map(fields),
        }
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A product record: an open set of attributes that always carries a valid
/// string `productId`.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    attributes: BTreeMap<String, AttrValue>,
}

impl Product {
    /// A record holding nothing but its key.
    pub fn new(id: ProductId) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            PRODUCT_ID_ATTRIBUTE.to_string(),
            AttrValue::String(id.to_string()),
        );
        Self { id, attributes }
    }

    /// Build a record from a raw attribute map, checking the key attribute.
    pub fn from_attributes(attributes: BTreeMap<String, AttrValue>) -> Result<Self, ModelError> {
        let id = match attributes.get(PRODUCT_ID_ATTRIBUTE) {
            Some(AttrValue::String(s)) => ProductId::new(s.clone())?,
            Some(_) => return Err(ModelError::ProductIdNotString),
            None => return Err(ModelError::MissingProductId),
        };
        Ok(Self { id, attributes })
    }

    pub fn with_attribute(mut self, name: AttributeName, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.0, value.into());
        self
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }
}

impl TryFrom<Value> for Product {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match AttrValue::try_from(value)? {
            AttrValue::Map(fields) => Self::from_attributes(fields),
            _ => Err(ModelError::NotAnObject),
        }
    }
}

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Product {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let attributes = BTreeMap::<String, AttrValue>::deserialize(deserializer)?;
        Self::from_attributes(attributes).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when validating product data.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("productId must not be empty")]
    EmptyProductId,

    #[error("productId length {0} exceeds maximum of {MAX_PRODUCT_ID_LENGTH}")]
    ProductIdTooLong(usize),

    #[error("productId is required")]
    MissingProductId,

    #[error("productId must be a string")]
    ProductIdNotString,

    #[error("product must be a JSON object")]
    NotAnObject,

    #[error("attribute name must not be empty")]
    EmptyAttributeName,

    #[error("attribute name length {0} exceeds maximum of {MAX_ATTRIBUTE_NAME_LENGTH}")]
    AttributeNameTooLong(usize),

    #[error("attribute name must not contain control characters")]
    InvalidAttributeName,

    #[error("attribute {PRODUCT_ID_ATTRIBUTE} cannot be updated")]
    KeyAttribute,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("number {0} has more than {MAX_SIGNIFICANT_DIGITS} significant digits")]
    NumberTooPrecise(String),

    #[error("number {0} is outside the range 1e{MIN_EXPONENT} to 1e{max}", max = MAX_EXPONENT + 1)]
    NumberOutOfRange(String),
}
