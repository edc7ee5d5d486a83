//! Extension-bag property values.

use serde::{Deserialize, Serialize};

/// A value in a device's open extension bag.
///
/// Required device fields (`value`, `timestamp_ns`, `quality`) are
/// first-class typed members of [`Device`](crate::Device); everything
/// else - limits, labels, scale factors, hardware locators - lives in
/// the extension map as one of these.
///
/// # Example
///
/// ```
/// use thermand_state::PropertyValue;
///
/// let scale = PropertyValue::Number(0.001);
/// assert_eq!(scale.as_number(), Some(0.001));
/// assert_eq!(scale.as_text(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// An integer property (e.g. a priority, a raw register value).
    Integer(i64),
    /// A real-number property (e.g. a scale factor, a limit).
    Number(f64),
    /// A text property (e.g. a label, a hardware path).
    Text(String),
}

impl PropertyValue {
    /// Returns the value as a real number.
    ///
    /// Integers widen to `f64`; text yields `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            Self::Text(_) => None,
        }
    }

    /// Returns the value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_accessors() {
        let v = PropertyValue::Number(1.5);
        assert_eq!(v.as_number(), Some(1.5));
        assert_eq!(v.as_integer(), None);
        assert_eq!(v.as_text(), None);
    }

    #[test]
    fn integer_widens_to_number() {
        let v = PropertyValue::Integer(3);
        assert_eq!(v.as_integer(), Some(3));
        assert_eq!(v.as_number(), Some(3.0));
    }

    #[test]
    fn text_accessor() {
        let v = PropertyValue::from("hwmon0/temp1_input");
        assert_eq!(v.as_text(), Some("hwmon0/temp1_input"));
        assert_eq!(v.as_number(), None);
    }

    #[test]
    fn from_conversions() {
        assert_eq!(PropertyValue::from(2.0), PropertyValue::Number(2.0));
        assert_eq!(PropertyValue::from(7i64), PropertyValue::Integer(7));
        assert_eq!(
            PropertyValue::from("x".to_string()),
            PropertyValue::Text("x".into())
        );
    }

    #[test]
    fn serde_untagged_round_trip() {
        let v = PropertyValue::Integer(42);
        let json = serde_json::to_string(&v).expect("serialize");
        assert_eq!(json, "42");
        let back: PropertyValue = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, v);
    }
}
