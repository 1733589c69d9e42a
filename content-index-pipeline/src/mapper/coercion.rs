//! Coercion of property values to index field types.

use std::fmt;

use chrono::SecondsFormat;

use content_index_shared::{parse_timestamp, FieldType, FieldValue, PropertyValue};

/// Why a property did not become a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningReason {
    /// The schema declares the property but the node has no value for it.
    Missing,
    /// The node carries a value the schema does not declare.
    Undeclared,
    /// The alias collides with a system field, which always wins.
    Reserved,
    /// The value cannot be represented as the rule's type.
    Coercion { expected: FieldType, value: String },
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningReason::Missing => f.write_str("property has no value"),
            WarningReason::Undeclared => f.write_str("property is not declared by the content type"),
            WarningReason::Reserved => f.write_str("alias is reserved for a system field"),
            WarningReason::Coercion { expected, value } => {
                write!(f, "cannot read {:?} as {:?}", value, expected)
            }
        }
    }
}

/// Coerce a present, non-null value to `field_type`.
///
/// `Null` is treated as absent and yields `Ok(None)`.
pub fn coerce(value: &PropertyValue, field_type: FieldType) -> Result<Option<FieldValue>, WarningReason> {
    let coerced = match (field_type, value) {
        (_, PropertyValue::Null) => return Ok(None),

        (FieldType::Text, PropertyValue::Text(s)) => FieldValue::Text(s.clone()),
        (FieldType::Text, PropertyValue::Integer(i)) => FieldValue::Text(i.to_string()),
        (FieldType::Text, PropertyValue::Decimal(d)) => FieldValue::Text(d.to_string()),
        (FieldType::Text, PropertyValue::Boolean(b)) => {
            FieldValue::Text(if *b { "1" } else { "0" }.to_string())
        }
        (FieldType::Text, PropertyValue::Date(d)) => {
            FieldValue::Text(d.to_rfc3339_opts(SecondsFormat::Secs, true))
        }

        (FieldType::Integer, PropertyValue::Integer(i)) => FieldValue::Integer(*i),
        (FieldType::Integer, PropertyValue::Boolean(b)) => FieldValue::Integer(i64::from(*b)),
        (FieldType::Integer, PropertyValue::Text(s)) => match s.trim().parse::<i64>() {
            Ok(i) => FieldValue::Integer(i),
            Err(_) => return Err(failure(field_type, value)),
        },
        (FieldType::Integer, PropertyValue::Decimal(d)) => {
            // `i64::MAX as f64` rounds up to 2^63, which is out of range.
            if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 {
                FieldValue::Integer(*d as i64)
            } else {
                return Err(failure(field_type, value));
            }
        }

        (FieldType::Date, PropertyValue::Date(d)) => FieldValue::Date(*d),
        (FieldType::Date, PropertyValue::Text(s)) => match parse_timestamp(s) {
            Some(d) => FieldValue::Date(d),
            None => return Err(failure(field_type, value)),
        },

        (FieldType::Integer, PropertyValue::Date(_))
        | (FieldType::Date, PropertyValue::Integer(_))
        | (FieldType::Date, PropertyValue::Decimal(_))
        | (FieldType::Date, PropertyValue::Boolean(_)) => return Err(failure(field_type, value)),
    };
    Ok(Some(coerced))
}

fn failure(expected: FieldType, value: &PropertyValue) -> WarningReason {
    let value = match value {
        PropertyValue::Null => String::new(),
        PropertyValue::Boolean(b) => b.to_string(),
        PropertyValue::Integer(i) => i.to_string(),
        PropertyValue::Decimal(d) => d.to_string(),
        PropertyValue::Text(s) => s.clone(),
        PropertyValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    WarningReason::Coercion { expected, value }
}
