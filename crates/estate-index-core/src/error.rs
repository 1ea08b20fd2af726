//! Record-level errors raised while normalizing a raw listing.

use thiserror::Error;

/// Why a single raw record could not become a [`PropertyRecord`](crate::PropertyRecord).
///
/// Every variant carries the dotted path of the offending field (for example
/// `price.monthly_total` or `nearest_stations[2].walk_time_min`) so the batch
/// driver can log enough context for a manual fix of the input data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// The record is not a JSON object at all.
    #[error("record is not an object")]
    NotAnObject,

    /// A field required for this property type is absent or null.
    #[error("missing required field `{path}`")]
    Missing { path: String },

    /// A field is present but has a shape that cannot be coerced.
    #[error("field `{path}` has invalid type (expected {expected})")]
    InvalidType {
        path: String,
        expected: &'static str,
    },

    /// A numeric field is outside its allowed range.
    #[error("field `{path}` out of range: {value} ({reason})")]
    OutOfRange {
        path: String,
        value: f64,
        reason: &'static str,
    },
}

impl RecordError {
    /// Dotted path of the offending field; empty for [`RecordError::NotAnObject`].
    pub fn path(&self) -> &str {
        match self {
            RecordError::NotAnObject => "",
            RecordError::Missing { path }
            | RecordError::InvalidType { path, .. }
            | RecordError::OutOfRange { path, .. } => path,
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        RecordError::Missing { path: path.into() }
    }

    pub(crate) fn invalid(path: impl Into<String>, expected: &'static str) -> Self {
        RecordError::InvalidType {
            path: path.into(),
            expected,
        }
    }

    pub(crate) fn out_of_range(path: impl Into<String>, value: f64, reason: &'static str) -> Self {
        RecordError::OutOfRange {
            path: path.into(),
            value,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_exposed_for_every_field_variant() {
        assert_eq!(RecordError::missing("price.total").path(), "price.total");
        assert_eq!(
            RecordError::invalid("address.latitude", "number").path(),
            "address.latitude"
        );
        assert_eq!(
            RecordError::out_of_range("area.m2", -1.0, "must be > 0").path(),
            "area.m2"
        );
        assert_eq!(RecordError::NotAnObject.path(), "");
    }

    #[test]
    fn test_display_mentions_path() {
        let err = RecordError::missing("price.monthly_total");
        assert!(err.to_string().contains("price.monthly_total"));
    }
}
