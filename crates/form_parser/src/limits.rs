//! Field count and size accounting shared by the parsers

use contracts::{MultipartConfig, ParseError};

/// Running totals checked against [`MultipartConfig`]
#[derive(Debug, Clone)]
pub(crate) struct FieldLimits {
    max_fields: usize,
    max_fields_size: usize,
    fields_seen: usize,
    field_bytes: usize,
}

impl FieldLimits {
    pub(crate) fn new(config: &MultipartConfig) -> Self {
        Self {
            max_fields: config.max_fields,
            max_fields_size: config.max_fields_size,
            fields_seen: 0,
            field_bytes: 0,
        }
    }

    /// Count one part, file or field
    pub(crate) fn count_part(&mut self) -> Result<(), ParseError> {
        self.fields_seen += 1;
        if self.fields_seen > self.max_fields {
            return Err(ParseError::FieldsLimitExceeded {
                limit: self.max_fields,
            });
        }
        Ok(())
    }

    /// Account for a non-file field value
    pub(crate) fn add_field_value(&mut self, len: usize) -> Result<(), ParseError> {
        self.field_bytes += len;
        if self.field_bytes > self.max_fields_size {
            return Err(ParseError::FieldsSizeExceeded {
                limit: self.max_fields_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rejects_past_limit() {
        let mut limits = FieldLimits::new(&MultipartConfig::with_max_fields(1));
        assert!(limits.count_part().is_ok());
        let err = limits.count_part().unwrap_err();
        assert!(matches!(err, ParseError::FieldsLimitExceeded { limit: 1 }));
    }

    #[test]
    fn test_field_size_is_cumulative() {
        let config = MultipartConfig {
            max_fields: 10,
            max_fields_size: 8,
        };
        let mut limits = FieldLimits::new(&config);
        assert!(limits.add_field_value(5).is_ok());
        assert!(limits.add_field_value(3).is_ok());
        assert!(matches!(
            limits.add_field_value(1),
            Err(ParseError::FieldsSizeExceeded { limit: 8 })
        ));
    }
}
