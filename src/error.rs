use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("innovation covariance S is not positive definite")]
    SingularInnovationCovariance,

    #[error("state covariance P is not positive definite")]
    SingularCovariance,

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Rejects zero, negative and non-finite values for `name`.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidConfiguration(format!(
            "{} must be finite and > 0, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("dt", 0.1).is_ok());
        assert!(ensure_positive("dt", 0.0).is_err());
        assert!(ensure_positive("dt", -1.0).is_err());
        assert!(ensure_positive("dt", f64::NAN).is_err());
        assert!(ensure_positive("dt", f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        let e = FilterError::DimensionMismatch { expected: 2, found: 3 };
        assert_eq!(e.to_string(), "dimension mismatch: expected 2, found 3");
    }
}
