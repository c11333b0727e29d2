use num_traits::ToPrimitive;
use thiserror::Error;

/// Errors reported by the kernel.
///
/// Every operation validates its inputs before allocating any output,
/// so an error never leaves a half-built curve or surface behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NurbsError {
    /// A parameter value lies outside of the knot domain
    #[error("parameter {value} is outside of the knot domain [{min}, {max}]")]
    OutOfDomain { value: f64, min: f64, max: f64 },

    /// The knot vector is not non-decreasing, has non-finite values or too many repeats
    #[error("malformed knot vector: {0}")]
    MalformedKnotVector(String),

    /// Array shapes are inconsistent with each other
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A knot to insert is unsorted or outside of the domain
    #[error("invalid knot value: {0}")]
    InvalidKnotValue(String),

    /// The degree does not support the requested operation
    #[error("invalid degree: {0}")]
    InvalidDegree(String),

    /// Input data describes a degenerate configuration
    #[error("degenerate input: {0}")]
    Degenerate(String),
}

pub type Result<T> = std::result::Result<T, NurbsError>;

impl NurbsError {
    pub(crate) fn out_of_domain<T: ToPrimitive>(value: T, min: T, max: T) -> Self {
        NurbsError::OutOfDomain {
            value: scalar(value),
            min: scalar(min),
            max: scalar(max),
        }
    }
}

/// Lossy conversion used only to report values inside errors
pub(crate) fn scalar<T: ToPrimitive>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Return early with the given error unless the condition holds
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}

pub(crate) use ensure;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_domain_message() {
        let err = NurbsError::out_of_domain(1.5_f64, 0., 1.);
        assert_eq!(
            err.to_string(),
            "parameter 1.5 is outside of the knot domain [0, 1]"
        );
    }
}
