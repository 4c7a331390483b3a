use thiserror::Error;

/// Errors raised while configuring, training, or querying a k-NN model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A configuration property holds an invalid value or is missing.
    #[error("invalid property '{field}': {message}")]
    Property { field: String, message: String },

    #[error("the supplied invocation count {0} is less than zero")]
    InvalidInvocationCount(i64),

    #[error("k ({k}) exceeds the training-set size ({size})")]
    KExceedsTrainingSize { k: usize, size: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("feature id {index} is out of bounds for dimension {dimension}")]
    IndexOutOfBounds { index: usize, dimension: usize },

    #[error("feature id {index} has non-finite value {value}")]
    NonFiniteValue { index: usize, value: f64 },

    /// None of the example's features are present in the feature map.
    #[error("no known features found in example")]
    NoFeatures,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn property<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Error::Property {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, found: usize) -> Self {
        Error::DimensionMismatch { expected, found }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
