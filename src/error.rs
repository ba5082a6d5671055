use thiserror::Error;

/// Errors raised while configuring or running an ABC controller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AbcError {
    #[error(
        "Number of parameters in log prior ({prior}) must match number of \
         parameters in error measure ({error_measure})."
    )]
    DimensionMismatch { prior: usize, error_measure: usize },

    #[error("Sampler works on {got} parameters but the error measure expects {expected}.")]
    SamplerDimension { expected: usize, got: usize },

    #[error("{0}")]
    InvalidSetting(String),

    #[error("At least one stopping criterion must be set.")]
    NoStoppingCriterion,

    #[error("Expected {expected} scores, one for each proposal of the last batch, got {got}.")]
    ScoreCount { expected: usize, got: usize },

    #[error("Tell called before ask.")]
    TellBeforeAsk,

    #[error("Failed to evaluate proposal {index} of the current batch")]
    Evaluation {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Error measure panicked while evaluating proposal {index}: {message}")]
    WorkerPanic { index: usize, message: String },

    #[error("Could not start worker pool")]
    Pool(#[source] anyhow::Error),

    #[error("Could not write progress log")]
    Log(#[from] std::io::Error),
}

impl AbcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AbcError::InvalidSetting(message.into())
    }

    /// Whether the error was raised by configuration rather than by evaluation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AbcError::DimensionMismatch { .. }
                | AbcError::SamplerDimension { .. }
                | AbcError::InvalidSetting(_)
                | AbcError::NoStoppingCriterion
        )
    }
}

pub type Result<T, E = AbcError> = std::result::Result<T, E>;
