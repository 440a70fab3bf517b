use std::fmt;

use crate::text::MIN_TEXT_CHARS;

/// Boxed cause carried by model load and inference failures.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Input that was rejected before any pipeline work started.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text needs to be over {min} characters", min = MIN_TEXT_CHARS)]
    TooShort { chars: usize },
}

/// The model-backed stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesis,
    Vocoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Synthesis => f.write_str("synthesis"),
            Stage::Vocoding => f.write_str("vocoding"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to load {model} model: {source}")]
    ModelLoad {
        model: &'static str,
        #[source]
        source: BoxedError,
    },
    #[error("{stage} inference failed: {source}")]
    Inference {
        stage: Stage,
        #[source]
        source: BoxedError,
    },
    #[error("WAV encoding error: {0}")]
    Encoding(#[from] hound::Error),
    #[error("Sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message shown when anything other than validation fails.
pub const GENERIC_FAILURE_MESSAGE: &str = "Speech generation failed, please try again";

impl SpeechError {
    pub fn model_load(model: &'static str, source: impl Into<BoxedError>) -> Self {
        Self::ModelLoad {
            model,
            source: source.into(),
        }
    }

    pub fn inference(stage: Stage, source: impl Into<BoxedError>) -> Self {
        Self::Inference {
            stage,
            source: source.into(),
        }
    }

    /// Text suitable for the presentation layer.
    ///
    /// Only validation failures are explained to the user; everything else
    /// collapses to [`GENERIC_FAILURE_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            SpeechError::Validation(e) => e.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
