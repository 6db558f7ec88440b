use thiserror::Error;

/// Failures raised by the analytics pipeline stages.
///
/// Every variant is fatal to the run that raised it. Stages never retry
/// internally; errors propagate to the orchestrator, which decides whether
/// to abort or degrade.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("data format error: {0}")]
    DataFormat(String),
    #[error("invalid pipeline state: {0}")]
    State(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("prediction requested before training completed")]
    UntrainedModel,
    #[error("model artifact error: {0}")]
    Artifact(String),
}

impl PipelineError {
    /// Stable machine-readable class for interface payloads.
    pub fn class(&self) -> &'static str {
        match self {
            Self::DataFormat(_) => "data_format",
            Self::State(_) => "state",
            Self::InsufficientData(_) => "insufficient_data",
            Self::UntrainedModel => "untrained_model",
            Self::Artifact(_) => "artifact",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn error_class_is_stable_per_variant() {
        assert_eq!(PipelineError::DataFormat("bad date".to_owned()).class(), "data_format");
        assert_eq!(PipelineError::State("not loaded".to_owned()).class(), "state");
        assert_eq!(
            PipelineError::InsufficientData("4 customers".to_owned()).class(),
            "insufficient_data"
        );
        assert_eq!(PipelineError::UntrainedModel.class(), "untrained_model");
        assert_eq!(PipelineError::Artifact("io".to_owned()).class(), "artifact");
    }

    #[test]
    fn display_includes_detail_message() {
        let error = PipelineError::DataFormat("unparseable date `2015-03-15`".to_owned());
        assert_eq!(error.to_string(), "data format error: unparseable date `2015-03-15`");

        let error = PipelineError::UntrainedModel;
        assert_eq!(error.to_string(), "prediction requested before training completed");
    }
}
