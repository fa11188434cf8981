use serde_json::Value;

use crate::JobKind;

#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Preprocess(PreprocessRequest),
    Training(TrainingRequest),
    FeatureEngineering(FeatureEngineeringRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Preprocess(_) => JobKind::Preprocess,
            JobRequest::Training(_) => JobKind::Training,
            JobRequest::FeatureEngineering(_) => JobKind::FeatureEngineering,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            JobRequest::Preprocess(request) => &request.filename,
            JobRequest::Training(request) => &request.filename,
            JobRequest::FeatureEngineering(request) => &request.filename,
        }
    }

    /// Checks required inputs. The error is the user-facing message.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            JobRequest::Preprocess(request) => {
                if request.filename.trim().is_empty() {
                    return Err("Please select a dataset before running preprocessing.".to_string());
                }
                Ok(())
            }
            JobRequest::Training(request) => {
                if request.filename.trim().is_empty() {
                    return Err("Please select a dataset before training.".to_string());
                }
                if request.target_column.trim().is_empty() {
                    return Err("Please select a target column".to_string());
                }
                if !(request.test_size > 0.0 && request.test_size < 1.0) {
                    return Err("Test size must be between 0 and 1".to_string());
                }
                Ok(())
            }
            JobRequest::FeatureEngineering(request) => {
                if request.filename.trim().is_empty() {
                    return Err(
                        "Please select a dataset before running feature engineering.".to_string(),
                    );
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessRequest {
    /// Dataset path; only the final path segment is sent to the backend.
    pub filename: String,
    /// Step configuration forwarded verbatim as `steps`.
    pub steps: Value,
}

impl PreprocessRequest {
    pub fn new(filename: impl Into<String>, steps: Value) -> Self {
        Self {
            filename: filename.into(),
            steps,
        }
    }

    /// Final `/`-separated segment of `filename`.
    pub fn base_filename(&self) -> &str {
        self.filename.rsplit('/').next().unwrap_or(&self.filename)
    }
}

/// Unlike preprocessing, the full filename travels in the request body.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEngineeringRequest {
    pub filename: String,
    pub steps: Value,
}

impl FeatureEngineeringRequest {
    pub fn new(filename: impl Into<String>, steps: Value) -> Self {
        Self {
            filename: filename.into(),
            steps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProblemType {
    #[default]
    Classification,
    Regression,
}

impl ProblemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
        }
    }
}

impl std::str::FromStr for ProblemType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(ProblemType::Classification),
            "regression" => Ok(ProblemType::Regression),
            other => Err(format!("unknown problem type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRequest {
    pub filename: String,
    pub target_column: String,
    pub problem_type: ProblemType,
    pub test_size: f64,
    pub random_state: u64,
    /// `None` trains every model the backend offers.
    pub models_to_train: Option<Vec<String>>,
}

impl TrainingRequest {
    pub const DEFAULT_TEST_SIZE: f64 = 0.2;
    pub const DEFAULT_RANDOM_STATE: u64 = 42;

    pub fn new(filename: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            target_column: target_column.into(),
            problem_type: ProblemType::default(),
            test_size: Self::DEFAULT_TEST_SIZE,
            random_state: Self::DEFAULT_RANDOM_STATE,
            models_to_train: None,
        }
    }
}
