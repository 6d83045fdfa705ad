use super::common::PayloadSource;
use crate::error::{PanelError, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Everything observed about one finished generator run.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub image_path: Option<PathBuf>,
    pub structured_prompt: Option<String>,
    pub payload_source: PayloadSource,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turns a non-zero exit into `ProcessFailure` carrying stderr verbatim.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(PanelError::ProcessFailure {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// What Generate and Refine hand back to the panel.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub image_path: Option<PathBuf>,
    pub status: String,
    pub structured_prompt: String,
}

impl DispatchOutcome {
    pub fn failure(status: impl Into<String>) -> Self {
        Self {
            image_path: None,
            status: status.into(),
            structured_prompt: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.image_path.is_some()
    }
}

/// Inspire only surfaces text: the status and the extracted prompt.
#[derive(Debug, Clone, Serialize)]
pub struct InspireOutcome {
    pub status: String,
    pub structured_prompt: String,
}

impl InspireOutcome {
    pub fn failure(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            structured_prompt: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Image(DispatchOutcome),
    Prompt(InspireOutcome),
}

impl Response {
    pub fn status(&self) -> &str {
        match self {
            Response::Image(outcome) => &outcome.status,
            Response::Prompt(outcome) => &outcome.status,
        }
    }

    pub fn structured_prompt(&self) -> &str {
        match self {
            Response::Image(outcome) => &outcome.structured_prompt,
            Response::Prompt(outcome) => &outcome.structured_prompt,
        }
    }
}
