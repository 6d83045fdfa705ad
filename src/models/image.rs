use super::common::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An empty prompt is passed through; the generator decides whether to reject it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model_mode: Option<String>,
    pub seed: Option<i64>,
    pub steps: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub negative_prompt: Option<String>,
    pub guidance_scale: Option<f64>,
}

/// Refine an image, a structured prompt, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefineRequest {
    pub source_image: Option<PathBuf>,
    /// Raw JSON text as pasted by the operator; never parsed here.
    pub structured_prompt: Option<String>,
    pub prompt: Option<String>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspireRequest {
    pub reference_image: Option<PathBuf>,
    pub prompt: Option<String>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Request {
    Generate(GenerateRequest),
    Refine(RefineRequest),
    Inspire(InspireRequest),
}

impl Request {
    pub fn mode(&self) -> Mode {
        match self {
            Request::Generate(_) => Mode::Generate,
            Request::Refine(_) => Mode::Refine,
            Request::Inspire(_) => Mode::Inspire,
        }
    }
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_model_mode(mut self, mode: impl Into<String>) -> Self {
        self.model_mode = Some(mode.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_aspect_ratio(mut self, label: impl Into<String>) -> Self {
        self.aspect_ratio = Some(label.into());
        self
    }

    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    pub fn with_guidance_scale(mut self, scale: f64) -> Self {
        self.guidance_scale = Some(scale);
        self
    }
}

impl RefineRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_image = Some(path.into());
        self
    }

    pub fn with_structured_prompt(mut self, json: impl Into<String>) -> Self {
        self.structured_prompt = Some(json.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl InspireRequest {
    pub fn new(reference_image: impl Into<PathBuf>) -> Self {
        Self {
            reference_image: Some(reference_image.into()),
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}
