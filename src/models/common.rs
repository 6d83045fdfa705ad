use serde::{Deserialize, Serialize};
use std::fmt;

/// Vision-language backends the generator understands for `--model-mode`.
pub const VLM_MODES: [&str; 2] = ["gemini", "local"];

pub const DEFAULT_VLM_MODE: &str = "gemini";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Generate,
    Refine,
    Inspire,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generate => "generate",
            Mode::Refine => "refine",
            Mode::Inspire => "inspire",
        }
    }

    /// Capitalised name used in operator-facing status text.
    pub fn title(&self) -> &'static str {
        match self {
            Mode::Generate => "Generation",
            Mode::Refine => "Refinement",
            Mode::Inspire => "Inspire",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Mode::Generate => "✅ Generated successfully!",
            Mode::Refine => "✅ Refined successfully!",
            Mode::Inspire => "✅ Prompt extracted successfully!",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the structured prompt of a finished run came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSource {
    Sidecar,
    Stdout,
    None,
}

impl PayloadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadSource::Sidecar => "sidecar",
            PayloadSource::Stdout => "stdout",
            PayloadSource::None => "none",
        }
    }
}
