use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Resolution {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Aspect ratio labels offered by the panel and the pixel size each one maps to.
pub const ASPECT_RATIOS: [Resolution; 9] = [
    Resolution { label: "1:1", width: 1024, height: 1024 },
    Resolution { label: "2:3", width: 832, height: 1248 },
    Resolution { label: "3:2", width: 1248, height: 832 },
    Resolution { label: "3:4", width: 896, height: 1152 },
    Resolution { label: "4:3", width: 1152, height: 896 },
    Resolution { label: "4:5", width: 896, height: 1088 },
    Resolution { label: "5:4", width: 1088, height: 896 },
    Resolution { label: "9:16", width: 768, height: 1344 },
    Resolution { label: "16:9", width: 1344, height: 768 },
];

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

pub fn resolution_for(label: &str) -> Option<Resolution> {
    ASPECT_RATIOS
        .iter()
        .copied()
        .find(|entry| entry.label == label.trim())
}
