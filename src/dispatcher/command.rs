use crate::models::{resolution_for, GenerateRequest, InspireRequest, RefineRequest};
use std::path::Path;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

fn push_seed(args: &mut Vec<String>, seed: Option<i64>) {
    if let Some(seed) = seed {
        push_flag(args, "--seed", seed.to_string());
    }
}

pub fn generate_args(request: &GenerateRequest, output: &Path) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "--prompt", request.prompt.as_str());
    push_flag(&mut args, "--output", path_arg(output));

    if let Some(mode) = request.model_mode.as_deref().filter(|m| !m.is_empty()) {
        push_flag(&mut args, "--model-mode", mode);
    }
    push_seed(&mut args, request.seed);
    if let Some(steps) = request.steps {
        push_flag(&mut args, "--steps", steps.to_string());
    }
    match request.aspect_ratio.as_deref().map(|label| (label, resolution_for(label))) {
        Some((_, Some(res))) => {
            args.push("--resolution".to_string());
            args.push(res.width.to_string());
            args.push(res.height.to_string());
        }
        Some((label, None)) => log::debug!("Unknown aspect ratio {:?}, using generator default", label),
        None => {}
    }
    if let Some(negative) = non_blank(request.negative_prompt.as_deref()) {
        push_flag(&mut args, "--negative-prompt", negative);
    }
    if let Some(scale) = request.guidance_scale {
        push_flag(&mut args, "--guidance-scale", scale.to_string());
    }

    args
}

/// `source_image` is only forwarded when the caller has confirmed it exists.
pub fn refine_args(
    request: &RefineRequest,
    output: &Path,
    source_image: Option<&Path>,
    structured_prompt: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "--output", path_arg(output));

    if let Some(image) = source_image {
        push_flag(&mut args, "--image-path", path_arg(image));
    }
    if let Some(json) = structured_prompt {
        push_flag(&mut args, "--structured-prompt", path_arg(json));
    }
    if let Some(prompt) = non_blank(request.prompt.as_deref()) {
        push_flag(&mut args, "--prompt", prompt);
    }
    push_seed(&mut args, request.seed);

    args
}

pub fn inspire_args(request: &InspireRequest, reference: &Path, output: &Path) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "--image-path", path_arg(reference));
    push_flag(&mut args, "--output", path_arg(output));

    if let Some(prompt) = non_blank(request.prompt.as_deref()) {
        push_flag(&mut args, "--prompt", prompt);
    }
    push_seed(&mut args, request.seed);

    args
}
