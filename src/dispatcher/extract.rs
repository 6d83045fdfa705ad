use crate::{error::Result, models::PayloadSource};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIX: &str = ".json";

/// The generator writes the structured prompt for image `P` to `P.json`.
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut raw: OsString = image_path.as_os_str().to_owned();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

/// Reads and removes the sidecar. `Ok(None)` when there is none; an error when
/// it exists but is unreadable or not JSON. The file is removed either way.
pub fn take_sidecar(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path);
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not remove sidecar {}: {}", path.display(), e);
    }

    let content = content?;
    serde_json::from_str::<Value>(&content)?;
    Ok(Some(content))
}

/// Finds the first balanced `{...}` span in `text` that parses as a JSON
/// object and returns it pretty-printed. Braces inside string literals do not
/// count towards nesting.
pub fn scrape_json_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    // End offset of the span opened at each `{`, or `None` if it never closes.
    let mut spans: HashMap<usize, Option<usize>> = HashMap::new();

    for (start, _) in text.match_indices('{') {
        if !spans.contains_key(&start) {
            record_spans(bytes, start, &mut spans);
        }
        let Some(Some(end)) = spans.get(&start) else {
            continue;
        };
        let candidate = &text[start..*end];
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return Some(pretty);
            }
        }
    }

    None
}

/// Scans forward from the `{` at `start` until it closes, recording the span
/// of every brace opened on the way. A nested brace sees exactly the state a
/// fresh scan from it would, so one pass settles all of them.
fn record_spans(bytes: &[u8], start: usize, spans: &mut HashMap<usize, Option<usize>>) {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(opened) = open.pop() {
                    spans.insert(opened, Some(i + 1));
                }
                if open.is_empty() {
                    return;
                }
            }
            _ => {}
        }
    }

    for opened in open {
        spans.insert(opened, None);
    }
}

/// Sidecar first, stdout second. Failures along the way only downgrade the
/// result; they never surface to the caller.
pub fn extract_structured_prompt(image_path: &Path, stdout: &str) -> (Option<String>, PayloadSource) {
    let sidecar = sidecar_path(image_path);
    match take_sidecar(&sidecar) {
        Ok(Some(content)) => return (Some(content), PayloadSource::Sidecar),
        Ok(None) => log::debug!("No sidecar at {}", sidecar.display()),
        Err(e) => log::warn!("⚠️  Ignoring unreadable sidecar {}: {}", sidecar.display(), e),
    }

    match scrape_json_object(stdout) {
        Some(json) => (Some(json), PayloadSource::Stdout),
        None => (None, PayloadSource::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_appends_suffix() {
        let path = sidecar_path(Path::new("/tmp/fibo-abc.png"));
        assert_eq!(path, PathBuf::from("/tmp/fibo-abc.png.json"));
    }

    #[test]
    fn test_scrape_single_object() {
        let stdout = "Loading model...\n{\"subject\": \"cube\", \"style\": {\"color\": \"red\"}}\nDone";
        let json = scrape_json_object(stdout).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["subject"], "cube");
        assert_eq!(value["style"]["color"], "red");
        assert!(json.contains("\n  \"subject\""));
    }

    #[test]
    fn test_scrape_preserves_key_order() {
        let json = scrape_json_object(r#"{"z": 1, "a": 2}"#).unwrap();
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
    }

    #[test]
    fn test_scrape_ignores_braces_in_strings() {
        let stdout = r#"result: {"caption": "a } tricky { string \" with quote", "n": 1} trailing"#;
        let json = scrape_json_object(stdout).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["caption"], "a } tricky { string \" with quote");
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_scrape_skips_non_json_braces() {
        let stdout = "Using template {model}\n{\"ok\": true}";
        let json = scrape_json_object(stdout).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_scrape_first_object_wins() {
        let json = scrape_json_object(r#"{"first": 1} {"second": 2}"#).unwrap();
        assert!(json.contains("first"));
        assert!(!json.contains("second"));
    }

    #[test]
    fn test_scrape_nothing_found() {
        assert!(scrape_json_object("").is_none());
        assert!(scrape_json_object("no json here").is_none());
        assert!(scrape_json_object("{\"unterminated\": ").is_none());
        assert!(scrape_json_object("} stray {").is_none());
    }

    #[test]
    fn test_scrape_finds_object_nested_in_unclosed_brace() {
        let json = scrape_json_object(r#"config { {"ok": 1} and then nothing"#).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ok"], 1);
    }

    #[test]
    fn test_scrape_many_unclosed_braces() {
        let mut stdout = "{ ".repeat(50_000);
        stdout.push_str(r#"{"subject": "cube"}"#);
        let json = scrape_json_object(&stdout).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["subject"], "cube");

        assert!(scrape_json_object(&"{".repeat(50_000)).is_none());
    }

    #[test]
    fn test_take_sidecar_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png.json");
        fs::write(&path, "{\"subject\": \"lake\"}").unwrap();

        let content = take_sidecar(&path).unwrap();
        assert_eq!(content.as_deref(), Some("{\"subject\": \"lake\"}"));
        assert!(!path.exists());
        assert!(take_sidecar(&path).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_sidecar_falls_back_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("out.png");
        fs::write(sidecar_path(&image), "not json").unwrap();

        let (payload, source) = extract_structured_prompt(&image, "{\"from\": \"stdout\"}");
        assert_eq!(source, PayloadSource::Stdout);
        assert!(payload.unwrap().contains("stdout"));
        assert!(!sidecar_path(&image).exists());
    }

    #[test]
    fn test_extract_without_any_payload() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("out.png");
        let (payload, source) = extract_structured_prompt(&image, "saved image");
        assert!(payload.is_none());
        assert_eq!(source, PayloadSource::None);
    }
}
