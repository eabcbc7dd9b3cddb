// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local file plumbing for the command line: reading inputs and the config
// file, writing results.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_core::{FolioConfig, InputFile, OptionsBag, ResultDescriptor};
use tracing::{debug, warn};

/// Read each path into an input file named after its final component.
pub fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    paths
        .iter()
        .map(|path| {
            let data = std::fs::read(path).map_err(|err| {
                FolioError::Validation(format!("cannot read {}: {err}", path.display()))
            })?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            debug!(file = %name, bytes = data.len(), "Input read");
            Ok(InputFile::new(name, "", data))
        })
        .collect()
}

/// Load the config file, falling back to defaults when it is missing or
/// unreadable.
pub fn load_config(path: Option<&Path>) -> FolioConfig {
    let Some(path) = path else {
        return FolioConfig::default();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(FolioError::Io)
        .and_then(|text| serde_json::from_str(&text).map_err(FolioError::Serialization));
    match parsed {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "Config not loaded, using defaults");
            FolioConfig::default()
        }
    }
}

/// Options from an optional JSON file, then `key=value` assignments on top.
pub fn collect_options(json_file: Option<&Path>, assignments: &[String]) -> Result<OptionsBag> {
    let mut options = match json_file {
        Some(path) => OptionsBag::from_json_str(&std::fs::read_to_string(path)?)?,
        None => OptionsBag::new(),
    };
    for assignment in assignments {
        options = options.with_assignment(assignment)?;
    }
    Ok(options)
}

/// Write every result into `dir` and return the paths written.
pub fn write_outputs(dir: &Path, outputs: &[ResultDescriptor]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    outputs
        .iter()
        .map(|output| {
            // Result names come from input names; keep them inside `dir`.
            let name = Path::new(&output.name)
                .file_name()
                .ok_or_else(|| FolioError::Validation(format!("bad output name '{}'", output.name)))?;
            let path = dir.join(name);
            std::fs::write(&path, &output.data)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_are_named_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let inputs = read_inputs(&[path]).unwrap();
        assert_eq!(inputs[0].name(), "notes.txt");
        assert_eq!(inputs[0].mime_type(), "text/plain");
        assert_eq!(inputs[0].data(), b"hello");
    }

    #[test]
    fn missing_input_is_reported() {
        let err = read_inputs(&[PathBuf::from("/definitely/not/here.pdf")]).unwrap_err();
        assert!(err.to_string().contains("here.pdf"));
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("/definitely/not/config.json")));
        assert_eq!(config, FolioConfig::default());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut custom = FolioConfig::default();
        custom.min_password_length = 10;
        std::fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();
        assert_eq!(load_config(Some(&path)).min_password_length, 10);
    }

    #[test]
    fn assignments_override_the_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"rotation": 90, "pages": "1"}"#).unwrap();
        let options = collect_options(Some(&path), &["rotation=180".into()]).unwrap();
        assert_eq!(options.get("rotation"), Some(&serde_json::json!(180)));
        assert_eq!(options.get("pages"), Some(&serde_json::json!("1")));
    }

    #[test]
    fn outputs_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = [ResultDescriptor::pdf("../escape.pdf", b"%PDF".to_vec())];
        let written = write_outputs(dir.path(), &outputs).unwrap();
        assert_eq!(written[0], dir.path().join("escape.pdf"));
        assert!(written[0].exists());
    }
}
