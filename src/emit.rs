use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::EmitError;
use crate::inventory::Inventory;
use crate::reflect::{build_reflection_entries, build_resource_rules};

/// Where native-image picks up per-project metadata inside a Maven layout.
pub const DEFAULT_OUTPUT_DIR: &str = "src/main/resources/META-INF/native-image";

pub const REFLECT_CONFIG: &str = "reflect-config.json";
pub const RESOURCE_CONFIG: &str = "resource-config.json";

/// Hand-editable extension points; never overwritten once present.
pub const PLACEHOLDERS: [&str; 3] = [
    "jni-config.json",
    "proxy-config.json",
    "serialization-config.json",
];

#[derive(Debug, Clone)]
pub struct EmitReport {
    pub directory: PathBuf,
    /// Artifacts written by this run.
    pub written: Vec<String>,
    /// Placeholders left untouched because they already existed.
    pub preserved: Vec<String>,
    /// Every `*.json` file in the directory after the run, sorted.
    pub files: Vec<String>,
    pub reflection_digest: String,
}

/// Result of comparing the authoritative artifacts on disk with a fresh rendering.
#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    pub missing: Vec<String>,
    pub stale: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

struct Rendered {
    reflect: Vec<u8>,
    resource: Vec<u8>,
}

impl Rendered {
    fn authoritative(&self) -> [(&'static str, &[u8]); 2] {
        [
            (REFLECT_CONFIG, self.reflect.as_slice()),
            (RESOURCE_CONFIG, self.resource.as_slice()),
        ]
    }
}

pub fn emit(output_dir: &Path, inventory: &Inventory) -> Result<EmitReport, EmitError> {
    fs::create_dir_all(output_dir).map_err(|source| EmitError::Filesystem {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let rendered = render(inventory)?;
    let mut written = Vec::new();
    for (name, bytes) in rendered.authoritative() {
        write_file(&output_dir.join(name), bytes)?;
        written.push(name.to_string());
    }

    let mut preserved = Vec::new();
    let empty = to_json_bytes("placeholder", &Vec::<serde_json::Value>::new())?;
    for name in PLACEHOLDERS {
        let path = output_dir.join(name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "keeping existing placeholder");
            preserved.push(name.to_string());
            continue;
        }
        write_file(&path, &empty)?;
        written.push(name.to_string());
    }

    Ok(EmitReport {
        directory: output_dir.to_path_buf(),
        written,
        preserved,
        files: list_json_files(output_dir)?,
        reflection_digest: format!("{:x}", Sha256::digest(&rendered.reflect)),
    })
}

/// Compares the authoritative artifacts on disk with a fresh rendering. Nothing under
/// `output_dir` is modified.
pub fn check(output_dir: &Path, inventory: &Inventory) -> Result<DriftReport> {
    let fresh = render(inventory)?;
    let mut report = DriftReport::default();

    for (name, expected) in fresh.authoritative() {
        let current = output_dir.join(name);
        if !current.exists() {
            report.missing.push(name.to_string());
            continue;
        }
        let actual =
            fs::read(&current).with_context(|| format!("failed to read {}", current.display()))?;
        if actual != expected {
            report.stale.push(name.to_string());
        }
    }

    Ok(report)
}

fn render(inventory: &Inventory) -> Result<Rendered, EmitError> {
    let entries = build_reflection_entries(inventory);
    let resources = build_resource_rules(inventory);
    Ok(Rendered {
        reflect: to_json_bytes(REFLECT_CONFIG, &entries)?,
        resource: to_json_bytes(RESOURCE_CONFIG, &resources)?,
    })
}

fn to_json_bytes<T: Serialize + ?Sized>(
    artifact: &'static str,
    value: &T,
) -> Result<Vec<u8>, EmitError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|source| EmitError::Render { artifact, source })?;
    text.push('\n');
    Ok(text.into_bytes())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), EmitError> {
    fs::write(path, bytes).map_err(|source| EmitError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

fn list_json_files(dir: &Path) -> Result<Vec<String>, EmitError> {
    let read_dir = fs::read_dir(dir).map_err(|source| EmitError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| EmitError::Filesystem {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json")
            && let Some(name) = path.file_name().and_then(|name| name.to_str())
        {
            files.push(name.to_string());
        }
    }
    files.sort();
    Ok(files)
}
