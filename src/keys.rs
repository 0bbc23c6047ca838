//! # keys: mapping between local paths, remote keys and canonical raw keys
//!
//! Every object in the bucket lives under `{stage}/{namespace}/{relative_path}`.
//! The same source document shows up under several stages (the raw scan, its OCR
//! JSON, a web-ready derivative) with different extensions and, for multi-page
//! scans, an embedded `_SPLITPAGE_<n>` marker. Reconciliation compares documents
//! across stages by reducing every key to its *canonical raw key*.
//!
//! All functions in this module are pure and never touch the store.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Suffix that replaces (or is appended to) the final extension of a key.
pub const RAW_EXT_SENTINEL: &str = ".raw_ext";

static RAW_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z]{3,4}$").expect("static extension pattern"));

static SPLIT_PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_SPLITPAGE_\d+").expect("static split page pattern"));

/// Pipeline phases, each encoded as the leading prefix of a remote key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Original scans as uploaded from disk.
    Raw,
    /// OCR results, one JSON document per page.
    OcrJson,
    /// Web-ready images.
    Web,
}

impl Stage {
    /// File suffix a finished artifact of this stage carries.
    pub fn default_suffix(&self) -> &'static str {
        match self {
            Stage::Raw => "tif",
            Stage::OcrJson => "json",
            Stage::Web => "jpg",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Raw => "raw",
            Stage::OcrJson => "ocr_json",
            Stage::Web => "web",
        };
        f.write_str(name)
    }
}

/// Workflow identifier used as the second segment of every remote key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Slugifies a human-readable workflow name: lowercase ASCII alphanumerics
    /// separated by single hyphens. Non-ASCII characters are dropped.
    pub fn from_workflow_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_hyphen = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c.to_ascii_lowercase());
            } else if c.is_ascii() {
                pending_hyphen = true;
            }
        }
        Namespace(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stage prefixes used in the bucket. Defaults match the production layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyLayout {
    pub raw: String,
    pub ocr_json: String,
    pub web: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            raw: "raw".to_string(),
            ocr_json: "ocr/json".to_string(),
            web: "web".to_string(),
        }
    }
}

impl KeyLayout {
    /// Prefix of a stage, without surrounding slashes.
    pub fn prefix(&self, stage: Stage) -> &str {
        let prefix = match stage {
            Stage::Raw => &self.raw,
            Stage::OcrJson => &self.ocr_json,
            Stage::Web => &self.web,
        };
        prefix.trim_matches('/')
    }

    /// `{stage}/{namespace}/`, the listing prefix for one workflow at one stage.
    pub fn stage_prefix(&self, stage: Stage, namespace: &Namespace) -> String {
        format!("{}/{}/", self.prefix(stage), namespace)
    }

    pub fn remote_key(&self, stage: Stage, namespace: &Namespace, relative_path: &str) -> String {
        format!(
            "{}{}",
            self.stage_prefix(stage, namespace),
            relative_path.trim_start_matches('/')
        )
    }

    /// Canonical raw key of an object listed under `stage`.
    ///
    /// Raw keys are only normalized. Keys of any other stage lose their
    /// split-page marker and have their stage prefix rewritten to the raw prefix
    /// before normalization.
    pub fn canonical_raw_key_for(&self, stage: Stage, key: &str) -> String {
        if stage == Stage::Raw {
            return normalize_to_canonical_raw_key(key);
        }
        let without_marker = SPLIT_PAGE_MARKER.replace_all(key, "");
        let stage_prefix = format!("{}/", self.prefix(stage));
        let rewritten = match without_marker.strip_prefix(&stage_prefix) {
            Some(rest) => format!("{}/{}", self.prefix(Stage::Raw), rest),
            None => without_marker.to_string(),
        };
        normalize_to_canonical_raw_key(&rewritten)
    }
}

/// Replaces a trailing 3-4 letter extension with [`RAW_EXT_SENTINEL`].
///
/// Keys whose last segment is not such an extension (e.g. `hello.001`) get the
/// sentinel appended instead: `hello.001.raw_ext`. Already normalized keys are
/// returned unchanged.
pub fn normalize_to_canonical_raw_key(key: &str) -> String {
    if key.ends_with(RAW_EXT_SENTINEL) {
        return key.to_string();
    }
    if RAW_EXTENSION.is_match(key) {
        RAW_EXTENSION.replace(key, RAW_EXT_SENTINEL).into_owned()
    } else {
        format!("{key}{RAW_EXT_SENTINEL}")
    }
}

/// Canonical raw key of an OCR JSON key under the default [`KeyLayout`].
pub fn convert_derivative_key_to_canonical_raw_key(key: &str) -> String {
    KeyLayout::default().canonical_raw_key_for(Stage::OcrJson, key)
}
