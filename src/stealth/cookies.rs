// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Cookie handling — parse, load, and export cookies for stealth requests.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::{FluxionError, Result};

/// Collects cookies from various sources and exports them as headers.
///
/// Insertion order is preserved for `Cookie` header emission; a later
/// `add_raw`/`load_file` call overwrites an earlier value for the same
/// name without moving it in iteration order.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: IndexMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `"name=value"` or `"n1=v1; n2=v2"` into the jar.
    pub fn add_raw(&mut self, raw: &str) {
        for part in raw.split(';') {
            let part = part.trim();
            if let Some((name, value)) = part.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }

    /// Load cookies from a Netscape cookie-jar file or a JSON export,
    /// auto-detected by the first non-whitespace character.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FluxionError::stealth(format!("Cookie file not found: {}: {e}", path.display()))
                .with_suggestion("Check the path and try again.")
        })?;

        let trimmed = text.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let entries: Vec<serde_json::Value> = serde_json::from_str(trimmed)
                .map_err(|e| {
                    FluxionError::stealth(format!("Failed to parse JSON cookie file: {e}"))
                        .with_suggestion("Ensure the file contains a valid JSON array of cookie objects.")
                })?;
            for entry in entries {
                if let (Some(name), Some(value)) = (
                    entry.get("name").and_then(|v| v.as_str()),
                    entry.get("value"),
                ) {
                    let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                    self.cookies.insert(name.to_string(), value);
                }
            }
            return Ok(());
        }

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() >= 7 {
                let name = fields[5];
                let value = fields[6];
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), value.to_string());
                }
            }
        }
        Ok(())
    }

    /// Import cookies from a named browser's cookie store. Not bundled —
    /// surfaces a clear Stealth error naming the unsupported path.
    pub fn load_browser(&mut self, browser: &str, _domain: Option<&str>) -> Result<()> {
        const SUPPORTED: [&str; 4] = ["chrome", "firefox", "edge", "safari"];
        let lower = browser.to_lowercase();
        if !SUPPORTED.contains(&lower.as_str()) {
            return Err(FluxionError::stealth(format!("Unsupported browser: {browser:?}"))
                .with_suggestion(format!("Available browsers: {}", SUPPORTED.join(", "))));
        }
        Err(FluxionError::stealth(format!(
            "Reading the {lower} cookie store is not supported by this build"
        ))
        .with_suggestion("Use --cookie-file with an exported Netscape or JSON cookie file instead."))
    }

    /// Return the `Cookie` header value, or `None` if empty.
    pub fn as_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn as_map(&self) -> std::collections::HashMap<String, String> {
        self.cookies.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn add_raw_parses_multiple_pairs() {
        let mut jar = CookieJar::new();
        jar.add_raw("a=1; b=2");
        assert_eq!(jar.as_header(), Some("a=1; b=2".to_string()));
    }

    #[test]
    fn later_value_overwrites_without_reordering() {
        let mut jar = CookieJar::new();
        jar.add_raw("a=1; b=2");
        jar.add_raw("a=3");
        assert_eq!(jar.as_header(), Some("a=3; b=2".to_string()));
    }

    #[test]
    fn empty_jar_has_no_header() {
        assert_eq!(CookieJar::new().as_header(), None);
    }

    #[test]
    fn load_file_detects_json_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name":"session","value":"abc123"}}]"#).unwrap();
        let mut jar = CookieJar::new();
        jar.load_file(file.path()).unwrap();
        assert_eq!(jar.as_map().get("session"), Some(&"abc123".to_string()));
    }

    #[test]
    fn load_file_detects_netscape_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Netscape HTTP Cookie File").unwrap();
        writeln!(file, "example.com\tFALSE\t/\tFALSE\t0\tsession\tabc123").unwrap();
        let mut jar = CookieJar::new();
        jar.load_file(file.path()).unwrap();
        assert_eq!(jar.as_map().get("session"), Some(&"abc123".to_string()));
    }

    #[test]
    fn load_browser_is_an_unimplemented_stealth_error() {
        let mut jar = CookieJar::new();
        let err = jar.load_browser("chrome", None).unwrap_err();
        assert_eq!(err.category(), "stealth");
    }

    #[test]
    fn load_browser_rejects_unknown_browser_name() {
        let mut jar = CookieJar::new();
        let err = jar.load_browser("opera", None).unwrap_err();
        assert!(err.message().contains("Unsupported browser"));
    }
}
