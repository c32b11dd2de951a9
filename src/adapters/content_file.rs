//! JSON file backend for the content map.
//!
//! Implements [`ContentStore`]. The document is an object keyed by port
//! number, each value an object of string fields:
//!
//! ```json
//! { "1": { "display_name": "M3 screws", "name": "M3-screw" } }
//! ```
//!
//! Saving writes pretty-printed JSON and appends `.json` to paths that do
//! not already end in it.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::content::ContentMap;
use crate::app::ports::ContentStore;
use crate::error::{Error, Result};

const EXTENSION: &str = "json";

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonContentFile;

impl JsonContentFile {
    pub fn new() -> Self {
        Self
    }
}

impl ContentStore for JsonContentFile {
    fn load(&self, path: &Path) -> Result<ContentMap> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        let map: ContentMap = serde_json::from_str(&text)
            .map_err(|e| Error::Io(format!("{}: malformed content map: {e}", path.display())))?;
        info!("content map {} loaded ({} ports)", path.display(), map.len());
        Ok(map)
    }

    fn save(&self, path: &Path, map: &ContentMap) -> Result<PathBuf> {
        let path = with_json_extension(path);
        let text = serde_json::to_string_pretty(map)?;
        fs::write(&path, text).map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        debug!("content map saved to {}", path.display());
        Ok(path)
    }
}

fn with_json_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}
