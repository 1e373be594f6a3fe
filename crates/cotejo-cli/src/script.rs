//! Replay scripts for the scripted host.
//!
//! CI environments rarely have the real document host installed, so `run`
//! can drive the suite against a scripted host that "generates" a fixed set
//! of files next to each opened document.

use crate::error::CliResult;
use cotejo::ScriptedHost;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk shape of a replay script
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostScript {
    /// Relative path -> file content written on idle, per opened document
    pub generated_files: BTreeMap<String, String>,
    /// Pretend the host lacks status notifications
    pub legacy_host: bool,
}

impl HostScript {
    /// Load a script from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> CliResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Build the scripted host this script describes
    #[must_use]
    pub fn into_host(self) -> ScriptedHost {
        let files = self
            .generated_files
            .into_iter()
            .map(|(path, content)| (path, content.into_bytes()))
            .collect();
        let host = ScriptedHost::new().with_generated_files(files);
        if self.legacy_host {
            host.with_legacy_capabilities()
        } else {
            host
        }
    }
}
