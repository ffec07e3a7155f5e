//! Naming rules for the release archive.
//!
//! Pure functions only; the assembler in `release` performs the file moves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How release bundle and module jar names are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseLayout {
    /// Vendor bundle directory name is `<vendor_prefix><VERSION>`.
    pub vendor_prefix: String,
    /// Vendor zip is `<vendor_prefix><VERSION><vendor_zip_suffix>`.
    pub vendor_zip_suffix: String,
    /// Local directory is `<local_prefix><REVISION>`, zipped to `<...>.zip`.
    pub local_prefix: String,
    /// Modules whose freshly built jar is injected, in order.
    pub modules: Vec<String>,
    /// Env var supplying a module's upload version when no override matches.
    pub default_version_env: String,
    /// Per-module env var overrides.
    pub version_env_overrides: BTreeMap<String, String>,
}

impl Default for ReleaseLayout {
    fn default() -> Self {
        let mut version_env_overrides = BTreeMap::new();
        version_env_overrides.insert(
            "couchbase-lite-java-javascript".to_string(),
            "UPLOAD_VERSION_CBLITE_JAVASCRIPT".to_string(),
        );
        version_env_overrides.insert(
            "couchbase-lite-java-listener".to_string(),
            "UPLOAD_VERSION_CBLITE_LISTENER".to_string(),
        );
        Self {
            vendor_prefix: "com.couchbase.cblite-".to_string(),
            vendor_zip_suffix: "-android.zip".to_string(),
            local_prefix: "cblite_android_".to_string(),
            modules: vec![
                "couchbase-lite-android".to_string(),
                "couchbase-lite-java-javascript".to_string(),
                "couchbase-lite-java-listener".to_string(),
            ],
            default_version_env: "UPLOAD_VERSION_CBLITE".to_string(),
            version_env_overrides,
        }
    }
}

impl ReleaseLayout {
    pub fn vendor_dir_name(&self, version: &str) -> String {
        format!("{}{version}", self.vendor_prefix)
    }

    pub fn vendor_zip_name(&self, version: &str) -> String {
        format!("{}{}", self.vendor_dir_name(version), self.vendor_zip_suffix)
    }

    pub fn local_dir_name(&self, revision: &str) -> String {
        format!("{}{revision}", self.local_prefix)
    }

    pub fn local_zip_name(&self, revision: &str) -> String {
        format!("{}.zip", self.local_dir_name(revision))
    }

    /// Env var holding `module`'s upload version.
    pub fn version_env_for(&self, module: &str) -> &str {
        self.version_env_overrides
            .get(module)
            .map(String::as_str)
            .unwrap_or(&self.default_version_env)
    }
}

/// File name a module's jar takes inside the release directory.
pub fn module_jar_name(module: &str, version: &str) -> String {
    format!("{module}-{version}.jar")
}
