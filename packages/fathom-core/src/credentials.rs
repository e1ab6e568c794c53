//! Candidate login credentials for device fingerprinting.
//!
//! Credentials live in an operator-managed TOML file and are re-read in
//! full every time a job needs them — nothing is cached across jobs, so
//! edits take effect on the next job that runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One login profile tried during fingerprinting.
///
/// `id` is embedded in persisted device records; `secret` is the enable
/// password for switch CLIs and may be empty for devices without one.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub id: u32,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    credential: Vec<Credential>,
}

/// Loader for the credential file. Holds only the path; every `load` hits
/// the filesystem so concurrent jobs always see the current file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every candidate credential, in file order.
    pub fn load(&self) -> Result<Vec<Credential>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential file {:?}", self.path))?;

        let file: CredentialFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse credential file {:?}", self.path))?;

        tracing::debug!("Loaded {} credentials from {:?}", file.credential.len(), self.path);
        Ok(file.credential)
    }

    /// Look up the credential a device record was fingerprinted with.
    pub fn find(&self, id: u32) -> Result<Credential> {
        self.load()?
            .into_iter()
            .find(|c| c.id == id)
            .with_context(|| format!("No credential with id {} in {:?}", id, self.path))
    }
}

/// Generate example credential file content
pub fn generate_example_credentials() -> String {
    r#"# Fathom candidate credentials, tried in file order during fingerprinting.

[[credential]]
id = 1
username = "netops"
password = "changeme"
secret = "changeme-enable"

[[credential]]
id = 2
username = "admin"
password = "changeme"
secret = ""
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_credentials_in_file_order() {
        let path = write_temp(
            "fathom-creds-order.toml",
            r#"
            [[credential]]
            id = 1
            username = "netops"
            password = "pw1"
            secret = "en1"

            [[credential]]
            id = 2
            username = "admin"
            password = "pw2"
            "#,
        );

        let store = CredentialStore::new(&path);
        let creds = store.load().unwrap();
        assert_eq!(creds.len(), 2);
        assert_eq!(creds[0].id, 1);
        assert_eq!(creds[1].username, "admin");
        // secret defaults to empty when omitted
        assert_eq!(creds[1].secret, "");

        let cred = store.find(2).unwrap();
        assert_eq!(cred.password, "pw2");
        assert!(store.find(99).is_err());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = CredentialStore::new("/nonexistent/fathom/creds.toml");
        assert!(store.load().is_err());
    }

    #[test]
    fn example_content_parses() {
        let file: CredentialFile = toml::from_str(&generate_example_credentials()).unwrap();
        assert_eq!(file.credential.len(), 2);
    }
}
