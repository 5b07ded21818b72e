//! Populates a [`CertPool`] from the filesystem.
//!
//! The system bundle (when enabled and present) is loaded first, then every
//! file under the CA path whose extension matches. Paths are sorted before
//! loading so same-subject tie-breaks do not depend on directory iteration
//! order. Unreadable files and directories are skipped with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use crate::infra::config::ChainConfiguration;
use crate::services::cert_pool::CertPool;

/// What a load pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub certificates_parsed: usize,
}

/// Reads candidate certificate files into a pool.
#[derive(Debug, Clone)]
pub struct CandidateLoader {
    ca_path: PathBuf,
    system_bundle: Option<PathBuf>,
    extensions: Vec<String>,
}

impl CandidateLoader {
    #[must_use]
    pub fn new(ca_path: impl Into<PathBuf>) -> Self {
        let defaults = ChainConfiguration::default();
        Self {
            ca_path: ca_path.into(),
            system_bundle: None,
            extensions: defaults.extensions,
        }
    }

    /// Loader for an already resolved configuration. `ca_path` is taken as
    /// given; expand it first if needed.
    #[must_use]
    pub fn from_config(config: &ChainConfiguration, ca_path: PathBuf) -> Self {
        Self {
            ca_path,
            system_bundle: config
                .include_system_bundle
                .then(|| config.system_bundle.clone()),
            extensions: config.extensions.clone(),
        }
    }

    #[must_use]
    pub fn with_system_bundle(mut self, bundle: Option<PathBuf>) -> Self {
        self.system_bundle = bundle;
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Load everything into `pool`.
    pub fn load_into(&self, pool: &mut CertPool) -> LoadSummary {
        let mut summary = LoadSummary::default();

        if let Some(bundle) = &self.system_bundle {
            if bundle.is_file() {
                log::debug!("loading system ca-certificates {}", bundle.display());
                self.read_file_into_pool(bundle, pool, &mut summary);
            } else {
                log::debug!("system bundle {} not present", bundle.display());
            }
        }

        let mut files = Vec::new();
        self.collect_files(&self.ca_path, &mut files, &mut summary);
        files.sort();

        for path in &files {
            self.read_file_into_pool(path, pool, &mut summary);
        }

        log::debug!(
            "loaded {} certificates from {} files ({} skipped), pool holds {}",
            summary.certificates_parsed,
            summary.files_read,
            summary.files_skipped,
            pool.len()
        );

        summary
    }

    /// Build a fresh pool.
    #[must_use]
    pub fn load(&self) -> (CertPool, LoadSummary) {
        let mut pool = CertPool::new();
        let summary = self.load_into(&mut pool);
        (pool, summary)
    }

    /// Recursively gather matching files. Symlinked files are followed,
    /// symlinked directories below the CA path are not.
    fn collect_files(&self, path: &Path, files: &mut Vec<PathBuf>, summary: &mut LoadSummary) {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("unable to access {}: {e}", path.display());
                summary.files_skipped += 1;
                return;
            }
        };

        if metadata.is_file() {
            if self.matches_extension(path) {
                files.push(path.to_path_buf());
            }
            return;
        }

        if metadata.is_dir() {
            self.collect_dir(path, files, summary);
        }
    }

    fn collect_dir(&self, dir: &Path, files: &mut Vec<PathBuf>, summary: &mut LoadSummary) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("unable to read directory {}: {e}", dir.display());
                summary.files_skipped += 1;
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("unable to read entry in {}: {e}", dir.display());
                    summary.files_skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => self.collect_dir(&path, files, summary),
                Ok(_) => {
                    if self.matches_extension(&path) {
                        files.push(path);
                    }
                }
                Err(e) => {
                    log::warn!("unable to stat {}: {e}", path.display());
                    summary.files_skipped += 1;
                }
            }
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    fn read_file_into_pool(&self, path: &Path, pool: &mut CertPool, summary: &mut LoadSummary) {
        log::debug!("Reading Certificate File: {}", path.display());

        match fs::read(path) {
            Ok(data) => {
                summary.files_read += 1;
                summary.certificates_parsed += pool.append_certs_from_pem(&data);
            }
            Err(e) => {
                log::warn!("unable to read {}: {e}", path.display());
                summary.files_skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_ca_path_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let loader = CandidateLoader::new(temp_dir.path().join("absent"));

        let (pool, summary) = loader.load();

        assert!(pool.is_empty());
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.files_read, 0);
    }

    #[test]
    fn only_matching_extensions_are_read() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("a.pem"), b"not a certificate").unwrap();
        fs::write(nested.join("b.crt"), b"").unwrap();
        fs::write(nested.join("c.key"), b"").unwrap();

        let (pool, summary) = CandidateLoader::new(temp_dir.path()).load();

        assert!(pool.is_empty());
        assert_eq!(summary.files_read, 2);
        assert_eq!(summary.certificates_parsed, 0);
    }

    #[test]
    fn custom_extensions_replace_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.pem"), b"").unwrap();
        fs::write(temp_dir.path().join("b.cer"), b"").unwrap();

        let loader =
            CandidateLoader::new(temp_dir.path()).with_extensions(vec![".cer".to_string()]);
        let (_, summary) = loader.load();

        assert_eq!(summary.files_read, 1);
    }

    #[test]
    fn absent_system_bundle_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let loader = CandidateLoader::new(temp_dir.path())
            .with_system_bundle(Some(temp_dir.path().join("cert.pem.missing")));

        let (_, summary) = loader.load();

        assert_eq!(summary, LoadSummary::default());
    }

    #[test]
    fn extension_matching_ignores_case_and_dots() {
        let loader = CandidateLoader::new(".")
            .with_extensions(vec!["pem".to_string(), ".crt".to_string()]);
        assert!(loader.matches_extension(Path::new("ca/root.pem")));
        assert!(loader.matches_extension(Path::new("ca/inter.CRT")));
        assert!(!loader.matches_extension(Path::new("ca/key.der")));
        assert!(!loader.matches_extension(Path::new("ca/pem")));
    }

    #[test]
    fn config_controls_system_bundle() {
        let config = ChainConfiguration {
            include_system_bundle: false,
            ..ChainConfiguration::default()
        };
        let loader = CandidateLoader::from_config(&config, PathBuf::from("."));
        assert!(loader.system_bundle.is_none());

        let loader =
            CandidateLoader::from_config(&ChainConfiguration::default(), PathBuf::from("."));
        assert_eq!(loader.system_bundle, Some(PathBuf::from("/etc/ssl/cert.pem")));
    }
}
