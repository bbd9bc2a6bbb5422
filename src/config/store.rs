use super::gear::GearConfig;
use super::naming::{sort_config_files, ConfigTarget, Conventions};
use super::schema::{LogLevel, MasterConfig};
use crate::error::{CollinsError, ErrorKind, Result};
use figment::providers::{Format, Json, Toml, Yaml};
use figment::Figment;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Master configuration that passed schema validation
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    config: MasterConfig,
    properties: Map<String, Value>,
}

impl ValidatedConfig {
    pub(crate) fn new(config: MasterConfig) -> Self {
        let properties = config.to_properties();
        Self { config, properties }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn log_level(&self) -> LogLevel {
        self.config.log_level
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }
}

/// Configuration artifacts of one bootstrap run
#[derive(Debug, Default)]
pub struct ConfigStore {
    conventions: Conventions,
    path: Option<PathBuf>,
    files: Vec<String>,
    master: Option<ValidatedConfig>,
}

impl ConfigStore {
    pub fn new(conventions: Conventions) -> Self {
        Self {
            conventions,
            ..Self::default()
        }
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Filenames found by the last [`discover`](Self::discover)
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// The validated master config, once [`load_master`](Self::load_master) succeeded
    pub fn master(&self) -> Option<&ValidatedConfig> {
        self.master.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.master.as_ref().and_then(|master| master.get(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.master.as_ref().is_some_and(|master| master.has(key))
    }

    /// Drops discovered files and the loaded master, keeping the path.
    pub fn reset(&mut self) {
        self.files.clear();
        self.master = None;
    }

    /// Resolves `path` against the working directory and checks that it is a
    /// directory.
    pub async fn set_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let cwd = std::env::current_dir()
            .map_err(|e| CollinsError::convert(ErrorKind::InvalidInput, &e))?;
        let resolved = cwd.join(path.as_ref());

        let metadata = tokio::fs::metadata(&resolved).await.map_err(|e| {
            CollinsError::convert(ErrorKind::InvalidInput, &e)
                .with_context("path", resolved.display().to_string())
        })?;
        if !metadata.is_dir() {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!("config path supplied not directory: {}", resolved.display()),
            ));
        }

        tracing::debug!("Config path set to {}", resolved.display());
        self.path = Some(resolved);
        Ok(())
    }

    fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            CollinsError::with_details(ErrorKind::MissingConfig, "no config path supplied")
        })
    }

    /// Lists configuration files in the directory and checks for the master file.
    pub async fn discover(&mut self) -> Result<()> {
        let dir = self.require_path()?.to_path_buf();
        let read_error = |e: std::io::Error| {
            CollinsError::convert(ErrorKind::MissingFile, &e)
                .with_context("path", dir.display().to_string())
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(read_error)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            if self.conventions.is_config_file(&filename) {
                files.push(filename);
            }
        }

        let master_filename = self.conventions.master_filename();
        if !files.iter().any(|f| *f == master_filename) {
            return Err(CollinsError::with_details(
                ErrorKind::MissingConfig,
                format!("no {master_filename} config path: {}", dir.display()),
            ));
        }

        tracing::debug!("Discovered {} config files in {}", files.len(), dir.display());
        self.files = files;
        Ok(())
    }

    /// Reads the master file and validates it against the schema.
    pub async fn load_master(&mut self) -> Result<()> {
        if self.master.is_some() {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                "master config already loaded",
            ));
        }

        let filename = self.conventions.master_filename();
        let content = self.read_file(&filename).await?;
        let config: MasterConfig = self
            .parse(&content)
            .map_err(|e| CollinsError::convert(ErrorKind::InvalidConfig, &e))?;
        config
            .validate()
            .map_err(|reasons| CollinsError::with_reasons(ErrorKind::InvalidConfig, reasons))?;

        tracing::debug!(
            name = %config.name,
            log_level = %config.log_level,
            "Master config validated"
        );
        self.master = Some(ValidatedConfig::new(config));
        Ok(())
    }

    /// Discovered gear files (everything but the master file), in load order
    pub fn gear_files(&self) -> Vec<String> {
        let master_filename = self.conventions.master_filename();
        let gear_files: Vec<&String> = self
            .files
            .iter()
            .filter(|f| **f != master_filename)
            .collect();
        sort_config_files(&gear_files)
    }

    /// Reads the configuration file of the gear with canonical key `key`.
    pub async fn read_gear_config(&self, key: &str) -> Result<GearConfig> {
        let filename = self
            .conventions
            .build_config_filename(&ConfigTarget::Gear(key.to_string()))?;
        let content = self.read_file(&filename).await?;
        self.parse(&content).map_err(|e| {
            CollinsError::convert(ErrorKind::InvalidConfig, &e).with_context("file", filename)
        })
    }

    async fn read_file(&self, filename: &str) -> Result<String> {
        let path = self.require_path()?.join(filename);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            CollinsError::convert(ErrorKind::MissingFile, &e)
                .with_context("path", path.display().to_string())
        })
    }

    fn parse<T: DeserializeOwned>(&self, content: &str) -> std::result::Result<T, figment::Error> {
        let figment = match self.conventions.extension.as_str() {
            "toml" => Figment::from(Toml::string(content)),
            "yaml" | "yml" => Figment::from(Yaml::string(content)),
            _ => Figment::from(Json::string(content)),
        };
        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    async fn store_for(dir: &TempDir) -> ConfigStore {
        let mut store = ConfigStore::default();
        store.set_path(dir.path()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_set_path_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ConfigStore::default();
        let err = store
            .set_path(temp_dir.path().join("does-not-exist"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidInput);
        assert!(err.details().is_some());
        assert!(!store.has_path());
    }

    #[tokio::test]
    async fn test_set_path_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", "{}");
        let mut store = ConfigStore::default();
        let err = store
            .set_path(temp_dir.path().join("index.json"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_discover_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", "{}");
        write(&temp_dir, "slack.config.json", "{}");
        write(&temp_dir, "notes.txt", "ignored");
        write(&temp_dir, "slack.config.json.bak", "ignored");

        let mut store = store_for(&temp_dir).await;
        store.discover().await.unwrap();

        let mut files = store.files().to_vec();
        files.sort();
        assert_eq!(files, vec!["index.json", "slack.config.json"]);
        assert_eq!(store.gear_files(), vec!["slack.config.json"]);
    }

    #[tokio::test]
    async fn test_discover_requires_master_file() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "slack.config.json", "{}");

        let mut store = store_for(&temp_dir).await;
        let err = store.discover().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MissingConfig);
        assert!(err.message().contains("index.json"));
    }

    #[tokio::test]
    async fn test_discover_without_path() {
        let mut store = ConfigStore::default();
        let err = store.discover().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MissingConfig);
    }

    #[tokio::test]
    async fn test_discover_reports_vanished_directory_as_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_for(&temp_dir).await;
        let path = temp_dir.path().to_path_buf();
        drop(temp_dir);
        let err = store.discover().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MissingFile);
        assert_eq!(err.detail()["path"], json!(path.display().to_string()));
    }

    #[tokio::test]
    async fn test_load_master_exposes_properties() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "index.json",
            r#"{ "name": "Sys", "userAgent": "sys", "logLevel": "info", "token": "abc" }"#,
        );

        let mut store = store_for(&temp_dir).await;
        assert!(!store.has("name"));
        store.discover().await.unwrap();
        store.load_master().await.unwrap();

        assert!(store.has("token"));
        assert_eq!(store.get("token"), Some(&json!("abc")));
        assert_eq!(store.get("logLevel"), Some(&json!("info")));
        assert!(!store.has("missing"));
        assert_eq!(store.master().unwrap().log_level(), LogLevel::Info);
    }

    #[tokio::test]
    async fn test_load_master_rejects_bad_level() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", r#"{ "logLevel": "not-a-level" }"#);

        let mut store = store_for(&temp_dir).await;
        store.discover().await.unwrap();
        let err = store.load_master().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidConfig);
        assert!(store.master().is_none());
    }

    #[tokio::test]
    async fn test_load_master_rejects_spaces() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", r#"{ "name": "My System" }"#);

        let mut store = store_for(&temp_dir).await;
        store.discover().await.unwrap();
        let err = store.load_master().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidConfig);
        assert!(err.message().contains("1> name"));
    }

    #[tokio::test]
    async fn test_load_master_only_once() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", "{}");

        let mut store = store_for(&temp_dir).await;
        store.discover().await.unwrap();
        store.load_master().await.unwrap();
        let err = store.load_master().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_toml_conventions() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.toml", "name = \"Sys\"\ntoken = \"abc\"\n");
        write(&temp_dir, "slack.config.toml", "token = \"inherit\"\nchannel = \"general\"\n");
        write(&temp_dir, "index.json", "{}");

        let mut store = ConfigStore::new(Conventions::with_extension("toml").unwrap());
        store.set_path(temp_dir.path()).await.unwrap();
        store.discover().await.unwrap();
        store.load_master().await.unwrap();
        assert_eq!(store.gear_files(), vec!["slack.config.toml"]);

        let config = store.read_gear_config("slack").await.unwrap();
        let resolved = config
            .resolve("slack.config.toml", store.master().unwrap())
            .unwrap();
        assert_eq!(resolved.to_value(), json!({ "token": "abc", "channel": "general" }));
    }

    #[tokio::test]
    async fn test_read_gear_config_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "index.json", "{}");
        write(&temp_dir, "slack.config.json", "{ not json");

        let mut store = store_for(&temp_dir).await;
        store.discover().await.unwrap();
        let err = store.read_gear_config("slack").await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidConfig);
        assert_eq!(err.detail()["file"], json!("slack.config.json"));
    }
}
