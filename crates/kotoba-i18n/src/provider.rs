//! Pluggable transports that deliver complete resource trees

use crate::error::{I18nError, I18nResult};
use crate::locale::LocaleCode;
use crate::resource::ResourceTree;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Source of per-locale resource trees
///
/// Implementations return the whole tree or an error; the store never sees a
/// partial result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Fetch the complete tree for `locale`
    async fn fetch(&self, locale: &LocaleCode) -> I18nResult<ResourceTree>;
}

/// Trees compiled into the binary or built in memory
#[derive(Debug, Clone, Default)]
pub struct EmbeddedProvider {
    trees: HashMap<LocaleCode, Arc<ResourceTree>>,
}

impl EmbeddedProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree for `locale`
    pub fn with_tree(mut self, locale: impl Into<LocaleCode>, tree: ResourceTree) -> Self {
        self.trees.insert(locale.into(), Arc::new(tree));
        self
    }

    /// Register a tree parsed from a JSON document
    pub fn with_json(self, locale: &str, json: &str) -> I18nResult<Self> {
        let tree = ResourceTree::from_json_str(locale, json)?;
        Ok(self.with_tree(locale, tree))
    }
}

#[async_trait]
impl ResourceProvider for EmbeddedProvider {
    async fn fetch(&self, locale: &LocaleCode) -> I18nResult<ResourceTree> {
        self.trees
            .get(locale)
            .map(|tree| ResourceTree::clone(tree))
            .ok_or_else(|| I18nError::load_failure(locale.as_str(), "no embedded resources"))
    }
}

/// `<dir>/<locale>.json` files shipped alongside the application
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    base_dir: PathBuf,
}

impl DirectoryProvider {
    /// Create a provider rooted at `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the base directory for resources
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the resource file for `locale`
    pub fn resource_file(&self, locale: &LocaleCode) -> PathBuf {
        self.base_dir.join(format!("{locale}.json"))
    }
}

#[async_trait]
impl ResourceProvider for DirectoryProvider {
    async fn fetch(&self, locale: &LocaleCode) -> I18nResult<ResourceTree> {
        let path = self.resource_file(locale);
        debug!("Loading resource file: {:?}", path);

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            I18nError::load_failure(locale.as_str(), format!("{}: {e}", path.display()))
        })?;

        ResourceTree::from_json_str(locale.as_str(), &content)
    }
}

/// `<base_url>/<locale>.json` fetched over HTTP
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteProvider {
    /// Create a provider with its own client and request timeout
    pub fn new(base_url: Url, timeout: Duration) -> I18nResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| I18nError::load_failure("*", e))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a provider sharing an existing client
    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        // Url::join drops the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// URL of the resource document for `locale`
    pub fn resource_url(&self, locale: &LocaleCode) -> I18nResult<Url> {
        self.base_url
            .join(&format!("{locale}.json"))
            .map_err(|e| I18nError::load_failure(locale.as_str(), e))
    }
}

#[async_trait]
impl ResourceProvider for RemoteProvider {
    async fn fetch(&self, locale: &LocaleCode) -> I18nResult<ResourceTree> {
        let url = self.resource_url(locale)?;
        debug!("Fetching resources from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| I18nError::load_failure(locale.as_str(), e))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| I18nError::load_failure(locale.as_str(), e))?;

        ResourceTree::from_json_value(locale.as_str(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotoba_common::test_utils::{create_temp_dir, write_fixture};

    #[tokio::test]
    async fn test_embedded_provider() {
        let provider = EmbeddedProvider::new()
            .with_json("ja", r#"{"greeting": "こんにちは"}"#)
            .unwrap();

        let tree = provider.fetch(&LocaleCode::new("ja")).await.unwrap();
        assert_eq!(tree.lookup("greeting").found(), Some("こんにちは"));

        let err = provider.fetch(&LocaleCode::new("en")).await.unwrap_err();
        assert!(matches!(err, I18nError::ResourceLoadFailure { .. }));
    }

    #[tokio::test]
    async fn test_directory_provider_reads_file() {
        let dir = create_temp_dir();
        write_fixture(&dir, "en.json", r#"{"popup": {"title": "Entries"}}"#);
        let provider = DirectoryProvider::new(dir.path());

        let tree = provider.fetch(&LocaleCode::new("en")).await.unwrap();
        assert_eq!(tree.lookup("popup.title").found(), Some("Entries"));
    }

    #[tokio::test]
    async fn test_directory_provider_missing_file() {
        let dir = create_temp_dir();
        let provider = DirectoryProvider::new(dir.path());

        let err = provider.fetch(&LocaleCode::new("ja")).await.unwrap_err();
        assert!(matches!(err, I18nError::ResourceLoadFailure { ref locale, .. } if locale == "ja"));
    }

    #[tokio::test]
    async fn test_directory_provider_bad_json() {
        let dir = create_temp_dir();
        write_fixture(&dir, "ja.json", r#"{"greeting": ["not", "a", "string"]}"#);
        let provider = DirectoryProvider::new(dir.path());

        let err = provider.fetch(&LocaleCode::new("ja")).await.unwrap_err();
        assert!(matches!(err, I18nError::ResourceParse { .. }));
    }

    #[test]
    fn test_remote_url_keeps_base_path() {
        let base: Url = "https://example.invalid/assets/i18n".parse().unwrap();
        let provider = RemoteProvider::with_client(reqwest::Client::new(), base);

        let url = provider.resource_url(&LocaleCode::new("en")).unwrap();
        assert_eq!(url.as_str(), "https://example.invalid/assets/i18n/en.json");
    }
}
