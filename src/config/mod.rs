//! Configuration module
//!
//! Split into submodules for reduced complexity.

mod options;
mod saved;

pub use options::Options;
pub use saved::SavedSettings;

use prefer::Config as PreferConfig;

pub struct Config {
    inner: PreferConfig,
}

impl Config {
    pub async fn load() -> prefer::Result<Self> {
        let inner = prefer::load("zipnav/config").await?;
        Ok(Self { inner })
    }

    async fn get_bool(&self, key: &str) -> Option<bool> {
        self.inner
            .get(key)
            .await
            .ok()
            .and_then(|v: prefer::ConfigValue| v.as_bool())
    }

    async fn get_i64(&self, key: &str) -> Option<i64> {
        self.inner
            .get(key)
            .await
            .ok()
            .and_then(|v: prefer::ConfigValue| v.as_i64())
    }

    async fn get_str(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .await
            .ok()
            .and_then(|v: prefer::ConfigValue| v.as_str().map(|s| s.to_string()))
    }

    /// Options from the config file, defaults for missing keys
    pub async fn options(&self) -> Options {
        let mut options = Options::default();
        if let Some(v) = self.get_bool("buffered_write").await {
            options.buffered_write = v;
        }
        if let Some(v) = self.get_bool("keep_order").await {
            options.keep_order = v;
        }
        if let Some(v) = self.get_bool("prompt_for_export_password").await {
            options.prompt_for_export_password = v;
        }
        if let Some(v) = self.get_str("default_export_password").await {
            options.default_export_password = v;
        }
        if let Some(v) = self.get_i64("page_size").await
            && v > 0
        {
            options.page_size = v as usize;
        }
        if let Some(v) = self.get_str("root_filename").await
            && !v.is_empty()
        {
            options.root_filename = v;
        }
        options
    }
}
