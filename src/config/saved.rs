//! Settings that can be saved to config file

use std::io::Write;
use std::path::{Path, PathBuf};
use toml::map::Map;

use super::Options;

#[derive(Clone, Debug, Default)]
pub struct SavedSettings {
    pub buffered_write: Option<bool>,
    pub keep_order: Option<bool>,
    pub prompt_for_export_password: Option<bool>,
    pub default_export_password: Option<String>,
    pub page_size: Option<usize>,
    pub root_filename: Option<String>,
}

impl SavedSettings {
    /// Every option that differs from the defaults
    pub fn from_options(options: &Options) -> Self {
        let defaults = Options::default();
        let changed = |a: bool, b: bool| (a != b).then_some(a);
        Self {
            buffered_write: changed(options.buffered_write, defaults.buffered_write),
            keep_order: changed(options.keep_order, defaults.keep_order),
            prompt_for_export_password: changed(
                options.prompt_for_export_password,
                defaults.prompt_for_export_password,
            ),
            default_export_password: (options.default_export_password
                != defaults.default_export_password)
                .then(|| options.default_export_password.clone()),
            page_size: (options.page_size != defaults.page_size).then_some(options.page_size),
            root_filename: (options.root_filename != defaults.root_filename)
                .then(|| options.root_filename.clone()),
        }
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zipnav").join("config.toml"))
    }

    /// Load existing config as a TOML table
    pub fn load_existing() -> Map<String, toml::Value> {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    fn load_from(path: &Path) -> Map<String, toml::Value> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.parse::<toml::Table>().ok())
            .unwrap_or_default()
    }

    /// Save settings to config file, merging with existing config
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "config dir not found")
        })?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut table = Self::load_from(path);
        self.apply_to_table(&mut table);

        let content = toml::to_string_pretty(&table)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut file = std::fs::File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    fn apply_to_table(&self, table: &mut Map<String, toml::Value>) {
        let flags = [
            ("buffered_write", self.buffered_write),
            ("keep_order", self.keep_order),
            ("prompt_for_export_password", self.prompt_for_export_password),
        ];
        for (key, value) in flags {
            if let Some(v) = value {
                table.insert(key.to_string(), toml::Value::Boolean(v));
            }
        }
        if let Some(ref v) = self.default_export_password {
            table.insert(
                "default_export_password".to_string(),
                toml::Value::String(v.clone()),
            );
        }
        if let Some(v) = self.page_size {
            table.insert("page_size".to_string(), toml::Value::Integer(v as i64));
        }
        if let Some(ref v) = self.root_filename {
            if v.is_empty() {
                table.remove("root_filename");
            } else {
                table.insert("root_filename".to_string(), toml::Value::String(v.clone()));
            }
        }
    }
}
