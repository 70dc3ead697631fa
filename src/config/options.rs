//! Runtime options of the workspace

use crate::archive;

/// Options consumed by the workspace and its pipelines
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub buffered_write: bool,
    pub keep_order: bool,
    /// Ask for a password before each export instead of using the default
    pub prompt_for_export_password: bool,
    pub default_export_password: String,
    /// Rows moved by the page up/down highlight commands
    pub page_size: usize,
    /// Export file name used for the root folder
    pub root_filename: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffered_write: true,
            keep_order: true,
            prompt_for_export_password: true,
            default_export_password: String::new(),
            page_size: 10,
            root_filename: archive::archive_filename("archive"),
        }
    }
}

impl Options {
    /// Password used when exports are not prompted for, `None` when empty
    pub fn default_password(&self) -> Option<String> {
        (!self.default_export_password.is_empty()).then(|| self.default_export_password.clone())
    }
}
