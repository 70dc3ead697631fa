//! Zip-based archive formats

use std::path::Path;

pub const ZIP_EXTENSION: &str = "zip";

/// Extensions of formats that are zip containers underneath
pub const ZIP_EXTENSIONS: &[&str] = &[
    ZIP_EXTENSION,
    "docx",
    "epub",
    "jar",
    "odp",
    "ods",
    "odt",
    "pptx",
    "xlsx",
    "key",
    "pages",
    "numbers",
    "apk",
    "ipa",
];

/// Check if a file name looks like a zip-based archive
pub fn is_archive_name(name: &str) -> bool {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    ext.is_some_and(|ext| ZIP_EXTENSIONS.contains(&ext.as_str()))
}

/// `name` with the default archive extension appended
pub fn archive_filename(name: &str) -> String {
    format!("{name}.{ZIP_EXTENSION}")
}
