use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Extensions accepted by the uploader, with the leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 15] = [
    ".ts", ".js", ".py", ".json", ".yaml", ".yml", ".txt", ".md", ".jsx", ".tsx", ".css", ".scss",
    ".html", ".xml", ".csv",
];

/// Derived extension of a file name: a dot followed by the lower-cased text
/// after the last `.`. A name without a dot yields the whole name.
pub fn extension_of(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or_default();
    format!(".{}", last.to_lowercase())
}

pub fn is_supported(name: &str) -> bool {
    let extension = extension_of(name);
    SUPPORTED_EXTENSIONS.contains(&extension.as_str())
}

/// Filter groupings offered to the catalog view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    JavaScriptTypeScript,
    Python,
    Markup,
    Styles,
    Data,
    Text,
}

impl FileCategory {
    pub const ALL: [FileCategory; 6] = [
        FileCategory::JavaScriptTypeScript,
        FileCategory::Python,
        FileCategory::Markup,
        FileCategory::Styles,
        FileCategory::Data,
        FileCategory::Text,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FileCategory::JavaScriptTypeScript => "JavaScript/TypeScript",
            FileCategory::Python => "Python",
            FileCategory::Markup => "Markup",
            FileCategory::Styles => "Styles",
            FileCategory::Data => "Data",
            FileCategory::Text => "Text",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileCategory::JavaScriptTypeScript => &[".js", ".jsx", ".ts", ".tsx"],
            FileCategory::Python => &[".py"],
            FileCategory::Markup => &[".html", ".xml", ".md"],
            FileCategory::Styles => &[".css", ".scss"],
            FileCategory::Data => &[".json", ".yaml", ".yml", ".csv"],
            FileCategory::Text => &[".txt"],
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(category) = Self::from_label(s) {
            return Ok(category);
        }
        match s.to_lowercase().as_str() {
            "js" | "ts" | "javascript" | "typescript" => Ok(FileCategory::JavaScriptTypeScript),
            "py" | "python" => Ok(FileCategory::Python),
            "markup" => Ok(FileCategory::Markup),
            "styles" | "css" => Ok(FileCategory::Styles),
            "data" => Ok(FileCategory::Data),
            "text" | "txt" => Ok(FileCategory::Text),
            other => Err(format!("unknown file category: {}", other)),
        }
    }
}

pub struct FileTypeDetector;

impl FileTypeDetector {
    /// MIME type of an uploaded file. Magic bytes win when `infer` recognizes
    /// them, otherwise the type comes from the extension.
    pub fn detect(name: &str, data: &[u8]) -> String {
        if let Some(kind) = infer::get(data) {
            return kind.mime_type().to_string();
        }

        let mime = match extension_of(name).as_str() {
            ".ts" | ".tsx" => "text/typescript",
            ".js" | ".jsx" => "text/javascript",
            ".py" => "text/x-python",
            ".json" => "application/json",
            ".yaml" | ".yml" => "application/yaml",
            ".md" => "text/markdown",
            ".css" => "text/css",
            ".scss" => "text/x-scss",
            ".html" => "text/html",
            ".xml" => "application/xml",
            ".csv" => "text/csv",
            ".txt" => "text/plain",
            _ => "application/octet-stream",
        };
        mime.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_after_last_dot() {
        assert_eq!(extension_of("archive.tar.GZ"), ".gz");
        assert_eq!(extension_of("Main.TSX"), ".tsx");
        assert_eq!(extension_of("README"), ".readme");
        assert_eq!(extension_of("trailing."), ".");
    }

    #[test]
    fn allow_list() {
        assert!(is_supported("config.YML"));
        assert!(is_supported("styles.scss"));
        assert!(!is_supported("setup.exe"));
        assert!(!is_supported("Makefile"));
    }

    #[test]
    fn every_category_extension_is_supported() {
        for category in FileCategory::ALL {
            for ext in category.extensions() {
                assert!(SUPPORTED_EXTENSIONS.contains(ext), "{} missing", ext);
            }
        }
    }

    #[test]
    fn category_parsing_accepts_labels_and_short_names() {
        assert_eq!("Markup".parse::<FileCategory>(), Ok(FileCategory::Markup));
        assert_eq!("js".parse::<FileCategory>(), Ok(FileCategory::JavaScriptTypeScript));
        assert!("binary".parse::<FileCategory>().is_err());
    }

    #[test]
    fn detector_falls_back_to_extension() {
        assert_eq!(FileTypeDetector::detect("a.py", b"print('hi')"), "text/x-python");
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(FileTypeDetector::detect("a.txt", &png), "image/png");
    }
}
