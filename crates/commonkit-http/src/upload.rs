//! Uploaded files.

use std::ffi::OsStr;
use std::path::Path;

/// A file received with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The original filename as provided by the client.
    pub name: String,
    /// The MIME content type of the file.
    pub content_type: String,
    /// The size of the file content in bytes.
    pub size: usize,
    /// The raw file content.
    pub content: Vec<u8>,
}

impl UploadedFile {
    /// Creates an uploaded file, guessing the content type from the extension.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name).to_string();
        Self {
            name,
            content_type,
            size: content.len(),
            content,
        }
    }

    /// Overrides the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Returns the lowercased extension of the file name.
    ///
    /// Only the last path component counts, and a leading dot marks a hidden
    /// file rather than an extension.
    ///
    /// ```
    /// use commonkit_http::UploadedFile;
    ///
    /// assert_eq!(UploadedFile::new("Report.CSV", vec![]).extension().as_deref(), Some("csv"));
    /// assert_eq!(UploadedFile::new("archive.tar.gz", vec![]).extension().as_deref(), Some("gz"));
    /// assert_eq!(UploadedFile::new("README", vec![]).extension(), None);
    /// ```
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name).map(str::to_lowercase)
    }
}

fn file_extension(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| !ext.is_empty())
}

fn guess_content_type(name: &str) -> &'static str {
    let ext = file_extension(name).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("tsv") => "text/tab-separated-values",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("ods") => "application/vnd.oasis.opendocument.spreadsheet",
        _ => "application/octet-stream",
    }
}
