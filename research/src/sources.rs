use reducer::{Error, Result};
use std::path::{Path, PathBuf};

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "tsv", "json", "jsonl", "xml", "html", "htm", "yaml", "yml",
    "log", "py", "rs",
];

pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    /// Context that did not come from a file.
    pub fn inline(text: String) -> Self {
        Self {
            path: PathBuf::from("additional context"),
            text,
        }
    }

    /// Text prefixed with its origin so provenance survives reduction.
    pub fn labeled(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("From {}:\n{}", name, self.text.trim())
    }
}

pub fn read_document(path: &Path) -> Result<Document> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    if let Some(ext) = &ext {
        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::UnsupportedFile(path.display().to_string()));
        }
    }

    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), chars = text.chars().count(), "read document");

    Ok(Document {
        path: path.to_path_buf(),
        text,
    })
}

pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths.iter().map(|p| read_document(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("research-sources-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_reads_text_files() -> Result<()> {
        let path = scratch("notes.md", "  Mercury has no moons.\n");
        let doc = read_document(&path)?;
        assert_eq!(doc.text, "  Mercury has no moons.\n");
        assert_eq!(doc.labeled(), "From notes.md:\nMercury has no moons.");
        Ok(())
    }

    #[test]
    fn test_files_without_extension_are_text() -> Result<()> {
        let path = scratch("README", "plain");
        assert_eq!(read_document(&path)?.text, "plain");
        Ok(())
    }

    #[test]
    fn test_inline_context_label() {
        let doc = Document::inline("Paris is the capital.".to_string());
        assert_eq!(doc.labeled(), "From additional context:\nParis is the capital.");
    }

    #[test]
    fn test_rejects_binary_formats() {
        let path = scratch("report.pdf", "%PDF-1.4");
        assert!(matches!(read_document(&path), Err(Error::UnsupportedFile(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let res = read_documents(&[PathBuf::from("/nonexistent/research/file.txt")]);
        assert!(matches!(res, Err(Error::IOError(_))));
    }
}
