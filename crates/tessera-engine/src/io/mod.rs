use crate::blocks::BlockTypeRegistry;
use crate::editing::{Document, DocumentId};
use crate::markdown;
use crate::models::Node;
use relative_path::{RelativePath, RelativePathBuf};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid document {0}: {1}")]
    InvalidDocument(PathBuf, String),
    #[error("Invalid documents directory: {0}")]
    InvalidDocumentsDir(String),
}

/// Persistence collaborator that receives serialized documents.
///
/// The editing core never writes anything itself; it hands the JSON form of a
/// changed document to whoever implements this.
pub trait SaveRequests {
    fn request_save(&mut self, id: DocumentId, serialized: String);
}

/// Read a file and return its content
pub fn read_file(relative_path: &RelativePath, root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write content to a file
pub fn write_file(relative_path: &RelativePath, root: &Path, content: &str) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(root);

    // Create parent directories if they don't exist
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Scan for `.json` and `.md` documents below `root`
pub fn scan_documents(root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !root.exists() {
        return Err(IoError::InvalidDocumentsDir(
            "documents directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && (ext == "md" || ext == "json")
        {
            files.push(path);
        }
    }

    Ok(())
}

fn is_markdown(path: &RelativePath) -> bool {
    path.extension() == Some("md")
}

#[derive(Deserialize)]
struct StoredRoot {
    root: Node,
}

/// Documents stored as files below one root directory.
///
/// `.json` files hold the stored document form; `.md` files are imported and
/// exported through [`markdown`]. Documents read through the store are
/// remembered so later save requests know where to write.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    paths: HashMap<DocumentId, RelativePathBuf>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remembers where the document `id` lives.
    pub fn register(&mut self, id: DocumentId, path: impl Into<RelativePathBuf>) {
        self.paths.insert(id, path.into());
    }

    pub fn path_of(&self, id: DocumentId) -> Option<&RelativePath> {
        self.paths.get(&id).map(|path| path.as_relative_path())
    }

    pub fn read_document(
        &mut self,
        registry: Arc<BlockTypeRegistry>,
        path: &RelativePath,
    ) -> Result<Document, IoError> {
        let content = read_file(path, &self.root)?;
        let invalid = |err: String| IoError::InvalidDocument(path.to_path(&self.root), err);

        let doc = if is_markdown(path) {
            Document::from_root(registry, markdown::import(&content))
                .map_err(|err| invalid(err.to_string()))?
        } else {
            Document::from_json(registry, &content).map_err(|err| invalid(err.to_string()))?
        };

        self.register(doc.id(), path);
        Ok(doc)
    }

    pub fn write_document(&mut self, doc: &Document, path: &RelativePath) -> Result<(), IoError> {
        let content = if is_markdown(path) {
            markdown::export(doc.root())
        } else {
            doc.to_json()?
        };
        write_file(path, &self.root, &content)?;
        self.register(doc.id(), path);
        log::info!("saved document {} to {}", doc.id(), path);
        Ok(())
    }

    fn write_serialized(&self, path: &RelativePath, serialized: String) -> Result<(), IoError> {
        let content = if is_markdown(path) {
            let stored: StoredRoot = serde_json::from_str(&serialized)?;
            markdown::export(&stored.root)
        } else {
            serialized
        };
        write_file(path, &self.root, &content)
    }
}

impl SaveRequests for FileStore {
    fn request_save(&mut self, id: DocumentId, serialized: String) {
        let Some(path) = self.paths.get(&id) else {
            log::warn!("no file registered for document {id}, dropping save");
            return;
        };
        match self.write_serialized(path, serialized) {
            Ok(()) => log::info!("saved document {id} to {path}"),
            Err(err) => log::error!("failed to save document {id} to {path}: {err}"),
        }
    }
}
