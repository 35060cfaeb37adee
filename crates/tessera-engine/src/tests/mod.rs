use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::editing::{
    ActionTicket, DocumentId, EditorOpener, LinkedPageService, PageRef, ServiceError,
};
use crate::io::SaveRequests;

/// Create a temporary documents directory
pub fn create_test_documents_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a test file with content, including any parent directories
pub fn create_test_file(documents_dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = documents_dir.path().join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}

/// Page service that records requests instead of doing them
#[derive(Debug, Default)]
pub struct RecordingPages {
    pub created: Vec<ActionTicket>,
    pub deleted: Vec<PageRef>,
    pub fail_deletes: bool,
}

impl LinkedPageService for RecordingPages {
    fn create_page(&mut self, ticket: ActionTicket, _title: &str) {
        self.created.push(ticket);
    }

    fn delete_page(&mut self, page: &PageRef) -> Result<(), ServiceError> {
        if self.fail_deletes {
            return Err(ServiceError::Unavailable("offline".into()));
        }
        self.deleted.push(page.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingOpener {
    pub opened: Vec<PageRef>,
}

impl EditorOpener for RecordingOpener {
    fn open_page(&mut self, page: &PageRef) {
        self.opened.push(page.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingSaves {
    pub saved: Vec<(DocumentId, String)>,
}

impl SaveRequests for RecordingSaves {
    fn request_save(&mut self, id: DocumentId, serialized: String) {
        self.saved.push((id, serialized));
    }
}

/// Small document trees shared by the unit tests
pub mod fixtures {
    use crate::blocks::catalog::*;
    use crate::models::Node;

    fn paragraphs(texts: &[&str]) -> Vec<Node> {
        texts.iter().map(|text| Node::text(PARAGRAPH, *text)).collect()
    }

    pub fn quote(texts: &[&str]) -> Node {
        Node::blocks(QUOTE, paragraphs(texts))
    }

    pub fn toggle(title: &str, body: &[&str]) -> Node {
        Node::blocks(
            TOGGLE,
            vec![
                Node::text(TOGGLE_TITLE, title),
                Node::blocks(TOGGLE_CONTENT, paragraphs(body)),
            ],
        )
    }

    pub fn columns(left: &[&str], right: &[&str]) -> Node {
        Node::blocks(
            COLUMN_LAYOUT,
            vec![
                Node::blocks(COLUMN, paragraphs(left)),
                Node::blocks(COLUMN, paragraphs(right)),
            ],
        )
    }

    /// One of each structure:
    ///
    /// ```text
    /// heading@0 "Title"
    /// paragraph@7 "Intro"
    /// quote@14 [paragraph@15 "Quoted"]
    /// toggle@24 "Summary" [paragraph@35 "Hidden"]
    /// columnLayout@45 [paragraph@47 "left"] [paragraph@55 "right"]
    /// divider@64
    /// todoItem@65 "Task"
    /// ```
    pub fn mixed_document() -> Node {
        Node::blocks(
            DOC,
            vec![
                Node::text(HEADING, "Title").with_attr("level", 1),
                Node::text(PARAGRAPH, "Intro"),
                quote(&["Quoted"]),
                toggle("Summary", &["Hidden"]),
                columns(&["left"], &["right"]),
                Node::atom(DIVIDER),
                Node::text(TODO_ITEM, "Task")
                    .with_attr("indent", 0)
                    .with_attr("checked", false),
            ],
        )
    }
}
