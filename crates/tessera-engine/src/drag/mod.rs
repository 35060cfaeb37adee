//! # Block Drag
//!
//! Moving blocks by drag and drop, within one document or between two.
//!
//! A drag carries a [`DragPayload`]: where the dragged blocks came from and a
//! snapshot of them. The payload lives in a [`DragSessions`] slot for the
//! length of the gesture and travels to the drop target as [`DropData`].
//! Exactly one drag is active at a time; starting another replaces it.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::editing::{Cmd, Document, DocumentId, Patch};
use crate::error::EditorError;
use crate::models::Node;

/// Payload type under which dragged blocks travel.
pub const BLOCK_DRAG_MIME: &str = "application/x-tessera-blocks+json";

/// Typed data handed from a drag source to a drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropData {
    pub mime: String,
    pub data: String,
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub source_document_id: DocumentId,
    pub from_offset: usize,
    pub to_offset: usize,
    pub snapshot_nodes: Vec<Node>,
    /// Milliseconds since the Unix epoch.
    pub started_at: u64,
}

impl DragPayload {
    /// Captures the block addressed by `address` in `doc`.
    pub fn capture(doc: &Document, address: usize) -> Result<Self, EditorError> {
        let block = doc.block_at(address)?;
        let range = block.range();
        Ok(Self {
            source_document_id: doc.id(),
            from_offset: range.start,
            to_offset: range.end,
            snapshot_nodes: vec![block.node.clone()],
            started_at: now_millis(),
        })
    }

    pub fn range(&self) -> Range<usize> {
        self.from_offset..self.to_offset
    }

    pub fn to_drop_data(&self) -> Result<DropData, serde_json::Error> {
        Ok(DropData {
            mime: BLOCK_DRAG_MIME.to_string(),
            data: serde_json::to_string(self)?,
        })
    }

    /// Reads a payload back. Data of any other type is not ours and yields
    /// `None`, as does a malformed payload.
    pub fn from_drop_data(drop_data: &DropData) -> Option<Self> {
        if drop_data.mime != BLOCK_DRAG_MIME {
            return None;
        }
        match serde_json::from_str(&drop_data.data) {
            Ok(payload) => Some(payload),
            Err(err) => {
                log::debug!("ignoring malformed drag payload: {err}");
                None
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[derive(Debug, Default)]
struct Slot {
    token: u64,
    current: Option<DragPayload>,
}

/// Handle to the single drag slot. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct DragSessions {
    slot: Rc<RefCell<Slot>>,
}

impl DragSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag, replacing any drag in progress.
    #[must_use = "the drag ends when the returned guard is dropped"]
    pub fn begin(&self, payload: DragPayload) -> ActiveDrag {
        let mut slot = self.slot.borrow_mut();
        slot.token += 1;
        slot.current = Some(payload);
        ActiveDrag {
            sessions: self.clone(),
            token: slot.token,
        }
    }

    pub fn current(&self) -> Option<DragPayload> {
        self.slot.borrow().current.clone()
    }

    pub fn is_active(&self) -> bool {
        self.slot.borrow().current.is_some()
    }

    /// Ends whatever drag is in progress.
    pub fn end(&self) {
        self.slot.borrow_mut().current = None;
    }
}

/// Ends its drag when dropped, unless a newer drag has replaced it.
#[derive(Debug)]
pub struct ActiveDrag {
    sessions: DragSessions,
    token: u64,
}

impl ActiveDrag {
    /// The payload of this drag, while it is still the current one.
    pub fn payload(&self) -> Option<DragPayload> {
        let slot = self.sessions.slot.borrow();
        if slot.token == self.token {
            slot.current.clone()
        } else {
            None
        }
    }

    pub fn is_current(&self) -> bool {
        self.payload().is_some()
    }
}

impl Drop for ActiveDrag {
    fn drop(&mut self) {
        let mut slot = self.sessions.slot.borrow_mut();
        if slot.token == self.token {
            slot.current = None;
        }
    }
}

/// Ends the session on every exit path of a drop.
struct EndOnDrop<'a>(&'a DragSessions);

impl Drop for EndOnDrop<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Performs a drop of `drop_data` at boundary `at` of `target`.
///
/// A drop from the same document moves the blocks in one transaction. A drop
/// from another document deletes the original from `source` and inserts the
/// snapshot into `target`; both are checked before either commits. Either way
/// the source range must still hold the snapshot.
///
/// Returns `Ok(None)` for data that is not a block drag, and for data that is
/// not the payload of the drag in progress. The drag session is ended
/// whatever the outcome.
pub fn relocate(
    sessions: &DragSessions,
    drop_data: &DropData,
    target: &mut Document,
    at: usize,
    source: Option<&mut Document>,
) -> Result<Option<Patch>, EditorError> {
    let current = sessions.current();
    let _end = EndOnDrop(sessions);
    let Some(payload) = DragPayload::from_drop_data(drop_data) else {
        return Ok(None);
    };
    if current.as_ref() != Some(&payload) {
        log::debug!(
            "ignoring drop of {}..{} outside its drag",
            payload.from_offset,
            payload.to_offset
        );
        return Ok(None);
    }

    if payload.source_document_id == target.id() {
        verify_snapshot(target, &payload)?;
        let patch = target.apply(Cmd::MoveBlocks {
            range: payload.range(),
            to: at,
        })?;
        return Ok(Some(patch));
    }

    let source = source
        .filter(|source| source.id() == payload.source_document_id)
        .ok_or_else(|| {
            EditorError::InvariantViolation(format!(
                "source document {} is not open",
                payload.source_document_id
            ))
        })?;
    verify_snapshot(source, &payload)?;

    let delete = Cmd::DeleteBlocks {
        range: payload.range(),
    };
    source.check(&delete)?;
    let patch = target.apply(Cmd::InsertBlocks {
        at,
        nodes: payload.snapshot_nodes.clone(),
    })?;
    if let Err(err) = source.apply(delete) {
        let size: usize = payload.snapshot_nodes.iter().map(Node::node_size).sum();
        if let Err(rollback) = target.apply(Cmd::DeleteBlocks {
            range: at..at + size,
        }) {
            log::warn!("failed to undo drop into {}: {rollback}", target.id());
        }
        return Err(err);
    }
    Ok(Some(patch))
}

/// Checks that the dragged range still holds what was captured.
fn verify_snapshot(doc: &Document, payload: &DragPayload) -> Result<(), EditorError> {
    let stale = || {
        EditorError::InvariantViolation(format!(
            "blocks at {}..{} changed since the drag started",
            payload.from_offset, payload.to_offset
        ))
    };

    let mut address = payload.from_offset;
    for node in &payload.snapshot_nodes {
        let block = doc.block_at(address).map_err(|_| stale())?;
        if block.address != address || block.node != node {
            return Err(stale());
        }
        address += node.node_size();
    }
    if address != payload.to_offset {
        return Err(stale());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockTypeRegistry;
    use crate::blocks::catalog::*;
    use pretty_assertions::assert_eq;

    fn doc(texts: &[&str]) -> Document {
        let children = texts.iter().map(|text| Node::text(PARAGRAPH, *text)).collect();
        Document::from_root(BlockTypeRegistry::standard(), Node::blocks(DOC, children)).unwrap()
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.root().children().iter().map(Node::plain_text).collect()
    }

    #[test]
    fn test_last_begin_wins() {
        // Given two drags started one after the other
        let sessions = DragSessions::new();
        let source = doc(&["a", "b"]);
        let first = DragPayload::capture(&source, 0).unwrap();
        let second = DragPayload::capture(&source, 3).unwrap();

        let first_drag = sessions.begin(first);
        let second_drag = sessions.begin(second.clone());

        // Then the second is current and the first guard no longer owns the slot
        assert_eq!(sessions.current(), Some(second));
        assert!(!first_drag.is_current());

        // When the stale guard is dropped the newer drag survives
        drop(first_drag);
        assert!(second_drag.is_current());

        // And end() clears the slot
        sessions.end();
        assert_eq!(sessions.current(), None);
    }

    #[test]
    fn test_guard_ends_its_own_session() {
        let sessions = DragSessions::new();
        let source = doc(&["a"]);
        {
            let _drag = sessions.begin(DragPayload::capture(&source, 0).unwrap());
            assert!(sessions.is_active());
        }
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_payload_wire_shape() {
        let source = doc(&["a"]);
        let payload = DragPayload::capture(&source, 0).unwrap();

        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "sourceDocumentId",
            "fromOffset",
            "toOffset",
            "snapshotNodes",
            "startedAt",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(value["fromOffset"], 0);
        assert_eq!(value["toOffset"], 3);
        assert_eq!(value["sourceDocumentId"], source.id().to_string());
    }

    #[test]
    fn test_foreign_drop_data_is_ignored() {
        let sessions = DragSessions::new();
        let mut target = doc(&["a"]);
        let _drag = sessions.begin(DragPayload::capture(&target, 0).unwrap());

        let foreign = DropData {
            mime: "text/plain".to_string(),
            data: "hello".to_string(),
        };
        let result = relocate(&sessions, &foreign, &mut target, 0, None).unwrap();

        assert_eq!(result, None);
        assert_eq!(texts(&target), vec!["a"]);
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_move_within_document() {
        // Given a drag of "a" (0..3) in a three paragraph document
        let sessions = DragSessions::new();
        let mut target = doc(&["a", "b", "c"]);
        let payload = DragPayload::capture(&target, 0).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        let _drag = sessions.begin(payload);

        // When it is dropped after "c"
        let patch = relocate(&sessions, &drop_data, &mut target, 9, None)
            .unwrap()
            .unwrap();

        // Then it moves in one transaction and the session ends
        assert_eq!(texts(&target), vec!["b", "c", "a"]);
        assert_eq!(patch.version, 1);
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_move_between_documents() {
        let sessions = DragSessions::new();
        let mut source = doc(&["a", "b"]);
        let mut target = doc(&["x"]);
        let payload = DragPayload::capture(&source, 3).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        let _drag = sessions.begin(payload);

        relocate(&sessions, &drop_data, &mut target, 0, Some(&mut source))
            .unwrap()
            .unwrap();

        assert_eq!(texts(&target), vec!["b", "x"]);
        assert_eq!(texts(&source), vec!["a"]);
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_stale_source_leaves_both_documents_untouched() {
        // Given a drag whose source was edited after the drag started
        let sessions = DragSessions::new();
        let mut source = doc(&["a", "b"]);
        let mut target = doc(&["x"]);
        let payload = DragPayload::capture(&source, 3).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        let _drag = sessions.begin(payload);
        source
            .apply(Cmd::InsertText {
                at: 4,
                text: "!".to_string(),
            })
            .unwrap();

        // When it is dropped
        let result = relocate(&sessions, &drop_data, &mut target, 0, Some(&mut source));

        // Then nothing moves and the session still ends
        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
        assert_eq!(texts(&target), vec!["x"]);
        assert_eq!(texts(&source), vec!["a", "!b"]);
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_failed_source_delete_commits_nothing() {
        // Given a drag of the only block of the source; deleting it would
        // leave an empty page, which the guard rejects
        let sessions = DragSessions::new();
        let mut source = doc(&["only"]);
        let mut target = doc(&["x"]);
        let payload = DragPayload::capture(&source, 0).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        let _drag = sessions.begin(payload);

        let result = relocate(&sessions, &drop_data, &mut target, 0, Some(&mut source));

        // Then neither document commits anything
        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
        assert_eq!(texts(&target), vec!["x"]);
        assert_eq!(texts(&source), vec!["only"]);
        assert_eq!(target.version(), 0);
        assert_eq!(source.version(), 0);
        assert!(!sessions.is_active());
    }

    #[test]
    fn test_missing_source_document_is_rejected() {
        let sessions = DragSessions::new();
        let source = doc(&["a", "b"]);
        let mut target = doc(&["x"]);
        let payload = DragPayload::capture(&source, 0).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        let _drag = sessions.begin(payload);

        let result = relocate(&sessions, &drop_data, &mut target, 0, None);

        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
        assert_eq!(texts(&target), vec!["x"]);
    }

    #[test]
    fn test_drop_after_drag_ended_is_ignored() {
        // Given drop data from a drag whose guard is already gone
        let sessions = DragSessions::new();
        let mut target = doc(&["a", "b", "c"]);
        let payload = DragPayload::capture(&target, 0).unwrap();
        let drop_data = payload.to_drop_data().unwrap();
        drop(sessions.begin(payload));
        assert!(!sessions.is_active());

        // When the leftover data is dropped
        let result = relocate(&sessions, &drop_data, &mut target, 9, None).unwrap();

        // Then nothing moves
        assert_eq!(result, None);
        assert_eq!(texts(&target), vec!["a", "b", "c"]);
        assert_eq!(target.version(), 0);
    }

    #[test]
    fn test_drop_of_superseded_drag_is_ignored() {
        // Given a drag of "a" replaced by a drag of "b"
        let sessions = DragSessions::new();
        let mut target = doc(&["a", "b", "c"]);
        let first = DragPayload::capture(&target, 0).unwrap();
        let stale_data = first.to_drop_data().unwrap();
        let _first = sessions.begin(first);
        let _second = sessions.begin(DragPayload::capture(&target, 3).unwrap());

        // When the first drag's data is dropped
        let result = relocate(&sessions, &stale_data, &mut target, 9, None).unwrap();

        // Then it does not move and the newer session is ended
        assert_eq!(result, None);
        assert_eq!(texts(&target), vec!["a", "b", "c"]);
        assert!(!sessions.is_active());
    }
}
