//! Block insertion, including the two-phase custom actions some block types
//! carry (e.g. a page link that first needs its page to exist).
//!
//! Custom actions are sequenced by a generation counter. Every insertion
//! gesture bumps it; when a started action settles with a stale generation its
//! result is discarded and whatever it created is deleted again. An edit to
//! the document between start and settle makes the action stale as well,
//! since its insertion point no longer means what it did.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Cmd, Document, DocumentId, Patch};
use crate::blocks::{BlockTypeRegistry, InsertAction};
use crate::error::EditorError;

/// A page created by a [`LinkedPageService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("page service unavailable: {0}")]
    Unavailable(String),
    #[error("page not found: {0}")]
    NotFound(String),
}

/// Identifies one started custom action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionTicket {
    generation: u64,
}

impl ActionTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// External data service that owns linked pages.
pub trait LinkedPageService {
    /// Starts creating a page. The host reports the outcome through
    /// [`InsertionActions::settle`] with the same ticket.
    fn create_page(&mut self, ticket: ActionTicket, title: &str);

    fn delete_page(&mut self, page: &PageRef) -> Result<(), ServiceError>;
}

/// Opens a page in an editor once its link has been inserted.
pub trait EditorOpener {
    fn open_page(&mut self, page: &PageRef);
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Patch),
    /// A custom action was started; the block appears once it settles.
    Pending(ActionTicket),
}

#[derive(Debug, Clone, Copy)]
struct PendingAction {
    ticket: ActionTicket,
    document: DocumentId,
    /// Document version the insertion point was taken at.
    version: u64,
    at: usize,
    action: InsertAction,
}

/// Inserts blocks picked from the insertion menu.
#[derive(Debug)]
pub struct InsertionActions {
    registry: Arc<BlockTypeRegistry>,
    latest: u64,
    /// Only the latest action can still land.
    pending: Option<PendingAction>,
}

impl InsertionActions {
    pub fn new(registry: Arc<BlockTypeRegistry>) -> Self {
        Self {
            registry,
            latest: 0,
            pending: None,
        }
    }

    /// Inserts a block of type `type_id` at the boundary `at`.
    ///
    /// Unknown ids insert the default text block. Types with a custom action
    /// only start the action and return its ticket.
    pub fn insert(
        &mut self,
        doc: &mut Document,
        type_id: &str,
        at: usize,
        pages: &mut dyn LinkedPageService,
    ) -> Result<InsertOutcome, EditorError> {
        self.supersede();
        let block_type = self.registry.lookup_or_default(type_id);

        if let Some(action) = block_type.insert_action {
            let ticket = ActionTicket {
                generation: self.latest,
            };
            self.pending = Some(PendingAction {
                ticket,
                document: doc.id(),
                version: doc.version(),
                at,
                action,
            });
            log::debug!("started {} as action #{}", action.name, ticket.generation);
            (action.start)(pages, ticket);
            return Ok(InsertOutcome::Pending(ticket));
        }

        let node = self.registry.instantiate(block_type);
        let patch = doc.apply(Cmd::InsertBlocks {
            at,
            nodes: vec![node],
        })?;
        Ok(InsertOutcome::Inserted(patch))
    }

    /// Marks every in-flight action stale without starting a new one.
    pub fn supersede(&mut self) {
        self.latest += 1;
        self.pending = None;
    }

    /// Whether `ticket` is still the newest gesture.
    pub fn is_current(&self, ticket: ActionTicket) -> bool {
        ticket.generation == self.latest
    }

    /// Whether an action is waiting to settle.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Completes the action behind `ticket` with the service's result.
    ///
    /// A stale ticket, or a document edited since the action started, discards
    /// the result, deletes the created page and returns
    /// [`EditorError::AsyncSuperseded`]. A failed service call returns
    /// [`EditorError::ActionFailed`]; so does a rejected insertion, once the
    /// created page has been deleted.
    pub fn settle(
        &mut self,
        ticket: ActionTicket,
        result: Result<PageRef, ServiceError>,
        doc: &mut Document,
        pages: &mut dyn LinkedPageService,
        opener: &mut dyn EditorOpener,
    ) -> Result<Patch, EditorError> {
        let superseded = EditorError::AsyncSuperseded {
            generation: ticket.generation,
        };

        if !self.is_current(ticket) {
            log::debug!(
                "discarding action #{} superseded by #{}",
                ticket.generation,
                self.latest
            );
            if let Ok(page) = &result {
                rollback(pages, page);
            }
            return Err(superseded);
        }
        // Already settled
        let Some(pending) = self.pending.take_if(|pending| pending.ticket == ticket) else {
            return Err(superseded);
        };

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                log::error!("{} failed: {err}", pending.action.name);
                return Err(EditorError::ActionFailed(err.to_string()));
            }
        };

        if doc.id() != pending.document {
            rollback(pages, &page);
            return Err(EditorError::ActionFailed(format!(
                "document {} is no longer open",
                pending.document
            )));
        }

        if doc.version() != pending.version {
            log::debug!(
                "discarding action #{}: document changed from v{} to v{}",
                ticket.generation,
                pending.version,
                doc.version()
            );
            rollback(pages, &page);
            return Err(superseded);
        }

        let node = (pending.action.build)(&page);
        match doc.apply(Cmd::InsertBlocks {
            at: pending.at,
            nodes: vec![node],
        }) {
            Ok(patch) => {
                opener.open_page(&page);
                Ok(patch)
            }
            Err(err) => {
                log::error!("inserting {} failed: {err}", pending.action.name);
                rollback(pages, &page);
                Err(EditorError::ActionFailed(err.to_string()))
            }
        }
    }
}

/// Best-effort delete of a page whose insertion will never happen.
fn rollback(pages: &mut dyn LinkedPageService, page: &PageRef) {
    if let Err(err) = pages.delete_page(page) {
        log::warn!("rollback of page {} failed: {err}", page.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::catalog::*;
    use crate::models::Node;
    use crate::tests::{RecordingOpener, RecordingPages};

    fn document() -> Document {
        Document::new(BlockTypeRegistry::standard())
    }

    #[test]
    fn test_plain_insert_applies_immediately() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();

        let outcome = actions.insert(&mut doc, "heading2", 0, &mut pages).unwrap();

        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
        assert_eq!(doc.root().children()[0].kind, HEADING);
        assert!(pages.created.is_empty());
    }

    #[test]
    fn test_unknown_type_inserts_default_block() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();

        actions.insert(&mut doc, "sparkles", 0, &mut pages).unwrap();

        assert_eq!(doc.root().children().len(), 2);
        assert_eq!(doc.root().children()[0].kind, PARAGRAPH);
    }

    #[test]
    fn test_linked_page_inserts_after_settle_and_opens_page() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();
        let mut opener = RecordingOpener::default();

        let InsertOutcome::Pending(ticket) =
            actions.insert(&mut doc, LINKED_PAGE, 0, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };
        assert_eq!(pages.created, vec![ticket]);

        let page = PageRef {
            id: "p1".into(),
            title: "Untitled".into(),
        };
        actions
            .settle(ticket, Ok(page.clone()), &mut doc, &mut pages, &mut opener)
            .unwrap();

        let link = &doc.root().children()[0];
        assert_eq!(link.kind, LINKED_PAGE);
        assert_eq!(link.attrs.get("pageId"), Some(&serde_json::json!("p1")));
        assert_eq!(opener.opened, vec![page]);
    }

    #[test]
    fn test_failed_service_call_is_user_visible() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();
        let mut opener = RecordingOpener::default();

        let InsertOutcome::Pending(ticket) =
            actions.insert(&mut doc, LINKED_PAGE, 0, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };
        let err = actions
            .settle(
                ticket,
                Err(ServiceError::Unavailable("offline".into())),
                &mut doc,
                &mut pages,
                &mut opener,
            )
            .unwrap_err();

        assert!(err.is_user_visible());
        assert_eq!(doc.root().children().len(), 1);
    }

    #[test]
    fn test_rollback_failure_is_swallowed() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages {
            fail_deletes: true,
            ..Default::default()
        };
        let mut opener = RecordingOpener::default();

        let InsertOutcome::Pending(ticket) =
            actions.insert(&mut doc, LINKED_PAGE, 0, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };
        actions.supersede();

        let page = PageRef {
            id: "p1".into(),
            title: "Untitled".into(),
        };
        let err = actions
            .settle(ticket, Ok(page), &mut doc, &mut pages, &mut opener)
            .unwrap_err();

        assert_eq!(err, EditorError::AsyncSuperseded { generation: 1 });
        assert!(!err.is_user_visible());
    }

    #[test]
    fn test_settling_twice_is_superseded() {
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();
        let mut opener = RecordingOpener::default();

        let InsertOutcome::Pending(ticket) =
            actions.insert(&mut doc, LINKED_PAGE, 0, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };
        let page = PageRef {
            id: "p1".into(),
            title: "Untitled".into(),
        };
        actions
            .settle(ticket, Ok(page.clone()), &mut doc, &mut pages, &mut opener)
            .unwrap();

        let again = actions.settle(ticket, Ok(page), &mut doc, &mut pages, &mut opener);
        assert!(matches!(again, Err(EditorError::AsyncSuperseded { .. })));
        assert!(!actions.has_pending());
        // The page that did land is not rolled back
        assert!(pages.deleted.is_empty());
    }

    #[test]
    fn test_edit_before_settle_supersedes_action() {
        // Given two paragraphs and a link started after the second one
        let registry = BlockTypeRegistry::standard();
        let root = Node::blocks(
            DOC,
            vec![Node::text(PARAGRAPH, "ab"), Node::text(PARAGRAPH, "cd")],
        );
        let mut doc = Document::from_root(registry.clone(), root).unwrap();
        let mut actions = InsertionActions::new(registry);
        let mut pages = RecordingPages::default();
        let mut opener = RecordingOpener::default();
        let InsertOutcome::Pending(ticket) =
            actions.insert(&mut doc, LINKED_PAGE, 8, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };

        // When the first paragraph grows before the page arrives
        doc.apply(Cmd::InsertText {
            at: 1,
            text: "xyzw".into(),
        })
        .unwrap();
        let page = PageRef {
            id: "p1".into(),
            title: "Untitled".into(),
        };
        let err = actions
            .settle(ticket, Ok(page.clone()), &mut doc, &mut pages, &mut opener)
            .unwrap_err();

        // Then the link is not inserted anywhere and its page is deleted
        assert_eq!(err, EditorError::AsyncSuperseded { generation: 1 });
        assert!(!err.is_user_visible());
        let kinds: Vec<_> = doc.root().children().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec![PARAGRAPH, PARAGRAPH]);
        assert_eq!(pages.deleted, vec![page]);
        assert!(opener.opened.is_empty());
    }

    #[test]
    fn test_unsettled_action_is_dropped_by_next_insert() {
        // Given a link whose page never arrives
        let mut doc = document();
        let mut actions = InsertionActions::new(BlockTypeRegistry::standard());
        let mut pages = RecordingPages::default();
        let mut opener = RecordingOpener::default();
        let InsertOutcome::Pending(abandoned) =
            actions.insert(&mut doc, LINKED_PAGE, 0, &mut pages).unwrap()
        else {
            panic!("expected a pending action");
        };
        assert!(actions.has_pending());

        // When a plain block is inserted instead
        actions.insert(&mut doc, PARAGRAPH, 0, &mut pages).unwrap();

        // Then nothing is left waiting
        assert!(!actions.has_pending());

        // And a late result for the abandoned action is still rolled back
        let page = PageRef {
            id: "late".into(),
            title: "Untitled".into(),
        };
        let err = actions
            .settle(abandoned, Ok(page.clone()), &mut doc, &mut pages, &mut opener)
            .unwrap_err();
        assert!(matches!(err, EditorError::AsyncSuperseded { .. }));
        assert_eq!(pages.deleted, vec![page]);
    }
}
