/*!
 * # Editing Core Module
 *
 * The document tree and every way of changing it.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: the node tree
 * - A `Document` owns one `Node` tree addressed through the linear content model
 * - Positions count one unit per character plus an opening and closing token
 *   per non-atom node, so every block has a stable numeric address
 *
 * ### 2. Command-Based Editing
 * - All edits are `Cmd` values applied with `Document::apply`
 * - A command runs on a copy of the tree; the structural guard checks the copy
 *   and the copy is committed only if it passes
 * - Each successful command bumps the version and returns a `Patch`
 *
 * ### 3. Higher-level operations
 * - `transform`: block type conversion as one command
 * - `actions`: insertion-menu entries, including the two-phase custom actions
 *
 * ## Module Structure
 *
 * - **`document`**: `Document`, `DocumentId` and the outline view
 * - **`commands`**: the `Cmd` enum and how each command rewrites the tree
 * - **`guard`**: structural checks run before every commit
 * - **`patch`**: edit result metadata including changed ranges and new selection
 * - **`transform`**: `BlockTransformer`
 * - **`actions`**: `InsertionActions` and the page-service collaborators
 *
 * ## Usage Pattern
 *
 * ```rust
 * use tessera_engine::blocks::BlockTypeRegistry;
 * use tessera_engine::editing::{Cmd, Document};
 *
 * let mut doc = Document::new(BlockTypeRegistry::standard());
 * let patch = doc
 *     .apply(Cmd::InsertText { at: 1, text: "Hello".to_string() })
 *     .unwrap();
 * assert_eq!(patch.version, 1);
 * assert_eq!(doc.root().children()[0].plain_text(), "Hello");
 * ```
 */

pub mod actions;
pub mod commands;
pub mod document;
pub mod guard;
pub mod patch;
pub mod transform;

pub use actions::{
    ActionTicket, EditorOpener, InsertOutcome, InsertionActions, LinkedPageService, PageRef,
    ServiceError,
};
pub use commands::Cmd;
pub use document::{Document, DocumentId, OutlineEntry};
pub use patch::Patch;
pub use transform::{BlockTransformer, TargetType, TransformOutcome};
