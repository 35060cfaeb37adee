pub mod blocks;
pub mod drag;
pub mod editing;
pub mod error;
pub mod io;
pub mod locate;
pub mod markdown;
pub mod models;
pub mod page;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use blocks::{BlockType, BlockTypeRegistry};
pub use drag::{ActiveDrag, BLOCK_DRAG_MIME, DragPayload, DragSessions, DropData, relocate};
pub use editing::{
    BlockTransformer, Cmd, Document, DocumentId, InsertOutcome, InsertionActions, Patch,
    TargetType, TransformOutcome,
};
pub use error::EditorError;
pub use io::{FileStore, IoError, SaveRequests};
pub use locate::{BlockLocator, Located, LocatorConfig, Point, VisualTree};
pub use models::{Node, NodeContent, ResolvedPos};
pub use page::{MAX_NESTING_DEPTH, PageContainerModel, ResolvedBlock};
