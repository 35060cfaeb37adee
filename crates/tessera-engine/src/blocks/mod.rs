//! # Block Types
//!
//! The block catalog and the registry that derives every capability index
//! from it.
//!
//! - **`types`**: `BlockType` and its parts (structural kind, capabilities,
//!   menu entries, content rules, insertion hooks)
//! - **`catalog`**: the built-in entries and the kind-name constants
//! - **`registry`**: `BlockTypeRegistry`, lookups and the derived `KindSet`s

pub mod catalog;
pub mod registry;
pub mod types;

pub use registry::{BlockTypeRegistry, KindSet};
pub use types::{
    BlockType, Capabilities, ContentRule, ConversionEntry, InsertAction, InsertionEntry,
    MenuCategory, StructuralKind,
};
