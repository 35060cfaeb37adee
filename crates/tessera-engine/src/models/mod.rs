pub mod node;
pub mod position;

pub use node::{Attrs, InlineRun, Mark, Node, NodeContent};
pub use position::ResolvedPos;
