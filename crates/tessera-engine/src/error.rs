/// Failures of the editing core.
///
/// Everything except [`EditorError::ActionFailed`] describes a benign race or a
/// request that simply has no effect; front ends log those and carry on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("unknown block type: {0}")]
    LookupMiss(String),

    #[error("no block resolves at position {pos}")]
    ResolutionFailure { pos: usize },

    #[error("position {pos} is not a valid target")]
    InvalidPosition { pos: usize },

    #[error("structural invariant violated: {0}")]
    InvariantViolation(String),

    #[error("cannot convert {from} to {to}")]
    ConversionUnsupported { from: String, to: String },

    #[error("action #{generation} was superseded by a newer gesture")]
    AsyncSuperseded { generation: u64 },

    #[error("block action failed: {0}")]
    ActionFailed(String),
}

impl EditorError {
    /// Whether the failure should be shown to the user rather than swallowed.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, EditorError::ActionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_action_failures_are_user_visible() {
        assert!(EditorError::ActionFailed("boom".into()).is_user_visible());
        assert!(!EditorError::ResolutionFailure { pos: 3 }.is_user_visible());
        assert!(!EditorError::AsyncSuperseded { generation: 1 }.is_user_visible());
        assert!(!EditorError::InvariantViolation("x".into()).is_user_visible());
    }
}
