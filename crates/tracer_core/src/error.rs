//! Error types for scene-build failures. Traversal-time problems
//! (degenerate geometry, stack saturation) are recovered locally per
//! spec — they are not represented as `Result` errors, only as counters
//! in `stats`.

use thiserror::Error;

/// Failures `Assembly::finalize` can report. Everything here is a build-
/// time structural problem; nothing at render time returns `Result`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate instance name `{0}`")]
    DuplicateInstanceName(String),

    #[error("instance `{instance}` references unknown shader `{shader}`")]
    UnknownShader { instance: String, shader: String },

    #[error("instance `{0}` references a sub-assembly that has not been finalized")]
    UnfinalizedSubAssembly(String),

    #[error("instance `{0}` references an object or assembly index out of range")]
    DanglingReference(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = BuildError::DuplicateInstanceName("foo".into());
        assert!(err.to_string().contains("foo"));

        let err = BuildError::UnknownShader {
            instance: "bar".into(),
            shader: "missing_shader".into(),
        };
        assert!(err.to_string().contains("missing_shader"));
    }
}
