//! Error types for the runtime.

use std::path::PathBuf;

use vela_ecs::EcsError;

/// Failures from the scene renderer adapter. All of them are non-fatal to the
/// frame loop.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No asset exists at the url.
    #[error("model '{url}' not found")]
    ModelNotFound { url: String },

    /// The asset exists but its contents are unusable.
    #[error("model '{url}' could not be parsed: {reason}")]
    ModelParse { url: String, reason: String },

    /// Reading the asset failed.
    #[error("failed to read model '{url}': {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The load was superseded or its entity was removed before completion.
    #[error("load of model '{url}' was cancelled")]
    Cancelled { url: String },
}

/// Failures loading a scene description or project.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The project has no scene file.
    #[error("scene file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read scene file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scene description: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors returned by [`Game3D`](crate::game::Game3D).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The game was disposed; it cannot be restarted or repopulated.
    #[error("game has been disposed")]
    Disposed,

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_parse_error_converts_into_engine_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EngineError = SceneError::from(parse).into();
        assert!(matches!(err, EngineError::Scene(SceneError::Parse(_))));
    }

    #[test]
    fn messages_name_the_asset() {
        let err = RenderError::ModelNotFound {
            url: "models/tree.glb".into(),
        };
        assert!(err.to_string().contains("models/tree.glb"));
    }
}
