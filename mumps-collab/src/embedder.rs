use mumps_base::Result;

/// Produces semantic vectors for SIMSEARCH. Any error, or the no-op
/// `DisabledEmbedder`, causes the executor to degrade to empty results
/// rather than fail the command.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32;
}

/// Wired in by default. `embed` always errors so callers take the
/// "collaborator unavailable" path rather than silently returning a zero
/// vector that would compare as falsely similar to everything.
pub struct DisabledEmbedder;

impl Embedder for DisabledEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(mumps_base::err_kind(
            mumps_base::Kind::CollaboratorUnavailable,
            "embedding collaborator is disabled",
        ))
    }

    fn similarity(&self, _a: &[f32], _b: &[f32]) -> f32 {
        0.0
    }
}
