use crate::config::ModelSpec;

use super::PipelineError;

/// Picks the model a request runs against.
///
/// An explicit non-empty name must be configured; otherwise the first
/// configured model is the default.
pub fn resolve_model<'a>(
    requested: Option<&str>,
    models: &'a [ModelSpec],
) -> Result<&'a ModelSpec, PipelineError> {
    let found = match requested.filter(|name| !name.is_empty()) {
        Some(name) => models.iter().find(|m| m.name == name),
        None => models.first(),
    };

    found.ok_or_else(|| {
        let valid: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        PipelineError::param(format!("model must be one of: {:?}", valid))
    })
}
