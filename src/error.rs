use thiserror::Error;

/// The only failure the structural parser reports; everything else is left
/// for the validator to surface as diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("script has no DEFINE header")]
    MissingHeader,
}
