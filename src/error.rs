//! Error types.

use alloc::string::String;

/// Errors raised while wrapping host data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// The host reported a layer kind tag this crate does not know.
    #[error("unknown layer kind {0:?}")]
    UnknownLayerKind(String),
}

/// The document's color format cannot be exchanged with the pipeline.
///
/// `Display` gives the diagnostic shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Incompatible document: Color {attribute} must be {required} (current {attribute}: {actual})")]
pub struct IncompatibleColorMode {
    /// `"model"` or `"depth"`.
    pub attribute: &'static str,
    /// Human-readable requirement, e.g. `"RGB/Alpha"`.
    pub required: &'static str,
    /// What the host reported.
    pub actual: String,
}
