pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Domain failures that callers may want to match on. These travel inside `anyhow::Error` and
/// can be recovered with `downcast_ref::<LedgerError>()`.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum LedgerError {
    #[error("A {kind} template named '{name}' already exists")]
    DuplicateTemplate { kind: &'static str, name: String },

    #[error("Invalid {kind} template: {reason}")]
    InvalidTemplate { kind: &'static str, reason: String },

    #[error("There is no {kind} template at index {index} ({len} templates)")]
    TemplateIndex {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("There is no row {index} in {category} ({len} rows)")]
    EntryIndex {
        category: String,
        index: usize,
        len: usize,
    },

    #[error("The field '{field}' does not exist on {category} rows")]
    FieldNotApplicable { category: String, field: String },

    #[error("Unable to save '{key}': {reason}")]
    Save { key: String, reason: String },
}
