//! Per-entity collections: filtered listing plus retrieve and, where the
//! entity allows it, create/update/delete.
//!
//! Every write takes the acting [`Actor`](crate::permissions::Actor)
//! explicitly and runs the matching predicate from
//! [`permissions`](crate::permissions) before touching the database.

pub mod article;
pub mod author;
pub mod category;

pub use article::{Article, ArticlePayload, Articles};
pub use author::{Author, Authors};
pub use category::{Category, CategoryPayload, Categories};

use crate::errors::FieldErrors;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const BLANK: &str = "This field may not be blank.";

/// Case-insensitive substring match.
///
/// Both sides get Unicode lowercasing; SQLite's `lower()` folds ASCII only.
/// The needle is plain text, `%` and `_` included.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep the rows whose text field contains `filter`; no filter keeps all.
pub(crate) fn retain_matching<T>(
    rows: &mut Vec<T>,
    filter: Option<&str>,
    field: impl Fn(&T) -> &str,
) {
    if let Some(needle) = filter {
        rows.retain(|row| contains_ci(field(row), needle));
    }
}

/// Trimmed text field check shared by the write payloads.
///
/// Records an error and returns `None` when the value is missing, blank or
/// longer than `max_chars`.
pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_chars} characters."),
        );
        return None;
    }
    Some(value.to_string())
}
