//! Best-effort matching of free text against subject titles.

use crate::core::types::Subject;

/// Index of the first subject whose title contains `text` or is contained in
/// it, compared case-insensitively.
///
/// Returns `None` for blank text, which would otherwise match every title.
pub fn match_subject(subjects: &[Subject], text: &str) -> Option<usize> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    subjects.iter().position(|subject| {
        let title = subject.title.to_lowercase();
        !title.is_empty() && (title.contains(&needle) || needle.contains(&title))
    })
}
