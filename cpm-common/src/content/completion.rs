//! Chapter completion derived from form answers
//!
//! A chapter is complete when the user can access it, it declares at least one
//! required field key, and every required key holds the boolean `true`.
//! Strings and numbers never count, even `"true"`: completion fields are
//! checkboxes and any other stored type is treated as unanswered.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{ChapterConfig, ChapterId};
use crate::{has_access, Tier};

/// A stored answer to one form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FormValue {
    /// Exactly the boolean `true`
    pub fn is_checked(&self) -> bool {
        matches!(self, FormValue::Bool(true))
    }
}

/// Field key → answer for one user
pub type FormAnswers = HashMap<String, FormValue>;

/// Static chapter → required field keys table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionRequirements(HashMap<ChapterId, Vec<String>>);

impl CompletionRequirements {
    pub fn new(table: HashMap<ChapterId, Vec<String>>) -> Self {
        Self(table)
    }

    /// Required keys for a chapter; empty when none are declared
    pub fn for_chapter(&self, id: ChapterId) -> &[String] {
        self.0.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Whether every key in a non-empty requirement list is checked
pub fn is_chapter_complete(required: &[String], answers: &FormAnswers) -> bool {
    !required.is_empty()
        && required
            .iter()
            .all(|key| answers.get(key).is_some_and(FormValue::is_checked))
}

/// Completed chapter IDs among the chapters `user_tier` can access
pub fn compute_completed_chapters(
    chapters: &[ChapterConfig],
    requirements: &CompletionRequirements,
    answers: &FormAnswers,
    user_tier: Tier,
) -> BTreeSet<ChapterId> {
    chapters
        .iter()
        .filter(|c| has_access(user_tier, c.tier))
        .filter(|c| is_chapter_complete(requirements.for_chapter(c.id), answers))
        .map(|c| c.id)
        .collect()
}

/// `round(completed * 100 / total)`, 0 for an empty course
pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed.min(total) as f64 * 100.0 / total as f64).round();
    pct as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::builtin;
    use crate::icons::IconName;

    fn chapter(id: ChapterId, tier: Tier) -> ChapterConfig {
        ChapterConfig {
            id,
            title: format!("Chapter {}", id),
            short_title: format!("C{}", id),
            tier,
            icon: IconName::BookOpen,
        }
    }

    fn answers(pairs: &[(&str, FormValue)]) -> FormAnswers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn reqs(pairs: &[(ChapterId, &[&str])]) -> CompletionRequirements {
        CompletionRequirements::new(
            pairs
                .iter()
                .map(|(id, keys)| (*id, keys.iter().map(|k| k.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_chapter_without_requirements_never_completes() {
        let chapters = vec![chapter(0, Tier::Free)];
        let all_true = answers(&[("anything", FormValue::Bool(true))]);

        let done = compute_completed_chapters(
            &chapters,
            &CompletionRequirements::default(),
            &all_true,
            Tier::Complete,
        );
        assert!(done.is_empty());

        let done = compute_completed_chapters(&chapters, &reqs(&[(0, &[])]), &all_true, Tier::Complete);
        assert!(done.is_empty());
    }

    #[test]
    fn test_all_required_keys_must_be_true() {
        let chapters = vec![chapter(1, Tier::Free)];
        let table = reqs(&[(1, &["a", "b"])]);

        let partial = answers(&[("a", FormValue::Bool(true))]);
        assert!(compute_completed_chapters(&chapters, &table, &partial, Tier::Free).is_empty());

        let unchecked = answers(&[("a", FormValue::Bool(true)), ("b", FormValue::Bool(false))]);
        assert!(compute_completed_chapters(&chapters, &table, &unchecked, Tier::Free).is_empty());

        let full = answers(&[("a", FormValue::Bool(true)), ("b", FormValue::Bool(true))]);
        let done = compute_completed_chapters(&chapters, &table, &full, Tier::Free);
        assert_eq!(done.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_truthy_non_boolean_values_do_not_count() {
        let chapters = vec![chapter(1, Tier::Free)];
        let table = reqs(&[(1, &["a"])]);

        for value in [
            FormValue::Text("true".to_string()),
            FormValue::Text("on".to_string()),
            FormValue::Number(1.0),
        ] {
            let a = answers(&[("a", value.clone())]);
            assert!(
                compute_completed_chapters(&chapters, &table, &a, Tier::Free).is_empty(),
                "{:?} must not complete the chapter",
                value
            );
        }
    }

    #[test]
    fn test_locked_chapters_are_skipped() {
        let chapters = vec![chapter(0, Tier::Free), chapter(1, Tier::Essential)];
        let table = reqs(&[(1, &["q1"])]);
        let a = answers(&[("q1", FormValue::Bool(true))]);

        assert!(compute_completed_chapters(&chapters, &table, &a, Tier::Free).is_empty());
        let done = compute_completed_chapters(&chapters, &table, &a, Tier::Essential);
        assert!(done.contains(&1));
    }

    #[test]
    fn test_builtin_requirements_complete_first_chapter() {
        let catalog = builtin::default_catalog();
        let table = builtin::default_requirements();
        let a = answers(&[("c0_commitment", FormValue::Bool(true))]);
        let done = compute_completed_chapters(catalog.chapters(), &table, &a, Tier::Free);
        assert_eq!(done.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_form_value_untagged_serde() {
        let a: FormAnswers =
            serde_json::from_str(r#"{"x": true, "y": 3, "z": "true"}"#).unwrap();
        assert_eq!(a["x"], FormValue::Bool(true));
        assert_eq!(a["y"], FormValue::Number(3.0));
        assert_eq!(a["z"], FormValue::Text("true".to_string()));
        assert!(!a["z"].is_checked());
    }

    #[test]
    fn test_progress_percentage_rounds() {
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(0, 12), 0);
        assert_eq!(progress_percentage(1, 12), 8);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(12, 12), 100);
    }
}
