//! Plain-text chapter search
//!
//! Each chapter is searched as `title + " " + indexed text`. Only the first
//! case-insensitive match per chapter is reported, with up to 40 characters of
//! context on each side and `...` where the context was cut. Locked chapters
//! stay searchable; results carry an `is_locked` flag instead of being dropped.

use serde::Serialize;
use std::collections::HashMap;

use super::{ChapterConfig, ChapterId};
use crate::{has_access, Tier};

/// Queries shorter than this (after trimming) return no results
pub const MIN_QUERY_CHARS: usize = 3;

const CONTEXT_CHARS: usize = 40;
const ELLIPSIS: &str = "...";

/// Per-chapter plain text to search
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    text: HashMap<ChapterId, String>,
}

impl SearchIndex {
    pub fn insert(&mut self, id: ChapterId, text: String) {
        self.text.insert(id, text);
    }

    pub fn text_for(&self, id: ChapterId) -> &str {
        self.text.get(&id).map(String::as_str).unwrap_or("")
    }
}

impl FromIterator<(ChapterId, String)> for SearchIndex {
    fn from_iter<I: IntoIterator<Item = (ChapterId, String)>>(iter: I) -> Self {
        Self {
            text: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub chapter_id: ChapterId,
    /// The chapter's short title
    pub chapter_title: String,
    pub snippet: String,
    pub is_locked: bool,
}

/// Search chapters in display order
pub fn search(
    query: &str,
    chapters: &[ChapterConfig],
    index: &SearchIndex,
    user_tier: Tier,
) -> Vec<SearchResult> {
    let query = query.trim();
    let needle: Vec<char> = query.chars().map(fold_char).collect();
    if needle.len() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    chapters
        .iter()
        .filter_map(|chapter| {
            let haystack: Vec<char> = format!("{} {}", chapter.title, index.text_for(chapter.id))
                .chars()
                .collect();
            let pos = find_folded(&haystack, &needle)?;
            Some(SearchResult {
                chapter_id: chapter.id,
                chapter_title: chapter.short_title.clone(),
                snippet: snippet(&haystack, pos, needle.len()),
                is_locked: !has_access(user_tier, chapter.tier),
            })
        })
        .collect()
}

/// Single-char lowercase so positions in the folded text match the original
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn find_folded(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(h, n)| fold_char(*h) == *n)
    })
}

fn snippet(text: &[char], pos: usize, len: usize) -> String {
    let start = pos.saturating_sub(CONTEXT_CHARS);
    let end = (pos + len + CONTEXT_CHARS).min(text.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&text[start..end]);
    if end < text.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconName;

    fn chapter(id: ChapterId, title: &str, tier: Tier) -> ChapterConfig {
        ChapterConfig {
            id,
            title: title.to_string(),
            short_title: format!("Short {}", id),
            tier,
            icon: IconName::BookOpen,
        }
    }

    fn index(pairs: &[(ChapterId, &str)]) -> SearchIndex {
        pairs.iter().map(|(id, t)| (*id, t.to_string())).collect()
    }

    #[test]
    fn test_short_queries_return_nothing() {
        let chapters = vec![chapter(0, "Abacus", Tier::Free)];
        let idx = index(&[]);
        assert!(search("", &chapters, &idx, Tier::Free).is_empty());
        assert!(search("ab", &chapters, &idx, Tier::Free).is_empty());
        assert!(search("  ab  ", &chapters, &idx, Tier::Free).is_empty());
        assert_eq!(search(" aba ", &chapters, &idx, Tier::Free).len(), 1);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let chapters = vec![chapter(0, "Intro", Tier::Free)];
        let idx = index(&[(0, "some body text")]);
        assert!(search("xyz", &chapters, &idx, Tier::Free).is_empty());
    }

    #[test]
    fn test_match_at_start_has_no_leading_ellipsis() {
        let long_tail = "x".repeat(100);
        let chapters = vec![chapter(0, "Caos", Tier::Free)];
        let idx = index(&[(0, &long_tail)]);
        let results = search("caos", &chapters, &idx, Tier::Free);
        assert_eq!(results.len(), 1);
        assert!(results[0].snippet.starts_with("Caos"));
        assert!(results[0].snippet.ends_with(ELLIPSIS));
        // 4 matched chars + 40 context chars + ellipsis
        assert_eq!(results[0].snippet.chars().count(), 44 + 3);
    }

    #[test]
    fn test_match_near_end_has_no_trailing_ellipsis() {
        let head = "y".repeat(100);
        let chapters = vec![chapter(0, "T", Tier::Free)];
        let idx = index(&[(0, &format!("{} final words", head))]);
        let results = search("final", &chapters, &idx, Tier::Free);
        assert_eq!(results.len(), 1);
        assert!(results[0].snippet.starts_with(ELLIPSIS));
        assert!(results[0].snippet.ends_with("final words"));
    }

    #[test]
    fn test_case_insensitive_and_preserves_original_case() {
        let chapters = vec![chapter(0, "T", Tier::Free)];
        let idx = index(&[(0, "O Método MPC em Ação")]);
        let results = search("método mpc", &chapters, &idx, Tier::Free);
        assert_eq!(results.len(), 1);
        assert!(results[0].snippet.contains("Método MPC"));
    }

    #[test]
    fn test_title_is_searched_and_short_title_reported() {
        let chapters = vec![chapter(3, "Regra 80/20 na Prática", Tier::Free)];
        let results = search("80/20", &chapters, &index(&[]), Tier::Free);
        assert_eq!(results[0].chapter_id, 3);
        assert_eq!(results[0].chapter_title, "Short 3");
    }

    #[test]
    fn test_locked_chapters_are_flagged_not_hidden() {
        let chapters = vec![
            chapter(0, "Intro", Tier::Free),
            chapter(1, "Advanced", Tier::Complete),
        ];
        let idx = index(&[(0, "erro como feedback"), (1, "erro antifrágil")]);
        let results = search("erro", &chapters, &idx, Tier::Free);
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_locked);
        assert!(results[1].is_locked);
    }

    #[test]
    fn test_one_result_per_chapter_in_declared_order() {
        let chapters = vec![chapter(5, "B", Tier::Free), chapter(2, "A", Tier::Free)];
        let idx = index(&[(5, "foco foco foco"), (2, "foco")]);
        let results = search("foco", &chapters, &idx, Tier::Free);
        let ids: Vec<_> = results.iter().map(|r| r.chapter_id).collect();
        assert_eq!(ids, vec![5, 2]);
    }
}
