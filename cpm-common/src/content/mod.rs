//! Course content: chapter catalog, sections and derived course state
//!
//! The catalog ([`CourseCatalog`]) is admin-controlled configuration holding
//! chapter identity, titles, icon and required tier in display order. Section
//! content and the plain-text search index live in a [`ContentLibrary`] keyed by
//! chapter ID, loaded from `content.json` or taken from the built-in course.

pub mod builtin;
pub mod completion;
pub mod navigation;
pub mod search;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::icons::IconName;
use crate::{Error, Result, Tier};

pub use completion::{
    compute_completed_chapters, is_chapter_complete, progress_percentage, CompletionRequirements,
    FormAnswers, FormValue,
};
pub use navigation::{next_chapter, next_step, select_chapter, NextReason, NextStep, Selection};
pub use search::{search, SearchIndex, SearchResult, MIN_QUERY_CHARS};

/// Author-assigned chapter identifier, stable across reorders
pub type ChapterId = u32;

/// Catalog entry for one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterConfig {
    pub id: ChapterId,
    pub title: String,
    pub short_title: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub icon: IconName,
}

/// Editable chapter attributes (everything except the ID)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDetails {
    pub title: String,
    pub short_title: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub icon: IconName,
}

impl ChapterDetails {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.short_title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Chapter title and short title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Quote,
    Objective,
    InteractiveChecklist,
    Exercise,
    Heading,
    VisualGuide,
    #[serde(alias = "custom_jsx")]
    Custom,
}

/// One block of static chapter content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSection {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconName>,
}

impl ChapterSection {
    /// All human-readable text in the section, space separated
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(title.clone());
        }
        collect_text(&self.content, &mut parts);
        parts.join(" ")
    }
}

fn collect_text(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        serde_json::Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "id" | "name" | "type" | "icon"))
            .for_each(|(_, v)| collect_text(v, out)),
        _ => {}
    }
}

/// A catalog entry joined with its sections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    #[serde(flatten)]
    pub config: ChapterConfig,
    pub sections: Vec<ChapterSection>,
}

/// Chapters in display order with unique IDs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChapterConfig>", into = "Vec<ChapterConfig>")]
pub struct CourseCatalog {
    chapters: Vec<ChapterConfig>,
}

impl CourseCatalog {
    pub fn new(chapters: Vec<ChapterConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for chapter in &chapters {
            if !seen.insert(chapter.id) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate chapter id {}",
                    chapter.id
                )));
            }
        }
        Ok(Self { chapters })
    }

    pub fn chapters(&self) -> &[ChapterConfig] {
        &self.chapters
    }

    pub fn get(&self, id: ChapterId) -> Option<&ChapterConfig> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Append a chapter; its ID is one past the current maximum (0 when empty)
    pub fn add_chapter(&mut self, details: ChapterDetails) -> Result<ChapterId> {
        details.validate()?;
        let id = match self.chapters.iter().map(|c| c.id).max() {
            None => 0,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                Error::InvalidInput(format!("No chapter id left after {}", max))
            })?,
        };
        self.chapters.push(ChapterConfig {
            id,
            title: details.title,
            short_title: details.short_title,
            tier: details.tier,
            icon: details.icon,
        });
        info!(chapter_id = id, "Chapter added");
        Ok(id)
    }

    pub fn update_chapter(&mut self, id: ChapterId, details: ChapterDetails) -> Result<()> {
        details.validate()?;
        let chapter = self
            .chapters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("Chapter {}", id)))?;
        chapter.title = details.title;
        chapter.short_title = details.short_title;
        chapter.tier = details.tier;
        chapter.icon = details.icon;
        Ok(())
    }

    /// Rearrange display order; `order` must be a permutation of the current IDs
    pub fn reorder(&mut self, order: &[ChapterId]) -> Result<()> {
        if order.len() != self.chapters.len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} chapter ids, got {}",
                self.chapters.len(),
                order.len()
            )));
        }

        let mut remaining: HashMap<ChapterId, ChapterConfig> =
            self.chapters.iter().cloned().map(|c| (c.id, c)).collect();
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            let chapter = remaining.remove(id).ok_or_else(|| {
                Error::InvalidInput(format!("Unknown or repeated chapter id {}", id))
            })?;
            reordered.push(chapter);
        }

        self.chapters = reordered;
        Ok(())
    }
}

impl TryFrom<Vec<ChapterConfig>> for CourseCatalog {
    type Error = Error;

    fn try_from(chapters: Vec<ChapterConfig>) -> Result<Self> {
        CourseCatalog::new(chapters)
    }
}

impl From<CourseCatalog> for Vec<ChapterConfig> {
    fn from(catalog: CourseCatalog) -> Self {
        catalog.chapters
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        builtin::default_catalog()
    }
}

/// On-disk shape of `content.json`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentFile {
    #[serde(default)]
    sections: HashMap<ChapterId, Vec<ChapterSection>>,
    #[serde(default)]
    search_text: HashMap<ChapterId, String>,
}

/// Static chapter sections plus the derived plain-text search index
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    sections: HashMap<ChapterId, Vec<ChapterSection>>,
    index: SearchIndex,
}

impl ContentLibrary {
    /// Build a library; chapters without explicit search text are indexed from their sections
    pub fn new(
        sections: HashMap<ChapterId, Vec<ChapterSection>>,
        search_text: HashMap<ChapterId, String>,
    ) -> Self {
        let mut index = SearchIndex::default();
        for (id, chapter_sections) in &sections {
            let text = chapter_sections
                .iter()
                .map(ChapterSection::plain_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            index.insert(*id, text);
        }
        for (id, text) in search_text {
            index.insert(id, text);
        }
        Self { sections, index }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: ContentFile = serde_json::from_str(&raw)?;
        Ok(Self::new(file.sections, file.search_text))
    }

    /// Load `content.json` when present, otherwise use the built-in course
    pub fn load_or_builtin(path: &Path) -> Self {
        if !path.exists() {
            info!("No content file at {}, using built-in content", path.display());
            return builtin::default_library();
        }
        match Self::load(path) {
            Ok(library) => {
                info!(
                    chapters = library.sections.len(),
                    "Loaded content from {}",
                    path.display()
                );
                library
            }
            Err(e) => {
                warn!("Failed to load {}: {}; using built-in content", path.display(), e);
                builtin::default_library()
            }
        }
    }

    pub fn sections(&self, id: ChapterId) -> &[ChapterSection] {
        self.sections.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn chapter(&self, config: &ChapterConfig) -> Chapter {
        Chapter {
            config: config.clone(),
            sections: self.sections(config.id).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(title: &str) -> ChapterDetails {
        ChapterDetails {
            title: title.to_string(),
            short_title: title.to_string(),
            tier: Tier::Essential,
            icon: IconName::Rocket,
        }
    }

    #[test]
    fn test_add_chapter_uses_max_id_plus_one() {
        let mut catalog = CourseCatalog::new(vec![]).unwrap();
        assert_eq!(catalog.add_chapter(details("First")).unwrap(), 0);

        let mut catalog = CourseCatalog::default();
        catalog.reorder(&[11, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        let id = catalog.add_chapter(details("Bonus")).unwrap();
        assert_eq!(id, 12);
        assert_eq!(catalog.chapters().last().map(|c| c.id), Some(12));
    }

    #[test]
    fn test_add_chapter_after_max_id_is_rejected() {
        let json = format!(
            r#"[{{"id": {}, "title": "Last", "shortTitle": "Last", "tier": "Free", "icon": "Rocket"}}]"#,
            u32::MAX
        );
        let mut catalog: CourseCatalog = serde_json::from_str(&json).unwrap();
        let err = catalog.add_chapter(details("Overflow")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_add_chapter_rejects_blank_title() {
        let mut catalog = CourseCatalog::default();
        assert!(catalog.add_chapter(details("  ")).is_err());
        assert_eq!(catalog.len(), 12);
    }

    #[test]
    fn test_update_unknown_chapter_is_not_found() {
        let mut catalog = CourseCatalog::default();
        let err = catalog.update_chapter(99, details("Nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_update_keeps_id_and_position() {
        let mut catalog = CourseCatalog::default();
        catalog.update_chapter(4, details("Renamed")).unwrap();
        let chapter = &catalog.chapters()[4];
        assert_eq!(chapter.id, 4);
        assert_eq!(chapter.title, "Renamed");
        assert_eq!(chapter.tier, Tier::Essential);
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut catalog = CourseCatalog::new(vec![
            builtin::default_catalog().chapters()[0].clone(),
            builtin::default_catalog().chapters()[1].clone(),
        ])
        .unwrap();

        assert!(catalog.reorder(&[0]).is_err());
        assert!(catalog.reorder(&[0, 0]).is_err());
        assert!(catalog.reorder(&[0, 7]).is_err());

        catalog.reorder(&[1, 0]).unwrap();
        let ids: Vec<_> = catalog.chapters().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_duplicate_ids_rejected_on_deserialize() {
        let json = r#"[
            {"id": 1, "title": "A", "shortTitle": "A", "tier": "Free", "icon": "Target"},
            {"id": 1, "title": "B", "shortTitle": "B", "tier": "Free", "icon": "Target"}
        ]"#;
        assert!(serde_json::from_str::<CourseCatalog>(json).is_err());
    }

    #[test]
    fn test_section_plain_text_skips_identifiers() {
        let section: ChapterSection = serde_json::from_value(serde_json::json!({
            "type": "interactive_checklist",
            "title": "Checklist",
            "content": [
                {"id": "c1_task_done", "text": "Escolha uma tarefa"},
                {"id": "c1_mvp", "text": "Crie um MVP", "subText": "versão mínima"}
            ]
        }))
        .unwrap();
        let text = section.plain_text();
        assert!(text.contains("Escolha uma tarefa"));
        assert!(text.contains("versão mínima"));
        assert!(!text.contains("c1_task_done"));
    }

    #[test]
    fn test_library_prefers_explicit_search_text() {
        let mut sections = HashMap::new();
        sections.insert(
            0,
            vec![ChapterSection {
                kind: SectionKind::Quote,
                title: None,
                content: serde_json::json!("derived text"),
                icon: None,
            }],
        );
        sections.insert(
            1,
            vec![ChapterSection {
                kind: SectionKind::Heading,
                title: Some("Heading".to_string()),
                content: serde_json::Value::Null,
                icon: None,
            }],
        );
        let mut search_text = HashMap::new();
        search_text.insert(0, "explicit text".to_string());

        let library = ContentLibrary::new(sections, search_text);
        assert_eq!(library.search_index().text_for(0), "explicit text");
        assert_eq!(library.search_index().text_for(1), "Heading");
        assert_eq!(library.search_index().text_for(5), "");
        assert!(library.sections(5).is_empty());
    }

    #[test]
    fn test_load_or_builtin_falls_back_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(&path, "{not json").unwrap();
        let library = ContentLibrary::load_or_builtin(&path);
        assert!(!library.sections(0).is_empty());
    }
}
