//! Next-chapter selection and chapter opening

use serde::Serialize;
use std::collections::BTreeSet;

use super::{ChapterConfig, ChapterId};
use crate::{has_access, Error, Result, Tier};

/// First accessible, incomplete chapter in display order
///
/// Falls back to the last chapter when nothing qualifies. Returns `None` only
/// for an empty catalog.
pub fn next_chapter<'a>(
    chapters: &'a [ChapterConfig],
    completed: &BTreeSet<ChapterId>,
    user_tier: Tier,
) -> Option<&'a ChapterConfig> {
    next_step(chapters, completed, user_tier).map(|step| step.chapter)
}

/// Why [`next_step`] picked its chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NextReason {
    /// An accessible chapter still has open requirements
    Incomplete,
    /// Every accessible chapter is complete; showing the last chapter
    AllComplete,
    /// No chapter is accessible at the user's tier; showing the last chapter
    NothingAccessible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep<'a> {
    pub chapter: &'a ChapterConfig,
    pub reason: NextReason,
}

/// [`next_chapter`] plus the reason for the choice
pub fn next_step<'a>(
    chapters: &'a [ChapterConfig],
    completed: &BTreeSet<ChapterId>,
    user_tier: Tier,
) -> Option<NextStep<'a>> {
    let mut any_accessible = false;
    for chapter in chapters {
        if !has_access(user_tier, chapter.tier) {
            continue;
        }
        any_accessible = true;
        if !completed.contains(&chapter.id) {
            return Some(NextStep {
                chapter,
                reason: NextReason::Incomplete,
            });
        }
    }

    let reason = if any_accessible {
        NextReason::AllComplete
    } else {
        NextReason::NothingAccessible
    };
    chapters.last().map(|chapter| NextStep { chapter, reason })
}

/// Outcome of opening a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Open(&'a ChapterConfig),
    /// The chapter exists but needs a higher tier; its content is withheld
    Locked {
        chapter: &'a ChapterConfig,
        required_tier: Tier,
    },
}

/// Open a chapter by ID, gating on tier
pub fn select_chapter(
    chapters: &[ChapterConfig],
    id: ChapterId,
    user_tier: Tier,
) -> Result<Selection<'_>> {
    let chapter = chapters
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| Error::NotFound(format!("Chapter {}", id)))?;

    if has_access(user_tier, chapter.tier) {
        Ok(Selection::Open(chapter))
    } else {
        Ok(Selection::Locked {
            chapter,
            required_tier: chapter.tier,
        })
    }
}
