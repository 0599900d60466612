//! Chapters, progress, search, form answers and favorites

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cpm_common::content::{
    next_step, search, select_chapter, Chapter, ChapterConfig, ChapterId, FormAnswers, FormValue,
    NextReason, SearchResult, Selection,
};
use cpm_common::events::CpmEvent;
use cpm_common::has_access;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identity::Identity;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterListItem {
    #[serde(flatten)]
    pub config: ChapterConfig,
    pub locked: bool,
    pub completed: bool,
    pub favorite: bool,
}

/// GET /api/chapters
///
/// Every chapter in display order; locked ones are listed but flagged.
pub async fn list_chapters(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<ChapterListItem>>> {
    let session = state.session(&identity).await?;
    let course = state.course.read().await;
    let ws = session.read().await;
    let completed = ws.completed_chapters(&course.catalog, &state.requirements);

    let items = course
        .catalog
        .chapters()
        .iter()
        .map(|c| ChapterListItem {
            config: c.clone(),
            locked: !has_access(ws.tier(), c.tier),
            completed: completed.contains(&c.id),
            favorite: ws.favorites().contains(&c.id),
        })
        .collect();
    Ok(Json(items))
}

/// GET /api/chapters/:id
///
/// Locked chapters answer with `TIER_REQUIRED` and never include sections.
pub async fn get_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<ChapterId>,
) -> ApiResult<Json<Chapter>> {
    let session = state.session(&identity).await?;
    let tier = session.read().await.tier();
    let course = state.course.read().await;

    match select_chapter(course.catalog.chapters(), id, tier)? {
        Selection::Open(config) => Ok(Json(state.content.chapter(config))),
        Selection::Locked { required_tier, .. } => {
            debug!(chapter_id = id, %required_tier, "Locked chapter requested");
            Err(ApiError::TierRequired {
                required: required_tier,
            })
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub completed_chapters: Vec<ChapterId>,
    pub completed_count: usize,
    pub total_chapters: usize,
    pub percentage: u8,
}

/// GET /api/progress
pub async fn get_progress(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ProgressView>> {
    let session = state.session(&identity).await?;
    let course = state.course.read().await;
    let ws = session.read().await;
    let completed = ws.completed_chapters(&course.catalog, &state.requirements);

    Ok(Json(ProgressView {
        completed_count: completed.len(),
        total_chapters: course.catalog.len(),
        percentage: ws.progress(&course.catalog, &state.requirements),
        completed_chapters: completed.into_iter().collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChapterView {
    pub chapter: ChapterConfig,
    pub reason: NextReason,
}

/// GET /api/next-chapter
pub async fn get_next_chapter(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<NextChapterView>> {
    let session = state.session(&identity).await?;
    let course = state.course.read().await;
    let ws = session.read().await;
    let completed = ws.completed_chapters(&course.catalog, &state.requirements);

    let step = next_step(course.catalog.chapters(), &completed, ws.tier())
        .ok_or_else(|| ApiError::NotFound("The course has no chapters".to_string()))?;
    Ok(Json(NextChapterView {
        chapter: step.chapter.clone(),
        reason: step.reason,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search?q=
///
/// Queries shorter than three characters return no results.
pub async fn search_content(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let session = state.session(&identity).await?;
    let tier = session.read().await.tier();
    let course = state.course.read().await;

    let results = search(
        &query.q,
        course.catalog.chapters(),
        state.content.search_index(),
        tier,
    );
    debug!(query = %query.q, results = results.len(), "Search");
    Ok(Json(results))
}

/// GET /api/answers
pub async fn list_answers(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<FormAnswers>> {
    let session = state.session(&identity).await?;
    let answers = session.read().await.answers().clone();
    Ok(Json(answers))
}

#[derive(Debug, Deserialize)]
pub struct SetAnswerRequest {
    pub value: FormValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub completed_chapters: Vec<ChapterId>,
    pub newly_completed: Vec<ChapterId>,
}

/// PUT /api/answers/:key
///
/// Emits `ChapterCompleted` for each chapter the answer completes.
pub async fn set_answer(
    State(state): State<AppState>,
    identity: Identity,
    Path(key): Path<String>,
    Json(payload): Json<SetAnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let session = state.session(&identity).await?;
    let catalog = state.course.read().await.catalog.clone();
    let requirements = state.requirements.clone();

    let (before, after, user_id) = session
        .mutate(&state.persister, |ws| {
            let before = ws.completed_chapters(&catalog, &requirements);
            let record = ws.set_answer(&key, payload.value)?;
            let after = ws.completed_chapters(&catalog, &requirements);
            Ok(((before, after, ws.user_id().to_string()), Some(record)))
        })
        .await?;

    let newly_completed: Vec<ChapterId> = after.difference(&before).copied().collect();
    for chapter_id in &newly_completed {
        info!(user_id = %user_id, chapter_id, "Chapter completed");
        state.bus.emit_lossy(CpmEvent::ChapterCompleted {
            user_id: user_id.clone(),
            chapter_id: *chapter_id,
            timestamp: cpm_common::time::now(),
        });
    }

    Ok(Json(AnswerResponse {
        completed_chapters: after.into_iter().collect(),
        newly_completed,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub chapter_id: ChapterId,
    pub favorite: bool,
}

/// POST /api/favorites/:chapter_id
pub async fn toggle_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Path(chapter_id): Path<ChapterId>,
) -> ApiResult<Json<FavoriteResponse>> {
    let session = state.session(&identity).await?;
    if state.course.read().await.catalog.get(chapter_id).is_none() {
        return Err(ApiError::NotFound(format!("Chapter {}", chapter_id)));
    }

    let favorite = session
        .mutate(&state.persister, |ws| {
            let (favorite, key) = ws.toggle_favorite(chapter_id);
            Ok((favorite, Some(key)))
        })
        .await?;
    Ok(Json(FavoriteResponse {
        chapter_id,
        favorite,
    }))
}
