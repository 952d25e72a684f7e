//! Enrollment-aware media ticket issuance. A ticket is granted iff the lesson
//! is a free preview or the caller holds an ACTIVE enrollment in the lesson's
//! course. A ticket issued just before a concurrent drop commits stays valid
//! for its short TTL; the TTL bounds that window.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::AppError,
    middleware::AuthenticatedUser,
    models::course::Lesson,
    repositories::{CourseStore, EnrollmentStore},
    services::signer::{SignedUrlIssuer, StreamFormat},
};

/// Ephemeral playback grant. Computed per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTicket {
    pub url: String,
}

pub struct MediaAuthorizer {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    signer: Arc<dyn SignedUrlIssuer>,
    playback_ttl: Duration,
}

impl MediaAuthorizer {
    pub fn new(
        courses: Arc<dyn CourseStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        signer: Arc<dyn SignedUrlIssuer>,
        playback_ttl: Duration,
    ) -> Self {
        Self {
            courses,
            enrollments,
            signer,
            playback_ttl,
        }
    }

    /// Grants or denies playback and, on grant, returns a fresh signed URL.
    pub async fn issue_ticket(
        &self,
        course_id: &str,
        lesson_id: &str,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<VideoTicket, AppError> {
        let lesson = self.authorize(course_id, lesson_id, caller).await?;

        // authorize() already rejected video-less lessons.
        let video_url = lesson
            .video_url
            .as_deref()
            .ok_or_else(|| AppError::Validation("Lesson has no video content".to_string()))?;
        let media_id = extract_media_id(video_url)
            .map_err(|err| AppError::Internal(err.context("unparseable video reference")))?;

        let url = self
            .signer
            .sign_playback_url(&media_id, StreamFormat::Hls, self.playback_ttl)
            .await
            .map_err(AppError::Internal)?;

        tracing::debug!(course_id, lesson_id, "issued playback ticket");
        Ok(VideoTicket { url })
    }

    /// Same identity/enrollment check as ticket issuance, without the signing
    /// step, for callers that only need a yes/no answer.
    pub async fn authorize_key_access(
        &self,
        course_id: &str,
        lesson_id: &str,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<(), AppError> {
        self.authorize(course_id, lesson_id, caller).await?;
        Ok(())
    }

    /// Steps shared by both operations: locate the lesson, then apply the
    /// free-preview/enrollment policy. Denials stay coarse so a prober cannot
    /// map out course contents from error detail.
    async fn authorize(
        &self,
        course_id: &str,
        lesson_id: &str,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<Lesson, AppError> {
        let content = self
            .courses
            .find_course_content(course_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;

        let lesson = content
            .find_lesson(lesson_id)
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?
            .clone();

        if lesson.video_url.is_none() {
            return Err(AppError::Validation(
                "Lesson has no video content".to_string(),
            ));
        }

        if lesson.is_free_preview {
            return Ok(lesson);
        }

        let identity = caller.ok_or_else(|| {
            AppError::Authorization("Must be enrolled to view this content".to_string())
        })?;

        let enrollment = self
            .enrollments
            .find_enrollment(&identity.id, course_id)
            .await
            .map_err(AppError::Internal)?;

        match enrollment {
            Some(enrollment) if enrollment.status.grants_access() => Ok(lesson),
            // DROPPED is indistinguishable from never enrolled.
            _ => Err(AppError::Authorization(
                "Must be enrolled to view this content".to_string(),
            )),
        }
    }
}

/// Extracts the stable media identifier from a stored delivery URL: the path
/// with provider format/version prefixes and the filename extension removed.
pub fn extract_media_id(video_url: &str) -> anyhow::Result<String> {
    let parsed = url::Url::parse(video_url)
        .map_err(|e| anyhow::anyhow!("Invalid video reference {}: {}", video_url, e))?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default();

    let mut parts: Vec<&str> = segments
        .into_iter()
        .skip_while(|part| is_provider_prefix(part))
        .skip_while(|part| is_version_segment(part))
        .collect();

    // A trailing manifest file names a rendition, not the asset.
    if parts.len() > 1 && is_manifest_file(parts[parts.len() - 1]) {
        parts.pop();
    }

    let last = parts
        .pop()
        .ok_or_else(|| anyhow::anyhow!("Video reference has no asset path: {}", video_url))?;
    let stem = last.rsplit_once('.').map(|(stem, _ext)| stem).unwrap_or(last);
    if stem.is_empty() {
        anyhow::bail!("Video reference has no asset name: {}", video_url);
    }

    parts.push(stem);
    Ok(parts.join("/"))
}

fn is_provider_prefix(segment: &str) -> bool {
    matches!(segment, "video" | "videos" | "upload" | "stream")
}

fn is_manifest_file(segment: &str) -> bool {
    segment.ends_with(".m3u8") || segment.ends_with(".mpd")
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}
