use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::models::course::{Course, CourseContent, CourseModule, Lesson, ModuleContent};

/// Read access to a course and its module tree, as needed for authorization
/// decisions. Behind a trait so the media authorizer can be exercised against
/// in-memory content in tests.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_course_content(&self, course_id: &str)
        -> anyhow::Result<Option<CourseContent>>;
}

pub struct SqlxCourseStore {
    pool: Arc<PgPool>,
}

impl SqlxCourseStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseStore for SqlxCourseStore {
    async fn find_course_content(
        &self,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseContent>> {
        let course = sqlx::query_as::<_, Course>("SELECT id, title FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        let Some(course) = course else {
            return Ok(None);
        };

        let modules = sqlx::query_as::<_, CourseModule>(
            "SELECT id, course_id, title, position FROM course_modules \
             WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT l.id, l.module_id, l.title, l.video_url, l.is_free_preview, l.position \
             FROM lessons l \
             JOIN course_modules m ON m.id = l.module_id \
             WHERE m.course_id = $1 ORDER BY l.position",
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let modules = modules
            .into_iter()
            .map(|module| {
                let lessons = lessons
                    .iter()
                    .filter(|lesson| lesson.module_id == module.id)
                    .cloned()
                    .collect();
                ModuleContent { module, lessons }
            })
            .collect();

        Ok(Some(CourseContent { course, modules }))
    }
}
