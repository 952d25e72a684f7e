use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::models::enrollment::Enrollment;

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// The enrollment row for (student, course), whatever its status.
    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<Enrollment>>;
}

pub struct SqlxEnrollmentStore {
    pool: Arc<PgPool>,
}

impl SqlxEnrollmentStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for SqlxEnrollmentStore {
    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT id, student_id, course_id, status, enrolled_at FROM enrollments \
             WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(enrollment)
    }
}
