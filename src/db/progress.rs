use super::DBClient;
use crate::dtos::UserProgressDto;
use crate::models::UserCourseProgress;
use crate::utils::progress::apply_update;
use uuid::Uuid;

pub trait ProgressExt {
    async fn get_progress(
        &self,
        user_id: Uuid,
        course_id: i64,
    ) -> Result<Option<UserCourseProgress>, sqlx::Error>;

    /// Every progress row of a user, most recently accessed first
    async fn get_user_progress(&self, user_id: Uuid) -> Result<Vec<UserProgressDto>, sqlx::Error>;

    /// Create or update the (user, course) progress row.
    ///
    /// Returns the stored row and whether this update is the one that
    /// completed the course. On that transition `courses_completed` of the
    /// user is incremented in the same transaction.
    async fn upsert_progress(
        &self,
        user_id: Uuid,
        course_id: i64,
        percentage: Option<i32>,
        completed: Option<bool>,
    ) -> Result<(UserCourseProgress, bool), sqlx::Error>;
}

impl ProgressExt for DBClient {
    async fn get_progress(
        &self,
        user_id: Uuid,
        course_id: i64,
    ) -> Result<Option<UserCourseProgress>, sqlx::Error> {
        let progress = sqlx::query_as::<_, UserCourseProgress>(
            r#"
            SELECT id, user_id, course_id, progress_percentage, completed, last_accessed
            FROM user_course_progress
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    async fn get_user_progress(&self, user_id: Uuid) -> Result<Vec<UserProgressDto>, sqlx::Error> {
        let progress = sqlx::query_as::<_, UserProgressDto>(
            r#"
            SELECT p.id, p.user_id, p.course_id, c.title AS course_title,
                   p.progress_percentage, p.completed, p.last_accessed
            FROM user_course_progress p
            JOIN courses c ON c.id = p.course_id
            WHERE p.user_id = $1
            ORDER BY p.last_accessed DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(progress)
    }

    async fn upsert_progress(
        &self,
        user_id: Uuid,
        course_id: i64,
        percentage: Option<i32>,
        completed: Option<bool>,
    ) -> Result<(UserCourseProgress, bool), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Make sure the row exists so FOR UPDATE below always has something to lock.
        // A concurrent first update blocks here until the other transaction ends.
        sqlx::query(
            r#"
            INSERT INTO user_course_progress (user_id, course_id, progress_percentage, completed)
            VALUES ($1, $2, 0, FALSE)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        let previous: (i32, bool) = sqlx::query_as(
            r#"
            SELECT progress_percentage, completed
            FROM user_course_progress
            WHERE user_id = $1 AND course_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        let was_completed = previous.1;
        let (percentage, completed) = apply_update(Some(previous), percentage, completed);

        let progress = sqlx::query_as::<_, UserCourseProgress>(
            r#"
            UPDATE user_course_progress
            SET progress_percentage = $3, completed = $4, last_accessed = NOW()
            WHERE user_id = $1 AND course_id = $2
            RETURNING id, user_id, course_id, progress_percentage, completed, last_accessed
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(percentage)
        .bind(completed)
        .fetch_one(&mut *tx)
        .await?;

        let newly_completed = progress.completed && !was_completed;
        if newly_completed {
            sqlx::query(
                "UPDATE users SET courses_completed = courses_completed + 1, updated_at = NOW() WHERE id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((progress, newly_completed))
    }
}
