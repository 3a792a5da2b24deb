use super::DBClient;
use crate::dtos::{LearningPathSummaryDto, PathCourseProgressDto};
use crate::models::{Course, LearningPath};
use uuid::Uuid;

pub trait LearningPathExt {
    /// All paths with their course count and an estimated duration (8 hours per course)
    async fn get_learning_paths(&self) -> Result<Vec<LearningPathSummaryDto>, sqlx::Error>;

    async fn get_learning_path(&self, path_id: i64) -> Result<Option<LearningPath>, sqlx::Error>;

    /// Published courses of a path in path order
    async fn get_path_courses(&self, path_id: i64) -> Result<Vec<Course>, sqlx::Error>;

    /// Per-course progress of a user along a path. Courses never started
    /// report 0% and not completed.
    async fn get_path_progress(
        &self,
        path_id: i64,
        user_id: Uuid,
    ) -> Result<Vec<PathCourseProgressDto>, sqlx::Error>;
}

impl LearningPathExt for DBClient {
    async fn get_learning_paths(&self) -> Result<Vec<LearningPathSummaryDto>, sqlx::Error> {
        let paths = sqlx::query_as::<_, LearningPathSummaryDto>(
            r#"
            SELECT
                lp.id, lp.title, lp.description, lp.slug, lp.skill_level,
                COUNT(pc.id) AS courses_count,
                (COUNT(pc.id) * 8)::text || ' hours' AS total_duration
            FROM learning_paths lp
            LEFT JOIN path_courses pc ON pc.learning_path_id = lp.id
            GROUP BY lp.id
            ORDER BY lp.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(paths)
    }

    async fn get_learning_path(&self, path_id: i64) -> Result<Option<LearningPath>, sqlx::Error> {
        let path = sqlx::query_as::<_, LearningPath>(
            r#"
            SELECT id, title, description, slug, skill_level, overview, benefits
            FROM learning_paths
            WHERE id = $1
            "#,
        )
        .bind(path_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(path)
    }

    async fn get_path_courses(&self, path_id: i64) -> Result<Vec<Course>, sqlx::Error> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT c.id, c.title, c.description, c.language, c.level, c.duration, c.instructor,
                   c.rating, c.reviews_count, c.is_published, c.learning_objectives,
                   c.created_at, c.updated_at
            FROM path_courses pc
            JOIN courses c ON c.id = pc.course_id
            WHERE pc.learning_path_id = $1 AND c.is_published
            ORDER BY pc.position, pc.id
            "#,
        )
        .bind(path_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn get_path_progress(
        &self,
        path_id: i64,
        user_id: Uuid,
    ) -> Result<Vec<PathCourseProgressDto>, sqlx::Error> {
        let progress = sqlx::query_as::<_, PathCourseProgressDto>(
            r#"
            SELECT
                c.id AS course_id,
                c.title AS course_title,
                COALESCE(p.progress_percentage, 0) AS progress_percentage,
                COALESCE(p.completed, FALSE) AS completed
            FROM path_courses pc
            JOIN courses c ON c.id = pc.course_id
            LEFT JOIN user_course_progress p
                ON p.course_id = c.id AND p.user_id = $2
            WHERE pc.learning_path_id = $1 AND c.is_published
            ORDER BY pc.position, pc.id
            "#,
        )
        .bind(path_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(progress)
    }
}
