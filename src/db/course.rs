use super::DBClient;
use crate::dtos::{CourseFilter, CreateCourseDto, CreateModuleDto, CreateSectionDto, UpdateCourseDto};
use crate::models::{Course, Module, Section};

const COURSE_COLUMNS: &str = "id, title, description, language, level, duration, instructor, \
     rating, reviews_count, is_published, learning_objectives, created_at, updated_at";

// Filters are optional; a NULL parameter disables its predicate.
const CATALOG_FILTER: &str = r#"
    is_published = TRUE
    AND ($1::text IS NULL OR LOWER(language) = $1)
    AND ($2::text IS NULL OR level::text = $2)
    AND ($3::text IS NULL
         OR title ILIKE '%' || $3 || '%'
         OR description ILIKE '%' || $3 || '%')
"#;

pub trait CourseExt {
    /// Published courses matching the filter, newest first
    async fn get_courses(
        &self,
        filter: &CourseFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Course>, sqlx::Error>;

    async fn get_course_count(&self, filter: &CourseFilter) -> Result<i64, sqlx::Error>;

    /// Single course; with `published_only` drafts are treated as missing
    async fn get_course(
        &self,
        course_id: i64,
        published_only: bool,
    ) -> Result<Option<Course>, sqlx::Error>;

    async fn create_course(&self, course: &CreateCourseDto) -> Result<Course, sqlx::Error>;

    async fn update_course(
        &self,
        course_id: i64,
        course: &UpdateCourseDto,
    ) -> Result<Option<Course>, sqlx::Error>;

    async fn delete_course(&self, course_id: i64) -> Result<(), sqlx::Error>;

    /// Modules of a course ordered by `order_num`
    async fn get_modules(&self, course_id: i64) -> Result<Vec<Module>, sqlx::Error>;

    async fn get_module(
        &self,
        course_id: i64,
        module_id: i64,
    ) -> Result<Option<Module>, sqlx::Error>;

    async fn create_module(
        &self,
        course_id: i64,
        module: &CreateModuleDto,
    ) -> Result<Module, sqlx::Error>;

    /// Sections of the given modules ordered by module, then `order_num`
    async fn get_sections(&self, module_ids: &[i64]) -> Result<Vec<Section>, sqlx::Error>;

    async fn create_section(
        &self,
        module_id: i64,
        section: &CreateSectionDto,
    ) -> Result<Section, sqlx::Error>;
}

impl CourseExt for DBClient {
    async fn get_courses(
        &self,
        filter: &CourseFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Course>, sqlx::Error> {
        let offset = (page.max(1) - 1) * limit;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE {CATALOG_FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.language.as_deref())
        .bind(filter.level.as_deref())
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn get_course_count(&self, filter: &CourseFilter) -> Result<i64, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM courses WHERE {CATALOG_FILTER}"))
                .bind(filter.language.as_deref())
                .bind(filter.level.as_deref())
                .bind(filter.search.as_deref())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn get_course(
        &self,
        course_id: i64,
        published_only: bool,
    ) -> Result<Option<Course>, sqlx::Error> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND (is_published OR NOT $2)"
        ))
        .bind(course_id)
        .bind(published_only)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn create_course(&self, course: &CreateCourseDto) -> Result<Course, sqlx::Error> {
        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses
                (title, description, language, level, duration, instructor, is_published, learning_objectives)
            VALUES ($1, $2, $3, $4, COALESCE($5, ''), COALESCE($6, ''), COALESCE($7, FALSE), $8)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.language)
        .bind(course.level)
        .bind(course.duration.as_deref())
        .bind(course.instructor.as_deref())
        .bind(course.is_published)
        .bind(course.learning_objectives.as_ref())
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    async fn update_course(
        &self,
        course_id: i64,
        course: &UpdateCourseDto,
    ) -> Result<Option<Course>, sqlx::Error> {
        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                language = COALESCE($3, language),
                level = COALESCE($4, level),
                duration = COALESCE($5, duration),
                instructor = COALESCE($6, instructor),
                is_published = COALESCE($7, is_published),
                learning_objectives = COALESCE($8, learning_objectives),
                updated_at = NOW()
            WHERE id = $9
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(course.title.as_deref())
        .bind(course.description.as_deref())
        .bind(course.language.as_deref())
        .bind(course.level)
        .bind(course.duration.as_deref())
        .bind(course.instructor.as_deref())
        .bind(course.is_published)
        .bind(course.learning_objectives.as_ref())
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn delete_course(&self, course_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn get_modules(&self, course_id: i64) -> Result<Vec<Module>, sqlx::Error> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, course_id, title, description, order_num, duration
            FROM modules
            WHERE course_id = $1
            ORDER BY order_num
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    async fn get_module(
        &self,
        course_id: i64,
        module_id: i64,
    ) -> Result<Option<Module>, sqlx::Error> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, course_id, title, description, order_num, duration
            FROM modules
            WHERE id = $1 AND course_id = $2
            "#,
        )
        .bind(module_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn create_module(
        &self,
        course_id: i64,
        module: &CreateModuleDto,
    ) -> Result<Module, sqlx::Error> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (course_id, title, description, order_num, duration)
            VALUES ($1, $2, COALESCE($3, ''), $4, COALESCE($5, ''))
            RETURNING id, course_id, title, description, order_num, duration
            "#,
        )
        .bind(course_id)
        .bind(&module.title)
        .bind(module.description.as_deref())
        .bind(module.order_num)
        .bind(module.duration.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(module)
    }

    async fn get_sections(&self, module_ids: &[i64]) -> Result<Vec<Section>, sqlx::Error> {
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sections = sqlx::query_as::<_, Section>(
            r#"
            SELECT id, module_id, title, section_type, content, duration, order_num
            FROM sections
            WHERE module_id = ANY($1)
            ORDER BY module_id, order_num
            "#,
        )
        .bind(module_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    async fn create_section(
        &self,
        module_id: i64,
        section: &CreateSectionDto,
    ) -> Result<Section, sqlx::Error> {
        let section = sqlx::query_as::<_, Section>(
            r#"
            INSERT INTO sections (module_id, title, section_type, content, duration, order_num)
            VALUES ($1, $2, $3, COALESCE($4, ''), COALESCE($5, ''), $6)
            RETURNING id, module_id, title, section_type, content, duration, order_num
            "#,
        )
        .bind(module_id)
        .bind(&section.title)
        .bind(section.section_type)
        .bind(section.content.as_deref())
        .bind(section.duration.as_deref())
        .bind(section.order_num)
        .fetch_one(&self.pool)
        .await?;

        Ok(section)
    }
}
