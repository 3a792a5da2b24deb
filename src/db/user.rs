use super::DBClient;
use crate::dtos::{DashboardStatsDto, UpdateProfileDto};
use crate::models::{User, UserRole};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password, first_name, last_name, bio, \
     language_preference, role, is_premium, total_learning_time, courses_completed, \
     created_at, updated_at";

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, username or email
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Get paginated list of all users
    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    /// Get total count of all users
    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    /// Create new learner account
    async fn save_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, sqlx::Error>;

    /// Create an admin account unless the email or username is already taken.
    /// Returns true when a row was inserted.
    async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, sqlx::Error>;

    /// Partial profile update; absent fields are left untouched
    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &UpdateProfileDto,
    ) -> Result<User, sqlx::Error>;

    /// Flip the premium flag. None if the user does not exist.
    async fn toggle_user_premium(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    /// Update user's role (Admin or User). None if the user does not exist.
    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Counters for the admin dashboard
    async fn get_dashboard_stats(&self) -> Result<DashboardStatsDto, sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            // Emails are compared case-insensitively, as they are stored lowercased
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        // page 1 = offset 0, page 2 = offset limit, etc.
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn save_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password, first_name, last_name)
            VALUES ($1, LOWER($2), $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password, role, is_premium)
            VALUES ($1, LOWER($2), $3, 'admin', TRUE)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &UpdateProfileDto,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($1, username),
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                bio = COALESCE($4, bio),
                language_preference = COALESCE($5, language_preference),
                updated_at = NOW()
            WHERE id = $6
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(profile.username.as_deref())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.bio.as_deref())
        .bind(profile.language_preference.as_deref())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn toggle_user_premium(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_premium = NOT is_premium, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStatsDto, sqlx::Error> {
        let stats = sqlx::query_as::<_, DashboardStatsDto>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE is_premium) AS premium_users,
                (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admins,
                (SELECT COUNT(*) FROM courses WHERE is_published) AS published_courses,
                (SELECT COUNT(*) FROM certificates) AS certificates,
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'active') AS active_subscriptions,
                (SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'completed') AS revenue
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
