use chrono::prelude::*;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

/// User role enumeration for role-based access control (RBAC)
///
/// Stored in the database as the PostgreSQL ENUM type "user_role".
/// The `#[sqlx(type_name = "user_role", rename_all = "lowercase")]` attribute
/// converts variants to lowercase in the database (Admin -> "admin").
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin, // Full platform access, bypasses course completion checks
    User,  // Learner
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// User model representing the users table
///
/// - `password`: argon2 PHC hash, never the plain text
/// - `is_premium`: set when a subscription payment completes, or toggled by an admin
/// - `total_learning_time` is in minutes
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub language_preference: String,
    pub role: UserRole,
    pub is_premium: bool,
    pub total_learning_time: i32,
    pub courses_completed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "course_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Course model. Only published courses are visible on the public catalog.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub language: String,
    pub level: CourseLevel,
    pub duration: String,
    pub instructor: String,
    pub rating: f64,
    pub reviews_count: i32,
    pub is_published: bool,
    pub learning_objectives: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A module belongs to exactly one course; `order_num` is unique within the course.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub order_num: i32,
    pub duration: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "section_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Video,
    Exercise,
    Quiz,
}

/// A section belongs to exactly one module; `order_num` is unique within the module.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Section {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub content: String,
    pub duration: String,
    pub order_num: i32,
}

/// Ordered collection of courses
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct LearningPath {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub skill_level: String,
    pub overview: String,
    pub benefits: Option<serde_json::Value>,
}

/// One row per (user, course) pair, created lazily on the first progress update.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct UserCourseProgress {
    pub id: i64,
    pub user_id: Uuid,
    pub course_id: i64,
    pub progress_percentage: i32,
    pub completed: bool,
    pub last_accessed: DateTime<Utc>,
}

impl UserCourseProgress {
    /// A course counts as finished when it is flagged completed or fully progressed.
    pub fn is_finished(&self) -> bool {
        self.completed || self.progress_percentage >= 100
    }
}

/// Certificate issued once per (user, course) pair
///
/// `certificate_id` is the public display identifier (e.g. `CL-1A2B3C4D`).
/// It is a lookup key only: nothing binds it cryptographically to the content,
/// so verifying a certificate means finding it and reading `is_valid`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Certificate {
    pub id: i64,
    pub user_id: Uuid,
    pub course_id: i64,
    pub title: String,
    pub certificate_id: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

impl Certificate {
    /// Generate a display identifier: "CL-" followed by 8 upper-case hex characters.
    pub fn generate_display_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("CL-{}", hex[..8].to_uppercase())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "billing_cycle", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    /// Length of one subscription period
    pub fn period(&self) -> Duration {
        match self {
            BillingCycle::Monthly => Duration::days(30),
            BillingCycle::Annual => Duration::days(365),
        }
    }

    /// End of the validity window [start, end) of a subscription starting at `start`
    pub fn subscription_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.period()
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub billing_cycle: BillingCycle,
    pub features: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Supported payment channels: bank card and three mobile-money operators
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Orange,
    Airtel,
    Telma,
}

impl PaymentMethod {
    pub fn is_mobile(&self) -> bool {
        !matches!(self, PaymentMethod::Card)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: i64,
    pub user_id: Uuid,
    pub plan_id: Option<i64>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub request_id: Option<String>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// Subscription derived from a completed payment
///
/// Valid over [start_date, end_date). `auto_renew` is independent of `status`:
/// cancelling only clears `auto_renew`, access continues until `end_date`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Subscription {
    pub id: i64,
    pub user_id: Uuid,
    pub plan_id: Option<i64>,
    pub payment_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(percentage: i32, completed: bool) -> UserCourseProgress {
        UserCourseProgress {
            id: 1,
            user_id: Uuid::new_v4(),
            course_id: 1,
            progress_percentage: percentage,
            completed,
            last_accessed: Utc::now(),
        }
    }

    #[test]
    fn annual_plan_lasts_365_days() {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let end = BillingCycle::Annual.subscription_end(start);
        assert_eq!(end - start, Duration::days(365));
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn monthly_plan_lasts_30_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 8, 30, 0).unwrap();
        let end = BillingCycle::Monthly.subscription_end(start);
        assert_eq!(end - start, Duration::days(30));
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn progress_is_finished_when_completed_or_full() {
        assert!(progress(100, false).is_finished());
        assert!(progress(40, true).is_finished());
        assert!(!progress(99, false).is_finished());
        assert!(!progress(0, false).is_finished());
    }

    #[test]
    fn certificate_display_id_format() {
        let id = Certificate::generate_display_id();
        assert_eq!(id.len(), 11);
        assert!(id.starts_with("CL-"));
        assert!(
            id[3..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn certificate_display_ids_differ() {
        assert_ne!(
            Certificate::generate_display_id(),
            Certificate::generate_display_id()
        );
    }

    #[test]
    fn only_card_is_not_mobile() {
        assert!(!PaymentMethod::Card.is_mobile());
        assert!(PaymentMethod::Orange.is_mobile());
        assert!(PaymentMethod::Airtel.is_mobile());
        assert!(PaymentMethod::Telma.is_mobile());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Card);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&BillingCycle::Annual).unwrap(),
            "\"annual\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Active).unwrap(),
            "\"active\""
        );
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, UserRole::Admin);
    }
}
