use crate::models::{
    Course, CourseLevel, LearningPath, Module, PaymentMethod, Section, SectionType,
    Subscription, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// DTOs (Data Transfer Objects) define the structure of data exchanged with clients
// They are separate from database models to control exactly what data is exposed

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Registration request from client
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 150, message = "Username is required"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "confirmPassword", alias = "password_confirm")]
    pub password_confirm: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// ============================================================================
// Pagination & Query DTOs
// ============================================================================

/// Generic pagination query parameters
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PaginationDto {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        PaginationDto {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

// ============================================================================
// Generic responses
// ============================================================================

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// `{"status": "success", "data": ...}` envelope
#[derive(Debug, Serialize)]
pub struct DataResponseDto<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> DataResponseDto<T> {
    pub fn success(data: T) -> Self {
        DataResponseDto {
            status: "success",
            data,
        }
    }
}

// ============================================================================
// User DTOs
// ============================================================================

/// Filtered user data sent to clients (excludes the password hash)
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub language_preference: String,
    pub role: String,
    pub is_admin: bool,
    pub is_premium: bool,
    pub total_learning_time: i32,
    pub courses_completed: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            bio: user.bio.to_owned(),
            language_preference: user.language_preference.to_owned(),
            role: user.role.to_str().to_string(),
            is_admin: user.is_admin(),
            is_premium: user.is_premium,
            total_learning_time: user.total_learning_time,
            courses_completed: user.courses_completed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

/// Login and registration both hand back a bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 150, message = "Username cannot be empty"))]
    pub username: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    #[validate(length(min = 2, max = 10))]
    pub language_preference: Option<String>,
}

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DashboardStatsDto {
    pub users: i64,
    pub premium_users: i64,
    pub admins: i64,
    pub published_courses: i64,
    pub certificates: i64,
    pub active_subscriptions: i64,
    pub revenue: BigDecimal,
}

// ============================================================================
// Course DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CourseQueryParams {
    #[validate(length(min = 1))]
    pub language: Option<String>,

    #[validate(length(min = 1))]
    pub level: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub search: Option<String>,

    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,
}

/// Normalized catalog filter handed to the database layer
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CourseFilter {
    pub language: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
}

impl From<&CourseQueryParams> for CourseFilter {
    fn from(params: &CourseQueryParams) -> Self {
        let clean = |v: &Option<String>| {
            v.as_ref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
        };
        CourseFilter {
            language: clean(&params.language),
            level: clean(&params.level),
            search: clean(&params.search),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,

    #[validate(length(min = 1, max = 50, message = "Language is required."))]
    pub language: String,

    pub level: CourseLevel,

    #[validate(length(max = 50))]
    pub duration: Option<String>,

    #[validate(length(max = 255))]
    pub instructor: Option<String>,

    pub is_published: Option<bool>,

    pub learning_objectives: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,

    pub level: Option<CourseLevel>,

    #[validate(length(max = 50))]
    pub duration: Option<String>,

    #[validate(length(max = 255))]
    pub instructor: Option<String>,

    pub is_published: Option<bool>,

    pub learning_objectives: Option<serde_json::Value>,
}

/// Course card for list views (no timestamps or objectives)
#[derive(Debug, Serialize, Deserialize)]
pub struct CourseListItemDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub language: String,
    pub level: CourseLevel,
    pub duration: String,
    pub rating: f64,
    pub reviews_count: i32,
    pub is_published: bool,
}

impl From<&Course> for CourseListItemDto {
    fn from(course: &Course) -> Self {
        CourseListItemDto {
            id: course.id,
            title: course.title.clone(),
            description: course.description.clone(),
            language: course.language.clone(),
            level: course.level,
            duration: course.duration.clone(),
            rating: course.rating,
            reviews_count: course.reviews_count,
            is_published: course.is_published,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseListResponseDto {
    pub status: String,
    pub data: Vec<CourseListItemDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct ModuleWithSectionsDto {
    #[serde(flatten)]
    pub module: Module,
    pub sections: Vec<Section>,
}

/// Course with its modules and their sections, each level ordered by `order_num`
#[derive(Debug, Serialize)]
pub struct CourseDetailDto {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleWithSectionsDto>,
    pub modules_count: usize,
}

impl CourseDetailDto {
    /// Attach each section to its module. Sections whose module is not in
    /// `modules` are dropped; input order is preserved within each module.
    pub fn assemble(course: Course, modules: Vec<Module>, sections: Vec<Section>) -> Self {
        let mut modules: Vec<ModuleWithSectionsDto> = modules
            .into_iter()
            .map(|module| ModuleWithSectionsDto {
                module,
                sections: Vec::new(),
            })
            .collect();

        for section in sections {
            if let Some(entry) = modules
                .iter_mut()
                .find(|m| m.module.id == section.module_id)
            {
                entry.sections.push(section);
            }
        }

        let modules_count = modules.len();
        CourseDetailDto {
            course,
            modules,
            modules_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateModuleDto {
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "order_num must be positive"))]
    pub order_num: i32,

    #[validate(length(max = 50))]
    pub duration: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSectionDto {
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    #[serde(rename = "type", alias = "section_type")]
    pub section_type: SectionType,

    pub content: Option<String>,

    #[validate(length(max = 50))]
    pub duration: Option<String>,

    #[validate(range(min = 1, message = "order_num must be positive"))]
    pub order_num: i32,
}

// ============================================================================
// Progress DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateProgressDto {
    #[validate(range(
        min = 0,
        max = 100,
        message = "progress_percentage must be between 0 and 100"
    ))]
    pub progress_percentage: Option<i32>,

    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressDto {
    pub course_id: i64,
    pub progress_percentage: i32,
    pub completed: bool,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Progress row joined with its course, for "my courses" views
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProgressDto {
    pub id: i64,
    pub user_id: Uuid,
    pub course_id: i64,
    pub course_title: String,
    pub progress_percentage: i32,
    pub completed: bool,
    pub last_accessed: DateTime<Utc>,
}

// ============================================================================
// Learning path DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LearningPathSummaryDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub skill_level: String,
    pub courses_count: i64,
    pub total_duration: String,
}

#[derive(Debug, Serialize)]
pub struct LearningPathDetailDto {
    #[serde(flatten)]
    pub path: LearningPath,
    pub courses: Vec<CourseListItemDto>,
    pub courses_count: usize,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PathCourseProgressDto {
    pub course_id: i64,
    pub course_title: String,
    pub progress_percentage: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct PathProgressResponseDto {
    pub status: String,
    pub courses_progress: Vec<PathCourseProgressDto>,
    pub total_progress: i32,
}

// ============================================================================
// Certificate DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GenerateCertificateDto {
    #[validate(required(message = "Course ID is required"))]
    pub course_id: Option<i64>,

    /// Issue on behalf of another user (admins only)
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CertificateDto {
    pub id: i64,
    pub certificate_id: String,
    pub user_id: Uuid,
    pub course_id: i64,
    pub course_title: String,
    pub title: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

/// Row backing the public verification lookup
#[derive(Debug, sqlx::FromRow)]
pub struct CertificateVerificationRow {
    pub certificate_id: String,
    pub course_name: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub issue_date: DateTime<Utc>,
    pub is_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct CertificateVerificationDto {
    #[serde(rename = "certificateId")]
    pub certificate_id: String,
    #[serde(rename = "courseName")]
    pub course_name: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "issueDate")]
    pub issue_date: DateTime<Utc>,
}

impl From<CertificateVerificationRow> for CertificateVerificationDto {
    fn from(row: CertificateVerificationRow) -> Self {
        let full = format!("{} {}", row.first_name, row.last_name);
        let full = full.trim();
        let user_name = if full.is_empty() {
            row.username
        } else {
            full.to_string()
        };
        CertificateVerificationDto {
            certificate_id: row.certificate_id,
            course_name: row.course_name,
            user_name,
            issue_date: row.issue_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CertificateVerifyResponseDto {
    pub status: &'static str,
    pub message: String,
    pub data: CertificateVerificationDto,
}

// ============================================================================
// Payment DTOs
// ============================================================================

/// Payment request. Card payments need `card_number`, mobile-money payments
/// need `phone_number`. `request_id` makes retries of the same request safe.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
#[validate(schema(function = "validate_payment_details"))]
pub struct CreatePaymentDto {
    #[validate(required(message = "plan_id is required"))]
    pub plan_id: Option<i64>,

    #[validate(
        required(message = "amount is required"),
        custom(function = "validate_positive_amount")
    )]
    pub amount: Option<BigDecimal>,

    pub payment_method: Option<PaymentMethod>,

    pub card_number: Option<String>,

    pub phone_number: Option<String>,

    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub request_id: Option<String>,
}

impl CreatePaymentDto {
    pub fn method(&self) -> PaymentMethod {
        self.payment_method.unwrap_or_default()
    }
}

/// Amounts are stored as NUMERIC(10, 2)
const MAX_AMOUNT: u64 = 100_000_000;

fn validate_positive_amount(amount: &BigDecimal) -> Result<(), ValidationError> {
    if *amount <= BigDecimal::from(0) {
        return Err(ValidationError::new("amount_not_positive")
            .with_message("amount must be greater than 0".into()));
    }
    if *amount >= BigDecimal::from(MAX_AMOUNT) {
        return Err(ValidationError::new("amount_too_large")
            .with_message("amount must be less than 100000000".into()));
    }
    if amount.with_scale(2) != *amount {
        return Err(ValidationError::new("amount_scale")
            .with_message("amount must have at most 2 decimal places".into()));
    }
    Ok(())
}

fn validate_payment_details(dto: &CreatePaymentDto) -> Result<(), ValidationError> {
    if dto.method().is_mobile() {
        let has_phone = dto
            .phone_number
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if !has_phone {
            return Err(ValidationError::new("phone_number_required")
                .with_message("phone_number is required for mobile payments".into()));
        }
        return Ok(());
    }

    let digits = dto.card_number.as_deref().map(|c| {
        c.chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '-')
            .collect::<String>()
    });
    match digits {
        None => Err(ValidationError::new("card_number_required")
            .with_message("card_number is required for card payments".into())),
        Some(d) if (12..=19).contains(&d.len()) && d.chars().all(|c| c.is_ascii_digit()) => Ok(()),
        Some(_) => Err(ValidationError::new("card_number_invalid")
            .with_message("card_number is invalid".into())),
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResultDto {
    pub status: String,
    pub payment_id: i64,
    pub message: String,
    pub subscription: Option<Subscription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card_payment() -> CreatePaymentDto {
        CreatePaymentDto {
            plan_id: Some(1),
            amount: Some(BigDecimal::from(10)),
            card_number: Some("4242 4242 4242 4242".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn register_passwords_must_match() {
        let dto = RegisterUserDto {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            password_confirm: "secret2".to_string(),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn register_accepts_valid_input() {
        let dto: RegisterUserDto = serde_json::from_str(
            r#"{"username":"ada","email":"ada@example.com","password":"secret1","confirmPassword":"secret1"}"#,
        )
        .unwrap();
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn card_payment_is_valid() {
        assert!(card_payment().validate().is_ok());
    }

    #[test]
    fn payment_without_plan_is_rejected() {
        let dto = CreatePaymentDto {
            plan_id: None,
            ..card_payment()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("plan_id"));
    }

    #[test]
    fn payment_without_card_is_rejected() {
        let dto = CreatePaymentDto {
            card_number: None,
            ..card_payment()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn payment_with_malformed_card_is_rejected() {
        let dto = CreatePaymentDto {
            card_number: Some("1234".to_string()),
            ..card_payment()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn mobile_payment_needs_phone_not_card() {
        let mut dto = CreatePaymentDto {
            payment_method: Some(PaymentMethod::Orange),
            card_number: None,
            ..card_payment()
        };
        assert!(dto.validate().is_err());
        dto.phone_number = Some("+261 34 00 000 00".to_string());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let dto = CreatePaymentDto {
            amount: Some(BigDecimal::from(0)),
            ..card_payment()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn amount_beyond_column_range_is_rejected() {
        let dto = CreatePaymentDto {
            amount: Some(BigDecimal::from(1_000_000_000)),
            ..card_payment()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));

        let dto = CreatePaymentDto {
            amount: Some(BigDecimal::from(100_000_000)),
            ..card_payment()
        };
        assert!(dto.validate().is_err());

        let dto = CreatePaymentDto {
            amount: Some("99999999.99".parse().unwrap()),
            ..card_payment()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn sub_cent_amount_is_rejected() {
        let dto = CreatePaymentDto {
            amount: Some("0.001".parse().unwrap()),
            ..card_payment()
        };
        assert!(dto.validate().is_err());

        let dto = CreatePaymentDto {
            amount: Some("9.990".parse().unwrap()),
            ..card_payment()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn payment_amount_parses_from_json_number() {
        let dto: CreatePaymentDto = serde_json::from_str(
            r#"{"plan_id": 2, "amount": 99.99, "card_number": "4000000000000002"}"#,
        )
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.method(), PaymentMethod::Card);
    }

    #[test]
    fn progress_out_of_range_is_rejected() {
        let dto = UpdateProgressDto {
            progress_percentage: Some(150),
            completed: None,
        };
        assert!(dto.validate().is_err());
        let dto = UpdateProgressDto {
            progress_percentage: Some(100),
            completed: None,
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn certificate_request_needs_course() {
        let dto: GenerateCertificateDto = serde_json::from_str("{}").unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn course_filter_normalizes_input() {
        let params = CourseQueryParams {
            language: Some(" Python ".to_string()),
            level: Some("BEGINNER".to_string()),
            search: Some("   ".to_string()),
            page: None,
            limit: None,
        };
        let filter = CourseFilter::from(&params);
        assert_eq!(filter.language.as_deref(), Some("python"));
        assert_eq!(filter.level.as_deref(), Some("beginner"));
        assert_eq!(filter.search, None);
    }

    #[test]
    fn pagination_rounds_pages_up() {
        assert_eq!(PaginationDto::new(1, 10, 0).total_pages, 0);
        assert_eq!(PaginationDto::new(1, 10, 10).total_pages, 1);
        assert_eq!(PaginationDto::new(1, 10, 11).total_pages, 2);
    }

    #[test]
    fn course_detail_groups_sections_under_modules() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let course = Course {
            id: 7,
            title: "Rust".to_string(),
            description: "Systems".to_string(),
            language: "rust".to_string(),
            level: CourseLevel::Beginner,
            duration: "8h".to_string(),
            instructor: "Ferris".to_string(),
            rating: 4.5,
            reviews_count: 3,
            is_published: true,
            learning_objectives: None,
            created_at: now,
            updated_at: now,
        };
        let module = |id, order_num| Module {
            id,
            course_id: 7,
            title: format!("Module {}", order_num),
            description: String::new(),
            order_num,
            duration: String::new(),
        };
        let section = |id, module_id, order_num| Section {
            id,
            module_id,
            title: format!("Section {}", id),
            section_type: SectionType::Video,
            content: String::new(),
            duration: String::new(),
            order_num,
        };

        let detail = CourseDetailDto::assemble(
            course,
            vec![module(1, 1), module(2, 2)],
            vec![section(10, 1, 1), section(11, 2, 1), section(12, 1, 2), section(13, 99, 1)],
        );

        assert_eq!(detail.modules_count, 2);
        let first: Vec<i64> = detail.modules[0].sections.iter().map(|s| s.id).collect();
        let second: Vec<i64> = detail.modules[1].sections.iter().map(|s| s.id).collect();
        assert_eq!(first, vec![10, 12]);
        assert_eq!(second, vec![11]);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Rust");
        assert_eq!(json["modules_count"], 2);
        assert_eq!(json["modules"][0]["sections"][1]["type"], "video");
    }

    #[test]
    fn verification_falls_back_to_username() {
        let row = CertificateVerificationRow {
            certificate_id: "CL-ABCDEF12".to_string(),
            course_name: "Rust".to_string(),
            username: "ada".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            issue_date: Utc::now(),
            is_valid: true,
        };
        assert_eq!(CertificateVerificationDto::from(row).user_name, "ada");
    }
}
