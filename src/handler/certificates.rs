use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Extension, Router, middleware};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::{CertificateExt, CourseExt, ProgressExt};
use crate::dtos::{
    CertificateVerificationDto, CertificateVerifyResponseDto, DataResponseDto,
    GenerateCertificateDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::{Certificate, User, UserCourseProgress, UserRole};

// Every route shares the `{id}` segment name: the display identifier for
// verification, the numeric id for admin operations.
pub fn certificates_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_certificates)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/generate",
            post(generate_certificate)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{id}/verify", get(verify_certificate))
        .route(
            "/{id}/validate",
            post(validate_certificate)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{id}/invalidate",
            post(invalidate_certificate)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Whose certificate is being requested. Only admins may act for someone else.
fn resolve_recipient(caller: &User, requested: Option<Uuid>) -> Result<Uuid, HttpError> {
    match requested {
        Some(user_id) if user_id != caller.id && !caller.is_admin() => Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        )),
        Some(user_id) => Ok(user_id),
        None => Ok(caller.id),
    }
}

/// A certificate requires a finished course. Admins skip the check.
fn check_eligibility(
    progress: Option<&UserCourseProgress>,
    bypass: bool,
) -> Result<(), HttpError> {
    if bypass {
        return Ok(());
    }
    match progress {
        None => Err(HttpError::bad_request(
            "No progress recorded for this course",
        )),
        Some(p) if !p.is_finished() => Err(HttpError::bad_request(
            "Course must be completed to obtain a certificate",
        )),
        Some(_) => Ok(()),
    }
}

/// Caller's certificates; admins see every certificate
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_certificates(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let certificates = if user.user.is_admin() {
        app_state.db_client.get_all_certificates().await
    } else {
        app_state.db_client.get_user_certificates(user.user.id).await
    }
    .map_err(|e| HttpError::from_db("getting certificates", e))?;

    Ok(Json(DataResponseDto::success(certificates)))
}

/// Issue a certificate for a completed course.
///
/// Returns 201 with a new certificate, or 200 with the one already issued.
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn generate_certificate(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<GenerateCertificateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid generate_certificate input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let course_id = body
        .course_id
        .ok_or_else(|| HttpError::bad_request("Course ID is required"))?;
    let recipient = resolve_recipient(&user.user, body.user_id)?;

    let course = app_state
        .db_client
        .get_course(course_id, false)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let progress = app_state
        .db_client
        .get_progress(recipient, course_id)
        .await
        .map_err(|e| HttpError::from_db("getting progress", e))?;

    check_eligibility(progress.as_ref(), user.user.is_admin()).inspect_err(|e| {
        tracing::error!(course_id, "Certificate refused: {}", e.message);
    })?;

    let (certificate, created) = app_state
        .db_client
        .issue_certificate(recipient, course_id, &course.title)
        .await
        .map_err(|e| HttpError::from_db("issuing certificate", e))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    tracing::info!(
        certificate_id = %certificate.certificate_id,
        created,
        "generate_certificate successful"
    );
    Ok((status, Json(DataResponseDto::success(certificate))))
}

/// Public verification by display identifier
#[instrument(skip(app_state))]
pub async fn verify_certificate(
    Path(certificate_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let row = app_state
        .db_client
        .get_certificate_verification(&certificate_id)
        .await
        .map_err(|e| HttpError::from_db("verifying certificate", e))?
        .ok_or_else(|| HttpError::not_found("Certificate not found"))?;

    if !row.is_valid {
        tracing::info!("Certificate is no longer valid");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "invalid",
                "message": "This certificate is no longer valid",
            })),
        )
            .into_response());
    }

    Ok(Json(CertificateVerifyResponseDto {
        status: "valid",
        message: "Certificate is valid".to_string(),
        data: CertificateVerificationDto::from(row),
    })
    .into_response())
}

async fn set_validity(
    app_state: &AppState,
    id: i64,
    is_valid: bool,
) -> Result<Json<DataResponseDto<Certificate>>, HttpError> {
    let certificate = app_state
        .db_client
        .set_certificate_validity(id, is_valid)
        .await
        .map_err(|e| HttpError::from_db("updating certificate validity", e))?
        .ok_or_else(|| HttpError::not_found("Certificate not found"))?;

    tracing::info!(certificate_id = %certificate.certificate_id, is_valid, "Certificate validity updated");
    Ok(Json(DataResponseDto::success(certificate)))
}

#[instrument(skip(app_state))]
pub async fn validate_certificate(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    set_validity(&app_state, id, true).await
}

#[instrument(skip(app_state))]
pub async fn invalidate_certificate(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    set_validity(&app_state, id, false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "learner".to_string(),
            email: "learner@example.com".to_string(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            language_preference: "fr".to_string(),
            role,
            is_premium: false,
            total_learning_time: 0,
            courses_completed: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

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
    fn learners_get_their_own_certificate() {
        let me = user(UserRole::User);
        assert_eq!(resolve_recipient(&me, None).unwrap(), me.id);
        assert_eq!(resolve_recipient(&me, Some(me.id)).unwrap(), me.id);
    }

    #[test]
    fn learners_cannot_request_for_others() {
        let me = user(UserRole::User);
        let err = resolve_recipient(&me, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn admins_can_request_for_others() {
        let admin = user(UserRole::Admin);
        let other = Uuid::new_v4();
        assert_eq!(resolve_recipient(&admin, Some(other)).unwrap(), other);
    }

    #[test]
    fn missing_progress_is_rejected() {
        let err = check_eligibility(None, false).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn incomplete_course_is_rejected() {
        let err = check_eligibility(Some(&progress(80, false)), false).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn finished_course_is_eligible() {
        assert!(check_eligibility(Some(&progress(100, false)), false).is_ok());
        assert!(check_eligibility(Some(&progress(30, true)), false).is_ok());
    }

    #[test]
    fn admins_bypass_progress() {
        assert!(check_eligibility(None, true).is_ok());
        assert!(check_eligibility(Some(&progress(0, false)), true).is_ok());
    }
}
