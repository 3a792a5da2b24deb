use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use tracing::instrument;

use crate::AppState;
use crate::db::LearningPathExt;
use crate::dtos::{
    CourseListItemDto, DataResponseDto, LearningPathDetailDto, PathProgressResponseDto,
};
use crate::error::HttpError;
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::utils::progress::average_progress;

pub fn learning_paths_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_learning_paths))
        .route("/{path_id}", get(get_learning_path))
        .route("/{path_id}/courses", get(get_path_courses))
        .route(
            "/{path_id}/progress",
            get(get_path_progress).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

#[instrument(skip(app_state))]
pub async fn get_learning_paths(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let paths = app_state
        .db_client
        .get_learning_paths()
        .await
        .map_err(|e| HttpError::from_db("getting learning paths", e))?;

    Ok(Json(DataResponseDto::success(paths)))
}

#[instrument(skip(app_state))]
pub async fn get_learning_path(
    Path(path_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let path = app_state
        .db_client
        .get_learning_path(path_id)
        .await
        .map_err(|e| HttpError::from_db("getting learning path", e))?
        .ok_or_else(|| HttpError::not_found("Learning path not found"))?;

    let courses = app_state
        .db_client
        .get_path_courses(path_id)
        .await
        .map_err(|e| HttpError::from_db("getting path courses", e))?;

    let courses: Vec<CourseListItemDto> = courses.iter().map(CourseListItemDto::from).collect();
    let courses_count = courses.len();

    Ok(Json(DataResponseDto::success(LearningPathDetailDto {
        path,
        courses,
        courses_count,
    })))
}

#[instrument(skip(app_state))]
pub async fn get_path_courses(
    Path(path_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_learning_path(path_id)
        .await
        .map_err(|e| HttpError::from_db("getting learning path", e))?
        .ok_or_else(|| HttpError::not_found("Learning path not found"))?;

    let courses = app_state
        .db_client
        .get_path_courses(path_id)
        .await
        .map_err(|e| HttpError::from_db("getting path courses", e))?;

    let courses: Vec<CourseListItemDto> = courses.iter().map(CourseListItemDto::from).collect();
    Ok(Json(DataResponseDto::success(courses)))
}

/// Caller's progress along a path; `total_progress` is the floored average
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_path_progress(
    Path(path_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_learning_path(path_id)
        .await
        .map_err(|e| HttpError::from_db("getting learning path", e))?
        .ok_or_else(|| HttpError::not_found("Learning path not found"))?;

    let courses_progress = app_state
        .db_client
        .get_path_progress(path_id, user.user.id)
        .await
        .map_err(|e| HttpError::from_db("getting path progress", e))?;

    let percentages: Vec<i32> = courses_progress
        .iter()
        .map(|c| c.progress_percentage)
        .collect();
    let total_progress = average_progress(&percentages);

    tracing::info!(total_progress, "get_path_progress successful");
    Ok(Json(PathProgressResponseDto {
        status: "success".to_string(),
        courses_progress,
        total_progress,
    }))
}
