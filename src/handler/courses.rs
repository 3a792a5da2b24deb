use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Extension, Router, middleware};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use crate::db::{CourseExt, ProgressExt};
use crate::dtos::{
    CourseDetailDto, CourseFilter, CourseListItemDto, CourseListResponseDto, CourseQueryParams,
    CreateCourseDto, CreateModuleDto, CreateSectionDto, DataResponseDto, PaginationDto,
    ProgressDto, Response, UpdateCourseDto, UpdateProgressDto,
};
use crate::error::HttpError;
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;

pub fn courses_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_courses))
        .route(
            "/",
            post(create_course)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{course_id}", get(get_course))
        .route(
            "/{course_id}",
            put(update_course)
                .delete(delete_course)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{course_id}/modules", get(get_modules))
        .route(
            "/{course_id}/modules",
            post(create_module)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{course_id}/modules/{module_id}/sections", get(get_sections))
        .route(
            "/{course_id}/modules/{module_id}/sections",
            post(create_section)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{course_id}/progress",
            get(get_progress).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{course_id}/update_progress",
            post(update_progress).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Public catalog: published courses, filtered and paginated
#[instrument(skip(app_state))]
pub async fn get_courses(
    Query(params): Query<CourseQueryParams>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_courses input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let filter = CourseFilter::from(&params);

    let courses = app_state
        .db_client
        .get_courses(&filter, page, limit)
        .await
        .map_err(|e| HttpError::from_db("getting courses", e))?;

    let total = app_state
        .db_client
        .get_course_count(&filter)
        .await
        .map_err(|e| HttpError::from_db("counting courses", e))?;

    tracing::info!(results = courses.len(), "get_courses successful");
    Ok(Json(CourseListResponseDto {
        status: "success".to_string(),
        data: courses.iter().map(CourseListItemDto::from).collect(),
        pagination: PaginationDto::new(page, limit, total),
    }))
}

/// Published course with its modules and sections
#[instrument(skip(app_state))]
pub async fn get_course(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let course = app_state
        .db_client
        .get_course(course_id, true)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let modules = app_state
        .db_client
        .get_modules(course_id)
        .await
        .map_err(|e| HttpError::from_db("getting modules", e))?;

    let module_ids: Vec<i64> = modules.iter().map(|m| m.id).collect();
    let sections = app_state
        .db_client
        .get_sections(&module_ids)
        .await
        .map_err(|e| HttpError::from_db("getting sections", e))?;

    tracing::info!("get_course successful");
    Ok(Json(DataResponseDto::success(CourseDetailDto::assemble(
        course, modules, sections,
    ))))
}

#[instrument(skip(app_state, body), fields(title = %body.title))]
pub async fn create_course(
    State(app_state): State<AppState>,
    Json(body): Json<CreateCourseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_course input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let course = app_state
        .db_client
        .create_course(&body)
        .await
        .map_err(|e| HttpError::from_db("creating course", e))?;

    tracing::info!(course_id = course.id, "create_course successful");
    Ok((StatusCode::CREATED, Json(DataResponseDto::success(course))))
}

#[instrument(skip(app_state, body))]
pub async fn update_course(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateCourseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_course input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let course = app_state
        .db_client
        .update_course(course_id, &body)
        .await
        .map_err(|e| HttpError::from_db("updating course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    tracing::info!("update_course successful");
    Ok(Json(DataResponseDto::success(course)))
}

#[instrument(skip(app_state))]
pub async fn delete_course(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_course(course_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Course not found"),
            e => HttpError::from_db("deleting course", e),
        })?;

    tracing::info!("delete_course successful");
    Ok(Json(Response {
        status: "success",
        message: "Course deleted".to_string(),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_modules(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_course(course_id, true)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let modules = app_state
        .db_client
        .get_modules(course_id)
        .await
        .map_err(|e| HttpError::from_db("getting modules", e))?;

    Ok(Json(DataResponseDto::success(modules)))
}

/// Duplicate `order_num` within the course is a 409
#[instrument(skip(app_state, body))]
pub async fn create_module(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<CreateModuleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_module input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_course(course_id, false)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let module = app_state
        .db_client
        .create_module(course_id, &body)
        .await
        .map_err(|e| HttpError::from_db("creating module", e))?;

    tracing::info!(module_id = module.id, "create_module successful");
    Ok((StatusCode::CREATED, Json(DataResponseDto::success(module))))
}

#[instrument(skip(app_state))]
pub async fn get_sections(
    Path((course_id, module_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_course(course_id, true)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    app_state
        .db_client
        .get_module(course_id, module_id)
        .await
        .map_err(|e| HttpError::from_db("getting module", e))?
        .ok_or_else(|| HttpError::not_found("Module not found"))?;

    let sections = app_state
        .db_client
        .get_sections(&[module_id])
        .await
        .map_err(|e| HttpError::from_db("getting sections", e))?;

    Ok(Json(DataResponseDto::success(sections)))
}

#[instrument(skip(app_state, body))]
pub async fn create_section(
    Path((course_id, module_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Json(body): Json<CreateSectionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_section input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_module(course_id, module_id)
        .await
        .map_err(|e| HttpError::from_db("getting module", e))?
        .ok_or_else(|| HttpError::not_found("Module not found"))?;

    let section = app_state
        .db_client
        .create_section(module_id, &body)
        .await
        .map_err(|e| HttpError::from_db("creating section", e))?;

    tracing::info!(section_id = section.id, "create_section successful");
    Ok((StatusCode::CREATED, Json(DataResponseDto::success(section))))
}

/// Caller's progress on a course; zero when never started
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_progress(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let progress = app_state
        .db_client
        .get_progress(user.user.id, course_id)
        .await
        .map_err(|e| HttpError::from_db("getting progress", e))?;

    let dto = match progress {
        Some(p) => ProgressDto {
            course_id,
            progress_percentage: p.progress_percentage,
            completed: p.completed,
            last_accessed: Some(p.last_accessed),
        },
        None => ProgressDto {
            course_id,
            progress_percentage: 0,
            completed: false,
            last_accessed: None,
        },
    };

    Ok(Json(DataResponseDto::success(dto)))
}

#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn update_progress(
    Path(course_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProgressDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_progress input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let is_admin = user.user.is_admin();
    app_state
        .db_client
        .get_course(course_id, !is_admin)
        .await
        .map_err(|e| HttpError::from_db("getting course", e))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let (progress, newly_completed) = app_state
        .db_client
        .upsert_progress(
            user.user.id,
            course_id,
            body.progress_percentage,
            body.completed,
        )
        .await
        .map_err(|e| HttpError::from_db("updating progress", e))?;

    tracing::info!(
        course_id,
        percentage = progress.progress_percentage,
        newly_completed,
        "update_progress successful"
    );
    Ok(Json(DataResponseDto::success(progress)))
}
