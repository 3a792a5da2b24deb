use crate::{
    AppState,
    db::{ProgressExt, UserExt},
    dtos::{
        DataResponseDto, FilterUserDto, RequestQueryDto, Response, UpdateProfileDto, UserData,
        UserListResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, ensure_self_or_admin, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for account endpoints
///
/// All routes are protected by the auth middleware (applied in routes.rs).
/// Admin routes add a role check on top.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_users).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route("/me", get(get_me).put(update_me))
        .route("/me/progress", get(get_my_progress))
        .route("/logout", post(logout))
        .route(
            "/admin/dashboard",
            get(get_dashboard).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route("/{user_id}/progress", get(get_user_progress))
        .route(
            "/{user_id}/toggle_premium",
            post(toggle_premium).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/{user_id}/toggle_admin",
            post(toggle_admin).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
}

fn user_response(user: &crate::models::User) -> UserResponseDto {
    UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(user),
        },
    }
}

/// Current user's profile
#[instrument(skip(user), fields(username = %user.user.username))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("get_me successful");
    Ok(Json(user_response(&user.user)))
}

/// Partial profile update
#[instrument(skip(app_state, user, body), fields(username = %user.user.username))]
pub async fn update_me(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_me input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let updated = app_state
        .db_client
        .update_user_profile(user.user.id, &body)
        .await
        .map_err(|e| HttpError::from_db("updating user profile", e))?;

    tracing::info!("update_me successful");
    Ok(Json(user_response(&updated)))
}

#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_my_progress(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let progress = app_state
        .db_client
        .get_user_progress(user.user.id)
        .await
        .map_err(|e| HttpError::from_db("getting user progress", e))?;

    tracing::info!("get_my_progress successful");
    Ok(Json(DataResponseDto::success(progress)))
}

/// Progress of any user; only the user themself or an admin may look
#[instrument(skip(app_state, user), fields(username = %user.user.username))]
pub async fn get_user_progress(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    ensure_self_or_admin(&user.user, user_id).inspect_err(|_| {
        tracing::error!(target_user = %user_id, "Progress access denied");
    })?;

    let progress = app_state
        .db_client
        .get_user_progress(user_id)
        .await
        .map_err(|e| HttpError::from_db("getting user progress", e))?;

    tracing::info!("get_user_progress successful");
    Ok(Json(DataResponseDto::success(progress)))
}

/// Paginated list of all users (admin only)
///
/// Query params: ?page=1&limit=10
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| HttpError::from_db("getting users", e))?;

    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::from_db("getting user count", e))?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    };
    tracing::info!("get_users successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .db_client
        .get_dashboard_stats()
        .await
        .map_err(|e| HttpError::from_db("getting dashboard stats", e))?;

    tracing::info!("get_dashboard successful");
    Ok(Json(DataResponseDto::success(stats)))
}

#[instrument(skip(app_state))]
pub async fn toggle_premium(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .toggle_user_premium(user_id)
        .await
        .map_err(|e| HttpError::from_db("toggling premium", e))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    tracing::info!(user_id = %user.id, is_premium = user.is_premium, "toggle_premium successful");
    Ok(Json(user_response(&user)))
}

/// Grant or revoke admin rights. Admins cannot demote themselves.
#[instrument(skip(app_state, admin), fields(admin = %admin.user.username))]
pub async fn toggle_admin(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(admin): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if admin.user.id == user_id {
        tracing::error!("Admin tried to remove their own admin rights");
        return Err(HttpError::bad_request(
            "You cannot remove your own admin rights",
        ));
    }

    let target = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| HttpError::from_db("getting user", e))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let role = if target.is_admin() {
        UserRole::User
    } else {
        UserRole::Admin
    };

    let user = app_state
        .db_client
        .update_user_role(user_id, role)
        .await
        .map_err(|e| HttpError::from_db("updating user role", e))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    tracing::info!(user_id = %user.id, role = user.role.to_str(), "toggle_admin successful");
    Ok(Json(user_response(&user)))
}

/// Expire the access token cookie. Tokens are stateless, so bearer clients
/// simply discard theirs.
#[instrument(skip(user), fields(username = %user.user.username))]
pub async fn logout(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let access_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_str(&access_cookie.to_string()).map_err(|e| {
            tracing::error!("Invalid cookie header: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?,
    );

    let mut response = Json(Response {
        status: "success",
        message: "Logout successful".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);
    tracing::info!("logout successful");
    Ok(response)
}
