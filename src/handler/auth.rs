use crate::{
    AppState,
    db::UserExt,
    dtos::{FilterUserDto, LoginUserDto, RegisterUserDto, UserLoginResponseDto},
    error::{ErrorMessage, HttpError},
    utils::{password, token},
};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// `Set-Cookie` header carrying the access token for browser clients
pub(crate) fn access_cookie_headers(access_token: &str) -> Result<HeaderMap, HttpError> {
    let access_cookie = Cookie::build(("access_token", access_token.to_owned()))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();

    let value = HeaderValue::from_str(&access_cookie.to_string()).map_err(|e| {
        tracing::error!("Invalid cookie header: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, value);
    Ok(headers)
}

fn issue_token(app_state: &AppState, user_id: &str) -> Result<String, HttpError> {
    token::create_token(
        user_id,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })
}

/// Register a learner account and log it in right away
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    // Duplicate email or username surfaces as a unique violation (409)
    let user = app_state
        .db_client
        .save_user(
            &body.username,
            &body.email,
            &hash_password,
            body.first_name.as_deref().unwrap_or_default(),
            body.last_name.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| HttpError::from_db("saving user", e))?;

    let access_token = issue_token(&app_state, &user.id.to_string())?;
    let headers = access_cookie_headers(&access_token)?;

    tracing::info!(user_id = %user.id, "Register successful");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(UserLoginResponseDto {
            status: "success".to_string(),
            access_token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Exchange email and password for a bearer token
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, None, Some(body.email.as_str()))
        .await
        .map_err(|e| HttpError::from_db("getting user", e))?
        .ok_or_else(|| {
            tracing::error!("User not found");
            HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
        })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    if !password_matched {
        tracing::error!("password mismatch");
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    let access_token = issue_token(&app_state, &user.id.to_string())?;

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token: access_token.clone(),
        user: FilterUserDto::filter_user(&user),
    })
    .into_response();
    response
        .headers_mut()
        .extend(access_cookie_headers(&access_token)?);

    tracing::info!(user_id = %user.id, "Login successful");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_cookie_is_http_only() {
        let headers = access_cookie_headers("abc").unwrap();
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
    }
}
