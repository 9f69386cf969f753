use std::collections::HashMap;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use common::KeeperError;
use tracing::{error, info};

use super::dto::*;
use super::middleware::user_id_from_headers;
use crate::AppState;

fn status_for(err: &KeeperError) -> StatusCode {
    match err {
        KeeperError::LoginInvalid
        | KeeperError::PasswordInvalid
        | KeeperError::BadId
        | KeeperError::PayloadTooLarge
        | KeeperError::CorruptRecord(_) => StatusCode::BAD_REQUEST,
        KeeperError::AuthFailed | KeeperError::TokenInvalid | KeeperError::TokenExpired => {
            StatusCode::UNAUTHORIZED
        }
        KeeperError::LoginTaken => StatusCode::CONFLICT,
        KeeperError::NotFound => StatusCode::NO_CONTENT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: KeeperError) -> axum::response::Response {
    let status = status_for(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed");
    }
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (
        status,
        Json(ResultErrorResponse {
            status: false,
            error: err.to_string(),
        }),
    )
        .into_response()
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn registration(
    State(state): State<AppState>,
    Json(body): Json<RegistrationRequest>,
) -> axum::response::Response {
    match state.keeper.registration(body.login, body.password).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(ResultResponse {
                status: true,
                message: "Registration successful".into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let user = match state.keeper.login(body.login, body.password).await {
        Ok(user) => user,
        Err(e) => return error_response(e),
    };

    let mut claims = HashMap::new();
    claims.insert("user_id".to_string(), user.id.to_string());
    let access_token = match state.token_issuer.create(&claims) {
        Ok(t) => t,
        Err(e) => return error_response(e),
    };

    info!(user_id = user.id, "user authenticated");
    (
        StatusCode::OK,
        Json(LoginResponse {
            status: true,
            message: "User authenticated".into(),
            access_token,
        }),
    )
        .into_response()
}

pub async fn user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> axum::response::Response {
    match user_id_from_headers(&state, &headers) {
        Ok(user_id) => Json(UserInfoResponse { user_id }).into_response(),
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

pub async fn get_datas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> axum::response::Response {
    let user_id = match user_id_from_headers(&state, &headers) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    match state.keeper.list_metadata(user_id) {
        Ok(items) => {
            let data = items
                .into_iter()
                .map(|m| MetaDataDto {
                    id: m.id,
                    title: m.title,
                    data_type: m.data_type,
                    update_dt: m.update_dt,
                    is_deleted: m.is_deleted,
                })
                .collect();
            Json(GetDatasResponse { status: true, data }).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn get_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match user_id_from_headers(&state, &headers) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };
    let id: i64 = match id.parse() {
        Ok(id) => id,
        Err(_) => return error_response(KeeperError::BadId),
    };

    match state.keeper.get_secret(id, user_id) {
        Ok(secret) => Json(GetDataResponse {
            status: true,
            data: SecretDataDto {
                id: secret.id,
                title: secret.title,
                data: secret.data,
                data_type: secret.data_type,
                update_dt: secret.update_dt,
            },
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn new_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewDataRequest>,
) -> axum::response::Response {
    let user_id = match user_id_from_headers(&state, &headers) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    match state.keeper.create_secret(
        user_id,
        body.title,
        body.data_type,
        body.data,
        body.update_dt,
    ) {
        Ok(secret) => Json(NewDataResponse {
            status: true,
            data: NewDataDto {
                id: secret.id,
                title: secret.title,
                data_type: secret.data_type,
                update_dt: secret.update_dt,
            },
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn upd_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdDataRequest>,
) -> axum::response::Response {
    let user_id = match user_id_from_headers(&state, &headers) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };
    let id: i64 = match id.parse() {
        Ok(id) => id,
        Err(_) => return error_response(KeeperError::BadId),
    };

    match state.keeper.update_secret(
        id,
        user_id,
        body.title,
        body.data_type,
        body.data,
        body.update_dt,
    ) {
        Ok(()) => Json(ResultResponse {
            status: true,
            message: "updated".into(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn del_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match user_id_from_headers(&state, &headers) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };
    let id: i64 = match id.parse() {
        Ok(id) => id,
        Err(_) => return error_response(KeeperError::BadId),
    };

    match state.keeper.delete_secret(id, user_id) {
        Ok(()) => Json(ResultResponse {
            status: true,
            message: "deleted".into(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
