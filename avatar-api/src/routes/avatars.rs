use axum::{
    extract::{DefaultBodyLimit, Multipart, OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::AuthUser,
    domain::models::{Avatar, AvatarId, AvatarUpload, UserKey},
    routes::{next_url::resolve_next, ApiError},
};

// Allow multipart overhead on top of the configured avatar size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(upload_body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/add/", get(avatar_page).post(add_avatar))
        .route_layer(DefaultBodyLimit::max(upload_body_limit + MULTIPART_OVERHEAD))
        .route("/change/", get(avatar_page).post(change_primary))
        .route("/delete/", get(avatar_page).post(delete_avatars))
        .route("/render_primary/:user/", get(render_primary_default))
        .route("/render_primary/:user/:size/", get(render_primary))
}

#[derive(Debug, Default, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryForm {
    choice: Option<i32>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteForm {
    #[serde(default)]
    choices: Vec<i32>,
    next: Option<String>,
}

#[derive(Debug, Serialize)]
struct AvatarPage {
    avatar: Option<Avatar>,
    avatars: Vec<Avatar>,
    next: String,
}

#[instrument(name = "GET /avatar", skip(app_state, headers))]
async fn avatar_page(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(query): Query<NextQuery>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<AvatarPage>, ApiError> {
    let directory = app_state.avatar_service.resolve(&user.id).await?;

    Ok(Json(AvatarPage {
        avatar: directory.primary,
        avatars: directory.avatars,
        next: resolve_next(None, query.next.as_deref(), &headers, &uri),
    }))
}

#[instrument(name = "POST /avatar/add", skip(app_state, headers, multipart))]
async fn add_avatar(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(query): Query<NextQuery>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let (upload, form_next) = extract_upload(&mut multipart).await?;
    let upload = upload.ok_or_else(|| ApiError::bad_request("missing avatar file field"))?;

    app_state.avatar_service.add(&user.id, upload).await?;

    Ok(Redirect::to(&resolve_next(
        form_next.as_deref(),
        query.next.as_deref(),
        &headers,
        &uri,
    )))
}

#[instrument(name = "POST /avatar/change", skip(app_state, headers))]
async fn change_primary(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(query): Query<NextQuery>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<PrimaryForm>,
) -> Result<Redirect, ApiError> {
    if let Some(choice) = form.choice {
        app_state
            .avatar_service
            .set_primary(&user.id, AvatarId::new(choice))
            .await?;
    }

    Ok(Redirect::to(&resolve_next(
        form.next.as_deref(),
        query.next.as_deref(),
        &headers,
        &uri,
    )))
}

#[instrument(name = "POST /avatar/delete", skip(app_state, headers))]
async fn delete_avatars(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(query): Query<NextQuery>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, ApiError> {
    let ids = form
        .choices
        .iter()
        .copied()
        .map(AvatarId::new)
        .collect::<Vec<_>>();

    app_state.avatar_service.delete(&user.id, &ids).await?;

    Ok(Redirect::to(&resolve_next(
        form.next.as_deref(),
        query.next.as_deref(),
        &headers,
        &uri,
    )))
}

#[instrument(name = "GET /avatar/render_primary/:user", skip(app_state))]
async fn render_primary_default(
    State(app_state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Response, ApiError> {
    let size = app_state.avatar_service.default_size();
    primary_redirect(&app_state, user, size).await
}

#[instrument(name = "GET /avatar/render_primary/:user/:size", skip(app_state))]
async fn render_primary(
    State(app_state): State<AppState>,
    Path((user, size)): Path<(String, u32)>,
) -> Result<Response, ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("size must be a positive integer"));
    }
    primary_redirect(&app_state, user, size).await
}

async fn primary_redirect(
    app_state: &AppState,
    user: String,
    size: u32,
) -> Result<Response, ApiError> {
    let key = UserKey::from(user);
    if !key.is_well_formed() {
        return Err(ApiError::not_found("unknown user"));
    }

    let url = app_state
        .avatar_service
        .primary_avatar_url(&key, size)
        .await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

async fn extract_upload(
    multipart: &mut Multipart,
) -> Result<(Option<AvatarUpload>, Option<String>), ApiError> {
    let mut upload = None;
    let mut next = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("failed to parse multipart field"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("avatar") => {
                let file_name = field.file_name().unwrap_or("avatar").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("failed to read avatar payload"))?;
                upload = Some(AvatarUpload::new(file_name, bytes.to_vec()));
            }
            Some("next") => {
                next = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("failed to read next field"))?,
                );
            }
            _ => continue,
        }
    }

    Ok((upload, next))
}
