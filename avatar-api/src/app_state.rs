use std::sync::Arc;

use axum::http::HeaderName;

use crate::domain::ports::inbound::AvatarService;

#[derive(Clone)]
pub struct AppState {
    pub avatar_service: Arc<dyn AvatarService>,
    pub identity_header: HeaderName,
    pub upload_body_limit: usize,
}

impl AppState {
    pub fn new(
        avatar_service: Arc<dyn AvatarService>,
        identity_header: HeaderName,
        upload_body_limit: usize,
    ) -> Self {
        Self {
            avatar_service,
            identity_header,
            upload_body_limit,
        }
    }
}
