pub(crate) mod avatars;
pub(crate) mod error;
pub(crate) mod next_url;

pub(crate) use error::ApiError;
