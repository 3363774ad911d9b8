mod avatar_url_cache;

pub use avatar_url_cache::*;
