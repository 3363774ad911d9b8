mod avatar;
mod avatar_cache;
mod avatar_events;
mod avatar_storage;
#[cfg(test)]
mod mock;

pub use avatar::*;
pub use avatar_cache::*;
pub use avatar_events::*;
pub use avatar_storage::*;
#[cfg(test)]
pub use mock::*;
