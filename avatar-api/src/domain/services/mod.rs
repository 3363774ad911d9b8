mod avatar;

pub use avatar::{AvatarServiceImpl, DirectorySettings};
