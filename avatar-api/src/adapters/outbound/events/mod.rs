mod broadcast;

pub use self::broadcast::*;
