pub mod events;
pub mod filesystem;
pub mod moka;
pub mod postgres;
