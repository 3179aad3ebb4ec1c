pub mod circuits;
pub mod sessions;
