pub mod circuit;
pub mod permission;
pub mod session;
