pub mod html;
pub mod loader;
pub mod session;
