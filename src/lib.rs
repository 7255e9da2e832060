pub mod api;
pub mod app;
pub mod browser;
pub mod player;
pub mod session;
pub mod template;
