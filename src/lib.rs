pub mod app;
pub mod audio;
pub mod config;
pub mod hud;
pub mod render;
pub mod schedule;
pub mod terminal;
pub mod track;
pub mod visual;
