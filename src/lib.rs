pub mod board;
pub mod card;
pub mod config;
pub mod drive;
pub mod errors;
pub mod relay;
pub mod ui;
