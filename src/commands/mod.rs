pub mod create_commands;
pub mod game;
pub mod music;
pub mod utils;
