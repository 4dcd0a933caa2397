pub mod alias;
pub mod config;
pub mod game;
pub mod notify;
pub mod ollama;
pub mod player;
pub mod queue;
pub mod resolver;
pub mod sink;
pub mod track;
pub mod ytdlp;
