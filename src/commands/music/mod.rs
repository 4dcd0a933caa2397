pub mod clear;
pub mod join;
pub mod leave;
pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod stop;
pub mod volume;
