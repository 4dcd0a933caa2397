pub mod interaction;
pub mod track_end;
