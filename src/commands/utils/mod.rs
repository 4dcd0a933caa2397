pub mod aihelp;
pub mod analyze;
pub mod ask;
