pub mod media;
pub mod popups;
