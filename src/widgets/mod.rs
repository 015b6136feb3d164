pub mod image_animator;
pub mod media_image;

pub use image_animator::*;
pub use media_image::*;
