pub mod image;
pub mod outcome;
pub mod record;

pub use image::*;
pub use outcome::*;
pub use record::*;
