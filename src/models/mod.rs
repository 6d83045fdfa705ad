pub mod aspect;
pub mod common;
pub mod image;
pub mod result;

pub use aspect::*;
pub use common::*;
pub use image::*;
pub use result::*;
