pub mod services;

pub use services::{HttpImageInspector, ImageInspector};
