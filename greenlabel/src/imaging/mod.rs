mod preprocessing;
mod validation;

pub use preprocessing::{
    dominant_color, preprocess_image, preprocess_image_blocking, PreprocessMode,
    PreprocessedImage,
};
pub use validation::{validate_upload, ImageFormatKind};
