use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Source image not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid photo path: {0}")]
    InvalidPath(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thumbnail task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ThumbnailError>;
