use crate::texture::TextureHandle;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{} is invalid.", _0)]
    TextureHandleInvalid(TextureHandle),
    #[fail(display = "{} has no storage allocated yet.", _0)]
    TextureNotAllocated(TextureHandle),
    #[fail(display = "Device: {}", _0)]
    Device(String),
    #[fail(display = "Texture data is out of bounds.")]
    OutOfBounds,
    #[fail(display = "Another texture is currently locked for modification.")]
    ModifyInProgress,
}

pub type Result<T> = ::std::result::Result<T, Error>;
