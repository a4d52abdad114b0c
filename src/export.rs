//! Flattened export and the save/cancel contract with the host.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::ExportError;

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Receives the outcome of an annotation session. Exactly one of the two
/// methods is called per session.
pub trait SessionHost {
    /// The background with every visible annotation baked in, as a PNG data URI.
    fn on_save(&mut self, flattened_image: String);

    fn on_cancel(&mut self);
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn encode_png_data_uri(img: &RgbaImage) -> Result<String, ExportError> {
    let png = encode_png(img)?;
    Ok(format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)))
}
