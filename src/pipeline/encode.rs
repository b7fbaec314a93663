//! Image encoding: `DynamicImage` → PNG bytes for the recognition backend.
//!
//! PNG is lossless; JPEG artefacts around glyph edges measurably hurt
//! tesseract's accuracy. Pages are flattened to 8-bit greyscale first, which
//! is what tesseract binarises from anyway and shrinks the file to roughly a
//! third of the RGBA encoding.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a greyscale PNG.
pub fn encode_page(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let grey = DynamicImage::ImageLuma8(img.to_luma8());
    let mut buf = Vec::new();
    grey.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
