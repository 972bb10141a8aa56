//! File-loading helpers for feeding images into the readers
//!
//! The readers themselves only ever see borrowed byte slices; these helpers
//! turn image files into the 8-bit single-channel buffers they consume.

use image::GenericImageView;
use std::env;
use std::path::Path;

fn max_dim_from_env() -> Option<u32> {
    match env::var("DM_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image file as grayscale bytes along with its dimensions.
///
/// Set `DM_MAX_DIM` to downscale anything larger before decoding (0
/// disables downscaling).
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<(Vec<u8>, usize, usize), image::ImageError> {
    let img = image::open(path)?;
    let img = if let Some(max_dim) = max_dim_from_env() {
        let (orig_w, orig_h) = img.dimensions();
        if orig_w.max(orig_h) > max_dim {
            img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
        } else {
            img
        }
    } else {
        img
    };
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    Ok((gray.into_raw(), width as usize, height as usize))
}
