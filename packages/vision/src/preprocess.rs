use ndarray::{Array3, Array4, Axis};
use spinespy_types::Result;
use spinespy_types::image::{RgbImage, imageops, imageops::FilterType};
use std::borrow::Cow;

fn resized(img: &RgbImage, width: u32, height: u32) -> Cow<'_, RgbImage> {
    if img.dimensions() == (width, height) {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(imageops::resize(img, width, height, FilterType::Triangle))
    }
}

fn to_hwc(img: &RgbImage, width: u32, height: u32) -> Result<Array3<f32>> {
    let buf: Vec<f32> = resized(img, width, height)
        .as_raw()
        .iter()
        .map(|v| (*v as f32) / 255.0)
        .collect();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, 3),
        buf,
    )?)
}

/// Image as `[1, 3, H, W]` normalized to 0-1
pub fn img_to_nchw(img: &RgbImage, width: u32, height: u32) -> Result<Array4<f32>> {
    Ok(to_hwc(img, width, height)?
        .permuted_axes([2, 0, 1])
        .insert_axis(Axis(0)))
}

/// Image as `[1, H, W, 3]` normalized to 0-1
pub fn img_to_nhwc(img: &RgbImage, width: u32, height: u32) -> Result<Array4<f32>> {
    Ok(to_hwc(img, width, height)?.insert_axis(Axis(0)))
}
