//! Raster stamp embedding
//!
//! Decodes a PNG or JPEG asset, scales it to fit a fixed bounding box while
//! preserving aspect ratio, and draws it centered near the top edge of the
//! target page as an image XObject (with an SMask carrying the alpha
//! channel, so transparent PNG stamps composite correctly).

use std::path::Path;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};

/// Maximum stamp width in page units
pub const MAX_STAMP_WIDTH: f32 = 150.0;
/// Maximum stamp height in page units
pub const MAX_STAMP_HEIGHT: f32 = 50.0;

/// Distance from the top edge of the page to the top of the stamp
const TOP_OFFSET: f32 = 20.0;

/// Resource name the stamp is registered under
const STAMP_NAME: &str = "ImStamp";

/// Raster formats the engine accepts. Anything else is rejected at the
/// input boundary, before a fill cycle starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Classify by file extension; unknown extensions fail with
    /// [`Error::UnsupportedImageFormat`].
    pub fn from_extension(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(Error::UnsupportedImageFormat(other.to_string())),
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// A caller-owned raster asset. The engine reads it once per fill cycle and
/// never retains it past the cycle.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self { bytes, format }
    }

    /// Read an asset from disk, validating the extension first.
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = ImageFormat::from_extension(path)?;
        Ok(Self::new(std::fs::read(path)?, format))
    }
}

/// Scale pixel dimensions down to fit the given bounds, preserving aspect
/// ratio and never upscaling.
pub fn scale_to_fit(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let scale = (max_width / w).min(max_height / h).min(1.0);
    (w * scale, h * scale)
}

/// Embed the asset on one page, top-centered, scaled to the stamp bounds.
pub fn embed_image(doc: &mut Document, asset: &ImageAsset, page_index: usize) -> Result<()> {
    let img = image::load_from_memory_with_format(&asset.bytes, asset.format.into())?.to_rgba8();
    let (img_w, img_h) = img.dimensions();

    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.push(pixel[0]);
        rgb.push(pixel[1]);
        rgb.push(pixel[2]);
        alpha.push(pixel[3]);
    }

    let pages = doc.get_pages();
    let page_id = pages
        .get(&(page_index as u32 + 1))
        .copied()
        .ok_or(Error::PageOutOfRange(page_index))?;
    let (page_width, page_height) = page_dimensions(doc, page_id);

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));

    add_stamp_to_page_resources(doc, page_id, image_id)?;

    let (draw_w, draw_h) = scale_to_fit(img_w, img_h, MAX_STAMP_WIDTH, MAX_STAMP_HEIGHT);
    let x = (page_width - draw_w) / 2.0;
    let y = (page_height - TOP_OFFSET - draw_h).max(0.0);

    let content = format!("q\n{draw_w:.2} 0 0 {draw_h:.2} {x:.2} {y:.2} cm\n/{STAMP_NAME} Do\nQ\n");
    let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
    append_content_to_page(doc, page_id, content_id)
}

/// Width and height of a page's MediaBox, following the `/Parent` chain for
/// inherited boxes. Falls back to US Letter when the box is missing.
fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
            break;
        };
        if let Some(size) = media_box_size(doc, dict) {
            return size;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    (612.0, 792.0)
}

fn media_box_size(doc: &Document, dict: &lopdf::Dictionary) -> Option<(f32, f32)> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = object_to_f32(&arr[0])?;
    let lly = object_to_f32(&arr[1])?;
    let urx = object_to_f32(&arr[2])?;
    let ury = object_to_f32(&arr[3])?;
    Some((urx - llx, ury - lly))
}

fn object_to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Register the stamp XObject in the page's Resources dictionary.
fn add_stamp_to_page_resources(doc: &mut Document, page_id: ObjectId, image_id: ObjectId) -> Result<()> {
    // Resources may live behind a reference; materialize a page-local copy
    let resources_dict = {
        let page_dict = doc.get_object(page_id)?.as_dict()?;
        match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(res_id)) => match doc.get_object(*res_id) {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                _ => lopdf::Dictionary::new(),
            },
            _ => lopdf::Dictionary::new(),
        }
    };

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let mut resources = resources_dict;

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => lopdf::Dictionary::new(),
    };
    xobjects.set(STAMP_NAME, Object::Reference(image_id));
    resources.set("XObject", Object::Dictionary(xobjects));
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Append a content stream after the page's existing content, so the stamp
/// draws on top.
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let existing = page_dict.get(b"Contents").ok().cloned();

    match existing {
        Some(Object::Reference(prior)) => {
            page_dict.set(
                "Contents",
                Object::Array(vec![Object::Reference(prior), Object::Reference(content_id)]),
            );
        }
        Some(Object::Array(mut array)) => {
            array.push(Object::Reference(content_id));
            page_dict.set("Contents", Object::Array(array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(content_id)]));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn oversized_asset_scales_down_preserving_aspect() {
        let (w, h) = scale_to_fit(300, 100, MAX_STAMP_WIDTH, MAX_STAMP_HEIGHT);
        assert!(w <= MAX_STAMP_WIDTH && h <= MAX_STAMP_HEIGHT);
        assert!((w / h - 3.0).abs() < 0.01);
        assert_eq!((w, h), (150.0, 50.0));
    }

    #[test]
    fn small_asset_is_never_upscaled() {
        assert_eq!(scale_to_fit(60, 20, MAX_STAMP_WIDTH, MAX_STAMP_HEIGHT), (60.0, 20.0));
    }

    #[test]
    fn tall_asset_is_bounded_by_height() {
        let (w, h) = scale_to_fit(100, 200, MAX_STAMP_WIDTH, MAX_STAMP_HEIGHT);
        assert_eq!(h, 50.0);
        assert_eq!(w, 25.0);
    }

    #[test]
    fn zero_dimension_does_not_divide_by_zero() {
        let (w, h) = scale_to_fit(0, 0, MAX_STAMP_WIDTH, MAX_STAMP_HEIGHT);
        assert!(w > 0.0 && h > 0.0);
    }

    #[test]
    fn extension_gate_rejects_other_formats() {
        assert_eq!(
            ImageFormat::from_extension(&PathBuf::from("stamp.png")).unwrap(),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_extension(&PathBuf::from("stamp.JPG")).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(
            ImageFormat::from_extension(&PathBuf::from("stamp.gif")),
            Err(Error::UnsupportedImageFormat(_))
        ));
        assert!(matches!(
            ImageFormat::from_extension(&PathBuf::from("stamp")),
            Err(Error::UnsupportedImageFormat(_))
        ));
    }
}
