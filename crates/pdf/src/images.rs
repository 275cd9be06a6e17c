//! Image XObject extraction.
//!
//! JPEG streams are passed through untouched. Uncompressed (or
//! Flate-compressed) 8-bit gray and RGB pixel data is re-encoded as PNG.
//! Anything else is skipped.

use lopdf::{Dictionary, Document, Object, Stream};
use slides_core::ImageFormat;
use std::io::Cursor;

/// Follow one level of reference indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

/// A page's XObject dictionary, honoring resources inherited from the page
/// tree.
pub fn page_xobjects<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    if let Some(resources) = page.get(b"Resources").ok().and_then(|o| resolve_dict(doc, o)) {
        return resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve_dict(doc, o));
    }

    let parent = page.get(b"Parent").ok().and_then(|o| resolve_dict(doc, o))?;
    page_xobjects(doc, parent)
}

fn filter_name(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
}

/// Re-encode raw 8-bit pixels as PNG.
///
/// `channels` is 1 for gray and 3 for RGB.
pub fn encode_png(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Option<Vec<u8>> {
    let expected = width as usize * height as usize * channels as usize;
    if expected == 0 || pixels.len() < expected {
        return None;
    }

    let mut pixels = pixels;
    pixels.truncate(expected);

    let image = match channels {
        1 => image::DynamicImage::ImageLuma8(image::GrayImage::from_raw(width, height, pixels)?),
        3 => image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(width, height, pixels)?),
        _ => return None,
    };

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .ok()?;
    Some(buf)
}

fn channels(doc: &Document, dict: &Dictionary) -> Option<u8> {
    let space = resolve(doc, dict.get(b"ColorSpace").ok()?);
    let name = match space {
        Object::Name(name) => name.as_slice(),
        // [/ICCBased ref] and friends: judge by the component count.
        Object::Array(arr) => {
            let n = arr
                .get(1)
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").ok())
                .and_then(|o| o.as_i64().ok());
            return match n {
                Some(1) => Some(1),
                Some(3) => Some(3),
                _ => None,
            };
        }
        _ => return None,
    };

    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        _ => None,
    }
}

/// Encoded bytes for an image stream, or `None` when the encoding is not
/// supported.
pub fn stream_image(doc: &Document, stream: &Stream) -> Option<(ImageFormat, Vec<u8>)> {
    let dict = &stream.dict;
    if !is_image(dict) {
        return None;
    }

    match filter_name(dict) {
        Some(b"DCTDecode") => return Some((ImageFormat::Jpeg, stream.content.clone())),
        Some(b"FlateDecode") | None => {}
        Some(other) => {
            log::debug!(
                "Skipping image with filter {}",
                String::from_utf8_lossy(other)
            );
            return None;
        }
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()?;
    let height = dict.get(b"Height").ok()?.as_i64().ok()?;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 || width <= 0 || height <= 0 {
        log::debug!("Skipping {}x{} image with {} bits per component", width, height, bits);
        return None;
    }

    let channels = channels(doc, dict)?;
    let pixels = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let png = encode_png(width as u32, height as u32, channels, pixels)?;
    Some((ImageFormat::Png, png))
}

/// Look up an XObject by resource name and extract it as an image.
pub fn xobject_image(
    doc: &Document,
    xobjects: &Dictionary,
    name: &[u8],
) -> Option<(ImageFormat, Vec<u8>)> {
    let obj = resolve(doc, xobjects.get(name).ok()?);
    let stream = obj.as_stream().ok()?;
    stream_image(doc, stream)
}
