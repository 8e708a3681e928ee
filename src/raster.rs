use base64::Engine;

/// A decoded raster image in straight 8-bit RGBA, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn has_alpha(&self) -> bool {
        self.rgba.chunks_exact(4).any(|px| px[3] != 255)
    }

    /// Splits the pixels into packed RGB and a separate alpha plane.
    pub fn split_alpha(&self) -> (Vec<u8>, Vec<u8>) {
        let pixels = self.rgba.len() / 4;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in self.rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        (rgb, alpha)
    }
}

/// Decodes an image `href`. Only `data:` URIs are supported; external references and
/// undecodable payloads return `None`.
pub fn decode_image_href(href: &str) -> Option<DecodedImage> {
    let (mime, data) = parse_data_uri(href.trim())?;
    decode_image_bytes(&data, Some(&mime))
}

pub fn decode_image_bytes(data: &[u8], mime: Option<&str>) -> Option<DecodedImage> {
    let format = match mime {
        Some(m) if m.contains("png") => Some(image::ImageFormat::Png),
        Some(m) if m.contains("jpeg") || m.contains("jpg") => Some(image::ImageFormat::Jpeg),
        _ => image::guess_format(data).ok(),
    };
    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(data, format)
            .or_else(|_| image::load_from_memory(data)),
        None => image::load_from_memory(data),
    };
    let decoded = match decoded {
        Ok(img) => img,
        Err(err) => {
            log::warn!("image payload could not be decoded: {err}");
            return None;
        }
    };
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    Some(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        // Inline payloads are often wrapped across lines.
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}
