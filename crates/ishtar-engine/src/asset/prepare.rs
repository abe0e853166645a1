use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageReader};

use super::error::AssetError;

/// Largest accepted image width or height, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Decoded image ready for upload by the renderer.
///
/// Pixels are tightly packed RGBA8 with premultiplied alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub width:  u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decoded audio as interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuffer {
    pub samples:     Vec<f32>,
    pub channels:    u16,
    pub sample_rate: u32,
}

impl SoundBuffer {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.channels as f32 / self.sample_rate as f32
    }
}

/// Ready-to-use handle stored by the registry once an asset is `Available`.
///
/// Text assets never get a handle; see [`StartupContext`].
///
/// [`StartupContext`]: super::StartupContext
#[derive(Debug, Clone)]
pub enum AssetHandle {
    Image(Arc<PreparedImage>),
    Audio(Arc<SoundBuffer>),
}

impl AssetHandle {
    pub fn as_image(&self) -> Option<&PreparedImage> {
        match self {
            AssetHandle::Image(img) => Some(img),
            AssetHandle::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&SoundBuffer> {
        match self {
            AssetHandle::Audio(snd) => Some(snd),
            AssetHandle::Image(_) => None,
        }
    }
}

/// Kind-specific preparation step for decoded images.
///
/// Runs on a loader thread. GPU-side work (atlas packing, texture upload)
/// belongs to the renderer; implementations only shape pixels for it.
pub trait ImagePreparer: Send + Sync {
    fn prepare(&self, name: &str, image: DynamicImage) -> Result<PreparedImage, AssetError>;
}

/// Default preparer: converts to RGBA8 and premultiplies alpha.
#[derive(Debug, Default, Copy, Clone)]
pub struct Rgba8Preparer;

impl ImagePreparer for Rgba8Preparer {
    fn prepare(&self, _name: &str, image: DynamicImage) -> Result<PreparedImage, AssetError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixels = rgba.into_raw();

        for px in pixels.chunks_exact_mut(4) {
            let a = px[3] as u16;
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }

        Ok(PreparedImage { width, height, pixels })
    }
}

/// Decodes `bytes` as an image, enforcing [`MAX_IMAGE_DIMENSION`], then runs
/// `preparer` on the result.
///
/// Dimensions are read from the header first so oversized images are
/// rejected without decoding their pixels.
pub(crate) fn prepare_image(
    name: &str,
    bytes: &[u8],
    preparer: &dyn ImagePreparer,
) -> Result<PreparedImage, AssetError> {
    let unsupported = |reason: String| AssetError::UnsupportedImage {
        name: name.to_string(),
        reason,
    };

    let (w, h) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| unsupported(e.to_string()))?
        .into_dimensions()
        .map_err(|e| unsupported(e.to_string()))?;

    if w > MAX_IMAGE_DIMENSION || h > MAX_IMAGE_DIMENSION {
        return Err(unsupported(format!(
            "{w}x{h} exceeds {MAX_IMAGE_DIMENSION}x{MAX_IMAGE_DIMENSION}"
        )));
    }

    let image = image::load_from_memory(bytes).map_err(|e| unsupported(e.to_string()))?;
    preparer.prepare(name, image)
}

/// Decodes WAV bytes into a [`SoundBuffer`].
pub(crate) fn prepare_audio(name: &str, bytes: &[u8]) -> Result<SoundBuffer, AssetError> {
    let unsupported = |reason: String| AssetError::UnsupportedAudio {
        name: name.to_string(),
        reason,
    };

    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| unsupported(e.to_string()))?;
    let spec = reader.spec();

    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect()
        }
    };

    let samples = samples.map_err(|e| unsupported(e.to_string()))?;

    Ok(SoundBuffer {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// 16-bit mono 44.1kHz WAV with four samples.
    pub const WAV_BYTES: &[u8] = &[
        82, 73, 70, 70, 52, 0, 0, 0, 87, 65, 86, 69, 102, 109, 116, 32, 16, 0, 0, 0, 1, 0, 1, 0,
        68, 172, 0, 0, 136, 88, 1, 0, 2, 0, 16, 0, 100, 97, 116, 97, 8, 0, 0, 0, 0, 12, 204, 251,
        51, 13, 205, 243,
    ];

    /// Encodes a solid `w`x`h` PNG.
    pub fn png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba(color));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("png encode");
        out
    }

    /// PNG with a valid header claiming `w`x`h` and no real pixel data.
    ///
    /// Enough for a header-only dimension probe.
    pub fn png_header_only(w: u32, h: u32) -> Vec<u8> {
        let mut out = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&w.to_be_bytes());
        ihdr.extend_from_slice(&h.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]); // 8-bit RGBA, deflate, no filter, no interlace

        push_chunk(&mut out, b"IHDR", &ihdr);
        push_chunk(&mut out, b"IDAT", &[0x78, 0x9c]);
        push_chunk(&mut out, b"IEND", &[]);
        out
    }

    fn push_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(ty);
        out.extend_from_slice(data);

        let mut crc_input = ty.to_vec();
        crc_input.extend_from_slice(data);
        out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xffff_ffffu32;
        for &b in bytes {
            crc ^= b as u32;
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xedb8_8320 & mask);
            }
        }
        !crc
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    // ── images ────────────────────────────────────────────────────────────

    #[test]
    fn small_png_is_prepared() {
        let bytes = png(100, 100, [255, 0, 0, 255]);
        let img = prepare_image("font", &bytes, &Rgba8Preparer).unwrap();
        assert_eq!((img.width, img.height), (100, 100));
        assert_eq!(img.pixels.len(), 100 * 100 * 4);
        assert_eq!(&img.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn alpha_is_premultiplied() {
        let bytes = png(2, 2, [200, 100, 50, 0]);
        let img = prepare_image("clear", &bytes, &Rgba8Preparer).unwrap();
        assert_eq!(&img.pixels[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn max_dimension_is_inclusive() {
        let bytes = png_header_only(MAX_IMAGE_DIMENSION, 1);
        let err = prepare_image("edge", &bytes, &Rgba8Preparer).unwrap_err();
        // Passes the size gate, then fails to decode the missing pixel data.
        match err {
            AssetError::UnsupportedImage { reason, .. } => assert!(!reason.contains("exceeds")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oversized_image_is_rejected_before_decode() {
        let bytes = png_header_only(5000, 5000);
        let err = prepare_image("huge", &bytes, &Rgba8Preparer).unwrap_err();
        match err {
            AssetError::UnsupportedImage { name, reason } => {
                assert_eq!(name, "huge");
                assert!(reason.contains("5000x5000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_unsupported_image() {
        let err = prepare_image("junk", &[1, 2, 3, 4], &Rgba8Preparer).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedImage { .. }));
    }

    // ── audio ─────────────────────────────────────────────────────────────

    #[test]
    fn wav_is_decoded() {
        let snd = prepare_audio("beep", WAV_BYTES).unwrap();
        assert_eq!(snd.sample_rate, 44100);
        assert_eq!(snd.channels, 1);
        assert_eq!(snd.samples.len(), 4);
        assert!(snd.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn invalid_wav_is_unsupported_audio() {
        let err = prepare_audio("beep", &[0, 1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedAudio { .. }));
    }
}
