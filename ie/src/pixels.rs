//! Image primitives.
//!
//! Field regions arrive as small owned RGB crops (`OwnedImage`). Collaborators
//! take a borrowed view (`Image<'a>`) so a crop is never copied to be inspected.

use anyhow::{Context, Result};

/// Owned RGB crop, row-major, no alpha.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            data: vec![color; (width * height) as usize],
        }
    }

    /// From tightly packed RGBA bytes; alpha is dropped.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();
        let height = data.len() / width.max(1);

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    pub fn from_dynamic(image: &image::DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        Self {
            width: rgb.width(),
            height: rgb.height(),
            data: rgb.pixels().map(|p| Color::new(p.0[0], p.0[1], p.0[2])).collect(),
        }
    }

    /// Decode a PNG (or any format `image` knows) held in memory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("decode image")?;
        Ok(Self::from_dynamic(&img))
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).with_context(|| format!("open image {}", path.display()))?;
        Ok(Self::from_dynamic(&img))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stretch to exactly `width` x `height`.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (self.width, self.height) == (width, height) {
            return self.clone();
        }

        let scaled = image::imageops::resize(
            &self.to_rgb_image(),
            width.max(1),
            height.max(1),
            image::imageops::FilterType::Triangle,
        );
        Self::from_dynamic(&image::DynamicImage::ImageRgb8(scaled))
    }

    /// Scale to `height`, keeping the aspect ratio.
    pub fn resized_h(&self, height: u32) -> Self {
        let height = height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64) as u32;
        self.resized(width, height)
    }

    pub fn as_image(&self) -> Image<'_> {
        Image {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        self.as_image().to_rgb_image()
    }

    pub fn to_gray_image(&self) -> image::GrayImage {
        self.as_image().to_gray_image()
    }

    /// Gray levels copied into all three channels.
    pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            data: gray
                .pixels()
                .map(|p| Color::new(p.0[0], p.0[0], p.0[0]))
                .collect(),
        }
    }
}

/// Borrowed view of an [`OwnedImage`].
#[derive(Clone, Copy)]
pub struct Image<'a> {
    width: u32,
    height: u32,
    data: &'a [Color],
}

impl Image<'_> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.data[(x + y * self.width) as usize]
    }

    /// `None` for an empty view.
    pub fn center_pixel(&self) -> Option<Color> {
        if self.is_empty() {
            return None;
        }
        Some(self.pixel(self.width / 2, self.height / 2))
    }

    pub fn to_owned_image(self) -> OwnedImage {
        OwnedImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }

    /// Packed RGB bytes, as the OCR engine takes them.
    pub fn get_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|c| c.to_array()).collect()
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(self.pixel(x, y).to_array()))
    }

    pub fn to_gray_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| image::Luma([self.pixel(x, y).luma()]))
    }
}

impl std::fmt::Debug for Image<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Image({}x{})", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Rec. 601 luma.
    pub fn luma(&self) -> u8 {
        ((299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32) / 1000) as u8
    }
}
