//! Equipped-character identification from the small avatar next to "Equipped".

use std::collections::HashMap;

use anyhow::{Context, Result};
use base64::Engine as _;
use image::GrayImage;

use crate::{Color, Image, OwnedImage, matching::best_score};

/// Side of the square the avatar crop is scaled to before matching.
const AVATAR_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Owner {
    pub name: String,
    /// Body variant for characters sharing a name (`M`/`F` for the Trailblazer).
    pub variant: Option<String>,
}

impl Owner {
    /// Split a vocabulary key such as `TrailblazerDestruction#F`.
    pub fn from_key(key: &str) -> Self {
        match key.split_once('#') {
            Some((name, variant)) => Self {
                name: name.to_owned(),
                variant: Some(variant.to_owned()),
            },
            None => Self {
                name: key.to_owned(),
                variant: None,
            },
        }
    }
}

pub trait OwnerIdentifier {
    fn identify(&self, avatar: Image<'_>) -> Result<Owner>;
}

pub struct AvatarMatcher {
    icons: Vec<(String, GrayImage)>,
}

impl AvatarMatcher {
    /// Decode and smooth the icon of every character key up front.
    ///
    /// `icons` maps icon ids (the key with everything but alphanumerics and `#`
    /// stripped) to base64 encoded images. Keys without an icon are skipped.
    pub fn new<S: AsRef<str>>(icons: &HashMap<String, String>, keys: &[S]) -> Result<Self> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let id = icon_id(key);
            let Some(encoded) = icons.get(&id) else {
                tracing::warn!(key, "no avatar icon");
                continue;
            };

            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .with_context(|| format!("base64 decode icon {id}"))?;
            let icon = OwnedImage::decode(&bytes).with_context(|| format!("decode icon {id}"))?;
            out.push((key.to_owned(), prepare_icon(&icon)));
        }

        Ok(Self { icons: out })
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

impl OwnerIdentifier for AvatarMatcher {
    fn identify(&self, avatar: Image<'_>) -> Result<Owner> {
        if avatar.is_empty() {
            anyhow::bail!("empty avatar crop");
        }

        let masked = circle_masked(&avatar.to_owned_image().resized(AVATAR_SIZE, AVATAR_SIZE));
        let gray = masked.to_gray_image();

        let mut best = ("", 0.0f32);
        for (key, icon) in &self.icons {
            let score = best_score(&gray, icon)?;
            if score > best.1 {
                best = (key.as_str(), score);
            }
        }

        tracing::debug!(key = best.0, score = best.1, "avatar match");
        Ok(Owner::from_key(best.0))
    }
}

fn icon_id(key: &str) -> String {
    key.chars().filter(|c| c.is_alphanumeric() || *c == '#').collect()
}

fn prepare_icon(icon: &OwnedImage) -> GrayImage {
    let blurred = imageproc::filter::gaussian_blur_f32(&icon.to_rgb_image(), 1.0);
    let blurred = OwnedImage::from_dynamic(&image::DynamicImage::ImageRgb8(blurred));
    let fitted = if blurred.width() > AVATAR_SIZE || blurred.height() > AVATAR_SIZE {
        blurred.resized(
            blurred.width().min(AVATAR_SIZE),
            blurred.height().min(AVATAR_SIZE),
        )
    } else {
        blurred
    };
    fitted.to_gray_image()
}

/// Black out everything outside the inscribed circle.
fn circle_masked(image: &OwnedImage) -> OwnedImage {
    let view = image.as_image();
    let (w, h) = (view.width(), view.height());
    let radius = w.min(h) as f32 / 2.0;

    let rgb = image::RgbImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - w as f32 / 2.0;
        let dy = y as f32 + 0.5 - h as f32 / 2.0;
        let c = if dx * dx + dy * dy <= radius * radius {
            view.pixel(x, y)
        } else {
            Color::BLACK
        };
        image::Rgb(c.to_array())
    });
    OwnedImage::from_dynamic(&image::DynamicImage::ImageRgb8(rgb))
}
