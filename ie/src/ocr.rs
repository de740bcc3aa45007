//! OCR backed by `ocr-rs` (Rust PaddleOCR bindings).
//!
//! The engine has no glyph whitelist, so crops are preprocessed per widget and
//! the result is restricted to the requested alphabet afterwards.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{Image, Layout, OwnedImage, Preprocess, Recognition, TextRecognizer};

/// OCR generally performs better on larger glyphs.
const MIN_HEIGHT: u32 = 80;

pub struct PaddleOcr {
    engine: ocr_rs::OcrEngine,
}

impl PaddleOcr {
    /// Initialize the OCR engine with the given model paths.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charset: impl AsRef<Path>,
    ) -> Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count: thread_count as i32,
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine")?;

        Ok(Self { engine })
    }
}

impl TextRecognizer for PaddleOcr {
    fn recognize(&self, image: Image<'_>, request: &Recognition) -> Result<String> {
        if image.is_empty() {
            anyhow::bail!("empty crop");
        }

        let mut prepared = prepare(image, request.preprocess);
        if prepared.height() < MIN_HEIGHT {
            prepared = prepared.resized_h(MIN_HEIGHT);
        }

        let view = prepared.as_image();
        let input = ocr_rs::preprocess::rgb_to_image(&view.get_bytes(), view.width(), view.height());
        let results = self
            .engine
            .recognize(&input)
            .map_err(|err| anyhow::anyhow!("recognition failed: {err:?}"))?;

        let separator = match request.layout {
            Layout::Block => "\n",
            Layout::Line | Layout::Char => " ",
        };
        let text = results
            .into_iter()
            .map(|v| v.text)
            .collect::<Vec<_>>()
            .join(separator);

        tracing::trace!(?request, raw = %text, "ocr");
        Ok(request.restrict(&text))
    }
}

/// Binarize a crop the way the given widget needs it.
fn prepare(image: Image<'_>, preprocess: Preprocess) -> OwnedImage {
    use imageproc::contrast::{ThresholdType, equalize_histogram, otsu_level, threshold};

    match preprocess {
        Preprocess::None => image.to_owned_image(),
        // Light text on a dark panel.
        Preprocess::MainStat | Preprocess::SubStat | Preprocess::Equipped | Preprocess::CharacterLevel => {
            let gray = image.to_gray_image();
            let level = otsu_level(&gray);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(threshold(&gray, level, ThresholdType::Binary)))
        }
        // Small glyphs on a gradient badge.
        Preprocess::LightConeLevel | Preprocess::Superimposition | Preprocess::TraceLevel => {
            let gray = equalize_histogram(&image.to_gray_image());
            let level = otsu_level(&gray);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(threshold(&gray, level, ThresholdType::Binary)))
        }
    }
}

fn ensure_dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
    // If the image is mostly black, invert it so background becomes light.
    let white = bin.pixels().filter(|p| p.0[0] > 0).count();
    let black = (bin.width() * bin.height()) as usize - white;
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_prepare_inverts_light_text_on_dark() {
        // a bright 2px vertical stroke on a dark panel
        let mut bytes = Vec::new();
        for _y in 0..10u32 {
            for x in 0..10u32 {
                let c = if (4..6).contains(&x) { 240 } else { 20 };
                bytes.extend_from_slice(&[c, c, c, 255]);
            }
        }
        let text = OwnedImage::from_rgba(10, &bytes);

        let out = prepare(text.as_image(), Preprocess::SubStat);
        assert_eq!(out.as_image().pixel(0, 0), Color::WHITE);
        assert_eq!(out.as_image().pixel(4, 5), Color::BLACK);
    }
}
