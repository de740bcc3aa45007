//! Template matching.
//!
//! Scores are zero-mean normalized cross-correlation (`1.0` is a perfect match,
//! `0.0` no correlation), evaluated at every placement of the needle.

use image::GrayImage;

use crate::Image;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("needle {needle:?} does not fit into haystack {haystack:?}")]
    NeedleTooLarge {
        needle: (u32, u32),
        haystack: (u32, u32),
    },
    #[error("cannot match against an empty image")]
    Empty,
}

/// Does `needle` appear in `haystack` with at least `confidence`?
pub trait ImageMatcher {
    fn locate(&self, needle: Image<'_>, haystack: Image<'_>, confidence: f32) -> Result<bool, MatchError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMatcher;

impl ImageMatcher for TemplateMatcher {
    fn locate(&self, needle: Image<'_>, haystack: Image<'_>, confidence: f32) -> Result<bool, MatchError> {
        let score = best_score(&haystack.to_gray_image(), &needle.to_gray_image())?;
        tracing::trace!(score, confidence, "template match");
        Ok(score >= confidence)
    }
}

/// Highest correlation of `needle` over all placements inside `haystack`.
pub fn best_score(haystack: &GrayImage, needle: &GrayImage) -> Result<f32, MatchError> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();
    if hw == 0 || hh == 0 || nw == 0 || nh == 0 {
        return Err(MatchError::Empty);
    }
    if nw > hw || nh > hh {
        return Err(MatchError::NeedleTooLarge {
            needle: (nw, nh),
            haystack: (hw, hh),
        });
    }

    let count = (nw * nh) as f32;
    let needle_mean = needle.pixels().map(|p| p.0[0] as f32).sum::<f32>() / count;
    let needle_dev = needle.pixels().map(|p| p.0[0] as f32 - needle_mean).collect::<Vec<_>>();
    let needle_norm = needle_dev.iter().map(|v| v * v).sum::<f32>();

    let mut best = f32::MIN;
    for oy in 0..=(hh - nh) {
        for ox in 0..=(hw - nw) {
            let mut sum = 0.0f32;
            for y in 0..nh {
                for x in 0..nw {
                    sum += haystack.get_pixel(ox + x, oy + y).0[0] as f32;
                }
            }
            let window_mean = sum / count;

            let mut cross = 0.0f32;
            let mut window_norm = 0.0f32;
            for y in 0..nh {
                for x in 0..nw {
                    let w = haystack.get_pixel(ox + x, oy + y).0[0] as f32 - window_mean;
                    cross += w * needle_dev[(x + y * nw) as usize];
                    window_norm += w * w;
                }
            }

            let denom = (needle_norm * window_norm).sqrt();
            let score = if denom > f32::EPSILON { cross / denom } else { 0.0 };
            best = best.max(score);
        }
    }

    Ok(best)
}
