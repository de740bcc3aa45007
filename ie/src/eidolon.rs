//! Eidolon slot states from the eidolon screen.
//!
//! A locked slot is dimmed, so its edges are soft. An unlocked but inactive
//! slot still shows the orange activation ring.

use imageproc::filter::laplacian_filter;

use crate::{Color, Image};

/// Laplacian variance below which a slot counts as dimmed.
const SHARPNESS_MIN: f64 = 10_000.0;
/// Inclusive RGB bounds of the activation ring.
const RING_LOW: Color = Color::new(127, 104, 51);
const RING_HIGH: Color = Color::new(210, 175, 100);
/// Ring pixels above which the slot is waiting to be activated.
const RING_PIXELS_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EidolonState {
    Locked,
    Inactive,
    Active,
}

pub fn eidolon_state(image: Image<'_>) -> EidolonState {
    if image.is_empty() || sharpness(image) < SHARPNESS_MIN {
        return EidolonState::Locked;
    }
    if ring_pixels(image) > RING_PIXELS_MAX {
        return EidolonState::Inactive;
    }
    EidolonState::Active
}

/// Active eidolons: slots are read in order and counting stops at the first
/// one that is not active.
pub fn count_eidolons<'a>(slots: impl IntoIterator<Item = Image<'a>>) -> i64 {
    slots
        .into_iter()
        .take_while(|v| eidolon_state(*v) == EidolonState::Active)
        .count() as i64
}

/// Variance of the Laplacian of the gray image.
fn sharpness(image: Image<'_>) -> f64 {
    let edges = laplacian_filter(&image.to_gray_image());
    let count = (edges.width() * edges.height()) as f64;
    let mean = edges.pixels().map(|p| p.0[0] as f64).sum::<f64>() / count;
    edges.pixels().map(|p| (p.0[0] as f64 - mean).powi(2)).sum::<f64>() / count
}

fn ring_pixels(image: Image<'_>) -> usize {
    let mut count = 0;
    for y in 0..image.height() {
        for x in 0..image.width() {
            let c = image.pixel(x, y);
            let inside = (RING_LOW.r..=RING_HIGH.r).contains(&c.r)
                && (RING_LOW.g..=RING_HIGH.g).contains(&c.g)
                && (RING_LOW.b..=RING_HIGH.b).contains(&c.b);
            if inside {
                count += 1;
            }
        }
    }
    count
}
