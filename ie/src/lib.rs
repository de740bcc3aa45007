//! Image engine: image primitives and the collaborators that turn field crops
//! into text, flags, owners and eidolon counts.

mod avatar;
mod eidolon;
mod pixels;
mod matching;
mod ocr;
mod recognize;

pub use avatar::{AvatarMatcher, Owner, OwnerIdentifier};
pub use eidolon::{EidolonState, count_eidolons, eidolon_state};
pub use pixels::*;
pub use matching::{ImageMatcher, MatchError, TemplateMatcher, best_score};
pub use ocr::PaddleOcr;
pub use recognize::{Layout, Preprocess, Recognition, TextRecognizer};
