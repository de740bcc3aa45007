//! Text recognition boundary.
//!
//! Callers describe *what* they expect (allowed glyphs, layout, preprocessing);
//! the recognizer decides how to get there.

use crate::Image;

/// How the text is laid out inside the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Several lines; line breaks are kept as `\n`.
    Block,
    Line,
    Char,
}

/// Preprocessing tuned for a particular widget of the game UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
    None,
    MainStat,
    SubStat,
    Equipped,
    LightConeLevel,
    Superimposition,
    CharacterLevel,
    TraceLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recognition {
    pub alphabet: &'static str,
    pub layout: Layout,
    pub preprocess: Preprocess,
}

impl Recognition {
    pub const fn new(alphabet: &'static str, layout: Layout, preprocess: Preprocess) -> Self {
        Self {
            alphabet,
            layout,
            preprocess,
        }
    }

    /// Drop every glyph outside the alphabet. Line breaks survive for block layouts.
    pub fn restrict(&self, text: &str) -> String {
        text.chars()
            .filter(|c| self.alphabet.contains(*c) || (*c == '\n' && self.layout == Layout::Block))
            .collect()
    }
}

/// Image region to candidate string. Blocking; timeouts are the implementor's concern.
pub trait TextRecognizer {
    fn recognize(&self, image: Image<'_>, request: &Recognition) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrict_keeps_alphabet_only() {
        let req = Recognition::new("0123456789S", Layout::Line, Preprocess::None);
        assert_eq!(req.restrict("+1S\n"), "1S");

        let req = Recognition::new("ATK", Layout::Block, Preprocess::SubStat);
        assert_eq!(req.restrict("ATK\n\nATx"), "ATK\n\nAT");
    }
}
