//! Positioned-character collection device.
//!
//! Implements [`pdf_extract::OutputDev`] to record every character a page
//! draws, converted from PDF user space (y grows upward from the media
//! box origin) to top-left-origin page coordinates so areas can be
//! expressed the way the codebook geometry is published.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use crate::PageChar;

/// Collects positioned characters for a single rendered page.
#[derive(Debug, Default)]
pub(crate) struct CharCollector {
    /// Top edge of the current page in user-space units (`media_box.ury`).
    page_top: f64,
    /// Left edge of the current page in user-space units (`media_box.llx`).
    page_left: f64,
    chars: Vec<PageChar>,
}

impl CharCollector {
    /// Consumes the collector and returns the recorded characters.
    pub(crate) fn into_chars(self) -> Vec<PageChar> {
        self.chars
    }
}

impl OutputDev for CharCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page_top = media_box.ury;
        self.page_left = media_box.llx;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        // Whitespace the page draws explicitly carries no cell content;
        // intra-cell spacing is re-derived geometrically during grid
        // assembly.
        if text.trim().is_empty() {
            return Ok(());
        }

        // Effective font size under the text-rendering matrix: the side
        // of a square with the same area as the transformed (size, size)
        // vector, matching pdf-extract's own plain-text heuristic.
        let fx = font_size * (trm.m11 + trm.m21);
        let fy = font_size * (trm.m12 + trm.m22);
        let size = (fx * fy).abs().sqrt();

        self.chars.push(PageChar {
            x: trm.m31 - self.page_left,
            y: self.page_top - trm.m32,
            width: width * size,
            font_size: size,
            text: text.to_owned(),
        });

        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
