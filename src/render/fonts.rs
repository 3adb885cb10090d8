//! Metrics and encoding for the PDF standard 14 Helvetica faces.
//!
//! Widths are the Adobe AFM advance widths in 1/1000 em for the
//! printable ASCII range (0x20..=0x7E). Everything else falls back to
//! a generic width, which is close enough for line wrapping.

/// A standard font face used by the PDF renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
}

impl FontFace {
    /// PostScript base font name.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used inside page content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
        }
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    pub fn glyph_width(self, code: u8) -> u16 {
        let table = match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match code {
            0x20..=0x7E => table[usize::from(code - 0x20)],
            BULLET => 350,
            _ => FALLBACK_WIDTH,
        }
    }

    /// Width of already-encoded text in 1/1000 em.
    pub fn text_width(self, encoded: &[u8]) -> u32 {
        encoded.iter().map(|&b| u32::from(self.glyph_width(b))).sum()
    }
}

/// WinAnsi code point of `•`.
pub const BULLET: u8 = 0x95;

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode text as WinAnsi (CP1252) bytes.
///
/// Characters with no WinAnsi code point become `?`; tabs become spaces.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => BULLET,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        '\u{00A0}'..='\u{00FF}' => c as u8,
        _ => b'?',
    }
}
