//! Metrics and encoding for the standard Helvetica font.

/// Resource name of the body font on every page and in the form defaults.
pub const BODY_FONT: &str = "Helv";
/// Resource name of the symbol font used by checkbox and radio widgets.
pub const SYMBOL_FONT: &str = "ZaDb";

/// Font-unit metrics, per 1000 units of em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub line_height: f64,
}

pub const HELVETICA: FontMetrics = FontMetrics { ascent: 718.0, descent: 207.0, line_height: 1.2 };

impl FontMetrics {
    pub fn ascent_at(&self, size: f64) -> f64 {
        self.ascent / 1000.0 * size
    }

    pub fn descent_at(&self, size: f64) -> f64 {
        self.descent / 1000.0 * size
    }

    /// Advance width of `text` at `size`, in points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = encode_win_ansi(text).0.iter().map(|&byte| glyph_width(byte)).sum();
        f64::from(units) / 1000.0 * size
    }
}

/// Helvetica advance widths for the printable ASCII range 0x20..=0x7E.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

const DEFAULT_WIDTH: u32 = 556;

fn glyph_width(byte: u8) -> u32 {
    match byte {
        0x20..=0x7E => u32::from(ASCII_WIDTHS[usize::from(byte - 0x20)]),
        _ => DEFAULT_WIDTH,
    }
}

/// Encodes `text` for a WinAnsi simple font.
///
/// Characters outside the encoding become `?`. The flag reports whether any
/// substitution happened.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, bool) {
    let mut lossy = false;
    let bytes = text
        .chars()
        .map(|c| {
            win_ansi_byte(c).unwrap_or_else(|| {
                lossy = true;
                b'?'
            })
        })
        .collect();
    (bytes, lossy)
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ => match c {
            '\t' => Some(b' '),
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}
