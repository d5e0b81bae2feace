/// Device RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    /// Parses `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(input: &str) -> Option<Rgb> {
        let hex = input.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_owned(),
            _ => return None,
        };

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(expanded.get(range)?, 16).ok().map(|v| f64::from(v) / 255.0)
        };
        Some(Rgb { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }

    /// Like [`Rgb::parse_hex`], falling back to `fallback` with a warning.
    pub fn parse_or(input: &str, fallback: Rgb) -> Rgb {
        Self::parse_hex(input).unwrap_or_else(|| {
            log::warn!("unrecognized color {input:?}; using fallback");
            fallback
        })
    }

    pub fn components(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}
