use crate::serde_util::{lenient_f64, lenient_f64_opt};
use serde::{Deserialize, Serialize};

/// A run of text extracted from an imported PDF page, used for annotation hit testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpan {
    pub text: String,
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(with = "lenient_f64")]
    pub width_norm: f64,
    #[serde(with = "lenient_f64")]
    pub height_norm: f64,
    #[serde(with = "lenient_f64")]
    pub font_size: f64,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub ascent_ratio: Option<f64>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub descent_ratio: Option<f64>,
}

impl TextSpan {
    /// Whether the normalized point falls inside this span's box.
    pub fn contains(&self, x_norm: f64, y_norm: f64) -> bool {
        x_norm >= self.x_norm
            && x_norm <= self.x_norm + self.width_norm
            && y_norm >= self.y_norm_top
            && y_norm <= self.y_norm_top + self.height_norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive_of_edges() {
        let span = TextSpan {
            text: "Total".to_owned(),
            x_norm: 0.25,
            y_norm_top: 0.5,
            width_norm: 0.25,
            height_norm: 0.125,
            font_size: 12.0,
            page_index: 0,
            ascent_ratio: Some(0.8),
            descent_ratio: None,
        };

        assert!(span.contains(0.25, 0.5));
        assert!(span.contains(0.5, 0.625));
        assert!(!span.contains(0.51, 0.55));
    }
}
