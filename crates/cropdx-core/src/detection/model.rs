use serde::{Deserialize, Serialize};

/// Box corners in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// One labeled, scored, localized model finding.
///
/// Fields are private so a detection cannot change after the upload client
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    label: String,
    score: f64,
    #[serde(flatten)]
    bounding_box: BoundingBox,
}

impl Detection {
    /// Builds a detection, refusing empty labels, scores outside `[0, 1]` and
    /// non-finite coordinates.
    pub fn new(label: impl Into<String>, score: f64, bounding_box: BoundingBox) -> Option<Self> {
        let label = label.into();
        if label.trim().is_empty() || !(0.0..=1.0).contains(&score) || !bounding_box.is_finite() {
            return None;
        }
        Some(Self {
            label,
            score,
            bounding_box,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Score as shown next to the label, e.g. `95.0%`.
    pub fn score_percent(&self) -> String {
        format!("{:.1}%", self.score * 100.0)
    }
}
