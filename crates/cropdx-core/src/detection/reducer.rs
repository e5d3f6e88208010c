use std::collections::HashMap;

use super::model::Detection;

/// Keeps one detection per label: the highest score, the first one on ties.
///
/// Output follows the order in which each label first appears in `raw`.
pub fn reduce(raw: &[Detection]) -> Vec<Detection> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut reduced: Vec<Detection> = Vec::new();

    for detection in raw {
        match slots.get(detection.label()) {
            Some(&index) => {
                if detection.score() > reduced[index].score() {
                    reduced[index] = detection.clone();
                }
            }
            None => {
                slots.insert(detection.label(), reduced.len());
                reduced.push(detection.clone());
            }
        }
    }

    reduced
}
