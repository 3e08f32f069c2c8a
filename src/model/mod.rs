pub mod confidence;
pub mod detected;

pub use confidence::{Confidence, Similarity};
pub use detected::{DetectedCard, labels_of, sort_left_to_right};
