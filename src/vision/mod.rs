pub mod contour;
pub mod extractor;
pub mod geometry;
pub mod rectify;
pub mod threshold;

pub use extractor::{CardExtractor, load_image};
pub use geometry::Point;
