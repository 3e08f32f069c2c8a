pub mod capture_loop;

pub use capture_loop::{FramePipeline, FrameReport, run_capture_loop};
