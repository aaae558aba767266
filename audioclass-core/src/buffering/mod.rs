//! Window segmentation of decoded audio.
//!
//! `segment` borrows an `AudioSamples` and yields `Window` views sized to a
//! classifier's required input length. No sample data is copied unless a
//! short window is zero-padded.

pub mod window;

pub use window::{offset_secs, segment, window_count, ClassifyMode, ShortWindowPolicy, Window, Windows};
