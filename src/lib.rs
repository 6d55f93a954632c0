//! Pixel-level filters for still images and animated frame sequences.
//!
//! The heart of the crate is [`pixelate::pixelate`], a block-averaging filter.
//! [`filter::Filter`] selects between it and the simpler per-pixel maps,
//! [`sequence::filter_frames`] runs a filter over every frame of an animation,
//! and [`media`] provides the decoders and encoders used by the `pixify` binary.

pub mod adjust;
pub mod error;
pub mod filter;
pub mod media;
pub mod pixelate;
pub mod sequence;

pub use error::FilterError;
pub use filter::Filter;
pub use sequence::{filter_frames, Frame};
