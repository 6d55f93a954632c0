use image::{Delay, RgbaImage};
use rayon::prelude::*;

use crate::error::FilterError;
use crate::filter::Filter;

/// One image of a sequence together with how long it is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame
{
	pub image: RgbaImage,
	pub delay: Delay,
}

impl Frame
{
	pub fn new(image: RgbaImage, delay: Delay) -> Self
	{
		Self { image, delay }
	}

	/// A frame without display timing, as used for still images.
	pub fn still(image: RgbaImage) -> Self
	{
		Self::new(image, Delay::from_numer_denom_ms(0, 1))
	}

	pub fn dimensions(&self) -> (u32, u32)
	{
		self.image.dimensions()
	}

	/// Display time in milliseconds.
	pub fn delay_ms(&self) -> f64
	{
		let (numer, denom): (u32, u32) = self.delay.numer_denom_ms();
		if denom == 0
		{
			return 0.0;
		}

		numer as f64 / denom as f64
	}
}

/// Frames per second implied by the first frame's delay, if it has one.
pub fn frame_rate(frames: &[Frame]) -> Option<f64>
{
	let delay_ms: f64 = frames.first()?.delay_ms();
	if delay_ms <= 0.0
	{
		return None;
	}

	Some(1000.0 / delay_ms)
}

/// Check that every frame has the size of the first one.
pub fn validate_dimensions(frames: &[Frame]) -> Result<(), FilterError>
{
	let Some(first) = frames.first() else
	{
		return Ok(());
	};

	let expected: (u32, u32) = first.dimensions();
	for (index, frame) in frames.iter().enumerate().skip(1)
	{
		if frame.dimensions() != expected
		{
			return Err(FilterError::DimensionMismatch
			{
				frame: index,
				expected,
				actual: frame.dimensions(),
			});
		}
	}

	Ok(())
}

/// Apply `filter` to every frame, keeping their order and delays.
///
/// All frames must share one size; the first frame that differs is reported
/// before any filtering happens.
pub fn filter_frames(frames: Vec<Frame>, filter: &Filter) -> Result<Vec<Frame>, FilterError>
{
	validate_dimensions(&frames)?;

	frames.into_par_iter().enumerate().map(|(index, frame)| -> Result<Frame, FilterError>
	{
		let image: RgbaImage = filter.apply(&frame.image).map_err(|err| match err
		{
			FilterError::DimensionMismatch { expected, actual, .. } => FilterError::DimensionMismatch { frame: index, expected, actual },
			other => other,
		})?;

		Ok(Frame::new(image, frame.delay))
	}).collect()
}
