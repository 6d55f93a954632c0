use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::FilterError;

/// Largest accepted brightness offset, in either direction.
pub const MAX_STRENGTH: i16 = 255;

/// Convert the image to shades of gray.
///
/// Each pixel takes its HSL lightness, `(max + min) / 2` of the color channels.
/// Alpha is kept as is.
pub fn grayscale(image: &RgbaImage) -> RgbaImage
{
	map_pixels(image, |pixel|
	{
		let [r, g, b, a]: [u8; 4] = pixel.0;
		let max: u16 = r.max(g).max(b) as u16;
		let min: u16 = r.min(g).min(b) as u16;
		let lightness: u8 = ((max + min) / 2) as u8;
		Rgba([lightness, lightness, lightness, a])
	})
}

/// Shift red, green and blue by `strength`, saturating at 0 and 255.
pub fn brighten(image: &RgbaImage, strength: i16) -> Result<RgbaImage, FilterError>
{
	validate_strength(strength)?;

	Ok(map_pixels(image, |pixel|
	{
		let [r, g, b, a]: [u8; 4] = pixel.0;
		Rgba([shift(r, strength), shift(g, strength), shift(b, strength), a])
	}))
}

/// Check that a brightness offset is within `-MAX_STRENGTH..=MAX_STRENGTH`.
pub fn validate_strength(strength: i16) -> Result<(), FilterError>
{
	if !(-MAX_STRENGTH..=MAX_STRENGTH).contains(&strength)
	{
		return Err(FilterError::invalid_argument(format!("brightness strength must be between -{} and {}, got {}", MAX_STRENGTH, MAX_STRENGTH, strength)));
	}

	Ok(())
}

fn shift(channel: u8, strength: i16) -> u8
{
	(channel as i16 + strength).clamp(0, 255) as u8
}

/// Apply a per-pixel map row by row in parallel.
fn map_pixels<F>(image: &RgbaImage, map: F) -> RgbaImage
where
	F: Fn(&Rgba<u8>) -> Rgba<u8> + Sync,
{
	let (width, height): (u32, u32) = image.dimensions();
	let mut output: RgbaImage = RgbaImage::new(width, height);

	if width == 0 || height == 0
	{
		return output;
	}

	let row_len: usize = width as usize * 4;
	let source: &[u8] = image;
	let target: &mut [u8] = &mut output;

	target.par_chunks_mut(row_len).zip(source.par_chunks(row_len)).for_each(|(target_row, source_row)|
	{
		for (out, pixel) in target_row.chunks_exact_mut(4).zip(source_row.chunks_exact(4))
		{
			let mapped: Rgba<u8> = map(&Rgba([pixel[0], pixel[1], pixel[2], pixel[3]]));
			out.copy_from_slice(&mapped.0);
		}
	});

	output
}
