use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::FilterError;

/// Running per-channel sums for one block.
#[derive(Debug, Clone, Copy, Default)]
struct BlockAccumulator
{
	sums: [u64; 4],
	count: u64,
}

impl BlockAccumulator
{
	fn add(&mut self, pixel: &Rgba<u8>)
	{
		for (sum, &channel) in self.sums.iter_mut().zip(pixel.0.iter())
		{
			*sum += channel as u64;
		}
		self.count += 1;
	}

	/// Truncating mean of each channel, alpha included.
	fn mean(&self) -> Rgba<u8>
	{
		if self.count == 0
		{
			return Rgba([0, 0, 0, 0]);
		}

		let mut mean: [u8; 4] = [0; 4];
		for (value, sum) in mean.iter_mut().zip(self.sums.iter())
		{
			*value = (sum / self.count) as u8;
		}

		Rgba(mean)
	}
}

/// Returns the (column, row) of the block containing pixel (x, y).
pub fn block_key(x: u32, y: u32, block_size: u32) -> (u32, u32)
{
	(x / block_size, y / block_size)
}

/// Layout of the square blocks covering an image.
///
/// Blocks on the right and bottom edges are narrower or shorter when the
/// image size is not a multiple of the block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid
{
	pub block_size: u32,
	pub columns: u32,
	pub rows: u32,
}

impl BlockGrid
{
	/// Create the grid for an image of the given size.
	pub fn new(width: u32, height: u32, block_size: u32) -> Result<Self, FilterError>
	{
		if block_size == 0
		{
			return Err(FilterError::invalid_argument("block size must be a positive integer"));
		}

		Ok(Self
		{
			block_size,
			columns: width.div_ceil(block_size),
			rows: height.div_ceil(block_size),
		})
	}

	/// Number of blocks in the grid.
	pub fn len(&self) -> usize
	{
		self.columns as usize * self.rows as usize
	}

	pub fn is_empty(&self) -> bool
	{
		self.len() == 0
	}

	/// Flat index of the block containing pixel (x, y).
	pub fn index(&self, x: u32, y: u32) -> usize
	{
		let (column, row): (u32, u32) = block_key(x, y, self.block_size);
		row as usize * self.columns as usize + column as usize
	}
}

/// Replace every block of `block_size` x `block_size` pixels with its average color.
///
/// The average is a truncating integer mean computed independently for red,
/// green, blue and alpha, over the pixels that actually belong to the block.
/// A block size of 1 returns a copy of the image; a block size at least as large
/// as both dimensions paints the whole image with its mean color.
pub fn pixelate(image: &RgbaImage, block_size: u32) -> Result<RgbaImage, FilterError>
{
	let (width, height): (u32, u32) = image.dimensions();
	let grid: BlockGrid = BlockGrid::new(width, height, block_size)?;

	if grid.is_empty()
	{
		return Ok(RgbaImage::new(width, height));
	}

	// Accumulate and resolve the mean of every block.
	let means: Vec<Rgba<u8>> = block_means(image, &grid);

	// Paint each output row from the resolved means.
	let mut output: RgbaImage = RgbaImage::new(width, height);
	let row_len: usize = width as usize * 4;
	let buffer: &mut [u8] = &mut output;

	buffer.par_chunks_mut(row_len).enumerate().for_each(|(y, row)|
	{
		for (x, pixel) in row.chunks_exact_mut(4).enumerate()
		{
			let mean: &Rgba<u8> = &means[grid.index(x as u32, y as u32)];
			pixel.copy_from_slice(&mean.0);
		}
	});

	Ok(output)
}

/// Compute the mean color of every block, in row-major block order.
///
/// Each worker owns the accumulators of a single block row.
fn block_means(image: &RgbaImage, grid: &BlockGrid) -> Vec<Rgba<u8>>
{
	let (width, height): (u32, u32) = image.dimensions();

	(0..grid.rows).into_par_iter().flat_map_iter(|block_row|
	{
		let mut accumulators: Vec<BlockAccumulator> = vec![BlockAccumulator::default(); grid.columns as usize];

		let top: u32 = block_row * grid.block_size;
		let bottom: u32 = top.saturating_add(grid.block_size).min(height);

		for y in top..bottom
		{
			for x in 0..width
			{
				accumulators[(x / grid.block_size) as usize].add(image.get_pixel(x, y));
			}
		}

		accumulators.into_iter().map(|accumulator| accumulator.mean())
	}).collect()
}
