//! Decoders and encoders around the `image` crate.
//!
//! Still images go through `image::open` and are encoded in memory before a
//! single write; GIF files are read and written as frame sequences. PNG output
//! can optionally be passed through `oxipng` before it is written.

use anyhow::{anyhow, Result};
use image::codecs::gif::{GifDecoder, GifEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{AnimationDecoder, ColorType, DynamicImage, Frame as AnimationFrame, ImageDecoder, ImageFormat, RgbaImage};
use oxipng::{optimize_from_memory, Deflater, Options as OxiOptions};

use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::error::FilterError;
use crate::filter::Filter;
use crate::sequence::{self, Frame};

/// File extensions that can be both decoded and encoded.
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff"];

/// Whether a source holds one image or an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind
{
	Still,
	Animated,
}

/// Size and kind of a decoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo
{
	pub width: u32,
	pub height: u32,
	pub kind: MediaKind,
}

/// Output settings shared by all encoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions
{
	/// Losslessly optimize PNG output with oxipng.
	pub optimize: bool,
}

/// Produces the frames of a source in display order.
pub trait Decoder
{
	fn info(&self) -> MediaInfo;

	fn read_frames(self: Box<Self>) -> Result<Vec<Frame>>;
}

/// Accepts frames of a fixed size and writes them to a target.
pub trait Encoder
{
	fn write_frame(&mut self, frame: Frame) -> Result<()>;

	/// Serialize everything written so far.
	fn finish(self: Box<Self>) -> Result<()>;
}

/// Results of filtering one file.
#[derive(Debug)]
pub struct ProcessingResult
{
	pub info: MediaInfo,

	/// Number of frames written.
	pub frames: usize,

	/// Frames per second of an animated source.
	pub frame_rate: Option<f64>,

	/// The original file size in bytes.
	pub original_size: u64,

	/// The new file size in bytes.
	pub new_size: u64,
}

/// Open a decoder for `path`, chosen by its extension.
pub fn open_decoder(path: &Path) -> Result<Box<dyn Decoder>>
{
	if is_gif(path)
	{
		return Ok(Box::new(GifSource::open(path)?));
	}

	let image: RgbaImage = image::open(path)
		.map_err(|e| anyhow!("Failed to decode {}: {}", path.display(), e))?
		.to_rgba8();

	Ok(Box::new(StillSource { image }))
}

/// Create an encoder for `path` that accepts frames of the size in `info`.
pub fn create_encoder(path: &Path, info: MediaInfo, options: EncodeOptions) -> Result<Box<dyn Encoder>>
{
	if is_gif(path)
	{
		return Ok(Box::new(GifSink
		{
			path: path.to_path_buf(),
			width: info.width,
			height: info.height,
			frames: Vec::new(),
		}));
	}

	let format: ImageFormat = output_format(path)?;

	Ok(Box::new(StillSink
	{
		path: path.to_path_buf(),
		format,
		width: info.width,
		height: info.height,
		options,
		image: None,
	}))
}

/// Decode `source_path`, apply `filter` to every frame and write the result to `target_path`.
pub fn filter_file(source_path: &Path, target_path: &Path, filter: &Filter, options: EncodeOptions) -> Result<ProcessingResult>
{
	// Get the original file size.
	let original_size: u64 = fs::metadata(source_path)
		.map_err(|e| anyhow!("Failed to get file metadata: {}", e))?
		.len();

	let decoder: Box<dyn Decoder> = open_decoder(source_path)?;
	let info: MediaInfo = decoder.info();

	// Reject an unusable target before any frame is filtered.
	let mut encoder: Box<dyn Encoder> = create_encoder(target_path, info, options)?;

	let frames: Vec<Frame> = decoder.read_frames()?;

	if frames.is_empty()
	{
		return Err(anyhow!("No frames found in {}", source_path.display()));
	}

	let frame_rate: Option<f64> = match info.kind
	{
		MediaKind::Animated => sequence::frame_rate(&frames),
		MediaKind::Still => None,
	};

	// Filter every frame; order is preserved.
	let filtered: Vec<Frame> = sequence::filter_frames(frames, filter)?;
	let frame_count: usize = filtered.len();

	// Write frames in the order they were decoded.
	for frame in filtered
	{
		encoder.write_frame(frame)?;
	}
	encoder.finish()?;

	let new_size: u64 = fs::metadata(target_path)
		.map_err(|e| anyhow!("Failed to get output metadata: {}", e))?
		.len();

	Ok(ProcessingResult
	{
		info,
		frames: frame_count,
		frame_rate,
		original_size,
		new_size,
	})
}

/// Checks if a path has one of the supported extensions.
pub fn is_supported_path(path: &Path) -> bool
{
	path.extension()
		.map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
		.unwrap_or(false)
}

/// Still image format for an output path.
pub fn output_format(path: &Path) -> Result<ImageFormat>
{
	let ext: String = path.extension()
		.map(|ext| ext.to_string_lossy().to_lowercase())
		.unwrap_or_default();

	match ext.as_str()
	{
		"png" => Ok(ImageFormat::Png),
		"jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
		"bmp" => Ok(ImageFormat::Bmp),
		"gif" => Ok(ImageFormat::Gif),
		"tif" | "tiff" => Ok(ImageFormat::Tiff),
		_ => Err(anyhow!("Unsupported output format for {}. Use one of: {}", path.display(), SUPPORTED_EXTENSIONS.join(", "))),
	}
}

/// Checks if a path names a GIF file.
pub fn is_gif(path: &Path) -> bool
{
	path.extension()
		.map(|ext| ext.to_string_lossy().to_lowercase() == "gif")
		.unwrap_or(false)
}

fn check_frame_size(frame: &Frame, index: usize, width: u32, height: u32) -> Result<(), FilterError>
{
	if frame.dimensions() != (width, height)
	{
		return Err(FilterError::DimensionMismatch
		{
			frame: index,
			expected: (width, height),
			actual: frame.dimensions(),
		});
	}

	Ok(())
}

/// A single decoded image.
struct StillSource
{
	image: RgbaImage,
}

impl Decoder for StillSource
{
	fn info(&self) -> MediaInfo
	{
		MediaInfo
		{
			width: self.image.width(),
			height: self.image.height(),
			kind: MediaKind::Still,
		}
	}

	fn read_frames(self: Box<Self>) -> Result<Vec<Frame>>
	{
		Ok(vec![Frame::still(self.image)])
	}
}

/// An animated GIF, decoded lazily.
struct GifSource
{
	decoder: GifDecoder<BufReader<File>>,
	width: u32,
	height: u32,
}

impl GifSource
{
	fn open(path: &Path) -> Result<Self>
	{
		let file: File = File::open(path)
			.map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;

		let decoder = GifDecoder::new(BufReader::new(file))
			.map_err(|e| anyhow!("Failed to decode GIF {}: {}", path.display(), e))?;

		let (width, height): (u32, u32) = decoder.dimensions();

		Ok(Self { decoder, width, height })
	}
}

impl Decoder for GifSource
{
	fn info(&self) -> MediaInfo
	{
		MediaInfo
		{
			width: self.width,
			height: self.height,
			kind: MediaKind::Animated,
		}
	}

	fn read_frames(self: Box<Self>) -> Result<Vec<Frame>>
	{
		let frames: Vec<AnimationFrame> = self.decoder.into_frames()
			.collect_frames()
			.map_err(|e| anyhow!("Failed to decode GIF frames: {}", e))?;

		Ok(frames.into_iter()
			.map(|frame|
			{
				let delay = frame.delay();
				Frame::new(frame.into_buffer(), delay)
			})
			.collect())
	}
}

/// Writes exactly one frame as a still image.
struct StillSink
{
	path: PathBuf,
	format: ImageFormat,
	width: u32,
	height: u32,
	options: EncodeOptions,
	image: Option<RgbaImage>,
}

impl Encoder for StillSink
{
	fn write_frame(&mut self, frame: Frame) -> Result<()>
	{
		if self.image.is_some()
		{
			return Err(anyhow!("{} can only hold a single frame", self.path.display()));
		}

		check_frame_size(&frame, 0, self.width, self.height)?;
		self.image = Some(frame.image);

		Ok(())
	}

	fn finish(self: Box<Self>) -> Result<()>
	{
		let StillSink { path, format, options, image, .. } = *self;
		let image: RgbaImage = image
			.ok_or_else(|| anyhow!("No frame written to {}", path.display()))?;

		let dynamic_img: DynamicImage = match format
		{
			// JPEG has no alpha channel.
			ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8()),
			_ => DynamicImage::ImageRgba8(image),
		};

		// Encode in memory so the target is only touched once encoding succeeded.
		let mut buffer: Vec<u8> = Vec::new();
		{
			let mut cursor = Cursor::new(&mut buffer);
			let encoded = match format
			{
				// No TIFF variant in ImageOutputFormat, so use the encoder directly.
				ImageFormat::Tiff =>
				{
					let rgba = dynamic_img.to_rgba8();
					TiffEncoder::new(&mut cursor).encode(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)
				},
				_ => dynamic_img.write_to(&mut cursor, format),
			};
			encoded.map_err(|e| anyhow!("Failed to encode {}: {}", path.display(), e))?;
		}

		if format == ImageFormat::Png && options.optimize
		{
			buffer = optimize_png(&buffer)?;
		}

		fs::write(&path, &buffer)
			.map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))
	}
}

/// Collects frames and writes them as an animated GIF.
struct GifSink
{
	path: PathBuf,
	width: u32,
	height: u32,
	frames: Vec<AnimationFrame>,
}

impl Encoder for GifSink
{
	fn write_frame(&mut self, frame: Frame) -> Result<()>
	{
		check_frame_size(&frame, self.frames.len(), self.width, self.height)?;
		self.frames.push(AnimationFrame::from_parts(frame.image, 0, 0, frame.delay));

		Ok(())
	}

	fn finish(self: Box<Self>) -> Result<()>
	{
		let GifSink { path, frames, .. } = *self;
		if frames.is_empty()
		{
			return Err(anyhow!("No frames written to {}", path.display()));
		}

		// The trailer is written when the encoder is dropped.
		let mut buffer: Vec<u8> = Vec::new();
		{
			let mut encoder = GifEncoder::new(&mut buffer);
			encoder.encode_frames(frames)
				.map_err(|e| anyhow!("Failed to encode GIF: {}", e))?;
		}

		fs::write(&path, &buffer)
			.map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))
	}
}

/// Lossless PNG optimization with safe chunk stripping and Zopfli deflate.
fn optimize_png(png_data: &[u8]) -> Result<Vec<u8>>
{
	let mut options = OxiOptions::default();
	options.strip = oxipng::StripChunks::Safe;
	options.optimize_alpha = true;
	options.interlace = None;
	options.bit_depth_reduction = true;
	options.color_type_reduction = true;
	options.palette_reduction = true;
	options.deflater = Deflater::Zopfli(Default::default());

	optimize_from_memory(png_data, &options)
		.map_err(|e| anyhow!("Failed to optimize PNG: {}", e))
}

#[cfg(test)]
mod tests
{
	use super::*;
	use image::{Delay, Rgba};

	fn info(width: u32, height: u32, kind: MediaKind) -> MediaInfo
	{
		MediaInfo { width, height, kind }
	}

	#[test]
	fn unsupported_output_is_rejected_up_front()
	{
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out.webp");
		assert!(create_encoder(&path, info(2, 2, MediaKind::Still), EncodeOptions::default()).is_err());
		assert!(output_format(Path::new("noext")).is_err());
		assert_eq!(output_format(Path::new("a.TIF")).unwrap(), ImageFormat::Tiff);
		assert!(!path.exists());
	}

	#[test]
	fn failed_filter_leaves_no_target()
	{
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("a.png");
		RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])).save(&source).unwrap();

		let target = dir.path().join("a_output.webp");
		assert!(filter_file(&source, &target, &Filter::Grayscale, EncodeOptions::default()).is_err());
		assert!(!target.exists());
	}

	#[test]
	fn inplace_failure_keeps_original()
	{
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("keep.png");
		let image = RgbaImage::from_pixel(4, 2, Rgba([9, 8, 7, 255]));
		image.save(&path).unwrap();

		let shrink = Filter::custom(|_: &RgbaImage| RgbaImage::new(1, 1));
		assert!(filter_file(&path, &path, &shrink, EncodeOptions::default()).is_err());
		assert_eq!(image::open(&path).unwrap().to_rgba8(), image);
	}

	#[test]
	fn tiff_and_bmp_round_trip()
	{
		let dir = tempfile::tempdir().unwrap();
		let image = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 80, y as u8 * 90, 10, 255]));

		for name in ["still.tiff", "still.bmp"]
		{
			let path = dir.path().join(name);
			let mut encoder = create_encoder(&path, info(3, 2, MediaKind::Still), EncodeOptions::default()).unwrap();
			encoder.write_frame(Frame::still(image.clone())).unwrap();
			encoder.finish().unwrap();
			assert_eq!(image::open(&path).unwrap().to_rgba8(), image, "{}", name);
		}
	}

	#[test]
	fn detects_gif_extension()
	{
		assert!(is_gif(Path::new("clip.GIF")));
		assert!(!is_gif(Path::new("photo.png")));
		assert!(!is_gif(Path::new("gif")));
	}

	#[test]
	fn still_sink_rejects_wrong_size_and_second_frame()
	{
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out.png");
		let mut encoder = create_encoder(&path, info(2, 2, MediaKind::Still), EncodeOptions::default()).unwrap();

		let err = encoder.write_frame(Frame::still(RgbaImage::new(3, 2))).unwrap_err();
		assert_eq!(err.downcast_ref::<FilterError>(), Some(&FilterError::DimensionMismatch { frame: 0, expected: (2, 2), actual: (3, 2) }));

		encoder.write_frame(Frame::still(RgbaImage::new(2, 2))).unwrap();
		assert!(encoder.write_frame(Frame::still(RgbaImage::new(2, 2))).is_err());
	}

	#[test]
	fn still_round_trip_through_png()
	{
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("still.png");
		let image = RgbaImage::from_fn(5, 4, |x, y| Rgba([x as u8 * 50, y as u8 * 60, 30, 255 - x as u8]));

		let mut encoder = create_encoder(&path, info(5, 4, MediaKind::Still), EncodeOptions { optimize: true }).unwrap();
		encoder.write_frame(Frame::still(image.clone())).unwrap();
		encoder.finish().unwrap();

		let decoder = open_decoder(&path).unwrap();
		assert_eq!(decoder.info(), info(5, 4, MediaKind::Still));
		let frames = decoder.read_frames().unwrap();
		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].image, image);
	}

	#[test]
	fn gif_keeps_frame_order()
	{
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("anim.gif");
		let colors: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];

		let mut encoder = create_encoder(&path, info(4, 4, MediaKind::Animated), EncodeOptions::default()).unwrap();
		for color in colors.iter()
		{
			encoder.write_frame(Frame::new(RgbaImage::from_pixel(4, 4, Rgba(*color)), Delay::from_numer_denom_ms(100, 1))).unwrap();
		}
		encoder.finish().unwrap();

		let decoder = open_decoder(&path).unwrap();
		assert_eq!(decoder.info(), info(4, 4, MediaKind::Animated));
		let frames = decoder.read_frames().unwrap();
		assert_eq!(frames.len(), 3);
		// GIF palettes are quantized, so only check the dominant channel.
		for (index, frame) in frames.iter().enumerate()
		{
			let pixel = frame.image.get_pixel(1, 1);
			assert!(pixel[index] > 200, "frame {} has {:?}", index, pixel);
			assert!((0..3).filter(|&c| c != index).all(|c| pixel[c] < 50), "frame {} has {:?}", index, pixel);
		}
		assert_eq!(sequence::frame_rate(&frames), Some(10.0));
	}

	#[test]
	fn missing_input_is_an_error()
	{
		let dir = tempfile::tempdir().unwrap();
		assert!(open_decoder(&dir.path().join("absent.png")).is_err());
		assert!(open_decoder(&dir.path().join("absent.gif")).is_err());
	}
}
