use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

use crate::adjust;
use crate::error::FilterError;
use crate::pixelate;

/// User-supplied whole-image transform.
pub type CustomFn = dyn Fn(&RgbaImage) -> RgbaImage + Send + Sync;

/// A pixel-level filter that can be applied to an image.
#[derive(Clone)]
pub enum Filter
{
	/// Shades of gray from each pixel's lightness.
	Grayscale,

	/// Block averaging with square blocks of `block_size` pixels.
	Pixelate { block_size: u32 },

	/// Brightness offset added to every color channel.
	Brighten { strength: i16 },

	/// Arbitrary transform; must keep the image dimensions.
	Custom(Arc<CustomFn>),
}

impl Filter
{
	/// Pixelate filter, rejecting a zero block size.
	pub fn pixelate(block_size: u32) -> Result<Self, FilterError>
	{
		if block_size == 0
		{
			return Err(FilterError::invalid_argument("block size must be a positive integer"));
		}

		Ok(Filter::Pixelate { block_size })
	}

	/// Brighten filter, rejecting offsets outside -255..=255.
	pub fn brighten(strength: i16) -> Result<Self, FilterError>
	{
		adjust::validate_strength(strength)?;
		Ok(Filter::Brighten { strength })
	}

	pub fn custom<F>(transform: F) -> Self
	where
		F: Fn(&RgbaImage) -> RgbaImage + Send + Sync + 'static,
	{
		Filter::Custom(Arc::new(transform))
	}

	/// Build a filter from its command-line name.
	pub fn from_name(name: &str, block_size: u32, strength: i16) -> Result<Self, FilterError>
	{
		match name.to_lowercase().as_str()
		{
			"grayscale" | "greyscale" | "gray" | "bw" => Ok(Filter::Grayscale),
			"pixelate" | "pixify" => Filter::pixelate(block_size),
			"brighten" | "brightness" => Filter::brighten(strength),
			_ => Err(FilterError::invalid_argument(format!("unknown filter '{}'. Use: grayscale, pixelate or brighten", name))),
		}
	}

	/// Short display name.
	pub fn name(&self) -> &'static str
	{
		match self
		{
			Filter::Grayscale => "grayscale",
			Filter::Pixelate { .. } => "pixelate",
			Filter::Brighten { .. } => "brighten",
			Filter::Custom(_) => "custom",
		}
	}

	/// Apply the filter, returning a new image of the same size.
	pub fn apply(&self, image: &RgbaImage) -> Result<RgbaImage, FilterError>
	{
		match self
		{
			Filter::Grayscale => Ok(adjust::grayscale(image)),
			Filter::Pixelate { block_size } => pixelate::pixelate(image, *block_size),
			Filter::Brighten { strength } => adjust::brighten(image, *strength),
			Filter::Custom(transform) =>
			{
				let output: RgbaImage = transform(image);
				if output.dimensions() != image.dimensions()
				{
					return Err(FilterError::DimensionMismatch
					{
						frame: 0,
						expected: image.dimensions(),
						actual: output.dimensions(),
					});
				}

				Ok(output)
			},
		}
	}
}

impl fmt::Debug for Filter
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self
		{
			Filter::Grayscale => write!(f, "Grayscale"),
			Filter::Pixelate { block_size } => write!(f, "Pixelate {{ block_size: {} }}", block_size),
			Filter::Brighten { strength } => write!(f, "Brighten {{ strength: {} }}", strength),
			Filter::Custom(_) => write!(f, "Custom(..)"),
		}
	}
}

impl fmt::Display for Filter
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self
		{
			Filter::Pixelate { block_size } => write!(f, "pixelate ({}x{} blocks)", block_size, block_size),
			Filter::Brighten { strength } => write!(f, "brighten ({:+})", strength),
			_ => write!(f, "{}", self.name()),
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use image::Rgba;

	#[test]
	fn parses_names()
	{
		assert!(matches!(Filter::from_name("BW", 8, 0).unwrap(), Filter::Grayscale));
		assert!(matches!(Filter::from_name("pixify", 5, 0).unwrap(), Filter::Pixelate { block_size: 5 }));
		assert!(matches!(Filter::from_name("Brightness", 8, -12).unwrap(), Filter::Brighten { strength: -12 }));
		assert!(matches!(Filter::from_name("sepia", 8, 0), Err(FilterError::InvalidArgument(_))));
	}

	#[test]
	fn constructors_validate_parameters()
	{
		assert!(Filter::pixelate(0).is_err());
		assert!(Filter::from_name("pixelate", 0, 0).is_err());
		assert!(Filter::brighten(400).is_err());
	}

	#[test]
	fn dispatches_to_the_selected_transform()
	{
		let image = RgbaImage::from_pixel(2, 2, Rgba([40, 80, 120, 255]));

		let gray = Filter::Grayscale.apply(&image).unwrap();
		assert_eq!(*gray.get_pixel(0, 0), Rgba([80, 80, 80, 255]));

		let bright = Filter::brighten(10).unwrap().apply(&image).unwrap();
		assert_eq!(*bright.get_pixel(1, 1), Rgba([50, 90, 130, 255]));

		let blocky = Filter::pixelate(2).unwrap().apply(&image).unwrap();
		assert_eq!(blocky, image);
	}

	#[test]
	fn custom_filter_runs_user_function()
	{
		let invert = Filter::custom(|image: &RgbaImage|
		{
			let mut output = image.clone();
			for pixel in output.pixels_mut()
			{
				pixel.0 = [255 - pixel[0], 255 - pixel[1], 255 - pixel[2], pixel[3]];
			}
			output
		});

		let image = RgbaImage::from_pixel(3, 2, Rgba([0, 100, 255, 9]));
		let output = invert.apply(&image).unwrap();
		assert_eq!(*output.get_pixel(2, 1), Rgba([255, 155, 0, 9]));
		assert_eq!(invert.name(), "custom");
	}

	#[test]
	fn custom_filter_must_keep_dimensions()
	{
		let shrink = Filter::custom(|_: &RgbaImage| RgbaImage::new(1, 1));
		let image = RgbaImage::new(4, 3);
		assert_eq!(shrink.apply(&image), Err(FilterError::DimensionMismatch { frame: 0, expected: (4, 3), actual: (1, 1) }));
	}

	#[test]
	fn display_describes_parameters()
	{
		assert_eq!(Filter::pixelate(16).unwrap().to_string(), "pixelate (16x16 blocks)");
		assert_eq!(Filter::brighten(-5).unwrap().to_string(), "brighten (-5)");
		assert_eq!(Filter::Grayscale.to_string(), "grayscale");
	}
}
