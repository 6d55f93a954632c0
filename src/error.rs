use thiserror::Error;

/// Errors raised by the filters themselves.
///
/// Codec and file-system failures are not represented here; they travel as
/// `anyhow::Error` through the media layer and abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError
{
	/// A filter parameter is outside its accepted range.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// A frame (or a custom filter result) does not have the expected size.
	#[error("dimension mismatch at frame {frame}: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
	DimensionMismatch
	{
		frame: usize,
		expected: (u32, u32),
		actual: (u32, u32),
	},
}

impl FilterError
{
	pub fn invalid_argument(message: impl Into<String>) -> Self
	{
		FilterError::InvalidArgument(message.into())
	}
}
