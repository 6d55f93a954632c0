use std::path::{Path, PathBuf};
use std::env;
use anyhow::{anyhow, Result};

use pixify::adjust::MAX_STRENGTH;
use pixify::media::output_format;

#[derive(Debug)]
pub struct Args
{
	// 1. Input/Output Parameters.
	/// Images or GIF animations to process. If not provided, the directory scan is used.
	pub files: Vec<PathBuf>,

	/// Directory to scan for supported images. If not provided, current directory is used.
	pub dir: Option<PathBuf>,

	/// Explicit output path, only valid for a single input file.
	pub output: Option<PathBuf>,

	/// Overwrite the input files instead of writing `<name>_output.<ext>` next to them.
	pub inplace: bool,

	// 2. Filter Parameters.
	/// Filter to apply: grayscale, pixelate or brighten.
	pub filter: String,

	/// Block size for the pixelate filter, in pixels.
	/// Kept signed so that negative values reach validation instead of failing to parse.
	pub block: i64,

	/// Brightness offset for the brighten filter (-255 to 255).
	pub strength: i64,

	// 3. Output Processing Parameters.
	/// Losslessly optimize PNG output with oxipng (slower, smaller files).
	pub optimize: bool,

	// 4. Program Metadata.
	/// Program version info.
	pub version: String,

	/// Program author info.
	pub author: String,

	/// Program description.
	pub about: String,
}

impl Args
{
	/// Create a new Args instance with default values.
	pub fn new() -> Self
	{
		Args
		{
			files: Vec::new(),
			dir: None,
			output: None,
			inplace: false,
			filter: "pixelate".to_string(),
			block: 8,
			strength: 32,
			optimize: false,
			version: env!("CARGO_PKG_VERSION").to_string(),
			author: env!("CARGO_PKG_AUTHORS").to_string(),
			about: env!("CARGO_PKG_DESCRIPTION").to_string(),
		}
	}

	/// Parse the process command line.
	pub fn parse() -> Result<Self>
	{
		// Skip the program name (first argument).
		let cli_args: Vec<String> = env::args().skip(1).collect();
		Self::parse_from(&cli_args)
	}

	/// Parse a list of arguments (without the program name) into an Args struct.
	pub fn parse_from(cli_args: &[String]) -> Result<Self>
	{
		let mut args: Args = Args::new();

		// Process arguments.
		let mut i: usize = 0;
		while i < cli_args.len()
		{
			let arg: &String = &cli_args[i];

			match arg.as_str()
			{
				// 1. Input/Output Parameters.
				"--dir" | "-D" =>
				{
					args.dir = Some(PathBuf::from(next_value(cli_args, &mut i, arg)?));
				}
				"--output" | "-o" =>
				{
					args.output = Some(PathBuf::from(next_value(cli_args, &mut i, arg)?));
				}
				"--inplace" | "-i" =>
				{
					args.inplace = true;
				}

				// 2. Filter Parameters.
				"--filter" | "-f" =>
				{
					args.filter = next_value(cli_args, &mut i, arg)?.to_string();
				}
				"--block" | "-b" =>
				{
					let value: &str = next_value(cli_args, &mut i, arg)?;
					args.block = value.parse::<i64>().map_err(|_| anyhow!("Invalid block size '{}': must be a positive integer", value))?;
				}
				"--strength" | "-s" =>
				{
					let value: &str = next_value(cli_args, &mut i, arg)?;
					args.strength = value.parse::<i64>().map_err(|_| anyhow!("Invalid strength '{}': must be an integer between -{} and {}", value, MAX_STRENGTH, MAX_STRENGTH))?;
				}

				// 3. Output Processing Parameters.
				"--optimize" | "-O" =>
				{
					args.optimize = true;
				}

				// 4. Program Information.
				"--help" | "-h" =>
				{
					print_help(&args);
					std::process::exit(0);
				}
				"--version" | "-V" =>
				{
					println!("{} {}", env!("CARGO_PKG_NAME"), args.version);
					std::process::exit(0);
				}

				// Anything else is treated as a file path if it doesn't start with "-".
				_ =>
				{
					if !arg.starts_with('-')
					{
						args.files.push(PathBuf::from(arg));
					}
					else
					{
						return Err(anyhow!("Unknown option: {}", arg));
					}
				}
			}

			i += 1;
		}

		Ok(args)
	}

	/// Validate parameter values and relationships.
	/// Returns Ok(()) if all parameters are valid, otherwise returns an error.
	pub fn validate(&self) -> Result<()>
	{
		// Validate block size.
		if self.block <= 0 || self.block > u32::MAX as i64
		{
			return Err(anyhow!("Block size must be a positive integer, got {}", self.block));
		}

		// Validate strength.
		if self.strength < -(MAX_STRENGTH as i64) || self.strength > MAX_STRENGTH as i64
		{
			return Err(anyhow!("Strength must be between -{} and {}", MAX_STRENGTH, MAX_STRENGTH));
		}

		// Validate output relationships.
		if self.output.is_some() && self.inplace
		{
			return Err(anyhow!("Cannot use --output and --inplace together"));
		}

		if self.output.is_some() && self.files.len() != 1
		{
			return Err(anyhow!("--output requires exactly one input file"));
		}

		// Validate that the output can be encoded.
		if let Some(output) = &self.output
		{
			output_format(output)?;
		}

		// All validations passed.
		Ok(())
	}

	/// Block size as accepted by the filter. Only meaningful after `validate`.
	pub fn block_size(&self) -> u32
	{
		self.block.clamp(0, u32::MAX as i64) as u32
	}

	/// Strength as accepted by the filter. Only meaningful after `validate`.
	pub fn brightness(&self) -> i16
	{
		self.strength.clamp(i16::MIN as i64, i16::MAX as i64) as i16
	}
}

/// Take the value following an option, advancing the cursor.
fn next_value<'a>(cli_args: &'a [String], i: &mut usize, arg: &str) -> Result<&'a str>
{
	if *i + 1 < cli_args.len()
	{
		*i += 1;
		Ok(cli_args[*i].as_str())
	}
	else
	{
		Err(anyhow!("Missing value for {} argument", arg))
	}
}

fn print_help(args: &Args)
{
	println!("{} - {}", args.about, args.version);
	println!("By {}", args.author);
	println!("\nUSAGE:");
	println!("    pixify [OPTIONS] [FILES...]");
	println!("\nOPTIONS:");
	// Input/Output Parameters.
	println!("  INPUT/OUTPUT:");
	println!("    -D, --dir <DIR>              Directory to scan for images (png, jpg, bmp, gif, tiff)");
	println!("    -o, --output <PATH>          Output path (single input only)");
	println!("    -i, --inplace                Overwrite the input files");
	println!("");
	// Filter Parameters.
	println!("  FILTER:");
	println!("    -f, --filter <NAME>          grayscale, pixelate or brighten (default: pixelate)");
	println!("    -b, --block <SIZE>           Block size for pixelate (default: 8)");
	println!("    -s, --strength <N>           Brightness offset for brighten, -255 to 255 (default: 32)");
	println!("");
	// Output Processing Parameters.
	println!("  OUTPUT PROCESSING:");
	println!("    -O, --optimize               Losslessly optimize PNG output");
	println!("");
	// General Options.
	println!("  GENERAL:");
	println!("    -h, --help                   Show help information");
	println!("    -V, --version                Display version information");
}

/// Enumeration representing the mode of operation.
pub enum Mode
{
	Directory(Option<PathBuf>),
	Files(Vec<PathBuf>),
}

/// Determines the mode of operation based on the provided arguments.
pub fn determine_mode(args: &Args, is_supported_file: fn(&Path) -> bool) -> Result<Mode>
{
	// If specific files are provided, they take precedence.
	if !args.files.is_empty()
	{
		// Validate each file.
		for path in &args.files
		{
			if !path.is_file() || !is_supported_file(path)
			{
				return Err(anyhow!("Input '{}' is not a supported image file.", path.display()));
			}
		}

		Ok(Mode::Files(args.files.clone()))
	}
	else // If no files are specified, use directory mode. Use the specified directory or default to current.
	{
		Ok(Mode::Directory(args.dir.clone()))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn parse(list: &[&str]) -> Result<Args>
	{
		let owned: Vec<String> = list.iter().map(|s| s.to_string()).collect();
		Args::parse_from(&owned)
	}

	#[test]
	fn defaults_are_valid()
	{
		let args = parse(&[]).unwrap();
		assert_eq!(args.filter, "pixelate");
		assert_eq!(args.block_size(), 8);
		assert!(!args.inplace);
		assert!(args.validate().is_ok());
	}

	#[test]
	fn parses_all_options()
	{
		let args = parse(&["-f", "brighten", "--strength", "-40", "-b", "3", "-O", "--output", "out.png", "in.png"]).unwrap();
		assert_eq!(args.filter, "brighten");
		assert_eq!(args.brightness(), -40);
		assert_eq!(args.block_size(), 3);
		assert!(args.optimize);
		assert_eq!(args.output, Some(PathBuf::from("out.png")));
		assert_eq!(args.files, vec![PathBuf::from("in.png")]);
		assert!(args.validate().is_ok());
	}

	#[test]
	fn rejects_non_positive_block_size()
	{
		assert!(parse(&["--block", "0"]).unwrap().validate().is_err());
		assert!(parse(&["--block", "-4"]).unwrap().validate().is_err());
		assert!(parse(&["--block", "four"]).is_err());
	}

	#[test]
	fn rejects_bad_combinations()
	{
		assert!(parse(&["-s", "300"]).unwrap().validate().is_err());
		assert!(parse(&["-o", "out.png", "-i", "in.png"]).unwrap().validate().is_err());
		assert!(parse(&["-o", "out.png", "a.png", "b.png"]).unwrap().validate().is_err());
		assert!(parse(&["-o", "out.png"]).unwrap().validate().is_err());
	}

	#[test]
	fn rejects_unsupported_output_extension()
	{
		assert!(parse(&["-o", "out.webp", "in.png"]).unwrap().validate().is_err());
		assert!(parse(&["-o", "out", "in.png"]).unwrap().validate().is_err());
		assert!(parse(&["-o", "out.TIFF", "in.png"]).unwrap().validate().is_ok());
	}

	#[test]
	fn reports_missing_values_and_unknown_options()
	{
		assert!(parse(&["--filter"]).is_err());
		assert!(parse(&["--frobnicate"]).is_err());
	}
}
