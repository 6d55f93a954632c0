use anyhow::{anyhow, Result};
use rayon::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pixify::media::{EncodeOptions, MediaKind, ProcessingResult};
use pixify::Filter;

mod utils
{
	pub mod arg_utils;
	pub mod file_utils;
	pub mod time_utils;
}
use utils::arg_utils::{Args, Mode, determine_mode};
use utils::file_utils::{MediaFile, is_supported_file, find_media_files_in_dir, prepare_media_files, process_file};
use utils::time_utils::{format_elapsed, format_frame_rate};


/// Apply a pixel-level filter to images and GIF animations.
fn main() -> Result<()>
{
	// Parse command line arguments.
	let args = Args::parse()?;

	// Validate parameters using the centralized validation method.
	args.validate()?;

	// Build the filter.
	let filter = Filter::from_name(&args.filter, args.block_size(), args.brightness())?;

	let options = EncodeOptions { optimize: args.optimize };

	// Determine the mode of operation.
	let mode = determine_mode(&args, is_supported_file)?;

	// Print the processing settings with logical grouping.
	println!("Settings:");
	println!("----------------------------------------");

	// 1. Input/Output Parameters.
	println!("INPUT/OUTPUT:");
	if let Some(dir) = &args.dir
	{
		println!("  - Directory: {}", dir.display());
	}
	let mode_desc = match &mode
	{
		Mode::Directory(_) => "Directory Mode",
		Mode::Files(_) => "Specific Files Mode",
	};
	println!("  - Mode: {}", mode_desc);
	println!("  - In-place: {}", if args.inplace { "Yes" } else { "No" });
	if let Some(output) = &args.output
	{
		println!("  - Output: {}", output.display());
	}

	// 2. Filter Parameters.
	println!("\nFILTER:");
	println!("  - Filter: {}", filter);
	match &filter
	{
		Filter::Pixelate { block_size } => println!("  - Block size: {} px (edge blocks may be smaller)", block_size),
		Filter::Brighten { strength } => println!("  - Strength: {:+}", strength),
		_ => {},
	}

	// 3. Output Processing Parameters.
	println!("\nOUTPUT PROCESSING:");
	println!("  - PNG optimization: {}", if args.optimize { "Yes (oxipng, Zopfli)" } else { "Off" });
	println!("----------------------------------------");
	println!();

	// Discover files to process.
	let media_files: Vec<MediaFile> = match mode
	{
		Mode::Directory(dir) =>
		{
			if let Some(d) = &dir
			{
				println!("Scanning directory '{}' for images...", d.display());
			}
			else
			{
				println!("Scanning current directory for images...");
			}

			find_media_files_in_dir(dir.as_deref(), args.inplace)?
		},
		Mode::Files(files) =>
		{
			println!("Processing {} specified files...", files.len());
			prepare_media_files(&files, args.output.as_deref(), args.inplace)
		},
	};

	// Display discovered files.
	println!("Found {} files to process:", media_files.len());
	for file in &media_files
	{
		if file.source_path == file.target_path
		{
			println!("  - {} (in-place)", file.source_path.display());
		}
		else
		{
			println!("  - {} -> {}", file.source_path.display(), file.target_path.display());
		}
	}
	println!();

	// Process each file in parallel.
	let results = Arc::new(Mutex::new(Vec::new()));
	let errors = Arc::new(Mutex::new(Vec::new()));

	println!("Processing files...");
	let started = Instant::now();

	// Create a progress counter.
	let total_files = media_files.len();
	let processed = Arc::new(Mutex::new(0));

	media_files.into_par_iter().for_each(|file|
	{
		let file_path_display = file.source_path.display().to_string();

		match process_file(&file, &filter, options)
		{
			Ok(result) =>
			{
				// Update the progress counter.
				let mut count = processed.lock().expect("Processed counter mutex poisoned");
				*count += 1;
				let current = *count;

				println!("[{}/{}] Filtered: {} -> {} | {}", current, total_files, file_path_display, file.target_path.display(), describe(&result));

				results.lock().expect("Results mutex poisoned").push(result);
			},
			Err(err) =>
			{
				eprintln!("Error processing {}: {}", file_path_display, err);
				errors.lock().expect("Errors mutex poisoned").push((file_path_display, err.to_string()));
			}
		}
	});

	let elapsed = started.elapsed();

	// Convert back to a regular Vec.
	let results: Vec<ProcessingResult> = Arc::try_unwrap(results)
		.map_err(|_| anyhow!("Results are still shared"))?
		.into_inner()
		.map_err(|_| anyhow!("Results mutex poisoned"))?;

	let errors: Vec<(String, String)> = Arc::try_unwrap(errors)
		.map_err(|_| anyhow!("Errors are still shared"))?
		.into_inner()
		.map_err(|_| anyhow!("Errors mutex poisoned"))?;

	// Print summary.
	println!("\n========================================");
	println!("FILTER SUMMARY");
	println!("========================================");
	println!("Filter: {}", filter);
	println!("Total files processed successfully: {}", results.len());

	if !errors.is_empty()
	{
		println!("Files with errors: {}", errors.len());
		println!("\nErrors:");
		for (file, error) in &errors
		{
			println!("  {}: {}", file, error);
		}
	}

	if !results.is_empty()
	{
		let animated_count = results.iter().filter(|r| r.info.kind == MediaKind::Animated).count();
		let total_frames: usize = results.iter().map(|r| r.frames).sum();
		let total_pixels: u64 = results.iter()
			.map(|r| r.info.width as u64 * r.info.height as u64 * r.frames as u64)
			.sum();

		println!("\nStill images: {}", results.len() - animated_count);
		println!("Animations: {}", animated_count);
		println!("Frames filtered: {}", total_frames);

		let total_original_size: u64 = results.iter().map(|r| r.original_size).sum();
		let total_new_size: u64 = results.iter().map(|r| r.new_size).sum();

		println!("\n----------------------------------------");
		println!("SIZE STATISTICS");
		println!("----------------------------------------");
		println!("Total input size:     {}", format_bytes(total_original_size));
		println!("Total output size:    {}", format_bytes(total_new_size));
		println!("Pixels processed:     {:.2} MP", total_pixels as f64 / 1_000_000.0);
	}

	println!("Elapsed: {}", format_elapsed(elapsed));
	println!("========================================");

	if !errors.is_empty() && results.is_empty()
	{
		return Err(anyhow!("No files could be processed"));
	}

	Ok(())
}

/// One-line description of a processed file.
fn describe(result: &ProcessingResult) -> String
{
	let size = format!("{}x{}", result.info.width, result.info.height);

	match result.info.kind
	{
		MediaKind::Still => format!("{} | {} -> {}", size, format_bytes(result.original_size), format_bytes(result.new_size)),
		MediaKind::Animated =>
		{
			let rate = result.frame_rate
				.map(format_frame_rate)
				.unwrap_or_else(|| "unknown rate".to_string());
			format!("{}, {} frames @ {} | {} -> {}", size, result.frames, rate, format_bytes(result.original_size), format_bytes(result.new_size))
		},
	}
}

/// Formats file size in human-readable format.
fn format_bytes(size: u64) -> String
{
	if size < 1024
	{
		format!("{} B", size)
	}
	else if size < 1024 * 1024
	{
		format!("{:.1} KB", size as f64 / 1024.0)
	}
	else
	{
		format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
	}
}
