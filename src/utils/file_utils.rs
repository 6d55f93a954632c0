use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pixify::media::{filter_file, is_supported_path, EncodeOptions, ProcessingResult};
use pixify::Filter;

/// Suffix appended to the file stem of generated outputs.
const OUTPUT_SUFFIX: &str = "_output";

/// Represents an input file and where its filtered version goes.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaFile
{
	pub source_path: PathBuf,
	pub target_path: PathBuf,
}

/// Recursively find all files in a directory that match a predicate.
pub fn find_files_recursive<F>(directory: &Path, file_predicate: F) -> Result<Vec<PathBuf>>
where
	F: Fn(&Path) -> bool + Copy,
{
	let mut result: Vec<PathBuf> = Vec::new();
	collect_files_recursive(directory, &mut result, file_predicate)?;

	if result.is_empty()
	{
		return Err(anyhow!("No matching files found in the directory or subdirectories."));
	}

	result.sort();
	Ok(result)
}

/// Internal helper function to collect files recursively.
fn collect_files_recursive<F>(dir: &Path, files: &mut Vec<PathBuf>, file_predicate: F) -> Result<()>
where
	F: Fn(&Path) -> bool + Copy,
{
	if !dir.is_dir()
	{
		return Err(anyhow!("Not a directory: {}", dir.display()));
	}

	for entry in std::fs::read_dir(dir)?
	{
		let entry = entry?;
		let path: PathBuf = entry.path();

		if path.is_dir()
		{
			// Recursively process subdirectories.
			if let Err(e) = collect_files_recursive(&path, files, file_predicate)
			{
				// Log error but continue with other directories.
				eprintln!("Error processing directory {}: {}", path.display(), e);
			}
		}
		else if file_predicate(&path)
		{
			files.push(path);
		}
	}

	Ok(())
}

/// Find all supported images in a directory and its subdirectories, skipping earlier outputs.
pub fn find_media_files_in_dir(dir: Option<&Path>, inplace: bool) -> Result<Vec<MediaFile>>
{
	let directory: &Path = dir.unwrap_or_else(|| Path::new("."));
	let files: Vec<PathBuf> = find_files_recursive(directory, |path| is_supported_file(path) && !is_generated_output(path))?;

	Ok(prepare_media_files(&files, None, inplace))
}

/// Pair each input with its target path.
/// Inputs listed more than once are kept only once so no two workers write the same target.
pub fn prepare_media_files(files: &[PathBuf], output: Option<&Path>, inplace: bool) -> Vec<MediaFile>
{
	let mut seen_targets: HashSet<PathBuf> = HashSet::new();

	files.iter()
		.map(|path| MediaFile
		{
			source_path: path.clone(),
			target_path: match output
			{
				Some(output) => output.to_path_buf(),
				None if inplace => path.clone(),
				None => default_output_path(path),
			},
		})
		.filter(|file| seen_targets.insert(file.target_path.clone()))
		.collect()
}

/// `<dir>/<stem>_output.<ext>` for a given source.
pub fn default_output_path(source: &Path) -> PathBuf
{
	let stem: String = source.file_stem()
		.map(|s| s.to_string_lossy().to_string())
		.unwrap_or_default();

	let file_name: String = match source.extension()
	{
		Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
		None => format!("{}{}", stem, OUTPUT_SUFFIX),
	};

	source.with_file_name(file_name)
}

/// Checks if a file is a supported image by its extension.
pub fn is_supported_file(path: &Path) -> bool
{
	is_supported_path(path)
}

/// Checks if a file looks like something this tool wrote.
pub fn is_generated_output(path: &Path) -> bool
{
	path.file_stem()
		.map(|stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
		.unwrap_or(false)
}

/// Process a single file.
pub fn process_file(file: &MediaFile, filter: &Filter, options: EncodeOptions) -> Result<ProcessingResult>
{
	filter_file(&file.source_path, &file.target_path, filter, options)
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::fs;

	#[test]
	fn output_path_sits_next_to_source()
	{
		assert_eq!(default_output_path(Path::new("clips/test_Trim.gif")), PathBuf::from("clips/test_Trim_output.gif"));
		assert_eq!(default_output_path(Path::new("photo.JPG")), PathBuf::from("photo_output.JPG"));
	}

	#[test]
	fn recognizes_supported_extensions()
	{
		assert!(is_supported_file(Path::new("a.PNG")));
		assert!(is_supported_file(Path::new("b.tiff")));
		assert!(!is_supported_file(Path::new("c.mp4")));
		assert!(!is_supported_file(Path::new("png")));
	}

	#[test]
	fn target_paths_follow_mode()
	{
		let files = vec![PathBuf::from("a.png")];
		assert_eq!(prepare_media_files(&files, None, true)[0].target_path, PathBuf::from("a.png"));
		assert_eq!(prepare_media_files(&files, None, false)[0].target_path, PathBuf::from("a_output.png"));
		assert_eq!(prepare_media_files(&files, Some(Path::new("b.gif")), false)[0].target_path, PathBuf::from("b.gif"));
	}

	#[test]
	fn repeated_inputs_are_processed_once()
	{
		let files = vec![PathBuf::from("a.png"), PathBuf::from("b.png"), PathBuf::from("a.png")];
		let prepared = prepare_media_files(&files, None, false);
		let targets: Vec<PathBuf> = prepared.iter().map(|f| f.target_path.clone()).collect();
		assert_eq!(targets, vec![PathBuf::from("a_output.png"), PathBuf::from("b_output.png")]);
	}

	#[test]
	fn directory_scan_skips_outputs_and_other_files()
	{
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("nested");
		fs::create_dir(&nested).unwrap();
		for name in ["one.png", "one_output.png", "notes.txt"]
		{
			fs::write(dir.path().join(name), b"").unwrap();
		}
		fs::write(nested.join("two.gif"), b"").unwrap();

		let found = find_media_files_in_dir(Some(dir.path()), false).unwrap();
		let sources: Vec<PathBuf> = found.iter().map(|f| f.source_path.clone()).collect();
		assert_eq!(sources, vec![nested.join("two.gif"), dir.path().join("one.png")]);
		assert_eq!(found[1].target_path, dir.path().join("one_output.png"));
	}

	#[test]
	fn empty_directory_is_an_error()
	{
		let dir = tempfile::tempdir().unwrap();
		assert!(find_media_files_in_dir(Some(dir.path()), false).is_err());
	}
}
