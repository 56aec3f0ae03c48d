//! Discover the functions and assets of a project directory.
//!
//! Functions live in `functions/` (or `src/`), assets in `assets/` (or
//! `static/`). The first existing candidate wins.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StratusError, StratusResult};
use crate::types::FileInfo;

pub const FUNCTION_DIRS: [&str; 2] = ["functions", "src"];
pub const ASSET_DIRS: [&str; 2] = ["assets", "static"];

/// File extension of deployable function handlers.
pub const FUNCTION_EXTENSION: &str = "js";

/// Local files of a project, ready for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    pub functions: Vec<FileInfo>,
    pub assets: Vec<FileInfo>,
}

/// Where to look for each kind of file.
#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    /// Use this folder instead of the `functions`/`src` candidates.
    pub functions_dir: Option<String>,
    /// Use this folder instead of the `assets`/`static` candidates.
    pub assets_dir: Option<String>,
    pub no_functions: bool,
    pub no_assets: bool,
}

/// List the functions and assets under `root`.
pub fn list_project_files(root: &Path, options: &ListingOptions) -> StratusResult<ProjectFiles> {
    let functions = if options.no_functions {
        Vec::new()
    } else {
        let dir = match &options.functions_dir {
            Some(dir) => first_matching_directory(root, &[dir.as_str()])?,
            None => first_matching_directory(root, &FUNCTION_DIRS)?,
        };
        list_files(&dir, Some(FUNCTION_EXTENSION))?
    };

    let assets = if options.no_assets {
        Vec::new()
    } else {
        let dir = match &options.assets_dir {
            Some(dir) => first_matching_directory(root, &[dir.as_str()])?,
            None => first_matching_directory(root, &ASSET_DIRS)?,
        };
        list_files(&dir, None)?
    };

    Ok(ProjectFiles { functions, assets })
}

/// Return the first candidate under `base` that is a directory.
pub fn first_matching_directory(base: &Path, candidates: &[&str]) -> StratusResult<PathBuf> {
    candidates
        .iter()
        .map(|dir| base.join(dir))
        .find(|path| path.is_dir())
        .ok_or_else(|| StratusError::DirectoryNotFound {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        })
}

/// Recursively list files under `dir`, sorted, named by `/`-separated relative path.
pub fn list_files(dir: &Path, extension: Option<&str>) -> StratusResult<Vec<FileInfo>> {
    let mut files = Vec::new();
    list_dir_recursive(dir, "", extension, &mut files)?;
    Ok(files)
}

fn list_dir_recursive(
    dir: &Path,
    base: &str,
    extension: Option<&str>,
    files: &mut Vec<FileInfo>,
) -> StratusResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| StratusError::io(dir, e))?;

    let mut sorted_entries: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StratusError::io(dir, e))?;
    sorted_entries.sort_by_key(|e| e.file_name());

    for entry in sorted_entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let rel_path = if base.is_empty() {
            name_str.to_string()
        } else {
            format!("{}/{}", base, name_str)
        };

        let path = entry.path();
        let ty = entry.file_type().map_err(|e| StratusError::io(&path, e))?;

        if ty.is_dir() {
            list_dir_recursive(&path, &rel_path, extension, files)?;
        } else if path.is_file() {
            // Symlinks to files are deployed like regular files.
            let wanted = match extension {
                Some(ext) => path.extension().is_some_and(|e| e == ext),
                None => true,
            };
            if wanted {
                files.push(FileInfo::from_path(rel_path, path));
            }
        }
    }

    Ok(())
}
