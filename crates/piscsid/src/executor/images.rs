//! Read-only view of the image folder.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use piscsi_interface::{DeviceType, ImageFile, ImageFilesInfo};

use super::ExecutorError;

/// Folder searched for image files until an operator changes it.
pub(crate) fn default_image_folder() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("images"), |home| {
        PathBuf::from(home).join("images")
    })
}

/// Device type implied by an image file extension.
pub(crate) fn device_type_for_file(name: &str) -> Option<DeviceType> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "hd1" | "hds" | "hda" | "hdi" | "hdn" | "nhd" => Some(DeviceType::Schd),
        "hdr" => Some(DeviceType::Scrm),
        "mos" => Some(DeviceType::Scmo),
        "iso" | "is1" => Some(DeviceType::Sccd),
        _ => None,
    }
}

pub(crate) fn ensure_folder(folder: &Path) -> Result<(), ExecutorError> {
    match fs::metadata(folder) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(ExecutorError::FolderNotFound {
            folder: folder.to_path_buf(),
        }),
    }
}

/// Describes `name` inside `folder`.
pub(crate) fn image_file(folder: &Path, name: &str) -> Result<ImageFile, ExecutorError> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(ExecutorError::InvalidFileName {
            name: name.to_owned(),
        });
    }
    let path = folder.join(relative);
    let metadata = fs::metadata(&path).map_err(|source| ExecutorError::ImageFile {
        path: path.clone(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(ExecutorError::ImageFile {
            path,
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    Ok(ImageFile {
        name: name.to_owned(),
        device_type: device_type_for_file(name),
        size: metadata.len(),
        read_only: metadata.permissions().readonly(),
    })
}

/// Lists the regular, non-hidden files of `folder` ordered by name.
///
/// A missing folder yields an empty listing.
pub(crate) fn image_files(folder: &Path) -> Result<ImageFilesInfo, ExecutorError> {
    let mut image_files = Vec::new();
    match fs::read_dir(folder) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                if let Ok(file) = image_file(folder, &name) {
                    image_files.push(file);
                }
            }
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ExecutorError::ImageFile {
                path: folder.to_path_buf(),
                source,
            });
        }
    }
    image_files.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(ImageFilesInfo {
        default_image_folder: folder.display().to_string(),
        image_files,
    })
}
