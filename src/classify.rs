//! Path classification: where a file sits in the mission tree decides what it is.
//!
//! Only the folders between the mission directory and the file name count.
//! Family folders are checked in order `images`, `tactical`, `videos`, and
//! within a family the first subtype folder in enumeration order wins when
//! more than one is present.

use std::{
    ffi::OsStr,
    fs, io,
    path::{Component, Path, PathBuf},
};

use jiff::Timestamp;

use crate::model::{ImageSubtype, Product, ProductKind, TacticalSubtype};
use crate::scaffold::{IMAGES_DIR, MISSIONS_DIR, TACTICAL_DIR, VIDEOS_DIR};

/// Why a file couldn't be mapped to a product. Always per-file, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("{} is outside mission directory {}", path.display(), mission_root.display())]
    OutsideMission {
        path: PathBuf,
        mission_root: PathBuf,
    },

    #[error("failed to map product: {} is not under images/, tactical/ or videos/", path.display())]
    Unrecognized { path: PathBuf },

    #[error("failed to map product: {} is under {family}/ but not in a known subtype folder", path.display())]
    MissingSubtype { path: PathBuf, family: &'static str },

    #[error("failed to read modification time of {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("modification time of {} is out of range: {source}", path.display())]
    Timestamp {
        path: PathBuf,
        #[source]
        source: jiff::Error,
    },
}

/// Classifies a file on disk, stamping it with its last-modification time.
pub fn classify(path: &Path, mission_root: &Path) -> Result<Product, ClassifyError> {
    let relative =
        relative_to_mission(path, mission_root).ok_or_else(|| ClassifyError::OutsideMission {
            path: path.to_path_buf(),
            mission_root: mission_root.to_path_buf(),
        })?;

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ClassifyError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
    let timestamp = Timestamp::try_from(modified).map_err(|source| ClassifyError::Timestamp {
        path: path.to_path_buf(),
        source,
    })?;

    classify_relative(relative, timestamp)
}

/// The part of `path` below the mission directory.
///
/// Event paths can spell the root differently from how it was given (relative
/// vs absolute, through a symlink), so when the plain prefix doesn't match the
/// last `missions/<mission dir>` pair in `path` marks the mission directory.
fn relative_to_mission<'a>(path: &'a Path, mission_root: &Path) -> Option<&'a Path> {
    if let Ok(relative) = path.strip_prefix(mission_root) {
        return Some(relative);
    }

    let dir_name = mission_root.file_name()?;
    let components: Vec<Component<'_>> = path.components().collect();
    let at = components.windows(2).rposition(|pair| {
        pair[0] == Component::Normal(OsStr::new(MISSIONS_DIR))
            && pair[1] == Component::Normal(dir_name)
    })?;

    let mut anchor = PathBuf::new();
    anchor.extend(&components[..at + 2]);
    path.strip_prefix(anchor).ok()
}

/// Classifies a path relative to the mission directory. Touches no filesystem.
pub fn classify_relative(relative: &Path, timestamp: Timestamp) -> Result<Product, ClassifyError> {
    let folders: Vec<&str> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => name.to_str(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let kind = kind_from_folders(&folders).map_err(|miss| match miss {
        Miss::Family => ClassifyError::Unrecognized {
            path: relative.to_path_buf(),
        },
        Miss::Subtype(family) => ClassifyError::MissingSubtype {
            path: relative.to_path_buf(),
            family,
        },
    })?;

    Ok(Product { kind, timestamp })
}

enum Miss {
    Family,
    Subtype(&'static str),
}

fn kind_from_folders(folders: &[&str]) -> Result<ProductKind, Miss> {
    let has = |name: &str| folders.iter().any(|f| *f == name);

    if has(IMAGES_DIR) {
        ImageSubtype::ALL
            .into_iter()
            .find(|s| has(s.as_str()))
            .map(ProductKind::Image)
            .ok_or(Miss::Subtype(IMAGES_DIR))
    } else if has(TACTICAL_DIR) {
        TacticalSubtype::ALL
            .into_iter()
            .find(|s| has(s.as_str()))
            .map(ProductKind::Tactical)
            .ok_or(Miss::Subtype(TACTICAL_DIR))
    } else if has(VIDEOS_DIR) {
        Ok(ProductKind::Video)
    } else {
        Err(Miss::Family)
    }
}
