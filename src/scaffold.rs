//! Mission directory scaffolding.
//!
//! The payload operator drops files into a fixed tree:
//!
//! ```text
//! <root>/missions/<mission dir>/
//!   images/{EO,HS,IR}/
//!   tactical/{Detection,HeatPerimeter,IntenseHeat,IsolatedHeat,ScatteredHeat}/
//!   videos/
//! ```
//!
//! The folder names are exactly what the classifier looks for.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::model::{ImageSubtype, Mission, TacticalSubtype};

pub const MISSIONS_DIR: &str = "missions";
pub const IMAGES_DIR: &str = "images";
pub const TACTICAL_DIR: &str = "tactical";
pub const VIDEOS_DIR: &str = "videos";

/// Creates the mission tree under `root` and returns the mission directory.
///
/// Existing directories are left alone, so re-running for the same mission is harmless.
pub fn create_scaffold(root: &Path, mission: &Mission) -> io::Result<PathBuf> {
    let mission_dir = root.join(MISSIONS_DIR).join(mission.dir_name());

    for subtype in ImageSubtype::ALL {
        fs::create_dir_all(mission_dir.join(IMAGES_DIR).join(subtype.as_str()))?;
    }
    for subtype in TacticalSubtype::SCAFFOLDED {
        fs::create_dir_all(mission_dir.join(TACTICAL_DIR).join(subtype.as_str()))?;
    }
    fs::create_dir_all(mission_dir.join(VIDEOS_DIR))?;

    Ok(mission_dir)
}
