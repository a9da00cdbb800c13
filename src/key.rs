//! Object key derivation.
//!
//! Keys follow the grammar the downstream consumers parse:
//!
//! ```text
//! [<prefix>/]<FOLDER>/<YYYYMMDD_HHMMSS>Z_<mission>_<label><ext>
//! [<prefix>/]MISSION/<mission>_<YYYYMMDD_HHMM>Z.txt
//! ```

use std::path::Path;

use crate::model::{ImageSubtype, Mission, Product, ProductKind};

/// Top-level folder for a product family.
pub fn folder(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::Image(_) => "IMAGERY",
        ProductKind::Tactical(_) => "TACTICAL",
        ProductKind::Video => "VIDEO",
    }
}

/// Subtype label as it appears in the key.
pub fn label(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::Image(ImageSubtype::Eo) => "EOimage",
        ProductKind::Image(ImageSubtype::Hs) => "HSimage",
        ProductKind::Image(ImageSubtype::Ir) => "IRimage",
        ProductKind::Tactical(subtype) => subtype.as_str(),
        ProductKind::Video => "Video",
    }
}

/// Derives the destination key for a classified product.
///
/// `extension` includes its leading dot (see [`file_extension`]).
/// An empty prefix is the same as none.
pub fn object_key(
    mission_name: &str,
    product: &Product,
    extension: &str,
    prefix: Option<&str>,
) -> String {
    let key = format!(
        "{}/{}_{mission_name}_{}{extension}",
        folder(product.kind),
        product.timestamp.strftime("%Y%m%d_%H%M%SZ"),
        label(product.kind),
    );
    with_prefix(prefix, key)
}

/// Key of the empty object that announces a mission.
pub fn mission_marker_key(mission: &Mission, prefix: Option<&str>) -> String {
    let key = format!(
        "MISSION/{}_{}Z.txt",
        mission.name(),
        mission.start().strftime("%Y%m%d_%H%M")
    );
    with_prefix(prefix, key)
}

/// The final extension with its dot (`.tif`), or empty when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn with_prefix(prefix: Option<&str>, key: String) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{key}"),
        None => key,
    }
}
