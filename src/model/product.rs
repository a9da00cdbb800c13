//! Product types: what a collected file is.
//!
//! Every file the payload drops into the mission tree is one of three
//! product types. Imagery and tactical products carry a subtype from a
//! closed set; video never does.

use std::fmt;

use jiff::Timestamp;

/// Raised when a type/subtype combination is outside the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidProduct {
    #[error("invalid product type: {0}")]
    Type(String),

    #[error("invalid {kind} product subtype: {subtype}")]
    Subtype { kind: ProductType, subtype: String },

    #[error("{0} product requires a subtype")]
    MissingSubtype(ProductType),

    #[error("video product takes no subtype, got {0}")]
    UnexpectedSubtype(String),
}

/// The three product families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    Image,
    Tactical,
    Video,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Tactical => "tactical",
            Self::Video => "video",
        }
    }

    /// Parses the lowercase type name.
    pub fn parse(s: &str) -> Result<Self, InvalidProduct> {
        match s {
            "image" => Ok(Self::Image),
            "tactical" => Ok(Self::Tactical),
            "video" => Ok(Self::Video),
            other => Err(InvalidProduct::Type(other.to_string())),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Imaging sensor that produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSubtype {
    /// Electro-optical.
    Eo,
    /// Hyperspectral.
    Hs,
    /// Infrared.
    Ir,
}

impl ImageSubtype {
    /// Enumeration order. Classification picks the first match in this order.
    pub const ALL: [Self; 3] = [Self::Eo, Self::Hs, Self::Ir];

    /// Folder name under `images/`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eo => "EO",
            Self::Hs => "HS",
            Self::Ir => "IR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Kind of tactical product (fire detections and heat mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TacticalSubtype {
    Detection,
    /// Legacy subtype. Accepted when seen, never scaffolded.
    Dps,
    HeatPerimeter,
    IntenseHeat,
    IsolatedHeat,
    ScatteredHeat,
}

impl TacticalSubtype {
    /// Enumeration order. Classification picks the first match in this order.
    pub const ALL: [Self; 6] = [
        Self::Detection,
        Self::Dps,
        Self::HeatPerimeter,
        Self::IntenseHeat,
        Self::IsolatedHeat,
        Self::ScatteredHeat,
    ];

    /// Subtypes that get a folder in the mission scaffold.
    pub const SCAFFOLDED: [Self; 5] = [
        Self::Detection,
        Self::HeatPerimeter,
        Self::IntenseHeat,
        Self::IsolatedHeat,
        Self::ScatteredHeat,
    ];

    /// Folder name under `tactical/`, also used verbatim in object keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detection => "Detection",
            Self::Dps => "DPS",
            Self::HeatPerimeter => "HeatPerimeter",
            Self::IntenseHeat => "IntenseHeat",
            Self::IsolatedHeat => "IsolatedHeat",
            Self::ScatteredHeat => "ScatteredHeat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Type and subtype together. Subtypes can't be paired with the wrong type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKind {
    Image(ImageSubtype),
    Tactical(TacticalSubtype),
    Video,
}

impl ProductKind {
    pub fn product_type(self) -> ProductType {
        match self {
            Self::Image(_) => ProductType::Image,
            Self::Tactical(_) => ProductType::Tactical,
            Self::Video => ProductType::Video,
        }
    }

    /// Subtype name, `None` for video.
    pub fn subtype(self) -> Option<&'static str> {
        match self {
            Self::Image(s) => Some(s.as_str()),
            Self::Tactical(s) => Some(s.as_str()),
            Self::Video => None,
        }
    }
}

/// A classified file: what it is and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub kind: ProductKind,
    pub timestamp: Timestamp,
}

impl Product {
    /// Builds a product from raw type and subtype names.
    ///
    /// Fails when the subtype isn't in the closed set for the type,
    /// when image/tactical lack a subtype, or when video has one.
    pub fn new(
        product_type: ProductType,
        subtype: Option<&str>,
        timestamp: Timestamp,
    ) -> Result<Self, InvalidProduct> {
        let kind = match (product_type, subtype) {
            (ProductType::Video, None) => ProductKind::Video,
            (ProductType::Video, Some(s)) => {
                return Err(InvalidProduct::UnexpectedSubtype(s.to_string()));
            }
            (kind, None) => return Err(InvalidProduct::MissingSubtype(kind)),
            (ProductType::Image, Some(s)) => ImageSubtype::parse(s)
                .map(ProductKind::Image)
                .ok_or_else(|| InvalidProduct::Subtype {
                    kind: ProductType::Image,
                    subtype: s.to_string(),
                })?,
            (ProductType::Tactical, Some(s)) => TacticalSubtype::parse(s)
                .map(ProductKind::Tactical)
                .ok_or_else(|| InvalidProduct::Subtype {
                    kind: ProductType::Tactical,
                    subtype: s.to_string(),
                })?,
        };
        Ok(Self { kind, timestamp })
    }

    pub fn product_type(&self) -> ProductType {
        self.kind.product_type()
    }

    pub fn subtype(&self) -> Option<&'static str> {
        self.kind.subtype()
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subtype() {
            Some(subtype) => write!(
                f,
                "{} ({subtype}) at {}",
                self.product_type(),
                self.timestamp
            ),
            None => write!(f, "{} at {}", self.product_type(), self.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::new(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn every_taxonomy_pair_constructs() {
        for subtype in ImageSubtype::ALL {
            let product = Product::new(ProductType::Image, Some(subtype.as_str()), ts()).unwrap();
            assert_eq!(product.kind, ProductKind::Image(subtype));
        }
        for subtype in TacticalSubtype::ALL {
            let product =
                Product::new(ProductType::Tactical, Some(subtype.as_str()), ts()).unwrap();
            assert_eq!(product.kind, ProductKind::Tactical(subtype));
        }
        let video = Product::new(ProductType::Video, None, ts()).unwrap();
        assert_eq!(video.kind, ProductKind::Video);
        assert_eq!(video.subtype(), None);
    }

    #[test]
    fn subtype_from_other_family_is_rejected() {
        let err = Product::new(ProductType::Image, Some("Detection"), ts()).unwrap_err();
        assert!(matches!(
            err,
            InvalidProduct::Subtype {
                kind: ProductType::Image,
                ..
            }
        ));

        let err = Product::new(ProductType::Tactical, Some("EO"), ts()).unwrap_err();
        assert!(matches!(
            err,
            InvalidProduct::Subtype {
                kind: ProductType::Tactical,
                ..
            }
        ));
    }

    #[test]
    fn subtype_names_are_case_sensitive() {
        assert!(Product::new(ProductType::Image, Some("eo"), ts()).is_err());
        assert!(Product::new(ProductType::Tactical, Some("detection"), ts()).is_err());
    }

    #[test]
    fn video_with_subtype_is_rejected() {
        let err = Product::new(ProductType::Video, Some("EO"), ts()).unwrap_err();
        assert_eq!(err, InvalidProduct::UnexpectedSubtype("EO".into()));
    }

    #[test]
    fn missing_subtype_is_rejected() {
        assert_eq!(
            Product::new(ProductType::Image, None, ts()).unwrap_err(),
            InvalidProduct::MissingSubtype(ProductType::Image)
        );
        assert_eq!(
            Product::new(ProductType::Tactical, None, ts()).unwrap_err(),
            InvalidProduct::MissingSubtype(ProductType::Tactical)
        );
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        assert_eq!(
            ProductType::parse("audio").unwrap_err(),
            InvalidProduct::Type("audio".into())
        );
        assert_eq!(ProductType::parse("tactical").unwrap(), ProductType::Tactical);
    }

    #[test]
    fn equality_is_structural() {
        let a = Product::new(ProductType::Image, Some("IR"), ts()).unwrap();
        let b = Product::new(ProductType::Image, Some("IR"), ts()).unwrap();
        let later = Product::new(
            ProductType::Image,
            Some("IR"),
            Timestamp::new(1_700_000_001, 0).unwrap(),
        )
        .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, later);
    }
}
