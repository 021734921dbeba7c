//! Classes, package patterns and resource patterns that must survive native compilation.
//!
//! The compiled-in [`Inventory::default`] covers the BoofCV surface used by the QR code
//! service. Projects can export it with `native-prep inventory`, extend the TOML, and
//! point `[emit].inventory` (or `--inventory`) at the edited file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

const BOOFCV_CLASSES: &[&str] = &[
    // image types
    "boofcv.struct.image.GrayU8",
    "boofcv.struct.image.GrayF32",
    "boofcv.struct.image.GrayS16",
    "boofcv.struct.image.GrayS32",
    "boofcv.struct.image.GrayF64",
    "boofcv.struct.image.ImageGray",
    "boofcv.struct.image.ImageBase",
    "boofcv.struct.image.ImageInterleaved",
    "boofcv.struct.image.Planar",
    // geometry
    "boofcv.struct.geo.Point2D_F64",
    "boofcv.struct.geo.Point2D_F32",
    "boofcv.struct.geo.Point2D_I32",
    "boofcv.struct.geo.Point3D_F64",
    "boofcv.struct.geo.PointIndex2D_F64",
    // qr codes
    "boofcv.alg.fiducial.qrcode.QrCode",
    "boofcv.alg.fiducial.qrcode.QrCodeDetector",
    "boofcv.alg.fiducial.qrcode.QrCodePositionPatternDetector",
    "boofcv.alg.fiducial.qrcode.QrCodeAlignmentPatternLocator",
    "boofcv.alg.fiducial.qrcode.QrCodeBinaryGridReader",
    "boofcv.alg.fiducial.qrcode.QrCodeCodeWordLocations",
    "boofcv.alg.fiducial.qrcode.QrCodeDecoderImage",
    "boofcv.alg.fiducial.qrcode.QrCodeMaskPattern",
    "boofcv.factory.fiducial.ConfigQrCode",
    "boofcv.factory.fiducial.FactoryFiducial",
    // shape detection
    "boofcv.alg.shapes.polyline.splitmerge.PolylineSplitMerge",
    "boofcv.alg.shapes.polyline.splitmerge.PolylineSplitMerge$Corner",
    "boofcv.alg.shapes.polygon.BinaryPolygonDetector",
    "boofcv.alg.shapes.polygon.DetectPolygonBinaryGrayRefine",
    "boofcv.alg.shapes.polygon.DetectPolygonFromContour",
    // image processing
    "boofcv.alg.filter.binary.BinaryImageOps",
    "boofcv.alg.filter.binary.ThresholdImageOps",
    "boofcv.alg.filter.binary.Contour",
    "boofcv.alg.filter.binary.LinearContourLabelChang2004",
    "boofcv.alg.misc.GImageMiscOps",
    "boofcv.io.image.ConvertBufferedImage",
    // configuration structs
    "boofcv.struct.ConnectRule",
    "boofcv.struct.ConfigLength",
    "boofcv.struct.Configuration",
    // arrays
    "boofcv.struct.image.GrayU8[]",
    "boofcv.struct.image.GrayF32[]",
    "boofcv.struct.geo.Point2D_F64[]",
    "boofcv.alg.shapes.polyline.splitmerge.PolylineSplitMerge$Corner[]",
];

const BOOFCV_PATTERNS: &[&str] = &[
    "boofcv.alg.**",
    "boofcv.struct.**",
    "boofcv.factory.**",
    "boofcv.io.**",
];

const BOOFCV_RESOURCES: &[&str] = &[
    r".*\.properties$",
    "META-INF/.*",
    "boofcv/.*",
    r".*\.xml$",
    r".*\.txt$",
    r".*\.dat$",
];

/// What the emitter must cover. Entry order is preserved in the emitted artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Fully-qualified class names; `[]` suffix marks array types.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Glob-style package patterns such as `boofcv.alg.**`.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Regular expressions matched against resource paths.
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            classes: to_owned(BOOFCV_CLASSES),
            patterns: to_owned(BOOFCV_PATTERNS),
            resources: to_owned(BOOFCV_RESOURCES),
        }
    }
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let raw = fs::read_to_string(path).map_err(|source| InventoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let inventory: Inventory = toml::from_str(&raw).map_err(|source| InventoryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        inventory.check_names()?;
        Ok(inventory)
    }

    /// Loads `path` when given, otherwise returns the compiled-in inventory.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, InventoryError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn check_names(&self) -> Result<(), InventoryError> {
        for (list, entries) in [
            ("classes", &self.classes),
            ("patterns", &self.patterns),
            ("resources", &self.resources),
        ] {
            if let Some(index) = entries.iter().position(|entry| entry.trim().is_empty()) {
                return Err(InventoryError::EmptyName { list, index });
            }
        }
        Ok(())
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn default_inventory_has_unique_names() {
        let inventory = Inventory::default();
        let mut seen = HashSet::new();
        for name in inventory.classes.iter().chain(&inventory.patterns) {
            assert!(seen.insert(name.as_str()), "duplicate name {name}");
        }
        assert_eq!(inventory.classes.len(), 42);
        assert_eq!(inventory.patterns.len(), 4);
        assert_eq!(inventory.resources.len(), 6);
    }

    #[test]
    fn default_inventory_includes_array_and_nested_types() {
        let inventory = Inventory::default();
        assert!(
            inventory
                .classes
                .iter()
                .any(|name| name == "boofcv.alg.shapes.polyline.splitmerge.PolylineSplitMerge$Corner[]")
        );
        assert!(inventory.classes.iter().any(|name| name == "boofcv.struct.image.GrayU8[]"));
    }

    #[test]
    fn loads_partial_inventory_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("inventory.toml");
        fs::write(
            &path,
            r#"
classes = ["pkg.Foo"]
patterns = ["pkg.**"]
"#,
        )
        .unwrap();

        let inventory = Inventory::load(&path).unwrap();
        assert_eq!(inventory.classes, vec!["pkg.Foo"]);
        assert_eq!(inventory.patterns, vec!["pkg.**"]);
        assert!(inventory.resources.is_empty());
    }

    #[test]
    fn rejects_blank_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("inventory.toml");
        fs::write(&path, "patterns = [\"pkg.**\", \"  \"]\n").unwrap();

        let err = Inventory::load(&path).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::EmptyName {
                list: "patterns",
                index: 1
            }
        ));
    }

    #[test]
    fn exported_toml_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("inventory.toml");
        fs::write(&path, Inventory::default().to_toml().unwrap()).unwrap();
        assert_eq!(Inventory::load(&path).unwrap(), Inventory::default());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Inventory::load(Path::new("/nonexistent/inventory.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/inventory.toml"));
    }
}
