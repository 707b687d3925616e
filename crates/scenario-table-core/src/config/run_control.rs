//! Plotting run control.
//!
//! Mirrors the layout of the 1.5°C ensemble's plotting spec:
//!
//! ```yaml
//! color:
//!   category:
//!     1.5C low overshoot: "#1f77b4"
//!     Lower 2C: "#ff7f0e"
//! linestyle:
//!   model:
//!     IEA ETP 2020: "--"
//! cats: [1.5C low overshoot, Lower 2C, Higher 2C]
//! cats_15: [Below 1.5C, 1.5C low overshoot]
//! ```
//!
//! `color`, `linestyle` and `marker` map a dimension (a row field or
//! metadata attribute) to per-label styles. Every other top-level key is a
//! named, ordered list of labels usable as a set-membership filter.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    config::{ConfigError, INLINE, UnknownGroupSnafu, parse_yaml, read_yaml},
    predicate::Predicate,
};

/// `dimension -> label -> style`.
pub type StyleMap = BTreeMap<String, BTreeMap<String, String>>;

/// Style channel looked up by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    /// Line or fill color.
    Color,
    /// Line dash pattern.
    LineStyle,
    /// Point marker.
    Marker,
}

/// Styling and category groupings for a renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunControl {
    /// Colors per dimension and label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub color: StyleMap,
    /// Line styles per dimension and label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub linestyle: StyleMap,
    /// Markers per dimension and label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub marker: StyleMap,
    /// Named, ordered label groupings (`cats`, `cats_15`, ...).
    #[serde(flatten)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl RunControl {
    /// Parse a run-control document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        parse_yaml(text, INLINE)
    }

    /// Load a run-control document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path.as_ref())
    }

    /// Overlay `other` onto `self`: styles and groups from `other` replace
    /// entries with the same keys.
    pub fn update(&mut self, other: RunControl) {
        for (mine, theirs) in [
            (&mut self.color, other.color),
            (&mut self.linestyle, other.linestyle),
            (&mut self.marker, other.marker),
        ] {
            for (dimension, styles) in theirs {
                mine.entry(dimension).or_default().extend(styles);
            }
        }
        self.groups.extend(other.groups);
    }

    /// Style for `label` along `dimension`, if configured.
    pub fn style(&self, kind: StyleKind, dimension: &str, label: &str) -> Option<&str> {
        let map = match kind {
            StyleKind::Color => &self.color,
            StyleKind::LineStyle => &self.linestyle,
            StyleKind::Marker => &self.marker,
        };
        map.get(dimension)
            .and_then(|styles| styles.get(label))
            .map(String::as_str)
    }

    /// Names of the defined groups.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Labels of group `name`, in configured order.
    pub fn group(&self, name: &str) -> Result<&[String], ConfigError> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .with_context(|| UnknownGroupSnafu {
                name,
                available: self.group_names().collect::<Vec<_>>().join(", "),
            })
    }

    /// `attribute ∈ group(name)`.
    pub fn group_predicate(&self, name: &str, attribute: &str) -> Result<Predicate, ConfigError> {
        Ok(Predicate::is_in(attribute, self.group(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r##"
color:
  category:
    1.5C low overshoot: "#1f77b4"
    Lower 2C: "#ff7f0e"
linestyle:
  model:
    IEA ETP 2020: "--"
cats: [1.5C low overshoot, Lower 2C, Higher 2C]
cats_15: [Below 1.5C, 1.5C low overshoot, 1.5C high overshoot]
cats_15_no_lo: [Below 1.5C, 1.5C low overshoot]
"##;

    #[test]
    fn parses_styles_and_groups() -> Result<(), ConfigError> {
        let rc = RunControl::from_yaml_str(SPEC)?;
        assert_eq!(
            rc.style(StyleKind::Color, "category", "Lower 2C"),
            Some("#ff7f0e")
        );
        assert_eq!(
            rc.style(StyleKind::LineStyle, "model", "IEA ETP 2020"),
            Some("--")
        );
        assert_eq!(rc.style(StyleKind::Marker, "model", "IEA ETP 2020"), None);
        assert_eq!(
            rc.group_names().collect::<Vec<_>>(),
            vec!["cats", "cats_15", "cats_15_no_lo"]
        );
        assert_eq!(rc.group("cats_15_no_lo")?.len(), 2);
        Ok(())
    }

    #[test]
    fn group_predicate_and_unknown_group() -> Result<(), ConfigError> {
        let rc = RunControl::from_yaml_str(SPEC)?;
        let p = rc.group_predicate("cats", "category")?;
        assert_eq!(
            p,
            Predicate::is_in("category", ["1.5C low overshoot", "Lower 2C", "Higher 2C"])
        );

        let err = rc.group("cats_2").expect_err("unknown");
        assert!(err.to_string().contains("cats_15_no_lo"));
        Ok(())
    }

    #[test]
    fn update_overrides_matching_entries() -> Result<(), ConfigError> {
        let mut rc = RunControl::from_yaml_str(SPEC)?;
        rc.update(RunControl::from_yaml_str(
            "color:\n  category:\n    Lower 2C: red\ncats: [Lower 2C]\n",
        )?);
        assert_eq!(rc.style(StyleKind::Color, "category", "Lower 2C"), Some("red"));
        assert_eq!(
            rc.style(StyleKind::Color, "category", "1.5C low overshoot"),
            Some("#1f77b4")
        );
        assert_eq!(rc.group("cats")?, &["Lower 2C".to_string()]);
        Ok(())
    }

    #[test]
    fn malformed_document_is_a_yaml_error() {
        let err = RunControl::from_yaml_str("cats: {not: a list}").expect_err("bad");
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
