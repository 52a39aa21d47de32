//! Visual themes.
//!
//! A theme bundles the colors, spacing constants, and optional hand-drawn
//! parameters one render consumes. Bundles ship as JSON5 documents embedded
//! in the binary and load once into a process-wide store that is read-only
//! afterwards, so concurrent renders share it freely.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::warn;

use crate::tree::NodeClass;

/// `#RRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{raw}', expected #rrggbb")))
    }
}

/// Fill, stroke, and text colors for one node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NodeStyle {
    pub fill: Color,
    pub stroke: Color,
    pub text: Color,
}

/// Styles keyed by node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyles {
    pub root: NodeStyle,
    pub branch: NodeStyle,
    pub sub_branch: NodeStyle,
    pub leaf: NodeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    pub background: Color,
    pub connector: Color,
}

/// Spacing and sizing constants consumed by the shaper, layout engine, and
/// renderer. All lengths are layout units; `scale` maps them to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub min_node_width: f32,
    pub max_node_width: f32,
    pub min_node_height: f32,
    pub level_spacing: f32,
    pub node_spacing: f32,
    pub corner_radius: f32,
    pub font_size: f32,
    pub scale: f32,
    pub line_height: f32,
    pub text_padding: f32,
}

/// Repeating fill pattern used instead of solid color in sketch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPattern {
    Dots,
    Crosshatch,
}

/// Hand-drawn rendering parameters. Presence of this block switches a theme
/// into sketch style.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchParams {
    /// Positional jitter amplitude, layout units.
    pub jitter: f32,
    /// How many times each stroke is redrawn.
    pub repeats: u32,
    /// Midpoint displacement for wavy segments, layout units.
    pub waviness: f32,
    #[serde(default)]
    pub fill_pattern: Option<FillPattern>,
    #[serde(default)]
    pub seed: u64,
}

/// A named visual configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub colors: Colors,
    pub node_styles: NodeStyles,
    pub layout: LayoutMetrics,
    #[serde(default)]
    pub sketch: Option<SketchParams>,
}

impl Theme {
    /// Style for a node class (per-node overrides are applied by the
    /// renderer, not here).
    pub const fn style_for(&self, class: NodeClass) -> &NodeStyle {
        match class {
            NodeClass::Root => &self.node_styles.root,
            NodeClass::BranchWithGrandchildren => &self.node_styles.branch,
            NodeClass::BranchLeafParent => &self.node_styles.sub_branch,
            NodeClass::Leaf => &self.node_styles.leaf,
        }
    }

    /// Hard-coded fallback installed when no embedded bundle loads.
    fn fallback_default() -> Self {
        Self {
            name: "Default".to_string(),
            colors: Colors {
                background: Color::rgb(0xff, 0xff, 0xff),
                connector: Color::rgb(0x0d, 0x0b, 0x22),
            },
            node_styles: NodeStyles {
                root: NodeStyle {
                    fill: Color::rgb(0x0d, 0x0b, 0x22),
                    stroke: Color::rgb(0x0d, 0x0b, 0x22),
                    text: Color::rgb(0xff, 0xff, 0xff),
                },
                branch: NodeStyle {
                    fill: Color::rgb(0xf5, 0xf7, 0xfa),
                    stroke: Color::rgb(0xf5, 0xf7, 0xfa),
                    text: Color::rgb(0x00, 0x00, 0x00),
                },
                sub_branch: NodeStyle {
                    fill: Color::rgb(0xf5, 0xf7, 0xfa),
                    stroke: Color::rgb(0xf5, 0xf7, 0xfa),
                    text: Color::rgb(0x00, 0x00, 0x00),
                },
                leaf: NodeStyle {
                    fill: Color::rgb(0xff, 0xff, 0xff),
                    stroke: Color::rgb(0xff, 0xff, 0xff),
                    text: Color::rgb(0x00, 0x00, 0x00),
                },
            },
            layout: LayoutMetrics {
                min_node_width: 100.0,
                max_node_width: 240.0,
                min_node_height: 36.0,
                level_spacing: 150.0,
                node_spacing: 30.0,
                corner_radius: 8.0,
                font_size: 15.0,
                scale: 3.0,
                line_height: 20.0,
                text_padding: 15.0,
            },
            sketch: None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let l = &self.layout;
        let positives = [
            ("minNodeWidth", l.min_node_width),
            ("maxNodeWidth", l.max_node_width),
            ("minNodeHeight", l.min_node_height),
            ("fontSize", l.font_size),
            ("scale", l.scale),
            ("lineHeight", l.line_height),
        ];
        for (field, value) in positives {
            if !(value > 0.0) {
                return Err(format!("{field} must be positive, got {value}"));
            }
        }
        let non_negatives = [
            ("levelSpacing", l.level_spacing),
            ("nodeSpacing", l.node_spacing),
            ("cornerRadius", l.corner_radius),
            ("textPadding", l.text_padding),
        ];
        for (field, value) in non_negatives {
            if !(value >= 0.0) {
                return Err(format!("{field} must be non-negative, got {value}"));
            }
        }
        if l.min_node_width > l.max_node_width {
            return Err("minNodeWidth exceeds maxNodeWidth".to_string());
        }
        Ok(())
    }
}

/// Embedded theme bundles, keyed by id.
const BUNDLES: &[(&str, &str)] = &[
    ("business", include_str!("themes/business.json5")),
    ("dark", include_str!("themes/dark.json5")),
    ("default", include_str!("themes/default.json5")),
    ("forest", include_str!("themes/forest.json5")),
    ("sketch", include_str!("themes/sketch.json5")),
];

/// Read-only collection of named themes.
#[derive(Debug)]
pub struct ThemeStore {
    themes: BTreeMap<String, Arc<Theme>>,
}

impl ThemeStore {
    fn load_embedded() -> Self {
        let mut themes = BTreeMap::new();
        for (id, source) in BUNDLES {
            match json5::from_str::<Theme>(source) {
                Ok(theme) => match theme.validate() {
                    Ok(()) => {
                        themes.insert((*id).to_string(), Arc::new(theme));
                    }
                    Err(reason) => {
                        warn!(theme = *id, %reason, "skipping invalid theme bundle");
                    }
                },
                Err(err) => {
                    warn!(theme = *id, error = %err, "skipping unparseable theme bundle");
                }
            }
        }
        if themes.is_empty() {
            warn!("no embedded theme bundle loaded; installing hard-coded default");
            themes.insert("default".to_string(), Arc::new(Theme::fallback_default()));
        }
        Self { themes }
    }

    /// Sorted theme ids.
    pub fn ids(&self) -> Vec<&str> {
        self.themes.keys().map(String::as_str).collect()
    }

    /// Look up a theme, falling back to `default` on a miss.
    ///
    /// Returns `None` only when the id is unknown and no default theme is
    /// registered.
    pub fn get(&self, id: &str) -> Option<Arc<Theme>> {
        self.themes
            .get(id)
            .or_else(|| self.themes.get("default"))
            .cloned()
    }
}

/// The process-wide store, populated on first use.
pub fn store() -> &'static ThemeStore {
    static STORE: Lazy<ThemeStore> = Lazy::new(ThemeStore::load_embedded);
    &STORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_embedded_bundle_parses_and_validates() {
        for (id, source) in BUNDLES {
            let theme: Theme = json5::from_str(source)
                .unwrap_or_else(|e| panic!("theme '{id}' failed to parse: {e}"));
            theme
                .validate()
                .unwrap_or_else(|e| panic!("theme '{id}' failed validation: {e}"));
        }
    }

    #[test]
    fn test_store_ids_are_sorted() {
        let ids = store().ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(ids.contains(&"default"));
    }

    #[test]
    fn test_unknown_id_falls_back_to_default() {
        let theme = store().get("no-such-theme").expect("default registered");
        assert_eq!(theme.name, store().get("default").unwrap().name);
    }

    #[test]
    fn test_sketch_theme_carries_hand_drawn_parameters() {
        let theme = store().get("sketch").unwrap();
        let sketch = theme.sketch.expect("sketch block");
        assert!(sketch.repeats >= 1);
        assert!(sketch.jitter > 0.0);
    }

    #[test]
    fn test_color_parses_hex() {
        assert_eq!(Color::parse("#0d0b22"), Some(Color::rgb(0x0d, 0x0b, 0x22)));
        assert_eq!(Color::parse("0d0b22"), None);
        assert_eq!(Color::parse("#0d0b2"), None);
        assert_eq!(Color::rgb(13, 11, 34).to_string(), "#0d0b22");
    }

    #[test]
    fn test_validation_rejects_inverted_width_bounds() {
        let mut theme = Theme::fallback_default();
        theme.layout.min_node_width = 500.0;
        assert!(theme.validate().is_err());
    }
}
