use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand::seq::IteratorRandom;
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;

use crate::processing::layout::HexBand;
use crate::render::paint::{CompositeMode, Rgba8, rgba};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    pub canvas: CanvasConfig,
    /// Backing-store scale factor, read once when the surface is created.
    pub device_pixel_ratio: f32,
    pub hex: HexConfig,
    pub scrim: ScrimConfig,
    pub background: BackgroundConfig,
    pub layout: LayoutConfig,
    pub vignette: VignetteConfig,
    pub treatments: TreatmentsConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            device_pixel_ratio: 1.0,
            hex: HexConfig::default(),
            scrim: ScrimConfig::default(),
            background: BackgroundConfig::default(),
            layout: LayoutConfig::default(),
            vignette: VignetteConfig::default(),
            treatments: TreatmentsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HexConfig {
    /// Smallest hex radius as a fraction of canvas height.
    pub min_radius_fraction: f32,
    /// Largest hex radius as a fraction of canvas height.
    pub max_radius_fraction: f32,
    /// Largest radius change per layout pass, as a fraction of the radius.
    pub max_diff_fraction: f32,
    /// Corner rounding as a fraction of the radius.
    pub corner_fraction: f32,
    pub rotation_deg: f32,
}

impl Default for HexConfig {
    fn default() -> Self {
        let band = HexBand::default();
        Self {
            min_radius_fraction: band.min_fraction,
            max_radius_fraction: band.max_fraction,
            max_diff_fraction: band.max_diff_fraction,
            corner_fraction: 1.0 / 6.0,
            rotation_deg: 0.0,
        }
    }
}

impl HexConfig {
    pub fn band(&self) -> HexBand {
        HexBand {
            min_fraction: self.min_radius_fraction,
            max_fraction: self.max_radius_fraction,
            max_diff_fraction: self.max_diff_fraction,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScrimConfig {
    pub max_alpha: f32,
}

impl Default for ScrimConfig {
    fn default() -> Self {
        Self { max_alpha: 0.6 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Provisional fill painted before the background has been sampled.
    pub marker: [u8; 4],
    /// Edge of the sampled square, in canvas pixels.
    pub sample_size: u32,
    /// Used when the sampled square holds no opaque pixels.
    pub fallback: [u8; 4],
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            marker: [0, 0, 255, 255],
            sample_size: 10,
            fallback: [0, 0, 0, 255],
        }
    }
}

impl BackgroundConfig {
    pub fn marker(&self) -> Rgba8 {
        rgba(self.marker)
    }

    pub fn fallback(&self) -> Rgba8 {
        rgba(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Draw the image full-width and bottom-anchored when the crop, clamped to
    /// the image width, is still taller than the image.
    pub letterbox_small_images: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            letterbox_small_images: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct VignetteConfig {
    pub center_color: [u8; 4],
    pub edge_color: [u8; 4],
    /// Gradient radius as a fraction of canvas height.
    pub radius_factor: f32,
    pub inner_stop: f32,
    pub outer_stop: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            center_color: [128, 128, 128, 0],
            edge_color: [0, 0, 0, 170],
            radius_factor: 0.75,
            inner_stop: 0.35,
            outer_stop: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GradientConfig {
    pub center_color: [u8; 4],
    pub edge_color: [u8; 4],
    pub radius_factor: f32,
    /// Centre on the canvas instead of the eyes midpoint.
    pub centered: bool,
    pub inner_stop: f32,
    pub outer_stop: f32,
    pub composite: CompositeMode,
    pub alpha: f32,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            center_color: [255, 255, 255, 255],
            edge_color: [0, 0, 0, 255],
            radius_factor: 1.0,
            centered: false,
            inner_stop: 0.0,
            outer_stop: 1.0,
            composite: CompositeMode::Overlay,
            alpha: 0.5,
        }
    }
}

/// One entry of the treatment palette.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Treatment {
    /// Multiply-mode color laid over the cut-out.
    pub background: [u8; 4],
    /// Use the neutral translucent color instead of `background`.
    pub no_emotion_scrim: bool,
    /// Scrim strength in `[0, 1]`, scaled by `scrim.max-alpha`; 0 disables it.
    pub scrim_alpha: f32,
    pub background_alpha: f32,
    pub vignette_alpha: f32,
    pub gradient: Option<GradientConfig>,
}

impl Default for Treatment {
    fn default() -> Self {
        Self {
            background: [236, 201, 168, 255],
            no_emotion_scrim: false,
            scrim_alpha: 0.5,
            background_alpha: 0.6,
            vignette_alpha: 0.5,
            gradient: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreatmentSelection {
    Fixed(String),
    Random,
}

impl TreatmentSelection {
    const RANDOM: &'static str = "random";
}

impl fmt::Display for TreatmentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(name) => f.write_str(name),
            Self::Random => f.write_str(Self::RANDOM),
        }
    }
}

impl<'de> Deserialize<'de> for TreatmentSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(D::Error::custom("treatment selection must not be empty"));
        }
        if raw.eq_ignore_ascii_case(Self::RANDOM) {
            Ok(Self::Random)
        } else {
            Ok(Self::Fixed(raw.to_string()))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TreatmentsConfig {
    #[serde(default = "TreatmentsConfig::default_selection")]
    pub selection: TreatmentSelection,
    #[serde(default = "TreatmentsConfig::default_options")]
    pub options: BTreeMap<String, Treatment>,
}

impl Default for TreatmentsConfig {
    fn default() -> Self {
        Self {
            selection: Self::default_selection(),
            options: Self::default_options(),
        }
    }
}

impl TreatmentsConfig {
    const DEFAULT_NAME: &'static str = "neutral";

    fn default_selection() -> TreatmentSelection {
        TreatmentSelection::Fixed(Self::DEFAULT_NAME.to_string())
    }

    fn default_options() -> BTreeMap<String, Treatment> {
        BTreeMap::from([(Self::DEFAULT_NAME.to_string(), Treatment::default())])
    }

    pub fn get(&self, name: &str) -> Option<&Treatment> {
        self.options.get(name)
    }

    /// Resolves the configured selection; `random` draws uniformly from the
    /// palette.
    pub fn select(&self, rng: &mut impl Rng) -> Result<(&str, &Treatment)> {
        match &self.selection {
            TreatmentSelection::Fixed(name) => {
                let (key, treatment) = self
                    .options
                    .get_key_value(name)
                    .with_context(|| format!("unknown treatment '{name}'"))?;
                Ok((key.as_str(), treatment))
            }
            TreatmentSelection::Random => {
                let (key, treatment) = self
                    .options
                    .iter()
                    .choose(rng)
                    .context("treatment palette is empty")?;
                Ok((key.as_str(), treatment))
            }
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.canvas.width > 0 && self.canvas.height > 0,
            "canvas must have positive dimensions"
        );
        ensure!(
            self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0,
            "device-pixel-ratio must be positive"
        );
        let hex = &self.hex;
        ensure!(
            hex.min_radius_fraction > 0.0 && hex.min_radius_fraction <= hex.max_radius_fraction,
            "hex.min-radius-fraction must be positive and not exceed hex.max-radius-fraction"
        );
        ensure!(
            hex.max_diff_fraction > 0.0,
            "hex.max-diff-fraction must be positive"
        );
        ensure!(
            (0.0..=0.5).contains(&hex.corner_fraction),
            "hex.corner-fraction must be within [0, 0.5]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.scrim.max_alpha),
            "scrim.max-alpha must be within [0, 1]"
        );
        ensure!(
            self.background.sample_size > 0,
            "background.sample-size must be positive"
        );
        ensure!(
            self.vignette.radius_factor > 0.0,
            "vignette.radius-factor must be positive"
        );
        for (name, treatment) in &self.treatments.options {
            for (field, value) in [
                ("scrim-alpha", treatment.scrim_alpha),
                ("background-alpha", treatment.background_alpha),
                ("vignette-alpha", treatment.vignette_alpha),
            ] {
                ensure!(
                    (0.0..=1.0).contains(&value),
                    "treatment '{name}': {field} must be within [0, 1]"
                );
            }
            if let Some(gradient) = &treatment.gradient {
                ensure!(
                    gradient.radius_factor > 0.0,
                    "treatment '{name}': gradient radius-factor must be positive"
                );
                ensure!(
                    (0.0..=1.0).contains(&gradient.alpha),
                    "treatment '{name}': gradient alpha must be within [0, 1]"
                );
            }
        }
        match &self.treatments.selection {
            TreatmentSelection::Fixed(name) => ensure!(
                self.treatments.options.contains_key(name),
                "treatment selection '{name}' is not defined under treatments.options"
            ),
            TreatmentSelection::Random => ensure!(
                !self.treatments.options.is_empty(),
                "random treatment selection needs at least one treatment"
            ),
        }
        Ok(())
    }
}

pub fn from_yaml_str(yaml: &str) -> Result<Configuration> {
    serde_yaml::from_str(yaml).context("parsing YAML configuration")
}

pub fn from_yaml_file(path: &Path) -> Result<Configuration> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    from_yaml_str(&raw)
}
