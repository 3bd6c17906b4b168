use std::io::Write;

use hex_compositor::config::{self, Configuration, TreatmentSelection};
use hex_compositor::render::paint::CompositeMode;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
canvas:
  width: 1080
  height: 1350
device-pixel-ratio: 2.0
hex:
  min-radius-fraction: 0.1
  max-radius-fraction: 0.3
scrim:
  max-alpha: 0.45
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!((cfg.canvas.width, cfg.canvas.height), (1080, 1350));
    assert!((cfg.device_pixel_ratio - 2.0).abs() < f32::EPSILON);
    let band = cfg.hex.band();
    assert!((band.min_fraction - 0.1).abs() < f32::EPSILON);
    assert!((band.max_fraction - 0.3).abs() < f32::EPSILON);
    // untouched keys keep their defaults
    assert!((band.max_diff_fraction - 0.25).abs() < f32::EPSILON);
    assert!((cfg.scrim.max_alpha - 0.45).abs() < f32::EPSILON);
    assert_eq!(cfg.background.sample_size, 10);
    assert!(cfg.layout.letterbox_small_images);
    cfg.validate().unwrap();
}

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.canvas.width, 800);
    assert_eq!(
        cfg.treatments.selection,
        TreatmentSelection::Fixed("neutral".into())
    );
    assert!(cfg.treatments.get("neutral").is_some());
    cfg.validate().unwrap();
}

#[test]
fn parse_treatment_palette() {
    let yaml = r#"
treatments:
  selection: warm
  options:
    warm:
      background: [250, 200, 150, 255]
      scrim-alpha: 0.2
      gradient:
        centered: true
        radius-factor: 0.8
        composite: multiply
        alpha: 0.4
    calm:
      no-emotion-scrim: true
      vignette-alpha: 0.0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    cfg.validate().unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (name, warm) = cfg.treatments.select(&mut rng).unwrap();
    assert_eq!(name, "warm");
    assert_eq!(warm.background, [250, 200, 150, 255]);
    assert!((warm.scrim_alpha - 0.2).abs() < f32::EPSILON);
    let gradient = warm.gradient.expect("gradient configured");
    assert!(gradient.centered);
    assert_eq!(gradient.composite, CompositeMode::Multiply);
    assert_eq!(gradient.center_color, [255, 255, 255, 255]);

    let calm = cfg.treatments.get("calm").unwrap();
    assert!(calm.no_emotion_scrim);
    assert!(calm.gradient.is_none());
}

#[test]
fn random_selection_is_seeded() {
    let yaml = r#"
treatments:
  selection: Random
  options:
    a: {}
    b: {}
    c: {}
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.treatments.selection, TreatmentSelection::Random);
    cfg.validate().unwrap();

    let picks = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..8)
            .map(|_| cfg.treatments.select(&mut rng).unwrap().0.to_string())
            .collect::<Vec<_>>()
    };
    let first = picks(42);
    assert_eq!(first, picks(42));
    assert!(first.iter().all(|n| ["a", "b", "c"].contains(&n.as_str())));
}

#[test]
fn unknown_selection_fails_validation() {
    let yaml = r#"
treatments:
  selection: missing
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("missing"), "{err}");
}

#[test]
fn out_of_range_alpha_fails_validation() {
    let yaml = r#"
treatments:
  options:
    neutral:
      scrim-alpha: 1.5
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("scrim-alpha"), "{err}");
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
hex:
  radius: 10
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "canvas:\n  width: 640\n  height: 480").unwrap();
    let cfg = config::from_yaml_file(file.path()).unwrap();
    assert_eq!((cfg.canvas.width, cfg.canvas.height), (640, 480));

    let missing = file.path().with_extension("does-not-exist");
    let err = config::from_yaml_file(&missing).unwrap_err();
    assert!(err.to_string().contains("reading config file"), "{err}");
}
