//! Configuration loading and layer reconfiguration.

use christmas_glow::composer::FOLIAGE_COUNT;
use christmas_glow::prelude::*;
use christmas_glow::LayerKind;

#[test]
fn test_toml_round_trip() {
    let source = r##"
        tree_color = "#0a5c36"
        ornament_colors = ["#FFD700", "#ff0000"]
        ornament_shapes = ["star", "diamond"]
        particle_count = 801
        bloom_intensity = 1.5
    "##;
    let config = TreeConfig::from_toml_str(source).unwrap();

    assert_eq!(config.tree_color.to_hex(), "#0A5C36");
    assert_eq!(config.ornament_shapes, vec![OrnamentShape::Star, OrnamentShape::Diamond]);
    assert_eq!(config.particles_per_shape(), 400);
    // unspecified keys keep their defaults
    assert_eq!(config.ornament_scale, TreeConfig::default().ornament_scale);

    let written = toml::to_string(&config).unwrap();
    assert_eq!(TreeConfig::from_toml_str(&written).unwrap(), config);
}

#[test]
fn test_toml_rejects_bad_values() {
    assert!(matches!(
        TreeConfig::from_toml_str(r##"tree_color = "green""##),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        TreeConfig::from_toml_str("ornament_shapes = []"),
        Err(ConfigError::NoShapes)
    ));
    assert!(matches!(
        TreeConfig::from_toml_str(r#"ornament_shapes = ["cube", "cube"]"#),
        Err(ConfigError::DuplicateShape(OrnamentShape::Cube))
    ));
    assert!(matches!(
        TreeConfig::from_toml_str("ornament_scale_variance = 3.5"),
        Err(ConfigError::InvalidValue {
            field: "ornament_scale_variance",
            ..
        })
    ));
}

#[test]
fn test_load_missing_file() {
    let err = TreeConfig::load("does/not/exist.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_same_seed_same_tree() {
    let config = TreeConfig::default().with_particle_count(120);
    let mut a = FieldComposer::with_seed(&config, 99);
    let mut b = FieldComposer::with_seed(&config, 99);
    a.set_formed(true);
    b.set_formed(true);
    for frame in 1..=20 {
        a.tick(frame as f32 / 60.0);
        b.tick(frame as f32 / 60.0);
    }

    let pa: Vec<_> = a.layers().flat_map(|l| l.field().instances().to_vec()).collect();
    let pb: Vec<_> = b.layers().flat_map(|l| l.field().instances().to_vec()).collect();
    assert_eq!(pa, pb);
}

#[test]
fn test_instance_count_matches_config() {
    let config = TreeConfig::default()
        .with_particle_count(1000)
        .with_ornament_shapes(vec![OrnamentShape::Sphere, OrnamentShape::Cube, OrnamentShape::Star]);
    let composer = FieldComposer::with_seed(&config, 1);

    assert_eq!(composer.instance_count(), FOLIAGE_COUNT + 3 * 333);
    let kinds: Vec<_> = composer.layers().map(|l| l.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            LayerKind::Foliage,
            LayerKind::Ornament(OrnamentShape::Sphere),
            LayerKind::Ornament(OrnamentShape::Cube),
            LayerKind::Ornament(OrnamentShape::Star),
        ]
    );
}

#[test]
fn test_preset_swap_keeps_positions() {
    let config = TreeConfig::default().with_particle_count(300);
    let mut composer = FieldComposer::with_seed(&config, 5);
    let before: Vec<_> = composer
        .ornaments()
        .iter()
        .map(|l| (l.generation(), l.field().particles().to_vec()))
        .collect();

    let mut recoloured = config.clone();
    recoloured.apply_palette_preset(PalettePreset::Cyberpunk);
    let report = composer.apply_config(&recoloured);

    assert!(report.rebuilt.is_empty());
    assert_eq!(report.kept.len(), 3);
    let after: Vec<_> = composer
        .ornaments()
        .iter()
        .map(|l| (l.generation(), l.field().particles().to_vec()))
        .collect();
    assert_eq!(before, after);
    for layer in composer.ornaments() {
        assert_eq!(layer.field().palette(), PalettePreset::Cyberpunk.colors().as_slice());
    }
}

#[test]
fn test_scale_change_rebuilds_every_ornament() {
    let config = TreeConfig::default().with_particle_count(300);
    let mut composer = FieldComposer::with_seed(&config, 5);
    let foliage_generation = composer.foliage().generation();

    let report = composer.apply_config(&config.clone().with_ornament_scale(0.6, 0.2));

    assert_eq!(report.rebuilt.len(), 3);
    assert_eq!(composer.foliage().generation(), foliage_generation);
    for layer in composer.ornaments() {
        assert!((layer.field().key().base_scale - 0.6).abs() < f32::EPSILON);
    }
}
