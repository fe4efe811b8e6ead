use super::*;

const MINIMAL: &str = r#"{
    "sequence": {
        "sequence_name": "hero",
        "start_frame": 1,
        "end_frame": 480,
        "name_pattern": "frame_{frame}.jpg",
        "padding": 4,
        "frames_per_year": 30,
        "start_year": 2000
    }
}"#;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "scrollreel_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn player_defaults_apply_when_omitted() {
    let cfg = ReelConfig::from_json_str(MINIMAL).unwrap();
    assert_eq!(cfg.player, PlayerOpts::default());
    assert_eq!(cfg.player.buffer_radius, 15);
    assert_eq!(cfg.player.year_span, 16);
    assert!(cfg.years.is_none());
    assert!(cfg.section.is_none());
}

#[test]
fn partial_player_block_merges_with_defaults() {
    let json = r#"{
        "sequence": {
            "sequence_name": "s", "start_frame": 0, "end_frame": 9,
            "name_pattern": "{frame}.png", "padding": 2
        },
        "player": { "buffer_radius": 4, "background_rgba": [255, 255, 255, 255] },
        "section": { "section_top": 600.0, "section_height": 5000.0,
                     "viewport": { "width": 1280, "height": 720 } }
    }"#;
    let cfg = ReelConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.player.buffer_radius, 4);
    assert_eq!(cfg.player.overlay_band, OverlayBand::default());
    assert_eq!(cfg.player.background().to_array(), [255, 255, 255, 255]);

    let section = cfg.section.unwrap();
    assert_eq!(section.scroll_range(), 4280.0);
    let m = section.metrics_at(700.0);
    assert_eq!(m.scroll_start(), 100.0);
    assert_eq!(m.scroll_range(), 4280.0);
}

#[test]
fn invalid_options_are_rejected() {
    let bad_band = PlayerOpts {
        overlay_band: OverlayBand {
            enter: 0.9,
            exit: 0.1,
        },
        ..PlayerOpts::default()
    };
    assert!(bad_band.validate().is_err());

    let zero_threads = PlayerOpts {
        worker_threads: Some(0),
        ..PlayerOpts::default()
    };
    assert!(zero_threads.validate().is_err());

    let unknown = r#"{"sequence": {}, "bogus": 1}"#;
    assert!(matches!(
        ReelConfig::from_json_str(unknown),
        Err(ReelError::Serde(_))
    ));
}

#[test]
fn years_path_resolves_against_config_dir() {
    let tmp = temp_dir("config_years");
    std::fs::create_dir_all(&tmp).unwrap();
    std::fs::write(
        tmp.join("years.json"),
        r#"{"2000": [{"name": "A", "value": 1.0}]}"#,
    )
    .unwrap();
    let json = MINIMAL.replacen('{', r#"{ "years": "years.json","#, 1);
    std::fs::write(tmp.join("reel.json"), json).unwrap();

    let cfg = ReelConfig::from_path(tmp.join("reel.json")).unwrap();
    assert_eq!(cfg.years.as_deref(), Some(tmp.join("years.json").as_path()));
    let table = cfg.load_year_table().unwrap().unwrap();
    assert_eq!(table.years().collect::<Vec<_>>(), vec![2000]);

    std::fs::remove_dir_all(&tmp).ok();
}
