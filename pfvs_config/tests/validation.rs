use pfvs_config::load_toml;
use rstest::rstest;

#[test]
fn empty_config_uses_defaults_and_validates() {
    let cfg = load_toml("").expect("parse empty TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.policy.cooldown_ms, 10_000);
    assert!((cfg.policy.probe_target_c - 170.0).abs() < f32::EPSILON);
    assert!((cfg.policy.tolerance_ratio - 0.01).abs() < f32::EPSILON);
    assert!(cfg.sensor.filament_active_low);
    assert_eq!(cfg.simulation.material, "pla");
    assert!(cfg.simulation.filament_present);
    assert_eq!(
        cfg.classifier.references,
        std::path::PathBuf::from("reference_spectra.csv")
    );
}

#[test]
fn full_config_parses() {
    let toml = r#"
[pins]
filament_present = 17
manual_override = 27

[sensor]
filament_active_low = false
filament_wait_ms = 2000

[policy]
probe_target_c = 175.0
tolerance_ratio = 0.02
cooldown_ms = 15000

[stream]
sample_ms = 100
channel_capacity = 4

[classifier]
references = "/opt/pfvs/refs.csv"

[counters]
file = "/var/lib/pfvs/counters.json"

[logging]
file = "/var/log/pfvs.log"
level = "debug"
rotation = "daily"

[simulation]
material = "asa"
filament_present = false
read_fault_after = 3
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.pins.filament_present, Some(17));
    assert!(!cfg.sensor.filament_active_low);
    assert_eq!(cfg.stream.channel_capacity, 4);
    assert!(!cfg.simulation.filament_present);
    assert_eq!(cfg.simulation.read_fault_after, Some(3));
    assert_eq!(
        cfg.counters.file.as_deref(),
        Some(std::path::Path::new("/var/lib/pfvs/counters.json"))
    );
}

#[rstest]
#[case("[policy]\ncooldown_ms = 500", "policy.cooldown_ms must be >= 1000")]
#[case("[policy]\ntolerance_ratio = 0.0", "policy.tolerance_ratio must be in (0.0, 0.2]")]
#[case("[policy]\ntolerance_ratio = 0.5", "policy.tolerance_ratio must be in (0.0, 0.2]")]
#[case("[policy]\nprobe_target_c = -5.0", "policy.probe_target_c must be in [0.0, 400.0]")]
#[case("[stream]\nsample_ms = 1", "stream.sample_ms must be >= 10")]
#[case("[stream]\nchannel_capacity = 0", "stream.channel_capacity must be in 1..=1024")]
#[case("[pins]\nfilament_present = 40", "pins.filament_present must be a bcm pin")]
#[case(
    "[pins]\nfilament_present = 5\nmanual_override = 5",
    "pins.filament_present and pins.manual_override must differ"
)]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}").to_lowercase();
    assert!(
        msg.contains(&expected.to_lowercase()),
        "expected {expected:?} in {msg:?}"
    );
}

#[test]
fn unknown_field_types_fail_to_parse() {
    let err = load_toml("[policy]\ncooldown_ms = \"soon\"").expect_err("type mismatch");
    assert!(err.to_string().contains("cooldown_ms"));
}
