#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Config TOML and reference CSV must never panic; errors are fine.
    if let Ok(cfg) = toml::from_str::<pfvs_config::Config>(data) {
        let _ = cfg.validate();
    }
    let _ = pfvs_config::read_references(data.as_bytes());
});
