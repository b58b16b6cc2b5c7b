#![no_main]

use libfuzzer_sys::fuzz_target;
use vitrine_runtime::SiteConfig;

fuzz_target!(|data: &str| {
    if let Ok(config) = SiteConfig::from_toml_str(data) {
        // Anything that parses must also convert.
        let _ = config.navigation.to_config();
        let _ = config.modal.to_config();
        let _ = config.forms.to_config();
        assert!(config.validate().is_ok());
    }
});
