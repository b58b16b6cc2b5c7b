#![no_main]

use libfuzzer_sys::fuzz_target;
use vitrine_widgets::RuleSet;

fuzz_target!(|input: (&str, &str)| {
    let (list, value) = input;
    let Ok(rules) = RuleSet::builtin() else {
        return;
    };
    if let Ok(parsed) = rules.parse(list) {
        let outcome = rules.check(&parsed, value);
        // An empty value can only fail a required rule.
        if value.trim().is_empty() && !outcome.is_valid() {
            assert!(parsed.iter().any(|r| r.name == "required"));
        }
    }
});
