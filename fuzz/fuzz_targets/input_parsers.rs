#![no_main]

use libfuzzer_sys::fuzz_target;
use riskcall::instrument::{DangerousApiPass, InstrumentConfig};
use riskcall::ir::Module;
use riskcall::pipeline::PassRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // None of these may panic, whatever the input
    let _ = InstrumentConfig::from_toml_str(input);
    let _ = PassRegistry::with_builtin_passes(InstrumentConfig::default()).parse_pipeline(input);

    // Modules that load and validate must instrument cleanly
    if let Ok(mut module) = Module::from_json_str(input) {
        if module.validate().is_ok() {
            DangerousApiPass::default().run_with_diagnostics(&mut module, &mut std::io::sink());
            assert!(module.validate().is_ok());
        }
    }
});
