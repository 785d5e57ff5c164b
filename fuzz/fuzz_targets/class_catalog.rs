#![no_main]

use hookcheck::reflect::ClassCatalog;
use hookcheck::synth::ProxySynthesizer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(catalog) = ClassCatalog::from_json_str(input) {
            let synth = ProxySynthesizer::default();
            for class in catalog.classes() {
                let _ = synth.synthesize(&catalog, &class.name, "fuzzProxy");
            }
        }
    }
});
