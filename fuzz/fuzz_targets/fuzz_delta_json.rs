#![no_main]
use libfuzzer_sys::fuzz_target;
use schema_delta::model::{Schema, SchemaDocument};
use schema_delta::{DeltaRoot, TextCompiler};

/// Fuzz applying untrusted deltas to the standard library snapshot.
///
/// Application must fail with an error, never panic, whatever the command
/// tree contains.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(delta) = DeltaRoot::from_json_str(s) else {
        return;
    };
    let compiler = TextCompiler::default();
    if let Ok(schema) = Schema::from_document(&SchemaDocument::new().with_std(), &compiler) {
        let _ = delta.apply(&schema, &compiler);
    }
});
