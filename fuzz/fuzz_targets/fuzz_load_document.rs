#![no_main]
use libfuzzer_sys::fuzz_target;
use schema_delta::model::{Schema, SchemaDocument};
use schema_delta::TextCompiler;

/// Fuzz snapshot loading.
///
/// Arbitrary strings go through both document parsers, and any document that
/// parses is built into a schema, which exercises name resolution, owner
/// checks and ancestor computation.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for doc in [SchemaDocument::from_json_str(s), SchemaDocument::from_yaml_str(s)]
            .into_iter()
            .flatten()
        {
            let _ = Schema::from_document(&doc, &TextCompiler::default());
        }
    }
});
