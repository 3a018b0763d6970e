#![no_main]

use glsc_context::{CapabilityContext, Dialect};
use glsc_ir::InfoLog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        // Preprocessing and parsing must never panic, whatever the input.
        for dialect in [Dialect::Desktop, Dialect::Embedded] {
            let ctx = CapabilityContext::new(dialect);
            let mut log = InfoLog::new();
            let pre = glsc_parser::preprocess(source, &ctx, &mut log);
            let _ = glsc_parser::parse(&pre.source, pre.version);
        }
    }
});
