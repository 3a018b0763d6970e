#![no_main]

use glsc_compiler::{CompileError, CompileOptions, GlslToolchain, ShaderUnit, SourceBuffer};
use glsc_context::{CapabilityContext, Dialect, ShaderKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The whole unit pipeline should never panic, and every module it
    // produces must pass validation.
    let ctx = CapabilityContext::new(Dialect::Desktop);
    let toolchain = GlslToolchain::new();
    for kind in ShaderKind::ALL {
        let mut unit = ShaderUnit::new(SourceBuffer::new("fuzz", data), kind);
        let result = unit.compile(&ctx, &toolchain, &CompileOptions::default(), &mut std::io::sink());
        if let Err(CompileError::Structural(err)) = result {
            panic!("malformed IR: {err}");
        }
    }
});
