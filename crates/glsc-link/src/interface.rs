//! Whole-program checks across linked stages.

use std::collections::HashMap;

use glsc_context::{CapabilityContext, Limits, ShaderKind};
use glsc_ir::{AddressSpace, GlobalVariable, InfoLog, Module, format_type};

use crate::LinkedStage;

pub(crate) fn check_program(stages: &[LinkedStage], ctx: &CapabilityContext, log: &mut InfoLog) {
    let stage = |kind: ShaderKind| stages.iter().find(|s| s.kind == kind);
    let vertex = stage(ShaderKind::Vertex);
    let geometry = stage(ShaderKind::Geometry);
    let fragment = stage(ShaderKind::Fragment);

    if let Some(vertex) = vertex {
        let written = vertex
            .module
            .find_global("gl_Position")
            .is_some_and(|pos| vertex.module.writes_global(pos));
        if !written {
            log.error(None, "vertex shader does not write to `gl_Position'");
        }
    }
    if geometry.is_some() && vertex.is_none() {
        log.error(None, "geometry shader must be linked with a vertex shader");
    }

    check_uniforms(stages, log);

    if let (Some(vertex), Some(geometry)) = (vertex, geometry) {
        check_interface(vertex, geometry, log);
    }
    if let (Some(producer), Some(fragment)) = (geometry.or(vertex), fragment) {
        check_interface(producer, fragment, log);
    }

    check_limits(stages, ctx.limits(), log);
}

fn user_globals(module: &Module, space: AddressSpace) -> impl Iterator<Item = &GlobalVariable> {
    module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .filter(move |var| var.space == space && !var.builtin)
}

fn type_name(module: &Module, var: &GlobalVariable) -> String {
    format_type(&module.types[var.ty], &module.types)
}

/// A uniform shared by several stages must have one type everywhere.
fn check_uniforms(stages: &[LinkedStage], log: &mut InfoLog) {
    let mut seen: HashMap<&str, (String, ShaderKind)> = HashMap::new();
    for stage in stages {
        for var in user_globals(&stage.module, AddressSpace::Uniform) {
            let ty = type_name(&stage.module, var);
            match seen.get(var.name.as_str()) {
                Some((first_ty, first_kind)) if *first_ty != ty => log.error(
                    None,
                    format!(
                        "uniform `{}' declared as type `{first_ty}' in the {first_kind} shader \
                         and type `{ty}' in the {} shader",
                        var.name, stage.kind
                    ),
                ),
                Some(_) => {}
                None => {
                    seen.insert(&var.name, (ty, stage.kind));
                }
            }
        }
    }
}

/// Every user input of `consumer` must be an output of `producer` with the
/// same type.
fn check_interface(producer: &LinkedStage, consumer: &LinkedStage, log: &mut InfoLog) {
    for input in user_globals(&consumer.module, AddressSpace::Input) {
        let output = user_globals(&producer.module, AddressSpace::Output)
            .find(|out| out.name == input.name);
        match output {
            None => log.error(
                None,
                format!(
                    "{} shader input `{}' is not written by the {} shader",
                    consumer.kind, input.name, producer.kind
                ),
            ),
            Some(output) => {
                let (out_ty, in_ty) = (
                    type_name(&producer.module, output),
                    type_name(&consumer.module, input),
                );
                if out_ty != in_ty {
                    log.error(
                        None,
                        format!(
                            "`{}' declared as type `{out_ty}' in the {} shader \
                             and type `{in_ty}' in the {} shader",
                            input.name, producer.kind, consumer.kind
                        ),
                    );
                }
            }
        }
    }
}

fn check_limits(stages: &[LinkedStage], limits: &Limits, log: &mut InfoLog) {
    let mut combined_samplers: HashMap<&str, u32> = HashMap::new();

    for stage in stages {
        let module = &stage.module;
        let kind = stage.kind;
        let (max_uniforms, max_samplers) = match kind {
            ShaderKind::Vertex => (
                limits.max_vertex_uniform_components,
                limits.max_vertex_texture_image_units,
            ),
            ShaderKind::Geometry => (
                limits.max_vertex_uniform_components,
                limits.max_texture_image_units,
            ),
            ShaderKind::Fragment => (
                limits.max_fragment_uniform_components,
                limits.max_texture_image_units,
            ),
        };

        let mut components = 0;
        let mut samplers = 0;
        for var in user_globals(module, AddressSpace::Uniform) {
            let ty = &module.types[var.ty];
            components += ty.uniform_components(&module.types);
            let count = ty.sampler_count(&module.types);
            samplers += count;
            if count > 0 {
                combined_samplers.insert(&var.name, count);
            }
        }
        exceeds(log, format!("{kind} shader uniform components"), components, max_uniforms);
        exceeds(log, format!("{kind} shader texture samplers"), samplers, max_samplers);

        if kind == ShaderKind::Vertex {
            let attribs = slots(module, AddressSpace::Input);
            exceeds(log, "vertex attributes".into(), attribs, limits.max_vertex_attribs);
        }
        if kind != ShaderKind::Fragment {
            let varyings = slots(module, AddressSpace::Output);
            exceeds(log, format!("{kind} shader varyings"), varyings, limits.max_varying);
        }
    }

    exceeds(
        log,
        "combined texture samplers".into(),
        combined_samplers.values().sum(),
        limits.max_combined_texture_image_units,
    );
}

fn slots(module: &Module, space: AddressSpace) -> u32 {
    user_globals(module, space)
        .map(|var| module.types[var.ty].slots(&module.types))
        .sum()
}

fn exceeds(log: &mut InfoLog, what: String, used: u32, max: u32) {
    if used > max {
        log.error(None, format!("too many {what} ({used} > {max})"));
    }
}
