//! WGSL front end shared by every backend.
//!
//! Stages are parsed and validated with naga (as re-exported by wgpu), which
//! yields the compiler diagnostics for failed compiles and the reflection data
//! location queries are answered from.
//!
//! Conventions a stage must follow:
//! - entry point `vs_main` or `fs_main`
//! - one uniform struct at `@group(0) @binding(0)`
//! - textures as `t_<name>` paired with a sampler `s_<name>` in group 0

use std::collections::{BTreeMap, BTreeSet};

use wgpu::naga;

use super::{
    ProgramDesc, SamplerLocation, ShaderStage, TextureDimension, UniformKind, UniformLocation,
    VertexStream,
};
use crate::error::{RenderError, Result};

pub(crate) const UNIFORM_BINDING: u32 = 0;

#[derive(Clone, Debug)]
pub(crate) struct UniformBlock {
    pub binding: u32,
    pub size: u32,
    pub members: BTreeMap<String, UniformLocation>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextureBinding {
    pub name: String,
    pub texture_binding: u32,
    pub sampler_binding: u32,
    pub dimension: TextureDimension,
}

/// A validated shader stage.
#[derive(Debug)]
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub label: String,
    pub source: String,
    /// Vertex inputs by name (vertex stage only).
    pub inputs: BTreeMap<String, u32>,
    /// Inter-stage locations read (fragment) or written (vertex).
    pub varyings: BTreeSet<u32>,
    pub uniforms: Option<UniformBlock>,
    pub textures: Vec<TextureBinding>,
}

/// Two stages checked against each other.
#[derive(Debug)]
pub(crate) struct LinkedProgram {
    pub label: String,
    pub attributes: BTreeMap<String, u32>,
    pub uniforms: Option<UniformBlock>,
    pub textures: Vec<TextureBinding>,
    pub streams: Vec<VertexStream>,
}

impl LinkedProgram {
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .as_ref()
            .and_then(|block| block.members.get(name).copied())
    }

    pub fn sampler_location(&self, name: &str) -> Option<SamplerLocation> {
        self.textures
            .iter()
            .position(|texture| texture.name == name)
            .map(|index| SamplerLocation(index as u32))
    }

    pub fn uniform_block_size(&self) -> usize {
        self.uniforms
            .as_ref()
            .map(|block| block.size as usize)
            .unwrap_or(0)
    }

    /// Number of leading vertex streams the program reads from.
    pub fn used_streams(&self) -> usize {
        self.streams
            .iter()
            .rposition(|stream| {
                stream
                    .attributes
                    .iter()
                    .any(|attribute| self.attributes.contains_key(attribute.name))
            })
            .map(|last| last + 1)
            .unwrap_or(0)
    }
}

pub(crate) fn compile(stage: ShaderStage, label: &str, source: &str) -> Result<CompiledStage> {
    let fail = |log: String| RenderError::ShaderCompile {
        label: label.to_string(),
        stage,
        log,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| fail(e.emit_to_string(source)))?;

    let entry_name = stage.entry_point();
    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.name == entry_name && entry.stage == wanted)
        .ok_or_else(|| fail(format!("missing entry point `{entry_name}`")))?;

    let mut inputs = BTreeMap::new();
    let mut varyings = BTreeSet::new();
    for argument in &entry.function.arguments {
        collect_locations(
            &module,
            argument.ty,
            argument.name.as_deref(),
            argument.binding.as_ref(),
            &mut |name, location| {
                match stage {
                    ShaderStage::Vertex => {
                        if let Some(name) = name {
                            inputs.insert(name.to_string(), location);
                        }
                    }
                    ShaderStage::Fragment => {
                        varyings.insert(location);
                    }
                }
            },
        );
    }
    if stage == ShaderStage::Vertex {
        if let Some(result) = &entry.function.result {
            collect_locations(&module, result.ty, None, result.binding.as_ref(), &mut |_, location| {
                varyings.insert(location);
            });
        }
    }

    let mut uniforms = None;
    let mut images = BTreeMap::new();
    let mut samplers = BTreeMap::new();
    for (_, global) in module.global_variables.iter() {
        let (Some(binding), Some(name)) = (&global.binding, &global.name) else {
            continue;
        };
        if binding.group != 0 {
            return Err(fail(format!("`{name}` must live in bind group 0")));
        }
        match &module.types[global.ty].inner {
            naga::TypeInner::Struct { members, span } if global.space == naga::AddressSpace::Uniform => {
                if binding.binding != UNIFORM_BINDING || uniforms.is_some() {
                    return Err(fail(format!(
                        "the uniform block `{name}` must be the only one and use binding {UNIFORM_BINDING}"
                    )));
                }
                let mut block = UniformBlock {
                    binding: binding.binding,
                    size: *span,
                    members: BTreeMap::new(),
                };
                for member in members {
                    let Some(member_name) = &member.name else {
                        continue;
                    };
                    let kind = uniform_kind(&module.types[member.ty].inner).ok_or_else(|| {
                        fail(format!("uniform `{member_name}` has an unsupported type"))
                    })?;
                    block.members.insert(
                        member_name.clone(),
                        UniformLocation {
                            offset: member.offset,
                            kind,
                        },
                    );
                }
                uniforms = Some(block);
            }
            naga::TypeInner::Image { dim, arrayed: false, .. } => {
                let dimension = match dim {
                    naga::ImageDimension::D1 => TextureDimension::D1,
                    naga::ImageDimension::D2 => TextureDimension::D2,
                    naga::ImageDimension::D3 => TextureDimension::D3,
                    naga::ImageDimension::Cube => {
                        return Err(fail(format!("cube texture `{name}` is not supported")));
                    }
                };
                let base = name
                    .strip_prefix("t_")
                    .ok_or_else(|| fail(format!("texture `{name}` must be named t_<name>")))?;
                images.insert(base.to_string(), (binding.binding, dimension));
            }
            naga::TypeInner::Sampler { comparison: false } => {
                let base = name
                    .strip_prefix("s_")
                    .ok_or_else(|| fail(format!("sampler `{name}` must be named s_<name>")))?;
                samplers.insert(base.to_string(), binding.binding);
            }
            _ => return Err(fail(format!("unsupported resource `{name}`"))),
        }
    }

    let mut textures = Vec::with_capacity(images.len());
    for (name, (texture_binding, dimension)) in images {
        let sampler_binding = samplers
            .remove(&name)
            .ok_or_else(|| fail(format!("texture `t_{name}` has no sampler `s_{name}`")))?;
        textures.push(TextureBinding {
            name,
            texture_binding,
            sampler_binding,
            dimension,
        });
    }
    if let Some(orphan) = samplers.keys().next() {
        return Err(fail(format!("sampler `s_{orphan}` has no texture `t_{orphan}`")));
    }

    Ok(CompiledStage {
        stage,
        label: label.to_string(),
        source: source.to_string(),
        inputs,
        varyings,
        uniforms,
        textures,
    })
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    name: Option<&str>,
    binding: Option<&naga::Binding>,
    found: &mut dyn FnMut(Option<&str>, u32),
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => found(name, *location),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.ty,
                        member.name.as_deref(),
                        member.binding.as_ref(),
                        found,
                    );
                }
            }
        }
    }
}

fn uniform_kind(inner: &naga::TypeInner) -> Option<UniformKind> {
    use naga::{ScalarKind, TypeInner, VectorSize};
    match inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float if scalar.width == 4 => Some(UniformKind::Float),
            ScalarKind::Sint if scalar.width == 4 => Some(UniformKind::Int),
            _ => None,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Bi => Some(UniformKind::Vec2),
            VectorSize::Tri => Some(UniformKind::Vec3),
            VectorSize::Quad => Some(UniformKind::Vec4),
        },
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            ..
        } => Some(UniformKind::Mat3),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        } => Some(UniformKind::Mat4),
        _ => None,
    }
}

pub(crate) fn link(
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    desc: &ProgramDesc,
) -> Result<LinkedProgram> {
    let fail = |log: String| RenderError::ProgramLink {
        label: desc.label.clone(),
        log,
    };
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(fail(format!(
            "expected a vertex and a fragment stage, got {:?} ({}) and {:?} ({})",
            vertex.stage, vertex.label, fragment.stage, fragment.label
        )));
    }

    if let Some(missing) = fragment.varyings.difference(&vertex.varyings).next() {
        return Err(fail(format!(
            "fragment input @location({missing}) is not written by the vertex stage"
        )));
    }

    for name in vertex.inputs.keys() {
        if !desc.streams.iter().any(|stream| stream.attribute(name).is_some()) {
            return Err(fail(format!("vertex input `{name}` is not provided by any stream")));
        }
    }

    let uniforms = match (&vertex.uniforms, &fragment.uniforms) {
        (None, None) => None,
        (Some(block), None) | (None, Some(block)) => Some(block.clone()),
        (Some(vs), Some(fs)) => {
            let mut merged = vs.clone();
            for (name, location) in &fs.members {
                match merged.members.get(name) {
                    Some(existing) if existing != location => {
                        return Err(fail(format!(
                            "uniform `{name}` differs between stages ({existing:?} vs {location:?})"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        merged.members.insert(name.clone(), *location);
                    }
                }
            }
            merged.size = vs.size.max(fs.size);
            Some(merged)
        }
    };

    let mut textures = vertex.textures.clone();
    for texture in &fragment.textures {
        match textures.iter().find(|known| known.name == texture.name) {
            Some(known) if known != texture => {
                return Err(fail(format!(
                    "texture `{}` is declared differently in both stages",
                    texture.name
                )));
            }
            Some(_) => {}
            None => textures.push(texture.clone()),
        }
    }

    Ok(LinkedProgram {
        label: desc.label.clone(),
        attributes: vertex.inputs.clone(),
        uniforms,
        textures,
        streams: desc.streams.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StreamAttribute;

    const VS: &str = r#"
struct Uniforms {
    tint: vec4<f32>,
    offset: vec2<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) texcoord: vec2<f32>,
};
struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = vec4<f32>(in.position.xy + u.offset, in.position.z, 1.0);
    out.uv = in.texcoord;
    return out;
}
"#;

    const FS: &str = r#"
struct Uniforms {
    tint: vec4<f32>,
    offset: vec2<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var t_color: texture_2d<f32>;
@group(0) @binding(2) var s_color: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(t_color, s_color, uv) * u.tint;
}
"#;

    const STREAM: VertexStream = VertexStream {
        stride: 20,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            StreamAttribute {
                name: "position",
                offset: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            StreamAttribute {
                name: "texcoord",
                offset: 12,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    fn desc() -> ProgramDesc {
        ProgramDesc {
            label: "test".to_string(),
            streams: vec![STREAM],
            blend: None,
        }
    }

    #[test]
    fn reflects_inputs_uniforms_and_textures() {
        let vs = compile(ShaderStage::Vertex, "vs", VS).unwrap();
        let fs = compile(ShaderStage::Fragment, "fs", FS).unwrap();
        assert_eq!(vs.inputs.get("position"), Some(&0));
        assert_eq!(vs.inputs.get("texcoord"), Some(&1));
        assert_eq!(fs.textures.len(), 1);
        assert_eq!(fs.textures[0].name, "color");

        let program = link(&vs, &fs, &desc()).unwrap();
        assert_eq!(
            program.uniform_location("offset"),
            Some(UniformLocation {
                offset: 16,
                kind: UniformKind::Vec2
            })
        );
        assert_eq!(program.sampler_location("color"), Some(SamplerLocation(0)));
        assert_eq!(program.sampler_location("alpha"), None);
        assert_eq!(program.used_streams(), 1);
    }

    #[test]
    fn compile_errors_carry_diagnostics() {
        let err = compile(ShaderStage::Vertex, "broken", "fn vs_main( {").unwrap_err();
        match err {
            RenderError::ShaderCompile { label, log, .. } => {
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_entry_point_fails_compile() {
        assert!(compile(ShaderStage::Fragment, "vs-as-fs", VS).is_err());
    }

    #[test]
    fn link_rejects_unprovided_attribute() {
        let vs = compile(ShaderStage::Vertex, "vs", VS).unwrap();
        let fs = compile(ShaderStage::Fragment, "fs", FS).unwrap();
        let mut desc = desc();
        desc.streams.clear();
        assert!(matches!(
            link(&vs, &fs, &desc),
            Err(RenderError::ProgramLink { .. })
        ));
    }
}
