use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{InitError, ShaderStage};
use crate::render::{RenderCtx, RenderTarget};

const VERTEX_SHADER_SRC: &str = include_str!("shaders/triangle.vert.wgsl");
const FRAGMENT_SHADER_SRC: &str = include_str!("shaders/triangle.frag.wgsl");

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// The fixed triangle, in normalized device coordinates.
const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex { pos: [-1.0, -1.0] },
    Vertex { pos: [1.0, -1.0] },
    Vertex { pos: [0.0, 1.0] },
];

/// Single static triangle renderer.
///
/// All GPU resources are created at construction: both shader stages are
/// compiled, linked into one pipeline, and the vertex buffer is uploaded.
/// Construction failure carries the stage diagnostic; no partially-built
/// renderer is ever returned. The render path is immutable and infallible.
#[derive(Debug)]
pub struct TriangleRenderer {
    pipeline: wgpu::RenderPipeline,
    vbo: wgpu::Buffer,
}

impl TriangleRenderer {
    /// Runs the one-time setup sequence with the built-in shader sources.
    pub fn new(ctx: &RenderCtx<'_>) -> Result<Self, InitError> {
        Self::new_with_sources(ctx, VERTEX_SHADER_SRC, FRAGMENT_SHADER_SRC)
    }

    /// Same sequence with caller-supplied stage sources.
    ///
    /// Exists so the failure paths (compile, link) can be exercised without
    /// patching the built-in shaders.
    pub fn new_with_sources(
        ctx: &RenderCtx<'_>,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, InitError> {
        let vertex = compile_stage(ctx.device, ShaderStage::Vertex, vertex_src)?;
        let fragment = compile_stage(ctx.device, ShaderStage::Fragment, fragment_src)?;

        let pipeline = link_pipeline(ctx, &vertex, &fragment)?;

        let vbo = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("trigon triangle vbo"),
                contents: bytemuck::cast_slice(&TRIANGLE_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(Self { pipeline, vbo })
    }

    /// Records one frame: clears the target to opaque black and draws the
    /// triangle over exactly 3 vertices.
    pub fn render(&self, target: &mut RenderTarget<'_>) {
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trigon triangle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_vertex_buffer(0, self.vbo.slice(..));
        rpass.draw(0..3, 0..1);
    }
}

/// Compiles one shader stage, capturing the validation diagnostic on failure.
///
/// wgpu reports shader errors through error scopes rather than a return
/// value; the scope confines the error to this stage so the caller gets a
/// per-stage log. The failed module is dropped before returning.
fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, InitError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "trigon triangle vs",
            ShaderStage::Fragment => "trigon triangle fs",
        }),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    if let Some(err) = pollster::block_on(scope.pop()) {
        return Err(InitError::ShaderCompile {
            stage,
            log: err.to_string(),
        });
    }

    Ok(module)
}

/// Links the two compiled stages into one pipeline.
///
/// Pipeline creation is where wgpu validates stage interfaces against each
/// other and against the vertex layout, so this is the "link" step. Failure
/// drops the pipeline and carries the validation log.
fn link_pipeline(
    ctx: &RenderCtx<'_>,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
) -> Result<wgpu::RenderPipeline, InitError> {
    let layout = ctx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trigon triangle pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

    let scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = ctx
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("trigon triangle pipeline"),
            layout: Some(&layout),

            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

    if let Some(err) = pollster::block_on(scope.pop()) {
        return Err(InitError::ProgramLink {
            log: err.to_string(),
        });
    }

    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_buffer_is_exactly_six_floats() {
        let floats: &[f32] = bytemuck::cast_slice(&TRIANGLE_VERTICES);
        assert_eq!(floats, &[-1.0, -1.0, 1.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn vertex_layout_is_tight_vec2() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x2);
    }
}
