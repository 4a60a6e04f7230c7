//! Load steps and the GPU work each one performs
//!
//! Every asset gets a fetch step and a build step. Build steps only see the
//! bytes of their own asset; the join step sees every build output and
//! assembles the final [`GpuResources`].

use crate::backend::*;
use crate::error::LoadError;
use crate::load_graph::graph::{GraphError, LoadGraph};
use crate::load_graph::resources::{
    DrawSlot, GeometryBuffers, GpuResources, ResourceLedger, ShadowTargets, TransformBinding,
};
use crate::resources::{compile_stage, import_mesh, primitives, CellVertex, FogGrid, Mesh, Vertex};
use crate::scene::{LightUniformData, TransformUniformData};
use crate::AssetNames;

/// Assets fetched by a load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    SceneVertexShader,
    ScenePixelShader,
    ShadowVertexShader,
    ShadowPixelShader,
    OverlayVertexShader,
    OverlayPixelShader,
    Mesh,
}

impl Asset {
    pub const CORE: [Asset; 5] = [
        Asset::SceneVertexShader,
        Asset::ScenePixelShader,
        Asset::ShadowVertexShader,
        Asset::ShadowPixelShader,
        Asset::Mesh,
    ];

    pub const OVERLAY: [Asset; 2] = [Asset::OverlayVertexShader, Asset::OverlayPixelShader];

    /// Assets needed with or without the fog overlay
    pub fn required(overlay: bool) -> impl Iterator<Item = Asset> {
        let extra: &'static [Asset] = if overlay { &Asset::OVERLAY } else { &[] };
        Asset::CORE.into_iter().chain(extra.iter().copied())
    }

    pub fn stage(self) -> Option<ShaderStage> {
        match self {
            Asset::SceneVertexShader | Asset::ShadowVertexShader | Asset::OverlayVertexShader => {
                Some(ShaderStage::Vertex)
            }
            Asset::ScenePixelShader | Asset::ShadowPixelShader | Asset::OverlayPixelShader => {
                Some(ShaderStage::Fragment)
            }
            Asset::Mesh => None,
        }
    }

    /// Logical file name of the asset
    pub fn name(self, names: &AssetNames) -> &str {
        match self {
            Asset::SceneVertexShader => &names.scene_vertex_shader,
            Asset::ScenePixelShader => &names.scene_pixel_shader,
            Asset::ShadowVertexShader => &names.shadow_vertex_shader,
            Asset::ShadowPixelShader => &names.shadow_pixel_shader,
            Asset::OverlayVertexShader => &names.overlay_vertex_shader,
            Asset::OverlayPixelShader => &names.overlay_pixel_shader,
            Asset::Mesh => &names.mesh,
        }
    }

    /// Label given to the GPU module built from the asset
    pub fn label(self) -> &'static str {
        match self {
            Asset::SceneVertexShader => "scene vertex shader",
            Asset::ScenePixelShader => "scene pixel shader",
            Asset::ShadowVertexShader => "shadow vertex shader",
            Asset::ShadowPixelShader => "shadow pixel shader",
            Asset::OverlayVertexShader => "overlay vertex shader",
            Asset::OverlayPixelShader => "overlay pixel shader",
            Asset::Mesh => "model",
        }
    }
}

/// A node of the load graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Fetch(Asset),
    Build(Asset),
    Join,
}

/// What a load attempt builds
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub assets: AssetNames,
    /// Edge length of the square shadow map
    pub shadow_map_size: u32,
    /// `Some` adds the overlay stage and the fog-cell grid
    pub fog_grid: Option<FogGrid>,
}

impl LoadSettings {
    pub fn overlay_enabled(&self) -> bool {
        self.fog_grid.is_some()
    }
}

/// Fetch, build and join steps for the configured assets
pub fn load_graph(settings: &LoadSettings) -> LoadGraph<Step> {
    let mut graph = LoadGraph::new();
    let mut builds = Vec::new();
    for asset in Asset::required(settings.overlay_enabled()) {
        graph.add_step(Step::Fetch(asset), &[]);
        graph.add_step(Step::Build(asset), &[Step::Fetch(asset)]);
        builds.push(Step::Build(asset));
    }
    graph.add_step(Step::Join, &builds);
    graph
}

struct SceneVertexOutput {
    module: ShaderModuleHandle,
    layout: VertexBufferLayout,
    sampler: SamplerHandle,
}

struct ScenePixelOutput {
    module: ShaderModuleHandle,
    transform_buffers: [BufferHandle; 4],
    light_buffer: BufferHandle,
}

struct ShadowVertexOutput {
    module: ShaderModuleHandle,
    layout: VertexBufferLayout,
    depth_view: TextureViewHandle,
}

struct ShadowPixelOutput {
    module: ShaderModuleHandle,
    color_view: TextureViewHandle,
}

struct OverlayVertexOutput {
    module: ShaderModuleHandle,
    layout: VertexBufferLayout,
}

/// Results of completed build steps, consumed by the join
#[derive(Default)]
pub(crate) struct BranchOutputs {
    scene_vertex: Option<SceneVertexOutput>,
    scene_pixel: Option<ScenePixelOutput>,
    shadow_vertex: Option<ShadowVertexOutput>,
    shadow_pixel: Option<ShadowPixelOutput>,
    overlay_vertex: Option<OverlayVertexOutput>,
    overlay_pixel: Option<ShaderModuleHandle>,
    mesh: Option<Mesh>,
}

fn compile_module(
    asset: Asset,
    stage: ShaderStage,
    bytes: &[u8],
    backend: &mut dyn GraphicsBackend,
    ledger: &mut ResourceLedger,
) -> Result<(crate::resources::CompiledStage, ShaderModuleHandle), LoadError> {
    let compiled = compile_stage(asset.label(), stage, bytes)?;
    let module = ledger.adopt(backend.create_shader_module(&compiled.descriptor()))?;
    Ok((compiled, module))
}

/// Continuation of one fetch: everything that depends only on this asset
pub(crate) fn build_branch(
    asset: Asset,
    bytes: &[u8],
    settings: &LoadSettings,
    backend: &mut dyn GraphicsBackend,
    ledger: &mut ResourceLedger,
    outputs: &mut BranchOutputs,
) -> Result<(), LoadError> {
    match asset {
        Asset::SceneVertexShader => {
            let (stage, module) =
                compile_module(asset, ShaderStage::Vertex, bytes, backend, ledger)?;
            let layout = stage.input_layout(&Vertex::layout())?;
            let sampler = ledger.adopt(backend.create_sampler(&SamplerDescriptor {
                label: Some("scene sampler".into()),
                address_mode_u: AddressMode::ClampToEdge,
                address_mode_v: AddressMode::ClampToEdge,
                address_mode_w: AddressMode::Repeat,
                ..Default::default()
            }))?;
            outputs.scene_vertex = Some(SceneVertexOutput {
                module,
                layout,
                sampler,
            });
        }
        Asset::ScenePixelShader => {
            let (_, module) = compile_module(asset, ShaderStage::Fragment, bytes, backend, ledger)?;
            let transform_size = std::mem::size_of::<TransformUniformData>() as u64;
            let mut transform_buffers = Vec::with_capacity(DrawSlot::ALL.len());
            for slot in DrawSlot::ALL {
                let buffer = ledger.adopt(
                    backend.create_buffer(&BufferDescriptor::uniform(slot.label(), transform_size)),
                )?;
                transform_buffers.push(buffer);
            }
            let light_buffer = ledger.adopt(backend.create_buffer(&BufferDescriptor::uniform(
                "light parameters",
                std::mem::size_of::<LightUniformData>() as u64,
            )))?;
            outputs.scene_pixel = Some(ScenePixelOutput {
                module,
                transform_buffers: [
                    transform_buffers[0],
                    transform_buffers[1],
                    transform_buffers[2],
                    transform_buffers[3],
                ],
                light_buffer,
            });
        }
        Asset::ShadowVertexShader => {
            let (stage, module) =
                compile_module(asset, ShaderStage::Vertex, bytes, backend, ledger)?;
            let layout = stage.input_layout(&Vertex::layout())?;
            let texture = ledger.adopt(backend.create_texture(&TextureDescriptor::render_target(
                "shadow depth",
                settings.shadow_map_size,
                TextureFormat::Depth32Float,
            )))?;
            let depth_view = ledger.adopt(backend.create_texture_view(texture))?;
            outputs.shadow_vertex = Some(ShadowVertexOutput {
                module,
                layout,
                depth_view,
            });
        }
        Asset::ShadowPixelShader => {
            let (_, module) = compile_module(asset, ShaderStage::Fragment, bytes, backend, ledger)?;
            let texture = ledger.adopt(backend.create_texture(&TextureDescriptor::render_target(
                "shadow color",
                settings.shadow_map_size,
                TextureFormat::Rgba16Float,
            )))?;
            let color_view = ledger.adopt(backend.create_texture_view(texture))?;
            outputs.shadow_pixel = Some(ShadowPixelOutput { module, color_view });
        }
        Asset::OverlayVertexShader => {
            let (stage, module) =
                compile_module(asset, ShaderStage::Vertex, bytes, backend, ledger)?;
            let layout = stage.input_layout(&CellVertex::layout())?;
            outputs.overlay_vertex = Some(OverlayVertexOutput { module, layout });
        }
        Asset::OverlayPixelShader => {
            let (_, module) = compile_module(asset, ShaderStage::Fragment, bytes, backend, ledger)?;
            outputs.overlay_pixel = Some(module);
        }
        Asset::Mesh => {
            let name = Asset::Mesh.name(&settings.assets).to_string();
            let mesh = import_mesh(asset.label(), bytes)
                .map_err(|source| LoadError::MeshImport { name, source })?;
            outputs.mesh = Some(mesh);
        }
    }
    log::debug!("Built {}", asset.label());
    Ok(())
}

fn missing(asset: Asset) -> LoadError {
    LoadError::Graph(GraphError::OutOfOrder(format!(
        "{:?} before {:?}",
        Step::Join,
        Step::Build(asset)
    )))
}

fn transform_layout(
    backend: &mut dyn GraphicsBackend,
    ledger: &mut ResourceLedger,
) -> BackendResult<BindGroupLayoutHandle> {
    ledger.adopt(backend.create_bind_group_layout(&[BindGroupLayoutEntry {
        binding: 0,
        visibility: ShaderStageFlags::VERTEX,
        ty: BindingType::UniformBuffer,
    }]))
}

fn shadow_inputs_layout(
    backend: &mut dyn GraphicsBackend,
    ledger: &mut ResourceLedger,
) -> BackendResult<BindGroupLayoutHandle> {
    ledger.adopt(backend.create_bind_group_layout(&[
        BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
            },
        },
        BindGroupLayoutEntry {
            binding: 1,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Sampler { comparison: false },
        },
        BindGroupLayoutEntry {
            binding: 2,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::UniformBuffer,
        },
    ]))
}

fn depth_state(write: bool, compare: CompareFunction) -> Option<DepthStencilState> {
    Some(DepthStencilState {
        format: TextureFormat::Depth32Float,
        depth_write_enabled: write,
        depth_compare: compare,
    })
}

/// Final step: geometry, fixed-function state, bind groups and pipelines
pub(crate) fn join(
    settings: &LoadSettings,
    backend: &mut dyn GraphicsBackend,
    ledger: &mut ResourceLedger,
    outputs: BranchOutputs,
) -> Result<GpuResources, LoadError> {
    let scene_vertex = outputs.scene_vertex.ok_or_else(|| missing(Asset::SceneVertexShader))?;
    let scene_pixel = outputs.scene_pixel.ok_or_else(|| missing(Asset::ScenePixelShader))?;
    let shadow_vertex = outputs.shadow_vertex.ok_or_else(|| missing(Asset::ShadowVertexShader))?;
    let shadow_pixel = outputs.shadow_pixel.ok_or_else(|| missing(Asset::ShadowPixelShader))?;
    let mesh = outputs.mesh.ok_or_else(|| missing(Asset::Mesh))?;
    let overlay = match settings.fog_grid {
        Some(grid) => {
            let vertex = outputs.overlay_vertex.ok_or_else(|| missing(Asset::OverlayVertexShader))?;
            let pixel = outputs.overlay_pixel.ok_or_else(|| missing(Asset::OverlayPixelShader))?;
            Some((grid, vertex, pixel))
        }
        None => None,
    };

    // Geometry
    let model = GeometryBuffers::upload(backend, ledger, &mesh)?;
    let floor = GeometryBuffers::upload(backend, ledger, &primitives::floor())?;
    let fog_grid = match &overlay {
        Some((grid, _, _)) => Some(GeometryBuffers::upload(backend, ledger, &grid.build())?),
        None => None,
    };

    // Bindings
    let transform_layout = transform_layout(backend, ledger)?;
    let shadow_inputs_layout = shadow_inputs_layout(backend, ledger)?;

    let mut transforms = Vec::with_capacity(DrawSlot::ALL.len());
    for buffer in scene_pixel.transform_buffers {
        let bind_group = ledger.adopt(backend.create_bind_group(
            transform_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer,
                    offset: 0,
                    size: Some(std::mem::size_of::<TransformUniformData>() as u64),
                },
            )],
        ))?;
        transforms.push(TransformBinding { buffer, bind_group });
    }

    let shadow_inputs = ledger.adopt(backend.create_bind_group(
        shadow_inputs_layout,
        &[
            (0, BindGroupEntry::Texture(shadow_pixel.color_view)),
            (1, BindGroupEntry::Sampler(scene_vertex.sampler)),
            (
                2,
                BindGroupEntry::Buffer {
                    buffer: scene_pixel.light_buffer,
                    offset: 0,
                    size: Some(std::mem::size_of::<LightUniformData>() as u64),
                },
            ),
        ],
    ))?;

    // Pipelines. Importer and primitive tables wind front faces clockwise.
    let shadow_pipeline = ledger.adopt(backend.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("shadow pipeline".into()),
        vertex_module: shadow_vertex.module,
        fragment_module: Some(shadow_pixel.module),
        vertex_layouts: vec![shadow_vertex.layout],
        bind_group_layouts: vec![transform_layout],
        primitive_topology: PrimitiveTopology::TriangleList,
        front_face: FrontFace::Cw,
        cull_mode: CullMode::Back,
        depth_stencil: depth_state(true, CompareFunction::Less),
        color_targets: vec![ColorTargetState {
            format: TextureFormat::Rgba16Float,
            blend: None,
            write_mask: ColorWrites::ALL,
        }],
    }))?;

    let surface_format = backend.swapchain_format();
    let scene_pipeline = ledger.adopt(backend.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("scene pipeline".into()),
        vertex_module: scene_vertex.module,
        fragment_module: Some(scene_pixel.module),
        vertex_layouts: vec![scene_vertex.layout],
        bind_group_layouts: vec![transform_layout, shadow_inputs_layout],
        primitive_topology: PrimitiveTopology::TriangleList,
        front_face: FrontFace::Cw,
        cull_mode: CullMode::Back,
        depth_stencil: depth_state(true, CompareFunction::Less),
        color_targets: vec![ColorTargetState {
            format: surface_format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }],
    }))?;

    let overlay_pipeline = match overlay {
        Some((_, vertex, pixel)) => Some(ledger.adopt(backend.create_render_pipeline(
            &RenderPipelineDescriptor {
                label: Some("overlay pipeline".into()),
                vertex_module: vertex.module,
                fragment_module: Some(pixel),
                vertex_layouts: vec![vertex.layout],
                bind_group_layouts: vec![transform_layout, shadow_inputs_layout],
                primitive_topology: PrimitiveTopology::TriangleList,
                front_face: FrontFace::Cw,
                cull_mode: CullMode::None,
                // Test against the scene but never occlude it
                depth_stencil: depth_state(false, CompareFunction::LessEqual),
                color_targets: vec![ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::alpha_blending()),
                    write_mask: ColorWrites::ALL,
                }],
            },
        ))?),
        None => None,
    };

    Ok(GpuResources {
        shadow_pipeline,
        scene_pipeline,
        overlay_pipeline,
        model,
        floor,
        fog_grid,
        transforms: [transforms[0], transforms[1], transforms[2], transforms[3]],
        light_buffer: scene_pixel.light_buffer,
        shadow_inputs,
        shadow: ShadowTargets {
            color_view: shadow_pixel.color_view,
            depth_view: shadow_vertex.depth_view,
            size: settings.shadow_map_size,
        },
        ledger: std::mem::take(ledger),
    })
}
