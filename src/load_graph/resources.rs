//! GPU resource set and ownership tracking

use crate::backend::{
    BackendResult, BindGroupHandle, BindGroupLayoutHandle, BufferDescriptor, BufferHandle,
    BufferUsage, GraphicsBackend, RenderPipelineHandle, SamplerHandle, ShaderModuleHandle,
    TextureHandle, TextureViewHandle,
};
use crate::resources::Mesh;

/// Any handle the load graph can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuHandle {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    TextureView(TextureViewHandle),
    Sampler(SamplerHandle),
    ShaderModule(ShaderModuleHandle),
    BindGroupLayout(BindGroupLayoutHandle),
    BindGroup(BindGroupHandle),
    RenderPipeline(RenderPipelineHandle),
}

macro_rules! impl_from_handle {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(impl From<$handle> for GpuHandle {
            fn from(handle: $handle) -> Self {
                GpuHandle::$variant(handle)
            }
        })*
    };
}

impl_from_handle!(
    BufferHandle => Buffer,
    TextureHandle => Texture,
    TextureViewHandle => TextureView,
    SamplerHandle => Sampler,
    ShaderModuleHandle => ShaderModule,
    BindGroupLayoutHandle => BindGroupLayout,
    BindGroupHandle => BindGroup,
    RenderPipelineHandle => RenderPipeline,
);

/// Every handle created for one device generation, in creation order
#[derive(Debug, Default)]
pub struct ResourceLedger {
    handles: Vec<GpuHandle>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ownership of a freshly created handle
    pub fn track<H: Into<GpuHandle> + Copy>(&mut self, handle: H) -> H {
        self.handles.push(handle.into());
        handle
    }

    /// Record the handle of a successful creation and pass the result through
    pub fn adopt<H: Into<GpuHandle> + Copy>(
        &mut self,
        created: BackendResult<H>,
    ) -> BackendResult<H> {
        created.map(|handle| self.track(handle))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, handle: impl Into<GpuHandle>) -> bool {
        self.handles.contains(&handle.into())
    }

    /// Release everything, newest first so dependents go before what they use
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        for handle in self.handles.drain(..).rev() {
            match handle {
                GpuHandle::Buffer(h) => backend.destroy_buffer(h),
                GpuHandle::Texture(h) => backend.destroy_texture(h),
                GpuHandle::TextureView(h) => backend.destroy_texture_view(h),
                GpuHandle::Sampler(h) => backend.destroy_sampler(h),
                GpuHandle::ShaderModule(h) => backend.destroy_shader_module(h),
                GpuHandle::BindGroupLayout(h) => backend.destroy_bind_group_layout(h),
                GpuHandle::BindGroup(h) => backend.destroy_bind_group(h),
                GpuHandle::RenderPipeline(h) => backend.destroy_render_pipeline(h),
            }
        }
    }
}

/// Vertex and index buffers of one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBuffers {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

impl GeometryBuffers {
    pub fn upload<V: bytemuck::Pod>(
        backend: &mut dyn GraphicsBackend,
        ledger: &mut ResourceLedger,
        mesh: &Mesh<V>,
    ) -> BackendResult<Self> {
        let vertex_bytes = mesh.vertex_bytes();
        let vertex_buffer = ledger.adopt(backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} vertices", mesh.name)),
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            },
            vertex_bytes,
        ))?;

        let index_bytes = mesh.index_bytes();
        let index_buffer = ledger.adopt(backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} indices", mesh.name)),
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            },
            index_bytes,
        ))?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        })
    }
}

/// Draws that need their own transform block within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawSlot {
    ShadowModel,
    SceneModel,
    SceneFloor,
    Overlay,
}

impl DrawSlot {
    pub const ALL: [DrawSlot; 4] = [
        DrawSlot::ShadowModel,
        DrawSlot::SceneModel,
        DrawSlot::SceneFloor,
        DrawSlot::Overlay,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            DrawSlot::ShadowModel => "shadow model transform",
            DrawSlot::SceneModel => "scene model transform",
            DrawSlot::SceneFloor => "scene floor transform",
            DrawSlot::Overlay => "overlay transform",
        }
    }
}

/// Uniform buffer and bind group of one draw slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformBinding {
    pub buffer: BufferHandle,
    pub bind_group: BindGroupHandle,
}

/// Render targets written by the shadow pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowTargets {
    pub color_view: TextureViewHandle,
    pub depth_view: TextureViewHandle,
    pub size: u32,
}

/// Everything the frame renderer draws with
///
/// Only exists once the join step has completed. Handles are borrowed by the
/// renderer and released together through [`ResourceLedger`].
#[derive(Debug)]
pub struct GpuResources {
    pub shadow_pipeline: RenderPipelineHandle,
    pub scene_pipeline: RenderPipelineHandle,
    pub overlay_pipeline: Option<RenderPipelineHandle>,

    pub model: GeometryBuffers,
    pub floor: GeometryBuffers,
    pub fog_grid: Option<GeometryBuffers>,

    pub transforms: [TransformBinding; 4],
    pub light_buffer: BufferHandle,
    /// Group 1 of the scene and overlay stages: shadow texture, sampler, light
    pub shadow_inputs: BindGroupHandle,
    pub shadow: ShadowTargets,

    pub(crate) ledger: ResourceLedger,
}

impl GpuResources {
    pub fn transform(&self, slot: DrawSlot) -> TransformBinding {
        self.transforms[slot.index()]
    }

    /// Number of GPU objects owned by this set
    pub fn handle_count(&self) -> usize {
        self.ledger.len()
    }

    pub(crate) fn release(mut self, backend: &mut dyn GraphicsBackend) {
        self.ledger.release(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, ResourceKind};
    use crate::resources::primitives;

    #[test]
    fn test_upload_tracks_both_buffers() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut ledger = ResourceLedger::new();
        let floor =
            GeometryBuffers::upload(&mut backend, &mut ledger, &primitives::floor()).unwrap();

        assert_eq!(floor.index_count, 6);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(floor.vertex_buffer));
        assert_eq!(backend.buffer_label(floor.index_buffer), Some("floor indices"));

        ledger.release(&mut backend);
        assert!(ledger.is_empty());
        assert_eq!(backend.live_count_of(ResourceKind::Buffer), 0);
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_failed_creation_is_not_tracked() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.fail_on_label("cube indices");
        let mut ledger = ResourceLedger::new();

        let result = GeometryBuffers::upload(&mut backend, &mut ledger, &primitives::cube());
        assert!(result.is_err());
        // The vertex buffer made it and must still be released
        assert_eq!(ledger.len(), 1);
        ledger.release(&mut backend);
        assert_eq!(backend.live_count(), 0);
    }
}
