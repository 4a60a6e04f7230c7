//! Headless backend that records every command it receives
//!
//! Used for tests and for validating frame structure without a GPU. Resources
//! are tracked by handle so leaks and double frees are visible, and every bind
//! is checked against the attachments of the open render pass.

use crate::backend::traits::*;
use crate::backend::types::*;
use std::collections::{HashMap, HashSet};

/// Kind of a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    TextureView,
    Sampler,
    ShaderModule,
    BindGroupLayout,
    BindGroup,
    RenderPipeline,
}

/// A command as seen by the device
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginFrame,
    EndFrame,
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        data: Vec<u8>,
    },
    BeginRenderPass {
        label: Option<String>,
        color_attachments: Vec<TextureViewHandle>,
        depth_attachment: Option<TextureViewHandle>,
    },
    EndRenderPass,
    SetPipeline(RenderPipelineHandle),
    SetBindGroup {
        index: u32,
        bind_group: BindGroupHandle,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    SetIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
    },
    SetViewport {
        width: f32,
        height: f32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
}

impl RecordedCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, RecordedCommand::DrawIndexed { .. })
    }

    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            RecordedCommand::SetPipeline(_)
                | RecordedCommand::SetBindGroup { .. }
                | RecordedCommand::SetVertexBuffer { .. }
                | RecordedCommand::SetIndexBuffer { .. }
        )
    }
}

struct OpenPass {
    attachments: HashSet<TextureViewHandle>,
}

/// Backend that stores commands instead of executing them
pub struct RecordingBackend {
    width: u32,
    height: u32,
    format: TextureFormat,
    commands: Vec<RecordedCommand>,

    live: HashMap<(ResourceKind, u64), String>,
    bind_group_views: HashMap<u64, Vec<TextureViewHandle>>,
    next_id: u64,

    swapchain_view: TextureViewHandle,
    depth_view: TextureViewHandle,
    in_frame: bool,
    open_pass: Option<OpenPass>,

    fail_labels: HashSet<String>,
    device_lost: bool,
    violations: Vec<String>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Bgra8UnormSrgb,
            commands: Vec::new(),
            live: HashMap::new(),
            bind_group_views: HashMap::new(),
            // 1 and 2 are the back buffer and its depth buffer
            next_id: 3,
            swapchain_view: TextureViewHandle(1),
            depth_view: TextureViewHandle(2),
            in_frame: false,
            open_pass: None,
            fail_labels: HashSet::new(),
            device_lost: false,
            violations: Vec::new(),
        }
    }

    /// Make every creation carrying `label` fail.
    pub fn fail_on_label(&mut self, label: impl Into<String>) {
        self.fail_labels.insert(label.into());
    }

    /// Simulate a removed or reset device. Every later creation and frame fails.
    pub fn lose_device(&mut self) {
        self.device_lost = true;
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Protocol errors and read/write hazards observed so far
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn swapchain_view(&self) -> TextureViewHandle {
        self.swapchain_view
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.live.keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.label(ResourceKind::Buffer, buffer.0)
    }

    pub fn pipeline_label(&self, pipeline: RenderPipelineHandle) -> Option<&str> {
        self.label(ResourceKind::RenderPipeline, pipeline.0)
    }

    pub fn texture_view_label(&self, view: TextureViewHandle) -> Option<&str> {
        if view == self.swapchain_view {
            return Some("back buffer");
        }
        if view == self.depth_view {
            return Some("back buffer depth");
        }
        self.label(ResourceKind::TextureView, view.0)
    }

    /// Views a bind group exposes to shaders
    pub fn bind_group_views(&self, bind_group: BindGroupHandle) -> &[TextureViewHandle] {
        self.bind_group_views
            .get(&bind_group.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn label(&self, kind: ResourceKind, id: u64) -> Option<&str> {
        self.live.get(&(kind, id)).map(String::as_str)
    }

    fn create(&mut self, kind: ResourceKind, label: Option<&str>) -> BackendResult<u64> {
        if self.device_lost {
            return Err(BackendError::DeviceLost);
        }
        let label = label.unwrap_or_default().to_string();
        if self.fail_labels.contains(&label) {
            let message = format!("injected failure for '{}'", label);
            return Err(match kind {
                ResourceKind::Buffer => BackendError::BufferCreationFailed(message),
                ResourceKind::Texture | ResourceKind::TextureView => {
                    BackendError::TextureCreationFailed(message)
                }
                ResourceKind::Sampler => BackendError::SamplerCreationFailed(message),
                ResourceKind::ShaderModule => BackendError::ShaderCreationFailed(message),
                ResourceKind::BindGroupLayout
                | ResourceKind::BindGroup
                | ResourceKind::RenderPipeline => BackendError::PipelineCreationFailed(message),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert((kind, id), label);
        Ok(id)
    }

    fn require(&mut self, kind: ResourceKind, id: u64, what: &str) -> BackendResult<()> {
        if self.live.contains_key(&(kind, id)) {
            Ok(())
        } else {
            self.violations
                .push(format!("{} references a released {:?}", what, kind));
            Err(BackendError::PipelineCreationFailed(format!(
                "{:?} {} not found",
                kind, id
            )))
        }
    }

    fn destroy(&mut self, kind: ResourceKind, id: u64) {
        if self.live.remove(&(kind, id)).is_none() {
            self.violations
                .push(format!("{:?} {} released twice or never created", kind, id));
        }
    }

    fn in_pass(&mut self, what: &str) -> bool {
        if self.open_pass.is_none() {
            self.violations.push(format!("{} outside a render pass", what));
            false
        } else {
            true
        }
    }
}

impl GraphicsBackend for RecordingBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        if self.device_lost {
            return Err(BackendError::DeviceLost);
        }
        if self.in_frame {
            self.violations.push("begin_frame inside a frame".into());
        }
        self.in_frame = true;
        self.commands.push(RecordedCommand::BeginFrame);
        Ok(FrameContext {
            swapchain_view: self.swapchain_view,
            depth_view: self.depth_view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if self.open_pass.is_some() {
            self.violations.push("end_frame with an open render pass".into());
        }
        self.in_frame = false;
        self.commands.push(RecordedCommand::EndFrame);
        if self.device_lost {
            return Err(BackendError::DeviceLost);
        }
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        self.format
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        self.create(ResourceKind::Buffer, desc.label.as_deref())
            .map(BufferHandle)
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        if data.len() as u64 > desc.size {
            return Err(BackendError::BufferCreationFailed(format!(
                "{} bytes do not fit a {} byte buffer",
                data.len(),
                desc.size
            )));
        }
        self.create_buffer(desc)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if !self.live.contains_key(&(ResourceKind::Buffer, buffer.0)) {
            self.violations.push("write to a released buffer".into());
            return;
        }
        self.commands.push(RecordedCommand::WriteBuffer {
            buffer,
            offset,
            data: data.to_vec(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::TextureCreationFailed("zero-sized texture".into()));
        }
        self.create(ResourceKind::Texture, desc.label.as_deref())
            .map(TextureHandle)
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        self.require(ResourceKind::Texture, texture.0, "texture view")?;
        let label = self
            .label(ResourceKind::Texture, texture.0)
            .map(|l| format!("{} view", l));
        self.create(ResourceKind::TextureView, label.as_deref())
            .map(TextureViewHandle)
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        self.create(ResourceKind::Sampler, desc.label.as_deref())
            .map(SamplerHandle)
    }

    fn create_shader_module(
        &mut self,
        desc: &ShaderModuleDescriptor,
    ) -> BackendResult<ShaderModuleHandle> {
        self.create(ResourceKind::ShaderModule, desc.label.as_deref())
            .map(ShaderModuleHandle)
    }

    fn create_bind_group_layout(
        &mut self,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        self.create(ResourceKind::BindGroupLayout, None)
            .map(BindGroupLayoutHandle)
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        self.require(ResourceKind::BindGroupLayout, layout.0, "bind group")?;
        let mut views = Vec::new();
        for (_, entry) in entries {
            match entry {
                BindGroupEntry::Buffer { buffer, .. } => {
                    self.require(ResourceKind::Buffer, buffer.0, "bind group")?
                }
                BindGroupEntry::Texture(view) => {
                    self.require(ResourceKind::TextureView, view.0, "bind group")?;
                    views.push(*view);
                }
                BindGroupEntry::Sampler(sampler) => {
                    self.require(ResourceKind::Sampler, sampler.0, "bind group")?
                }
            }
        }
        let id = self.create(ResourceKind::BindGroup, None)?;
        self.bind_group_views.insert(id, views);
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        self.require(ResourceKind::ShaderModule, desc.vertex_module.0, "pipeline")?;
        if let Some(fragment) = desc.fragment_module {
            self.require(ResourceKind::ShaderModule, fragment.0, "pipeline")?;
        }
        for layout in &desc.bind_group_layouts {
            self.require(ResourceKind::BindGroupLayout, layout.0, "pipeline")?;
        }
        self.create(ResourceKind::RenderPipeline, desc.label.as_deref())
            .map(RenderPipelineHandle)
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        if !self.in_frame {
            self.violations.push("render pass outside a frame".into());
        }
        if self.open_pass.is_some() {
            self.violations.push("nested render pass".into());
        }
        self.commands.push(RecordedCommand::BeginRenderPass {
            label: desc.label.clone(),
            color_attachments: desc.color_attachments.iter().map(|a| a.view).collect(),
            depth_attachment: desc.depth_stencil_attachment.as_ref().map(|d| d.view),
        });
        self.open_pass = Some(OpenPass {
            attachments: desc.attached_views().collect(),
        });
    }

    fn end_render_pass(&mut self) {
        if self.open_pass.take().is_none() {
            self.violations.push("end_render_pass without a pass".into());
        }
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        if self.in_pass("set_render_pipeline") {
            self.commands.push(RecordedCommand::SetPipeline(pipeline));
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        if !self.in_pass("set_bind_group") {
            return;
        }
        let conflicting: Vec<TextureViewHandle> = match &self.open_pass {
            Some(pass) => self
                .bind_group_views(bind_group)
                .iter()
                .copied()
                .filter(|view| pass.attachments.contains(view))
                .collect(),
            None => Vec::new(),
        };
        for view in conflicting {
            let name = self.texture_view_label(view).unwrap_or("texture").to_string();
            self.violations
                .push(format!("{} bound as input while attached as a target", name));
        }
        self.commands
            .push(RecordedCommand::SetBindGroup { index, bind_group });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        if self.in_pass("set_vertex_buffer") {
            self.commands
                .push(RecordedCommand::SetVertexBuffer { slot, buffer });
        }
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, format: IndexFormat) {
        if self.in_pass("set_index_buffer") {
            self.commands
                .push(RecordedCommand::SetIndexBuffer { buffer, format });
        }
    }

    fn set_viewport(
        &mut self,
        _x: f32,
        _y: f32,
        width: f32,
        height: f32,
        _min_depth: f32,
        _max_depth: f32,
    ) {
        if self.in_pass("set_viewport") {
            self.commands
                .push(RecordedCommand::SetViewport { width, height });
        }
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        _base_vertex: i32,
        instances: std::ops::Range<u32>,
    ) {
        if self.in_pass("draw_indexed") {
            self.commands.push(RecordedCommand::DrawIndexed {
                index_count: indices.len() as u32,
                instance_count: instances.len() as u32,
            });
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.destroy(ResourceKind::Buffer, buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.destroy(ResourceKind::Texture, texture.0);
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        self.destroy(ResourceKind::TextureView, view.0);
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.destroy(ResourceKind::Sampler, sampler.0);
    }

    fn destroy_shader_module(&mut self, module: ShaderModuleHandle) {
        self.destroy(ResourceKind::ShaderModule, module.0);
    }

    fn destroy_bind_group_layout(&mut self, layout: BindGroupLayoutHandle) {
        self.destroy(ResourceKind::BindGroupLayout, layout.0);
    }

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        self.bind_group_views.remove(&bind_group.0);
        self.destroy(ResourceKind::BindGroup, bind_group.0);
    }

    fn destroy_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.destroy(ResourceKind::RenderPipeline, pipeline.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(backend: &mut RecordingBackend, label: &str) -> TextureViewHandle {
        let texture = backend
            .create_texture(&TextureDescriptor::render_target(
                label,
                64,
                TextureFormat::Rgba16Float,
            ))
            .unwrap();
        backend.create_texture_view(texture).unwrap()
    }

    fn sampled_group(backend: &mut RecordingBackend, view: TextureViewHandle) -> BindGroupHandle {
        let layout = backend
            .create_bind_group_layout(&[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                },
            }])
            .unwrap();
        backend
            .create_bind_group(layout, &[(0, BindGroupEntry::Texture(view))])
            .unwrap()
    }

    fn pass_writing(view: TextureViewHandle) -> RenderPassDescriptor {
        RenderPassDescriptor {
            label: Some("test".into()),
            color_attachments: vec![ColorAttachment {
                view,
                load_op: LoadOp::Clear([0.0; 4]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        }
    }

    #[test]
    fn test_binding_an_attached_view_is_a_hazard() {
        let mut backend = RecordingBackend::new(8, 8);
        let view = target(&mut backend, "shadow");
        let group = sampled_group(&mut backend, view);

        backend.begin_frame().unwrap();
        backend.begin_render_pass(&pass_writing(view));
        backend.set_bind_group(1, group);
        backend.end_render_pass();
        backend.end_frame().unwrap();

        assert_eq!(backend.violations().len(), 1);
        assert!(backend.violations()[0].contains("shadow view"));
    }

    #[test]
    fn test_binding_in_a_different_pass_is_fine() {
        let mut backend = RecordingBackend::new(8, 8);
        let view = target(&mut backend, "shadow");
        let group = sampled_group(&mut backend, view);
        let swapchain = backend.swapchain_view();

        backend.begin_frame().unwrap();
        backend.begin_render_pass(&pass_writing(view));
        backend.end_render_pass();
        backend.begin_render_pass(&pass_writing(swapchain));
        backend.set_bind_group(1, group);
        backend.end_render_pass();
        backend.end_frame().unwrap();

        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_injected_failure_and_device_loss() {
        let mut backend = RecordingBackend::new(8, 8);
        backend.fail_on_label("broken");
        let err = backend
            .create_buffer(&BufferDescriptor::uniform("broken", 16))
            .unwrap_err();
        assert!(matches!(err, BackendError::BufferCreationFailed(_)));
        assert_eq!(backend.live_count(), 0);

        backend.lose_device();
        assert_eq!(
            backend.create_buffer(&BufferDescriptor::uniform("fine", 16)),
            Err(BackendError::DeviceLost)
        );
        assert_eq!(backend.begin_frame().unwrap_err(), BackendError::DeviceLost);
    }

    #[test]
    fn test_double_destroy_is_reported() {
        let mut backend = RecordingBackend::new(8, 8);
        let buffer = backend
            .create_buffer(&BufferDescriptor::uniform("once", 16))
            .unwrap();
        backend.destroy_buffer(buffer);
        backend.destroy_buffer(buffer);
        assert_eq!(backend.live_count(), 0);
        assert_eq!(backend.violations().len(), 1);
    }
}
