//! Frame renderer
//!
//! Each frame runs a fixed sequence of passes:
//! 1. Shadow pass - model depth and color from the light
//! 2. Scene pass - lit model and floor on the back buffer
//! 3. Overlay pass - alpha-blended fog cells (optional)
//!
//! Nothing is bound or drawn until the load graph has published its
//! resources.

mod overlay_pass;
mod scene_pass;
mod shadow_pass;

pub use overlay_pass::OverlayPass;
pub use scene_pass::ScenePass;
pub use shadow_pass::ShadowPass;

use crate::backend::{FrameContext, GraphicsBackend, IndexFormat};
use crate::error::RenderError;
use crate::load_graph::{DrawSlot, GeometryBuffers, GpuResources};
use crate::scene::{FrameState, Transform};
use crate::RendererConfig;

/// Everything a pass needs while recording
pub struct PassContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub resources: &'a GpuResources,
    pub state: &'a FrameState,
    pub frame: FrameContext,
    draw_calls: u32,
}

impl<'a> PassContext<'a> {
    /// Upload the transform block of `slot` for an object placed by `model`
    pub fn upload_transform(&mut self, slot: DrawSlot, model: &Transform) {
        let data = self.state.transform_for(model);
        let binding = self.resources.transform(slot);
        self.backend
            .write_buffer(binding.buffer, 0, bytemuck::bytes_of(&data));
    }

    /// Bind the transform block of `slot` as group 0
    pub fn bind_transform(&mut self, slot: DrawSlot) {
        let binding = self.resources.transform(slot);
        self.backend.set_bind_group(0, binding.bind_group);
    }

    /// One indexed draw of the whole mesh
    pub fn draw(&mut self, geometry: &GeometryBuffers) {
        self.backend.set_vertex_buffer(0, geometry.vertex_buffer, 0);
        self.backend
            .set_index_buffer(geometry.index_buffer, 0, IndexFormat::Uint32);
        self.backend.draw_indexed(0..geometry.index_count, 0, 0..1);
        self.draw_calls += 1;
    }

    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }
}

/// One pass of the frame
pub trait FramePass {
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut PassContext);
}

/// Result of one `render` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Resources were not ready; nothing was recorded
    Skipped,
    Drawn { draw_calls: u32 },
}

/// Runs the passes of a frame in order
pub struct FrameRenderer {
    passes: Vec<Box<dyn FramePass>>,
}

impl FrameRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        let mut passes: Vec<Box<dyn FramePass>> = vec![
            Box::new(ShadowPass::new(config.shadow_clear_color)),
            Box::new(ScenePass::new(config.clear_color)),
        ];
        if config.fog_grid.is_some() {
            passes.push(Box::new(OverlayPass::new()));
        }
        Self { passes }
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Draw one frame.
    ///
    /// `resources` is `None` until the load graph is ready, in which case
    /// the frame is skipped without touching the backend.
    pub fn render(
        &self,
        backend: &mut dyn GraphicsBackend,
        resources: Option<&GpuResources>,
        state: &FrameState,
    ) -> Result<FrameOutcome, RenderError> {
        let Some(resources) = resources else {
            return Ok(FrameOutcome::Skipped);
        };

        let frame = backend.begin_frame()?;
        backend.write_buffer(
            resources.light_buffer,
            0,
            bytemuck::bytes_of(&state.light_data()),
        );

        let mut ctx = PassContext {
            backend: &mut *backend,
            resources,
            state,
            frame,
            draw_calls: 0,
        };
        for pass in &self.passes {
            pass.execute(&mut ctx);
        }
        let draw_calls = ctx.draw_calls();

        backend.end_frame()?;
        Ok(FrameOutcome::Drawn { draw_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{builtin_source, IoRuntime};
    use crate::backend::{RecordedCommand, RecordingBackend};
    use crate::load_graph::LoadCoordinator;

    fn loaded(config: &RendererConfig) -> (RecordingBackend, LoadCoordinator) {
        let mut backend = RecordingBackend::new(640, 480);
        let mut loader = LoadCoordinator::new(
            config.load_settings(),
            builtin_source(&config.assets),
            IoRuntime::new().unwrap(),
        );
        loader.wait(&mut backend).unwrap();
        backend.clear_commands();
        (backend, loader)
    }

    fn pass_labels(backend: &RecordingBackend) -> Vec<String> {
        backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass { label, .. } => label.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_skips_without_resources() {
        let config = RendererConfig::default();
        let renderer = FrameRenderer::new(&config);
        let mut backend = RecordingBackend::new(640, 480);

        let outcome = renderer
            .render(&mut backend, None, &FrameState::default())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_pass_order() {
        let config = RendererConfig::default();
        let renderer = FrameRenderer::new(&config);
        assert_eq!(
            renderer.pass_names(),
            vec!["Shadow Pass", "Scene Pass", "Overlay Pass"]
        );

        let (mut backend, loader) = loaded(&config);
        let outcome = renderer
            .render(&mut backend, loader.resources(), &FrameState::default())
            .unwrap();

        // Model into the shadow map, model and floor, then the fog grid
        assert_eq!(outcome, FrameOutcome::Drawn { draw_calls: 4 });
        assert_eq!(
            pass_labels(&backend),
            vec!["Shadow Pass", "Scene Pass", "Overlay Pass"]
        );
        assert_eq!(backend.commands().first(), Some(&RecordedCommand::BeginFrame));
        assert_eq!(backend.commands().last(), Some(&RecordedCommand::EndFrame));
        assert!(backend.violations().is_empty(), "{:?}", backend.violations());
    }

    #[test]
    fn test_without_overlay() {
        let config = RendererConfig::default().without_overlay();
        let renderer = FrameRenderer::new(&config);
        let (mut backend, loader) = loaded(&config);

        let outcome = renderer
            .render(&mut backend, loader.resources(), &FrameState::default())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Drawn { draw_calls: 3 });
        assert_eq!(pass_labels(&backend), vec!["Shadow Pass", "Scene Pass"]);
    }

    #[test]
    fn test_shadow_pass_targets() {
        let config = RendererConfig::default().with_shadow_map_size(512);
        let renderer = FrameRenderer::new(&config);
        let (mut backend, loader) = loaded(&config);
        let resources = loader.resources().unwrap();

        renderer
            .render(&mut backend, Some(resources), &FrameState::default())
            .unwrap();

        let commands = backend.commands();
        let begin = commands
            .iter()
            .position(|c| matches!(c, RecordedCommand::BeginRenderPass { .. }))
            .unwrap();
        assert_eq!(
            commands[begin],
            RecordedCommand::BeginRenderPass {
                label: Some("Shadow Pass".into()),
                color_attachments: vec![resources.shadow.color_view],
                depth_attachment: Some(resources.shadow.depth_view),
            }
        );
        assert_eq!(
            commands[begin + 1],
            RecordedCommand::SetViewport {
                width: 512.0,
                height: 512.0
            }
        );
        assert_eq!(
            commands[begin + 2],
            RecordedCommand::SetPipeline(resources.shadow_pipeline)
        );
    }

    #[test]
    fn test_uploads_every_slot() {
        let config = RendererConfig::default();
        let renderer = FrameRenderer::new(&config);
        let (mut backend, loader) = loaded(&config);
        let resources = loader.resources().unwrap();
        let state = FrameState::default();

        renderer.render(&mut backend, Some(resources), &state).unwrap();

        let written: Vec<_> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::WriteBuffer { buffer, data, .. } => Some((*buffer, data.len())),
                _ => None,
            })
            .collect();
        assert!(written.contains(&(resources.light_buffer, 48)));
        for slot in DrawSlot::ALL {
            assert!(written.contains(&(resources.transform(slot).buffer, 320)));
        }

        let expected = state.transform_for(&state.model);
        assert!(backend.commands().iter().any(|c| matches!(
            c,
            RecordedCommand::WriteBuffer { buffer, data, .. }
                if *buffer == resources.transform(DrawSlot::ShadowModel).buffer
                    && data.as_slice() == bytemuck::bytes_of(&expected)
        )));
    }

    #[test]
    fn test_device_lost_mid_frame() {
        let config = RendererConfig::default();
        let renderer = FrameRenderer::new(&config);
        let (mut backend, loader) = loaded(&config);

        backend.lose_device();
        let err = renderer
            .render(&mut backend, loader.resources(), &FrameState::default())
            .unwrap_err();
        assert!(err.is_device_fatal());
    }
}
