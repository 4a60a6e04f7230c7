//! Overlay pass: translucent fog cells over the finished scene

use crate::backend::*;
use crate::load_graph::DrawSlot;

use super::{FramePass, PassContext};

#[derive(Default)]
pub struct OverlayPass;

impl OverlayPass {
    pub fn new() -> Self {
        Self
    }
}

impl FramePass for OverlayPass {
    fn name(&self) -> &str {
        "Overlay Pass"
    }

    fn execute(&self, ctx: &mut PassContext) {
        let resources = ctx.resources;
        let (Some(pipeline), Some(grid)) = (resources.overlay_pipeline, resources.fog_grid) else {
            return;
        };
        let frame = ctx.frame;
        let overlay = ctx.state.overlay;
        ctx.upload_transform(DrawSlot::Overlay, &overlay);

        // Keep what the scene pass drew
        ctx.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Overlay Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: frame.depth_view,
                depth_load_op: LoadOp::Load,
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
            }),
        });
        ctx.backend.set_viewport(
            0.0,
            0.0,
            frame.width as f32,
            frame.height as f32,
            0.0,
            1.0,
        );
        // Blending lives in this pipeline only
        ctx.backend.set_render_pipeline(pipeline);
        ctx.backend.set_bind_group(1, resources.shadow_inputs);
        ctx.bind_transform(DrawSlot::Overlay);
        ctx.draw(&grid);
        // Ending the pass drops the shadow texture binding before the next
        // frame attaches it as a target again
        ctx.backend.end_render_pass();
    }
}
