//! Shadow pass: the model seen from the light

use crate::backend::*;
use crate::load_graph::DrawSlot;

use super::{FramePass, PassContext};

pub struct ShadowPass {
    clear_color: [f32; 4],
}

impl ShadowPass {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self { clear_color }
    }
}

impl FramePass for ShadowPass {
    fn name(&self) -> &str {
        "Shadow Pass"
    }

    fn execute(&self, ctx: &mut PassContext) {
        let resources = ctx.resources;
        let shadow = resources.shadow;
        let model = ctx.state.model;
        ctx.upload_transform(DrawSlot::ShadowModel, &model);

        ctx.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Shadow Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: shadow.color_view,
                load_op: LoadOp::Clear(self.clear_color),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: shadow.depth_view,
                depth_load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
            }),
        });
        let size = shadow.size as f32;
        ctx.backend.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
        ctx.backend.set_render_pipeline(resources.shadow_pipeline);
        ctx.bind_transform(DrawSlot::ShadowModel);
        ctx.draw(&resources.model);
        ctx.backend.end_render_pass();
    }
}
