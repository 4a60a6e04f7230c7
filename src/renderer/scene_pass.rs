//! Scene pass: lit model and floor on the back buffer

use crate::backend::*;
use crate::load_graph::DrawSlot;

use super::{FramePass, PassContext};

pub struct ScenePass {
    clear_color: [f32; 4],
}

impl ScenePass {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self { clear_color }
    }
}

impl FramePass for ScenePass {
    fn name(&self) -> &str {
        "Scene Pass"
    }

    fn execute(&self, ctx: &mut PassContext) {
        let resources = ctx.resources;
        let frame = ctx.frame;
        let (model, floor) = (ctx.state.model, ctx.state.floor);
        ctx.upload_transform(DrawSlot::SceneModel, &model);
        ctx.upload_transform(DrawSlot::SceneFloor, &floor);

        ctx.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                load_op: LoadOp::Clear(self.clear_color),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: frame.depth_view,
                depth_load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
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
        ctx.backend.set_render_pipeline(resources.scene_pipeline);
        // Shadow texture, sampler and light block are read-only inputs here
        ctx.backend.set_bind_group(1, resources.shadow_inputs);

        ctx.bind_transform(DrawSlot::SceneModel);
        ctx.draw(&resources.model);
        ctx.bind_transform(DrawSlot::SceneFloor);
        ctx.draw(&resources.floor);

        ctx.backend.end_render_pass();
    }
}
