//! Per-frame behaviour of the engine on the recording backend.

mod common;

use glam::Mat4;

use common::{
    bind_count, builtin_engine, draw_count, engine_with, pass_labels, GatedSource, HEIGHT, WIDTH,
};
use fogmap_renderer::assets::builtin_source;
use fogmap_renderer::backend::{RecordedCommand, RecordingBackend};
use fogmap_renderer::load_graph::DrawSlot;
use fogmap_renderer::renderer::FrameOutcome;
use fogmap_renderer::scene::TransformUniformData;
use fogmap_renderer::{Engine, RendererConfig};

fn ready_engine(config: RendererConfig) -> Engine<RecordingBackend> {
    let mut engine = builtin_engine(config);
    engine.wait_until_ready().unwrap();
    engine.backend_mut().clear_commands();
    engine
}

/// Last transform block written to the buffer of `slot`
fn uploaded_transform(engine: &Engine<RecordingBackend>, slot: DrawSlot) -> TransformUniformData {
    let buffer = engine.resources().unwrap().transform(slot).buffer;
    engine
        .backend()
        .commands()
        .iter()
        .rev()
        .find_map(|c| match c {
            RecordedCommand::WriteBuffer { buffer: b, data, .. } if *b == buffer => {
                Some(bytemuck::pod_read_unaligned::<TransformUniformData>(data))
            }
            _ => None,
        })
        .expect("slot was uploaded")
}

#[test]
fn test_render_before_ready_touches_nothing() {
    let config = RendererConfig::default();
    let gated = GatedSource::new(builtin_source(&config.assets));
    let mut engine = engine_with(gated.clone(), config);

    for _ in 0..3 {
        engine.update(1.0 / 60.0);
        assert_eq!(engine.render().unwrap(), FrameOutcome::Skipped);
    }
    let commands = engine.backend().commands();
    assert!(commands.is_empty(), "{:?}", commands);
    assert_eq!(draw_count(commands), 0);
    assert_eq!(bind_count(commands), 0);

    gated.open();
    engine.wait_until_ready().unwrap();
    assert!(matches!(engine.render().unwrap(), FrameOutcome::Drawn { .. }));
}

#[test]
fn test_passes_run_in_fixed_order() {
    let mut engine = ready_engine(RendererConfig::default());

    for _ in 0..3 {
        engine.update(1.0 / 60.0);
        assert_eq!(
            engine.render().unwrap(),
            FrameOutcome::Drawn { draw_calls: 4 }
        );
    }

    let labels = pass_labels(engine.backend().commands());
    let frame = ["Shadow Pass", "Scene Pass", "Overlay Pass"];
    assert_eq!(labels.len(), 9);
    for chunk in labels.chunks(3) {
        assert_eq!(chunk, frame);
    }
    assert!(engine.backend().violations().is_empty(), "{:?}", engine.backend().violations());
}

#[test]
fn test_shadow_texture_never_read_while_attached() {
    let mut engine = ready_engine(RendererConfig::default());
    engine.render().unwrap();
    engine.render().unwrap();

    let resources = engine.resources().unwrap();
    let shadow_view = resources.shadow.color_view;
    let backend = engine.backend();
    assert!(backend
        .bind_group_views(resources.shadow_inputs)
        .contains(&shadow_view));

    let mut attached = false;
    for command in backend.commands() {
        match command {
            RecordedCommand::BeginRenderPass {
                color_attachments, ..
            } => attached = color_attachments.contains(&shadow_view),
            RecordedCommand::EndRenderPass => attached = false,
            RecordedCommand::SetBindGroup { bind_group, .. } => {
                assert!(!(attached && *bind_group == resources.shadow_inputs));
            }
            _ => {}
        }
    }
    assert!(backend.violations().is_empty());
}

#[test]
fn test_scene_pass_draws_model_then_floor() {
    let mut engine = ready_engine(RendererConfig::default().without_overlay());
    engine.render().unwrap();

    let resources = engine.resources().unwrap();
    let vertex_buffers: Vec<_> = engine
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::SetVertexBuffer { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .collect();
    assert_eq!(
        vertex_buffers,
        vec![
            resources.model.vertex_buffer,
            resources.model.vertex_buffer,
            resources.floor.vertex_buffer,
        ]
    );
}

#[test]
fn test_resize_changes_only_projection() {
    let mut engine = ready_engine(RendererConfig::default());
    assert_eq!((WIDTH, HEIGHT), (800, 450));
    engine.render().unwrap();
    let wide = uploaded_transform(&engine, DrawSlot::SceneModel);

    engine.resize(800, 600);
    engine.render().unwrap();
    let narrow = uploaded_transform(&engine, DrawSlot::SceneModel);

    assert_ne!(wide.projection.x_axis.x, narrow.projection.x_axis.x);
    assert_eq!(wide.projection.y_axis.y, narrow.projection.y_axis.y);
    assert_eq!(wide.view, narrow.view);
    assert_eq!(wide.model, narrow.model);
    assert_eq!(wide.light_view, narrow.light_view);
    assert_eq!(wide.light_projection, narrow.light_projection);

    let viewport = engine
        .backend()
        .commands()
        .iter()
        .rev()
        .find_map(|c| match c {
            RecordedCommand::SetViewport { width, height } => Some((*width, *height)),
            _ => None,
        });
    assert_eq!(viewport, Some((800.0, 600.0)));
}

#[test]
fn test_slots_carry_their_own_model_matrix() {
    let mut engine = ready_engine(RendererConfig::default());
    engine.render().unwrap();

    let config = engine.config().clone();
    let model = uploaded_transform(&engine, DrawSlot::SceneModel);
    let floor = uploaded_transform(&engine, DrawSlot::SceneFloor);
    let shadow = uploaded_transform(&engine, DrawSlot::ShadowModel);

    assert_eq!(model.model, config.model_transform.matrix());
    assert_eq!(floor.model, config.floor_transform.matrix());
    assert_eq!(shadow.model, model.model);
    assert_eq!(model.view, floor.view);
    assert_eq!(uploaded_transform(&engine, DrawSlot::Overlay).model, Mat4::IDENTITY);
}

#[test]
fn test_light_animation_moves_light_view() {
    let mut engine = ready_engine(RendererConfig::default().with_light_animation(1.0));
    engine.render().unwrap();
    let before = uploaded_transform(&engine, DrawSlot::ShadowModel);

    engine.update(0.25);
    engine.render().unwrap();
    let after = uploaded_transform(&engine, DrawSlot::ShadowModel);

    assert_ne!(before.light_view, after.light_view);
    assert_eq!(before.view, after.view);
}
