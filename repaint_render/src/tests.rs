// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end refreshes through the software units.

use std::sync::{Arc, Mutex};

use repaint_core::buffer::FrameBuffers;
use repaint_core::color::{Color32, ColorFormat};
use repaint_core::config::DisplayConfig;
use repaint_core::draw::{DrawDescriptor, DrawPipeline, DrawUnit};
use repaint_core::pixbuf::{PixelBuf, lock};
use repaint_core::testing::{MockId, MockTree, RecordingPanel};
use repaint_core::time::HostTime;
use repaint_core::trace::Tracer;
use repaint_core::tree::{CompositeStyle, Isolation, Screens};
use repaint_core::{Area, Display};

use crate::{SoftwareUnit, ThreadedUnit};

fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
    Area::new(x1, y1, x2, y2).unwrap()
}

const SCREEN: Area = Area {
    x1: 0,
    y1: 0,
    x2: 99,
    y2: 99,
};
const RED: Color32 = Color32::opaque(255, 0, 0);
const BLUE: Color32 = Color32::opaque(0, 0, 255);

fn software() -> Vec<Box<dyn DrawUnit>> {
    vec![Box::new(SoftwareUnit::new())]
}

fn threaded() -> Vec<Box<dyn DrawUnit>> {
    vec![Box::new(ThreadedUnit::new(4).unwrap())]
}

// ---------------------------------------------------------------------------
// Pipeline level
// ---------------------------------------------------------------------------

fn fill(color: Color32) -> DrawDescriptor {
    DrawDescriptor::Fill { color, opa: 255 }
}

/// Queues `tasks` on a fresh root layer, finishes it and returns the pixels.
fn draw_root(units: Vec<Box<dyn DrawUnit>>, tasks: &[(Area, DrawDescriptor)]) -> Vec<Color32> {
    let pipeline = DrawPipeline::new(SCREEN, units);
    let buf = Arc::new(Mutex::new(
        PixelBuf::try_new(SCREEN, ColorFormat::Xrgb8888).unwrap(),
    ));
    let root = pipeline.create_root(buf.clone(), SCREEN, ColorFormat::Xrgb8888);
    for (a, desc) in tasks {
        pipeline.add_task(root, *a, SCREEN, desc.clone()).unwrap();
    }
    pipeline.finish(root);
    assert_eq!(pipeline.stats().tasks_finished, tasks.len() as u64);
    lock(&buf).pixels().to_vec()
}

fn pixel(pixels: &[Color32], x: i32, y: i32) -> Color32 {
    pixels[y as usize * SCREEN.width() as usize + x as usize]
}

#[test]
fn later_task_wins_where_tasks_overlap() {
    let tasks = [
        (area(0, 0, 59, 59), fill(RED)),
        (area(40, 40, 99, 99), fill(BLUE)),
    ];
    for units in [software(), threaded()] {
        let px = draw_root(units, &tasks);
        assert_eq!(pixel(&px, 10, 10), RED);
        assert_eq!(pixel(&px, 50, 50), BLUE);
        assert_eq!(pixel(&px, 90, 90), BLUE);
    }
}

#[test]
fn threaded_output_matches_sequential_output() {
    // A grid of disjoint tiles, each overdrawn by a translucent strip that
    // straddles its neighbours.
    let mut tasks = Vec::new();
    for ty in 0..10 {
        for tx in 0..10 {
            let tile = Area::from_origin_size(tx * 10, ty * 10, 10, 10);
            let shade = u8::try_from(tx * 20 + ty).unwrap();
            tasks.push((tile, fill(Color32::opaque(shade, 255 - shade, 64))));
        }
        let strip = area(0, ty * 10 + 3, 99, ty * 10 + 12);
        tasks.push((
            strip,
            DrawDescriptor::Fill {
                color: Color32::WHITE,
                opa: 96,
            },
        ));
    }
    let image: Arc<[Color32]> = (0..400_u32)
        .map(|i| Color32::opaque(0, 0, u8::try_from(i % 256).unwrap()))
        .collect();
    tasks.push((
        area(30, 30, 49, 49),
        DrawDescriptor::Image {
            pixels: image,
            size: (20, 20),
            opa: 200,
        },
    ));

    let sequential = draw_root(software(), &tasks);
    for _ in 0..4 {
        assert!(draw_root(threaded(), &tasks) == sequential);
    }
}

#[test]
fn budgeted_unit_still_finishes_every_task() {
    let tasks: Vec<_> = (0..10)
        .map(|i| (area(i * 10, 0, i * 10 + 9, 99), fill(RED)))
        .collect();
    let px = draw_root(vec![Box::new(SoftwareUnit::with_budget(3))], &tasks);
    assert!(px.iter().all(|c| *c == RED));
}

// ---------------------------------------------------------------------------
// Display level
// ---------------------------------------------------------------------------

fn refresh(units: Vec<Box<dyn DrawUnit>>, tree: &mut MockTree, root: MockId) -> RecordingPanel {
    let config = DisplayConfig::partial(100, 100);
    let buffers = FrameBuffers::single(100 * 25 * 4, ColorFormat::Xrgb8888).unwrap();
    let mut display = Display::new(config, buffers, units).unwrap();
    *display.screens_mut() = Screens::with_active(root);
    display.invalidate(Some(SCREEN)).unwrap();
    let mut panel = RecordingPanel::new().with_frame(SCREEN);
    let report = display.refresh_now(HostTime(0), tree, &mut panel, &mut Tracer::none());
    assert_eq!(report.bands, 4);
    panel
}

#[test]
fn half_opacity_object_blends_with_the_background() {
    let mut tree = MockTree::new();
    let root = tree.add_root(SCREEN, Some(Color32::BLACK));
    let obj = tree.add(root, area(20, 20, 39, 39), Some(Color32::WHITE));
    tree.node_mut(obj).isolation = Isolation::Simple;
    tree.node_mut(obj).style.opa = 128;

    let panel = refresh(software(), &mut tree, root);
    let px = panel.pixel(30, 30).unwrap();
    assert!((127..=129).contains(&px.r), "about half white: {px:?}");
    assert_eq!(panel.pixel(10, 10), Some(Color32::BLACK));
}

#[test]
fn rounded_clip_hides_children_in_the_corners() {
    let mut tree = MockTree::new();
    let root = tree.add_root(SCREEN, Some(Color32::BLACK));
    let card = tree.add(root, area(20, 20, 59, 59), Some(BLUE));
    tree.node_mut(card).clip_radius = 10;
    tree.add(card, area(20, 20, 59, 59), Some(Color32::WHITE));

    let panel = refresh(software(), &mut tree, root);
    assert_eq!(panel.pixel(20, 20), Some(BLUE), "corner shows the card");
    assert_eq!(panel.pixel(59, 59), Some(BLUE));
    assert_eq!(panel.pixel(40, 20), Some(Color32::WHITE), "edge midpoint");
    assert_eq!(panel.pixel(40, 40), Some(Color32::WHITE));
}

#[test]
fn circle_clip_on_an_even_card() {
    let scene = || {
        let mut tree = MockTree::new();
        let root = tree.add_root(SCREEN, Some(Color32::BLACK));
        let card = tree.add(root, area(20, 20, 29, 29), Some(BLUE));
        tree.node_mut(card).clip_radius = 5;
        tree.add(card, area(20, 20, 29, 29), Some(Color32::WHITE));
        (tree, root)
    };
    let (mut tree, root) = scene();
    let threaded = refresh(threaded(), &mut tree, root);
    assert_eq!(threaded.pixel(20, 20), Some(BLUE));
    assert_eq!(threaded.pixel(29, 29), Some(BLUE));
    assert_eq!(threaded.pixel(24, 20), Some(Color32::WHITE));
    assert_eq!(threaded.pixel(25, 25), Some(Color32::WHITE));

    let (mut tree, root) = scene();
    let software = refresh(software(), &mut tree, root);
    assert_eq!(threaded.flushes, software.flushes);
}

fn rotated_scene() -> (MockTree, MockId) {
    let mut tree = MockTree::new();
    let root = tree.add_root(SCREEN, Some(Color32::BLACK));
    let obj = tree.add(root, area(30, 40, 69, 59), Some(Color32::WHITE));
    tree.node_mut(obj).isolation = Isolation::Transform;
    tree.node_mut(obj).style = CompositeStyle {
        angle: 900,
        pivot: (20, 10),
        ..CompositeStyle::IDENTITY
    };
    (tree, root)
}

#[test]
fn quarter_turn_stands_a_wide_object_upright() {
    let (mut tree, root) = rotated_scene();
    let panel = refresh(software(), &mut tree, root);
    assert_eq!(panel.pixel(50, 35), Some(Color32::WHITE));
    assert_eq!(panel.pixel(50, 65), Some(Color32::WHITE));
    assert_eq!(panel.pixel(35, 50), Some(Color32::BLACK));
    assert_eq!(panel.pixel(65, 50), Some(Color32::BLACK));
}

#[test]
fn threaded_display_matches_software_display() {
    let scene = || {
        let (mut tree, root) = rotated_scene();
        let card = tree.add(root, area(5, 5, 44, 34), Some(BLUE));
        tree.node_mut(card).clip_radius = 8;
        let inner = tree.add(card, area(0, 0, 30, 30), Some(RED));
        tree.node_mut(inner).isolation = Isolation::Simple;
        tree.node_mut(inner).style.opa = 160;
        (tree, root)
    };
    let (mut tree, root) = scene();
    let expected = refresh(software(), &mut tree, root);
    let (mut tree, root) = scene();
    let actual = refresh(threaded(), &mut tree, root);
    assert_eq!(actual.flushes, expected.flushes);
}
