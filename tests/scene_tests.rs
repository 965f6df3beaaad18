//! Scene Integration Tests
//!
//! Tests for:
//! - Scene: create/remove nodes, attach/detach hierarchy
//! - Hierarchy error reporting (stale handles, cycles)
//! - Transform bookkeeping across node removal
//! - Frame pipeline: frame ids and rendering-begin listeners

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use strata::{Scene, StrataError, TransformSettings};

fn new_scene() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    Scene::new()
}

// ============================================================================
// Node Management
// ============================================================================

#[test]
fn scene_create_node() {
    let mut scene = new_scene();
    let node = scene.create_node();
    assert!(scene.get_node(node).is_some());
    assert_eq!(scene.root_nodes(), &[node]);
}

#[test]
fn scene_create_node_with_name() {
    let mut scene = new_scene();
    let node = scene.create_node_with_name("camera_rig");
    assert_eq!(scene.get_name(node), Some("camera_rig"));
}

#[test]
fn scene_set_name() {
    let mut scene = new_scene();
    let node = scene.create_node();
    scene.set_name(node, "renamed");
    assert_eq!(scene.get_name(node), Some("renamed"));
}

#[test]
fn scene_create_child_links_both_sides() {
    let mut scene = new_scene();
    let parent = scene.create_node();
    let child = scene.create_child(parent, "child").unwrap();

    assert_eq!(scene.get_node(child).unwrap().parent(), Some(parent));
    assert_eq!(scene.get_node(parent).unwrap().children(), &[child]);
    assert_eq!(scene.root_nodes(), &[parent]);
}

#[test]
fn scene_ids_are_unique() {
    let a = new_scene();
    let b = new_scene();
    assert_ne!(a.id, b.id);
}

// ============================================================================
// Hierarchy Edits
// ============================================================================

#[test]
fn scene_attach_removes_from_old_parent() {
    let mut scene = new_scene();
    let p1 = scene.create_node();
    let p2 = scene.create_node();
    let child = scene.create_child(p1, "child").unwrap();

    scene.attach(child, p2).unwrap();

    assert!(scene.get_node(p1).unwrap().children().is_empty());
    assert_eq!(scene.get_node(p2).unwrap().children(), &[child]);
    assert_eq!(scene.get_node(child).unwrap().parent(), Some(p2));
}

#[test]
fn scene_attach_to_self_is_a_cycle() {
    let mut scene = new_scene();
    let node = scene.create_node();
    assert_eq!(
        scene.attach(node, node),
        Err(StrataError::HierarchyCycle {
            child: node,
            parent: node
        })
    );
}

#[test]
fn scene_attach_under_descendant_is_a_cycle() {
    let mut scene = new_scene();
    let top = scene.create_node();
    let mid = scene.create_child(top, "mid").unwrap();
    let leaf = scene.create_child(mid, "leaf").unwrap();

    let err = scene.attach(top, leaf).unwrap_err();
    assert_eq!(
        err,
        StrataError::HierarchyCycle {
            child: top,
            parent: leaf
        }
    );
    assert_eq!(scene.get_node(top).unwrap().parent(), None);
}

#[test]
fn scene_stale_handles_are_reported() {
    let mut scene = new_scene();
    let live = scene.create_node();
    let gone = scene.create_node();
    scene.remove_node(gone);

    assert_eq!(scene.attach(gone, live), Err(StrataError::NodeNotFound(gone)));
    assert_eq!(scene.attach(live, gone), Err(StrataError::NodeNotFound(gone)));
    assert_eq!(scene.detach(gone), Err(StrataError::NodeNotFound(gone)));
    assert_eq!(
        scene.create_child(gone, "x").unwrap_err(),
        StrataError::NodeNotFound(gone)
    );
    assert_eq!(
        scene.add_transform(gone, Mat4::IDENTITY),
        Err(StrataError::NodeNotFound(gone))
    );
}

#[test]
fn scene_detach_makes_node_a_root() {
    let mut scene = new_scene();
    let parent = scene.create_node();
    let child = scene.create_child(parent, "child").unwrap();

    scene.detach(child).unwrap();

    assert_eq!(scene.get_node(child).unwrap().parent(), None);
    assert!(scene.root_nodes().contains(&child));
    // Detaching a root is a no-op.
    scene.detach(child).unwrap();
    assert_eq!(scene.root_nodes().len(), 2);
}

#[test]
fn scene_remove_node_removes_subtree() {
    let mut scene = new_scene();
    let root = scene.create_node();
    let child = scene.create_child(root, "child").unwrap();
    let grandchild = scene.create_child(child, "grandchild").unwrap();

    scene.remove_node(child);

    assert!(scene.get_node(child).is_none());
    assert!(scene.get_node(grandchild).is_none());
    assert!(scene.get_node(root).unwrap().children().is_empty());
}

#[test]
fn scene_remove_node_removes_from_root() {
    let mut scene = new_scene();
    let node = scene.create_node();
    scene.remove_node(node);
    assert!(scene.root_nodes().is_empty());
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn scene_duplicate_transform_is_an_error() {
    let mut scene = new_scene();
    let node = scene.create_node();
    scene.add_transform(node, Mat4::IDENTITY).unwrap();

    assert_eq!(
        scene.add_transform(node, Mat4::IDENTITY),
        Err(StrataError::DuplicateComponent { node })
    );
}

#[test]
fn scene_remove_node_drops_transforms_and_cache() {
    let mut scene = new_scene();
    let root = scene.create_node();
    let child = scene.create_child(root, "child").unwrap();
    scene.add_transform(root, Mat4::from_translation(Vec3::X)).unwrap();
    scene.add_transform(child, Mat4::from_translation(Vec3::Y)).unwrap();
    scene.update();
    assert_eq!(scene.transforms().cache_count(), 1);

    scene.remove_node(root);

    assert!(scene.transforms().is_empty());
    scene.update();
    assert_eq!(scene.transforms().cache_count(), 0);
}

#[test]
fn scene_removing_a_branch_keeps_the_rest_consistent() {
    let mut scene = new_scene();
    let root = scene.create_node();
    let keep = scene.create_child(root, "keep").unwrap();
    let branch = scene.create_child(root, "branch").unwrap();
    let branch_child = scene.create_child(branch, "branch_child").unwrap();
    for node in [keep, branch, branch_child] {
        scene.add_transform(node, Mat4::from_translation(Vec3::Z)).unwrap();
    }
    scene.update();

    scene.remove_node(branch);
    scene.update();

    let cache = scene.transforms().cache(root).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(keep));
    assert!(cache.is_well_formed());
}

#[test]
fn scene_readding_a_transform_before_the_next_pass_drops_it() {
    let mut scene = new_scene();
    let root = scene.create_node();
    let node = scene.create_child(root, "node").unwrap();
    scene.add_transform(node, Mat4::from_translation(Vec3::X)).unwrap();
    scene.update();

    scene.remove_transform(node).unwrap();
    scene.add_transform(node, Mat4::from_translation(Vec3::Y)).unwrap();
    assert!(scene.transforms().cache(root).unwrap().queue().is_conflicting(node));
    scene.update();

    assert_eq!(scene.transforms().transform(node).unwrap().cache_root(), None);
    assert_eq!(scene.world(node).unwrap(), Mat4::IDENTITY);

    // A structural event registers it again.
    scene.detach(node).unwrap();
    scene.update();
    assert!(scene.transforms().cache(node).unwrap().contains(node));
    assert_eq!(scene.world(node).unwrap(), Mat4::from_translation(Vec3::Y));
}

#[test]
fn scene_keeps_empty_caches_when_configured() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = Scene::with_settings(TransformSettings {
        release_empty_caches: false,
        ..Default::default()
    });
    let node = scene.create_node();
    scene.add_transform(node, Mat4::IDENTITY).unwrap();
    scene.update();

    scene.remove_transform(node).unwrap();
    scene.update();

    assert_eq!(scene.transforms().cache_count(), 1);
    assert!(scene.transforms().cache(node).unwrap().is_empty());
}

// ============================================================================
// Frame Pipeline
// ============================================================================

#[test]
fn scene_next_frame_runs_the_pass_before_listeners() {
    let mut scene = new_scene();
    let node = scene.create_node();
    scene.add_transform(node, Mat4::from_translation(Vec3::X)).unwrap();

    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&frames);
    scene.on_rendering_begin(0, move |frame| {
        sink.borrow_mut().push((frame.frame_id, frame.stats.writes));
    });

    let stats = scene.next_frame();
    scene.next_frame();

    assert_eq!(stats.writes, 1);
    assert_eq!(scene.frame_id(), 2);
    assert_eq!(*frames.borrow(), vec![(1, 1), (2, 0)]);
    assert_eq!(scene.world(node).unwrap(), Mat4::from_translation(Vec3::X));
}

#[test]
fn scene_rendering_begin_listeners_follow_priority() {
    let mut scene = new_scene();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (name, priority) in [("late", -10), ("first", 1000), ("normal", 0)] {
        let order = Rc::clone(&order);
        scene.on_rendering_begin(priority, move |_| order.borrow_mut().push(name));
    }
    let extra = scene.on_rendering_begin(5, |_| {});
    assert!(scene.disconnect_rendering_begin(extra));

    scene.next_frame();
    assert_eq!(*order.borrow(), vec!["first", "normal", "late"]);
}

#[test]
fn scene_update_forced_rebuilds_every_cache() {
    let mut scene = new_scene();
    let a = scene.create_node();
    let b = scene.create_node();
    scene.add_transform(a, Mat4::IDENTITY).unwrap();
    scene.add_transform(b, Mat4::IDENTITY).unwrap();
    scene.update();

    let stats = scene.update_forced();
    assert_eq!(stats.rebuilds, 2);
    assert_eq!(stats.materialized, 2);
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.writes, 0);
}
