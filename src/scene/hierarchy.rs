//! Parent links and world transforms
//!
//! A node's parent is a weak handle. World transforms are computed by walking
//! from the node up to the root and prepending each local transform, so the
//! node's own transform is applied first and the root's last. A parent that
//! has been recycled ends the walk as if the node were a root.

use glam::DVec2;

use crate::math::{Affine, Decomposed};

use super::{GameObject, NodeId, Scene, SceneError};

/// Iterator over the live ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    scene: &'a Scene,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (NodeId, &'a GameObject);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let Some(node) = self.scene.node(id) else {
            log::warn!("Stale parent {id:?} ends the ancestor walk");
            return None;
        };
        self.next = node.parent;
        Some((id, node))
    }
}

impl Scene {
    /// Live parent of `node`.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?
            .parent
            .filter(|&parent| self.nodes.is_active(parent.0))
    }

    /// Set or clear the parent of `child`.
    ///
    /// # Errors
    ///
    /// Fails on stale handles, and when `child` would become its own
    /// ancestor.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.nodes.is_active(child.0) {
            return Err(SceneError::StaleNode(child));
        }

        if let Some(parent) = parent {
            if !self.nodes.is_active(parent.0) {
                return Err(SceneError::StaleNode(parent));
            }
            if parent == child || self.ancestors(parent).any(|(id, _)| id == child) {
                return Err(SceneError::Cycle { child, parent });
            }
        }

        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Ancestors of `node`, parent first, root last.
    #[must_use]
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            scene: self,
            next: self.node(node).and_then(|go| go.parent),
        }
    }

    /// Write the world matrix of `node` into `out`.
    ///
    /// Returns `false`, leaving `out` at identity, for a stale node.
    pub fn matrix_into(&self, node: NodeId, out: &mut Affine) -> bool {
        out.identity();

        let Some(go) = self.node(node) else {
            return false;
        };

        go.transform.prepend_to(out);
        for (_, ancestor) in self.ancestors(node) {
            ancestor.transform.prepend_to(out);
        }
        true
    }

    /// World matrix of `node`.
    #[must_use]
    pub fn matrix(&self, node: NodeId) -> Option<Affine> {
        let mut m = Affine::IDENTITY;
        self.matrix_into(node, &mut m).then_some(m)
    }

    /// Decomposed world transform of `node`, using `scratch` for the matrix.
    pub fn transform_into(&self, node: NodeId, out: &mut Decomposed, scratch: &mut Affine) -> bool {
        if !self.matrix_into(node, scratch) {
            return false;
        }
        scratch.decompose(out);
        true
    }

    /// Decomposed world transform of `node`.
    #[must_use]
    pub fn transform(&self, node: NodeId) -> Option<Decomposed> {
        self.matrix(node).map(|m| m.decomposed())
    }

    /// Map a world point into `node`'s local space, for hit testing.
    ///
    /// `None` for a stale node or a degenerate (zero scale) transform.
    #[must_use]
    pub fn world_to_local(&self, node: NodeId, point: DVec2) -> Option<DVec2> {
        let inverse = self.matrix(node)?.inverse()?;
        Some(inverse.transform_point(point))
    }

    /// Map a point in `node`'s local space to the world.
    #[must_use]
    pub fn local_to_world(&self, node: NodeId, point: DVec2) -> Option<DVec2> {
        Some(self.matrix(node)?.transform_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    use crate::render::{DrawContext, MatrixContext};
    use crate::scene::{Basic, LocalTransform};

    const EPSILON: f64 = 1e-9;

    fn scene() -> Scene {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = Scene::new();
        scene.register_node_kind("Basic", 4, || Basic);
        scene
    }

    /// root -> mid -> leaf, each with a distinct transform
    fn chain(scene: &mut Scene) -> [NodeId; 3] {
        let root = scene.spawn("Basic").unwrap();
        let mid = scene.spawn("Basic").unwrap();
        let leaf = scene.spawn("Basic").unwrap();
        scene.set_parent(mid, Some(root)).unwrap();
        scene.set_parent(leaf, Some(mid)).unwrap();

        scene.node_mut(root).unwrap().transform = LocalTransform {
            x: 100.0,
            y: 50.0,
            rotation: FRAC_PI_4,
            ..LocalTransform::IDENTITY
        };
        scene.node_mut(mid).unwrap().transform = LocalTransform {
            x: 10.0,
            scale_x: 2.0,
            scale_y: 2.0,
            center_x: 3.0,
            center_y: 1.0,
            ..LocalTransform::IDENTITY
        };
        scene.node_mut(leaf).unwrap().transform = LocalTransform {
            y: 5.0,
            rotation: -FRAC_PI_2,
            scale_x: 0.5,
            ..LocalTransform::IDENTITY
        };

        [root, mid, leaf]
    }

    #[test]
    fn test_world_matrix_matches_top_down_append() {
        let mut scene = scene();
        let nodes = chain(&mut scene);

        let mut expected = Affine::IDENTITY;
        for id in nodes {
            scene.node(id).unwrap().transform.append_to(&mut expected);
        }

        let world = scene.matrix(nodes[2]).unwrap();
        assert!(world.abs_diff_eq(&expected, EPSILON), "{world:?} != {expected:?}");
    }

    #[test]
    fn test_world_matrix_matches_draw_traversal() {
        let mut scene = scene();
        let nodes = chain(&mut scene);

        let mut ctx = MatrixContext::new();
        for id in nodes {
            scene.start(id);
            assert!(scene.transform_and_draw(id, &mut ctx));
        }

        let world = scene.matrix(nodes[2]).unwrap();
        assert!(world.abs_diff_eq(ctx.matrix(), EPSILON));

        // The cached local matrix is the last one composed while drawing
        let leaf = scene.node(nodes[2]).unwrap();
        assert!(leaf.matrix().abs_diff_eq(&leaf.local_matrix(), EPSILON));
    }

    #[test]
    fn test_world_transform_decomposes() {
        let mut scene = scene();
        let parent = scene.spawn("Basic").unwrap();
        let child = scene.spawn("Basic").unwrap();
        scene.set_parent(child, Some(parent)).unwrap();

        scene.node_mut(parent).unwrap().transform = LocalTransform {
            x: 10.0,
            rotation: FRAC_PI_2,
            scale_x: 2.0,
            scale_y: 2.0,
            ..LocalTransform::IDENTITY
        };
        scene.node_mut(child).unwrap().transform.x = 1.0;

        let mut out = Decomposed::default();
        let mut scratch = Affine::IDENTITY;
        assert!(scene.transform_into(child, &mut out, &mut scratch));

        assert!((out.x - 10.0).abs() < EPSILON);
        assert!((out.y - 2.0).abs() < EPSILON);
        assert!((out.rotation - FRAC_PI_2).abs() < EPSILON);
        assert!((out.scale_x - 2.0).abs() < EPSILON);
        assert!((out.scale_y - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_stale_parent_ends_walk() {
        let mut scene = scene();
        let [_, mid, leaf] = chain(&mut scene);

        scene.recycle(mid);

        assert!(scene.parent(leaf).is_none());
        assert_eq!(scene.ancestors(leaf).count(), 0);

        let world = scene.matrix(leaf).unwrap();
        let local = scene.node(leaf).unwrap().local_matrix();
        assert!(world.abs_diff_eq(&local, EPSILON));
    }

    #[test]
    fn test_set_parent_rejects_cycles_and_stale() {
        let mut scene = scene();
        let [root, mid, leaf] = chain(&mut scene);

        assert_eq!(
            scene.set_parent(root, Some(leaf)),
            Err(SceneError::Cycle {
                child: root,
                parent: leaf
            })
        );
        assert!(matches!(
            scene.set_parent(mid, Some(mid)),
            Err(SceneError::Cycle { .. })
        ));

        let gone = scene.spawn("Basic").unwrap();
        scene.recycle(gone);
        assert_eq!(
            scene.set_parent(leaf, Some(gone)),
            Err(SceneError::StaleNode(gone))
        );

        // Unchanged by the failed calls
        let ancestors: Vec<NodeId> = scene.ancestors(leaf).map(|(id, _)| id).collect();
        assert_eq!(ancestors, vec![mid, root]);

        scene.set_parent(leaf, None).unwrap();
        assert!(scene.parent(leaf).is_none());
    }

    #[test]
    fn test_world_local_round_trip() {
        let mut scene = scene();
        let [_, _, leaf] = chain(&mut scene);

        let local = DVec2::new(3.0, -2.0);
        let world = scene.local_to_world(leaf, local).unwrap();
        let back = scene.world_to_local(leaf, world).unwrap();
        assert!((back - local).length() < EPSILON);

        scene.node_mut(leaf).unwrap().transform.scale_x = 0.0;
        assert!(scene.world_to_local(leaf, world).is_none());
    }

    #[test]
    fn test_nested_draw_with_save_restore() {
        let mut scene = scene();
        let [root, mid, leaf] = chain(&mut scene);
        let sibling = scene.spawn("Basic").unwrap();
        scene.set_parent(sibling, Some(root)).unwrap();
        scene.node_mut(sibling).unwrap().transform.y = 7.0;
        for id in [root, mid, leaf, sibling] {
            scene.start(id);
        }

        let mut ctx = MatrixContext::new();
        scene.transform_and_draw(root, &mut ctx);
        ctx.save();
        scene.transform_and_draw(mid, &mut ctx);
        scene.transform_and_draw(leaf, &mut ctx);
        ctx.restore();
        ctx.save();
        scene.transform_and_draw(sibling, &mut ctx);

        let world = scene.matrix(sibling).unwrap();
        assert!(world.abs_diff_eq(ctx.matrix(), EPSILON));
        ctx.restore();
    }
}
