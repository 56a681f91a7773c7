// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion culling: finding where drawing of an area can start.

use crate::area::Area;
use crate::tree::{CoverResult, Isolation, ObjectTree};

/// Finds the topmost object below `root` that covers `area` with opaque
/// pixels.
///
/// Children are searched front-most first and the first match wins.
/// Hidden and isolated objects end their branch, and so does an object
/// answering [`CoverResult::Masked`].
pub(crate) fn top_object<T: ObjectTree + ?Sized>(
    tree: &T,
    area: &Area,
    root: T::Obj,
) -> Option<T::Obj> {
    if !area.is_in(&tree.coords(root)) {
        return None;
    }
    if tree.is_hidden(root) || tree.isolation(root) != Isolation::None {
        return None;
    }
    let cover = tree.cover_check(root, area);
    if cover == CoverResult::Masked {
        return None;
    }

    let found = (0..tree.child_count(root))
        .rev()
        .find_map(|i| top_object(tree, area, tree.child(root, i)));
    match found {
        Some(child) => Some(child),
        None if cover == CoverResult::Cover => Some(root),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawCtx;
    use crate::invalidate::InvalidationTracker;
    use crate::tree::DrawPhase;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    struct Node {
        coords: Area,
        parent: Option<usize>,
        children: Vec<usize>,
        cover: CoverResult,
        hidden: bool,
        isolation: Isolation,
    }

    struct Tree(Vec<Node>);

    impl Tree {
        fn add(&mut self, parent: Option<usize>, coords: Area, cover: CoverResult) -> usize {
            let id = self.0.len();
            self.0.push(Node {
                coords,
                parent,
                children: Vec::new(),
                cover,
                hidden: false,
                isolation: Isolation::None,
            });
            if let Some(p) = parent {
                self.0[p].children.push(id);
            }
            id
        }
    }

    impl ObjectTree for Tree {
        type Obj = usize;

        fn update_layout(&mut self, _: usize, _: &mut InvalidationTracker) {}

        fn coords(&self, obj: usize) -> Area {
            self.0[obj].coords
        }

        fn parent(&self, obj: usize) -> Option<usize> {
            self.0[obj].parent
        }

        fn child_count(&self, obj: usize) -> usize {
            self.0[obj].children.len()
        }

        fn child(&self, obj: usize, index: usize) -> usize {
            self.0[obj].children[index]
        }

        fn is_hidden(&self, obj: usize) -> bool {
            self.0[obj].hidden
        }

        fn isolation(&self, obj: usize) -> Isolation {
            self.0[obj].isolation
        }

        fn cover_check(&self, obj: usize, _: &Area) -> CoverResult {
            self.0[obj].cover
        }

        fn draw(&mut self, _: usize, _: DrawPhase, _: &mut DrawCtx<'_>) {}
    }

    fn screen_with_two_panels() -> Tree {
        let mut t = Tree(Vec::new());
        let screen = t.add(None, area(0, 0, 99, 99), CoverResult::Cover);
        t.add(Some(screen), area(0, 0, 59, 59), CoverResult::Cover);
        t.add(Some(screen), area(40, 40, 99, 99), CoverResult::Cover);
        t
    }

    #[test]
    fn front_most_covering_child_wins() {
        let t = screen_with_two_panels();
        assert_eq!(top_object(&t, &area(45, 45, 55, 55), 0), Some(2));
        assert_eq!(top_object(&t, &area(5, 5, 10, 10), 0), Some(1));
        assert_eq!(top_object(&t, &area(5, 5, 80, 80), 0), Some(0));
    }

    #[test]
    fn area_outside_the_root_finds_nothing() {
        let t = screen_with_two_panels();
        assert_eq!(top_object(&t, &area(90, 90, 120, 120), 0), None);
    }

    #[test]
    fn hidden_and_isolated_objects_end_their_branch() {
        let mut t = screen_with_two_panels();
        t.0[2].hidden = true;
        assert_eq!(top_object(&t, &area(45, 45, 55, 55), 0), Some(1));
        t.0[1].isolation = Isolation::Simple;
        assert_eq!(top_object(&t, &area(45, 45, 55, 55), 0), Some(0));
    }

    #[test]
    fn masked_answer_stops_the_search() {
        let mut t = screen_with_two_panels();
        t.0[2].cover = CoverResult::Masked;
        assert_eq!(top_object(&t, &area(45, 45, 55, 55), 0), Some(1));
        t.0[0].cover = CoverResult::Masked;
        assert_eq!(top_object(&t, &area(45, 45, 55, 55), 0), None);
    }

    #[test]
    fn non_covering_parent_still_yields_covering_child() {
        let mut t = screen_with_two_panels();
        t.0[0].cover = CoverResult::NotCover;
        assert_eq!(top_object(&t, &area(5, 5, 10, 10), 0), Some(1));
        assert_eq!(top_object(&t, &area(5, 5, 80, 80), 0), None);
    }
}
