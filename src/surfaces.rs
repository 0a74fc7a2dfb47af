// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Tears a finished tree down and regroups its faces by plane, so the
//! tree builder can run again over merged surfaces.

use std::collections::BTreeMap;

use crate::face::{FaceId, FaceStore, Node, NodeKind};

/// Consumes `root`, freeing every node and every face whose winding was
/// clipped away, and returns the head of a face list per plane index.
///
/// Faces are visited node first, then the front subtree, then the back
/// subtree, and prepended to their plane's list as they are seen.
pub fn gather_node_faces(faces: &mut FaceStore, root: Node) -> BTreeMap<usize, FaceId> {
    let mut buckets: BTreeMap<usize, FaceId> = BTreeMap::new();
    let mut worklist = vec![root];

    while let Some(node) = worklist.pop() {
        if let NodeKind::Inner(inner) = node.kind {
            let mut next = inner.faces;
            while let Some(id) = next {
                next = faces[id].next;
                if faces[id].winding.is_empty() {
                    // clipped away by a sibling fragment
                    faces.free(id);
                } else {
                    let plane_id = faces[id].plane_id;
                    faces[id].next = buckets.insert(plane_id, id);
                }
            }

            let [front, back] = *inner.children;
            worklist.push(back);
            worklist.push(front);
        }
    }

    buckets
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::face::{Contents, Face};
    use crate::math::PlaneSide;
    use crate::winding::Winding;
    use cgmath::Vector3;

    fn triangle_face(faces: &mut FaceStore, plane_id: usize) -> FaceId {
        let winding = Winding::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(8.0, 0.0, 0.0),
            Vector3::new(0.0, 8.0, 0.0),
        ]);
        faces.alloc(Face::new(
            winding,
            plane_id,
            PlaneSide::Front,
            0,
            [Contents::Solid as i32, Contents::Empty as i32],
            [4, 4],
        ))
    }

    #[test]
    fn test_gather_buckets_by_plane() {
        let mut faces = FaceStore::new();

        let on_root = triangle_face(&mut faces, 0);
        let on_child = triangle_face(&mut faces, 1);
        let clipped = faces.alloc(Face::new(
            Winding::empty(),
            0,
            PlaneSide::Front,
            0,
            [Contents::Solid as i32, Contents::Empty as i32],
            [4, 4],
        ));
        faces[on_root].next = Some(clipped);

        let child = Node::inner(
            1,
            Some(on_child),
            Node::leaf(Contents::Empty),
            Node::leaf(Contents::Solid),
        );
        let root = Node::inner(0, Some(on_root), child, Node::leaf(Contents::Solid));

        let buckets = gather_node_faces(&mut faces, root);

        assert_eq!(buckets.len(), 2);
        assert_eq!(faces.list(Some(buckets[&0])), vec![on_root]);
        assert_eq!(faces.list(Some(buckets[&1])), vec![on_child]);
        assert!(!faces.contains(clipped));
    }

    #[test]
    fn test_gather_prepends_in_visitation_order() {
        let mut faces = FaceStore::new();

        // same plane on the root and on its front child
        let first = triangle_face(&mut faces, 7);
        let second = triangle_face(&mut faces, 7);

        let child = Node::inner(
            7,
            Some(second),
            Node::leaf(Contents::Empty),
            Node::leaf(Contents::Solid),
        );
        let root = Node::inner(7, Some(first), child, Node::leaf(Contents::Solid));

        let buckets = gather_node_faces(&mut faces, root);

        // the child's face was seen last, so it heads the list
        assert_eq!(faces.list(Some(buckets[&7])), vec![second, first]);
    }
}
