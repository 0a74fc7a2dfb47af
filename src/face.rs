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

//! Faces, the arena that owns them, and the nodes of a partition tree.
//!
//! Faces are linked into singly-linked lists by `FaceId`
//! handle: a tree node heads the list of faces on its plane, and splitting
//! phases splice replacement chains in by rewriting `next` links. The arena
//! keeps splicing cheap and lets later phases hold weak references (the
//! `original` back-pointer, the edge table's claimant records) without any
//! ownership cycles.

use std::ops::{Index, IndexMut};

use crate::math::PlaneSide;
use crate::winding::Winding;

/// The classification of the space on one side of a face.
///
/// Raw CSG contents tags are carried through the pipeline untouched so
/// game-specific values survive; this enum names the values every target
/// game shares. Tag 0 marks a face whose producer never assigned contents.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum Contents {
    Empty = -1,
    Solid = -2,
    Water = -3,
    Slime = -4,
    Lava = -5,
    Sky = -6,
}

/// Handle to a face in a `FaceStore`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaceId(usize);

#[derive(Clone, Debug)]
pub struct Face {
    pub winding: Winding,
    pub plane_id: usize,
    pub side: PlaneSide,
    pub texinfo_id: usize,

    /// Contents tags in front of and behind the face.
    pub contents: [i32; 2],

    /// Lightmap shift pair; log2 texels per luxel.
    pub lmshift: [u8; 2],

    /// Next face in whatever list this face is threaded on.
    pub next: Option<FaceId>,

    /// The pre-split face this one was carved from, if any.
    pub original: Option<FaceId>,

    /// Signed surfedge indices, filled just before emission and released
    /// by it.
    pub edges: Vec<i32>,

    /// Index in the output face table once emitted.
    pub output_number: Option<usize>,
}

impl Face {
    pub fn new(
        winding: Winding,
        plane_id: usize,
        side: PlaneSide,
        texinfo_id: usize,
        contents: [i32; 2],
        lmshift: [u8; 2],
    ) -> Face {
        Face {
            winding,
            plane_id,
            side,
            texinfo_id,
            contents,
            lmshift,
            next: None,
            original: None,
            edges: Vec::new(),
            output_number: None,
        }
    }

    /// A new face carrying this face's surface attributes but no geometry
    /// and no list links.
    pub fn derived(&self) -> Face {
        Face {
            winding: Winding::empty(),
            plane_id: self.plane_id,
            side: self.side,
            texinfo_id: self.texinfo_id,
            contents: self.contents,
            lmshift: self.lmshift,
            next: None,
            original: None,
            edges: Vec::new(),
            output_number: None,
        }
    }
}

/// Arena of every face belonging to one entity build.
#[derive(Debug, Default)]
pub struct FaceStore {
    slots: Vec<Option<Face>>,
}

impl FaceStore {
    pub fn new() -> FaceStore {
        FaceStore { slots: Vec::new() }
    }

    pub fn alloc(&mut self, face: Face) -> FaceId {
        let id = FaceId(self.slots.len());
        self.slots.push(Some(face));
        id
    }

    pub fn free(&mut self, id: FaceId) -> Face {
        self.slots[id.0].take().expect("face already freed")
    }

    pub fn contains(&self, id: FaceId) -> bool {
        self.slots[id.0].is_some()
    }

    /// Pushes `id` onto the front of the list headed by `head`.
    pub fn push_front(&mut self, head: &mut Option<FaceId>, id: FaceId) {
        self[id].next = *head;
        *head = Some(id);
    }

    /// Collects the handles of a face list, head first.
    pub fn list(&self, head: Option<FaceId>) -> Vec<FaceId> {
        let mut ids = Vec::new();
        let mut next = head;
        while let Some(id) = next {
            ids.push(id);
            next = self[id].next;
        }
        ids
    }
}

impl Index<FaceId> for FaceStore {
    type Output = Face;

    fn index(&self, id: FaceId) -> &Face {
        self.slots[id.0].as_ref().expect("freed face")
    }
}

impl IndexMut<FaceId> for FaceStore {
    fn index_mut(&mut self, id: FaceId) -> &mut Face {
        self.slots[id.0].as_mut().expect("freed face")
    }
}

/// A node of the partition tree handed over by the tree builder.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Inner(InnerNode),
    Leaf(LeafNode),
}

/// A decision node: a splitting plane, the faces lying on it, and a child
/// for each side.
#[derive(Debug)]
pub struct InnerNode {
    pub plane_id: usize,
    pub faces: Option<FaceId>,
    pub children: Box<[Node; 2]>,

    /// First face emitted for this node, filled during emission.
    pub first_face: usize,
    /// Number of faces emitted for this node.
    pub face_count: usize,
}

#[derive(Debug)]
pub struct LeafNode {
    pub contents: Contents,
}

impl Node {
    pub fn inner(plane_id: usize, faces: Option<FaceId>, front: Node, back: Node) -> Node {
        Node {
            kind: NodeKind::Inner(InnerNode {
                plane_id,
                faces,
                children: Box::new([front, back]),
                first_face: 0,
                face_count: 0,
            }),
        }
    }

    pub fn leaf(contents: Contents) -> Node {
        Node {
            kind: NodeKind::Leaf(LeafNode { contents }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num::FromPrimitive;

    #[test]
    fn test_contents_from_tag() {
        assert_eq!(Contents::from_i32(-2), Some(Contents::Solid));
        assert_eq!(Contents::from_i32(-6), Some(Contents::Sky));
        assert_eq!(Contents::from_i32(0), None);
    }

    #[test]
    fn test_store_list_order() {
        let mut store = FaceStore::new();
        let mut head = None;
        let a = store.alloc(face_stub());
        let b = store.alloc(face_stub());
        store.push_front(&mut head, a);
        store.push_front(&mut head, b);
        assert_eq!(store.list(head), vec![b, a]);
    }

    #[test]
    fn test_store_free() {
        let mut store = FaceStore::new();
        let a = store.alloc(face_stub());
        assert!(store.contains(a));
        store.free(a);
        assert!(!store.contains(a));
    }

    fn face_stub() -> Face {
        Face::new(
            Winding::empty(),
            0,
            crate::math::PlaneSide::Front,
            0,
            [Contents::Solid as i32, Contents::Empty as i32],
            [4, 4],
        )
    }
}
