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

//! T-junction repair.
//!
//! A T-junction is a vertex of one face resting on the interior of another
//! face's edge. Rasterizers shade the two faces from vertices that don't
//! agree, and a sparkling crack opens along the seam. The fix is to make
//! every such point a vertex of both faces.
//!
//! Every edge in the entity is interned onto a canonical infinite line
//! keyed by origin and direction. Each line carries a sorted list of the
//! parameters at which *some* face has a vertex; a second pass then grows
//! each face's winding until it includes every parameter interior to one
//! of its edges. Faces that grow past `MAX_FACE_POINTS`
//! are carved into a chain at their corners.

use std::mem;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::error::{CompileError, CompileErrorKind};
use crate::face::{FaceId, FaceStore, Node, NodeKind};
use crate::math::{Bounds, ANGLE_EPSILON, EQUAL_EPSILON, T_EPSILON};
use crate::winding::Winding;

/// Largest winding a face may keep after repair.
pub const MAX_FACE_POINTS: usize = 256;

/// Scratch capacity while one face is being repaired.
pub const MAX_SUPERFACE_POINTS: usize = 8192;

/// Weld hash bucket count over the entity's XY extent.
const NUM_HASH: usize = 1024;

/// Counters reported by a repair pass.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TjuncStats {
    pub weld_edges: usize,
    pub weld_verts: usize,

    /// Vertices inserted into windings.
    pub tjuncs: usize,
    /// Faces split because their winding grew too large.
    pub tjunc_faces: usize,
}

/// A parameter along a weld line where some face has a vertex. Nodes of a
/// circular doubly-linked list sorted ascending by `t`; the sentinel head
/// carries `t = +inf`.
struct WeldVert {
    t: f64,
    prev: usize,
    next: usize,
}

/// A canonical infinite line and the head of its parameter list.
struct WeldEdge {
    origin: Vector3<f64>,
    dir: Vector3<f64>,
    head: usize,
}

struct WeldTable {
    hash_min: Vector3<f64>,
    hash_scale: [f64; 2],
    hash_slots: [usize; 2],
    buckets: Vec<Vec<usize>>,

    edges: Vec<WeldEdge>,
    verts: Vec<WeldVert>,

    edge_budget: usize,
    vert_budget: usize,
    verts_used: usize,
}

/// Normalizes an edge direction into canonical orientation: unit length,
/// first non-zero component positive, near-zero components snapped to 0.
fn canonical_vector(delta: Vector3<f64>) -> Vector3<f64> {
    let length = delta.magnitude();
    let mut v = if length > 0.0 {
        delta / length
    } else {
        Vector3::zero()
    };

    for i in 0..3 {
        if v[i] > EQUAL_EPSILON {
            return v;
        } else if v[i] < -EQUAL_EPSILON {
            return -v;
        }
        v[i] = 0.0;
    }

    warn!("canonical_vector: degenerate edge direction");
    v
}

impl WeldTable {
    fn new(bounds: &Bounds, edge_budget: usize, vert_budget: usize) -> WeldTable {
        let size = bounds.size();
        // flat entities still get a usable grid
        let sx = size.x.max(1.0);
        let sy = size.y.max(1.0);

        // close to NUM_HASH cells of equal area over the XY extent
        let cell = (sx * sy / NUM_HASH as f64).sqrt();
        let mut slots = [
            ((sx / cell).floor() as usize).max(1),
            ((sy / cell).floor() as usize).max(1),
        ];
        while slots[0] * slots[1] > NUM_HASH {
            if slots[0] > 1 {
                slots[0] -= 1;
            }
            if slots[1] > 1 {
                slots[1] -= 1;
            }
        }

        WeldTable {
            hash_min: bounds.min,
            hash_scale: [slots[0] as f64 / sx, slots[1] as f64 / sy],
            hash_slots: slots,
            buckets: vec![Vec::new(); NUM_HASH],
            edges: Vec::new(),
            verts: Vec::new(),
            edge_budget,
            vert_budget,
            verts_used: 0,
        }
    }

    fn hash(&self, v: Vector3<f64>) -> usize {
        let ix = ((v.x - self.hash_min.x) * self.hash_scale[0]).floor();
        let iy = ((v.y - self.hash_min.y) * self.hash_scale[1]).floor();
        let h = ix * self.hash_slots[1] as f64 + iy;

        // weld origins may land outside the entity bounds
        if h < 0.0 {
            0
        } else if h >= NUM_HASH as f64 {
            NUM_HASH - 1
        } else {
            h as usize
        }
    }

    /// Looks up or creates the weld line through `p1` and `p2`. Returns
    /// the line's index and the two endpoint parameters in ascending
    /// order.
    fn find_edge(
        &mut self,
        p1: Vector3<f64>,
        p2: Vector3<f64>,
    ) -> Result<(usize, f64, f64), CompileError> {
        let dir = canonical_vector(p2 - p1);

        let mut t1 = p1.dot(dir);
        let mut t2 = p2.dot(dir);
        let origin = p1 - dir * t1;

        if t1 > t2 {
            mem::swap(&mut t1, &mut t2);
        }

        let h = self.hash(origin);
        for &id in &self.buckets[h] {
            let edge = &self.edges[id];
            if (edge.origin.x - origin.x).abs() > EQUAL_EPSILON
                || (edge.origin.y - origin.y).abs() > EQUAL_EPSILON
                || (edge.origin.z - origin.z).abs() > EQUAL_EPSILON
                || (edge.dir.x - dir.x).abs() > EQUAL_EPSILON
                || (edge.dir.y - dir.y).abs() > EQUAL_EPSILON
                || (edge.dir.z - dir.z).abs() > EQUAL_EPSILON
            {
                continue;
            }
            return Ok((id, t1, t2));
        }

        if self.edges.len() == self.edge_budget {
            return Err(CompileErrorKind::WeldEdgeOverflow {
                limit: self.edge_budget,
            }
            .into());
        }

        let head = self.verts.len();
        self.verts.push(WeldVert {
            t: std::f64::INFINITY,
            prev: head,
            next: head,
        });

        let id = self.edges.len();
        self.edges.push(WeldEdge { origin, dir, head });
        self.buckets[h].push(id);

        Ok((id, t1, t2))
    }

    /// Records that some face has a vertex at parameter `t` on weld line
    /// `edge`. Duplicates within `T_EPSILON` are dropped.
    fn add_vert(&mut self, edge: usize, t: f64) -> Result<(), CompileError> {
        let head = self.edges[edge].head;

        let mut v = self.verts[head].next;
        while self.verts[v].t < t - T_EPSILON {
            v = self.verts[v].next;
        }
        if self.verts[v].t < t + T_EPSILON {
            return Ok(());
        }

        if self.verts_used == self.vert_budget {
            return Err(CompileErrorKind::WeldVertOverflow {
                limit: self.vert_budget,
            }
            .into());
        }

        // insert before v, keeping the list sorted
        let prev = self.verts[v].prev;
        let new = self.verts.len();
        self.verts.push(WeldVert { t, prev, next: v });
        self.verts[prev].next = new;
        self.verts[v].prev = new;
        self.verts_used += 1;

        Ok(())
    }

    /// The first recorded parameter past `t1`, or +inf if there is none.
    fn next_t(&self, edge: usize, t1: f64) -> f64 {
        let head = self.edges[edge].head;
        let mut v = self.verts[head].next;
        while self.verts[v].t < t1 + T_EPSILON {
            v = self.verts[v].next;
        }
        self.verts[v].t
    }

    fn point_at(&self, edge: usize, t: f64) -> Vector3<f64> {
        self.edges[edge].origin + self.edges[edge].dir * t
    }
}

fn count_points(faces: &FaceStore, node: &Node) -> usize {
    match &node.kind {
        NodeKind::Leaf(_) => 0,
        NodeKind::Inner(inner) => {
            let mut total = 0;
            let mut next = inner.faces;
            while let Some(id) = next {
                total += faces[id].winding.len();
                next = faces[id].next;
            }
            total
                + count_points(faces, &inner.children[0])
                + count_points(faces, &inner.children[1])
        }
    }
}

fn find_edges(
    faces: &FaceStore,
    table: &mut WeldTable,
    node: &Node,
) -> Result<(), CompileError> {
    if let NodeKind::Inner(inner) = &node.kind {
        let mut next = inner.faces;
        while let Some(id) = next {
            let count = faces[id].winding.len();
            for i in 0..count {
                let p1 = faces[id].winding.points[i];
                let p2 = faces[id].winding.points[(i + 1) % count];
                let (edge, t1, t2) = table.find_edge(p1, p2)?;
                table.add_vert(edge, t1)?;
                table.add_vert(edge, t2)?;
            }
            next = faces[id].next;
        }

        find_edges(faces, table, &inner.children[0])?;
        find_edges(faces, table, &inner.children[1])?;
    }
    Ok(())
}

/// Carves an over-grown winding into a chain of faces no larger than
/// `MAX_FACE_POINTS`, cutting only at corners so the cuts cannot open new
/// T-junctions. Every piece back-references `original`; the two vertices
/// at each cut stay shared as the new seam.
fn split_face_for_tjunc(
    faces: &mut FaceStore,
    stats: &mut TjuncStats,
    original: FaceId,
    mut points: Vec<Vector3<f64>>,
    newlist: &mut Option<FaceId>,
) {
    assert!(
        faces[original].original.is_none(),
        "splitting a face that is itself a split piece"
    );

    loop {
        if points.len() <= MAX_FACE_POINTS {
            let mut piece = faces[original].derived();
            piece.winding = Winding::new(points);
            piece.original = Some(original);
            let id = faces.alloc(piece);
            faces.push_front(newlist, id);
            return;
        }

        stats.tjunc_faces += 1;

        let (first_corner, last_corner) = loop {
            let count = points.len();

            // find the last corner
            let dir = (points[count - 1] - points[0]).normalize();
            let mut last_corner = count - 1;
            while last_corner > 0 {
                let test = (points[last_corner - 1] - points[last_corner]).normalize();
                let v = test.dot(dir);
                if v < 1.0 - ANGLE_EPSILON || v > 1.0 + ANGLE_EPSILON {
                    break;
                }
                last_corner -= 1;
            }

            // find the first corner
            let dir = (points[1] - points[0]).normalize();
            let mut first_corner = 1;
            while first_corner < count - 1 {
                let test = (points[first_corner + 1] - points[first_corner]).normalize();
                let v = test.dot(dir);
                if v < 1.0 - ANGLE_EPSILON || v > 1.0 + ANGLE_EPSILON {
                    break;
                }
                first_corner += 1;
            }

            if first_corner + 2 >= MAX_FACE_POINTS {
                // rotate the winding and look again
                points.rotate_left(1);
                continue;
            }

            break (first_corner, last_corner);
        };

        // cut off as big a piece as possible without passing a corner
        let size = MAX_FACE_POINTS
            .min(first_corner + 2)
            .min(last_corner + 2);
        assert!(size >= 3, "degenerate winding in tjunc split");

        let mut piece = faces[original].derived();
        piece.winding = Winding::new(points[..size].to_vec());
        piece.original = Some(original);
        let id = faces.alloc(piece);
        faces.push_front(newlist, id);

        // the two cut vertices stay behind as the new seam
        points.drain(1..size - 1);
    }
}

/// Grows `face`'s winding in a scratch buffer until every recorded
/// parameter interior to one of its edges has a matching vertex, then
/// either replaces the winding or splits the face.
fn fix_face_edges(
    faces: &mut FaceStore,
    table: &mut WeldTable,
    stats: &mut TjuncStats,
    newlist: &mut Option<FaceId>,
    face: FaceId,
) -> Result<(), CompileError> {
    let mut superface = faces[face].winding.points.clone();

    'scan: loop {
        for i in 0..superface.len() {
            let j = (i + 1) % superface.len();

            let (edge, t1, t2) = table.find_edge(superface[i], superface[j])?;
            let t = table.next_t(edge, t1);
            if t < t2 - T_EPSILON {
                // a vertex of some other face lies inside this edge
                stats.tjuncs += 1;
                if superface.len() >= MAX_SUPERFACE_POINTS {
                    return Err(CompileErrorKind::SuperfaceOverflow {
                        limit: MAX_SUPERFACE_POINTS,
                    }
                    .into());
                }
                superface.insert(j, table.point_at(edge, t));
                continue 'scan;
            }
        }
        break;
    }

    if superface.len() <= MAX_FACE_POINTS {
        faces[face].winding = Winding::new(superface);
        faces.push_front(newlist, face);
        return Ok(());
    }

    split_face_for_tjunc(faces, stats, face, superface, newlist);
    Ok(())
}

fn fix_node_faces(
    faces: &mut FaceStore,
    table: &mut WeldTable,
    stats: &mut TjuncStats,
    node: &mut Node,
) -> Result<(), CompileError> {
    if let NodeKind::Inner(inner) = &mut node.kind {
        let list = faces.list(inner.faces);
        let mut newlist = None;
        for id in list {
            fix_face_edges(faces, table, stats, &mut newlist, id)?;
        }
        inner.faces = newlist;

        fix_node_faces(faces, table, stats, &mut inner.children[0])?;
        fix_node_faces(faces, table, stats, &mut inner.children[1])?;
    }
    Ok(())
}

/// Repairs T-junctions across every face of the tree.
pub fn fix_tjuncs(
    faces: &mut FaceStore,
    bounds: &Bounds,
    root: &mut Node,
) -> Result<TjuncStats, CompileError> {
    // conservative budgets from the winding totals; verts need room to
    // grow a little
    let total = count_points(faces, root);
    let edge_budget = total;
    let vert_budget = total * 2;

    // weld origins won't always land inside the entity, so mirror the
    // bounds around the world origin
    let mut maxs = Vector3::zero();
    for i in 0..3 {
        maxs[i] = bounds.max[i].abs().max(bounds.min[i].abs());
    }
    let hash_bounds = Bounds {
        min: -maxs,
        max: maxs,
    };

    let mut table = WeldTable::new(&hash_bounds, edge_budget, vert_budget);

    find_edges(faces, &mut table, root)?;
    debug!(
        "{} weld edges, {} weld verts",
        table.edges.len(),
        table.verts_used
    );

    let mut stats = TjuncStats {
        weld_edges: table.edges.len(),
        weld_verts: table.verts_used,
        tjuncs: 0,
        tjunc_faces: 0,
    };
    fix_node_faces(faces, &mut table, &mut stats, root)?;

    debug!("{} edges added by tjunctions", stats.tjuncs);
    debug!("{} faces added by tjunctions", stats.tjunc_faces);

    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::face::{Contents, Face, InnerNode};
    use crate::math::{PlaneSide, POINT_EPSILON};

    fn solid_face(faces: &mut FaceStore, points: Vec<Vector3<f64>>) -> FaceId {
        faces.alloc(Face::new(
            Winding::new(points),
            0,
            PlaneSide::Front,
            0,
            [Contents::Solid as i32, Contents::Empty as i32],
            [4, 4],
        ))
    }

    fn entity_bounds(faces: &FaceStore, ids: &[FaceId]) -> Bounds {
        let mut bounds = Bounds::empty();
        for id in ids {
            let winding_bounds = faces[*id].winding.bounds();
            bounds.add_point(winding_bounds.min);
            bounds.add_point(winding_bounds.max);
        }
        bounds
    }

    fn single_node(faces: &mut FaceStore, ids: &[FaceId]) -> Node {
        let mut head = None;
        for id in ids.iter().rev() {
            faces.push_front(&mut head, *id);
        }
        Node::inner(
            0,
            head,
            Node::leaf(Contents::Empty),
            Node::leaf(Contents::Solid),
        )
    }

    fn node_faces(node: &Node) -> &InnerNode {
        match &node.kind {
            NodeKind::Inner(inner) => inner,
            NodeKind::Leaf(_) => panic!("expected an inner node"),
        }
    }

    #[test]
    fn test_canonical_vector_orients_leading_component() {
        let v = canonical_vector(Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(v, Vector3::new(1.0, 0.0, 0.0));

        let v = canonical_vector(Vector3::new(0.0, 0.0, -4.0));
        assert_eq!(v, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_tjunc_inserts_crossing_vertex() {
        let mut faces = FaceStore::new();

        let a = solid_face(
            &mut faces,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(64.0, 0.0, 0.0),
                Vector3::new(64.0, 64.0, 0.0),
                Vector3::new(0.0, 64.0, 0.0),
            ],
        );
        let b = solid_face(
            &mut faces,
            vec![
                Vector3::new(64.0, 0.0, 0.0),
                Vector3::new(128.0, 0.0, 0.0),
                Vector3::new(128.0, 64.0, 0.0),
                Vector3::new(64.0, 64.0, 0.0),
            ],
        );
        let c = solid_face(
            &mut faces,
            vec![
                Vector3::new(0.0, -64.0, 0.0),
                Vector3::new(128.0, -64.0, 0.0),
                Vector3::new(128.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            ],
        );

        let bounds = entity_bounds(&faces, &[a, b, c]);
        let mut root = single_node(&mut faces, &[a, b, c]);

        let stats = fix_tjuncs(&mut faces, &bounds, &mut root).unwrap();

        assert_eq!(stats.tjuncs, 1);
        assert_eq!(stats.tjunc_faces, 0);
        assert_eq!(faces[a].winding.len(), 4);
        assert_eq!(faces[b].winding.len(), 4);
        assert_eq!(faces[c].winding.len(), 5);
        assert!(faces[c]
            .winding
            .points
            .iter()
            .any(|p| (*p - Vector3::new(64.0, 0.0, 0.0)).magnitude() < POINT_EPSILON));

        // all three faces survive on the node
        assert_eq!(faces.list(node_faces(&root).faces).len(), 3);
    }

    #[test]
    fn test_oversized_winding_is_split() {
        let mut faces = FaceStore::new();

        let count = 300;
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / count as f64;
            points.push(Vector3::new(
                1000.0 * theta.cos(),
                1000.0 * theta.sin(),
                0.0,
            ));
        }
        let original_area = Winding::new(points.clone()).area();

        let big = solid_face(&mut faces, points);
        let bounds = entity_bounds(&faces, &[big]);
        let mut root = single_node(&mut faces, &[big]);

        let stats = fix_tjuncs(&mut faces, &bounds, &mut root).unwrap();

        assert_eq!(stats.tjuncs, 0);
        assert!(stats.tjunc_faces > 0);

        let pieces = faces.list(node_faces(&root).faces);
        assert!(pieces.len() >= 2);

        let mut area = 0.0;
        for piece in &pieces {
            assert!(faces[*piece].winding.len() <= MAX_FACE_POINTS);
            assert_eq!(faces[*piece].original, Some(big));
            area += faces[*piece].winding.area();
        }
        assert!((area - original_area).abs() < original_area * 1.0e-9);
    }

    #[test]
    fn test_degenerate_edge_direction_is_tolerated() {
        let mut faces = FaceStore::new();

        // a repeated vertex gives one edge a zero direction
        let dup = Vector3::new(8.0, 0.0, 0.0);
        let bad = solid_face(
            &mut faces,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                dup,
                dup,
                Vector3::new(0.0, 8.0, 0.0),
            ],
        );

        let bounds = entity_bounds(&faces, &[bad]);
        let mut root = single_node(&mut faces, &[bad]);

        let stats = fix_tjuncs(&mut faces, &bounds, &mut root).unwrap();
        assert_eq!(stats.tjunc_faces, 0);
        assert_eq!(faces[bad].winding.len(), 4);
    }

    #[test]
    fn test_shared_edge_endpoints_are_not_tjuncs() {
        let mut faces = FaceStore::new();

        // two squares sharing a full edge need no repair
        let a = solid_face(
            &mut faces,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(64.0, 0.0, 0.0),
                Vector3::new(64.0, 64.0, 0.0),
                Vector3::new(0.0, 64.0, 0.0),
            ],
        );
        let b = solid_face(
            &mut faces,
            vec![
                Vector3::new(64.0, 0.0, 0.0),
                Vector3::new(128.0, 0.0, 0.0),
                Vector3::new(128.0, 64.0, 0.0),
                Vector3::new(64.0, 64.0, 0.0),
            ],
        );

        let bounds = entity_bounds(&faces, &[a, b]);
        let mut root = single_node(&mut faces, &[a, b]);

        let stats = fix_tjuncs(&mut faces, &bounds, &mut root).unwrap();
        assert_eq!(stats.tjuncs, 0);
        assert_eq!(faces[a].winding.len(), 4);
        assert_eq!(faces[b].winding.len(), 4);
    }
}
