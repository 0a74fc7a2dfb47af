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

//! Vertex and edge deduplication, and the face emission protocol.
//!
//! Every distinct point gets one slot in the output vertex table, found
//! through a spatial hash over unit cells. Every geometric edge gets one
//! slot in the output edge table; when a face walks an edge another face
//! has already claimed in the opposite direction, it references the same
//! slot with a negated surfedge index instead of emitting a new one, which
//! is what lets a renderer walk shared silhouettes exactly once.
//!
//! Emission itself is a left-first depth-first walk of the tree; each
//! interior node records the contiguous run of face records emitted for
//! it, and each face record points at the contiguous run of its signed
//! surfedges.

use std::collections::BTreeMap;
use std::mem;

use cgmath::Vector3;

use crate::error::{CompileError, CompileErrorKind};
use crate::face::{FaceId, FaceStore, Node, NodeKind};
use crate::map::{Edge, Entity, MapData, OutputFace, TexFlags, MAX_LIGHTSTYLES};
use crate::math::{POINT_EPSILON, ZERO_EPSILON};

/// Most edges a single face may emit.
pub const MAX_EDGES_PER_FACE: usize = 64;

struct HashVert {
    point: Vector3<f64>,
    num: usize,
}

/// Spatial hash from unit cell to the output vertices inside or near it.
#[derive(Default)]
struct VertexTable {
    cells: BTreeMap<(i64, i64, i64), Vec<HashVert>>,
}

impl VertexTable {
    /// The output index for `point`, appending a new vertex unless one
    /// already sits within `POINT_EPSILON`.
    fn get_vertex(&mut self, map: &mut MapData, point: Vector3<f64>) -> usize {
        let mut vert = point;
        for i in 0..3 {
            let rounded = vert[i].round();
            if (vert[i] - rounded).abs() < ZERO_EPSILON {
                vert[i] = rounded;
            }
        }

        let probe = (
            vert.x.floor() as i64,
            vert.y.floor() as i64,
            vert.z.floor() as i64,
        );
        if let Some(cell) = self.cells.get(&probe) {
            for hv in cell {
                if (hv.point.x - vert.x).abs() < POINT_EPSILON
                    && (hv.point.y - vert.y).abs() < POINT_EPSILON
                    && (hv.point.z - vert.z).abs() < POINT_EPSILON
                {
                    return hv.num;
                }
            }
        }

        let num = map.bsp.vertexes.len();
        map.bsp.vertexes.push(vert);

        // register in every cell a probe within POINT_EPSILON can land in
        let mut registered: Vec<(i64, i64, i64)> = Vec::with_capacity(8);
        for &x in &[
            (vert.x - POINT_EPSILON).floor() as i64,
            (vert.x + POINT_EPSILON).floor() as i64,
        ] {
            for &y in &[
                (vert.y - POINT_EPSILON).floor() as i64,
                (vert.y + POINT_EPSILON).floor() as i64,
            ] {
                for &z in &[
                    (vert.z - POINT_EPSILON).floor() as i64,
                    (vert.z + POINT_EPSILON).floor() as i64,
                ] {
                    let cell = (x, y, z);
                    if !registered.contains(&cell) {
                        registered.push(cell);
                        self.cells
                            .entry(cell)
                            .or_insert_with(Vec::new)
                            .push(HashVert { point: vert, num });
                    }
                }
            }
        }

        num
    }
}

/// An emitted edge and the faces that have claimed its two directions.
struct HashEdge {
    index: usize,
    face0: FaceId,
    face1: Option<FaceId>,
}

#[derive(Default)]
struct EdgeTable {
    pairs: BTreeMap<(usize, usize), Vec<HashEdge>>,
}

impl EdgeTable {
    /// The signed surfedge index for the directed edge `p1 -> p2` of
    /// `face`.
    ///
    /// A previously emitted reverse edge is reused, negated, when its back
    /// side is still free and its claimant's front contents match; welding
    /// across differing contents would collapse a visible surface.
    fn get_edge(
        &mut self,
        verts: &mut VertexTable,
        map: &mut MapData,
        faces: &FaceStore,
        face: FaceId,
        p1: Vector3<f64>,
        p2: Vector3<f64>,
    ) -> Result<i32, CompileError> {
        if faces[face].contents[0] == 0 {
            return Err(CompileErrorKind::BadContents.into());
        }

        let v1 = verts.get_vertex(map, p1);
        let v2 = verts.get_vertex(map, p2);

        if let Some(list) = self.pairs.get_mut(&(v2, v1)) {
            for hashedge in list.iter_mut() {
                if hashedge.face1.is_none()
                    && faces[hashedge.face0].contents[0] == faces[face].contents[0]
                {
                    hashedge.face1 = Some(face);
                    return Ok(-(hashedge.index as i32));
                }
            }
        }

        let index = map.bsp.edges.len();
        map.bsp.edges.push(Edge { v1, v2 });
        self.pairs
            .entry((v1, v2))
            .or_insert_with(Vec::new)
            .push(HashEdge {
                index,
                face0: face,
                face1: None,
            });

        Ok(index as i32)
    }
}

/// Allocates the signed edge array for one face. `SKIP` and `HINT` faces
/// contribute nothing.
fn find_face_edges(
    map: &mut MapData,
    faces: &mut FaceStore,
    verts: &mut VertexTable,
    edges: &mut EdgeTable,
    face: FaceId,
) -> Result<(), CompileError> {
    let flags = map.texinfos[faces[face].texinfo_id].flags;
    if flags.intersects(TexFlags::SKIP | TexFlags::HINT) {
        return Ok(());
    }

    faces[face].output_number = None;

    let count = faces[face].winding.len();
    if count > MAX_EDGES_PER_FACE {
        return Err(CompileErrorKind::TooManyFaceEdges {
            count,
            limit: MAX_EDGES_PER_FACE,
        }
        .into());
    }

    let mut signed = Vec::with_capacity(count);
    for i in 0..count {
        let p1 = faces[face].winding.points[i];
        let p2 = faces[face].winding.points[(i + 1) % count];
        signed.push(edges.get_edge(verts, map, faces, face, p1, p2)?);
    }
    faces[face].edges = signed;

    Ok(())
}

fn find_edges_r(
    map: &mut MapData,
    faces: &mut FaceStore,
    verts: &mut VertexTable,
    edges: &mut EdgeTable,
    node: &Node,
) -> Result<(), CompileError> {
    if let NodeKind::Inner(inner) = &node.kind {
        let mut next = inner.faces;
        while let Some(id) = next {
            next = faces[id].next;
            find_face_edges(map, faces, verts, edges, id)?;
        }

        find_edges_r(map, faces, verts, edges, &inner.children[0])?;
        find_edges_r(map, faces, verts, edges, &inner.children[1])?;
    }
    Ok(())
}

/// Appends one face record and its surfedges, releasing the face's edge
/// array. `SKIP` and `HINT` faces leave no trace.
fn emit_face(map: &mut MapData, faces: &mut FaceStore, face: FaceId) {
    let flags = map.texinfos[faces[face].texinfo_id].flags;
    if flags.intersects(TexFlags::SKIP | TexFlags::HINT) {
        return;
    }

    assert!(
        faces[face].output_number.is_none(),
        "face emitted twice"
    );
    faces[face].output_number = Some(map.bsp.faces.len());

    let plane_id = map.export_plane(faces[face].plane_id);
    let texinfo_id = map.export_texinfo(faces[face].texinfo_id);

    let first_edge = map.bsp.surfedges.len();
    let signed = mem::replace(&mut faces[face].edges, Vec::new());
    for surfedge in signed {
        map.bsp.surfedges.push(surfedge);
    }

    map.bsp.faces.push(OutputFace {
        plane_id,
        side: faces[face].side,
        first_edge,
        edge_count: map.bsp.surfedges.len() - first_edge,
        texinfo_id,
        styles: [255; MAX_LIGHTSTYLES],
        light_ofs: -1,
    });

    map.exported_lmshifts.push(faces[face].lmshift[0]);
    assert_eq!(map.bsp.faces.len(), map.exported_lmshifts.len());
}

/// Emits every face of every interior node, left subtree first, recording
/// each node's contiguous run of face records.
fn grow_node_region(map: &mut MapData, faces: &mut FaceStore, node: &mut Node) {
    if let NodeKind::Inner(inner) = &mut node.kind {
        inner.first_face = map.bsp.faces.len();

        let mut next = inner.faces;
        while let Some(id) = next {
            next = faces[id].next;
            assert_eq!(faces[id].plane_id, inner.plane_id);
            emit_face(map, faces, id);
        }

        inner.face_count = map.bsp.faces.len() - inner.first_face;

        grow_node_region(map, faces, &mut inner.children[0]);
        grow_node_region(map, faces, &mut inner.children[1]);
    }
}

fn count_data_r(map: &mut MapData, entity: &mut Entity, faces: &FaceStore, node: &Node) {
    if let NodeKind::Inner(inner) = &node.kind {
        let mut next = inner.faces;
        while let Some(id) = next {
            entity.face_count += 1;
            entity.vertex_count += faces[id].winding.len();
            if faces[id].lmshift[0] != 4 {
                map.needs_lmshifts = true;
            }
            next = faces[id].next;
        }

        count_data_r(map, entity, faces, &inner.children[0]);
        count_data_r(map, entity, faces, &inner.children[1]);
    }
}

/// Deduplicates vertices and edges for every face in the tree, then emits
/// the face records node by node. Returns the entity's first output face
/// number.
pub fn make_face_edges(
    map: &mut MapData,
    entity: &mut Entity,
    faces: &mut FaceStore,
    root: &mut Node,
) -> Result<usize, CompileError> {
    count_data_r(map, entity, faces, root);

    // edge 0 can never be referenced, a surfedge of 0 has no direction
    if map.bsp.edges.is_empty() {
        map.bsp.edges.push(Edge { v1: 0, v2: 0 });
    }

    let mut verts = VertexTable::default();
    let mut edges = EdgeTable::default();
    find_edges_r(map, faces, &mut verts, &mut edges, root)?;

    let first_face = map.bsp.faces.len();
    grow_node_region(map, faces, root);
    entity.first_output_face = Some(first_face);

    debug!(
        "{} vertexes, {} edges, {} faces",
        map.bsp.vertexes.len(),
        map.bsp.edges.len() - 1,
        map.bsp.faces.len() - first_face
    );

    Ok(first_face)
}
