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

//! Face subdivision for lightmap block limits.
//!
//! Subdivision exists almost entirely because of lightmap block limits:
//! one block is always added at the end of a surface for smooth
//! interpolation, so a face wider than the block limit on either texture
//! axis has to be carved into smaller pieces before lighting.

use cgmath::InnerSpace;

use crate::face::{FaceId, FaceStore};
use crate::map::{MapData, TexFlags};
use crate::math::Plane;
use crate::options::Options;

/// Subtracted from the block limit at every split. Clipping loses
/// precision, and the output may later run on engines that rescale
/// lightmaps, so the cut always lands early.
const SPLIT_MARGIN: f64 = 16.0;

/// If `face` exceeds the subdivision limit on either texture axis, carve
/// it into a chain of limit-sized pieces.
///
/// The face keeps its handle and becomes the lowest-extent piece in place;
/// each carved remainder is spliced in after it, still oversized, to be
/// picked up by the caller's walk over the chain.
pub fn subdivide_face(map: &MapData, options: &Options, faces: &mut FaceStore, face: FaceId) {
    let tex = &map.texinfos[faces[face].texinfo_id];

    // non-lightmapped surfaces don't need carving
    if tex.flags.intersects(TexFlags::SKIP | TexFlags::HINT) || !tex.is_subdivided() {
        return;
    }

    // engines that support lightmap scaling handle 256x256 blocks at any
    // scale; legacy lighting tops out at a shift of 4
    let lmshift = faces[face].lmshift[0].min(4);
    let mut subdiv = f64::from(255u32 << u32::from(lmshift));
    if subdiv >= options.subdivide {
        subdiv = options.subdivide;
    }

    for axis in 0..2 {
        loop {
            let axis_vec = tex.vecs[axis].vec;

            let mut mins = std::f64::MAX;
            let mut maxs = -std::f64::MAX;
            for point in &faces[face].winding.points {
                let v = point.dot(axis_vec);
                if v < mins {
                    mins = v;
                }
                if v > maxs {
                    maxs = v;
                }
            }

            let extent = maxs.ceil() - mins.floor();
            if extent <= subdiv {
                break;
            }

            // split it
            let scale = axis_vec.magnitude();
            let split = Plane::new(axis_vec / scale, (mins + subdiv - SPLIT_MARGIN) / scale);

            let pieces = faces[face].winding.split(&split);
            match pieces {
                (Some(front_winding), Some(back_winding)) => {
                    let next = faces[face].next;
                    let mut rest = faces[face].derived();
                    rest.winding = front_winding;
                    rest.next = next;
                    let rest_id = faces.alloc(rest);

                    faces[face].winding = back_winding;
                    faces[face].next = Some(rest_id);
                }
                _ => {
                    warn!("subdivide didn't split, leaving face whole");
                    break;
                }
            }
        }
    }
}

/// Runs subdivision over a whole face chain, including the remainder
/// pieces spliced in along the way.
pub fn subdivide_faces(map: &MapData, options: &Options, faces: &mut FaceStore, head: Option<FaceId>) {
    let mut cur = head;
    while let Some(id) = cur {
        subdivide_face(map, options, faces, id);
        cur = faces[id].next;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::face::{Contents, Face};
    use crate::map::{TexAxis, TexInfo};
    use crate::math::PlaneSide;
    use crate::winding::Winding;
    use cgmath::Vector3;

    fn test_texinfo(flags: TexFlags) -> TexInfo {
        TexInfo {
            vecs: [
                TexAxis {
                    vec: Vector3::new(1.0, 0.0, 0.0),
                    offset: 0.0,
                },
                TexAxis {
                    vec: Vector3::new(0.0, 1.0, 0.0),
                    offset: 0.0,
                },
            ],
            miptex: 0,
            flags,
        }
    }

    fn wide_face(map: &mut MapData, faces: &mut FaceStore, flags: TexFlags) -> FaceId {
        let texinfo_id = map.add_texinfo(test_texinfo(flags));
        let winding = Winding::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(600.0, 0.0, 0.0),
            Vector3::new(600.0, 100.0, 0.0),
            Vector3::new(0.0, 100.0, 0.0),
        ]);
        faces.alloc(Face::new(
            winding,
            0,
            PlaneSide::Front,
            texinfo_id,
            [Contents::Solid as i32, Contents::Empty as i32],
            [4, 4],
        ))
    }

    fn extent(faces: &FaceStore, id: FaceId, axis_vec: Vector3<f64>) -> f64 {
        let mut mins = std::f64::MAX;
        let mut maxs = -std::f64::MAX;
        for point in &faces[id].winding.points {
            let v = point.dot(axis_vec);
            mins = mins.min(v);
            maxs = maxs.max(v);
        }
        maxs.ceil() - mins.floor()
    }

    #[test]
    fn test_wide_lmshift_face_left_whole() {
        let mut map = MapData::new();
        let mut faces = FaceStore::new();
        let id = wide_face(&mut map, &mut faces, TexFlags::empty());

        // 255 << 4 = 4080 is the binding limit here
        let options = Options { subdivide: 8192.0 };
        subdivide_faces(&map, &options, &mut faces, Some(id));

        assert_eq!(faces.list(Some(id)).len(), 1);
        assert_eq!(faces[id].winding.len(), 4);
    }

    #[test]
    fn test_wide_face_carved_into_three() {
        let mut map = MapData::new();
        let mut faces = FaceStore::new();
        let id = wide_face(&mut map, &mut faces, TexFlags::empty());

        let options = Options { subdivide: 240.0 };
        subdivide_faces(&map, &options, &mut faces, Some(id));

        let chain = faces.list(Some(id));
        assert_eq!(chain.len(), 3);

        let axis = Vector3::new(1.0, 0.0, 0.0);
        let mut area = 0.0;
        for piece in &chain {
            assert!(extent(&faces, *piece, axis) <= 240.0);
            area += faces[*piece].winding.area();
        }
        assert!((area - 600.0 * 100.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_skip_face_left_whole() {
        let mut map = MapData::new();
        let mut faces = FaceStore::new();
        let id = wide_face(&mut map, &mut faces, TexFlags::SKIP);

        let options = Options { subdivide: 240.0 };
        subdivide_faces(&map, &options, &mut faces, Some(id));
        assert_eq!(faces.list(Some(id)).len(), 1);
    }

    #[test]
    fn test_special_face_left_whole() {
        let mut map = MapData::new();
        let mut faces = FaceStore::new();
        let id = wide_face(&mut map, &mut faces, TexFlags::SPECIAL);

        let options = Options { subdivide: 240.0 };
        subdivide_faces(&map, &options, &mut faces, Some(id));
        assert_eq!(faces.list(Some(id)).len(), 1);
    }
}
