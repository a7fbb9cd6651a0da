use crate::error::GridError;
use crate::grid::SparseGrid;

use ahash::AHashMap;
use glam::DVec3;
use scanvox_core::{QuadMesh, TriangleMesh};

/// Cube corner pairs differing in exactly one axis bit.
/// Corner `i` offsets the cell by `(i >> 2 & 1, i >> 1 & 1, i & 1)`.
const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (0, 2),
    (0, 4),
    (1, 3),
    (1, 5),
    (2, 3),
    (2, 6),
    (3, 7),
    (4, 5),
    (4, 6),
    (5, 7),
    (6, 7),
];

/// Extracts the isosurface as a quad mesh by dual contouring (surface
/// nets): one vertex per sign-change cell, placed at the mean of the
/// cell's edge crossings, and one quad per grid edge that crosses the
/// isovalue.
///
/// `iso_value` is interpreted in the grid's own value units. A grid
/// thinner than two voxels along any axis yields an empty mesh.
pub fn volume_to_quad_mesh(grid: &SparseGrid, iso_value: f32) -> Result<QuadMesh, GridError> {
    let nets = SurfaceNets::extract(grid, iso_value);
    Ok(QuadMesh {
        positions: nets.positions,
        quads: nets.quads,
    })
}

/// Extracts the isosurface as a triangle mesh: the dual-contoured quads
/// split in two.
///
/// `adaptivity` in `[0, 1]` trades fidelity for simplification by welding
/// vertices closer than `adaptivity` × two minimum voxel widths; `0`
/// performs no simplification.
pub fn volume_to_mesh(
    grid: &SparseGrid,
    iso_value: f32,
    adaptivity: f32,
) -> Result<TriangleMesh, GridError> {
    let nets = SurfaceNets::extract(grid, iso_value);

    let mut mesh = TriangleMesh {
        positions: nets.positions,
        triangles: Vec::with_capacity(nets.quads.len() * 2),
    };
    for [a, b, c, d] in nets.quads {
        mesh.triangles.push([a, b, c]);
        mesh.triangles.push([a, c, d]);
    }

    if adaptivity > 0.0 {
        let cell = adaptivity as f64 * 2.0 * grid.spacing().min_element();
        weld_vertices(&mut mesh, cell);
    }

    Ok(mesh)
}

struct SurfaceNets {
    positions: Vec<[f32; 3]>,
    quads: Vec<[u32; 4]>,
}

impl SurfaceNets {
    fn extract(grid: &SparseGrid, iso_value: f32) -> Self {
        let shape = grid.shape().map(|d| d as usize);
        let mut nets = Self {
            positions: Vec::new(),
            quads: Vec::new(),
        };
        if shape.iter().any(|&d| d < 2) {
            return nets;
        }

        let [s0, s1, s2] = shape;
        let dense = grid.to_dense();
        let sample = |i0: usize, i1: usize, i2: usize| dense[(i0 * s1 + i1) * s2 + i2];

        // One vertex per cell whose corners straddle the isovalue.
        let cells = [s0 - 1, s1 - 1, s2 - 1];
        let cell_index = |c: [usize; 3]| (c[0] * cells[1] + c[1]) * cells[2] + c[2];
        let mut cell_vertex = vec![u32::MAX; cells[0] * cells[1] * cells[2]];

        for c0 in 0..cells[0] {
            for c1 in 0..cells[1] {
                for c2 in 0..cells[2] {
                    let corner = |i: usize| {
                        sample(c0 + (i >> 2 & 1), c1 + (i >> 1 & 1), c2 + (i & 1))
                    };
                    let mut mask = 0u32;
                    for i in 0..8 {
                        if corner(i) > iso_value {
                            mask |= 1 << i;
                        }
                    }
                    if mask == 0 || mask == 0xff {
                        continue;
                    }

                    let mut centroid = DVec3::ZERO;
                    let mut crossings = 0.0;
                    for &(a, b) in &CUBE_EDGES {
                        let va = corner(a);
                        let vb = corner(b);
                        if (va > iso_value) == (vb > iso_value) {
                            continue;
                        }
                        let t = ((iso_value - va) / (vb - va)) as f64;
                        let pa = DVec3::new(
                            (a >> 2 & 1) as f64,
                            (a >> 1 & 1) as f64,
                            (a & 1) as f64,
                        );
                        let pb = DVec3::new(
                            (b >> 2 & 1) as f64,
                            (b >> 1 & 1) as f64,
                            (b & 1) as f64,
                        );
                        centroid += pa + (pb - pa) * t;
                        crossings += 1.0;
                    }
                    let frac =
                        DVec3::new(c0 as f64, c1 as f64, c2 as f64) + centroid / crossings;
                    let world = grid.index_to_world(frac);

                    cell_vertex[cell_index([c0, c1, c2])] = nets.positions.len() as u32;
                    nets.positions
                        .push([world.x as f32, world.y as f32, world.z as f32]);
                }
            }
        }

        // One quad per interior grid edge with a sign change, joining the
        // vertices of the four cells sharing the edge.
        for axis in 0..3 {
            let ab = (axis + 1) % 3;
            let ac = (axis + 2) % 3;
            let mut p = [0usize; 3];
            for a in 0..shape[axis] - 1 {
                for b in 1..shape[ab] - 1 {
                    for c in 1..shape[ac] - 1 {
                        p[axis] = a;
                        p[ab] = b;
                        p[ac] = c;
                        let mut q = p;
                        q[axis] += 1;
                        let v0 = sample(p[0], p[1], p[2]);
                        let v1 = sample(q[0], q[1], q[2]);
                        if (v0 > iso_value) == (v1 > iso_value) {
                            continue;
                        }

                        let vertex_at = |db: usize, dc: usize| {
                            let mut cell = p;
                            cell[ab] -= db;
                            cell[ac] -= dc;
                            cell_vertex[cell_index(cell)]
                        };
                        let quad = if v0 > iso_value {
                            [vertex_at(1, 1), vertex_at(0, 1), vertex_at(0, 0), vertex_at(1, 0)]
                        } else {
                            [vertex_at(1, 1), vertex_at(1, 0), vertex_at(0, 0), vertex_at(0, 1)]
                        };
                        debug_assert!(quad.iter().all(|&v| v != u32::MAX));
                        nets.quads.push(quad);
                    }
                }
            }
        }

        nets
    }
}

/// Clusters vertices onto a world-space lattice of edge length `cell` and
/// drops the triangles this degenerates.
fn weld_vertices(mesh: &mut TriangleMesh, cell: f64) {
    let key_of = |p: [f32; 3]| {
        [
            (p[0] as f64 / cell).floor() as i64,
            (p[1] as f64 / cell).floor() as i64,
            (p[2] as f64 / cell).floor() as i64,
        ]
    };

    let mut representative: AHashMap<[i64; 3], u32> = AHashMap::new();
    let mut remap = vec![0u32; mesh.positions.len()];
    let mut kept_positions = Vec::new();
    for (i, &p) in mesh.positions.iter().enumerate() {
        let idx = *representative.entry(key_of(p)).or_insert_with(|| {
            kept_positions.push(p);
            kept_positions.len() as u32 - 1
        });
        remap[i] = idx;
    }

    mesh.positions = kept_positions;
    mesh.triangles = mesh
        .triangles
        .iter()
        .map(|t| t.map(|v| remap[v as usize]))
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .collect();
}
