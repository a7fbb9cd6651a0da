/// A triangulated surface extracted from a grid at some isovalue.
///
/// Terminal artifact of the pipeline; never consumed again by it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// A quad-dominant surface extracted from a grid at some isovalue.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadMesh {
    pub positions: Vec<[f32; 3]>,
    pub quads: Vec<[u32; 4]>,
}

impl QuadMesh {
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}
