//! Cube face identifiers and the face basis table.
//!
//! Every piece of code that maps between texel coordinates and directions
//! goes through `FACE_BASIS`, so CPU bakes and GPU kernels agree on the
//! orientation of each face.

/// One face of a cubemap, in upload order.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubeFace {
    /// All faces in the order they are stored and written: +X, -X, +Y, -Y, +Z, -Z.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<CubeFace> {
        Self::ALL.get(index).copied()
    }

    pub fn basis(self) -> &'static FaceBasis {
        &FACE_BASIS[self.index()]
    }
}

/// Axes of one face: texel `u` grows along `u_axis`, texel `v` along
/// `v_axis`, and `normal` points from the cube centre through the face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBasis {
    pub u_axis: [f32; 3],
    pub v_axis: [f32; 3],
    pub normal: [f32; 3],
}

pub const FACE_BASIS: [FaceBasis; 6] = [
    // +X
    FaceBasis {
        u_axis: [0.0, 0.0, -1.0],
        v_axis: [0.0, -1.0, 0.0],
        normal: [1.0, 0.0, 0.0],
    },
    // -X
    FaceBasis {
        u_axis: [0.0, 0.0, 1.0],
        v_axis: [0.0, -1.0, 0.0],
        normal: [-1.0, 0.0, 0.0],
    },
    // +Y
    FaceBasis {
        u_axis: [1.0, 0.0, 0.0],
        v_axis: [0.0, 0.0, 1.0],
        normal: [0.0, 1.0, 0.0],
    },
    // -Y
    FaceBasis {
        u_axis: [1.0, 0.0, 0.0],
        v_axis: [0.0, 0.0, -1.0],
        normal: [0.0, -1.0, 0.0],
    },
    // +Z
    FaceBasis {
        u_axis: [1.0, 0.0, 0.0],
        v_axis: [0.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
    },
    // -Z
    FaceBasis {
        u_axis: [-1.0, 0.0, 0.0],
        v_axis: [0.0, -1.0, 0.0],
        normal: [0.0, 0.0, -1.0],
    },
];
