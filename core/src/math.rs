//! Math type aliases and the legacy transform.
//!
//! The host engine uses the row-vector convention: a point is transformed as
//! `p * M`, so the translation lives in the fourth *row* and a chain of
//! transforms composes left to right (`world * view * projection`).

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Which of the three fixed-function matrices a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixKind {
    World,
    View,
    Projection,
}

impl MatrixKind {
    /// All kinds in composition order.
    pub const ALL: [MatrixKind; 3] = [Self::World, Self::View, Self::Projection];

    /// Index into a `[Mat4; 3]` matrix table.
    pub fn index(self) -> usize {
        match self {
            Self::World => 0,
            Self::View => 1,
            Self::Projection => 2,
        }
    }
}

/// Legacy affine transform: a 3x3 basis plus a translation.
///
/// The rows `a`, `b` and `c` become the first three rows of the 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub translation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        a: Vec3::new(1.0, 0.0, 0.0),
        b: Vec3::new(0.0, 1.0, 0.0),
        c: Vec3::new(0.0, 0.0, 1.0),
        translation: Vec3::new(0.0, 0.0, 0.0),
    };

    /// A pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Expand into a row-vector 4x4 matrix.
    pub fn to_matrix(&self) -> Mat4 {
        let (a, b, c, t) = (&self.a, &self.b, &self.c, &self.translation);
        #[rustfmt::skip]
        let result = Mat4::new(
            a.x, a.y, a.z, 0.0,
            b.x, b.y, b.z, 0.0,
            c.x, c.y, c.z, 0.0,
            t.x, t.y, t.z, 1.0,
        );
        result
    }

    /// Read the basis and translation back out of a row-vector matrix.
    ///
    /// The fourth column is ignored.
    pub fn from_matrix(m: &Mat4) -> Self {
        let row = |r: usize| Vec3::new(m[(r, 0)], m[(r, 1)], m[(r, 2)]);
        Self {
            a: row(0),
            b: row(1),
            c: row(2),
            translation: row(3),
        }
    }
}

/// Combine world, view and projection into the per-draw constant.
pub fn world_view_projection(world: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
    world * view * projection
}

/// Flatten a matrix row by row, the layout uploaded as draw constants.
pub fn mat4_to_rows(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    for r in 0..4 {
        for c in 0..4 {
            out[r * 4 + c] = m[(r, c)];
        }
    }
    out
}
