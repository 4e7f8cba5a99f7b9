//! Vertex formats.
//!
//! Three layouts meet at the bridge:
//!
//! | Type | Source | Notes |
//! |------|--------|-------|
//! | [`TlVertex`] | per-polygon submission | already transformed and lit, no lightmap uv |
//! | [`HwVertex`] | static mesh creation | packed `0xAARRGGBB` diffuse, lightmap uv |
//! | [`Vertex`] | GPU | the only layout ever uploaded |
//!
//! Both legacy formats convert into [`Vertex`] with `From`, so the staging
//! and upload paths only ever see one element type.

use bytemuck::{Pod, Zeroable};

/// Canonical GPU vertex.
///
/// `#[repr(C)]` with no padding so a `&[Vertex]` can be uploaded as bytes.
///
/// | Attribute | Offset | Format |
/// |-----------|--------|--------|
/// | position | 0 | `f32x3` |
/// | color | 12 | `f32x4` (RGBA, normalized) |
/// | uv | 28 | `f32x2` |
/// | lightmap_uv | 36 | `f32x2` |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub lightmap_uv: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), 44);

impl Vertex {
    /// Size of one vertex in bytes (the vertex buffer stride).
    pub const STRIDE: u64 = std::mem::size_of::<Self>() as u64;

    /// Byte offset of the color attribute.
    pub const COLOR_OFFSET: u64 = 12;
    /// Byte offset of the primary texture coordinate.
    pub const UV_OFFSET: u64 = 28;
    /// Byte offset of the lightmap texture coordinate.
    pub const LIGHTMAP_UV_OFFSET: u64 = 36;

    /// Create a vertex from its four attributes.
    pub fn new(position: [f32; 3], color: [f32; 4], uv: [f32; 2], lightmap_uv: [f32; 2]) -> Self {
        Self {
            position,
            color,
            uv,
            lightmap_uv,
        }
    }

    /// Byte size of `count` vertices.
    pub fn byte_size(count: usize) -> u64 {
        count as u64 * Self::STRIDE
    }
}

/// Transformed and lit vertex as submitted with every dynamic polygon.
///
/// Color channels are expected in `[0, 1]` and are copied without scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TlVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    pub u: f32,
    pub v: f32,
}

impl TlVertex {
    /// Create a vertex at the given position with opaque white color and zero uv.
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
            u: 0.0,
            v: 0.0,
        }
    }

    /// Set the color.
    pub fn with_color(mut self, r: f32, g: f32, b: f32, a: f32) -> Self {
        self.r = r;
        self.g = g;
        self.b = b;
        self.a = a;
        self
    }

    /// Set the texture coordinate.
    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.u = u;
        self.v = v;
        self
    }
}

impl From<TlVertex> for Vertex {
    fn from(p: TlVertex) -> Self {
        Self {
            position: [p.x, p.y, p.z],
            color: [p.r, p.g, p.b, p.a],
            uv: [p.u, p.v],
            lightmap_uv: [0.0, 0.0],
        }
    }
}

impl From<&TlVertex> for Vertex {
    fn from(p: &TlVertex) -> Self {
        Self::from(*p)
    }
}

/// Static mesh vertex with a packed diffuse color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HwVertex {
    pub position: [f32; 3],
    /// Diffuse color packed as `0xAARRGGBB`.
    pub diffuse: u32,
    pub u: f32,
    pub v: f32,
    /// Lightmap texture coordinate.
    pub lu: f32,
    pub lv: f32,
}

impl HwVertex {
    /// Create a static mesh vertex.
    pub fn new(position: [f32; 3], diffuse: u32, uv: [f32; 2], lightmap_uv: [f32; 2]) -> Self {
        Self {
            position,
            diffuse,
            u: uv[0],
            v: uv[1],
            lu: lightmap_uv[0],
            lv: lightmap_uv[1],
        }
    }
}

/// Unpack `0xAARRGGBB` into normalized `[r, g, b, a]`.
pub fn unpack_argb(argb: u32) -> [f32; 4] {
    let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 / 255.0;
    [channel(16), channel(8), channel(0), channel(24)]
}

impl From<HwVertex> for Vertex {
    fn from(p: HwVertex) -> Self {
        Self {
            position: p.position,
            color: unpack_argb(p.diffuse),
            uv: [p.u, p.v],
            lightmap_uv: [p.lu, p.lv],
        }
    }
}

impl From<&HwVertex> for Vertex {
    fn from(p: &HwVertex) -> Self {
        Self::from(*p)
    }
}
