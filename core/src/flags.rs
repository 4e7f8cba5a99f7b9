//! Legacy render flags.

use bitflags::bitflags;

bitflags! {
    /// Per-polygon and per-mesh render flags from the host engine.
    ///
    /// Names document the host's meaning; the bridge stores and forwards the
    /// word without acting on it. Bits not named here are preserved so the
    /// host's raw word survives a round trip through the bridge.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PolyFlags: u32 {
        /// Blend with the source alpha.
        const ALPHA = 1 << 0;
        /// Discard fragments below the alpha reference.
        const ALPHA_TEST = 1 << 1;
        /// Skip the depth test.
        const NO_ZTEST = 1 << 2;
        /// Do not write depth.
        const NO_ZWRITE = 1 << 3;
        /// Clamp texture coordinates instead of wrapping.
        const CLAMP_UV = 1 << 4;
        /// Host's flush-after-polygon request. Carried through untouched;
        /// staged geometry is only flushed at scene end.
        const FLUSH_AFTER = 1 << 5;
        /// Host's per-polygon wireframe bit. Carried through untouched; only
        /// the scene-level setting selects the wireframe pipeline.
        const WIREFRAME = 1 << 6;
    }
}

impl Default for PolyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl PolyFlags {
    /// Build from the host's raw flag word, keeping unknown bits.
    pub fn from_raw(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }
}
