//! Optional [Tracy](https://github.com/wolfpld/tracy) instrumentation.
//!
//! Enabled with the `profiling` Cargo feature. Without it every macro here
//! expands to nothing.
//!
//! ```ignore
//! use polybridge_core::{frame_mark, profile_scope};
//!
//! fn end_scene() {
//!     profile_scope!("end_scene");
//!     // record, submit, present
//!     frame_mark!();
//! }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{
    self, Client, Span, frame_mark as tracy_frame_mark, plot as tracy_plot, span,
};

/// Mark the end of a presented frame.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Mark the end of a presented frame (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Open a named span that closes at the end of the enclosing scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Open a named span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Open a span named after the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Open a function span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a value over time, such as staged vertex count or fence wait time.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

/// Start the Tracy client. Call once before the first frame.
#[cfg(feature = "profiling")]
pub fn start() {
    tracy_client::Client::start();
}

/// Start the Tracy client (no-op when profiling disabled).
#[cfg(not(feature = "profiling"))]
pub fn start() {}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand_without_feature() {
        crate::profile_scope!("test");
        crate::profile_plot!("value", 3u32);
        crate::frame_mark!();
        super::start();
    }
}
