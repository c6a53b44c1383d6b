//! Shared helpers for rendering.

mod scrollbar;
pub mod text;

pub use scrollbar::Scrollbar;
