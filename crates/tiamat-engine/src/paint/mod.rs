//! Color types.
//!
//! Colors are linear, premultiplied RGBA. Conversions from straight alpha happen
//! at construction time so the GPU side never has to care.

mod color;

pub use color::Color;
