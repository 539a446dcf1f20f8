mod pixel_buffer;
#[cfg(feature = "sdl")]
mod window;

pub use pixel_buffer::{alpha_from_opacity, PixelBuffer};
#[cfg(feature = "sdl")]
pub use window::{Display, InputEvent, MouseButtonKind, RenderTarget};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
