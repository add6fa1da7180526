/// A captured surface: tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl CapturedFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Builds a frame from GPU readback data.
    ///
    /// `bytes_per_row` is the (aligned) stride of `data`; padding is stripped.
    /// With `bgra` set, channels are swizzled to RGBA.
    pub fn from_padded_rows(
        width: u32,
        height: u32,
        bytes_per_row: u32,
        data: &[u8],
        bgra: bool,
    ) -> Self {
        let row = width as usize * 4;
        let mut pixels = Vec::with_capacity(row * height as usize);
        for chunk in data.chunks(bytes_per_row as usize).take(height as usize) {
            pixels.extend_from_slice(&chunk[..row]);
        }
        if bgra {
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).and_then(|p| p.try_into().ok())
    }
}
