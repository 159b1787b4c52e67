/// Dimensions of a single stored image. Rows in a batch record are laid out
/// channel-major as (channels, height, width).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    pub fn bytes_per_image(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// (height, width, channels), the order images are stored in once assembled
    pub fn hwc(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        // 32x32 RGB
        Self::new(3, 32, 32)
    }
}

/// Append `src` (channel-major) to `dst` in pixel-interleaved order.
///
/// `src.len()` must equal `shape.bytes_per_image()`; callers check this
/// before transposing.
pub fn chw_to_hwc(src: &[u8], shape: ImageShape, dst: &mut Vec<u8>) {
    debug_assert_eq!(src.len(), shape.bytes_per_image());

    let plane = shape.height * shape.width;
    dst.reserve(src.len());

    for pixel in 0..plane {
        for channel in 0..shape.channels {
            dst.push(src[channel * plane + pixel]);
        }
    }
}
