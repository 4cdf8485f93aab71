use super::color::{Rgba, colors};

/// An owned RGBA pixel buffer, stored row by row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Bitmap {
    /// A fully transparent bitmap.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, colors::TRANSPARENT)
    }

    #[must_use]
    pub fn filled(width: usize, height: usize, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// Stand-in for a layer that could not be decoded.
    #[must_use]
    pub fn placeholder(width: usize, height: usize) -> Self {
        Self::filled(width, height, colors::ERROR)
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Writes a pixel, ignoring coordinates outside the bitmap.
    pub fn set_pixel_clipped(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            self[(x, y)] = color;
        }
    }

    /// Paints `other` on top of `self`; transparent pixels of `other` are
    /// skipped. Both bitmaps must have the same size.
    pub fn draw_over(&mut self, other: &Self) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (dst, src) in self.pixels.iter_mut().zip(&other.pixels) {
            if src[3] != 0 {
                *dst = *src;
            }
        }
    }
}

impl std::ops::Index<(usize, usize)> for Bitmap {
    type Output = Rgba;

    fn index(&self, (x, y): (usize, usize)) -> &Rgba {
        assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Bitmap {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }
}
