// SPDX-License-Identifier: MIT OR Apache-2.0
//! Artifacts that flow along graph edges.
//!
//! An artifact is the owned result of a node computation. Consumers always
//! receive a clone, so two nodes reading the same producer never share
//! mutable state.

use crate::pin::PinType;

/// Differences below this are treated as a flat field when normalizing.
const FLAT_EPSILON: f32 = 0.0001;

/// A row-major grid of height samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Heightfield {
    /// Create a zero-filled heightfield
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Create a heightfield with every sample set to `value`
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Build a heightfield by evaluating `f(x, y)` for every sample
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Width in samples
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in samples
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw sample data, row-major
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw sample data, row-major
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Sample at (x, y), or `None` outside the grid
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Sample at (x, y), or 0.0 outside the grid
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        self.get(x, y).unwrap_or(0.0)
    }

    /// Write a sample. Returns false when (x, y) is outside the grid.
    pub fn set(&mut self, x: u32, y: u32, value: f32) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// Whether both grids have identical dimensions
    pub fn same_dimensions(&self, other: &Heightfield) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Smallest sample (0.0 for an empty grid)
    pub fn min(&self) -> f32 {
        self.data.iter().copied().reduce(f32::min).unwrap_or(0.0)
    }

    /// Largest sample (0.0 for an empty grid)
    pub fn max(&self) -> f32 {
        self.data.iter().copied().reduce(f32::max).unwrap_or(0.0)
    }

    /// Set every sample to `value`
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Rescale samples into `[lo, hi]`. A flat field collapses to the midpoint.
    pub fn normalize(&mut self, lo: f32, hi: f32) {
        let (min, max) = (self.min(), self.max());
        if max - min < FLAT_EPSILON {
            self.fill((lo + hi) * 0.5);
            return;
        }
        let range = max - min;
        for h in &mut self.data {
            *h = lo + (*h - min) / range * (hi - lo);
        }
    }

    /// Apply `f` to every sample, producing a new grid
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Heightfield {
        Heightfield {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&h| f(h)).collect(),
        }
    }

    /// Combine two grids sample by sample.
    ///
    /// Returns `None` when the dimensions differ.
    pub fn zip_with(&self, other: &Heightfield, f: impl Fn(f32, f32) -> f32) -> Option<Heightfield> {
        if !self.same_dimensions(other) {
            return None;
        }
        Some(Heightfield {
            width: self.width,
            height: self.height,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }
}

/// An RGBA float image, row-major, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<[f32; 4]>,
}

impl Image {
    /// Create a transparent black image
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        (x < self.width && y < self.height)
            .then(|| self.data[y as usize * self.width as usize + x as usize])
    }

    /// Write a pixel. Out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [f32; 4]) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = rgba;
        }
    }
}

/// A computed value cached by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Height grid
    Heightfield(Heightfield),
    /// Texture-like image
    Image(Image),
}

impl Artifact {
    /// The pin type that carries this artifact
    pub fn pin_type(&self) -> PinType {
        match self {
            Self::Heightfield(_) => PinType::Heightfield,
            Self::Image(_) => PinType::Image,
        }
    }

    /// Borrow the heightfield, if this is one
    pub fn as_heightfield(&self) -> Option<&Heightfield> {
        match self {
            Self::Heightfield(h) => Some(h),
            Self::Image(_) => None,
        }
    }

    /// Take the heightfield, if this is one
    pub fn into_heightfield(self) -> Option<Heightfield> {
        match self {
            Self::Heightfield(h) => Some(h),
            Self::Image(_) => None,
        }
    }

    /// Borrow the image, if this is one
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Self::Image(i) => Some(i),
            Self::Heightfield(_) => None,
        }
    }

    /// Dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Heightfield(h) => (h.width(), h.height()),
            Self::Image(i) => (i.width(), i.height()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_access() {
        let mut hf = Heightfield::new(4, 2);
        assert!(hf.set(3, 1, 2.5));
        assert!(!hf.set(4, 0, 1.0));
        assert_eq!(hf.get(3, 1), Some(2.5));
        assert_eq!(hf.get(0, 2), None);
        assert_eq!(hf.sample(9, 9), 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut hf = Heightfield::from_fn(3, 1, |x, _| x as f32 * 5.0);
        hf.normalize(0.0, 1.0);
        assert_eq!(hf.data(), &[0.0, 0.5, 1.0]);

        let mut flat = Heightfield::filled(2, 2, 7.0);
        flat.normalize(0.0, 1.0);
        assert!(flat.data().iter().all(|&h| h == 0.5));
    }

    #[test]
    fn test_zip_with_rejects_mismatched_dimensions() {
        let a = Heightfield::filled(4, 4, 1.0);
        let b = Heightfield::filled(2, 4, 1.0);
        assert!(a.zip_with(&b, |x, y| x + y).is_none());

        let c = Heightfield::filled(4, 4, 2.0);
        let sum = a.zip_with(&c, |x, y| x + y).unwrap();
        assert!(sum.data().iter().all(|&h| h == 3.0));
    }
}
