//! Half-open frame ranges.

use audian_io::clamp_range;
use std::fmt;

/// The frames `[offset, offset + frames)` of a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Window {
    pub offset: usize,
    pub frames: usize,
}

impl Window {
    pub const fn new(offset: usize, frames: usize) -> Self {
        Self { offset, frames }
    }

    /// `[start, end)`; empty when `end <= start`.
    pub fn from_range(start: usize, end: usize) -> Self {
        Self::new(start, end.saturating_sub(start))
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.frames)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Whether every frame of `other` lies inside `self`. An empty window is
    /// contained everywhere.
    pub fn contains(&self, other: &Window) -> bool {
        other.is_empty() || (other.offset >= self.offset && other.end() <= self.end())
    }

    pub fn contains_frame(&self, frame: usize) -> bool {
        frame >= self.offset && frame < self.end()
    }

    /// Clamp to `[0, total)`.
    pub fn clamp(&self, total: usize) -> Window {
        let (start, len) = clamp_range(self.offset, self.frames, total);
        Window::new(start, len)
    }

    /// Grow by `before` frames on the left (stopping at 0) and `after` on the
    /// right. The result is not clamped to any length.
    pub fn expand(&self, before: usize, after: usize) -> Window {
        Window::from_range(
            self.offset.saturating_sub(before),
            self.end().saturating_add(after),
        )
    }

    /// Smallest window covering both.
    pub fn hull(&self, other: &Window) -> Window {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Window::from_range(self.offset.min(other.offset), self.end().max(other.end()))
    }

    /// Overlap of both, empty (at the later start) when they are disjoint.
    pub fn intersect(&self, other: &Window) -> Window {
        let start = self.offset.max(other.offset);
        let end = self.end().min(other.end());
        Window::from_range(start, end.max(start))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}
