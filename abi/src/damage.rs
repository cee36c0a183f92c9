/// Upper bound on distinct screen regions tracked between composites.
pub const MAX_DAMAGE_REGIONS: usize = 8;

/// Rectangle with inclusive corners, used for damage and hit boxes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32, // inclusive
    pub y1: i32, // inclusive
}

impl DamageRect {
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: -1,
            y1: -1,
        }
    }

    /// Origin plus size; a zero dimension yields an invalid rect.
    #[inline]
    pub const fn from_xywh(x: i32, y: i32, w: u32, h: u32) -> Self {
        if w == 0 || h == 0 {
            return Self::invalid();
        }
        Self {
            x0: x,
            y0: y,
            x1: x.saturating_add(w as i32 - 1),
            y1: y.saturating_add(h as i32 - 1),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    #[inline]
    pub fn width(&self) -> i32 {
        if self.is_valid() { self.x1 - self.x0 + 1 } else { 0 }
    }

    #[inline]
    pub fn height(&self) -> i32 {
        if self.is_valid() { self.y1 - self.y0 + 1 } else { 0 }
    }

    #[inline]
    pub fn area(&self) -> i32 {
        self.width() * self.height()
    }

    /// Bounding box of both rects.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    #[inline]
    pub fn combined_area(&self, other: &Self) -> i32 {
        self.union(other).area()
    }

    #[inline]
    pub fn clip(&self, width: i32, height: i32) -> Self {
        Self {
            x0: self.x0.max(0),
            y0: self.y0.max(0),
            x1: self.x1.min(width - 1),
            y1: self.y1.min(height - 1),
        }
    }

    /// Move by a screen offset (surface-local to screen coordinates).
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x0 <= other.x1 && self.x1 >= other.x0 && self.y0 <= other.y1 && self.y1 >= other.y0
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}
