use viper_abi::damage::{DamageRect, MAX_DAMAGE_REGIONS};

/// Accumulates changed rectangles between two composites.
///
/// Holds at most `N` regions; when full, the pair whose union has the
/// smallest area is merged to make room. Structural changes (a window moved,
/// a menu opened) mark the whole screen dirty instead.
#[derive(Clone, Debug)]
pub struct DamageTracker<const N: usize = MAX_DAMAGE_REGIONS> {
    regions: [DamageRect; N],
    count: u8,
    full_damage: bool,
}

impl<const N: usize> Default for DamageTracker<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DamageTracker<N> {
    pub const fn new() -> Self {
        Self {
            regions: [DamageRect::invalid(); N],
            count: 0,
            full_damage: false,
        }
    }

    pub fn add(&mut self, rect: DamageRect) {
        if !rect.is_valid() || self.full_damage {
            return;
        }
        if let Some(existing) = self.regions[..self.count as usize]
            .iter_mut()
            .find(|r| r.intersects(&rect))
        {
            *existing = existing.union(&rect);
            return;
        }
        if (self.count as usize) >= N {
            self.merge_smallest_pair();
        }
        if (self.count as usize) < N {
            self.regions[self.count as usize] = rect;
            self.count += 1;
        } else {
            self.full_damage = true;
        }
    }

    fn merge_smallest_pair(&mut self) {
        if self.count < 2 {
            return;
        }
        let count = self.count as usize;
        let mut best = (0, 1);
        let mut best_area = i32::MAX;
        for i in 0..count {
            for j in (i + 1)..count {
                let combined = self.regions[i].combined_area(&self.regions[j]);
                if combined < best_area {
                    best_area = combined;
                    best = (i, j);
                }
            }
        }
        let (i, j) = best;
        self.regions[i] = self.regions[i].union(&self.regions[j]);
        self.regions[j] = self.regions[count - 1];
        self.count -= 1;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.count = 0;
        self.full_damage = false;
    }

    #[inline]
    pub fn regions(&self) -> &[DamageRect] {
        &self.regions[..self.count as usize]
    }

    pub fn bounding_box(&self) -> DamageRect {
        self.regions()
            .iter()
            .fold(DamageRect::invalid(), |acc, r| acc.union(r))
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.count > 0 || self.full_damage
    }

    #[inline]
    pub fn is_full_damage(&self) -> bool {
        self.full_damage
    }

    #[inline]
    pub fn set_full_damage(&mut self) {
        self.full_damage = true;
    }
}
