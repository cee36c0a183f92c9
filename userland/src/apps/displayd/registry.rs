//! Fixed-capacity surface table, z-order and focus.

use alloc::vec::Vec;

use super::surface::Surface;

pub const MAX_SURFACES: usize = 64;

/// Focus moved from `lost` to `gained`; either side may be empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusChange {
    pub lost: Option<u32>,
    pub gained: Option<u32>,
}

impl FocusChange {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lost.is_none() && self.gained.is_none()
    }
}

pub struct SurfaceRegistry {
    slots: Vec<Option<Surface>>,
    next_id: u32,
    next_z: u32,
    focused: u32,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_SURFACES).map(|_| None).collect(),
            next_id: 1,
            next_z: 1,
            focused: 0,
        }
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Ids are never reused within one server lifetime.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Place `surface` in the first free slot and assign its z-order.
    /// Hands the surface back when the table is full.
    pub fn insert(&mut self, mut surface: Surface) -> Result<u32, Surface> {
        let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) else {
            return Err(surface);
        };
        surface.z_order = if surface.is_system() {
            0
        } else {
            let z = self.next_z;
            self.next_z += 1;
            z
        };
        let id = surface.id;
        *slot = Some(surface);
        Ok(id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Surface> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|s| s.id == id))?;
        if self.focused == id {
            self.focused = 0;
        }
        slot.take()
    }

    pub fn get(&self, id: u32) -> Option<&Surface> {
        self.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Surface> {
        self.iter_mut().find(|s| s.id == id)
    }

    /// Live surfaces in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Surface> + '_ {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Surface> + '_ {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<u32> {
        self.iter().map(|s| s.id).collect()
    }

    /// Topmost shown surface whose frame contains the point. Equal z-orders
    /// resolve to the lowest slot.
    pub fn find_at(&self, x: i32, y: i32) -> Option<u32> {
        let mut best: Option<&Surface> = None;
        for surf in self.iter().filter(|s| s.is_shown()) {
            if !surf.frame_rect().contains(x, y) {
                continue;
            }
            if best.is_none_or(|b| surf.z_order > b.z_order) {
                best = Some(surf);
            }
        }
        best.map(|s| s.id)
    }

    /// Ids of shown surfaces, back to front.
    pub fn z_sorted(&self) -> Vec<u32> {
        let mut shown: Vec<(u32, u32)> = self
            .iter()
            .filter(|s| s.is_shown())
            .map(|s| (s.z_order, s.id))
            .collect();
        shown.sort_by_key(|&(z, _)| z);
        shown.into_iter().map(|(_, id)| id).collect()
    }

    /// SYSTEM surfaces stay at z-order 0.
    pub fn bring_to_front(&mut self, id: u32) {
        let z = self.next_z;
        if let Some(surf) = self.get_mut(id) {
            if !surf.is_system() {
                surf.z_order = z;
                self.next_z += 1;
            }
        }
    }

    /// Focused surface id, 0 when nothing has focus.
    #[inline]
    pub fn focused_id(&self) -> u32 {
        self.focused
    }

    pub fn focused(&self) -> Option<&Surface> {
        if self.focused == 0 {
            return None;
        }
        self.get(self.focused)
    }

    /// Give focus to `id`. SYSTEM and unknown surfaces are refused.
    pub fn set_focus(&mut self, id: u32) -> FocusChange {
        if id == self.focused {
            return FocusChange::default();
        }
        match self.get(id) {
            Some(surf) if !surf.is_system() => {}
            _ => return FocusChange::default(),
        }
        let lost = (self.focused != 0).then_some(self.focused);
        self.focused = id;
        FocusChange {
            lost,
            gained: Some(id),
        }
    }

    pub fn clear_focus(&mut self) -> FocusChange {
        let lost = (self.focused != 0).then_some(self.focused);
        self.focused = 0;
        FocusChange { lost, gained: None }
    }

    /// Focus the highest non-minimized, non-SYSTEM surface, or nothing.
    pub fn refocus_topmost(&mut self) -> FocusChange {
        let next = self
            .iter()
            .filter(|s| !s.minimized && !s.is_system())
            .max_by_key(|s| s.z_order)
            .map(|s| s.id);
        match next {
            Some(id) if id == self.focused => FocusChange::default(),
            Some(id) => {
                let lost = (self.focused != 0).then_some(self.focused);
                self.focused = id;
                FocusChange {
                    lost,
                    gained: Some(id),
                }
            }
            None => self.clear_focus(),
        }
    }

    /// Surface whose menus fill the menu bar: the focused surface if it
    /// declares menus, else the first SYSTEM surface that does.
    pub fn menu_owner(&self) -> Option<u32> {
        if let Some(surf) = self.focused() {
            if !surf.menus.is_empty() {
                return Some(surf.id);
            }
        }
        self.iter()
            .find(|s| s.is_system() && !s.menus.is_empty())
            .map(|s| s.id)
    }
}
