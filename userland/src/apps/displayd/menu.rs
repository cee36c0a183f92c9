//! Global menu bar and pulldowns.
//!
//! The bar always shows the menus of the current menu owner (see
//! [`SurfaceRegistry::menu_owner`](super::registry::SurfaceRegistry::menu_owner)).
//! Title positions are cached in a [`MenuLayout`] that is rebuilt whenever
//! the owner or its menus change; hit-testing and drawing both read it so
//! they always agree.

use viper_abi::damage::DamageRect;
use viper_abi::draw::Canvas;
use viper_abi::font::{FONT_WIDTH, text_width};
use viper_abi::protocol::{MAX_MENUS, MenuDef, MenuSet};
use viper_gfx::{canvas_font, canvas_ops};

use crate::theme::{
    COLOR_MENU_BG, COLOR_MENU_DARK, COLOR_MENU_DISABLED, COLOR_MENU_HIGHLIGHT,
    COLOR_MENU_HIGHLIGHT_TEXT, COLOR_MENU_LIGHT, COLOR_MENU_TEXT, MENU_BAR_HEIGHT,
    MENU_ITEM_HEIGHT, MENU_PADDING,
};

/// Vertical inset of the first pulldown row.
const PULLDOWN_INSET: i32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MenuLayout {
    positions: [i32; MAX_MENUS],
    widths: [i32; MAX_MENUS],
    count: usize,
}

impl MenuLayout {
    pub fn compute(menus: &MenuSet) -> Self {
        let mut layout = Self::default();
        let mut x = MENU_PADDING;
        for (i, menu) in menus.menus().iter().enumerate() {
            let width = text_width(menu.title.as_str()) + 2 * MENU_PADDING;
            layout.positions[i] = x;
            layout.widths[i] = width;
            x += width;
        }
        layout.count = menus.len();
        layout
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn position(&self, index: usize) -> Option<i32> {
        (index < self.count).then(|| self.positions[index])
    }

    /// Menu title under the cursor, if the cursor is on the bar.
    pub fn title_at(&self, x: i32, y: i32) -> Option<usize> {
        if !(0..MENU_BAR_HEIGHT).contains(&y) {
            return None;
        }
        (0..self.count).find(|&i| x >= self.positions[i] && x < self.positions[i] + self.widths[i])
    }
}

/// Menu owner plus the layout derived from its menus.
#[derive(Debug, Default)]
pub struct MenuBar {
    owner: Option<u32>,
    layout: MenuLayout,
}

impl MenuBar {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn owner(&self) -> Option<u32> {
        self.owner
    }

    #[inline]
    pub fn layout(&self) -> &MenuLayout {
        &self.layout
    }

    pub fn refresh(&mut self, owner: Option<u32>, menus: Option<&MenuSet>) {
        self.owner = owner;
        self.layout = menus.map(MenuLayout::compute).unwrap_or_default();
    }
}

/// Screen rectangle of the pulldown for menu `index`.
pub fn pulldown_rect(layout: &MenuLayout, menu: &MenuDef, index: usize) -> Option<DamageRect> {
    let x = layout.position(index)?;
    let widest = menu
        .items()
        .iter()
        .map(|item| (item.label.len() + item.shortcut.len() + 4) as i32 * FONT_WIDTH)
        .max()
        .unwrap_or(0);
    let width = widest + 2 * MENU_PADDING;
    let height = menu.items().len() as i32 * MENU_ITEM_HEIGHT + 2 * PULLDOWN_INSET;
    Some(DamageRect::from_xywh(
        x,
        MENU_BAR_HEIGHT,
        width as u32,
        height as u32,
    ))
}

/// Row of `menu` under the cursor. Separators and disabled rows are
/// reported too; callers decide whether they are selectable.
pub fn item_at(rect: &DamageRect, menu: &MenuDef, x: i32, y: i32) -> Option<usize> {
    if !rect.contains(x, y) {
        return None;
    }
    let offset = y - rect.y0 - PULLDOWN_INSET;
    if offset < 0 {
        return None;
    }
    let idx = (offset / MENU_ITEM_HEIGHT) as usize;
    (idx < menu.items().len()).then_some(idx)
}

pub fn draw_menu_bar<T: Canvas>(
    target: &mut T,
    menus: Option<&MenuSet>,
    layout: &MenuLayout,
    open: Option<usize>,
    right_text: &str,
) {
    let bar_w = target.width() as i32;
    canvas_ops::fill_rect(target, 0, 0, bar_w, MENU_BAR_HEIGHT, COLOR_MENU_BG);
    canvas_ops::hline(target, 0, bar_w - 1, 0, COLOR_MENU_LIGHT);
    canvas_ops::hline(target, 0, bar_w - 1, MENU_BAR_HEIGHT - 1, COLOR_MENU_DARK);

    let text_y = (MENU_BAR_HEIGHT - 8) / 2;
    if let Some(menus) = menus {
        for (i, menu) in menus.menus().iter().enumerate().take(layout.len()) {
            let x = layout.positions[i];
            let mut color = COLOR_MENU_TEXT;
            if open == Some(i) {
                let w = layout.widths[i];
                canvas_ops::fill_rect(target, x, 1, w, MENU_BAR_HEIGHT - 2, COLOR_MENU_HIGHLIGHT);
                color = COLOR_MENU_HIGHLIGHT_TEXT;
            }
            canvas_font::draw_text(target, x + MENU_PADDING, text_y, menu.title.as_str(), color);
        }
    }

    let right_x = bar_w - text_width(right_text) - MENU_PADDING;
    canvas_font::draw_text(target, right_x, text_y, right_text, COLOR_MENU_DISABLED);
}

pub fn draw_pulldown<T: Canvas>(
    target: &mut T,
    rect: &DamageRect,
    menu: &MenuDef,
    hovered: Option<usize>,
) {
    let (x, w) = (rect.x0, rect.width());
    canvas_ops::fill_rect(target, x, rect.y0, w, rect.height(), COLOR_MENU_BG);
    canvas_ops::bevel(target, x, rect.y0, w, rect.height(), COLOR_MENU_LIGHT, COLOR_MENU_DARK);

    for (i, item) in menu.items().iter().enumerate() {
        let item_y = rect.y0 + PULLDOWN_INSET + i as i32 * MENU_ITEM_HEIGHT;
        if item.is_separator() {
            let rule_y = item_y + MENU_ITEM_HEIGHT / 2;
            canvas_ops::hline(target, x + 4, x + w - 4, rule_y, COLOR_MENU_DARK);
            continue;
        }
        let mut color = if item.enabled {
            COLOR_MENU_TEXT
        } else {
            COLOR_MENU_DISABLED
        };
        if hovered == Some(i) && item.is_selectable() {
            canvas_ops::fill_rect(target, x + 2, item_y, w - 4, MENU_ITEM_HEIGHT, COLOR_MENU_HIGHLIGHT);
            color = COLOR_MENU_HIGHLIGHT_TEXT;
        }
        let text_y = item_y + (MENU_ITEM_HEIGHT - 8) / 2;
        if item.checked {
            canvas_font::draw_text(target, x + 4, text_y, "*", color);
        }
        canvas_font::draw_text(target, x + 16, text_y, item.label.as_str(), color);
        let shortcut = item.shortcut.as_str();
        if !shortcut.is_empty() {
            let sx = x + w - text_width(shortcut) - MENU_PADDING;
            canvas_font::draw_text(target, sx, text_y, shortcut, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viper_abi::protocol::MenuItem;
    use viper_gfx::DrawBuffer;

    fn menus() -> MenuSet {
        MenuSet::from_slice(&[
            MenuDef::new("File")
                .with_item(MenuItem::new("New", "^N", 1))
                .with_item(MenuItem::separator())
                .with_item(MenuItem::new("Quit", "^Q", 2)),
            MenuDef::new("Edit").with_item(MenuItem::new("Copy", "", 3)),
        ])
    }

    #[test]
    fn test_title_layout() {
        let layout = MenuLayout::compute(&menus());
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.position(0), Some(8));
        assert_eq!(layout.position(1), Some(8 + 4 * 8 + 16));
        assert_eq!(layout.position(2), None);
        assert_eq!(layout.title_at(10, 5), Some(0));
        assert_eq!(layout.title_at(60, 5), Some(1));
        assert_eq!(layout.title_at(10, 25), None);
        assert_eq!(layout.title_at(400, 5), None);
    }

    #[test]
    fn test_pulldown_geometry_and_rows() {
        let set = menus();
        let layout = MenuLayout::compute(&set);
        let file = &set.menus()[0];
        let rect = pulldown_rect(&layout, file, 0).unwrap();
        assert_eq!((rect.x0, rect.y0), (8, 20));
        assert_eq!(rect.width(), (4 + 2 + 4) * 8 + 16);
        assert_eq!(rect.height(), 3 * 18 + 4);

        assert_eq!(item_at(&rect, file, 20, 22), Some(0));
        assert_eq!(item_at(&rect, file, 20, 40), Some(1));
        assert_eq!(item_at(&rect, file, 20, 58), Some(2));
        assert_eq!(item_at(&rect, file, 20, 21), None);
        assert_eq!(item_at(&rect, file, 200, 30), None);
    }

    #[test]
    fn test_open_title_highlighted() {
        let set = menus();
        let layout = MenuLayout::compute(&set);
        let mut px = vec![0u32; 320 * 100];
        let mut fb = DrawBuffer::new(&mut px, 320, 100, 320).unwrap();
        draw_menu_bar(&mut fb, Some(&set), &layout, Some(1), "ViperDOS");
        let edit_x = layout.position(1).unwrap();
        assert_eq!(fb.get_pixel(edit_x + 1, 2), Some(COLOR_MENU_HIGHLIGHT));
        assert_eq!(fb.get_pixel(9, 2), Some(COLOR_MENU_BG));
    }

    #[test]
    fn test_hovered_separator_not_highlighted() {
        let set = menus();
        let layout = MenuLayout::compute(&set);
        let file = &set.menus()[0];
        let rect = pulldown_rect(&layout, file, 0).unwrap();
        let mut px = vec![0u32; 320 * 100];
        let mut fb = DrawBuffer::new(&mut px, 320, 100, 320).unwrap();
        draw_pulldown(&mut fb, &rect, file, Some(1));
        assert_eq!(fb.get_pixel(rect.x0 + 3, 20 + 2 + 18 + 1), Some(COLOR_MENU_BG));
        draw_pulldown(&mut fb, &rect, file, Some(0));
        assert_eq!(fb.get_pixel(rect.x0 + 3, 20 + 2 + 1), Some(COLOR_MENU_HIGHLIGHT));
    }
}
