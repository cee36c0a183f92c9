//! Mouse and keyboard polling and the interaction state machine.
//!
//! Drag, resize, scrollbar drag and an open pulldown are mutually exclusive,
//! so they live in one [`Interaction`] value. Gestures end on button
//! release; an open pulldown survives releases and closes on the next press.

use viper_abi::event::{Event, MouseEventKind};
use viper_abi::window::{MouseButtons, ResizeEdge};
use viper_lib::{klog_debug, klog_trace};

use super::DisplayServer;
use super::decorations::{
    TitleButton, in_title_bar, mul_div, resize_edge_at, title_button_at, vscroll_click,
    vscroll_geometry,
};
use super::menu::{item_at, pulldown_rect};
use super::surface::Geometry;
use crate::syscall::Kernel;
use crate::theme::{
    MENU_BAR_HEIGHT, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, MIN_WINDOW_Y, SCROLL_THROTTLE_DELTA,
    TITLE_BAR_HEIGHT,
};

/// Keyboard events drained per tick.
pub const MAX_KEY_EVENTS_PER_TICK: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging {
        surface_id: u32,
        offset_x: i32,
        offset_y: i32,
    },
    Resizing {
        surface_id: u32,
        edge: ResizeEdge,
        start_x: i32,
        start_y: i32,
        start: Geometry,
    },
    ScrollDrag {
        surface_id: u32,
        start_y: i32,
        start_pos: i32,
        last_sent: i32,
    },
    MenuOpen {
        menu: usize,
        hovered: Option<usize>,
    },
}

impl Interaction {
    /// Surface a window gesture is operating on.
    pub fn surface_id(&self) -> Option<u32> {
        match *self {
            Self::Dragging { surface_id, .. }
            | Self::Resizing { surface_id, .. }
            | Self::ScrollDrag { surface_id, .. } => Some(surface_id),
            Self::Idle | Self::MenuOpen { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct InputState {
    pub interaction: Interaction,
    last_x: i32,
    last_y: i32,
    last_buttons: MouseButtons,
}

impl InputState {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            interaction: Interaction::Idle,
            last_x: x,
            last_y: y,
            last_buttons: MouseButtons::empty(),
        }
    }

    #[inline]
    pub fn cursor(&self) -> (i32, i32) {
        (self.last_x, self.last_y)
    }

    /// `(menu index, hovered row)` while a pulldown is open.
    pub fn open_menu(&self) -> Option<(usize, Option<usize>)> {
        match self.interaction {
            Interaction::MenuOpen { menu, hovered } => Some((menu, hovered)),
            _ => None,
        }
    }

    pub fn close_menu(&mut self) {
        if self.open_menu().is_some() {
            self.interaction = Interaction::Idle;
        }
    }

    /// Drop any gesture that targets a destroyed surface.
    pub fn forget_surface(&mut self, id: u32) {
        if self.interaction.surface_id() == Some(id) {
            self.interaction = Interaction::Idle;
        }
    }
}

/// Geometry after dragging `edge` by `(dx, dy)` from `start`, never smaller
/// than the minimum window size. The left edge moves `x` so the right edge
/// stays put.
pub fn resize_geometry(start: Geometry, edge: ResizeEdge, dx: i32, dy: i32) -> Geometry {
    let min_w = MIN_WINDOW_WIDTH as i32;
    let min_h = MIN_WINDOW_HEIGHT as i32;
    let mut g = start;
    if edge.contains(ResizeEdge::RIGHT) {
        g.width = (start.width as i32 + dx).max(min_w) as u32;
    }
    if edge.contains(ResizeEdge::LEFT) {
        let w = (start.width as i32 - dx).max(min_w);
        g.x = start.x + start.width as i32 - w;
        g.width = w as u32;
    }
    if edge.contains(ResizeEdge::BOTTOM) {
        g.height = (start.height as i32 + dy).max(min_h) as u32;
    }
    g
}

/// Scroll position for a thumb dragged `dy` pixels from `start_pos`.
pub fn drag_scroll_position(start_pos: i32, dy: i32, range: i32, travel: i32) -> i32 {
    if travel <= 0 || range <= 0 {
        return start_pos.clamp(0, range.max(0));
    }
    start_pos.saturating_add(mul_div(dy, range, travel)).clamp(0, range)
}

impl<K: Kernel> DisplayServer<K> {
    pub(crate) fn poll_keyboard(&mut self) {
        for _ in 0..MAX_KEY_EVENTS_PER_TICK {
            if !self.kernel.input_has_event() {
                break;
            }
            let Some(key) = self.kernel.input_get_event() else {
                break;
            };
            let focused = self.registry.focused_id();
            if focused == 0 {
                continue;
            }
            self.post_event(Event::Key {
                surface_id: focused,
                keycode: key.keycode,
                modifiers: key.modifiers,
                pressed: key.pressed,
            });
        }
    }

    pub(crate) fn poll_mouse(&mut self) {
        let state = match self.kernel.mouse_state() {
            Ok(state) => state,
            Err(err) => {
                klog_trace!("displayd: mouse_state failed: {}", err);
                return;
            }
        };
        let (w, h) = self.screen_size();
        let x = state.x.clamp(0, w as i32 - 1);
        let y = state.y.clamp(0, h as i32 - 1);

        if (x, y) != self.input.cursor() {
            self.on_motion(x, y, state.buttons);
        }
        if state.buttons != self.input.last_buttons {
            self.on_buttons(x, y, state.buttons);
        }
    }

    fn on_motion(&mut self, x: i32, y: i32, buttons: MouseButtons) {
        let (dx, dy) = (x - self.input.last_x, y - self.input.last_y);
        self.input.last_x = x;
        self.input.last_y = y;
        self.move_cursor(x, y);

        let interaction = self.input.interaction;
        match interaction {
            Interaction::MenuOpen { menu, hovered } => self.track_menu(x, y, menu, hovered),
            Interaction::Resizing {
                surface_id,
                edge,
                start_x,
                start_y,
                start,
            } => {
                let g = resize_geometry(start, edge, x - start_x, y - start_y);
                if let Some(surf) = self.registry.get_mut(surface_id) {
                    surf.x = g.x;
                    surf.y = g.y;
                    surf.width = g.width;
                    surf.height = g.height;
                }
                self.request_composite();
            }
            Interaction::Dragging {
                surface_id,
                offset_x,
                offset_y,
            } => {
                if let Some(surf) = self.registry.get_mut(surface_id) {
                    surf.x = x - offset_x;
                    surf.y = (y - offset_y + TITLE_BAR_HEIGHT).max(MIN_WINDOW_Y);
                }
                self.request_composite();
            }
            Interaction::ScrollDrag {
                surface_id,
                start_y,
                start_pos,
                last_sent,
            } => self.track_scroll(surface_id, y - start_y, start_pos, last_sent, start_y),
            Interaction::Idle => {
                let Some(surf) = self.registry.focused() else {
                    return;
                };
                let Some((lx, ly)) = surf.local_point(x, y) else {
                    return;
                };
                let surface_id = surf.id;
                self.post_event(Event::Mouse {
                    surface_id,
                    x: lx,
                    y: ly,
                    dx,
                    dy,
                    buttons,
                    kind: MouseEventKind::Move,
                    button: 0,
                });
            }
        }
    }

    fn track_menu(&mut self, x: i32, y: i32, menu: usize, hovered: Option<usize>) {
        self.refresh_menu_bar();
        let layout = *self.menu_bar.layout();
        if y < MENU_BAR_HEIGHT {
            if let Some(title) = layout.title_at(x, y) {
                if title != menu {
                    self.input.interaction = Interaction::MenuOpen {
                        menu: title,
                        hovered: None,
                    };
                    self.request_composite();
                }
            }
            return;
        }
        let Some(def) = self
            .menu_bar
            .owner()
            .and_then(|id| self.registry.get(id))
            .and_then(|s| s.menus.menus().get(menu).copied())
        else {
            return;
        };
        let row = pulldown_rect(&layout, &def, menu).and_then(|rect| item_at(&rect, &def, x, y));
        if row != hovered {
            self.input.interaction = Interaction::MenuOpen { menu, hovered: row };
            self.request_composite();
        }
    }

    fn track_scroll(&mut self, surface_id: u32, dy: i32, start_pos: i32, last_sent: i32, start_y: i32) {
        let Some(surf) = self.registry.get_mut(surface_id) else {
            self.input.interaction = Interaction::Idle;
            return;
        };
        let Some(geom) = vscroll_geometry(surf) else {
            self.input.interaction = Interaction::Idle;
            return;
        };
        let pos = drag_scroll_position(start_pos, dy, surf.vscroll.max_scroll(), geom.travel());
        surf.vscroll.scroll_pos = pos;
        if (pos - last_sent).abs() >= SCROLL_THROTTLE_DELTA {
            self.input.interaction = Interaction::ScrollDrag {
                surface_id,
                start_y,
                start_pos,
                last_sent: pos,
            };
            self.post_event(Event::Scroll {
                surface_id,
                position: pos,
                vertical: true,
            });
        }
        self.request_composite();
    }

    fn on_buttons(&mut self, x: i32, y: i32, buttons: MouseButtons) {
        let old = self.input.last_buttons;
        self.input.last_buttons = buttons;
        let pressed = buttons & !old;
        let released = old & !buttons;
        if !pressed.is_empty() {
            self.on_press(x, y, pressed, buttons);
        }
        if !released.is_empty() {
            self.on_release(x, y, released, buttons);
        }
    }

    /// Presses while a pulldown is open or on the bar. Returns false when
    /// the press should fall through to window handling.
    fn press_menu(&mut self, x: i32, y: i32) -> bool {
        self.refresh_menu_bar();
        let open = self.input.open_menu();
        if y < MENU_BAR_HEIGHT {
            match self.menu_bar.layout().title_at(x, y) {
                Some(title) => {
                    self.input.interaction = if open.map(|(m, _)| m) == Some(title) {
                        Interaction::Idle
                    } else {
                        Interaction::MenuOpen {
                            menu: title,
                            hovered: None,
                        }
                    };
                }
                None if open.is_some() => self.input.interaction = Interaction::Idle,
                None => return false,
            }
            self.request_composite();
            return true;
        }

        let Some((menu, _)) = open else {
            return false;
        };
        let owner = self.menu_bar.owner();
        let def = owner
            .and_then(|id| self.registry.get(id))
            .and_then(|s| s.menus.menus().get(menu).copied());
        if let (Some(owner), Some(def)) = (owner, def) {
            let row = pulldown_rect(self.menu_bar.layout(), &def, menu)
                .and_then(|rect| item_at(&rect, &def, x, y));
            if let Some((row, item)) = row.and_then(|r| def.items().get(r).map(|it| (r, *it))) {
                if item.is_selectable() {
                    klog_debug!("displayd: menu {}/{} action {}", menu, row, item.action);
                    self.post_event(Event::Menu {
                        surface_id: owner,
                        menu_index: menu as u8,
                        item_index: row as u8,
                        action: item.action,
                    });
                }
            }
        }
        self.input.interaction = Interaction::Idle;
        self.request_composite();
        true
    }

    fn on_press(&mut self, x: i32, y: i32, pressed: MouseButtons, buttons: MouseButtons) {
        if self.press_menu(x, y) {
            return;
        }
        let Some(hit) = self.registry.find_at(x, y) else {
            return;
        };
        if hit != self.registry.focused_id() {
            self.focus_surface(hit);
        }
        self.request_composite();

        let Some(surf) = self.registry.get(hit) else {
            return;
        };
        let edge = resize_edge_at(surf, x, y);
        if !edge.is_empty() {
            self.input.interaction = Interaction::Resizing {
                surface_id: hit,
                edge,
                start_x: x,
                start_y: y,
                start: surf.geometry(),
            };
            return;
        }

        if in_title_bar(surf, x, y) {
            match title_button_at(surf, x, y) {
                Some(TitleButton::Close) => self.post_event(Event::Close { surface_id: hit }),
                Some(TitleButton::Maximize) => self.toggle_maximize(hit),
                Some(TitleButton::Minimize) => self.minimize(hit),
                None if !surf.maximized => {
                    self.input.interaction = Interaction::Dragging {
                        surface_id: hit,
                        offset_x: x - surf.x,
                        offset_y: y - surf.y + TITLE_BAR_HEIGHT,
                    };
                }
                None => {}
            }
            return;
        }

        if let Some(pos) = vscroll_click(surf, x, y) {
            self.input.interaction = Interaction::ScrollDrag {
                surface_id: hit,
                start_y: y,
                start_pos: pos,
                last_sent: pos,
            };
            if let Some(surf) = self.registry.get_mut(hit) {
                surf.vscroll.scroll_pos = pos;
            }
            self.post_event(Event::Scroll {
                surface_id: hit,
                position: pos,
                vertical: true,
            });
            return;
        }

        if let Some((lx, ly)) = surf.local_point(x, y) {
            self.post_event(Event::Mouse {
                surface_id: hit,
                x: lx,
                y: ly,
                dx: 0,
                dy: 0,
                buttons,
                kind: MouseEventKind::ButtonDown,
                button: pressed.primary_index(),
            });
        }
    }

    fn on_release(&mut self, x: i32, y: i32, released: MouseButtons, buttons: MouseButtons) {
        let ended = self.input.interaction;
        match ended {
            Interaction::Resizing {
                surface_id,
                edge,
                start_x,
                start_y,
                start,
            } => {
                let g = resize_geometry(start, edge, x - start_x, y - start_y);
                let unchanged = (g.width, g.height) == (start.width, start.height);
                if let Some(surf) = self.registry.get_mut(surface_id) {
                    surf.x = g.x;
                    surf.y = g.y;
                    if unchanged {
                        surf.width = g.width;
                        surf.height = g.height;
                    }
                }
                if !unchanged && !self.reallocate_surface(surface_id, g.width, g.height) {
                    // Frame falls back to the size of the buffer it still has.
                    if let Some(surf) = self.registry.get_mut(surface_id) {
                        surf.x = start.x;
                        surf.y = start.y;
                        surf.width = start.width;
                        surf.height = start.height;
                    }
                }
                self.request_composite();
            }
            Interaction::ScrollDrag {
                surface_id,
                last_sent,
                ..
            } => {
                let pos = self.registry.get(surface_id).map(|s| s.vscroll.scroll_pos);
                if let Some(pos) = pos.filter(|&p| p != last_sent) {
                    self.post_event(Event::Scroll {
                        surface_id,
                        position: pos,
                        vertical: true,
                    });
                }
            }
            Interaction::Dragging { .. } | Interaction::Idle | Interaction::MenuOpen { .. } => {}
        }

        // An open pulldown stays open until the next press.
        if ended.surface_id().is_some() {
            self.input.interaction = Interaction::Idle;
        }

        let Some(surf) = self.registry.focused() else {
            return;
        };
        let (surface_id, lx, ly) = (surf.id, x - surf.x, y - surf.y);
        self.post_event(Event::Mouse {
            surface_id,
            x: lx,
            y: ly,
            dx: 0,
            dy: 0,
            buttons,
            kind: MouseEventKind::ButtonUp,
            button: released.primary_index(),
        });
    }

    fn minimize(&mut self, id: u32) {
        let Some(surf) = self.registry.get_mut(id) else {
            return;
        };
        surf.minimized = true;
        if self.registry.focused_id() == id {
            let change = self.registry.refocus_topmost();
            self.post_focus_change(change);
        }
        self.request_composite();
    }
}
