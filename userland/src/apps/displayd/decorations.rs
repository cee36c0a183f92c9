//! Window frames, title-bar buttons and scrollbars: drawing and hit-testing.

use viper_abi::draw::{Canvas, Color32};
use viper_abi::window::ResizeEdge;
use viper_gfx::{canvas_font, canvas_ops};

use super::surface::{ScrollbarState, Surface};
use crate::theme::{
    BORDER_WIDTH, BUTTON_SPACING, CLOSE_BUTTON_SIZE, COLOR_BLACK, COLOR_BORDER, COLOR_BTN_CLOSE,
    COLOR_BTN_MAXIMIZE, COLOR_BTN_MINIMIZE, COLOR_SCROLL_SHADOW, COLOR_SCROLL_THUMB,
    COLOR_SCROLL_TRACK, COLOR_TITLE_FOCUSED, COLOR_TITLE_UNFOCUSED, COLOR_WHITE, RESIZE_BORDER,
    SCROLLBAR_MIN_THUMB, SCROLLBAR_WIDTH, TITLE_BAR_HEIGHT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TitleButton {
    Close,
    Maximize,
    Minimize,
}

/// Left edges of the three title-bar buttons, laid out right to left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonLayout {
    pub close_x: i32,
    pub maximize_x: i32,
    pub minimize_x: i32,
    pub y: i32,
}

pub fn button_layout(surf: &Surface) -> ButtonLayout {
    let frame = surf.frame_rect();
    let step = CLOSE_BUTTON_SIZE + BUTTON_SPACING;
    let close_x = frame.x1 + 1 - step;
    ButtonLayout {
        close_x,
        maximize_x: close_x - step,
        minimize_x: close_x - 2 * step,
        y: frame.y0 + BORDER_WIDTH + 4,
    }
}

/// Title-bar strip of a decorated surface, border included.
pub fn in_title_bar(surf: &Surface, x: i32, y: i32) -> bool {
    if !surf.is_decorated() {
        return false;
    }
    let frame = surf.frame_rect();
    x >= frame.x0 && x <= frame.x1 && y >= frame.y0 && y < surf.y - BORDER_WIDTH
}

pub fn title_button_at(surf: &Surface, x: i32, y: i32) -> Option<TitleButton> {
    if !in_title_bar(surf, x, y) {
        return None;
    }
    let layout = button_layout(surf);
    let hit = |bx: i32| x >= bx && x < bx + CLOSE_BUTTON_SIZE;
    if hit(layout.close_x) {
        Some(TitleButton::Close)
    } else if hit(layout.maximize_x) {
        Some(TitleButton::Maximize)
    } else if hit(layout.minimize_x) {
        Some(TitleButton::Minimize)
    } else {
        None
    }
}

/// Edges grabbed by a press at `(x, y)`. The top edge and the title bar
/// never resize; maximized and undecorated surfaces never resize.
pub fn resize_edge_at(surf: &Surface, x: i32, y: i32) -> ResizeEdge {
    let mut edge = ResizeEdge::empty();
    if !surf.is_decorated() || surf.maximized {
        return edge;
    }
    let frame = surf.frame_rect();
    if !frame.contains(x, y) || y < surf.y - BORDER_WIDTH {
        return edge;
    }
    if x < frame.x0 + RESIZE_BORDER {
        edge |= ResizeEdge::LEFT;
    }
    if x > frame.x1 - RESIZE_BORDER {
        edge |= ResizeEdge::RIGHT;
    }
    if y > frame.y1 - RESIZE_BORDER {
        edge |= ResizeEdge::BOTTOM;
    }
    edge
}

pub fn draw_decorations<T: Canvas>(target: &mut T, surf: &Surface, focused: bool) {
    if !surf.is_decorated() {
        return;
    }
    let frame = surf.frame_rect();
    let (wx, wy, ww, wh) = (frame.x0, frame.y0, frame.width(), frame.height());

    canvas_ops::fill_rect(target, wx, wy, ww, wh, COLOR_BORDER);
    canvas_ops::rect(target, wx, wy, ww, wh, COLOR_BLACK);

    let title_color = if focused {
        COLOR_TITLE_FOCUSED
    } else {
        COLOR_TITLE_UNFOCUSED
    };
    canvas_ops::fill_rect(
        target,
        wx + BORDER_WIDTH,
        wy + BORDER_WIDTH,
        ww - 2 * BORDER_WIDTH,
        TITLE_BAR_HEIGHT,
        title_color,
    );
    canvas_font::draw_text(target, wx + 10, wy + 10, surf.title.as_str(), COLOR_WHITE);

    let layout = button_layout(surf);
    let max_glyph = if surf.maximized { b'R' } else { b'M' };
    for (bx, color, glyph) in [
        (layout.close_x, COLOR_BTN_CLOSE, b'X'),
        (layout.maximize_x, COLOR_BTN_MAXIMIZE, max_glyph),
        (layout.minimize_x, COLOR_BTN_MINIMIZE, b'_'),
    ] {
        draw_button(target, bx, layout.y, color, glyph);
    }
}

fn draw_button<T: Canvas>(target: &mut T, x: i32, y: i32, color: Color32, glyph: u8) {
    let size = CLOSE_BUTTON_SIZE;
    canvas_ops::fill_rect(target, x, y, size, size, color);
    canvas_ops::bevel(target, x, y, size, size, COLOR_WHITE, COLOR_SCROLL_SHADOW);
    canvas_font::draw_glyph(target, x + 4, y + 4, glyph, COLOR_WHITE);
}

/// Screen-space layout of one scrollbar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollGeometry {
    pub track_x: i32,
    pub track_y: i32,
    /// Along the scroll axis.
    pub track_len: i32,
    pub thumb_len: i32,
    /// Screen coordinate of the thumb's leading edge.
    pub thumb_start: i32,
}

impl ScrollGeometry {
    /// Pixels the thumb can travel.
    #[inline]
    pub fn travel(&self) -> i32 {
        self.track_len - self.thumb_len
    }
}

/// `a * b / c` computed in 64 bits and saturated to `i32`. Zero when `c` is 0.
pub fn mul_div(a: i32, b: i32, c: i32) -> i32 {
    if c == 0 {
        return 0;
    }
    let q = i64::from(a) * i64::from(b) / i64::from(c);
    q.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn thumb_layout(state: &ScrollbarState, track_len: i32) -> (i32, i32) {
    let thumb = mul_div(state.viewport_size, track_len, state.content_size)
        .max(SCROLLBAR_MIN_THUMB)
        .min(track_len);
    let range = state.max_scroll();
    let offset = if range > 0 {
        mul_div(state.scroll_pos.clamp(0, range), track_len - thumb, range)
    } else {
        0
    };
    (thumb, offset)
}

pub fn vscroll_geometry(surf: &Surface) -> Option<ScrollGeometry> {
    if !surf.vscroll.is_active() {
        return None;
    }
    let track_len = surf.height as i32;
    let (thumb_len, offset) = thumb_layout(&surf.vscroll, track_len);
    Some(ScrollGeometry {
        track_x: surf.x + surf.width as i32 - SCROLLBAR_WIDTH,
        track_y: surf.y,
        track_len,
        thumb_len,
        thumb_start: surf.y + offset,
    })
}

pub fn hscroll_geometry(surf: &Surface) -> Option<ScrollGeometry> {
    if !surf.hscroll.is_active() {
        return None;
    }
    let mut track_len = surf.width as i32;
    if surf.vscroll.is_active() {
        track_len -= SCROLLBAR_WIDTH;
    }
    let (thumb_len, offset) = thumb_layout(&surf.hscroll, track_len);
    Some(ScrollGeometry {
        track_x: surf.x,
        track_y: surf.y + surf.height as i32 - SCROLLBAR_WIDTH,
        track_len,
        thumb_len,
        thumb_start: surf.x + offset,
    })
}

/// Scroll position selected by a press on the vertical scrollbar, centring
/// the thumb on the cursor.
pub fn vscroll_click(surf: &Surface, x: i32, y: i32) -> Option<i32> {
    let geom = vscroll_geometry(surf)?;
    let on_track = x >= geom.track_x
        && x < geom.track_x + SCROLLBAR_WIDTH
        && y >= geom.track_y
        && y < geom.track_y + geom.track_len;
    if !on_track {
        return None;
    }
    let travel = geom.travel();
    if travel <= 0 {
        return Some(0);
    }
    let rel = (y - geom.track_y - geom.thumb_len / 2).clamp(0, travel);
    Some(mul_div(rel, surf.vscroll.max_scroll(), travel))
}

pub fn draw_scrollbars<T: Canvas>(target: &mut T, surf: &Surface) {
    if let Some(g) = vscroll_geometry(surf) {
        let (x, y) = (g.track_x, g.track_y);
        canvas_ops::fill_rect(target, x, y, SCROLLBAR_WIDTH, g.track_len, COLOR_SCROLL_TRACK);
        draw_thumb(target, x + 2, g.thumb_start + 2, SCROLLBAR_WIDTH - 4, g.thumb_len - 4);
    }
    if let Some(g) = hscroll_geometry(surf) {
        let (x, y) = (g.track_x, g.track_y);
        canvas_ops::fill_rect(target, x, y, g.track_len, SCROLLBAR_WIDTH, COLOR_SCROLL_TRACK);
        draw_thumb(target, g.thumb_start + 2, y + 2, g.thumb_len - 4, SCROLLBAR_WIDTH - 4);
    }
}

fn draw_thumb<T: Canvas>(target: &mut T, x: i32, y: i32, w: i32, h: i32) {
    canvas_ops::fill_rect(target, x, y, w, h, COLOR_SCROLL_THUMB);
    canvas_ops::bevel(target, x, y, w, h, COLOR_WHITE, COLOR_SCROLL_SHADOW);
}
