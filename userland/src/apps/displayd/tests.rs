//! End-to-end tests: server and clients share one `SimKernel`. Client
//! sleeps and yields run one server tick through the idle hook, so every
//! request/reply exchange completes synchronously.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use viper_abi::draw::Color32;
use viper_abi::event::{EVENT_MSG_SIZE, Event, MouseEventKind};
use viper_abi::pixel::PixelFormat;
use viper_abi::protocol::{
    DISPLAY_ASSIGN, MenuDef, MenuItem, Reply, Request, status,
};
use viper_abi::window::{KeyModifiers, MouseButtons, SurfaceFlags, Title};
use viper_abi::wire::MAX_HANDLES;

use super::DisplayServer;
use super::input::Interaction;
use super::ipc::cascade_position;
use super::surface::Geometry;
use crate::libgui::{Display, GuiError, Window};
use crate::syscall::{Handle, KeyEvent, Kernel, SimKernel, SyscallError};
use crate::theme::{
    COLOR_DESKTOP, COLOR_SCROLL_THUMB, MENU_BAR_HEIGHT, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, MIN_WINDOW_Y,
    SCROLL_THROTTLE_DELTA,
};

struct Harness {
    kernel: SimKernel,
    server: Rc<RefCell<DisplayServer<SimKernel>>>,
}

impl Harness {
    fn boot() -> Self {
        let kernel = SimKernel::default();
        let server = Rc::new(RefCell::new(DisplayServer::boot(kernel.clone()).unwrap()));
        let weak = Rc::downgrade(&server);
        kernel.set_idle_hook(move || {
            if let Some(server) = weak.upgrade() {
                if let Ok(mut server) = server.try_borrow_mut() {
                    server.tick();
                }
            }
        });
        Self { kernel, server }
    }

    fn connect(&self) -> Display<SimKernel> {
        Display::connect(self.kernel.clone()).unwrap()
    }

    fn tick(&self) {
        self.server.borrow_mut().tick();
    }

    fn mouse(&self, x: i32, y: i32, buttons: MouseButtons) {
        self.kernel.set_mouse(x, y, buttons);
        self.tick();
    }

    fn click(&self, x: i32, y: i32) {
        self.mouse(x, y, MouseButtons::empty());
        self.mouse(x, y, MouseButtons::LEFT);
        self.mouse(x, y, MouseButtons::empty());
    }

    fn geometry(&self, id: u32) -> Geometry {
        self.server.borrow().registry().get(id).unwrap().geometry()
    }

    fn z_order(&self, id: u32) -> u32 {
        self.server.borrow().registry().get(id).unwrap().z_order
    }

    fn focused(&self) -> u32 {
        self.server.borrow().registry().focused_id()
    }

    fn composites(&self) -> u64 {
        self.server.borrow().stats().composites
    }

    fn interaction(&self) -> Interaction {
        self.server.borrow().input().interaction
    }

    fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.kernel.framebuffer_pixel(x as u32, y as u32)
    }
}

fn drain(display: &mut Display<SimKernel>, win: &mut Window) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = display.poll_event(win).unwrap() {
        events.push(event);
    }
    events
}

fn scroll_positions(events: &[Event]) -> Vec<i32> {
    events
        .iter()
        .filter_map(|e| match *e {
            Event::Scroll { position, .. } => Some(position),
            _ => None,
        })
        .collect()
}

fn count_mouse(events: &[Event], wanted: MouseEventKind) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Mouse { kind, .. } if *kind == wanted))
        .count()
}

/// CREATE_SURFACE without the library's automatic subscription.
fn raw_create(display: &mut Display<SimKernel>, width: u32, height: u32) -> (u32, Handle) {
    let request = Request::CreateSurface {
        width,
        height,
        flags: SurfaceFlags::empty(),
        title: Title::new("raw"),
    };
    let (reply, handle) = display.send_request_recv_reply(&request, &[]).unwrap();
    let Reply::CreateSurface {
        status: code,
        surface_id,
        ..
    } = reply
    else {
        panic!("unexpected reply {:?}", reply);
    };
    assert_eq!(code, status::OK);
    (surface_id, handle.unwrap())
}

fn raw_status(display: &mut Display<SimKernel>, request: Request, extra: &[Handle]) -> i32 {
    display.send_request_recv_reply(&request, extra).unwrap().0.status()
}

fn read_channel(kernel: &SimKernel, recv: Handle) -> Vec<Event> {
    let mut out = Vec::new();
    let mut buf = [0u8; EVENT_MSG_SIZE];
    let mut handles = [Handle::from_raw(0); MAX_HANDLES];
    while let Ok(received) = kernel.channel_recv(recv, &mut buf, &mut handles) {
        out.push(Event::decode(&buf[..received.len]).unwrap());
    }
    out
}

#[test]
fn test_create_present_destroy() {
    let h = Harness::boot();
    let baseline_handles = h.kernel.open_handles();
    let mut display = h.connect();

    let mut win = display.create_window("Hello", 200, 100).unwrap();
    assert_eq!((win.width(), win.height()), (200, 100));
    assert!(win.stride() >= 800);
    assert!(win.has_event_channel());
    assert_eq!(win.title(), "Hello");

    win.clear(Color32(0xFF11_2233));
    display.present(&win).unwrap();

    let id = win.id();
    let g = h.geometry(id);
    assert_eq!((g.x, g.y), cascade_position(id));
    assert_eq!(h.pixel(g.x + 5, g.y + 5), Some(0xFF11_2233));
    assert_eq!(h.pixel(g.x + 199, g.y + 99), Some(0xFF11_2233));
    assert_ne!(h.pixel(g.x + 200, g.y + 50), Some(0xFF11_2233));

    assert!(drain(&mut display, &mut win).is_empty());

    display.destroy_window(win).unwrap();
    assert!(h.server.borrow().registry().get(id).is_none());
    assert_eq!(h.pixel(g.x + 5, g.y + 5), Some(COLOR_DESKTOP.to_u32()));

    display.shutdown();
    assert_eq!(h.kernel.live_shm_objects(), 0);
    assert_eq!(h.kernel.active_mappings(), 0);
    assert_eq!(h.kernel.open_handles(), baseline_handles);
}

#[test]
fn test_click_moves_focus_and_raises() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut a = display.create_window("A", 100, 80).unwrap();
    let mut b = display.create_window("B", 100, 80).unwrap();
    display.set_geometry(&a, 60, 100).unwrap();
    display.set_geometry(&b, 300, 100).unwrap();
    assert_eq!(h.focused(), b.id());
    assert_eq!((h.z_order(a.id()), h.z_order(b.id())), (1, 2));
    assert_eq!(
        drain(&mut display, &mut a),
        [Event::Focus {
            surface_id: a.id(),
            gained: false
        }]
    );
    assert!(drain(&mut display, &mut b).is_empty());

    h.click(100, 140);

    assert_eq!(h.focused(), a.id());
    assert_eq!(h.z_order(a.id()), 3);
    assert_eq!(
        drain(&mut display, &mut b),
        [Event::Focus {
            surface_id: b.id(),
            gained: false
        }]
    );
    let events = drain(&mut display, &mut a);
    assert_eq!(
        events[0],
        Event::Focus {
            surface_id: a.id(),
            gained: true
        }
    );
    assert!(matches!(
        events[1],
        Event::Mouse {
            x: 40,
            y: 40,
            kind: MouseEventKind::ButtonDown,
            button: 0,
            ..
        }
    ));
    assert!(matches!(
        events[2],
        Event::Mouse {
            kind: MouseEventKind::ButtonUp,
            ..
        }
    ));
    let order = h.server.borrow().registry().z_sorted();
    assert_eq!(order.last(), Some(&a.id()));
}

#[test]
fn test_title_bar_drag() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Drag", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 130).unwrap();

    h.mouse(250, 105, MouseButtons::empty());
    h.mouse(250, 105, MouseButtons::LEFT);
    assert!(matches!(h.interaction(), Interaction::Dragging { surface_id, .. } if surface_id == id));

    let before = h.composites();
    h.mouse(400, 150, MouseButtons::LEFT);
    let g = h.geometry(id);
    assert_eq!((g.x, g.y), (100 + 150, 130 + 45));
    assert!(h.composites() > before);

    let before = h.composites();
    h.mouse(420, 160, MouseButtons::LEFT);
    assert_eq!((h.geometry(id).x, h.geometry(id).y), (270, 185));
    assert!(h.composites() > before);

    h.mouse(420, 160, MouseButtons::empty());
    assert_eq!(h.interaction(), Interaction::Idle);
    assert_eq!(
        drain(&mut display, &mut win),
        [Event::Mouse {
            surface_id: id,
            x: 150,
            y: -25,
            dx: 0,
            dy: 0,
            buttons: MouseButtons::empty(),
            kind: MouseEventKind::ButtonUp,
            button: 0
        }]
    );
}

#[test]
fn test_drag_never_goes_under_menu_bar() {
    let h = Harness::boot();
    let mut display = h.connect();
    let win = display.create_window("Drag", 300, 200).unwrap();
    display.set_geometry(&win, 100, 130).unwrap();

    h.mouse(250, 110, MouseButtons::empty());
    h.mouse(250, 110, MouseButtons::LEFT);
    h.mouse(250, 0, MouseButtons::LEFT);
    assert_eq!(h.geometry(win.id()).y, MIN_WINDOW_Y);
    h.mouse(250, 0, MouseButtons::empty());
}

#[test]
fn test_scrollbar_drag_throttles() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Scroll", 300, 200).unwrap();
    display.set_geometry(&win, 100, 80).unwrap();
    display.set_scrollbar(&win, true, true, 1000, 200, 0).unwrap();

    let x = 100 + 300 - 16 + 8;
    h.mouse(x, 100, MouseButtons::empty());
    h.mouse(x, 100, MouseButtons::LEFT);
    for y in 101..=161 {
        h.mouse(x, y, MouseButtons::LEFT);
    }
    h.mouse(x, 161, MouseButtons::empty());
    assert_eq!(h.interaction(), Interaction::Idle);

    let events = drain(&mut display, &mut win);
    let positions = scroll_positions(&events);
    let mut expected: Vec<i32> = (0..=30).map(|i| i * 10).collect();
    expected.push(305);
    assert_eq!(positions, expected);

    // Every in-drag emission crossed the throttle; the release re-emits.
    for pair in positions[..positions.len() - 1].windows(2) {
        assert!(pair[1] - pair[0] >= SCROLL_THROTTLE_DELTA);
    }
    assert!(positions.iter().all(|p| (0..=800).contains(p)));
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonDown), 0);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 1);
    let pos = h.server.borrow().registry().get(win.id()).unwrap().vscroll.scroll_pos;
    assert_eq!(pos, 305);
}

#[test]
fn test_scroll_release_without_motion_sends_nothing_extra() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Scroll", 300, 200).unwrap();
    display.set_geometry(&win, 100, 80).unwrap();
    display.set_scrollbar(&win, true, true, 1000, 200, 0).unwrap();

    let x = 100 + 300 - 16 + 8;
    h.mouse(x, 180, MouseButtons::empty());
    h.mouse(x, 180, MouseButtons::LEFT);
    h.mouse(x, 180, MouseButtons::empty());
    // Click lands the thumb centre on the cursor: (180 - 80 - 20) * 800 / 160.
    assert_eq!(scroll_positions(&drain(&mut display, &mut win)), [400]);
}

#[test]
fn test_huge_scroll_content_drag_and_click() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Scroll", 300, 200).unwrap();
    display.set_geometry(&win, 100, 80).unwrap();
    display
        .set_scrollbar(&win, true, true, 100_000_000, 200, 50_000_000)
        .unwrap();
    h.tick();
    // 20px thumb half way down a 180px travel.
    assert_eq!(h.pixel(392, 180), Some(COLOR_SCROLL_THUMB.to_u32()));

    let x = 100 + 300 - 16 + 8;
    h.mouse(x, 100, MouseButtons::empty());
    h.mouse(x, 100, MouseButtons::LEFT);
    h.mouse(x, 279, MouseButtons::LEFT);
    h.mouse(x, 279, MouseButtons::empty());
    assert_eq!(h.interaction(), Interaction::Idle);

    let events = drain(&mut display, &mut win);
    // 10 * 99_999_800 / 180, then the bottom of the range.
    assert_eq!(scroll_positions(&events), [5_555_544, 99_999_800]);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 1);
    let pos = h.server.borrow().registry().get(win.id()).unwrap().vscroll.scroll_pos;
    assert_eq!(pos, 99_999_800);
    assert_eq!(h.pixel(392, 270), Some(COLOR_SCROLL_THUMB.to_u32()));
}

#[test]
fn test_release_after_gesture_sends_one_button_up() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Gesture", 300, 200).unwrap();
    display.set_geometry(&win, 100, 130).unwrap();

    // Title bar drag.
    h.mouse(250, 110, MouseButtons::empty());
    h.mouse(250, 110, MouseButtons::LEFT);
    h.mouse(260, 120, MouseButtons::LEFT);
    h.mouse(260, 120, MouseButtons::empty());
    let events = drain(&mut display, &mut win);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 1);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonDown), 0);

    // Bottom-right resize.
    let g = h.geometry(win.id());
    let (ex, ey) = (g.x + g.width as i32 - 1, g.y + g.height as i32 - 1);
    h.mouse(ex, ey, MouseButtons::empty());
    h.mouse(ex, ey, MouseButtons::LEFT);
    assert!(matches!(h.interaction(), Interaction::Resizing { .. }));
    h.mouse(ex + 20, ey + 10, MouseButtons::LEFT);
    h.mouse(ex + 20, ey + 10, MouseButtons::empty());
    assert_eq!(h.interaction(), Interaction::Idle);
    let events = drain(&mut display, &mut win);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 1);
    assert!(events.iter().any(|e| matches!(e, Event::Resize { .. })));
}

#[test]
fn test_menu_open_hover_select() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Menus", 200, 100).unwrap();
    let file = MenuDef::new("File")
        .with_item(MenuItem::new("New", "", 1))
        .with_item(MenuItem::separator())
        .with_item(MenuItem::new("Quit", "", 2));
    display.set_menu(&win, &[file]).unwrap();

    h.mouse(20, 10, MouseButtons::empty());
    let before = h.composites();
    h.mouse(20, 10, MouseButtons::LEFT);
    assert_eq!(h.server.borrow().input().open_menu(), Some((0, None)));
    assert!(h.composites() > before);
    h.mouse(20, 10, MouseButtons::empty());
    assert_eq!(h.server.borrow().input().open_menu(), Some((0, None)));

    let before = h.composites();
    h.mouse(20, MENU_BAR_HEIGHT + 10, MouseButtons::empty());
    assert_eq!(h.server.borrow().input().open_menu(), Some((0, Some(0))));
    assert!(h.composites() > before);

    h.mouse(20, MENU_BAR_HEIGHT + 10, MouseButtons::LEFT);
    assert_eq!(h.server.borrow().input().open_menu(), None);
    h.mouse(20, MENU_BAR_HEIGHT + 10, MouseButtons::empty());

    let events = drain(&mut display, &mut win);
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 2);
    let menus: Vec<Event> = events
        .into_iter()
        .filter(|e| matches!(e, Event::Menu { .. }))
        .collect();
    assert_eq!(
        menus,
        [Event::Menu {
            surface_id: win.id(),
            menu_index: 0,
            item_index: 0,
            action: 1
        }]
    );
}

#[test]
fn test_menu_separator_and_outside_click_close_silently() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Menus", 200, 100).unwrap();
    let file = MenuDef::new("File")
        .with_item(MenuItem::new("New", "", 1))
        .with_item(MenuItem::separator())
        .with_item(MenuItem::new("Quit", "", 2).with_enabled(false));
    display.set_menu(&win, &[file]).unwrap();

    // Separator row.
    h.click(20, 10);
    h.click(20, MENU_BAR_HEIGHT + 2 + 18 + 5);
    assert_eq!(h.server.borrow().input().open_menu(), None);
    // Disabled row.
    h.click(20, 10);
    h.click(20, MENU_BAR_HEIGHT + 2 + 36 + 5);
    // Clicking the open title again closes it.
    h.click(20, 10);
    h.click(20, 10);
    assert_eq!(h.server.borrow().input().open_menu(), None);

    let events = drain(&mut display, &mut win);
    assert!(!events.iter().any(|e| matches!(e, Event::Menu { .. })));
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 8);
}

#[test]
fn test_queued_events_flush_on_subscribe() {
    let h = Harness::boot();
    let mut display = h.connect();
    let (id, shm) = raw_create(&mut display, 120, 80);

    let generated = [
        Event::Focus {
            surface_id: id,
            gained: true,
        },
        Event::Mouse {
            surface_id: id,
            x: 10,
            y: 20,
            dx: 0,
            dy: 0,
            buttons: MouseButtons::LEFT,
            kind: MouseEventKind::ButtonDown,
            button: 0,
        },
        Event::Key {
            surface_id: id,
            keycode: 0x1E,
            modifiers: KeyModifiers::empty(),
            pressed: true,
        },
    ];
    for event in generated {
        h.server.borrow_mut().post_event(event);
    }
    assert_eq!(h.server.borrow().registry().get(id).unwrap().queue.len(), 3);

    let (send, recv) = h.kernel.channel_create().unwrap();
    let code = raw_status(&mut display, Request::SubscribeEvents { surface_id: id }, &[send]);
    assert_eq!(code, status::OK);
    assert!(h.server.borrow().registry().get(id).unwrap().queue.is_empty());

    let later = Event::Close { surface_id: id };
    h.server.borrow_mut().post_event(later);

    let received = read_channel(&h.kernel, recv);
    assert_eq!(received[..3], generated);
    assert_eq!(received[3], later);
    assert_eq!(received.len(), 4);

    let _ = h.kernel.channel_close(recv);
    let _ = h.kernel.shm_close(shm);
}

#[test]
fn test_legacy_poll_pops_in_order() {
    let h = Harness::boot();
    let mut display = h.connect();
    let (id, shm) = raw_create(&mut display, 64, 64);
    for gained in [true, false] {
        h.server.borrow_mut().post_event(Event::Focus {
            surface_id: id,
            gained,
        });
    }

    let mut polled = Vec::new();
    for _ in 0..3 {
        let (reply, handle) = display
            .send_request_recv_reply(&Request::PollEvent { surface_id: id }, &[])
            .unwrap();
        assert!(handle.is_none());
        let Reply::PollEvent { event } = reply else {
            panic!("unexpected reply {:?}", reply);
        };
        polled.push(event);
    }
    assert_eq!(
        polled,
        [
            Some(Event::Focus {
                surface_id: id,
                gained: true
            }),
            Some(Event::Focus {
                surface_id: id,
                gained: false
            }),
            None
        ]
    );
    let _ = h.kernel.shm_close(shm);
}

#[test]
fn test_queue_overflow_keeps_newest() {
    let h = Harness::boot();
    let mut display = h.connect();
    let (id, shm) = raw_create(&mut display, 64, 64);
    for keycode in 0..40u16 {
        h.server.borrow_mut().post_event(Event::Key {
            surface_id: id,
            keycode,
            modifiers: KeyModifiers::empty(),
            pressed: true,
        });
    }
    let first = h.server.borrow_mut().pop_queued(id).unwrap().event;
    assert!(matches!(first, Event::Key { keycode: 8, .. }));
    let _ = h.kernel.shm_close(shm);
}

#[test]
fn test_dead_client_is_reaped() {
    let h = Harness::boot();
    let mut display = h.connect();
    let (id, shm) = raw_create(&mut display, 64, 64);
    let (send, recv) = h.kernel.channel_create().unwrap();
    assert_eq!(
        raw_status(&mut display, Request::SubscribeEvents { surface_id: id }, &[send]),
        status::OK
    );
    h.kernel.channel_close(recv).unwrap();

    h.server.borrow_mut().post_event(Event::Close { surface_id: id });
    assert!(h.server.borrow().registry().get(id).is_none());
    assert_eq!(h.focused(), 0);

    h.kernel.shm_close(shm).unwrap();
    assert_eq!(h.kernel.live_shm_objects(), 0);
}

#[test]
fn test_keys_go_to_focused_window() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut a = display.create_window("A", 64, 64).unwrap();
    let mut b = display.create_window("B", 64, 64).unwrap();
    drain(&mut display, &mut a);

    h.kernel.push_key(KeyEvent {
        keycode: 0x1E,
        modifiers: KeyModifiers::SHIFT,
        pressed: true,
    });
    h.kernel.push_key(KeyEvent {
        keycode: 0x1E,
        modifiers: KeyModifiers::SHIFT,
        pressed: false,
    });
    h.tick();

    assert!(drain(&mut display, &mut a).is_empty());
    let events = drain(&mut display, &mut b);
    assert_eq!(
        events,
        [
            Event::Key {
                surface_id: b.id(),
                keycode: 0x1E,
                modifiers: KeyModifiers::SHIFT,
                pressed: true
            },
            Event::Key {
                surface_id: b.id(),
                keycode: 0x1E,
                modifiers: KeyModifiers::SHIFT,
                pressed: false
            }
        ]
    );
}

#[test]
fn test_request_focus_keeps_newest_on_top() {
    let h = Harness::boot();
    let mut display = h.connect();
    let wins: Vec<Window> = (0..3)
        .map(|i| display.create_window("w", 50 + i * 10, 40).unwrap())
        .collect();

    for &pick in &[0usize, 2, 1, 1, 0, 2, 0] {
        display.request_focus(&wins[pick]).unwrap();
        let top = wins.iter().map(|w| h.z_order(w.id())).max().unwrap();
        assert_eq!(h.z_order(wins[pick].id()), top);
        assert_eq!(h.focused(), wins[pick].id());

        let list = display.list_windows().unwrap();
        let focused: Vec<u32> = list
            .as_slice()
            .iter()
            .filter(|info| info.focused)
            .map(|info| info.surface_id)
            .collect();
        assert_eq!(focused, [wins[pick].id()]);
    }
}

#[test]
fn test_topmost_window_wins_overlap() {
    let h = Harness::boot();
    let mut display = h.connect();
    let red = Color32(0xFFCC_0000);
    let green = Color32(0xFF00_CC00);
    let mut a = display.create_window("A", 200, 150).unwrap();
    let mut b = display.create_window("B", 200, 150).unwrap();
    display.set_geometry(&a, 100, 100).unwrap();
    display.set_geometry(&b, 150, 150).unwrap();
    a.clear(red);
    b.clear(green);
    display.present(&a).unwrap();
    display.present(&b).unwrap();

    let check = |h: &Harness| {
        for (x, y) in [(200, 200), (160, 160), (290, 240), (120, 120), (340, 290)] {
            let hit = h.server.borrow().registry().find_at(x, y);
            let expected = match hit {
                Some(id) if id == a.id() => red.to_u32(),
                Some(id) if id == b.id() => green.to_u32(),
                other => panic!("no window at ({}, {}): {:?}", x, y, other),
            };
            assert_eq!(h.pixel(x, y), Some(expected), "at ({}, {})", x, y);
        }
    };
    check(&h);
    assert_eq!(h.server.borrow().registry().find_at(200, 200), Some(b.id()));

    display.request_focus(&a).unwrap();
    check(&h);
    assert_eq!(h.server.borrow().registry().find_at(200, 200), Some(a.id()));
}

#[test]
fn test_stride_maps_to_screen() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Grid", 37, 23).unwrap();
    let stride = win.stride_pixels();
    assert!(stride >= 37);
    for py in 0..23usize {
        for px in 0..37usize {
            win.pixels_mut()[py * stride + px] = 0xFF00_0000 | ((py as u32) << 8) | px as u32;
        }
    }
    display.present(&win).unwrap();

    let g = h.geometry(win.id());
    for (px, py) in [(0, 0), (36, 0), (0, 22), (36, 22), (17, 11)] {
        assert_eq!(
            h.pixel(g.x + px, g.y + py),
            Some(0xFF00_0000 | ((py as u32) << 8) | px as u32)
        );
    }
}

#[test]
fn test_same_title_is_a_no_op() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Same", 64, 64).unwrap();
    h.tick();

    let before = h.composites();
    display.set_title(&mut win, "Same").unwrap();
    assert_eq!(h.composites(), before);
    assert!(drain(&mut display, &mut win).is_empty());

    display.set_title(&mut win, "Other").unwrap();
    assert_eq!(win.title(), "Other");
    assert!(h.composites() > before);
    let list = display.list_windows().unwrap();
    assert_eq!(list.as_slice()[0].title_str(), "Other");
}

#[test]
fn test_set_geometry_clamps_decorated_only() {
    let h = Harness::boot();
    let mut display = h.connect();
    let framed = display.create_window("Framed", 64, 64).unwrap();
    let bare = display
        .create_window_with_flags("Bare", 64, 64, SurfaceFlags::NO_DECORATIONS)
        .unwrap();

    for y in [-50, 0, 20, MIN_WINDOW_Y - 1] {
        display.set_geometry(&framed, 10, y).unwrap();
        assert_eq!(h.geometry(framed.id()).y, MIN_WINDOW_Y);
    }
    display.set_geometry(&framed, 10, 200).unwrap();
    assert_eq!(h.geometry(framed.id()).y, 200);

    display.set_geometry(&bare, 5, 0).unwrap();
    assert_eq!((h.geometry(bare.id()).x, h.geometry(bare.id()).y), (5, 0));
}

#[test]
fn test_resize_drag_reallocates_with_minimum() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Resize", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 100).unwrap();

    h.mouse(399, 299, MouseButtons::empty());
    h.mouse(399, 299, MouseButtons::LEFT);
    assert!(matches!(h.interaction(), Interaction::Resizing { .. }));
    h.mouse(150, 150, MouseButtons::LEFT);
    h.mouse(150, 150, MouseButtons::empty());

    let g = h.geometry(id);
    assert!(g.width >= MIN_WINDOW_WIDTH && g.height >= MIN_WINDOW_HEIGHT);
    assert_eq!((g.width, g.height), (MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT));

    let events = drain(&mut display, &mut win);
    let resize = events.iter().find(|e| matches!(e, Event::Resize { .. }));
    assert_eq!(
        resize,
        Some(&Event::Resize {
            surface_id: id,
            width: 100,
            height: 60,
            stride: 400
        })
    );
    assert_eq!((win.width(), win.height(), win.stride()), (100, 60, 400));

    // The remapped buffer is the one the server composites.
    win.clear(Color32(0xFF44_5566));
    display.present(&win).unwrap();
    assert_eq!(h.pixel(g.x + 99, g.y + 59), Some(0xFF44_5566));

    display.destroy_window(win).unwrap();
    assert_eq!(h.kernel.live_shm_objects(), 0);
}

#[test]
fn test_resize_release_without_motion_keeps_buffer() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Resize", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 100).unwrap();
    drain(&mut display, &mut win);
    let handles = h.kernel.open_handles();
    let shm = h.kernel.live_shm_objects();

    h.mouse(399, 299, MouseButtons::empty());
    h.mouse(399, 299, MouseButtons::LEFT);
    assert!(matches!(h.interaction(), Interaction::Resizing { .. }));
    h.mouse(399, 299, MouseButtons::empty());
    assert_eq!(h.interaction(), Interaction::Idle);

    let g = h.geometry(id);
    assert_eq!((g.x, g.y, g.width, g.height), (100, 100, 300, 200));
    let events = drain(&mut display, &mut win);
    assert!(!events.iter().any(|e| matches!(e, Event::Resize { .. })));
    assert_eq!(count_mouse(&events, MouseEventKind::ButtonUp), 1);
    assert_eq!(h.kernel.open_handles(), handles);
    assert_eq!(h.kernel.live_shm_objects(), shm);
}

#[test]
fn test_resize_left_edge_moves_origin() {
    let h = Harness::boot();
    let mut display = h.connect();
    let win = display.create_window("Resize", 300, 200).unwrap();
    display.set_geometry(&win, 100, 100).unwrap();

    h.mouse(99, 200, MouseButtons::empty());
    h.mouse(99, 200, MouseButtons::LEFT);
    h.mouse(139, 200, MouseButtons::LEFT);
    h.mouse(139, 200, MouseButtons::empty());

    let g = h.geometry(win.id());
    assert_eq!((g.x, g.width, g.height), (140, 260, 200));
}

#[test]
fn test_maximize_and_restore() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Max", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 100).unwrap();

    // Maximize button: frame right edge 401, close at 382, maximize at 362.
    h.click(368, 86);
    let g = h.geometry(id);
    assert_eq!((g.x, g.y, g.width, g.height), (2, MIN_WINDOW_Y, 636, 432));
    assert!(h.server.borrow().registry().get(id).unwrap().maximized);
    let events = drain(&mut display, &mut win);
    assert!(events.contains(&Event::Resize {
        surface_id: id,
        width: 636,
        height: 432,
        stride: 636 * 4
    }));
    assert_eq!(win.width(), 636);

    // A maximized window neither drags nor resizes.
    h.mouse(300, 30, MouseButtons::empty());
    h.mouse(300, 30, MouseButtons::LEFT);
    assert_eq!(h.interaction(), Interaction::Idle);
    h.mouse(300, 30, MouseButtons::empty());

    // Same button on the maximized frame.
    h.click(606, 32);
    let g = h.geometry(id);
    assert_eq!((g.x, g.y, g.width, g.height), (100, 100, 300, 200));
    drain(&mut display, &mut win);
    assert_eq!((win.width(), win.height()), (300, 200));
}

#[test]
fn test_maximize_without_memory_keeps_window() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Max", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 100).unwrap();

    h.kernel.set_shm_limit(Some(1));
    h.click(368, 86);
    assert!(!h.server.borrow().registry().get(id).unwrap().maximized);
    let g = h.geometry(id);
    assert_eq!((g.x, g.y, g.width, g.height), (100, 100, 300, 200));
    let events = drain(&mut display, &mut win);
    assert!(!events.iter().any(|e| matches!(e, Event::Resize { .. })));
    // Still draggable, so the window was left unmaximized.
    h.mouse(250, 86, MouseButtons::empty());
    h.mouse(250, 86, MouseButtons::LEFT);
    assert!(matches!(h.interaction(), Interaction::Dragging { .. }));
    h.mouse(250, 86, MouseButtons::empty());

    h.kernel.set_shm_limit(None);
    h.click(368, 86);
    assert!(h.server.borrow().registry().get(id).unwrap().maximized);
    let g = h.geometry(id);
    assert_eq!((g.x, g.y, g.width, g.height), (2, MIN_WINDOW_Y, 636, 432));
    drain(&mut display, &mut win);
    assert_eq!((win.width(), win.height()), (636, 432));
}

#[test]
fn test_close_button_sends_close() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Close", 300, 200).unwrap();
    display.set_geometry(&win, 100, 100).unwrap();

    h.click(388, 86);
    let events = drain(&mut display, &mut win);
    assert!(events.contains(&Event::Close { surface_id: win.id() }));
    // Closing is the client's decision.
    assert!(h.server.borrow().registry().get(win.id()).is_some());
}

#[test]
fn test_minimize_then_restore() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Min", 300, 200).unwrap();
    let id = win.id();
    display.set_geometry(&win, 100, 100).unwrap();
    win.clear(Color32(0xFF12_3456));
    display.present(&win).unwrap();

    h.click(348, 86);
    assert_eq!(h.focused(), 0);
    assert_eq!(h.pixel(150, 150), Some(COLOR_DESKTOP.to_u32()));
    assert_eq!(h.server.borrow().registry().find_at(150, 150), None);

    let list = display.list_windows().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list.as_slice()[0].minimized);
    assert!(!list.as_slice()[0].focused);

    display.restore_window(id).unwrap();
    assert_eq!(h.focused(), id);
    assert_eq!(h.pixel(150, 150), Some(0xFF12_3456));
    let events = drain(&mut display, &mut win);
    assert!(events.contains(&Event::Focus {
        surface_id: id,
        gained: false
    }));
    assert_eq!(
        events.last(),
        Some(&Event::Focus {
            surface_id: id,
            gained: true
        })
    );
}

#[test]
fn test_system_surface_stays_behind() {
    let h = Harness::boot();
    let mut display = h.connect();
    let desktop = display
        .create_window_with_flags("Desktop", 640, 460, SurfaceFlags::SYSTEM)
        .unwrap();
    let app = display.create_window("App", 100, 80).unwrap();

    let g = h.geometry(desktop.id());
    assert_eq!((g.x, g.y), (0, MENU_BAR_HEIGHT));
    assert_eq!(h.z_order(desktop.id()), 0);
    assert_eq!(h.focused(), app.id());

    let ids: Vec<u32> = display
        .list_windows()
        .unwrap()
        .as_slice()
        .iter()
        .map(|w| w.surface_id)
        .collect();
    assert_eq!(ids, [app.id()]);

    assert_eq!(
        display.request_focus(&desktop).err(),
        Some(GuiError::Status(status::INVALID_ARGUMENT))
    );

    // The desktop's menus fill the bar while the app declares none.
    display
        .set_menu(&desktop, &[MenuDef::new("Viper").with_item(MenuItem::new("About", "", 9))])
        .unwrap();
    h.click(20, 10);
    assert_eq!(h.server.borrow().input().open_menu(), Some((0, None)));
    h.click(20, 10);

    // Clicking the desktop never takes focus from the app.
    h.click(600, 400);
    assert_eq!(h.focused(), app.id());
    assert_eq!(h.z_order(desktop.id()), 0);
}

#[test]
fn test_display_info() {
    let h = Harness::boot();
    let mut display = h.connect();
    let info = display.get_display_info().unwrap();
    assert_eq!((info.width, info.height), (640, 480));
    assert_eq!(info.format, Some(PixelFormat::Xrgb8888));
}

#[test]
fn test_error_statuses() {
    let h = Harness::boot();
    let mut display = h.connect();

    let bad = Request::CreateSurface {
        width: 0,
        height: 10,
        flags: SurfaceFlags::empty(),
        title: Title::new("bad"),
    };
    assert_eq!(raw_status(&mut display, bad, &[]), status::INVALID_ARGUMENT);
    assert_eq!(
        raw_status(&mut display, Request::DestroySurface { surface_id: 99 }, &[]),
        status::NO_SURFACE
    );
    assert_eq!(
        raw_status(&mut display, Request::SetVisible { surface_id: 99, visible: false }, &[]),
        status::NO_SURFACE
    );

    h.kernel.set_shm_limit(Some(4096));
    assert_eq!(
        display.create_window("big", 300, 200).err(),
        Some(GuiError::Status(status::SHM_FAILED))
    );
    h.kernel.set_shm_limit(None);
    assert_eq!(h.server.borrow().registry().len(), 0);
}

#[test]
fn test_malformed_request_closes_reply_channel() {
    let h = Harness::boot();
    let service = h.kernel.assign_get(DISPLAY_ASSIGN).unwrap();
    let (reply_send, reply_recv) = h.kernel.channel_create().unwrap();
    h.kernel
        .channel_send(service, &[0xEE, 0xEE, 0x00, 0x00, 1, 0], &[reply_send])
        .unwrap();
    h.tick();

    let mut buf = [0u8; 64];
    let mut handles = [Handle::from_raw(0); MAX_HANDLES];
    assert_eq!(
        h.kernel.channel_recv(reply_recv, &mut buf, &mut handles).err(),
        Some(SyscallError::PEER_CLOSED)
    );
    assert_eq!(h.server.borrow().stats().messages, 1);
}

#[test]
fn test_async_present_needs_no_reply() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Async", 50, 50).unwrap();
    win.clear(Color32(0xFF77_8899));
    display.present_async(&win).unwrap();
    h.tick();
    let g = h.geometry(win.id());
    assert_eq!(h.pixel(g.x + 10, g.y + 10), Some(0xFF77_8899));

    win.fill_rect(0, 0, 10, 10, Color32(0xFF00_0001));
    display.present_region(&win, 0, 0, 10, 10).unwrap();
    assert_eq!(h.pixel(g.x + 5, g.y + 5), Some(0xFF00_0001));
}

#[test]
fn test_hidden_surface_is_not_drawn() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Hide", 50, 50).unwrap();
    win.clear(Color32(0xFF01_0203));
    display.present(&win).unwrap();
    let g = h.geometry(win.id());

    display.set_visible(&win, false).unwrap();
    assert_eq!(h.pixel(g.x + 10, g.y + 10), Some(COLOR_DESKTOP.to_u32()));
    display.set_visible(&win, true).unwrap();
    assert_eq!(h.pixel(g.x + 10, g.y + 10), Some(0xFF01_0203));
}

#[test]
fn test_content_mouse_events_are_local() {
    let h = Harness::boot();
    let mut display = h.connect();
    let mut win = display.create_window("Mouse", 100, 100).unwrap();
    display.set_geometry(&win, 200, 200).unwrap();

    h.mouse(210, 220, MouseButtons::empty());
    h.mouse(215, 221, MouseButtons::empty());
    h.mouse(215, 221, MouseButtons::RIGHT);
    h.mouse(215, 221, MouseButtons::empty());

    let events = drain(&mut display, &mut win);
    assert!(events.contains(&Event::Mouse {
        surface_id: win.id(),
        x: 15,
        y: 21,
        dx: 5,
        dy: 1,
        buttons: MouseButtons::empty(),
        kind: MouseEventKind::Move,
        button: 0,
    }));
    assert!(events.contains(&Event::Mouse {
        surface_id: win.id(),
        x: 15,
        y: 21,
        dx: 0,
        dy: 0,
        buttons: MouseButtons::RIGHT,
        kind: MouseEventKind::ButtonDown,
        button: 1,
    }));
    assert!(matches!(
        events.last(),
        Some(Event::Mouse {
            kind: MouseEventKind::ButtonUp,
            button: 1,
            ..
        })
    ));
}

#[test]
fn test_heartbeat_and_loop_counters() {
    let h = Harness::boot();
    for _ in 0..3 {
        h.tick();
    }
    let stats = h.server.borrow().stats();
    assert_eq!(stats.loops, 3);
    assert!(stats.composites >= 1);
    assert_eq!(h.server.borrow().screen_size(), (640, 480));
}
