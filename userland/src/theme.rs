use viper_abi::draw::Color32;

// Screen
pub const SCREEN_BORDER_WIDTH: i32 = 20;
pub const MENU_BAR_HEIGHT: i32 = 20;

// Window frame
pub const TITLE_BAR_HEIGHT: i32 = 24;
pub const BORDER_WIDTH: i32 = 2;
pub const CLOSE_BUTTON_SIZE: i32 = 16;
pub const BUTTON_SPACING: i32 = 4;
pub const RESIZE_BORDER: i32 = 6;
pub const MIN_WINDOW_WIDTH: u32 = 100;
pub const MIN_WINDOW_HEIGHT: u32 = 60;
/// Lowest content y that keeps a decorated title bar clear of the menu bar.
pub const MIN_WINDOW_Y: i32 = MENU_BAR_HEIGHT + TITLE_BAR_HEIGHT + BORDER_WIDTH;

// Cascade placement of new windows
pub const CASCADE_STEPS: u32 = 10;
pub const CASCADE_ORIGIN: i32 = 40;
pub const CASCADE_STEP_X: i32 = 30;
pub const CASCADE_STEP_Y: i32 = 25;

// Scrollbars
pub const SCROLLBAR_WIDTH: i32 = 16;
pub const SCROLLBAR_MIN_THUMB: i32 = 20;
pub const SCROLL_THROTTLE_DELTA: i32 = 8;

// Menus
pub const MENU_ITEM_HEIGHT: i32 = 18;
pub const MENU_PADDING: i32 = 8;
pub const DEFAULT_MENU_TEXT: &str = "ViperDOS";

// Cursor
pub const CURSOR_SIZE: usize = 24;

// Colors - Workbench palette
pub const COLOR_SCREEN_BORDER: Color32 = Color32::rgb(0x00, 0x33, 0x66);
pub const COLOR_DESKTOP: Color32 = Color32::rgb(0x00, 0x55, 0xAA);
pub const COLOR_WHITE: Color32 = Color32::rgb(0xFF, 0xFF, 0xFF);
pub const COLOR_BLACK: Color32 = Color32::rgb(0x00, 0x00, 0x00);

pub const COLOR_BORDER: Color32 = Color32::rgb(0x33, 0x44, 0x55);
pub const COLOR_TITLE_FOCUSED: Color32 = Color32::rgb(0xFF, 0x88, 0x00);
pub const COLOR_TITLE_UNFOCUSED: Color32 = Color32::rgb(0x88, 0x99, 0xAA);
pub const COLOR_BTN_CLOSE: Color32 = Color32::rgb(0xCC, 0x33, 0x33);
pub const COLOR_BTN_MAXIMIZE: Color32 = Color32::rgb(0x33, 0x99, 0x33);
pub const COLOR_BTN_MINIMIZE: Color32 = Color32::rgb(0xCC, 0xAA, 0x22);

pub const COLOR_SCROLL_TRACK: Color32 = Color32::rgb(0xCC, 0xCC, 0xCC);
pub const COLOR_SCROLL_THUMB: Color32 = Color32::rgb(0x88, 0x88, 0x88);
pub const COLOR_SCROLL_SHADOW: Color32 = Color32::rgb(0x66, 0x66, 0x66);

pub const COLOR_MENU_BG: Color32 = Color32::rgb(0x88, 0x99, 0xAA);
pub const COLOR_MENU_TEXT: Color32 = Color32::rgb(0x00, 0x00, 0x00);
pub const COLOR_MENU_HIGHLIGHT: Color32 = Color32::rgb(0x00, 0x55, 0xAA);
pub const COLOR_MENU_HIGHLIGHT_TEXT: Color32 = Color32::rgb(0xFF, 0xFF, 0xFF);
pub const COLOR_MENU_DISABLED: Color32 = Color32::rgb(0x55, 0x66, 0x77);
pub const COLOR_MENU_LIGHT: Color32 = Color32::rgb(0xCC, 0xDD, 0xEE);
pub const COLOR_MENU_DARK: Color32 = Color32::rgb(0x33, 0x44, 0x55);

pub const COLOR_CURSOR_FILL: Color32 = Color32::rgb(0xFF, 0x88, 0x00);
pub const COLOR_CURSOR_OUTLINE: Color32 = Color32::rgb(0x00, 0x00, 0x00);
