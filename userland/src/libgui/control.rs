//! Window management requests.

use viper_abi::pixel::PixelFormat;
use viper_abi::protocol::{MenuDef, MenuSet, Reply, Request, WindowList};
use viper_abi::window::Title;

use super::{Display, GuiError, GuiResult, Window, check_status};
use crate::syscall::Kernel;

/// Framebuffer description from `GET_INFO`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    pub format: Option<PixelFormat>,
}

impl<K: Kernel> Display<K> {
    pub fn get_display_info(&mut self) -> GuiResult<DisplayInfo> {
        match self.send_request_recv_reply(&Request::GetInfo, &[])? {
            (
                Reply::Info {
                    status,
                    width,
                    height,
                    format,
                },
                None,
            ) => {
                check_status(status)?;
                Ok(DisplayInfo {
                    width,
                    height,
                    format: PixelFormat::from_fourcc(format),
                })
            }
            (_, handle) => {
                if let Some(h) = handle {
                    self.close_all(&[h]);
                }
                Err(GuiError::Protocol)
            }
        }
    }

    /// Update the title bar; the window keeps a local copy.
    pub fn set_title(&mut self, window: &mut Window, title: &str) -> GuiResult<()> {
        let title = Title::new(title);
        self.request_generic(
            &Request::SetTitle {
                surface_id: window.id(),
                title,
            },
            &[],
        )?;
        window.set_local_title(title);
        Ok(())
    }

    /// Move the content origin. Decorated windows are kept below the menu bar.
    pub fn set_geometry(&mut self, window: &Window, x: i32, y: i32) -> GuiResult<()> {
        self.request_generic(
            &Request::SetGeometry {
                surface_id: window.id(),
                x,
                y,
            },
            &[],
        )
    }

    pub fn set_visible(&mut self, window: &Window, visible: bool) -> GuiResult<()> {
        self.request_generic(
            &Request::SetVisible {
                surface_id: window.id(),
                visible,
            },
            &[],
        )
    }

    pub fn set_scrollbar(
        &mut self,
        window: &Window,
        vertical: bool,
        enabled: bool,
        content_size: i32,
        viewport_size: i32,
        position: i32,
    ) -> GuiResult<()> {
        self.request_generic(
            &Request::SetScrollbar {
                surface_id: window.id(),
                vertical,
                enabled,
                content_size,
                viewport_size,
                position,
            },
            &[],
        )
    }

    /// Replace the window's menus. Menus past the eighth are ignored; an
    /// empty slice removes the menu bar entries.
    pub fn set_menu(&mut self, window: &Window, menus: &[MenuDef]) -> GuiResult<()> {
        self.request_generic(
            &Request::SetMenu {
                surface_id: window.id(),
                menus: MenuSet::from_slice(menus),
            },
            &[],
        )
    }

    pub fn list_windows(&mut self) -> GuiResult<WindowList> {
        match self.send_request_recv_reply(&Request::ListWindows, &[])? {
            (Reply::ListWindows { status, windows }, None) => {
                check_status(status)?;
                Ok(windows)
            }
            (_, handle) => {
                if let Some(h) = handle {
                    self.close_all(&[h]);
                }
                Err(GuiError::Protocol)
            }
        }
    }

    /// Un-minimize, raise and focus any window by id.
    pub fn restore_window(&mut self, surface_id: u32) -> GuiResult<()> {
        self.request_generic(&Request::RestoreWindow { surface_id }, &[])
    }

    pub fn request_focus(&mut self, window: &Window) -> GuiResult<()> {
        self.request_generic(
            &Request::RequestFocus {
                surface_id: window.id(),
            },
            &[],
        )
    }
}
