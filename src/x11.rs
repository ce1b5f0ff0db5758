//! X11 implementation of the canvas and of the monitor queries.
//!
//! The window is override-redirect so the window manager leaves it alone.
//! A 32-bit TrueColor visual is used when the server offers one, which makes
//! the alpha channel of the configured colors effective under a compositor.

use crate::config::Color;
use crate::geometry::Rect;
use crate::monitor::{MonitorRect, MonitorSource};
use crate::surface::Canvas;
use log::debug;
use std::rc::Rc;
use thiserror::Error;
use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeGCAux, Colormap, ColormapAlloc, ConfigureWindowAux, ConnectionExt as _,
    CreateGCAux, CreateWindowAux, Gcontext, InputFocus, PropMode, Rectangle, Screen, StackMode,
    VisualClass, Visualtype, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

const WINDOW_NAME: &[u8] = b"xob";
const WINDOW_CLASS: &[u8] = b"xob\0xob\0";

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cannot open display: {0}")]
    Connect(#[from] ConnectError),
    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),
    #[error("X11 resource allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),
    #[error("screen {0} does not exist")]
    NoScreen(usize),
}

atom_manager! {
    Atoms: AtomsCookie {
        UTF8_STRING,
        _NET_WM_NAME,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_NOTIFICATION,
    }
}

/// Connection to the X server, shared by the monitor queries and the window.
pub struct X11Display {
    conn: Rc<RustConnection>,
    screen_num: usize,
}

impl X11Display {
    /// Connects to `$DISPLAY`.
    pub fn connect() -> Result<Self, DisplayError> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        if conn.setup().roots.get(screen_num).is_none() {
            return Err(DisplayError::NoScreen(screen_num));
        }
        Ok(Self {
            conn: Rc::new(conn),
            screen_num,
        })
    }

    fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    /// Creates the (unmapped) bar window.
    pub fn create_window(&self) -> Result<X11Window, DisplayError> {
        let conn = &self.conn;
        let screen = self.screen();
        let (visual, depth) = find_argb_visual(screen)
            .map(|visual| (visual, 32))
            .unwrap_or_else(|| (root_visual(screen), screen.root_depth));
        debug!("using visual {:#x} with depth {}", visual.visual_id, depth);

        let colormap = conn.generate_id()?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual.visual_id)?;

        let window = conn.generate_id()?;
        let values = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap);
        conn.create_window(
            depth,
            window,
            screen.root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual.visual_id,
            &values,
        )?;

        let atoms = Atoms::new(&**conn)?.reply()?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            WINDOW_NAME,
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_NAME,
            atoms.UTF8_STRING,
            WINDOW_NAME,
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            WINDOW_CLASS,
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_WINDOW_TYPE,
            AtomEnum::ATOM,
            &[atoms._NET_WM_WINDOW_TYPE_NOTIFICATION],
        )?;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new())?;
        conn.flush()?;

        Ok(X11Window {
            conn: Rc::clone(conn),
            window,
            colormap,
            gc,
            pixel: PixelFormat::new(&visual, depth),
        })
    }
}

impl MonitorSource for X11Display {
    type Error = DisplayError;

    fn combined(&self) -> Rect {
        let screen = self.screen();
        Rect::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
    }

    fn monitors(&self) -> Result<Vec<MonitorRect>, DisplayError> {
        let reply = self
            .conn
            .randr_get_monitors(self.screen().root, true)?
            .reply()?;
        reply
            .monitors
            .into_iter()
            .map(|monitor| {
                let name = self.conn.get_atom_name(monitor.name)?.reply()?.name;
                Ok(MonitorRect {
                    name: String::from_utf8_lossy(&name).into_owned(),
                    area: Rect::new(
                        i32::from(monitor.x),
                        i32::from(monitor.y),
                        u32::from(monitor.width),
                        u32::from(monitor.height),
                    ),
                })
            })
            .collect()
    }

    fn focus_point(&self) -> Result<Option<(i32, i32)>, DisplayError> {
        let focus = self.conn.get_input_focus()?.reply()?.focus;
        let root = self.screen().root;
        let unfocused = [
            Window::from(InputFocus::NONE),
            Window::from(InputFocus::POINTER_ROOT),
            root,
        ];
        if unfocused.contains(&focus) {
            return Ok(None);
        }
        let geometry = self.conn.get_geometry(focus)?.reply()?;
        let origin = self.conn.translate_coordinates(focus, root, 0, 0)?.reply()?;
        Ok(Some((
            i32::from(origin.dst_x) + i32::from(geometry.width) / 2,
            i32::from(origin.dst_y) + i32::from(geometry.height) / 2,
        )))
    }

    fn pointer_point(&self) -> Result<(i32, i32), DisplayError> {
        let pointer = self.conn.query_pointer(self.screen().root)?.reply()?;
        Ok((i32::from(pointer.root_x), i32::from(pointer.root_y)))
    }
}

/// The bar window and its drawing resources. Freed on drop.
pub struct X11Window {
    conn: Rc<RustConnection>,
    window: Window,
    colormap: Colormap,
    gc: Gcontext,
    pixel: PixelFormat,
}

impl Canvas for X11Window {
    type Error = DisplayError;

    fn configure(&mut self, placement: Rect) -> Result<(), DisplayError> {
        let values = ConfigureWindowAux::new()
            .x(placement.x)
            .y(placement.y)
            .width(placement.width.max(1))
            .height(placement.height.max(1));
        self.conn.configure_window(self.window, &values)?;
        Ok(())
    }

    fn map(&mut self) -> Result<(), DisplayError> {
        self.conn.map_window(self.window)?;
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn unmap(&mut self) -> Result<(), DisplayError> {
        self.conn.unmap_window(self.window)?;
        Ok(())
    }

    fn fill_rect(&mut self, color: Color, rect: Rect) -> Result<(), DisplayError> {
        if rect.width == 0 || rect.height == 0 {
            return Ok(());
        }
        self.conn.change_gc(
            self.gc,
            &ChangeGCAux::new().foreground(self.pixel.encode(color)),
        )?;
        self.conn.poly_fill_rectangle(
            self.window,
            self.gc,
            &[Rectangle {
                x: clamp_i16(rect.x),
                y: clamp_i16(rect.y),
                width: clamp_u16(rect.width),
                height: clamp_u16(rect.height),
            }],
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.conn.flush()?;
        Ok(())
    }
}

impl Drop for X11Window {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.free_colormap(self.colormap);
        let _ = self.conn.flush();
    }
}

fn find_argb_visual(screen: &Screen) -> Option<Visualtype> {
    screen
        .allowed_depths
        .iter()
        .filter(|depth| depth.depth == 32)
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| {
            visual.class == VisualClass::TRUE_COLOR && PixelFormat::new(visual, 32).alpha_mask != 0
        })
        .copied()
}

fn root_visual(screen: &Screen) -> Visualtype {
    screen
        .allowed_depths
        .iter()
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.visual_id == screen.root_visual)
        .copied()
        .unwrap_or(Visualtype {
            visual_id: screen.root_visual,
            class: VisualClass::TRUE_COLOR,
            bits_per_rgb_value: 8,
            colormap_entries: 256,
            red_mask: 0xff0000,
            green_mask: 0x00ff00,
            blue_mask: 0x0000ff,
        })
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn clamp_u16(v: u32) -> u16 {
    v.min(u32::from(u16::MAX)) as u16
}

/// Maps RGBA colors to pixel values of a TrueColor visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelFormat {
    red_mask: u32,
    green_mask: u32,
    blue_mask: u32,
    alpha_mask: u32,
}

impl PixelFormat {
    fn new(visual: &Visualtype, depth: u8) -> Self {
        let rgb = visual.red_mask | visual.green_mask | visual.blue_mask;
        let depth_mask = if depth >= 32 {
            u32::MAX
        } else {
            (1u32 << depth) - 1
        };
        Self {
            red_mask: visual.red_mask,
            green_mask: visual.green_mask,
            blue_mask: visual.blue_mask,
            alpha_mask: depth_mask & !rgb,
        }
    }

    /// Premultiplied when the visual carries alpha, as compositors expect.
    fn encode(&self, color: Color) -> u32 {
        let alpha = if self.alpha_mask == 0 { 0xff } else { color.alpha };
        let premultiply = |c: u8| (u32::from(c) * u32::from(alpha) / 0xff) as u8;
        place(premultiply(color.red), self.red_mask)
            | place(premultiply(color.green), self.green_mask)
            | place(premultiply(color.blue), self.blue_mask)
            | place(alpha, self.alpha_mask)
    }
}

/// Scales an 8-bit channel into the bits selected by `mask`.
fn place(channel: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let bits = (mask >> shift).count_ones();
    let value = if bits >= 8 {
        u32::from(channel) << (bits - 8)
    } else {
        u32::from(channel) >> (8 - bits)
    };
    (value << shift) & mask
}
