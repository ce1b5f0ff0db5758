//! The main loop: wait for the next value on the input, show it, and hide
//! the bar once the input has been quiet for long enough.

use crate::geometry::ShowMode;
use crate::input::{Update, UpdateReader};
use crate::monitor::{MonitorSource, resolve_monitor};
use crate::surface::{Bar, Canvas};
use anyhow::{Context, Result};
use log::debug;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Value shown as a full bar.
    pub cap: u32,
    /// Delay before hiding the bar. `None` keeps it on screen.
    pub hide_after: Option<Duration>,
    /// Do not report updates on stdout.
    pub quiet: bool,
}

pub struct Listener<C: Canvas, S, R> {
    bar: Bar<C>,
    monitors: S,
    input: UpdateReader<R>,
    options: Options,
}

impl<C, S, R> Listener<C, S, R>
where
    C: Canvas,
    C::Error: std::error::Error + Send + Sync + 'static,
    S: MonitorSource,
    R: AsyncBufRead + Unpin,
{
    pub fn new(bar: Bar<C>, monitors: S, input: UpdateReader<R>, options: Options) -> Self {
        Self {
            bar,
            monitors,
            input,
            options,
        }
    }

    /// Runs until the input ends or a malformed value is read.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let next = match self.wait_limit() {
                Some(limit) => match timeout(limit, self.input.next_update()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!("no update for {limit:?}, hiding");
                        self.bar.hide().context("failed to hide the bar")?;
                        continue;
                    }
                },
                None => self.input.next_update().await,
            };
            let Some(update) = next.context("failed to read standard input")? else {
                return Ok(());
            };
            self.display(update)?;
        }
    }

    /// Releases the window.
    pub fn close(self) {
        self.bar.close();
    }

    fn wait_limit(&self) -> Option<Duration> {
        self.options
            .hide_after
            .filter(|_| self.bar.is_mapped())
    }

    fn display(&mut self, update: Update) -> Result<()> {
        let target = &self.bar.style().monitor;
        if target.is_dynamic() {
            let area = resolve_monitor(&self.monitors, target);
            self.bar
                .reposition(area)
                .context("failed to move the bar")?;
        }

        let overflow = self.bar.style().overflow;
        self.bar
            .show(update.value, self.options.cap, overflow, update.mode)
            .context("failed to draw the bar")?;

        if !self.options.quiet {
            println!("{}", describe(update, self.options.cap));
        }
        Ok(())
    }
}

/// Line reported on stdout for every update shown.
pub fn describe(update: Update, cap: u32) -> String {
    match update.mode {
        ShowMode::Normal => format!("Update: {}/{}", update.value, cap),
        ShowMode::Alternative => format!("Update: {}/{} [ALT]", update.value, cap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorTarget, Style};
    use crate::geometry::Rect;
    use crate::monitor::MonitorRect;
    use crate::surface::tests::{Call, RecordingCanvas};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::time::sleep;

    const LEFT: Rect = Rect::new(0, 0, 1000, 500);
    const RIGHT: Rect = Rect::new(1000, 0, 1000, 500);

    /// Two side by side monitors and a pointer that visits the queued
    /// positions in turn.
    struct Desk {
        pointer: RefCell<VecDeque<(i32, i32)>>,
    }

    impl Desk {
        fn with_pointer(points: &[(i32, i32)]) -> Self {
            Self {
                pointer: RefCell::new(points.iter().copied().collect()),
            }
        }
    }

    impl MonitorSource for Desk {
        type Error = &'static str;

        fn combined(&self) -> Rect {
            Rect::new(0, 0, 2000, 500)
        }

        fn monitors(&self) -> Result<Vec<MonitorRect>, Self::Error> {
            Ok(vec![
                MonitorRect {
                    name: "left".into(),
                    area: LEFT,
                },
                MonitorRect {
                    name: "right".into(),
                    area: RIGHT,
                },
            ])
        }

        fn focus_point(&self) -> Result<Option<(i32, i32)>, Self::Error> {
            Ok(None)
        }

        fn pointer_point(&self) -> Result<(i32, i32), Self::Error> {
            self.pointer.borrow_mut().pop_front().ok_or("pointer gone")
        }
    }

    fn listener<R: AsyncBufRead + Unpin>(
        style: Style,
        desk: Desk,
        input: R,
        hide_after: Option<Duration>,
    ) -> Listener<RecordingCanvas, Desk, R> {
        let bar = Bar::open(RecordingCanvas::default(), style, LEFT).unwrap();
        let options = Options {
            cap: 100,
            hide_after,
            quiet: true,
        };
        Listener::new(bar, desk, UpdateReader::new(input), options)
    }

    fn calls<R>(listener: &Listener<RecordingCanvas, Desk, R>) -> &[Call] {
        &listener.bar.canvas().calls
    }

    #[tokio::test(start_paused = true)]
    async fn bar_hides_after_the_timeout() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut listener = listener(
            Style::default(),
            Desk::with_pointer(&[]),
            BufReader::new(reader),
            Some(Duration::from_millis(1000)),
        );

        let feed = async move {
            writer.write_all(b"50\n").await.unwrap();
            sleep(Duration::from_millis(1500)).await;
            drop(writer);
        };
        let (result, ()) = tokio::join!(listener.run(), feed);
        result.unwrap();

        let calls = calls(&listener);
        let map = calls.iter().position(|c| *c == Call::Map).unwrap();
        let unmap = calls.iter().position(|c| *c == Call::Unmap).unwrap();
        assert!(map < unmap);
        assert_eq!(listener.bar.canvas().count(&Call::Unmap), 1);
        assert!(!listener.bar.is_mapped());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_keeps_the_bar_visible() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut listener = listener(
            Style::default(),
            Desk::with_pointer(&[]),
            BufReader::new(reader),
            None,
        );

        let feed = async move {
            writer.write_all(b"50\n").await.unwrap();
            sleep(Duration::from_secs(60)).await;
            writer.write_all(b"60!\n").await.unwrap();
        };
        let (result, ()) = tokio::join!(listener.run(), feed);
        result.unwrap();

        assert_eq!(listener.bar.canvas().count(&Call::Map), 1);
        assert_eq!(listener.bar.canvas().count(&Call::Unmap), 0);
        let alt = listener.bar.style().colors.alt;
        let last_fill = listener.bar.canvas().fills().last().copied().unwrap();
        assert_eq!(last_fill.0, alt.fg);
        assert_eq!(last_fill.1.width, 120);
    }

    #[tokio::test]
    async fn malformed_input_ends_the_loop() {
        let input: &[u8] = b"10 oops 20\n";
        let mut listener = listener(
            Style::default(),
            Desk::with_pointer(&[]),
            BufReader::new(input),
            None,
        );

        listener.run().await.unwrap();

        let fg = listener.bar.style().colors.normal.fg;
        let fg_fills: Vec<_> = listener
            .bar
            .canvas()
            .fills()
            .into_iter()
            .filter(|(color, rect)| *color == fg && rect.height == 24)
            .collect();
        assert_eq!(fg_fills.len(), 1);
        assert_eq!(fg_fills[0].1.width, 20);
    }

    #[tokio::test]
    async fn dynamic_monitor_follows_the_pointer() {
        let style = Style {
            monitor: MonitorTarget::RelativePointer,
            ..Style::default()
        };
        let input: &[u8] = b"10\n20\n30\n";
        let mut listener = listener(
            style,
            Desk::with_pointer(&[(10, 10), (1500, 10)]),
            BufReader::new(input),
            None,
        );
        let opened_at = listener.bar.placement();

        listener.run().await.unwrap();

        let configures: Vec<_> = calls(&listener)
            .iter()
            .filter_map(|call| match call {
                Call::Configure(rect) => Some(*rect),
                _ => None,
            })
            .collect();
        // Initial placement, the move to the right monitor, then back to the
        // combined screen once the pointer can no longer be queried.
        assert_eq!(
            configures,
            vec![
                opened_at,
                Rect::new(1390, 428, 220, 44),
                Rect::new(790, 428, 420, 44),
            ]
        );
    }

    #[test]
    fn updates_are_described_with_the_cap() {
        let normal = Update {
            value: 42,
            mode: ShowMode::Normal,
        };
        let alt = Update {
            value: 7,
            mode: ShowMode::Alternative,
        };
        assert_eq!(describe(normal, 100), "Update: 42/100");
        assert_eq!(describe(alt, 50), "Update: 7/50 [ALT]");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_normal_stop() {
        let input: &[u8] = b"42 \xff\n";
        let mut listener = listener(
            Style::default(),
            Desk::with_pointer(&[]),
            BufReader::new(input),
            None,
        );

        listener.run().await.unwrap();

        assert_eq!(listener.bar.canvas().count(&Call::Map), 1);
        let fg = listener.bar.style().colors.normal.fg;
        let last_fill = listener.bar.canvas().fills().last().copied().unwrap();
        assert_eq!(last_fill, (fg, Rect::new(10, 10, 84, 24)));
    }
}
