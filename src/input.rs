use crate::geometry::ShowMode;
use log::info;
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};

/// Marker following a value to select the alternative colors.
const ALT_FLAG: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub value: i32,
    pub mode: ShowMode,
}

/// Parses one token: an optionally signed integer, optionally followed by `!`.
pub fn parse_update(token: &str) -> Option<Update> {
    let (number, mode) = match token.strip_suffix(ALT_FLAG) {
        Some(number) => (number, ShowMode::Alternative),
        None => (token, ShowMode::Normal),
    };
    let value = number.parse().ok()?;
    Some(Update { value, mode })
}

/// Whitespace separated updates read from an async byte source.
pub struct UpdateReader<R> {
    lines: Split<R>,
    pending: VecDeque<Vec<u8>>,
}

impl<R: AsyncBufRead + Unpin> UpdateReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.split(b'\n'),
            pending: VecDeque::new(),
        }
    }

    /// Next raw token, or `None` at end of input. Cancel safe: tokens are
    /// only queued once a whole line has been read.
    pub async fn next_token(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            match self.lines.next_segment().await? {
                Some(line) => self.pending.extend(
                    line.split(u8::is_ascii_whitespace)
                        .filter(|token| !token.is_empty())
                        .map(<[u8]>::to_vec),
                ),
                None => return Ok(None),
            }
        }
    }

    /// Next well-formed update. End of input and malformed tokens, including
    /// bytes that are not UTF-8, both end the stream.
    pub async fn next_update(&mut self) -> io::Result<Option<Update>> {
        let Some(token) = self.next_token().await? else {
            info!("end of input");
            return Ok(None);
        };
        let update = std::str::from_utf8(&token).ok().and_then(parse_update);
        if update.is_none() {
            info!(
                "stopping on unexpected input {:?}",
                String::from_utf8_lossy(&token)
            );
        }
        Ok(update)
    }
}
