use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

pub const DEFAULT_STYLE: &str = "default";
const CONFIG_APPNAME: &str = "xob";
const CONFIG_FILENAME: &str = "styles.toml";
const SYSCONFDIR: &str = "/etc";
/// Largest accepted pixel size, the X11 coordinate range.
const MAX_SIZE: u32 = i16::MAX as u32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error("no style named `{0}`")]
    MissingStyle(String),
}

/// 32-bit RGBA color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 0xff,
        }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(spec: &str) -> Option<Self> {
        let digits = spec.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self {
                red: channel(0)?,
                green: channel(2)?,
                blue: channel(4)?,
                alpha: channel(6)?,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSpec {
    pub fg: Color,
    pub bg: Color,
    pub border: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colors {
    pub normal: ColorSpec,
    pub overflow: ColorSpec,
    pub alt: ColorSpec,
    pub altoverflow: ColorSpec,
}

/// A dimension relative to the monitor plus a pixel offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dim {
    pub rel: f64,
    pub abs: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowMode {
    Hidden,
    Proportional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTarget {
    Combined,
    RelativeFocus,
    RelativePointer,
    Named(String),
}

impl MonitorTarget {
    pub fn from_name(name: &str) -> Self {
        match name {
            "combined" => Self::Combined,
            "relative_focus" => Self::RelativeFocus,
            "relative_pointer" => Self::RelativePointer,
            other => Self::Named(other.to_string()),
        }
    }

    /// Whether the monitor has to be located again before every draw.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::RelativeFocus | Self::RelativePointer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub monitor: MonitorTarget,
    pub x: Dim,
    pub y: Dim,
    pub length: Dim,
    pub thickness: u32,
    pub outline: u32,
    pub border: u32,
    pub padding: u32,
    pub orientation: Orientation,
    pub overflow: OverflowMode,
    pub colors: Colors,
}

impl Default for Style {
    fn default() -> Self {
        let black = Color::rgb(0x00, 0x00, 0x00);
        let spec = |fg: Color| ColorSpec {
            fg,
            bg: black,
            border: fg,
        };
        Self {
            monitor: MonitorTarget::Combined,
            x: Dim { rel: 0.5, abs: 0 },
            y: Dim { rel: 0.9, abs: 0 },
            length: Dim { rel: 0.2, abs: 0 },
            thickness: 24,
            outline: 3,
            border: 4,
            padding: 3,
            orientation: Orientation::Horizontal,
            overflow: OverflowMode::Proportional,
            colors: Colors {
                normal: spec(Color::rgb(0xff, 0xff, 0xff)),
                overflow: spec(Color::rgb(0xff, 0x00, 0x00)),
                alt: spec(Color::rgb(0x55, 0x55, 0x55)),
                altoverflow: spec(Color::rgb(0x55, 0x00, 0x00)),
            },
        }
    }
}

/// Environment consulted when looking for a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigEnv {
    pub xdg_config_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub sysconf_dir: PathBuf,
}

impl Default for ConfigEnv {
    fn default() -> Self {
        Self {
            xdg_config_home: None,
            home: None,
            sysconf_dir: PathBuf::from(SYSCONFDIR),
        }
    }
}

impl ConfigEnv {
    pub fn from_process() -> Self {
        let var = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            xdg_config_home: var("XDG_CONFIG_HOME"),
            home: var("HOME"),
            ..Self::default()
        }
    }
}

/// Candidate configuration files, most specific first.
pub fn config_search_path(explicit: Option<&Path>, env: &ConfigEnv) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Some(config_home) = &env.xdg_config_home {
        candidates.push(config_home.join(CONFIG_APPNAME).join(CONFIG_FILENAME));
    }
    if let Some(home) = &env.home {
        candidates.push(
            home.join(".config")
                .join(CONFIG_APPNAME)
                .join(CONFIG_FILENAME),
        );
    }
    candidates.push(
        env.sysconf_dir
            .join(CONFIG_APPNAME)
            .join(CONFIG_FILENAME),
    );
    candidates
}

/// Reads the first candidate that can be opened.
pub fn open_first(candidates: &[PathBuf]) -> Option<(PathBuf, String)> {
    candidates.iter().find_map(|path| match fs::read_to_string(path) {
        Ok(content) => Some((path.clone(), content)),
        Err(e) => {
            debug!("skipping {}: {}", path.display(), e);
            None
        }
    })
}

/// Resolves, reads and parses the configuration. Never fails: every problem
/// falls back to the built-in style. Returns the file the style came from.
pub fn load_style(
    explicit: Option<&Path>,
    style_name: &str,
    env: &ConfigEnv,
) -> (Style, Option<PathBuf>) {
    if let Some(path) = explicit {
        if let Err(e) = fs::metadata(path) {
            warn!(
                "could not open specified configuration file {}: {}",
                path.display(),
                e
            );
            info!("falling back to standard configuration files");
        }
    }

    let Some((path, content)) = open_first(&config_search_path(explicit, env)) else {
        info!("could not access any configuration file, using the default style");
        return (Style::default(), None);
    };

    match parse_style(&content, style_name, Style::default()) {
        Ok(style) => (style, Some(path)),
        Err(e) => {
            warn!("{}: {} (expected a TOML style table)", path.display(), e);
            (Style::default(), Some(path))
        }
    }
}

/// Overlays the `name` section of `content` onto `default_style`.
/// Invalid entries are reported and keep their default value.
pub fn parse_style(
    content: &str,
    name: &str,
    default_style: Style,
) -> Result<Style, ConfigError> {
    let table: Table = content.parse()?;
    let section = table
        .get(name)
        .and_then(Value::as_table)
        .ok_or_else(|| ConfigError::MissingStyle(name.to_string()))?;

    let mut style = default_style;

    style.thickness = lookup_size(section, name, "thickness", style.thickness);
    style.outline = lookup_size(section, name, "outline", style.outline);
    style.border = lookup_size(section, name, "border", style.border);
    style.padding = lookup_size(section, name, "padding", style.padding);
    style.x = lookup_dim(section, name, "x", style.x);
    style.y = lookup_dim(section, name, "y", style.y);
    style.length = lookup_dim(section, name, "length", style.length);

    style.overflow = lookup_keyword(
        section,
        name,
        "overflow",
        &[
            ("hidden", OverflowMode::Hidden),
            ("proportional", OverflowMode::Proportional),
        ],
    )
    .unwrap_or(style.overflow);
    style.orientation = lookup_keyword(
        section,
        name,
        "orientation",
        &[
            ("horizontal", Orientation::Horizontal),
            ("vertical", Orientation::Vertical),
        ],
    )
    .unwrap_or(style.orientation);

    match section.get("monitor") {
        None => {}
        Some(Value::String(monitor)) if !monitor.is_empty() => {
            style.monitor = MonitorTarget::from_name(monitor);
        }
        Some(_) => warn!("{name}.monitor: expected a monitor name"),
    }

    if let Some(color) = section.get("color") {
        match color.as_table() {
            Some(color) => {
                let prefix = format!("{name}.color");
                let c = &mut style.colors;
                c.normal = lookup_colorspec(color, &prefix, "normal", c.normal);
                c.overflow = lookup_colorspec(color, &prefix, "overflow", c.overflow);
                c.alt = lookup_colorspec(color, &prefix, "alt", c.alt);
                c.altoverflow = lookup_colorspec(color, &prefix, "altoverflow", c.altoverflow);
            }
            None => warn!("{name}.color: expected a table of color sets"),
        }
    }

    Ok(style)
}

fn lookup_size(section: &Table, prefix: &str, key: &str, current: u32) -> u32 {
    match section.get(key) {
        None => current,
        Some(Value::Integer(v)) => u32::try_from(*v)
            .ok()
            .filter(|size| *size <= MAX_SIZE)
            .unwrap_or_else(|| {
                warn!("{prefix}.{key}: {v} is not a valid size (0 to {MAX_SIZE})");
                current
            }),
        Some(other) => {
            warn!("{prefix}.{key}: expected an integer, found {}", other.type_str());
            current
        }
    }
}

fn lookup_dim(section: &Table, prefix: &str, key: &str, current: Dim) -> Dim {
    let Some(value) = section.get(key) else {
        return current;
    };
    let Some(dim) = value.as_table() else {
        warn!("{prefix}.{key}: expected a table with `relative` and `offset`");
        return current;
    };

    let rel = match dim.get("relative") {
        Some(Value::Float(rel)) => *rel,
        Some(Value::Integer(rel)) => *rel as f64,
        _ => {
            warn!("{prefix}.{key}: invalid or missing relative value");
            return current;
        }
    };
    if !(0.0..=1.0).contains(&rel) {
        warn!("{prefix}.{key}: out of range relative value {rel}");
        return current;
    }

    let abs = match dim.get("offset") {
        None => current.abs,
        Some(Value::Integer(abs)) => i32::try_from(*abs).unwrap_or_else(|_| {
            warn!("{prefix}.{key}: offset {abs} is out of range");
            current.abs
        }),
        Some(other) => {
            warn!("{prefix}.{key}: expected an integer offset, found {}", other.type_str());
            current.abs
        }
    };

    Dim { rel, abs }
}

fn lookup_keyword<T: Copy>(
    section: &Table,
    prefix: &str,
    key: &str,
    choices: &[(&str, T)],
) -> Option<T> {
    let value = section.get(key)?;
    let found = value
        .as_str()
        .and_then(|s| choices.iter().find(|(name, _)| *name == s))
        .map(|(_, v)| *v);
    if found.is_none() {
        let names: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
        warn!("{prefix}.{key}: expected one of {}", names.join(", "));
    }
    found
}

fn lookup_colorspec(colors: &Table, prefix: &str, key: &str, current: ColorSpec) -> ColorSpec {
    let Some(value) = colors.get(key) else {
        return current;
    };
    let path = format!("{prefix}.{key}");
    let Some(spec) = value.as_table() else {
        warn!("{path}: expected a table with fg, bg and border");
        return current;
    };
    ColorSpec {
        fg: lookup_color(spec, &path, "fg", current.fg),
        bg: lookup_color(spec, &path, "bg", current.bg),
        border: lookup_color(spec, &path, "border", current.border),
    }
}

fn lookup_color(spec: &Table, prefix: &str, key: &str, current: Color) -> Color {
    match spec.get(key) {
        None => current,
        Some(value) => value
            .as_str()
            .and_then(Color::from_hex)
            .unwrap_or_else(|| {
                warn!("{prefix}.{key}: invalid color specification, expected #RRGGBB or #RRGGBBAA");
                current
            }),
    }
}
