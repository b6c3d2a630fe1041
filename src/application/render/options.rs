//! Render option parsing.
//!
//! The `args` field of a render request is itself JSON text, written by hand
//! in the browser form. Line and block comments are tolerated and stripped
//! before deserialization; unknown fields are ignored.

use image::Rgba;
use serde::Deserialize;

use super::types::RenderError;

/// Largest accepted canvas edge, in pixels.
const MAX_DIMENSION: u32 = 8192;

/// Options controlling the rendered screenshot. Field names and defaults
/// follow the public options template in `assets/imgs/default-image.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Canvas size as `[width, height]` in pixels.
    pub size: [u32; 2],
    pub bg_color: String,
    pub bar_height: u32,
    pub bar_color: String,
    pub tab_color: String,
    pub tab_text_color: String,
    pub tab_name: String,
    pub language: String,
    pub blur_color: String,
    pub show_blur: bool,
    pub blur_radius: u32,
    pub tab_line_color: String,
    pub tab_line_width: u32,
    pub show_tab_line: bool,
    pub spacing: u32,
    pub margins: u32,
    pub tab_font_size: u32,
    pub code_font_size: u32,
    pub code_line_padding: u32,
    pub code_style: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: [800, 600],
            bg_color: "#ffffff".to_string(),
            bar_height: 40,
            bar_color: "#e8e8e8".to_string(),
            tab_color: "#ffffff".to_string(),
            tab_text_color: "#000000".to_string(),
            tab_name: "untitled".to_string(),
            language: "text".to_string(),
            blur_color: "#000000".to_string(),
            show_blur: false,
            blur_radius: 4,
            tab_line_color: "#4d78cc".to_string(),
            tab_line_width: 2,
            show_tab_line: false,
            spacing: 10,
            margins: 20,
            tab_font_size: 14,
            code_font_size: 14,
            code_line_padding: 10,
            code_style: "default".to_string(),
        }
    }
}

impl RenderOptions {
    /// Parse options out of the raw `args` text: strip comments, deserialize,
    /// validate.
    pub fn from_args(args: &str) -> Result<Self, RenderError> {
        let stripped = strip_json_comments(args);
        let options: RenderOptions = serde_json::from_str(&stripped)
            .map_err(|err| RenderError::args(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), RenderError> {
        let [width, height] = self.size;
        if width == 0 || height == 0 {
            return Err(RenderError::options(
                "size must have a positive width and height",
            ));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RenderError::options(format!(
                "size must not exceed {MAX_DIMENSION} pixels per edge"
            )));
        }
        if self.code_font_size == 0 || self.tab_font_size == 0 {
            return Err(RenderError::options("font sizes must be positive"));
        }
        Ok(())
    }
}

/// Remove `//` line comments and `/* */` block comments from JSON text.
/// String literal contents are never touched.
pub(crate) fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    // Line comment: drop everything up to (not including) the newline.
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(ch),
            },
            _ => out.push(ch),
        }
    }

    out
}

/// Parse a `#rgb` / `#rrggbb` / `#rrggbbaa` hex color, or one of a small set
/// of named colors the option templates rely on.
pub(crate) fn parse_color(value: &str) -> Result<Rgba<u8>, RenderError> {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex_color(hex, trimmed);
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "white" => Ok(Rgba([0xff, 0xff, 0xff, 0xff])),
        "black" => Ok(Rgba([0x00, 0x00, 0x00, 0xff])),
        "red" => Ok(Rgba([0xff, 0x00, 0x00, 0xff])),
        "green" => Ok(Rgba([0x00, 0x80, 0x00, 0xff])),
        "blue" => Ok(Rgba([0x00, 0x00, 0xff, 0xff])),
        "yellow" => Ok(Rgba([0xff, 0xff, 0x00, 0xff])),
        "orange" => Ok(Rgba([0xff, 0xa5, 0x00, 0xff])),
        "purple" => Ok(Rgba([0x80, 0x00, 0x80, 0xff])),
        "gray" | "grey" => Ok(Rgba([0x80, 0x80, 0x80, 0xff])),
        "silver" => Ok(Rgba([0xc0, 0xc0, 0xc0, 0xff])),
        "transparent" => Ok(Rgba([0x00, 0x00, 0x00, 0x00])),
        _ => Err(RenderError::options(format!(
            "unrecognized color `{trimmed}`"
        ))),
    }
}

fn parse_hex_color(hex: &str, original: &str) -> Result<Rgba<u8>, RenderError> {
    let invalid = || RenderError::options(format!("invalid hex color `{original}`"));

    let component = |pair: &str| u8::from_str_radix(pair, 16).map_err(|_| invalid());

    match hex.len() {
        3 => {
            let mut channels = [0u8; 4];
            channels[3] = 0xff;
            for (index, ch) in hex.chars().enumerate() {
                let digit = ch.to_digit(16).ok_or_else(invalid)? as u8;
                channels[index] = digit << 4 | digit;
            }
            Ok(Rgba(channels))
        }
        6 => Ok(Rgba([
            component(&hex[0..2])?,
            component(&hex[2..4])?,
            component(&hex[4..6])?,
            0xff,
        ])),
        8 => Ok(Rgba([
            component(&hex[0..2])?,
            component(&hex[2..4])?,
            component(&hex[4..6])?,
            component(&hex[6..8])?,
        ])),
        _ => Err(invalid()),
    }
}
