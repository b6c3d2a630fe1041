mod highlight;
mod text;

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use once_cell::sync::OnceCell;
use syntect::{
    highlighting::{Theme, ThemeSet},
    parsing::SyntaxSet,
};

use crate::application::render::options::{RenderOptions, parse_color};
use crate::application::render::types::{
    RenderError, RenderRequest, RenderService, RenderedImage,
};
use crate::config::RenderSettings;

use self::highlight::{StyledLine, highlight_code};
use self::text::TextPainter;

/// Padding around the code block, matching the classic image formatter.
const CODE_PAD: u32 = 10;

/// Theme used when the options ask for the `default` style.
const DEFAULT_THEME: &str = "InspiredGitHub";

/// Glyph drawn in place of the close icon the tab carries.
const CLOSE_MARK: &str = "\u{d7}";

/// Well-known monospace font locations probed when no font path is
/// configured.
const FONT_PROBE_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
    "/usr/share/fonts/truetype/freefont/FreeMono.ttf",
];

/// Locate the font the renderer will use: the configured path when present,
/// otherwise the first probe path that exists on this machine.
pub fn locate_font(settings: &RenderSettings) -> Option<PathBuf> {
    if let Some(path) = settings.font_path.as_ref() {
        return Some(path.clone());
    }
    FONT_PROBE_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}

/// Syntect + fontdue backed implementation of [`RenderService`].
///
/// The font is loaded lazily on the first successful option parse so that
/// option-error responses do not depend on a font being installed.
pub struct CodeImageRenderer {
    settings: RenderSettings,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    painter: OnceCell<TextPainter>,
}

impl CodeImageRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            painter: OnceCell::new(),
        }
    }

    /// Shared renderer handle for the HTTP state.
    pub fn shared(settings: RenderSettings) -> Arc<dyn RenderService> {
        Arc::new(Self::new(settings))
    }

    fn painter(&self) -> Result<&TextPainter, RenderError> {
        self.painter.get_or_try_init(|| {
            let path = locate_font(&self.settings).ok_or_else(|| {
                RenderError::font("no monospace font found; set render.font_path")
            })?;
            let bytes = fs::read(&path).map_err(|err| {
                RenderError::font(format!("failed to read {}: {err}", path.display()))
            })?;
            TextPainter::from_bytes(bytes)
        })
    }

    fn theme(&self, style: &str) -> Result<&Theme, RenderError> {
        let name = if style.eq_ignore_ascii_case("default") {
            DEFAULT_THEME
        } else {
            style
        };
        self.theme_set
            .themes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, theme)| theme)
            .ok_or_else(|| RenderError::options(format!("unknown code style `{style}`")))
    }
}

impl RenderService for CodeImageRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedImage, RenderError> {
        let options = RenderOptions::from_args(&request.args)?;
        let palette = Palette::resolve(&options)?;
        let theme = self.theme(&options.code_style)?;

        let code = request.code.replace('\t', "    ");
        let lines = highlight_code(&options.language, &code, &self.syntax_set, theme)?;
        let painter = self.painter()?;

        let canvas = compose(&options, &palette, &lines, painter);
        encode_png(canvas)
    }
}

/// All option colors, parsed once up front so a bad color fails the request
/// before any pixels are produced.
struct Palette {
    bg: Rgba<u8>,
    bar: Rgba<u8>,
    tab: Rgba<u8>,
    tab_text: Rgba<u8>,
    blur: Rgba<u8>,
    tab_line: Rgba<u8>,
}

impl Palette {
    fn resolve(options: &RenderOptions) -> Result<Self, RenderError> {
        Ok(Self {
            bg: parse_color(&options.bg_color)?,
            bar: parse_color(&options.bar_color)?,
            tab: parse_color(&options.tab_color)?,
            tab_text: parse_color(&options.tab_text_color)?,
            blur: parse_color(&options.blur_color)?,
            tab_line: parse_color(&options.tab_line_color)?,
        })
    }
}

fn compose(
    options: &RenderOptions,
    palette: &Palette,
    lines: &[StyledLine],
    painter: &TextPainter,
) -> RgbaImage {
    let [width, height] = options.size;
    let mut canvas = RgbaImage::from_pixel(width, height, palette.bg);

    draw_bar(&mut canvas, options, palette);
    draw_tab(&mut canvas, options, palette, painter);
    draw_code(&mut canvas, options, lines, painter);

    canvas
}

fn draw_bar(canvas: &mut RgbaImage, options: &RenderOptions, palette: &Palette) {
    if options.show_blur && options.blur_radius > 0 {
        let mut shadow = RgbaImage::from_pixel(canvas.width(), canvas.height(), Rgba([0, 0, 0, 0]));
        fill_rect(
            &mut shadow,
            0,
            0,
            canvas.width(),
            options.bar_height,
            palette.blur,
        );
        let shadow = imageops::blur(&shadow, options.blur_radius as f32);
        imageops::overlay(canvas, &shadow, 0, 0);
    }

    fill_rect(canvas, 0, 0, canvas.width(), options.bar_height, palette.bar);
}

fn draw_tab(
    canvas: &mut RgbaImage,
    options: &RenderOptions,
    palette: &Palette,
    painter: &TextPainter,
) {
    let font_px = options.tab_font_size as f32;
    let text_width = painter.measure(&options.tab_name, font_px);
    let close_width = painter.measure(CLOSE_MARK, font_px);
    let tab_width = text_width
        .saturating_add(close_width)
        .saturating_add(options.spacing.saturating_mul(2))
        .saturating_add(options.margins);
    let tab_height = options.bar_height;

    fill_rect(canvas, 0, 0, tab_width, tab_height, palette.tab);

    let (ascent, descent) = painter.line_metrics(font_px);
    let text_height = (ascent - descent).ceil() as u32;
    let text_x = tab_width.saturating_sub(text_width) / 2;
    let baseline = (tab_height.saturating_sub(text_height) / 2) as i32 + ascent.ceil() as i32;

    painter.draw(
        canvas,
        text_x as i32,
        baseline,
        &options.tab_name,
        font_px,
        palette.tab_text,
    );
    painter.draw(
        canvas,
        text_x.saturating_add(text_width).saturating_add(options.spacing) as i32,
        baseline,
        CLOSE_MARK,
        font_px,
        palette.tab_text,
    );

    if options.show_tab_line && options.tab_line_width > 0 {
        let line_top = tab_height.saturating_sub(options.tab_line_width);
        fill_rect(
            canvas,
            0,
            line_top,
            tab_width,
            options.tab_line_width,
            palette.tab_line,
        );
    }
}

fn draw_code(
    canvas: &mut RgbaImage,
    options: &RenderOptions,
    lines: &[StyledLine],
    painter: &TextPainter,
) {
    let font_px = options.code_font_size as f32;
    let (ascent, _) = painter.line_metrics(font_px);
    let ascent_px = ascent.ceil() as i32;
    let line_height = (painter.line_height(font_px) + options.code_line_padding) as i32;

    // Code starts below the bar and its shadow, like the original layout.
    let top = options
        .bar_height
        .saturating_add(options.blur_radius.saturating_mul(2))
        .saturating_add(CODE_PAD);
    let mut baseline = top as i32 + ascent_px;

    for line in lines {
        if baseline - ascent_px >= canvas.height() as i32 {
            break;
        }
        let mut x = CODE_PAD as i32;
        for span in line {
            x += painter.draw(canvas, x, baseline, &span.text, font_px, span.color);
        }
        baseline += line_height;
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(width).min(canvas.width());
    let y_end = y.saturating_add(height).min(canvas.height());
    for yy in y..y_end {
        for xx in x..x_end {
            canvas.put_pixel(xx, yy, color);
        }
    }
}

fn encode_png(canvas: RgbaImage) -> Result<RenderedImage, RenderError> {
    let (width, height) = canvas.dimensions();
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|err| RenderError::encode(err.to_string()))?;
    Ok(RenderedImage {
        width,
        height,
        png: out.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> CodeImageRenderer {
        CodeImageRenderer::new(RenderSettings::default())
    }

    #[test]
    fn default_style_resolves_to_a_theme() {
        assert!(renderer().theme("default").is_ok());
    }

    #[test]
    fn theme_lookup_is_case_insensitive() {
        assert!(renderer().theme("inspiredgithub").is_ok());
        assert!(renderer().theme("base16-ocean.dark").is_ok());
    }

    #[test]
    fn unknown_style_is_an_options_error() {
        let err = renderer().theme("no-such-style").expect_err("must fail");
        assert!(matches!(err, RenderError::Options { .. }));
    }

    #[test]
    fn configured_font_path_wins_over_probing() {
        let settings = RenderSettings {
            font_path: Some(PathBuf::from("/tmp/custom.ttf")),
        };
        assert_eq!(locate_font(&settings), Some(PathBuf::from("/tmp/custom.ttf")));
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        fill_rect(&mut canvas, 2, 2, 100, 100, Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn bad_color_fails_before_rasterization() {
        let request = RenderRequest::new("{\"bg_color\": \"not-a-color\"}", "x");
        let err = renderer().render(&request).expect_err("must fail");
        assert!(matches!(err, RenderError::Options { .. }));
    }

    #[test]
    fn render_produces_png_bytes_when_a_font_is_installed() {
        let renderer = renderer();
        if renderer.painter().is_err() {
            // No system font on this machine; the pipeline up to
            // rasterization is covered by the other tests.
            return;
        }
        let request = RenderRequest::new(
            "{\"size\": [320, 200], \"language\": \"rust\", \"tab_name\": \"main.rs\"}",
            "fn main() {\n    println!(\"hi\");\n}",
        );
        let image = renderer.render(&request).expect("render");
        assert_eq!(image.width, 320);
        assert_eq!(image.height, 200);
        assert_eq!(image.png[1..4], *b"PNG");
    }
}
