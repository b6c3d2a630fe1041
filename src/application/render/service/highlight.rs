use image::Rgba;
use syntect::{
    easy::HighlightLines,
    highlighting::Theme,
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// A run of characters sharing one foreground color.
#[derive(Debug)]
pub(crate) struct StyledSpan {
    pub text: String,
    pub color: Rgba<u8>,
}

pub(crate) type StyledLine = Vec<StyledSpan>;

pub(crate) fn highlight_code(
    language: &str,
    code: &str,
    syntax_set: &SyntaxSet,
    theme: &Theme,
) -> Result<Vec<StyledLine>, RenderError> {
    let syntax = find_syntax(syntax_set, language).ok_or_else(|| RenderError::Highlighting {
        language: language.to_string(),
        message: "unknown language".to_string(),
    })?;

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        let regions = highlighter
            .highlight_line(line, syntax_set)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;

        let spans = regions
            .into_iter()
            .filter_map(|(style, text)| {
                let text = text.trim_end_matches(['\n', '\r']);
                if text.is_empty() {
                    return None;
                }
                let fg = style.foreground;
                Some(StyledSpan {
                    text: text.to_string(),
                    color: Rgba([fg.r, fg.g, fg.b, fg.a]),
                })
            })
            .collect();
        lines.push(spans);
    }

    Ok(lines)
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    if matches!(lowercase.as_str(), "text" | "plain" | "txt") {
        return Some(syntax_set.find_syntax_plain_text());
    }
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
mod tests {
    use syntect::highlighting::ThemeSet;

    use super::*;

    fn theme() -> Theme {
        let mut themes = ThemeSet::load_defaults();
        themes
            .themes
            .remove("InspiredGitHub")
            .expect("default theme present")
    }

    #[test]
    fn unknown_language_is_an_error() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let err = highlight_code("no-such-language", "x", &syntax_set, &theme())
            .expect_err("must fail");
        assert!(matches!(err, RenderError::Highlighting { .. }));
    }

    #[test]
    fn rust_code_produces_one_styled_line_per_source_line() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let lines = highlight_code("rust", "fn main() {}\nlet x = 1;", &syntax_set, &theme())
            .expect("highlight");
        assert_eq!(lines.len(), 2);
        let rendered: String = lines[0].iter().map(|span| span.text.as_str()).collect();
        assert_eq!(rendered, "fn main() {}");
    }

    #[test]
    fn plain_text_token_resolves_without_lookup() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let lines = highlight_code("text", "hello", &syntax_set, &theme()).expect("highlight");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][0].text, "hello");
    }

    #[test]
    fn empty_lines_produce_empty_spans() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let lines = highlight_code("text", "a\n\nb", &syntax_set, &theme()).expect("highlight");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
    }
}
