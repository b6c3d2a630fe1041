/// Explicit view model the controller drives instead of global DOM lookups.
///
/// Implementations map these calls onto whatever surface hosts the workflow:
/// the reference page maps them to the `json`, `code-image`, `error-msg`,
/// `popup-1`, `popup-2` and `show-button` elements.
pub trait ControllerView: Send {
    /// Replace the options input with `text`, verbatim and unparsed.
    fn set_options_text(&mut self, text: &str);

    /// Point the image element at a `data:` URI.
    fn set_image_source(&mut self, data_uri: &str);

    fn set_error_text(&mut self, message: &str);

    fn set_image_popup_visible(&mut self, visible: bool);

    fn set_error_popup_visible(&mut self, visible: bool);

    fn image_popup_visible(&self) -> bool;

    fn error_popup_visible(&self) -> bool;

    /// Enable or disable the submit control.
    fn set_submit_enabled(&mut self, enabled: bool);
}
