use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use codeshot_api_types::RenderRequest;
use thiserror::Error;

use crate::outcome::RenderOutcome;
use crate::transport::{Transport, TransportError};
use crate::view::ControllerView;

/// File name used when saving the rendered image.
pub const DOWNLOAD_FILE_NAME: &str = "image.png";

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Build a `data:` URI embedding the PNG bytes as base64 text.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("{DATA_URI_PREFIX}{}", BASE64.encode(bytes))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a render request is already in flight")]
    Busy,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no image has been rendered yet")]
    NothingRendered,
    #[error("displayed image is not a PNG data URI")]
    InvalidDataUri,
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Orchestrates the single user-facing action: show code as an image, or
/// show why it failed.
///
/// At most one render request is in flight at a time. The flag is taken
/// before the request is sent and released by a guard on every exit path, so
/// the submit control's disabled state matches reality instead of being
/// re-enabled while the response is still pending.
pub struct PageController<T, V> {
    transport: T,
    view: Mutex<V>,
    image: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl<T, V> PageController<T, V>
where
    T: Transport,
    V: ControllerView,
{
    pub fn new(transport: T, view: V) -> Self {
        Self {
            transport,
            view: Mutex::new(view),
            image: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Lock the view model. A poisoned lock only ever holds a fully-applied
    /// update, so the inner value is recovered rather than propagated.
    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn image_lock(&self) -> MutexGuard<'_, Option<String>> {
        self.image.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Send `{code, args}` to the render endpoint and apply the outcome to
    /// the view. Returns [`SubmitError::Busy`] while a request is in flight.
    pub async fn submit(&self, code: &str, args_text: &str) -> Result<(), SubmitError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SubmitError::Busy);
        }
        let _release = InFlightGuard {
            flag: &self.in_flight,
        };

        self.view().set_submit_enabled(false);

        let request = RenderRequest::new(args_text, code);
        let outcome = match self.transport.render(&request).await {
            Ok(raw) => RenderOutcome::classify(raw),
            Err(err) => RenderOutcome::Transport(err.to_string()),
        };

        self.apply_outcome(outcome);
        self.view().set_submit_enabled(true);
        Ok(())
    }

    /// Total dispatch: every outcome variant has an explicit view action.
    fn apply_outcome(&self, outcome: RenderOutcome) {
        match outcome {
            RenderOutcome::Image(bytes) => {
                let data_uri = png_data_uri(&bytes);
                {
                    let mut view = self.view();
                    view.set_image_source(&data_uri);
                    view.set_image_popup_visible(true);
                }
                *self.image_lock() = Some(data_uri);
            }
            RenderOutcome::Failure(reason) => self.show_error(&reason),
            RenderOutcome::UnexpectedContentType(content_type) => {
                self.show_error(&format!(
                    "unexpected response content type: {content_type}"
                ));
            }
            RenderOutcome::Transport(message) => {
                self.show_error(&format!("network error: {message}"));
            }
        }
    }

    fn show_error(&self, message: &str) {
        let mut view = self.view();
        view.set_error_text(message);
        view.set_error_popup_visible(true);
    }

    pub fn toggle_image_popup(&self) {
        let mut view = self.view();
        let visible = view.image_popup_visible();
        view.set_image_popup_visible(!visible);
    }

    /// Flip the error popup; when `message` is given it replaces the display
    /// text first.
    pub fn toggle_error_popup(&self, message: Option<&str>) {
        let mut view = self.view();
        if let Some(message) = message {
            view.set_error_text(message);
        }
        let visible = view.error_popup_visible();
        view.set_error_popup_visible(!visible);
    }

    /// Decode the displayed image and save it as `image.png` under `dir`.
    pub fn download_image(&self, dir: &Path) -> Result<PathBuf, DownloadError> {
        let bytes = {
            let image = self.image_lock();
            let data_uri = image.as_deref().ok_or(DownloadError::NothingRendered)?;
            let encoded = data_uri
                .strip_prefix(DATA_URI_PREFIX)
                .ok_or(DownloadError::InvalidDataUri)?;
            BASE64
                .decode(encoded)
                .map_err(|_| DownloadError::InvalidDataUri)?
        };

        let path = dir.join(DOWNLOAD_FILE_NAME);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Fetch the default options template and pre-fill the options input
    /// with its raw text. The input is left untouched when the fetch fails.
    pub async fn load_default_options(&self) -> Result<(), TransportError> {
        let text = self.transport.fetch_default_options().await?;
        self.view().set_options_text(&text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use codeshot_api_types::IMAGE_CONTENT_TYPE;
    use tokio::sync::oneshot;

    use crate::transport::RawResponse;

    use super::*;

    #[derive(Default)]
    struct MockView {
        options_text: String,
        image_source: Option<String>,
        error_text: String,
        image_popup: bool,
        error_popup: bool,
        submit_enabled: bool,
    }

    impl ControllerView for MockView {
        fn set_options_text(&mut self, text: &str) {
            self.options_text = text.to_string();
        }

        fn set_image_source(&mut self, data_uri: &str) {
            self.image_source = Some(data_uri.to_string());
        }

        fn set_error_text(&mut self, message: &str) {
            self.error_text = message.to_string();
        }

        fn set_image_popup_visible(&mut self, visible: bool) {
            self.image_popup = visible;
        }

        fn set_error_popup_visible(&mut self, visible: bool) {
            self.error_popup = visible;
        }

        fn image_popup_visible(&self) -> bool {
            self.image_popup
        }

        fn error_popup_visible(&self) -> bool {
            self.error_popup
        }

        fn set_submit_enabled(&mut self, enabled: bool) {
            self.submit_enabled = enabled;
        }
    }

    struct FixedTransport {
        response: RawResponse,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn render(&self, _request: &RenderRequest) -> Result<RawResponse, TransportError> {
            Ok(self.response.clone())
        }

        async fn fetch_default_options(&self) -> Result<String, TransportError> {
            Ok("{\n  // defaults\n  \"size\": [1, 2]\n}".to_string())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn render(&self, _request: &RenderRequest) -> Result<RawResponse, TransportError> {
            Err(TransportError::Url(url::ParseError::EmptyHost))
        }

        async fn fetch_default_options(&self) -> Result<String, TransportError> {
            Err(TransportError::Url(url::ParseError::EmptyHost))
        }
    }

    /// Blocks the render call until the test releases it.
    struct StalledTransport {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl Transport for StalledTransport {
        async fn render(&self, _request: &RenderRequest) -> Result<RawResponse, TransportError> {
            let gate = self
                .gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(RawResponse {
                content_type: Some(IMAGE_CONTENT_TYPE.to_string()),
                body: vec![1],
            })
        }

        async fn fetch_default_options(&self) -> Result<String, TransportError> {
            Ok(String::new())
        }
    }

    fn image_controller(bytes: &[u8]) -> PageController<FixedTransport, MockView> {
        PageController::new(
            FixedTransport {
                response: RawResponse {
                    content_type: Some(IMAGE_CONTENT_TYPE.to_string()),
                    body: bytes.to_vec(),
                },
            },
            MockView::default(),
        )
    }

    fn failure_controller(body: &[u8]) -> PageController<FixedTransport, MockView> {
        PageController::new(
            FixedTransport {
                response: RawResponse {
                    content_type: Some("application/json".to_string()),
                    body: body.to_vec(),
                },
            },
            MockView::default(),
        )
    }

    #[test]
    fn data_uri_round_trips_awkward_buffer_lengths() {
        for len in [0usize, 1, 2, 3, 4, 5, 7, 100] {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 % 256) as u8).collect();
            let uri = png_data_uri(&bytes);
            let encoded = uri.strip_prefix(DATA_URI_PREFIX).expect("prefix");
            let decoded = BASE64.decode(encoded).expect("valid base64");
            assert_eq!(decoded, bytes, "length {len}");
        }
    }

    #[tokio::test]
    async fn failure_reason_is_displayed_verbatim() {
        let controller = failure_controller(b"{\"reason\": \"bad token\"}");
        controller.submit("code", "{}").await.expect("submit");

        let view = controller.view();
        assert!(view.error_popup);
        assert_eq!(view.error_text, "bad token");
        assert!(!view.image_popup);
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn image_response_sets_a_decodable_data_uri() {
        let bytes = [137u8, 80, 78, 71, 13, 10, 26, 10, 1];
        let controller = image_controller(&bytes);
        controller.submit("code", "{}").await.expect("submit");

        let view = controller.view();
        assert!(view.image_popup);
        assert!(!view.error_popup);
        let source = view.image_source.as_deref().expect("image source");
        let encoded = source.strip_prefix(DATA_URI_PREFIX).expect("prefix");
        assert_eq!(BASE64.decode(encoded).expect("valid base64"), bytes);
    }

    #[tokio::test]
    async fn unexpected_content_type_goes_to_the_error_path() {
        let controller = PageController::new(
            FixedTransport {
                response: RawResponse {
                    content_type: Some("text/plain".to_string()),
                    body: b"hello".to_vec(),
                },
            },
            MockView::default(),
        );
        controller.submit("code", "{}").await.expect("submit");

        let view = controller.view();
        assert!(!view.image_popup);
        assert!(view.error_popup);
        assert!(view.error_text.contains("text/plain"));
    }

    #[tokio::test]
    async fn transport_failure_goes_to_the_error_path() {
        let controller = PageController::new(FailingTransport, MockView::default());
        controller.submit("code", "{}").await.expect("submit");

        let view = controller.view();
        assert!(view.error_popup);
        assert!(view.error_text.starts_with("network error:"));
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn toggling_the_image_popup_twice_restores_visibility() {
        let controller = image_controller(&[1, 2, 3]);
        let initial = controller.view().image_popup;
        controller.toggle_image_popup();
        controller.toggle_image_popup();
        assert_eq!(controller.view().image_popup, initial);
    }

    #[tokio::test]
    async fn download_writes_the_original_bytes() {
        let bytes = [137u8, 80, 78, 71, 0, 1, 2, 3, 4];
        let controller = image_controller(&bytes);
        controller.submit("code", "{}").await.expect("submit");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = controller.download_image(dir.path()).expect("download");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("image.png"));
        assert_eq!(fs::read(&path).expect("read"), bytes);
    }

    #[tokio::test]
    async fn download_before_any_render_is_rejected() {
        let controller = image_controller(&[1]);
        let dir = tempfile::tempdir().expect("tempdir");
        let err = controller.download_image(dir.path()).expect_err("no image");
        assert!(matches!(err, DownloadError::NothingRendered));
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_busy() {
        let (release, gate) = oneshot::channel();
        let controller = Arc::new(PageController::new(
            StalledTransport {
                gate: Mutex::new(Some(gate)),
            },
            MockView::default(),
        ));

        let background = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit("code", "{}").await })
        };

        while !controller.is_pending() {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            controller.submit("code", "{}").await,
            Err(SubmitError::Busy)
        );

        release.send(()).expect("release stalled transport");
        background
            .await
            .expect("join")
            .expect("first submit completes");
        assert!(!controller.is_pending());
        assert!(controller.view().submit_enabled);
    }

    #[tokio::test]
    async fn default_options_prefill_the_options_input() {
        let controller = image_controller(&[1]);
        controller.load_default_options().await.expect("load");
        assert!(controller.view().options_text.contains("// defaults"));
    }

    #[tokio::test]
    async fn failed_default_options_fetch_leaves_the_input_untouched() {
        let controller = PageController::new(FailingTransport, MockView::default());
        assert!(controller.load_default_options().await.is_err());
        assert!(controller.view().options_text.is_empty());
    }
}
