use std::{future::Future, rc::Rc};

use futures_util::future::{FutureExt, LocalBoxFuture};
use gloo_net::http::Request;
use rda_core::{
    cookie::{CSRF_COOKIE_NAME, CSRF_HEADER_NAME},
    types::UploadResponse,
};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, FormData, HtmlFormElement};

use crate::page::{BrowserPage, CookieStore, DocumentCookies, Page};

/// Shown when the server rejects the upload without saying why.
pub const GENERIC_REJECTION: &str = "Error uploading file.";
/// Shown when no usable response came back at all.
pub const GENERIC_FAILURE: &str = "An error occurred while uploading the file.";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to collect form fields: {0}")]
    Payload(String),
    #[error("request failed: {0}")]
    Network(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("response is not an upload result: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The form being submitted, read at submission time.
pub trait Form {
    type Payload;

    fn action(&self) -> String;
    fn payload(&self) -> Result<Self::Payload, SubmitError>;
}

/// Sends one POST and hands back the raw response body.
pub trait Transport<P> {
    fn post<'a>(
        &'a self,
        url: &'a str,
        csrf_token: Option<&'a str>,
        payload: P,
    ) -> LocalBoxFuture<'a, Result<String, SubmitError>>;
}

/// Events whose default browser action can be suppressed.
pub trait Cancelable {
    fn prevent_default(&self);
}

impl Cancelable for Event {
    fn prevent_default(&self) {
        Event::prevent_default(self)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Reload,
    Alert(String),
}

/// Maps the result of one upload attempt to what the page should do next.
pub fn decide(result: Result<UploadResponse, SubmitError>) -> Outcome {
    match result {
        Ok(resp) if resp.success => Outcome::Reload,
        Ok(resp) => Outcome::Alert(
            resp.error_message()
                .unwrap_or(GENERIC_REJECTION)
                .to_string(),
        ),
        Err(error) => {
            log::error!("failed to upload file: {}", error);
            Outcome::Alert(GENERIC_FAILURE.to_string())
        }
    }
}

pub struct UploadSubmitter<F, C, T, P> {
    form: F,
    cookies: C,
    transport: T,
    page: P,
}

impl<F, C, T, P> UploadSubmitter<F, C, T, P>
where
    F: Form,
    C: CookieStore,
    T: Transport<F::Payload>,
    P: Page,
{
    pub fn new(form: F, cookies: C, transport: T, page: P) -> Self {
        Self {
            form,
            cookies,
            transport,
            page,
        }
    }

    async fn send(&self) -> Result<UploadResponse, SubmitError> {
        let payload = self.form.payload()?;
        let action = self.form.action();
        let csrf_token = self.cookies.get(CSRF_COOKIE_NAME);

        let body = self
            .transport
            .post(&action, csrf_token.as_deref(), payload)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Runs one upload attempt to completion and applies its outcome.
    pub async fn submit(&self) -> Outcome {
        let outcome = decide(self.send().await);
        match &outcome {
            Outcome::Reload => self.page.reload(),
            Outcome::Alert(message) => self.page.alert(message),
        }
        outcome
    }
}

/// Suppresses the native submission right away and returns the upload to run
/// on the event loop. Repeated submits each start their own upload.
pub fn on_submit<E, F, C, T, P>(
    event: &E,
    submitter: Rc<UploadSubmitter<F, C, T, P>>,
) -> impl Future<Output = Outcome>
where
    E: Cancelable,
    F: Form,
    C: CookieStore,
    T: Transport<F::Payload>,
    P: Page,
{
    event.prevent_default();
    async move { submitter.submit().await }
}

pub struct BrowserForm {
    form: HtmlFormElement,
}

impl Form for BrowserForm {
    type Payload = FormData;

    fn action(&self) -> String {
        self.form.action()
    }

    fn payload(&self) -> Result<FormData, SubmitError> {
        FormData::new_with_form(&self.form)
            .map_err(|error| SubmitError::Payload(format!("{:?}", error)))
    }
}

pub struct FetchTransport;

impl Transport<FormData> for FetchTransport {
    fn post<'a>(
        &'a self,
        url: &'a str,
        csrf_token: Option<&'a str>,
        payload: FormData,
    ) -> LocalBoxFuture<'a, Result<String, SubmitError>> {
        async move {
            // the browser fills in the multipart boundary itself
            let mut request = Request::post(url).body(payload);
            if let Some(token) = csrf_token {
                request = request.header(CSRF_HEADER_NAME, token);
            }

            let resp = request
                .send()
                .await
                .map_err(|error| SubmitError::Network(error.to_string()))?;
            resp.text()
                .await
                .map_err(|error| SubmitError::Body(error.to_string()))
        }
        .boxed_local()
    }
}

/// Sends `form` asynchronously instead of letting the browser navigate.
///
/// Returns `Ok(false)` when there is no form to wire.
pub fn attach(
    form: Option<HtmlFormElement>,
    cookies: DocumentCookies,
    page: BrowserPage,
) -> Result<bool, JsValue> {
    let Some(form) = form else {
        log::debug!("upload form not found, submission left to the browser");
        return Ok(false);
    };

    let submitter = Rc::new(UploadSubmitter::new(
        BrowserForm { form: form.clone() },
        cookies,
        FetchTransport,
        page,
    ));
    let on_submit_event = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let upload = on_submit(&event, submitter.clone());
        spawn_local(async move {
            upload.await;
        });
    });
    form.add_event_listener_with_callback("submit", on_submit_event.as_ref().unchecked_ref())?;
    on_submit_event.forget();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::page::fake::{FakePage, RawCookies};

    type Fields = Vec<(String, String)>;

    #[derive(Default)]
    struct FakeForm {
        fields: RefCell<Fields>,
    }

    impl FakeForm {
        fn set(&self, name: &str, value: &str) {
            self.fields
                .borrow_mut()
                .push((name.to_string(), value.to_string()));
        }
    }

    impl Form for FakeForm {
        type Payload = Fields;

        fn action(&self) -> String {
            "/upload/".to_string()
        }

        fn payload(&self) -> Result<Fields, SubmitError> {
            Ok(self.fields.borrow().clone())
        }
    }

    impl Form for Rc<FakeForm> {
        type Payload = Fields;

        fn action(&self) -> String {
            FakeForm::action(self)
        }

        fn payload(&self) -> Result<Fields, SubmitError> {
            FakeForm::payload(self)
        }
    }

    #[derive(Debug, PartialEq)]
    struct SentRequest {
        url: String,
        csrf_token: Option<String>,
        payload: Fields,
    }

    /// Replies with a fixed body, or fails like a dropped connection.
    struct FakeTransport {
        reply: Option<&'static str>,
        sent: RefCell<Vec<SentRequest>>,
    }

    impl FakeTransport {
        fn replying(body: &'static str) -> Self {
            Self {
                reply: Some(body),
                sent: RefCell::default(),
            }
        }

        fn offline() -> Self {
            Self {
                reply: None,
                sent: RefCell::default(),
            }
        }
    }

    impl Transport<Fields> for FakeTransport {
        fn post<'a>(
            &'a self,
            url: &'a str,
            csrf_token: Option<&'a str>,
            payload: Fields,
        ) -> LocalBoxFuture<'a, Result<String, SubmitError>> {
            self.sent.borrow_mut().push(SentRequest {
                url: url.to_string(),
                csrf_token: csrf_token.map(str::to_string),
                payload,
            });
            let reply = self
                .reply
                .map(str::to_string)
                .ok_or_else(|| SubmitError::Network("Failed to fetch".to_string()));
            async move { reply }.boxed_local()
        }
    }

    #[derive(Default)]
    struct FakeEvent {
        prevented: Cell<bool>,
    }

    impl Cancelable for FakeEvent {
        fn prevent_default(&self) {
            self.prevented.set(true);
        }
    }

    fn submitter(
        cookies: &'static str,
        transport: FakeTransport,
    ) -> UploadSubmitter<FakeForm, RawCookies, FakeTransport, FakePage> {
        UploadSubmitter::new(
            FakeForm::default(),
            RawCookies(cookies),
            transport,
            FakePage::default(),
        )
    }

    #[tokio::test]
    async fn success_reloads_without_alert() {
        let submitter = submitter("", FakeTransport::replying(r#"{"success": true}"#));

        assert_eq!(submitter.submit().await, Outcome::Reload);
        assert_eq!(*submitter.page.reloads.borrow(), 1);
        assert!(submitter.page.alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn rejection_shows_server_message() {
        let submitter = submitter(
            "",
            FakeTransport::replying(r#"{"success": false, "error": "File too large"}"#),
        );

        submitter.submit().await;
        assert_eq!(*submitter.page.alerts.borrow(), vec!["File too large"]);
        assert_eq!(*submitter.page.reloads.borrow(), 0);
    }

    #[tokio::test]
    async fn rejection_without_message_uses_fallback() {
        let submitter = submitter("", FakeTransport::replying(r#"{"success": false}"#));

        submitter.submit().await;
        assert_eq!(*submitter.page.alerts.borrow(), vec![GENERIC_REJECTION]);
        assert_eq!(*submitter.page.reloads.borrow(), 0);
    }

    #[tokio::test]
    async fn network_failure_shows_generic_alert() {
        let submitter = submitter("", FakeTransport::offline());

        submitter.submit().await;
        assert_eq!(*submitter.page.alerts.borrow(), vec![GENERIC_FAILURE]);
        assert_eq!(*submitter.page.reloads.borrow(), 0);
    }

    #[tokio::test]
    async fn non_json_body_is_a_transport_failure() {
        let submitter = submitter("", FakeTransport::replying("<html>Server Error</html>"));

        assert_eq!(
            submitter.submit().await,
            Outcome::Alert(GENERIC_FAILURE.to_string())
        );
        assert_eq!(*submitter.page.reloads.borrow(), 0);
    }

    #[tokio::test]
    async fn token_travels_as_header_when_present() {
        let submitter = submitter(
            "csrftoken=abc123; sessionid=xyz",
            FakeTransport::replying(r#"{"success": true}"#),
        );

        submitter.submit().await;
        let sent = submitter.transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "/upload/");
        assert_eq!(sent[0].csrf_token.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn no_token_without_cookie() {
        let submitter = submitter(
            "sessionid=xyz",
            FakeTransport::replying(r#"{"success": true}"#),
        );

        submitter.submit().await;
        assert_eq!(submitter.transport.sent.borrow()[0].csrf_token, None);
    }

    #[tokio::test]
    async fn payload_is_read_at_submission() {
        let form = Rc::new(FakeForm::default());
        let submitter = UploadSubmitter::new(
            form.clone(),
            RawCookies(""),
            FakeTransport::replying(r#"{"success": true}"#),
            FakePage::default(),
        );

        form.set("name", "launch 3");
        form.set("description", "second stage");
        submitter.submit().await;

        assert_eq!(
            submitter.transport.sent.borrow()[0].payload,
            vec![
                ("name".to_string(), "launch 3".to_string()),
                ("description".to_string(), "second stage".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn submit_event_is_always_cancelled() {
        let submitter = Rc::new(submitter("", FakeTransport::offline()));
        let event = FakeEvent::default();

        let upload = on_submit(&event, submitter.clone());
        assert!(event.prevented.get());
        assert_eq!(submitter.transport.sent.borrow().len(), 0);

        upload.await;
        assert_eq!(submitter.transport.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn repeated_submits_each_send() {
        let submitter = Rc::new(submitter("", FakeTransport::replying(r#"{"success": true}"#)));

        let first = on_submit(&FakeEvent::default(), submitter.clone());
        let second = on_submit(&FakeEvent::default(), submitter.clone());
        first.await;
        second.await;

        assert_eq!(submitter.transport.sent.borrow().len(), 2);
        assert_eq!(*submitter.page.reloads.borrow(), 2);
    }
}
