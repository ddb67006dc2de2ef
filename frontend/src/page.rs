use rda_core::cookie::get_cookie;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlDocument, Window};

/// Where the dashboard markup puts the pieces the script wires together.
#[derive(Clone, Copy, Debug)]
pub struct Selectors {
    pub modal_id: &'static str,
    pub trigger: &'static str,
    pub form_id: &'static str,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            modal_id: "uploadModal",
            trigger: ".btn-success",
            form_id: "uploadForm",
        }
    }
}

/// Page level effects a handler may ask for.
pub trait Page {
    /// Blocks with a message until the user dismisses it.
    fn alert(&self, message: &str);
    fn reload(&self);
}

pub struct BrowserPage {
    window: Window,
}

impl BrowserPage {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Page for BrowserPage {
    fn alert(&self, message: &str) {
        if let Err(error) = self.window.alert_with_message(message) {
            log::error!("failed to show alert: {:?}", error);
        }
    }

    fn reload(&self) {
        if let Err(error) = self.window.location().reload() {
            log::error!("failed to reload page: {:?}", error);
        }
    }
}

pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads `document.cookie` fresh on every lookup.
pub struct DocumentCookies {
    document: HtmlDocument,
}

impl DocumentCookies {
    pub fn new(document: &Document) -> Self {
        // `cookie` lives on HTMLDocument in web-sys but on Document in the DOM
        Self {
            document: document.clone().unchecked_into(),
        }
    }
}

impl CookieStore for DocumentCookies {
    fn get(&self, name: &str) -> Option<String> {
        let raw = match self.document.cookie() {
            Ok(raw) => raw,
            Err(error) => {
                log::error!("failed to read cookies: {:?}", error);
                return None;
            }
        };
        get_cookie(&raw, name)
    }
}
