pub mod modal;
pub mod page;
pub mod upload;

use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlFormElement};

use crate::{
    modal::BootstrapDialog,
    page::{BrowserPage, DocumentCookies, Selectors},
};

#[wasm_bindgen(start)]
pub fn start() {
    wasm_logger::init(wasm_logger::Config::default());

    if let Err(error) = run() {
        log::error!("failed to start dashboard script: {:?}", error);
    }
}

fn run() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if !is_loading(&document.ready_state()) {
        return wire(&document);
    }

    let on_ready = Closure::once({
        let document = document.clone();
        move || {
            if let Err(error) = wire(&document) {
                log::error!("failed to wire dashboard: {:?}", error);
            }
        }
    });
    document
        .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
    on_ready.forget();
    Ok(())
}

/// `document.readyState` before `DOMContentLoaded` has fired.
fn is_loading(ready_state: &str) -> bool {
    ready_state == "loading"
}

/// Attaches the modal trigger and the upload form listener to whatever of the
/// dashboard markup is present.
fn wire(document: &Document) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let selectors = Selectors::default();

    let trigger = document.query_selector(selectors.trigger)?;
    match document.get_element_by_id(selectors.modal_id) {
        Some(dialog) => {
            modal::attach(trigger, BootstrapDialog::new(dialog))?;
        }
        None if trigger.is_some() => {
            log::warn!("#{} is missing, upload trigger left unwired", selectors.modal_id);
        }
        None => {}
    }

    let form = match document.get_element_by_id(selectors.form_id) {
        Some(element) => match element.dyn_into::<HtmlFormElement>() {
            Ok(form) => Some(form),
            Err(_) => {
                log::warn!("#{} is not a form", selectors.form_id);
                None
            }
        },
        None => None,
    };
    upload::attach(
        form,
        DocumentCookies::new(document),
        BrowserPage::new(window),
    )?;

    Ok(())
}
