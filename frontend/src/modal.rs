use wasm_bindgen::prelude::*;
use web_sys::{Element, Event};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = bootstrap, js_name = Modal)]
    type ToolkitModal;

    #[wasm_bindgen(
        static_method_of = ToolkitModal,
        js_namespace = bootstrap,
        js_class = "Modal",
        js_name = getOrCreateInstance,
        catch
    )]
    fn get_or_create_instance(element: &Element) -> Result<ToolkitModal, JsValue>;

    #[wasm_bindgen(method)]
    fn show(this: &ToolkitModal);
}

/// Something that can be shown as a modal. Open/closed state stays with the
/// implementation.
pub trait Dialog {
    fn open(&self);
}

/// A dialog element driven by Bootstrap's modal plugin.
pub struct BootstrapDialog {
    element: Element,
}

impl BootstrapDialog {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

impl Dialog for BootstrapDialog {
    fn open(&self) {
        match ToolkitModal::get_or_create_instance(&self.element) {
            Ok(modal) => modal.show(),
            Err(error) => log::error!("failed to create modal: {:?}", error),
        }
    }
}

pub struct ModalTrigger<D> {
    dialog: D,
}

impl<D: Dialog> ModalTrigger<D> {
    pub fn new(dialog: D) -> Self {
        Self { dialog }
    }

    pub fn clicked(&self) {
        self.dialog.open();
    }
}

/// Opens `dialog` on every click of `trigger`.
///
/// Returns `Ok(false)` without touching the page when there is no trigger.
pub fn attach<D>(trigger: Option<Element>, dialog: D) -> Result<bool, JsValue>
where
    D: Dialog + 'static,
{
    let Some(trigger) = trigger else {
        log::debug!("upload trigger not found, modal left unwired");
        return Ok(false);
    };

    let modal_trigger = ModalTrigger::new(dialog);
    let on_click = Closure::<dyn FnMut(Event)>::new(move |_: Event| modal_trigger.clicked());
    trigger.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    // the listener lives as long as the page
    on_click.forget();
    Ok(true)
}
