//! Background listeners
//!
//! Each host event spawns an independent local task against the shared
//! blocker. Listeners live for the lifetime of the context, so their closures
//! are leaked with `forget`.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use ib_core::{Blocker, RequestDetails};
use js_sys::{Function, Object};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::browser::{add_listener, get_object, get_string, ApiRoot};
use crate::convert::{
    blocking_response_to_js, request_from_js, storage_changes_from_js, tab_update_from_js,
};

thread_local! {
    static BLOCKER: RefCell<Option<Rc<Blocker>>> = const { RefCell::new(None) };
}

pub fn set_blocker(blocker: Rc<Blocker>) {
    BLOCKER.with(|cell| *cell.borrow_mut() = Some(blocker));
}

pub fn blocker() -> Option<Rc<Blocker>> {
    BLOCKER.with(|cell| cell.borrow().clone())
}

/// Run `task` against the blocker on a local task, logging its failure.
fn spawn_with_blocker<F, Fut>(label: &'static str, task: F)
where
    F: FnOnce(Rc<Blocker>) -> Fut + 'static,
    Fut: Future<Output = ib_core::error::Result<()>> + 'static,
{
    let blocker = match blocker() {
        Some(blocker) => blocker,
        None => {
            log::warn!("{} fired before the blocker was started", label);
            return;
        }
    };
    spawn_local(async move {
        if let Err(e) = task(blocker).await {
            log::error!("{} failed: {}", label, e);
        }
    });
}

/// Synchronous handler for the blocking request hook.
pub fn evaluate_request(details: JsValue) -> JsValue {
    let request = request_from_js(&details);
    let response = blocker()
        .map(|blocker| {
            blocker.evaluate_request(&RequestDetails {
                url: &request.url,
                resource_type: &request.resource_type,
            })
        })
        .unwrap_or_default();
    blocking_response_to_js(response)
}

fn event(namespace: &Object, name: &str) -> Result<Object, JsValue> {
    get_object(namespace, name).ok_or_else(|| JsValue::from_str(&format!("Missing event {}", name)))
}

fn listen<F>(event: &Object, callback: Closure<F>) -> Result<(), JsValue>
where
    F: ?Sized + wasm_bindgen::closure::WasmClosure,
{
    add_listener(event, callback.as_ref().unchecked_ref::<Function>(), &[])?;
    callback.forget();
    Ok(())
}

/// Register every trigger: icon click, menu click, tab update, storage change
/// and install/update.
///
/// All events are resolved before the first registration, so a missing one
/// leaves nothing half registered.
pub fn install_listeners(root: &ApiRoot, action: &Object, menus: Option<&Object>, tabs: &Object) -> Result<(), JsValue> {
    let storage = root.require(&["storage"]).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let runtime = root.require(&["runtime"]).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let on_action_clicked = event(action, "onClicked")?;
    let on_menu_clicked = menus.map(|menus| event(menus, "onClicked")).transpose()?;
    let on_tab_updated = event(tabs, "onUpdated")?;
    let on_storage_changed = event(&storage, "onChanged")?;
    let on_installed = event(&runtime, "onInstalled")?;

    listen(
        &on_action_clicked,
        Closure::<dyn FnMut(JsValue)>::new(|_tab: JsValue| {
            spawn_with_blocker("Toggle", |blocker| async move {
                blocker.toggle().await.map(|_| ())
            });
        }),
    )?;

    if let Some(on_menu_clicked) = on_menu_clicked {
        listen(
            &on_menu_clicked,
            Closure::<dyn FnMut(JsValue)>::new(|info: JsValue| {
                let menu_item_id = get_string(&info, "menuItemId").unwrap_or_default();
                spawn_with_blocker("Menu click", move |blocker| async move {
                    blocker.on_menu_clicked(&menu_item_id).await.map(|_| ())
                });
            }),
        )?;
    }

    listen(
        &on_tab_updated,
        Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
            |tab_id: JsValue, change_info: JsValue, tab: JsValue| {
                let update = match tab_update_from_js(&tab_id, &change_info, &tab) {
                    Some(update) => update,
                    None => return,
                };
                spawn_with_blocker("Tab update", move |blocker| async move {
                    blocker.on_tab_updated(&update).await
                });
            },
        ),
    )?;

    listen(
        &on_storage_changed,
        Closure::<dyn FnMut(JsValue, JsValue)>::new(|changes: JsValue, area: JsValue| {
            if area.as_string().as_deref() != Some("local") {
                return;
            }
            let changes = storage_changes_from_js(&changes);
            spawn_with_blocker("Storage change", move |blocker| async move {
                blocker.on_storage_changed(&changes).await.map(|_| ())
            });
        }),
    )?;

    listen(
        &on_installed,
        Closure::<dyn FnMut(JsValue)>::new(|details: JsValue| {
            let reason = get_string(&details, "reason").unwrap_or_default();
            log::info!("Extension installed ({})", reason);
            spawn_with_blocker("Install", |blocker| async move {
                blocker.startup().await.map(|_| ())
            });
        }),
    )?;

    Ok(())
}
