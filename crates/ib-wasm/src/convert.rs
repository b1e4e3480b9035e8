//! Conversions between extension API payloads and core types.

use ib_core::types::{BlockingResponse, StorageChange, Tab, TabUpdate};
use js_sys::{Array, Object};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::browser::{get_i32, get_object, get_string, set};

pub fn tab_from_js(tab: &JsValue) -> Option<Tab> {
    let id = get_i32(tab, "id")?;
    Some(Tab {
        id,
        url: get_string(tab, "url"),
    })
}

pub fn tabs_from_js(tabs: &JsValue) -> Vec<Tab> {
    if !Array::is_array(tabs) {
        return Vec::new();
    }
    tabs.unchecked_ref::<Array>()
        .iter()
        .filter_map(|tab| tab_from_js(&tab))
        .collect()
}

/// `tabs.onUpdated(tabId, changeInfo, tab)` arguments.
pub fn tab_update_from_js(tab_id: &JsValue, change_info: &JsValue, tab: &JsValue) -> Option<TabUpdate> {
    let tab_id = tab_id.as_f64()? as i32;
    let changed_url = get_string(change_info, "url");
    Some(TabUpdate {
        tab_id,
        url_changed: changed_url.is_some(),
        url: changed_url.or_else(|| get_string(tab, "url")),
        status: get_string(change_info, "status"),
    })
}

/// `storage.onChanged(changes, areaName)` payload.
pub fn storage_changes_from_js(changes: &JsValue) -> Vec<StorageChange> {
    let changes = match changes.dyn_ref::<Object>() {
        Some(object) => object,
        None => return Vec::new(),
    };

    Object::keys(changes)
        .iter()
        .filter_map(|key| {
            let key = key.as_string()?;
            let change = get_object(changes, &key)?;
            Some(StorageChange {
                old_value: get_string(&change, "oldValue"),
                new_value: get_string(&change, "newValue"),
                key,
            })
        })
        .collect()
}

/// Owned fields of a `webRequest` details object.
pub struct OwnedRequest {
    pub url: String,
    pub resource_type: String,
}

pub fn request_from_js(details: &JsValue) -> OwnedRequest {
    OwnedRequest {
        url: get_string(details, "url").unwrap_or_default(),
        resource_type: get_string(details, "type").unwrap_or_else(|| "other".to_string()),
    }
}

pub fn blocking_response_to_js(response: BlockingResponse) -> JsValue {
    let object = Object::new();
    set(&object, "cancel", &JsValue::from(response.cancel));
    object.into()
}
