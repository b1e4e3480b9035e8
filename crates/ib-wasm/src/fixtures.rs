//! JS objects standing in for extension namespaces in binding tests.

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub fn object(entries: &[(&str, JsValue)]) -> Object {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &(*key).into(), value).unwrap();
    }
    object
}

fn invoke(callback: &JsValue, value: &JsValue) {
    callback
        .unchecked_ref::<Function>()
        .call1(&JsValue::UNDEFINED, value)
        .unwrap();
}

/// `storage.local` that only reports through callbacks, backed by `data`.
pub fn callback_storage(data: &Object) -> Object {
    let get_data = data.clone();
    let get = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |_keys: JsValue, callback: JsValue| {
        let items = Object::assign(&Object::new(), &get_data);
        invoke(&callback, &items);
    });

    let set_data = data.clone();
    let set = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |items: JsValue, callback: JsValue| {
        Object::assign(&set_data, items.unchecked_ref());
        invoke(&callback, &JsValue::UNDEFINED);
    });

    // Returns nothing, as callback-only hosts do
    object(&[("get", get.into_js_value()), ("set", set.into_js_value())])
}

/// Callback-style root exposing `runtime` and `storage.local`.
pub fn callback_root(data: &Object) -> Object {
    let storage = object(&[("local", callback_storage(data).into())]);
    object(&[("runtime", object(&[]).into()), ("storage", storage.into())])
}
