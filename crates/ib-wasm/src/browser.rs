//! Access to the extension API root and awaitable calls.

use ib_core::HostError;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// How asynchronous extension calls report completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// Calls return a promise (`browser`, or the polyfill)
    Promise,
    /// Calls take a trailing callback and signal failure through
    /// `runtime.lastError` (`chrome`)
    Callback,
}

/// Extension API namespace root.
///
/// Prefers the cross-browser `browser` object (promise based, also provided
/// by the polyfill) and falls back to `chrome`, driven with callbacks since
/// older `chrome` builds never return promises.
#[derive(Clone)]
pub struct ApiRoot {
    root: Object,
    runtime: Object,
    style: CallStyle,
}

impl ApiRoot {
    pub fn detect() -> Result<Self, HostError> {
        let global = js_sys::global();
        for (name, style) in [("browser", CallStyle::Promise), ("chrome", CallStyle::Callback)] {
            if let Some(root) = get_object(&global, name) {
                if let Ok(root) = Self::new(root, style) {
                    return Ok(root);
                }
            }
        }
        Err(HostError::ApiNotFound("browser/chrome".into()))
    }

    pub fn new(root: Object, style: CallStyle) -> Result<Self, HostError> {
        let runtime =
            get_object(&root, "runtime").ok_or_else(|| HostError::ApiNotFound("runtime".into()))?;
        Ok(Self { root, runtime, style })
    }

    pub fn style(&self) -> CallStyle {
        self.style
    }

    /// First namespace among `names` that exists, e.g. `action` then
    /// `browserAction`.
    pub fn namespace(&self, names: &[&str]) -> Option<Object> {
        names.iter().find_map(|name| get_object(&self.root, name))
    }

    pub fn require(&self, names: &[&str]) -> Result<Object, HostError> {
        self.namespace(names)
            .ok_or_else(|| HostError::ApiNotFound(names.join("|")))
    }

    /// Invoke `api[method](...args)` and wait for its completion.
    pub async fn call_async(&self, api: &Object, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        match self.style {
            CallStyle::Promise => {
                let value = call(api, method, args)?;
                match value.dyn_into::<Promise>() {
                    Ok(promise) => JsFuture::from(promise).await,
                    Err(value) => Ok(value),
                }
            }
            CallStyle::Callback => JsFuture::from(self.callback_promise(api, method, args)).await,
        }
    }

    /// Wrap a callback-style call in a promise, rejecting with
    /// `runtime.lastError` when the host sets it for the callback.
    fn callback_promise(&self, api: &Object, method: &str, args: &[JsValue]) -> Promise {
        let runtime = self.runtime.clone();
        Promise::new(&mut |resolve: Function, reject: Function| {
            let on_reject = reject.clone();
            let runtime = runtime.clone();
            let callback = Closure::once_into_js(move |value: JsValue| {
                let outcome = match get_object(&runtime, "lastError") {
                    Some(error) => reject.call1(&JsValue::UNDEFINED, &error),
                    None => resolve.call1(&JsValue::UNDEFINED, &value),
                };
                if let Err(e) = outcome {
                    log::debug!("Settling callback promise threw: {}", describe(&e));
                }
            });

            let mut call_args = args.to_vec();
            call_args.push(callback);
            if let Err(e) = call(api, method, &call_args) {
                let _ = on_reject.call1(&JsValue::UNDEFINED, &e);
            }
        })
    }
}

/// Object-valued property, if present.
pub fn get_object(target: &JsValue, key: &str) -> Option<Object> {
    Reflect::get(target, &key.into())
        .ok()
        .filter(|value| value.is_object())
        .map(|value| value.unchecked_into::<Object>())
}

pub fn get_string(target: &JsValue, key: &str) -> Option<String> {
    Reflect::get(target, &key.into())
        .ok()
        .and_then(|value| value.as_string())
}

pub fn get_i32(target: &JsValue, key: &str) -> Option<i32> {
    Reflect::get(target, &key.into())
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value as i32)
}

pub fn set(target: &Object, key: &str, value: &JsValue) {
    let _ = Reflect::set(target, &key.into(), value);
}

/// Invoke `api[method](...args)` synchronously.
pub fn call(api: &Object, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(api, &method.into())?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("{} is not a function", method)))?;
    let array: Array = args.iter().collect();
    function.apply(api, &array)
}

/// `event.addListener(callback, ...extra)`
pub fn add_listener(event: &Object, callback: &Function, extra: &[JsValue]) -> Result<(), JsValue> {
    let mut args = Vec::with_capacity(extra.len() + 1);
    args.push(callback.clone().into());
    args.extend_from_slice(extra);
    call(event, "addListener", &args)?;
    Ok(())
}

pub fn remove_listener(event: &Object, callback: &Function) -> Result<(), JsValue> {
    call(event, "removeListener", &[callback.clone().into()])?;
    Ok(())
}

/// Human readable text of a thrown JS value.
pub fn describe(error: &JsValue) -> String {
    if let Some(message) = get_string(error, "message") {
        return message;
    }
    error.as_string().unwrap_or_else(|| format!("{:?}", error))
}
