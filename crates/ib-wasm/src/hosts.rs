//! Host trait implementations over the extension APIs.

use std::cell::RefCell;

use async_trait::async_trait;
use ib_core::error::HostError;
use ib_core::host::{
    ContextMenus, I18n, KeyValueStorage, PageDocument, RequestHook, RuleEngine, Scripting, Tabs,
    ToolbarAction,
};
use ib_core::rule::UpdateRuleOptions;
use ib_core::types::{ResourceTypes, Tab};
use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::browser::{
    add_listener, call, describe, get_i32, get_object, get_string, remove_listener, set, ApiRoot,
};
use crate::convert::tabs_from_js;

fn object() -> Object {
    Object::new()
}

/// Text of a stored value. Only `undefined`/`null` count as unset; any other
/// non-string value comes back as its debug text, which no state matches.
fn stored_text(value: &JsValue) -> Option<String> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    Some(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

fn string_array<S: AsRef<str>>(values: &[S]) -> Array {
    values.iter().map(|value| JsValue::from_str(value.as_ref())).collect()
}

// =============================================================================
// Storage
// =============================================================================

/// `storage.local`
pub struct JsStorage {
    root: ApiRoot,
    local: Object,
}

impl JsStorage {
    pub fn new(root: &ApiRoot) -> Result<Self, HostError> {
        let storage = root.require(&["storage"])?;
        let local = get_object(&storage, "local")
            .ok_or_else(|| HostError::ApiNotFound("storage.local".into()))?;
        Ok(Self {
            root: root.clone(),
            local,
        })
    }
}

#[async_trait(?Send)]
impl KeyValueStorage for JsStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, HostError> {
        let result = self
            .root
            .call_async(&self.local, "get", &[JsValue::from_str(key)])
            .await
            .map_err(|e| HostError::Storage(describe(&e)))?;
        let value = Reflect::get(&result, &key.into()).unwrap_or(JsValue::UNDEFINED);
        Ok(stored_text(&value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), HostError> {
        let items = object();
        set(&items, key, &JsValue::from_str(value));
        self.root
            .call_async(&self.local, "set", &[items.into()])
            .await
            .map_err(|e| HostError::Storage(describe(&e)))?;
        Ok(())
    }
}

// =============================================================================
// Declarative rules
// =============================================================================

/// `declarativeNetRequest` dynamic rules
pub struct JsRuleEngine {
    root: ApiRoot,
    api: Object,
}

impl JsRuleEngine {
    pub fn new(root: &ApiRoot) -> Option<Self> {
        root.namespace(&["declarativeNetRequest"])
            .map(|api| Self {
                root: root.clone(),
                api,
            })
    }

    /// Does the engine advertise `redirect` actions?
    pub fn supports_redirect(&self) -> bool {
        get_object(&self.api, "RuleActionType")
            .map(|types| get_string(&types, "REDIRECT").is_some())
            .unwrap_or(false)
    }
}

#[async_trait(?Send)]
impl RuleEngine for JsRuleEngine {
    async fn dynamic_rule_ids(&self) -> Result<Vec<u32>, HostError> {
        let rules = self
            .root
            .call_async(&self.api, "getDynamicRules", &[])
            .await
            .map_err(|e| HostError::Rules(describe(&e)))?;
        if !Array::is_array(&rules) {
            return Ok(Vec::new());
        }
        Ok(rules
            .unchecked_into::<Array>()
            .iter()
            .filter_map(|rule| get_i32(&rule, "id"))
            .map(|id| id as u32)
            .collect())
    }

    async fn update_dynamic_rules(&self, options: UpdateRuleOptions) -> Result<(), HostError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let options = options
            .serialize(&serializer)
            .map_err(|e| HostError::Rules(e.to_string()))?;
        self.root
            .call_async(&self.api, "updateDynamicRules", &[options])
            .await
            .map_err(|e| HostError::Rules(describe(&e)))?;
        Ok(())
    }
}

// =============================================================================
// Request hook
// =============================================================================

/// Blocking `webRequest.onBeforeRequest` listener.
///
/// The listener forwards every request to `handler`, which answers with a
/// `{cancel}` object.
pub struct JsRequestHook {
    event: Object,
    types: Vec<&'static str>,
    handler: fn(JsValue) -> JsValue,
    listener: RefCell<Option<Closure<dyn FnMut(JsValue) -> JsValue>>>,
}

impl JsRequestHook {
    pub fn new(root: &ApiRoot, types: ResourceTypes, handler: fn(JsValue) -> JsValue) -> Option<Self> {
        let web_request = root.namespace(&["webRequest"])?;
        let event = get_object(&web_request, "onBeforeRequest")?;
        Some(Self {
            event,
            types: types.names(),
            handler,
            listener: RefCell::new(None),
        })
    }
}

impl RequestHook for JsRequestHook {
    fn install(&self) -> Result<(), HostError> {
        if self.is_installed() {
            return Ok(());
        }
        let handler = self.handler;
        let closure = Closure::<dyn FnMut(JsValue) -> JsValue>::new(move |details| handler(details));

        let filter = object();
        set(&filter, "urls", &string_array(&["<all_urls>"]));
        set(&filter, "types", &string_array(&self.types));
        add_listener(
            &self.event,
            closure.as_ref().unchecked_ref::<Function>(),
            &[filter.into(), string_array(&["blocking"]).into()],
        )
        .map_err(|e| HostError::RequestHook(describe(&e)))?;

        *self.listener.borrow_mut() = Some(closure);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), HostError> {
        if let Some(closure) = self.listener.borrow_mut().take() {
            remove_listener(&self.event, closure.as_ref().unchecked_ref::<Function>())
                .map_err(|e| HostError::RequestHook(describe(&e)))?;
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.listener.borrow().is_some()
    }
}

// =============================================================================
// Scripting
// =============================================================================

enum CssApi {
    /// `scripting.insertCSS({target, css})`
    Scripting(Object),
    /// `tabs.insertCSS(tabId, {code})` on platforms without `scripting`
    Tabs(Object),
}

pub struct JsScripting {
    root: ApiRoot,
    api: CssApi,
}

impl JsScripting {
    pub fn new(root: &ApiRoot) -> Result<Self, HostError> {
        if let Some(scripting) = root.namespace(&["scripting"]) {
            return Ok(Self {
                root: root.clone(),
                api: CssApi::Scripting(scripting),
            });
        }
        let tabs = root.require(&["tabs"])?;
        Ok(Self {
            root: root.clone(),
            api: CssApi::Tabs(tabs),
        })
    }

    async fn call_css(&self, method: &str, tab_id: i32, css: &str) -> Result<(), HostError> {
        let result = match &self.api {
            CssApi::Scripting(api) => {
                let target = object();
                set(&target, "tabId", &JsValue::from(tab_id));
                let details = object();
                set(&details, "target", &target);
                set(&details, "css", &JsValue::from_str(css));
                self.root.call_async(api, method, &[details.into()]).await
            }
            CssApi::Tabs(api) => {
                let details = object();
                set(&details, "code", &JsValue::from_str(css));
                self.root
                    .call_async(api, method, &[JsValue::from(tab_id), details.into()])
                    .await
            }
        };
        result.map(|_| ()).map_err(|e| HostError::Scripting(describe(&e)))
    }
}

#[async_trait(?Send)]
impl Scripting for JsScripting {
    async fn insert_css(&self, tab_id: i32, css: &str) -> Result<(), HostError> {
        self.call_css("insertCSS", tab_id, css).await
    }

    async fn remove_css(&self, tab_id: i32, css: &str) -> Result<(), HostError> {
        self.call_css("removeCSS", tab_id, css).await
    }
}

// =============================================================================
// Context menus
// =============================================================================

/// `contextMenus` (or Firefox `menus`)
pub struct JsContextMenus {
    root: ApiRoot,
    api: Object,
}

impl JsContextMenus {
    pub fn new(root: &ApiRoot) -> Result<Self, HostError> {
        Ok(Self {
            root: root.clone(),
            api: root.require(&["contextMenus", "menus"])?,
        })
    }

    pub fn api(&self) -> &Object {
        &self.api
    }
}

#[async_trait(?Send)]
impl ContextMenus for JsContextMenus {
    async fn create(&self, id: &str, title: &str, contexts: &[String]) -> Result<(), HostError> {
        let properties = object();
        set(&properties, "id", &JsValue::from_str(id));
        set(&properties, "title", &JsValue::from_str(title));
        set(&properties, "contexts", &string_array(contexts));
        // Returns the id synchronously, not a promise
        call(&self.api, "create", &[properties.into()])
            .map_err(|e| HostError::Menus(describe(&e)))?;
        Ok(())
    }

    async fn update(&self, id: &str, title: &str) -> Result<(), HostError> {
        let properties = object();
        set(&properties, "title", &JsValue::from_str(title));
        self.root
            .call_async(&self.api, "update", &[JsValue::from_str(id), properties.into()])
            .await
            .map_err(|e| HostError::Menus(describe(&e)))?;
        Ok(())
    }
}

// =============================================================================
// Action
// =============================================================================

/// `action` (MV3) or `browserAction` (MV2)
pub struct JsAction {
    root: ApiRoot,
    api: Object,
}

impl JsAction {
    pub fn new(root: &ApiRoot) -> Result<Self, HostError> {
        Ok(Self {
            root: root.clone(),
            api: root.require(&["action", "browserAction"])?,
        })
    }

    pub fn api(&self) -> &Object {
        &self.api
    }
}

#[async_trait(?Send)]
impl ToolbarAction for JsAction {
    async fn set_icon(&self, path: &str) -> Result<(), HostError> {
        let details = object();
        set(&details, "path", &JsValue::from_str(path));
        self.root
            .call_async(&self.api, "setIcon", &[details.into()])
            .await
            .map_err(|e| HostError::Action(describe(&e)))?;
        Ok(())
    }
}

// =============================================================================
// Tabs
// =============================================================================

pub struct JsTabs {
    root: ApiRoot,
    api: Object,
}

impl JsTabs {
    pub fn new(root: &ApiRoot) -> Result<Self, HostError> {
        Ok(Self {
            root: root.clone(),
            api: root.require(&["tabs"])?,
        })
    }

    pub fn api(&self) -> &Object {
        &self.api
    }

    async fn query(&self, query: Object) -> Result<Vec<Tab>, HostError> {
        let tabs = self
            .root
            .call_async(&self.api, "query", &[query.into()])
            .await
            .map_err(|e| HostError::Tabs(describe(&e)))?;
        Ok(tabs_from_js(&tabs))
    }
}

#[async_trait(?Send)]
impl Tabs for JsTabs {
    async fn active_tab(&self) -> Result<Option<Tab>, HostError> {
        let query = object();
        set(&query, "active", &JsValue::TRUE);
        set(&query, "currentWindow", &JsValue::TRUE);
        Ok(self.query(query).await?.into_iter().next())
    }

    async fn all_tabs(&self) -> Result<Vec<Tab>, HostError> {
        self.query(object()).await
    }

    async fn reload(&self, tab_id: i32) -> Result<(), HostError> {
        self.root
            .call_async(&self.api, "reload", &[JsValue::from(tab_id)])
            .await
            .map_err(|e| HostError::Tabs(describe(&e)))?;
        Ok(())
    }
}

// =============================================================================
// I18n
// =============================================================================

pub struct JsI18n {
    api: Option<Object>,
}

impl JsI18n {
    pub fn new(root: &ApiRoot) -> Self {
        Self {
            api: root.namespace(&["i18n"]),
        }
    }
}

impl I18n for JsI18n {
    fn message(&self, key: &str) -> Option<String> {
        let api = self.api.as_ref()?;
        call(api, "getMessage", &[JsValue::from_str(key)])
            .ok()
            .and_then(|value| value.as_string())
    }
}

// =============================================================================
// Document
// =============================================================================

pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn current() -> Result<Self, HostError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| HostError::Document("no document".into()))?;
        Ok(Self { document })
    }
}

impl PageDocument for WebDocument {
    fn has_element(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn insert_style(&self, id: &str, css: &str) -> Result<(), HostError> {
        let style = self
            .document
            .create_element("style")
            .map_err(|e| HostError::Document(describe(&e)))?;
        style.set_id(id);
        style.set_text_content(Some(css));

        // <head> may not exist yet at document_start
        let parent: web_sys::Node = match self.document.head() {
            Some(head) => head.into(),
            None => self
                .document
                .document_element()
                .ok_or_else(|| HostError::Document("no document element".into()))?
                .into(),
        };
        parent
            .append_child(&style)
            .map_err(|e| HostError::Document(describe(&e)))?;
        Ok(())
    }
}
