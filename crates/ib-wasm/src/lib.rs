//! WebAssembly bindings for the image blocker
//!
//! The background glue calls `start_background` once at load; the content
//! script glue calls `run_content_guard` at `document_start`.

mod browser;
mod convert;
mod events;
#[cfg(all(test, target_arch = "wasm32"))]
mod fixtures;
mod hosts;

use std::rc::Rc;
use std::sync::Once;

use ib_core::host::{ContextMenus, RequestHook, RuleEngine};
use ib_core::{Blocker, BlockerConfig, ContentGuard, Hosts, StateStore};
use wasm_bindgen::prelude::*;

use crate::browser::ApiRoot;
use crate::hosts::{
    JsAction, JsContextMenus, JsI18n, JsRequestHook, JsRuleEngine, JsScripting, JsStorage, JsTabs,
    WebDocument,
};

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    });
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_config(config: JsValue) -> Result<BlockerConfig, JsValue> {
    let config: BlockerConfig = if config.is_undefined() || config.is_null() {
        BlockerConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))?
    };
    config.validate().map_err(to_js)?;
    Ok(config)
}

/// Start the background context: wire host APIs, register listeners and
/// bring every artifact in line with the stored state.
///
/// Resolves to the current state (`"1"` or `"0"`).
#[wasm_bindgen]
pub async fn start_background(config: JsValue) -> Result<JsValue, JsValue> {
    init_logging();
    if events::blocker().is_some() {
        return Err(JsValue::from_str("Already started. Reload the extension to restart."));
    }

    let config = parse_config(config)?;
    let root = ApiRoot::detect().map_err(to_js)?;
    log::debug!("Extension API calls use {:?} completion", root.style());

    let rule_engine = JsRuleEngine::new(&root);
    let supports_redirect_rules = rule_engine
        .as_ref()
        .map(JsRuleEngine::supports_redirect)
        .unwrap_or(false);
    let request_hook = JsRequestHook::new(&root, config.policy.resource_types, events::evaluate_request);
    let menus = match JsContextMenus::new(&root) {
        Ok(menus) => Some(Rc::new(menus)),
        Err(e) => {
            log::debug!("{}", e);
            None
        }
    };
    let action = Rc::new(JsAction::new(&root).map_err(to_js)?);
    let tabs = Rc::new(JsTabs::new(&root).map_err(to_js)?);

    let hosts = Hosts {
        storage: Rc::new(JsStorage::new(&root).map_err(to_js)?),
        rule_engine: rule_engine.map(|engine| Rc::new(engine) as Rc<dyn RuleEngine>),
        request_hook: request_hook.map(|hook| Rc::new(hook) as Rc<dyn RequestHook>),
        supports_redirect_rules,
        scripting: Rc::new(JsScripting::new(&root).map_err(to_js)?),
        menus: menus.clone().map(|menus| menus as Rc<dyn ContextMenus>),
        action: action.clone(),
        tabs: tabs.clone(),
        i18n: Rc::new(JsI18n::new(&root)),
    };

    let blocker = Rc::new(Blocker::new(config, hosts).map_err(to_js)?);
    events::install_listeners(
        &root,
        action.api(),
        menus.as_ref().map(|menus| menus.api()),
        tabs.api(),
    )?;
    // Published only once listening, so a failed start can be retried
    events::set_blocker(blocker.clone());

    let state = blocker.startup().await.map_err(to_js)?;
    Ok(JsValue::from_str(state.as_wire()))
}

/// Flip the block state, as an icon click does.
#[wasm_bindgen]
pub async fn toggle_blocking() -> Result<JsValue, JsValue> {
    let blocker = events::blocker()
        .ok_or_else(|| JsValue::from_str("Background not started"))?;
    let state = blocker.toggle().await.map_err(to_js)?;
    Ok(JsValue::from_str(state.as_wire()))
}

/// Hide images from the first paint when blocking is on.
///
/// Resolves to whether a style element was inserted.
#[wasm_bindgen]
pub async fn run_content_guard(config: JsValue) -> Result<bool, JsValue> {
    init_logging();
    let config = parse_config(config)?;
    let guard_config = match config.content_guard {
        Some(guard) => guard,
        None => return Ok(false),
    };

    let root = ApiRoot::detect().map_err(to_js)?;
    let storage = Rc::new(JsStorage::new(&root).map_err(to_js)?);
    let store = Rc::new(StateStore::new(storage, config.storage_key));
    let guard = ContentGuard::new(store, guard_config);

    let document = WebDocument::current().map_err(to_js)?;
    guard.run(&document).await.map_err(to_js)
}
