//! In-memory host fakes for unit tests.
//!
//! Every async call yields once before touching state so that concurrently
//! driven sequences interleave the way they do at real host suspension points.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use async_trait::async_trait;

use crate::blocker::Hosts;
use crate::error::HostError;
use crate::host::{
    ContextMenus, I18n, KeyValueStorage, PageDocument, RequestHook, RuleEngine, Scripting, Tabs,
    ToolbarAction,
};
use crate::rule::{NetworkRule, UpdateRuleOptions};
use crate::types::{StorageChange, Tab};

async fn suspend() {
    tokio::task::yield_now().await;
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
    changes: RefCell<Vec<StorageChange>>,
    failing: Cell<bool>,
}

impl MemoryStorage {
    pub fn with_value(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage.values.borrow_mut().insert(key.to_string(), value.to_string());
        storage
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Drain the change notifications raised so far.
    pub fn take_changes(&self) -> Vec<StorageChange> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }
}

#[async_trait(?Send)]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, HostError> {
        suspend().await;
        if self.failing.get() {
            return Err(HostError::Storage("storage offline".into()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), HostError> {
        suspend().await;
        if self.failing.get() {
            return Err(HostError::Storage("storage offline".into()));
        }
        let old_value = self
            .values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.changes.borrow_mut().push(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
        });
        Ok(())
    }
}

// =============================================================================
// Declarative rules
// =============================================================================

#[derive(Default)]
pub struct MemoryRuleEngine {
    rules: RefCell<Vec<NetworkRule>>,
    updates: Cell<usize>,
}

impl MemoryRuleEngine {
    pub fn rules(&self) -> Vec<NetworkRule> {
        self.rules.borrow().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.get()
    }
}

#[async_trait(?Send)]
impl RuleEngine for MemoryRuleEngine {
    async fn dynamic_rule_ids(&self) -> Result<Vec<u32>, HostError> {
        suspend().await;
        Ok(self.rules.borrow().iter().map(|rule| rule.id).collect())
    }

    async fn update_dynamic_rules(&self, options: UpdateRuleOptions) -> Result<(), HostError> {
        suspend().await;
        self.updates.set(self.updates.get() + 1);

        let mut rules = self.rules.borrow_mut();
        let mut next: Vec<NetworkRule> = rules
            .iter()
            .filter(|rule| !options.remove_rule_ids.contains(&rule.id))
            .cloned()
            .collect();
        for rule in options.add_rules {
            if next.iter().any(|existing| existing.id == rule.id) {
                // Host rejects the whole update
                return Err(HostError::Rules(format!("Rule with id {} already exists", rule.id)));
            }
            next.push(rule);
        }
        *rules = next;
        Ok(())
    }
}

// =============================================================================
// Request hook
// =============================================================================

#[derive(Default)]
pub struct FakeRequestHook {
    installed: Cell<bool>,
    installs: Cell<usize>,
}

impl FakeRequestHook {
    pub fn install_count(&self) -> usize {
        self.installs.get()
    }
}

impl RequestHook for FakeRequestHook {
    fn install(&self) -> Result<(), HostError> {
        self.installed.set(true);
        self.installs.set(self.installs.get() + 1);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), HostError> {
        self.installed.set(false);
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed.get()
    }
}

// =============================================================================
// Scripting
// =============================================================================

#[derive(Default)]
pub struct MemoryScripting {
    injected: RefCell<BTreeMap<i32, String>>,
    failing_tabs: RefCell<BTreeSet<i32>>,
    calls: Cell<usize>,
}

impl MemoryScripting {
    pub fn is_injected(&self, tab_id: i32) -> bool {
        self.injected.borrow().contains_key(&tab_id)
    }

    pub fn css_for(&self, tab_id: i32) -> Option<String> {
        self.injected.borrow().get(&tab_id).cloned()
    }

    /// Make every call targeting `tab_id` fail, like a closed tab.
    pub fn fail_tab(&self, tab_id: i32) {
        self.failing_tabs.borrow_mut().insert(tab_id);
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl Scripting for MemoryScripting {
    async fn insert_css(&self, tab_id: i32, css: &str) -> Result<(), HostError> {
        suspend().await;
        self.calls.set(self.calls.get() + 1);
        if self.failing_tabs.borrow().contains(&tab_id) {
            return Err(HostError::Scripting(format!("No tab with id: {}", tab_id)));
        }
        self.injected.borrow_mut().insert(tab_id, css.to_string());
        Ok(())
    }

    async fn remove_css(&self, tab_id: i32, _css: &str) -> Result<(), HostError> {
        suspend().await;
        self.calls.set(self.calls.get() + 1);
        if self.failing_tabs.borrow().contains(&tab_id) {
            return Err(HostError::Scripting(format!("No tab with id: {}", tab_id)));
        }
        self.injected.borrow_mut().remove(&tab_id);
        Ok(())
    }
}

// =============================================================================
// Context menus
// =============================================================================

#[derive(Default)]
pub struct MemoryMenus {
    items: RefCell<HashMap<String, String>>,
    creates: Cell<usize>,
}

impl MemoryMenus {
    pub fn title(&self, id: &str) -> Option<String> {
        self.items.borrow().get(id).cloned()
    }

    pub fn item_count(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn create_count(&self) -> usize {
        self.creates.get()
    }

    /// Forget every item, as a host restart does.
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

#[async_trait(?Send)]
impl ContextMenus for MemoryMenus {
    async fn create(&self, id: &str, title: &str, _contexts: &[String]) -> Result<(), HostError> {
        suspend().await;
        let mut items = self.items.borrow_mut();
        if items.contains_key(id) {
            return Err(HostError::Menus(format!("Cannot create item with duplicate id {}", id)));
        }
        items.insert(id.to_string(), title.to_string());
        self.creates.set(self.creates.get() + 1);
        Ok(())
    }

    async fn update(&self, id: &str, title: &str) -> Result<(), HostError> {
        suspend().await;
        match self.items.borrow_mut().get_mut(id) {
            Some(existing) => {
                *existing = title.to_string();
                Ok(())
            }
            None => Err(HostError::Menus(format!("Cannot find menu item with id {}", id))),
        }
    }
}

// =============================================================================
// Action, tabs, i18n, document
// =============================================================================

#[derive(Default)]
pub struct MemoryAction {
    icon: RefCell<Option<String>>,
}

impl MemoryAction {
    pub fn icon(&self) -> Option<String> {
        self.icon.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ToolbarAction for MemoryAction {
    async fn set_icon(&self, path: &str) -> Result<(), HostError> {
        suspend().await;
        *self.icon.borrow_mut() = Some(path.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTabs {
    tabs: RefCell<Vec<Tab>>,
    active: Cell<Option<i32>>,
    reloads: RefCell<Vec<i32>>,
}

impl MemoryTabs {
    pub fn open(&self, id: i32, url: &str) {
        self.tabs.borrow_mut().push(Tab {
            id,
            url: Some(url.to_string()),
        });
    }

    pub fn activate(&self, id: i32) {
        self.active.set(Some(id));
    }

    pub fn reloads(&self) -> Vec<i32> {
        self.reloads.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Tabs for MemoryTabs {
    async fn active_tab(&self) -> Result<Option<Tab>, HostError> {
        suspend().await;
        let active = match self.active.get() {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(self.tabs.borrow().iter().find(|tab| tab.id == active).cloned())
    }

    async fn all_tabs(&self) -> Result<Vec<Tab>, HostError> {
        suspend().await;
        Ok(self.tabs.borrow().clone())
    }

    async fn reload(&self, tab_id: i32) -> Result<(), HostError> {
        suspend().await;
        self.reloads.borrow_mut().push(tab_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticI18n {
    messages: HashMap<String, String>,
}

impl StaticI18n {
    pub fn with(mut self, key: &str, message: &str) -> Self {
        self.messages.insert(key.to_string(), message.to_string());
        self
    }
}

impl I18n for StaticI18n {
    fn message(&self, key: &str) -> Option<String> {
        self.messages.get(key).cloned()
    }
}

#[derive(Default)]
pub struct FakeDocument {
    styles: RefCell<Vec<(String, String)>>,
}

impl FakeDocument {
    pub fn styles(&self) -> Vec<(String, String)> {
        self.styles.borrow().clone()
    }
}

impl PageDocument for FakeDocument {
    fn has_element(&self, id: &str) -> bool {
        self.styles.borrow().iter().any(|(style_id, _)| style_id == id)
    }

    fn insert_style(&self, id: &str, css: &str) -> Result<(), HostError> {
        self.styles.borrow_mut().push((id.to_string(), css.to_string()));
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A full set of fakes wired into [`Hosts`].
pub struct Harness {
    pub storage: Rc<MemoryStorage>,
    pub rules: Rc<MemoryRuleEngine>,
    pub hook: Rc<FakeRequestHook>,
    pub scripting: Rc<MemoryScripting>,
    pub menus: Rc<MemoryMenus>,
    pub action: Rc<MemoryAction>,
    pub tabs: Rc<MemoryTabs>,
    pub i18n: Rc<StaticI18n>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::default())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        Self {
            storage: Rc::new(storage),
            rules: Rc::new(MemoryRuleEngine::default()),
            hook: Rc::new(FakeRequestHook::default()),
            scripting: Rc::new(MemoryScripting::default()),
            menus: Rc::new(MemoryMenus::default()),
            action: Rc::new(MemoryAction::default()),
            tabs: Rc::new(MemoryTabs::default()),
            i18n: Rc::new(
                StaticI18n::default()
                    .with("context_menu_block", "Block images")
                    .with("context_menu_unblock", "Show images"),
            ),
        }
    }

    /// Hosts of a platform with the declarative rule engine.
    pub fn declarative_hosts(&self) -> Hosts {
        Hosts {
            rule_engine: Some(self.rules.clone()),
            request_hook: None,
            supports_redirect_rules: true,
            ..self.base_hosts()
        }
    }

    /// Hosts of a legacy platform with only blocking request hooks.
    pub fn legacy_hosts(&self) -> Hosts {
        Hosts {
            rule_engine: None,
            request_hook: Some(self.hook.clone()),
            supports_redirect_rules: false,
            ..self.base_hosts()
        }
    }

    fn base_hosts(&self) -> Hosts {
        Hosts {
            storage: self.storage.clone(),
            rule_engine: None,
            request_hook: None,
            supports_redirect_rules: false,
            scripting: self.scripting.clone(),
            menus: Some(self.menus.clone()),
            action: self.action.clone(),
            tabs: self.tabs.clone(),
            i18n: self.i18n.clone(),
        }
    }
}
