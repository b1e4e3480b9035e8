//! Toggle orchestration and trigger handling
//!
//! `Blocker` wires the store, the selected blocking mechanism, the presenter
//! and the tab injector together, and exposes one method per trigger: startup,
//! icon or menu click, tab navigation and storage change.
//!
//! Every dependent step re-reads the store instead of receiving the new state
//! by value. Combined with idempotent rule application this lets interleaved
//! sequences converge on the last committed write, and lets a freshly started
//! context catch up from the storage change notification alone.

use std::rc::Rc;

use crate::config::BlockerConfig;
use crate::error::{Error, Result};
use crate::guard::ContentGuard;
use crate::host::{
    ContextMenus, I18n, KeyValueStorage, RequestHook, RuleEngine, Scripting, Tabs, ToolbarAction,
};
use crate::injector::TabCssInjector;
use crate::mechanism::{
    BlockingMechanism, Capabilities, DeclarativeRule, MechanismKind, RequestPredicate,
};
use crate::presentation::{MenuEntry, Presenter};
use crate::store::StateStore;
use crate::types::{BlockState, BlockingResponse, RequestDetails, StorageChange, TabUpdate};

/// Host API implementations available to the background context.
///
/// `rule_engine`, `request_hook` and `menus` are `None` on platforms lacking
/// them.
#[derive(Clone)]
pub struct Hosts {
    pub storage: Rc<dyn KeyValueStorage>,
    pub rule_engine: Option<Rc<dyn RuleEngine>>,
    pub request_hook: Option<Rc<dyn RequestHook>>,
    pub supports_redirect_rules: bool,
    pub scripting: Rc<dyn Scripting>,
    pub menus: Option<Rc<dyn ContextMenus>>,
    pub action: Rc<dyn ToolbarAction>,
    pub tabs: Rc<dyn Tabs>,
    pub i18n: Rc<dyn I18n>,
}

impl Hosts {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            declarative_rules: self.rule_engine.is_some(),
            declarative_redirect: self.rule_engine.is_some() && self.supports_redirect_rules,
            blocking_request_hook: self.request_hook.is_some(),
        }
    }
}

pub struct Blocker {
    config: BlockerConfig,
    store: Rc<StateStore>,
    mechanism: BlockingMechanism,
    presenter: Presenter,
    injector: TabCssInjector,
    tabs: Rc<dyn Tabs>,
}

impl Blocker {
    pub fn new(config: BlockerConfig, hosts: Hosts) -> Result<Self> {
        config.validate()?;

        let (kind, policy) =
            MechanismKind::select(config.mechanism, hosts.capabilities(), &config.policy)?;
        let mechanism = match (kind, &hosts.rule_engine, &hosts.request_hook) {
            (MechanismKind::DeclarativeRule, Some(engine), _) => {
                BlockingMechanism::DeclarativeRule(DeclarativeRule::new(engine.clone(), &policy))
            }
            (MechanismKind::RequestPredicate, _, Some(hook)) => {
                BlockingMechanism::RequestPredicate(RequestPredicate::new(hook.clone(), &policy))
            }
            _ => return Err(Error::NoBlockingMechanism),
        };
        log::info!("Using {:?} for network blocking", kind);

        let store = Rc::new(StateStore::new(hosts.storage.clone(), config.storage_key.clone()));
        let menu = match (&hosts.menus, &config.context_menu) {
            (Some(menus), Some(menu)) => Some(MenuEntry {
                menus: menus.clone(),
                config: menu.clone(),
            }),
            (None, Some(_)) => {
                log::warn!("Context menus unavailable, skipping the toggle entry");
                None
            }
            _ => None,
        };
        let presenter = Presenter::new(
            hosts.action.clone(),
            hosts.i18n.clone(),
            config.icons.clone(),
            menu,
        );
        let injector = TabCssInjector::new(
            store.clone(),
            hosts.scripting.clone(),
            hosts.tabs.clone(),
            config.hide_css.clone(),
            config.privileged_prefixes.clone(),
        );

        Ok(Self {
            config,
            store,
            mechanism,
            presenter,
            injector,
            tabs: hosts.tabs,
        })
    }

    pub fn mechanism(&self) -> &BlockingMechanism {
        &self.mechanism
    }

    /// Page-load guard sharing this blocker's store, if enabled.
    pub fn content_guard(&self) -> Option<ContentGuard> {
        self.config
            .content_guard
            .clone()
            .map(|guard| ContentGuard::new(self.store.clone(), guard))
    }

    /// Extension start: materialize the default, then bring icon, rule, menu
    /// and every open tab in line.
    pub async fn startup(&self) -> Result<BlockState> {
        let state = self.sync().await?;
        self.injector.sync_all_tabs(state).await;
        Ok(state)
    }

    /// Re-read the store and update icon, rule and menu title.
    ///
    /// Only a storage failure is returned; the other steps log and continue.
    pub async fn sync(&self) -> Result<BlockState> {
        let state = self.store.read().await?;

        if let Err(e) = self.presenter.set_icon(state).await {
            log::warn!("Failed to set icon: {}", e);
        }
        if let Err(e) = self.mechanism.apply(state).await {
            log::warn!("Failed to apply blocking for {:?}: {}", state, e);
        }
        if let Err(e) = self.presenter.set_menu_title(state).await {
            log::warn!("Failed to update context menu: {}", e);
        }

        Ok(state)
    }

    /// Icon click: flip and persist the state, sync, then refresh and reload
    /// the active tab so the page re-evaluates under the new rule.
    pub async fn toggle(&self) -> Result<BlockState> {
        let current = self.store.read().await?;
        let next = current.toggled();
        self.store.write(next).await?;
        log::info!("Image blocking {:?} -> {:?}", current, next);

        let state = self.sync().await?;

        match self.tabs.active_tab().await {
            Ok(Some(tab)) => {
                self.injector.apply(tab.id, tab.url.as_deref(), state).await;
                if self.config.reload_active_tab {
                    if let Err(e) = self.tabs.reload(tab.id).await {
                        log::warn!("Failed to reload tab {}: {}", tab.id, e);
                    }
                }
            }
            Ok(None) => log::debug!("No active tab to refresh"),
            Err(e) => log::warn!("Failed to query active tab: {}", e),
        }

        Ok(state)
    }

    /// Context menu click. Clicks on other items are ignored.
    pub async fn on_menu_clicked(&self, menu_item_id: &str) -> Result<Option<BlockState>> {
        if self.presenter.menu_id() != Some(menu_item_id) {
            return Ok(None);
        }
        self.toggle().await.map(Some)
    }

    /// Storage change notification. Returns the re-read state when the change
    /// touched the state key.
    pub async fn on_storage_changed(&self, changes: &[StorageChange]) -> Result<Option<BlockState>> {
        if !self.store.is_relevant(changes) {
            return Ok(None);
        }
        let state = self.sync().await?;
        self.injector.sync_all_tabs(state).await;
        Ok(Some(state))
    }

    /// Tab update event. Updates that aren't navigations are ignored.
    pub async fn on_tab_updated(&self, update: &TabUpdate) -> Result<()> {
        if !update.is_navigation() {
            return Ok(());
        }
        self.injector
            .refresh_tab(update.tab_id, update.url.as_deref())
            .await?;
        Ok(())
    }

    /// Synchronous answer for the legacy request hook.
    pub fn evaluate_request(&self, request: &RequestDetails<'_>) -> BlockingResponse {
        self.mechanism.evaluate(request)
    }

    /// Withdraw network blocking, leaving the stored state untouched.
    pub async fn shutdown(&self) -> Result<()> {
        self.mechanism.teardown().await?;
        Ok(())
    }
}
