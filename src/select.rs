use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::dom::{Document, DomEvent, DomEventKind, NodeId, ESCAPE_KEY};
use crate::listeners::Subscription;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption<T> {
    pub value: T,
    pub label: String,
}

impl<T> SelectOption<T> {
    pub fn new(value: T, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

pub type ChangeCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Present only while the menu is open.
struct OpenMenu {
    node: NodeId,
    option_nodes: Vec<NodeId>,
    dismissal: Subscription,
}

struct SelectInner<T> {
    options: Vec<SelectOption<T>>,
    selected: T,
    menu: Option<OpenMenu>,
}

impl<T> SelectInner<T> {
    /// Tear down the open menu: detach the global listeners first, then drop
    /// the menu subtree. Returns false when already closed.
    fn dismiss(&mut self, document: &Document) -> bool {
        let Some(mut menu) = self.menu.take() else {
            return false;
        };
        menu.dismissal.release();
        document.remove_node(menu.node);
        true
    }
}

/// Single-choice dropdown.
///
/// The trigger lives in the document for the widget's whole lifetime. The
/// menu (and its option nodes) exists only while open, together with the
/// document-level pointer-down and Escape listeners that dismiss it.
pub struct SelectWidget<T> {
    document: Document,
    root: NodeId,
    trigger: NodeId,
    inner: Arc<Mutex<SelectInner<T>>>,
    on_change: Option<ChangeCallback<T>>,
}

impl<T> SelectWidget<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Mount a closed widget under `parent` with `initial` selected.
    pub fn new(
        document: &Document,
        parent: NodeId,
        options: Vec<SelectOption<T>>,
        initial: T,
    ) -> Self {
        let root = document.create_node(parent);
        let trigger = document.create_node(root);

        Self {
            document: document.clone(),
            root,
            trigger,
            inner: Arc::new(Mutex::new(SelectInner {
                options,
                selected: initial,
                menu: None,
            })),
            on_change: None,
        }
    }

    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().menu.is_some()
    }

    pub fn selected(&self) -> T {
        self.inner.lock().selected.clone()
    }

    /// Label of the selected option, if the selected value is among the options.
    pub fn selected_label(&self) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .options
            .iter()
            .find(|option| option.value == inner.selected)
            .map(|option| option.label.clone())
    }

    pub fn trigger_node(&self) -> NodeId {
        self.trigger
    }

    pub fn menu_node(&self) -> Option<NodeId> {
        self.inner.lock().menu.as_ref().map(|menu| menu.node)
    }

    pub fn option_node(&self, index: usize) -> Option<NodeId> {
        self.inner
            .lock()
            .menu
            .as_ref()
            .and_then(|menu| menu.option_nodes.get(index).copied())
    }

    pub fn open(&self) {
        let mut inner = self.inner.lock();
        if inner.menu.is_some() {
            return;
        }

        let node = self.document.create_node(self.root);
        let option_nodes = inner
            .options
            .iter()
            .map(|_| self.document.create_node(node))
            .collect();

        inner.menu = Some(OpenMenu {
            node,
            option_nodes,
            dismissal: self.subscribe_dismissal(),
        });
        log::debug!("Select {:?} opened", self.trigger);
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.dismiss(&self.document) {
            log::debug!("Select {:?} closed", self.trigger);
        }
    }

    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Choose `value`, close the menu and notify the owner.
    ///
    /// Membership in the option list is not checked, so options added after
    /// the fact can still be selected.
    pub fn select_option(&self, value: T) {
        {
            let mut inner = self.inner.lock();
            inner.selected = value.clone();
            inner.dismiss(&self.document);
        }
        log::debug!("Select {:?} changed value", self.trigger);

        if let Some(callback) = &self.on_change {
            callback(&value);
        }
    }

    /// Replace the selected value without notifying the owner.
    pub fn set_value(&self, value: T) {
        self.inner.lock().selected = value;
    }

    /// Replace the option list. An open menu re-creates its option nodes.
    pub fn set_options(&self, options: Vec<SelectOption<T>>) {
        let mut inner = self.inner.lock();
        let count = options.len();
        inner.options = options;

        if let Some(menu) = inner.menu.as_mut() {
            for node in menu.option_nodes.drain(..) {
                self.document.remove_node(node);
            }
            menu.option_nodes = (0..count)
                .map(|_| self.document.create_node(menu.node))
                .collect();
        }
    }

    pub fn view(&self) -> SelectView<T> {
        let inner = self.inner.lock();
        let is_open = inner.menu.is_some();

        let trigger = TriggerView {
            node: self.trigger,
            class: if is_open {
                "select-trigger open"
            } else {
                "select-trigger"
            },
            aria_haspopup: "listbox",
            aria_expanded: is_open,
            label: inner
                .options
                .iter()
                .find(|option| option.value == inner.selected)
                .map(|option| option.label.clone())
                .unwrap_or_default(),
        };

        let menu = inner.menu.as_ref().map(|menu| MenuView {
            node: menu.node,
            class: "select-menu",
            role: "listbox",
            options: inner
                .options
                .iter()
                .zip(&menu.option_nodes)
                .map(|(option, node)| {
                    let selected = option.value == inner.selected;
                    OptionView {
                        node: *node,
                        role: "option",
                        aria_selected: selected,
                        class: if selected {
                            "select-option selected"
                        } else {
                            "select-option"
                        },
                        label: option.label.clone(),
                        value: option.value.clone(),
                    }
                })
                .collect(),
        });

        SelectView { trigger, menu }
    }

    fn subscribe_dismissal(&self) -> Subscription {
        let trigger = self.trigger;

        let weak: Weak<Mutex<SelectInner<T>>> = Arc::downgrade(&self.inner);
        let document = self.document.clone();
        let pointer = self.document.add_listener(
            DomEventKind::PointerDown,
            Arc::new(move |event: &DomEvent| {
                let DomEvent::PointerDown { target } = event else {
                    return;
                };
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut inner = inner.lock();
                let Some(menu) = inner.menu.as_ref() else {
                    return;
                };
                if document.contains(menu.node, *target) || document.contains(trigger, *target) {
                    return;
                }
                if inner.dismiss(&document) {
                    log::debug!("Select {:?} dismissed by outside pointer-down", trigger);
                }
            }),
        );

        let weak: Weak<Mutex<SelectInner<T>>> = Arc::downgrade(&self.inner);
        let document = self.document.clone();
        let escape = self.document.add_listener(
            DomEventKind::KeyDown,
            Arc::new(move |event: &DomEvent| {
                let DomEvent::KeyDown { key } = event else {
                    return;
                };
                if key != ESCAPE_KEY {
                    return;
                }
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.lock().dismiss(&document) {
                    log::debug!("Select {:?} dismissed by Escape", trigger);
                }
            }),
        );

        let document = self.document.clone();
        Subscription::new(move || {
            document.remove_listener(pointer);
            document.remove_listener(escape);
        })
    }
}

impl<T> Drop for SelectWidget<T> {
    fn drop(&mut self) {
        self.inner.lock().dismiss(&self.document);
        self.document.remove_node(self.root);
    }
}

impl<T: fmt::Debug> fmt::Debug for SelectWidget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SelectWidget")
            .field("trigger", &self.trigger)
            .field("open", &inner.menu.is_some())
            .field("selected", &inner.selected)
            .field("options", &inner.options.len())
            .finish()
    }
}

/// Observable render of a select widget, including its ARIA attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectView<T> {
    pub trigger: TriggerView,
    pub menu: Option<MenuView<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerView {
    pub node: NodeId,
    pub class: &'static str,
    pub aria_haspopup: &'static str,
    pub aria_expanded: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuView<T> {
    pub node: NodeId,
    pub class: &'static str,
    pub role: &'static str,
    pub options: Vec<OptionView<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView<T> {
    pub node: NodeId,
    pub role: &'static str,
    pub aria_selected: bool,
    pub class: &'static str,
    pub label: String,
    pub value: T,
}
