use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A key press as seen by the presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    Escape,
    Char(char),
    Other(String),
}

impl Key {
    /// Parse one line of terminal input.
    ///
    /// Accepts key names (`right`, `ArrowLeft`, `esc`), the raw ANSI arrow
    /// sequences a terminal sends, and single characters.
    pub fn parse(input: &str) -> Key {
        let trimmed = input.trim_end_matches(['\r', '\n']);

        match trimmed {
            "\x1b[C" | "\x1bOC" => return Key::ArrowRight,
            "\x1b[D" | "\x1bOD" => return Key::ArrowLeft,
            "\x1b" => return Key::Escape,
            _ => {}
        }

        let word = trimmed.trim();
        match word.to_ascii_lowercase().as_str() {
            "right" | "arrowright" => Key::ArrowRight,
            "left" | "arrowleft" => Key::ArrowLeft,
            "esc" | "escape" => Key::Escape,
            _ => {
                let mut chars = word.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other(word.to_string()),
                }
            }
        }
    }
}

/// What a key press asks the slideshow to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Next,
    Previous,
    Close,
}

impl InputAction {
    pub fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::ArrowRight => Some(InputAction::Next),
            Key::ArrowLeft => Some(InputAction::Previous),
            Key::Escape => Some(InputAction::Close),
            Key::Char(_) | Key::Other(_) => None,
        }
    }
}

/// Identifier of a registered key listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type KeyListener = Arc<dyn Fn(&Key) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: IndexMap<ListenerId, KeyListener>,
}

/// Process-wide key listener registry.
///
/// Input sources call [`dispatch`](Self::dispatch); controllers register
/// listeners. Clones share the same registry.
#[derive(Clone, Default)]
pub struct KeyboardHub {
    inner: Arc<Mutex<HubInner>>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Key) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.shift_remove(&id).is_some()
    }

    /// Deliver `key` to every listener in registration order.
    ///
    /// Listeners run outside the registry lock, so they may add or remove
    /// listeners themselves. Returns the number of listeners notified.
    pub fn dispatch(&self, key: &Key) -> usize {
        let listeners: Vec<KeyListener> = self.lock().listeners.values().cloned().collect();
        for listener in &listeners {
            listener(key);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

/// Binds one key listener for the lifetime of a presentation.
///
/// Binding again replaces the previous listener instead of stacking a
/// second one. The listener is removed on [`unbind`](Self::unbind) or drop.
pub struct InputController {
    hub: KeyboardHub,
    binding: Option<ListenerId>,
}

impl InputController {
    pub fn new(hub: KeyboardHub) -> Self {
        Self { hub, binding: None }
    }

    pub fn bind<F>(&mut self, on_action: F)
    where
        F: Fn(InputAction) + Send + Sync + 'static,
    {
        if self.unbind() {
            tracing::debug!("Replacing existing key binding");
        }

        let id = self.hub.add_listener(move |key| {
            if let Some(action) = InputAction::from_key(key) {
                on_action(action);
            }
        });
        self.binding = Some(id);
        tracing::debug!("Key listener {:?} bound", id);
    }

    /// Remove the listener. Returns false when nothing was bound.
    pub fn unbind(&mut self) -> bool {
        match self.binding.take() {
            Some(id) => {
                self.hub.remove_listener(id);
                tracing::debug!("Key listener {:?} unbound", id);
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

impl Drop for InputController {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_key_names_and_sequences() {
        assert_eq!(Key::parse("right\n"), Key::ArrowRight);
        assert_eq!(Key::parse("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::parse("\x1b[C"), Key::ArrowRight);
        assert_eq!(Key::parse("\x1b[D\r\n"), Key::ArrowLeft);
        assert_eq!(Key::parse("\x1b"), Key::Escape);
        assert_eq!(Key::parse("ESC"), Key::Escape);
        assert_eq!(Key::parse(" q "), Key::Char('q'));
        assert_eq!(Key::parse("hello"), Key::Other("hello".to_string()));
    }

    #[test]
    fn test_action_mapping() {
        assert_eq!(InputAction::from_key(&Key::ArrowRight), Some(InputAction::Next));
        assert_eq!(InputAction::from_key(&Key::ArrowLeft), Some(InputAction::Previous));
        assert_eq!(InputAction::from_key(&Key::Escape), Some(InputAction::Close));
        assert_eq!(InputAction::from_key(&Key::Char('x')), None);
    }

    #[test]
    fn test_rebinding_does_not_accumulate() {
        let hub = KeyboardHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut controller = InputController::new(hub.clone());

        for _ in 0..3 {
            let hits = hits.clone();
            controller.bind(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(hub.listener_count(), 1);
        hub.dispatch(&Key::ArrowRight);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unbind_and_drop_remove_listener() {
        let hub = KeyboardHub::new();
        let mut controller = InputController::new(hub.clone());
        controller.bind(|_| {});
        assert!(controller.unbind());
        assert!(!controller.unbind());
        assert_eq!(hub.listener_count(), 0);

        {
            let mut scoped = InputController::new(hub.clone());
            scoped.bind(|_| {});
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_unmapped_keys_not_forwarded() {
        let hub = KeyboardHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut controller = InputController::new(hub.clone());
        let counter = hits.clone();
        controller.bind(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hub.dispatch(&Key::Char('z'));
        hub.dispatch(&Key::Other("f5".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        hub.dispatch(&Key::Escape);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
