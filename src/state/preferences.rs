use crate::config::{PreferenceStore, PreferencesError};
use crate::models::{AUTOPLAY_KEY, INTERVAL_KEY, PlaybackPreferences, SlideInterval};
use serde_yaml_ng::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Owner of the playback preferences shared by the settings UI and the engine.
///
/// Loaded once from a [`PreferenceStore`] when the viewer mounts. Changes are
/// published on a watch channel first and then written back under the
/// `isSliding` / `slidingTime` keys, so a failing store never blocks the
/// running slideshow from seeing the new value.
///
/// Clones share the same store and channel.
#[derive(Clone)]
pub struct PreferencesManager {
    store: Arc<Mutex<Box<dyn PreferenceStore>>>,
    tx: Arc<watch::Sender<PlaybackPreferences>>,
}

impl PreferencesManager {
    /// Read both keys from `store`, falling back to `defaults` per key.
    pub fn load(store: Box<dyn PreferenceStore>, defaults: PlaybackPreferences) -> Self {
        let autoplay_enabled = match store.get(AUTOPLAY_KEY) {
            Some(value) => decode_bool(&value).unwrap_or_else(|| {
                tracing::warn!("Ignoring invalid {} value {:?}", AUTOPLAY_KEY, value);
                defaults.autoplay_enabled
            }),
            None => defaults.autoplay_enabled,
        };

        let interval = match store.get(INTERVAL_KEY) {
            Some(value) => decode_millis(&value)
                .map(SlideInterval::from_millis)
                .unwrap_or_else(|| {
                    tracing::warn!("Ignoring invalid {} value {:?}", INTERVAL_KEY, value);
                    defaults.interval
                }),
            None => defaults.interval,
        };

        let prefs = PlaybackPreferences::new(autoplay_enabled, interval);
        tracing::info!(
            "Loaded playback preferences: autoplay={}, interval={}ms",
            prefs.autoplay_enabled,
            prefs.interval.as_millis()
        );

        let (tx, _) = watch::channel(prefs);
        Self {
            store: Arc::new(Mutex::new(store)),
            tx: Arc::new(tx),
        }
    }

    pub fn current(&self) -> PlaybackPreferences {
        *self.tx.borrow()
    }

    /// Receiver that observes every future change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackPreferences> {
        self.tx.subscribe()
    }

    pub fn set_autoplay(&self, enabled: bool) -> Result<PlaybackPreferences, PreferencesError> {
        self.update(|prefs| prefs.autoplay_enabled = enabled)
    }

    pub fn toggle_autoplay(&self) -> Result<PlaybackPreferences, PreferencesError> {
        self.update(|prefs| prefs.autoplay_enabled = !prefs.autoplay_enabled)
    }

    pub fn set_interval(&self, interval: SlideInterval) -> Result<PlaybackPreferences, PreferencesError> {
        self.update(|prefs| prefs.interval = interval)
    }

    /// Apply `update_fn`, publish the result, then persist the changed keys.
    ///
    /// The whole read-modify-write runs under the store lock, so concurrent
    /// updates from clones are serialised and the store always ends up with
    /// the last published value. On a store error the new value stays
    /// published and the error is returned so the caller can report it.
    /// `update_fn` must not call back into the manager.
    pub fn update<F>(&self, update_fn: F) -> Result<PlaybackPreferences, PreferencesError>
    where
        F: FnOnce(&mut PlaybackPreferences),
    {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        let old = self.current();
        let mut new = old;
        update_fn(&mut new);

        if new == old {
            return Ok(new);
        }

        self.tx.send_replace(new);
        tracing::info!(
            "Playback preferences changed: autoplay={}, interval={}ms",
            new.autoplay_enabled,
            new.interval.as_millis()
        );

        if old.autoplay_enabled != new.autoplay_enabled {
            store.set(AUTOPLAY_KEY, Value::Bool(new.autoplay_enabled))?;
        }
        if old.interval != new.interval {
            store.set(INTERVAL_KEY, Value::from(new.interval.as_millis()))?;
        }

        Ok(new)
    }
}

fn decode_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
