//! Property tests for cyclic navigation and interval snapping

use proptest::prelude::*;
use signage::Metrics;
use signage::models::{MediaDescriptor, MediaSequence, PlaybackPreferences, SlideInterval};
use signage::services::{EngineSettings, SlideshowEngine};
use std::sync::Arc;
use tokio::time::Instant;

fn sequence(len: usize) -> MediaSequence {
    let items = (0..len)
        .map(|i| {
            if i % 3 == 1 {
                MediaDescriptor::video(format!("m{}", i), format!("/media/{}.mp4", i))
            } else {
                MediaDescriptor::image(format!("m{}", i), format!("/media/{}.jpg", i))
            }
        })
        .collect();
    MediaSequence::new(items).unwrap()
}

fn engine_at(len: usize, start: usize, prefs: &PlaybackPreferences) -> SlideshowEngine {
    let mut engine = SlideshowEngine::new(EngineSettings::default(), Arc::new(Metrics::new()));
    engine.activate(sequence(len), start, prefs, Instant::now());
    engine
}

proptest! {
    #[test]
    fn next_len_times_is_identity(len in 1usize..24, start in 0usize..64) {
        let prefs = PlaybackPreferences::default();
        let mut engine = engine_at(len, start, &prefs);
        let initial = engine.current_index();

        for _ in 0..len {
            engine.go_to_next(&prefs, Instant::now());
        }
        prop_assert_eq!(engine.current_index(), initial);
    }

    #[test]
    fn previous_undoes_next(len in 1usize..24, start in 0usize..24, autoplay in any::<bool>()) {
        let prefs = PlaybackPreferences::new(autoplay, SlideInterval::default());
        let mut engine = engine_at(len, start, &prefs);
        let initial = engine.current_index();

        engine.go_to_next(&prefs, Instant::now());
        engine.go_to_previous(&prefs, Instant::now());
        prop_assert_eq!(engine.current_index(), initial);
    }

    #[test]
    fn index_always_in_range(len in 1usize..16, start in 0usize..100, steps in proptest::collection::vec(any::<bool>(), 0..50)) {
        let prefs = PlaybackPreferences::default();
        let mut engine = engine_at(len, start, &prefs);

        for forward in steps {
            if forward {
                engine.go_to_next(&prefs, Instant::now());
            } else {
                engine.go_to_previous(&prefs, Instant::now());
            }
            let index = engine.current_index().unwrap();
            prop_assert!(index < len);
        }
    }

    #[test]
    fn interval_snaps_into_allowed_set(ms in any::<u64>()) {
        let interval = SlideInterval::from_millis(ms);
        prop_assert!(SlideInterval::options().any(|option| option == interval));
    }
}
