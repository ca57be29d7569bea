//! Property-based tests for the playback engine and sequencer
//!
//! Uses proptest to check invariants across random operation sequences.

mod common;

use common::engine_with_track;
use proptest::prelude::*;
use std::collections::HashSet;
use tonearm_playback::{
    bitrate, Completion, CompletionKind, CompletionOutcome, EngineState, PlaylistSequencer,
    TrackHandle,
};

#[derive(Debug, Clone)]
enum Op {
    Play,
    Pause,
    Resume,
    Stop,
    Seek(f64),
    Render(f64),
    Tick,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Play),
        Just(Op::Pause),
        Just(Op::Resume),
        Just(Op::Stop),
        (-50.0f64..400.0).prop_map(Op::Seek),
        (0.0f64..120.0).prop_map(Op::Render),
        Just(Op::Tick),
    ]
}

fn tracks(count: usize) -> Vec<TrackHandle> {
    (0..count)
        .map(|i| TrackHandle::from_path(format!("/music/{i}.ogg")))
        .collect()
}

proptest! {
    /// Property: position stays within [0, duration] after every operation
    #[test]
    fn position_stays_within_track(
        duration in 1.0f64..300.0,
        ops in prop::collection::vec(arbitrary_op(), 1..60)
    ) {
        let mut engine = engine_with_track(duration);

        for op in ops {
            match op {
                Op::Play => { engine.play().unwrap(); }
                Op::Pause => engine.pause(),
                Op::Resume => { engine.resume().unwrap(); }
                Op::Stop => engine.stop(),
                Op::Seek(target) => { engine.seek(target).unwrap(); }
                Op::Render(seconds) => engine.render_mut().advance(seconds),
                Op::Tick => engine.tick(),
            }

            let session = engine.session();
            prop_assert!(session.position_seconds >= 0.0);
            prop_assert!(session.position_seconds <= session.duration_seconds);
            prop_assert!(session.seek_offset_seconds >= 0.0);
        }
    }

    /// Property: play-from-stopped and in-range seeks advance the generation by exactly one;
    /// pause, stop and polling never move it
    #[test]
    fn generation_advances_exactly_once_per_schedule(
        ops in prop::collection::vec(arbitrary_op(), 1..60)
    ) {
        let duration = 200.0;
        let mut engine = engine_with_track(duration);

        for op in ops {
            let before = engine.generation().value();
            let state = engine.state();

            match &op {
                Op::Play => { engine.play().unwrap(); }
                Op::Pause => engine.pause(),
                Op::Resume => { engine.resume().unwrap(); }
                Op::Stop => engine.stop(),
                Op::Seek(target) => { engine.seek(*target).unwrap(); }
                Op::Render(seconds) => engine.render_mut().advance(*seconds),
                Op::Tick => engine.tick(),
            }

            let bump = engine.generation().value() - before;
            match op {
                Op::Play | Op::Resume => match state {
                    EngineState::Stopped => prop_assert_eq!(bump, 1),
                    EngineState::Playing => prop_assert_eq!(bump, 0),
                    // Paused resumes in place or reschedules once
                    _ => prop_assert!(bump <= 1),
                },
                Op::Seek(target) => {
                    prop_assert_eq!(bump, u64::from((0.0..duration).contains(&target)));
                }
                Op::Pause | Op::Stop | Op::Render(_) | Op::Tick => prop_assert_eq!(bump, 0),
            }
        }
    }

    /// Property: a completion from any earlier generation has no effect
    #[test]
    fn stale_completions_have_no_effect(seeks in prop::collection::vec(0.0f64..99.0, 1..20)) {
        let mut engine = engine_with_track(100.0);
        let mut sequencer = PlaylistSequencer::with_seed(3);
        sequencer.add_many(tracks(3));

        engine.play().unwrap();
        let mut stale = vec![engine.generation()];
        for target in seeks {
            engine.seek(target).unwrap();
            stale.push(engine.generation());
        }
        stale.pop();

        let session = engine.session().clone();
        for generation in stale {
            let completion = Completion { generation, kind: CompletionKind::EndOfMedia };
            prop_assert_eq!(
                engine.handle_completion(completion, &mut sequencer),
                CompletionOutcome::Stale
            );
        }
        prop_assert_eq!(engine.session(), &session);
        prop_assert_eq!(sequencer.current_index(), None);
    }

    /// Property: shuffle without repeat visits every track exactly once, then ends
    #[test]
    fn shuffle_visits_each_track_once(count in 1usize..40, seed in any::<u64>()) {
        let mut sequencer = PlaylistSequencer::with_seed(seed);
        sequencer.add_many(tracks(count));
        sequencer.set_shuffle(true);
        sequencer.select(0);

        let mut seen = HashSet::from([0]);
        for _ in 1..count {
            let index = sequencer.next();
            prop_assert!(index.is_some());
            prop_assert!(seen.insert(index.unwrap()));
        }

        prop_assert_eq!(seen.len(), count);
        prop_assert_eq!(sequencer.next(), None);
    }

    /// Property: shuffle with repeat never runs out and never returns an invalid index
    #[test]
    fn shuffle_repeat_continues_indefinitely(count in 1usize..20, steps in 1usize..200, seed in any::<u64>()) {
        let mut sequencer = PlaylistSequencer::with_seed(seed);
        sequencer.add_many(tracks(count));
        sequencer.set_shuffle(true);
        sequencer.set_repeat(true);

        for _ in 0..steps {
            let index = sequencer.next();
            prop_assert!(matches!(index, Some(i) if i < count));
            let order: HashSet<usize> = sequencer.shuffle_order().iter().copied().collect();
            prop_assert_eq!(order.len(), count);
        }
    }

    /// Property: removals keep the current index valid
    #[test]
    fn removal_keeps_current_index_valid(
        count in 1usize..30,
        selected in 0usize..30,
        removals in prop::collection::vec(0usize..30, 1..30)
    ) {
        let mut sequencer = PlaylistSequencer::with_seed(1);
        sequencer.add_many(tracks(count));
        sequencer.select(selected % count);

        for index in removals {
            sequencer.remove(index);
            match sequencer.current_index() {
                Some(current) => prop_assert!(current < sequencer.len()),
                None => prop_assert!(sequencer.is_empty()),
            }
        }
    }

    /// Property: snapped bitrates are ladder values below the lossless threshold
    #[test]
    fn snapped_bitrate_is_on_ladder(raw in 1.0f64..499.9) {
        let snapped = bitrate::snap_to_ladder(
            raw,
            &bitrate::LOSSY_BITRATE_LADDER,
            bitrate::LOSSLESS_THRESHOLD_KBPS,
        );
        prop_assert!(bitrate::LOSSY_BITRATE_LADDER.contains(&snapped));
    }
}
