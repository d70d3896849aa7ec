//! Property tests for the long-break rule.

use chrono::Utc;
use pomotrack_core::timer::break_after;
use pomotrack_core::{Phase, Settings, TimerMachine};
use proptest::prelude::*;

proptest! {
    #[test]
    fn long_break_iff_multiple_of_cycles(count in 0u32..10_000, cycles in 1u32..=10) {
        let expected = if count > 0 && count % cycles == 0 {
            Phase::LongBreak
        } else {
            Phase::Break
        };
        prop_assert_eq!(break_after(count, cycles), expected);
    }

    #[test]
    fn machine_follows_rule(cycles in 1u32..=10, rounds in 1usize..25) {
        let settings = Settings {
            work_duration: 1,
            break_duration: 1,
            long_break_duration: 1,
            cycles_until_long_break: cycles,
            ..Settings::default()
        };
        let mut machine = TimerMachine::new(settings);
        let now = Utc::now();

        for _ in 0..rounds {
            // Work then whichever break follows.
            for _ in 0..2 {
                let was_work = machine.phase() == Phase::Work;
                machine.toggle(now);
                while machine.tick(now).is_none() {}
                if was_work {
                    let n = machine.completed_work_count();
                    let expected = if n % cycles == 0 { Phase::LongBreak } else { Phase::Break };
                    prop_assert_eq!(machine.phase(), expected);
                } else {
                    prop_assert_eq!(machine.phase(), Phase::Work);
                }
            }
        }
        prop_assert_eq!(machine.completed_work_count() as usize, rounds);
    }
}
