//! Property tests over keypad entry and the completion rule.

mod common;

use common::rig;
use dispenser_core::{CycleEvent, InputBuffer, Key, MAX_INPUT_LEN, SystemState};
use dispenser_hardware::SimConfig;
use proptest::prelude::*;

fn entry_key() -> impl Strategy<Value = char> {
    prop_oneof![
        8 => proptest::char::range('0', '9'),
        2 => Just('.'),
        1 => Just('A'),
        1 => Just('*'),
    ]
}

proptest! {
    #[test]
    fn buffer_never_exceeds_six_or_holds_two_points(keys in proptest::collection::vec(entry_key(), 0..20)) {
        let mut b = InputBuffer::new();
        for k in keys {
            if k == '*' {
                b.clear();
            } else {
                b.push(Key::from(k));
            }
            prop_assert!(b.len() <= MAX_INPUT_LEN);
            prop_assert!(b.as_str().matches('.').count() <= 1);
        }
    }

    #[test]
    fn finalized_digits_set_the_parsed_target(digits in "[0-9]{1,6}") {
        let mut r = rig(&format!("{digits}#"), SimConfig::default());
        let events = r.run_until(100, |e| matches!(e, CycleEvent::TargetAccepted { .. } | CycleEvent::InputRejected));
        let value: f32 = digits.parse().unwrap();
        if value > 0.0 {
            prop_assert_eq!(r.core.state(), SystemState::Zeroing);
            prop_assert_eq!(r.core.target_g(), Some(value));
        } else {
            prop_assert_eq!(r.core.state(), SystemState::Input);
            prop_assert_eq!(r.core.target_g(), None);
            prop_assert_eq!(events.last().map(|(_, e)| *e), Some(CycleEvent::InputRejected));
        }
        prop_assert_eq!(r.core.entry(), "");
    }

    #[test]
    fn cancel_always_leaves_an_empty_prompt(prefix in "[0-9.]{0,8}") {
        let mut r = rig(&format!("{prefix}*"), SimConfig::default());
        r.run_until(200, |e| *e == CycleEvent::InputCancelled);
        prop_assert_eq!(r.core.entry(), "");
        prop_assert_eq!(r.core.state(), SystemState::Input);
        prop_assert_eq!(r.lcd_row(0), "Target (g):");
        prop_assert_eq!(r.lcd_row(1), "");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn finishes_exactly_when_reading_reaches_target(target in 1u32..900, rate in 20.0f32..200.0) {
        let keys = target.to_string() + "#";
        let mut r = rig(&keys, SimConfig { flow_rate_gps: rate, ..SimConfig::default() });
        r.run_until(10_000, |e| *e == CycleEvent::TareComplete);
        #[allow(clippy::cast_precision_loss)]
        let target_g = target as f32;
        let mut fine_seen = false;
        while r.core.state() == SystemState::Dispensing {
            let before = r.core.current_g();
            prop_assert!(before < target_g);
            match r.step() {
                Some(CycleEvent::Completed { final_g }) => prop_assert!(final_g >= target_g),
                _ => prop_assert!(r.core.current_g() < target_g || r.core.state() != SystemState::Dispensing),
            }
            // Fine mode never reverts within the cycle.
            prop_assert!(!fine_seen || r.core.fine_enabled() || r.core.state() != SystemState::Dispensing);
            fine_seen |= r.core.fine_enabled();
        }
        prop_assert_eq!(r.core.state(), SystemState::Finished);
    }
}

#[test]
fn rejected_entry_keeps_the_controller_usable() {
    let mut r = rig("0.0#7#", SimConfig::default());
    let events = r.run_until(200, |e| matches!(e, CycleEvent::TargetAccepted { .. }));
    assert!(events.iter().any(|(_, e)| *e == CycleEvent::InputRejected));
    assert_eq!(r.core.target_g(), Some(7.0));
}
