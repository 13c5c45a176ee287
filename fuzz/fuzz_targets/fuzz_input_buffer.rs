#![no_main]
use dispenser_core::{InputBuffer, Key, MAX_INPUT_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let mut buf = InputBuffer::new();
    for c in data.chars() {
        match Key::from(c) {
            Key::Cancel => buf.clear(),
            Key::Enter => {
                if let Some(g) = buf.parse_target() {
                    assert!(g.is_finite() && g > 0.0);
                }
                buf.clear();
            }
            key => {
                buf.push(key);
            }
        }
        assert!(buf.len() <= MAX_INPUT_LEN);
        assert!(buf.as_str().matches('.').count() <= 1);
    }
});
