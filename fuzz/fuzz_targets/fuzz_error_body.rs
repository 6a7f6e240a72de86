#![no_main]

use libfuzzer_sys::fuzz_target;

use jobtrack::api::{extract_message, ErrorField};

fuzz_target!(|body: &str| {
    for field in [ErrorField::Message, ErrorField::MessageOrText, ErrorField::Error] {
        if let Some(message) = extract_message(body, field) {
            assert!(!message.is_empty());
        }
    }
});
