//! Fuzz target for Name::decode and the URI parser.
//!
//! The fuzzer should NEVER panic. All invalid inputs must return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spanlock_proto::Name;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = Name::decode(data) {
        // Wire round-trip is exact for accepted inputs.
        assert_eq!(name.encode(), data);
    }

    if let Ok(uri) = std::str::from_utf8(data) {
        let _ = Name::from_uri(uri);
    }
});
