//! Fuzz target for EncryptedContent::decode
//!
//! Feeds arbitrary byte sequences into the TLV codec to find:
//! - Parser crashes or panics
//! - Integer overflows in length arithmetic
//! - Buffer over-reads on truncated composites
//! - Non-minimal length encodings slipping through
//!
//! The fuzzer should NEVER panic. All invalid inputs must return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spanlock_proto::{decode_d_key_content, EncryptedContent};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a single composite and as a D-KEY two-element
    // content; both must reject cleanly.
    let _ = EncryptedContent::decode(data);
    let _ = decode_d_key_content(data);

    // Accepted inputs must re-encode to the identical byte string.
    if let Ok(content) = EncryptedContent::decode(data) {
        assert_eq!(content.to_bytes(), data);
    }
});
