//! Test harness for the spanlock engines.
//!
//! [`SimFace`] is an in-memory named-data fabric: a directory of published
//! data objects answered with real selector matching (prefix, exclude,
//! rightmost child), plus scripting hooks for the failure modes the engines
//! must survive (stale cached responses, nacks, timeouts, delegation-only
//! reachability).
//!
//! [`GroupFixture`] plays the out-of-scope group-manager role: it mints the
//! group keypairs, publishes E-KEY instances for every hierarchy node, wraps
//! D-KEYs for enrolled consumers, and republishes producer C-KEYs under the
//! names consumers fetch them by.

#![forbid(unsafe_code)]

mod fixture;
mod sim_face;

pub use fixture::GroupFixture;
pub use sim_face::SimFace;

/// Install a tracing subscriber for test output, once per process.
///
/// Filter with `RUST_LOG` as usual; repeated calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
