//! Maps `Box<dyn Error>` from the `Device` trait boundary to a typed `DispenseError`.
//!
//! Transport stacks wrap the interesting part (refused, DNS, timeout) a few
//! levels down the `source()` chain, so the whole chain is folded into the
//! reason string.

use crate::error::DispenseError;

/// Map a device-call failure to `DispenseError::Unreachable`.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> DispenseError {
    DispenseError::Unreachable(describe_chain(e))
}

/// `outer: inner: innermost`, skipping causes already contained in the text so far.
pub fn describe_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut cause = e.source();
    while let Some(c) = cause {
        let msg = c.to_string();
        if !msg.is_empty() && !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        cause = c.source();
    }
    out
}
