/// Classification for retry policy.
///
/// Tells callers how to respond to an error returned by the client. The
/// client itself never retries beyond its single session-refresh recovery,
/// so any backoff loop across calls is the caller's responsibility.
///
/// # Behavior Summary
///
/// | Class | Caller may retry? | Same request could succeed later? |
/// |-------|-------------------|-----------------------------------|
/// | `Never` | No | No (bad input, missing entity, schema change) |
/// | `WithBackoff` | Yes, after a delay | Yes (network, timeout, anti-bot block) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad input, unknown entity, or a response the parser
    /// cannot map. Retrying the identical request won't help.
    Never,

    /// Retry later with exponential backoff.
    ///
    /// Used for connectivity failures (including timeouts and upstream 5xx)
    /// and for anti-bot rejections that persisted through a session refresh.
    WithBackoff,
}
