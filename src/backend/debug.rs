/// Log target of every call routed through [`DebugApi`].
///
/// Enable with `RUST_LOG=multipass_ngin::api=trace` to also see results.
pub const API_LOG_TARGET: &str = "multipass_ngin::api";

/// Logging decorator around a [`GraphicsApi`](super::GraphicsApi).
///
/// Each call is logged at `debug` with its arguments, forwarded unchanged and
/// its result logged at `trace`. The forwarding impl is generated next to the
/// trait itself.
#[derive(Debug)]
pub struct DebugApi<A> {
    pub(super) inner: A,
}

impl<A> DebugApi<A> {
    pub fn new(inner: A) -> Self {
        log::info!(target: API_LOG_TARGET, "graphics API call logging enabled");
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}
