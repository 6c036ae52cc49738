//! User-Agent string for outgoing fetch requests.

/// Default User-Agent for fetch requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_fetch_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("corpus-builder/{version} (corpus-acquisition-tool)")
}
