//! Rate-limited warning silencer
//!
//! A dangling previous-document pointer can be observed by every read of a
//! hot node. The silencer keeps the log readable: for a given key the
//! warning passes through at most once per window; repeats inside the
//! window are suppressed.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;

/// Window for the missing-previous-document warning.
pub const MISSING_PREVIOUS_WARN_WINDOW_MS: i64 = 60_000;

static PREVIOUS_DOC_SILENCER: OnceLock<WarnSilencer> = OnceLock::new();

/// Per-key rate limiter for repeated warnings.
#[derive(Debug)]
pub struct WarnSilencer {
    window_ms: i64,
    last_logged: Mutex<HashMap<String, i64>>,
}

impl WarnSilencer {
    /// Creates a silencer with the given suppression window.
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            last_logged: Mutex::new(HashMap::new()),
        }
    }

    /// True iff a warning for `key` should be emitted at `now_ms`.
    /// Recording and deciding are one atomic step.
    pub fn should_log(&self, key: &str, now_ms: i64) -> bool {
        let mut last_logged = self.last_logged.lock();
        match last_logged.get(key) {
            Some(last) if now_ms - last < self.window_ms => false,
            _ => {
                last_logged.insert(key.to_string(), now_ms);
                // drop expired entries so the map stays bounded
                let window = self.window_ms;
                last_logged.retain(|_, at| now_ms - *at < window);
                true
            }
        }
    }
}

/// The process-wide silencer for missing-previous-document warnings.
/// Initialised once, never replaced.
pub fn previous_doc_silencer() -> &'static WarnSilencer {
    PREVIOUS_DOC_SILENCER.get_or_init(|| WarnSilencer::new(MISSING_PREVIOUS_WARN_WINDOW_MS))
}
