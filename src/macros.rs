//! Small crate-wide convenience macros.
//!
//! Console output goes through `web_sys::console` in the browser.  Native
//! builds (unit tests) cannot call into JS, so the same macros fall back to
//! `eprintln!` there.

/// Debug-only console logging.  Compiled out of release builds.
///
/// ```rust,ignore
/// debug_log!("opened event stream for {}", job_id);
/// ```
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            $crate::macros::console_log(&format!($($arg)*));
        }
    };
}

/// Warning routed to `console.warn`.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::macros::console_warn(&format!($($arg)*))
    };
}

/// Error routed to `console.error`.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::macros::console_error(&format!($($arg)*))
    };
}

#[doc(hidden)]
pub fn console_log(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&msg.into());
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("[debug] {}", msg);
}

#[doc(hidden)]
pub fn console_warn(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&msg.into());
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("[warn] {}", msg);
}

#[doc(hidden)]
pub fn console_error(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&msg.into());
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("[error] {}", msg);
}
