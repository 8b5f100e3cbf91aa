//! Shared utility functions

use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate a string to a display width, appending `…` when something was cut.
///
/// Width is measured in terminal columns, so CJK and emoji count as two.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Best-effort text for a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

thread_local! {
    static CONTAINING_PANIC: Cell<bool> = const { Cell::new(false) };
}

/// Run `f`, turning a panic into an `Err` with the payload.
///
/// While `f` runs, [`is_containing_panic`] returns true on this thread so the
/// terminal panic hook can leave the screen alone.
pub fn contain_panic<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let outer = CONTAINING_PANIC.with(|flag| flag.replace(true));
    let result = catch_unwind(AssertUnwindSafe(f));
    CONTAINING_PANIC.with(|flag| flag.set(outer));
    result
}

/// True while the current thread is inside [`contain_panic`]
pub fn is_containing_panic() -> bool {
    CONTAINING_PANIC.with(|flag| flag.get())
}
