//! Stack safety for recursive descent and AST walks.
//!
//! Nested parentheses and blocks recurse once per level. Wrapping those
//! entry points grows the stack on demand instead of overflowing it.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 100 * 1024; // 100KB

/// Size of each additional stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024; // 1MB

/// Run `f`, first growing the stack if it is close to exhausted.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
