use thiserror::Error;

/// Errors reported by the reference [`Component`](super::Component) runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A hook call landed on a slot created by a different kind of hook.
    #[error("hook {index} changed between renders (expected {expected})")]
    HookMismatch { index: usize, expected: &'static str },

    /// A render called a different number of hooks than the previous one.
    #[error("render called {found} hooks, previous render called {expected}")]
    HookCountChanged { expected: usize, found: usize },

    /// State updates during render kept re-triggering it.
    #[error("component re-rendered more than {limit} times in one pass")]
    TooManyRenders { limit: usize },

    /// The component was asked to render after `unmount()`.
    #[error("component is not mounted")]
    Unmounted,
}
