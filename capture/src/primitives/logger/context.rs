use std::cell::RefCell;

thread_local! {
    static LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// A scope guard that sets a logging context and restores the previous one when dropped.
///
/// Do not hold a `LogContext` across an `.await`; the context is thread-local.
///
/// # Examples
///
/// ```rust
/// use capture::primitives::logger::LogContext;
///
/// {
///     let _ctx = LogContext::new("CaptureSession");
///     capture::info!("prefixed with [Capture][CaptureSession]");
/// }
/// ```
pub struct LogContext {
    previous: Option<String>,
}

impl LogContext {
    /// Creates a new logging context scope.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let previous = LOG_CONTEXT.with(|ctx| {
            ctx.borrow_mut().replace(format!("[Capture][{module}]"))
        });

        Self { previous }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        LOG_CONTEXT.with(|ctx| {
            (*ctx.borrow_mut()).clone_from(&self.previous);
        });
    }
}

/// Gets the current logging context, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Runs a block inside a scoped logging context.
///
/// ```rust
/// use capture::with_log_context;
///
/// with_log_context!("Properties" => {
///     capture::debug!("prefixed with [Capture][Properties]");
/// });
/// ```
#[macro_export]
macro_rules! with_log_context {
    ($module:expr => $block:block) => {{
        let _capture_logger_ctx = $crate::primitives::logger::LogContext::new($module);
        $block
    }};
}

/// Sets a logging context for the current scope and returns its guard.
///
/// ```rust
/// use capture::set_log_context;
///
/// let _ctx = set_log_context!("CaptureClient");
/// capture::info!("prefixed with [Capture][CaptureClient]");
/// ```
#[macro_export]
macro_rules! set_log_context {
    ($module:expr) => {
        $crate::primitives::logger::LogContext::new($module)
    };
}
