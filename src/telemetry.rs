//! Structured telemetry pipeline for specification violations.
//!
//! This module provides an observable system for tracking specification violations
//! and internal invariant failures. Instead of just logging with `tracing::warn!`,
//! violations are structured data that can be:
//!
//! - Logged via tracing (default behavior, backward compatible)
//! - Collected programmatically for testing
//! - Sent to custom observers (metrics, alerting, etc.)
//!
//! # Example
//!
//! ```
//! use rollback_net::telemetry::{ViolationSeverity, ViolationKind, CollectingObserver};
//! use std::sync::Arc;
//!
//! // Create a collecting observer for tests
//! let observer = Arc::new(CollectingObserver::new());
//!
//! // Check violations after some operations
//! assert!(observer.violations().is_empty(), "unexpected violations");
//! ```

use crate::Frame;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Custom serializer for `Option<Frame>` that outputs clean integers or null.
///
/// - `None` → `null`
/// - `Some(Frame::NULL)` → `null`
/// - `Some(Frame(n))` where n >= 0 → `n`
mod frame_serializer {
    use crate::Frame;
    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(frame: &Option<Frame>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match frame {
            None => serializer.serialize_none(),
            Some(f) if f.is_null() => serializer.serialize_none(),
            Some(f) => serializer.serialize_i32(f.as_i32()),
        }
    }
}

/// Severity of a specification violation.
///
/// Severities are ordered from least to most severe, allowing filtering
/// and comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Unexpected but recoverable - operation continued with fallback.
    ///
    /// Example: A minor timing issue that was automatically corrected.
    Warning,
    /// Serious issue - operation may have degraded behavior.
    ///
    /// Example: Frame mismatch after load that may affect simulation.
    Error,
    /// Critical invariant broken - state may be corrupted.
    ///
    /// Example: Input queue corruption that could cause desync.
    Critical,
}

impl ViolationSeverity {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of specification violations.
///
/// Each category corresponds to a major subsystem of the library,
/// making it easy to filter and route violations.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new violation categories
/// may be added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// Frame synchronization invariant violated.
    ///
    /// Examples:
    /// - Frame counter mismatch after load
    /// - Unexpected frame value during resimulation
    FrameSync,
    /// Input queue invariant violated.
    ///
    /// Examples:
    /// - Gap in input sequence
    /// - Confirmation of already-confirmed input
    InputQueue,
    /// State save/load invariant violated.
    ///
    /// Examples:
    /// - Loading non-existent state
    /// - State checksum mismatch
    StateManagement,
    /// Network protocol invariant violated.
    ///
    /// Examples:
    /// - Unexpected message type
    /// - Protocol state machine error
    NetworkProtocol,
    /// Checksum or desync detection issue.
    ///
    /// Examples:
    /// - Local/remote checksum mismatch
    /// - Unable to compute checksum
    ChecksumMismatch,
    /// Configuration constraint violated.
    ///
    /// Examples:
    /// - Invalid parameter combination
    /// - Constraint violation at runtime
    Configuration,
    /// Internal logic error (should never happen).
    ///
    /// These violations indicate bugs in the library itself.
    InternalError,
    /// Runtime invariant check failed.
    ///
    /// These violations indicate that a type's invariants were broken,
    /// which could lead to undefined behavior or incorrect results.
    /// Only checked in debug builds or when `paranoid` feature is enabled.
    Invariant,
    /// Synchronization protocol issues.
    ///
    /// Examples:
    /// - Excessive sync retries due to packet loss
    /// - Sync duration exceeding expected time
    /// - Repeated sync failures before connection established
    Synchronization,
}

impl ViolationKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FrameSync => "frame_sync",
            Self::InputQueue => "input_queue",
            Self::StateManagement => "state_management",
            Self::NetworkProtocol => "network_protocol",
            Self::ChecksumMismatch => "checksum_mismatch",
            Self::Configuration => "configuration",
            Self::InternalError => "internal_error",
            Self::Invariant => "invariant",
            Self::Synchronization => "synchronization",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded specification violation.
///
/// Contains all relevant context for diagnosing and responding to
/// a violation of expected behavior or invariants.
///
/// # Serialization
///
/// This type implements `serde::Serialize` for structured JSON output.
/// The frame field is serialized as `null` for [`Frame::NULL`], or as an
/// integer for valid frames.
///
/// # Example
///
/// ```
/// use rollback_net::telemetry::{SpecViolation, ViolationSeverity, ViolationKind};
/// use rollback_net::Frame;
///
/// let violation = SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::FrameSync,
///     "frame mismatch",
///     "sync.rs:42",
/// ).with_frame(Frame::new(100))
///  .with_context("expected", "50")
///  .with_context("actual", "100");
///
/// // Serialize to JSON
/// let json = serde_json::to_string(&violation).unwrap();
/// assert!(json.contains(r#""severity":"warning""#));
/// assert!(json.contains(r#""kind":"frame_sync""#));
/// assert!(json.contains(r#""frame":100"#));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpecViolation {
    /// The severity level of this violation.
    pub severity: ViolationSeverity,
    /// The category/subsystem where the violation occurred.
    pub kind: ViolationKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the violation was detected (file:line).
    pub location: &'static str,
    /// The game frame at which the violation occurred, if applicable.
    ///
    /// Serialized as an integer for valid frames, or `null` for `None`/[`Frame::NULL`].
    #[serde(serialize_with = "frame_serializer::serialize")]
    pub frame: Option<Frame>,
    /// Additional structured context as key-value pairs.
    ///
    /// This can include values like player handles, expected vs actual
    /// values, or other diagnostic information.
    pub context: BTreeMap<String, String>,
}

impl SpecViolation {
    /// Creates a new specification violation.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            frame: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the frame at which this violation occurred.
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    ///
    /// This is a convenience method for programmatic access to violation data.
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed violations).
    ///
    /// # Example
    ///
    /// ```
    /// use rollback_net::telemetry::{SpecViolation, ViolationSeverity, ViolationKind};
    /// use rollback_net::Frame;
    ///
    /// let violation = SpecViolation::new(
    ///     ViolationSeverity::Warning,
    ///     ViolationKind::FrameSync,
    ///     "test",
    ///     "test.rs:1",
    /// ).with_frame(Frame::new(42));
    ///
    /// let json = violation.to_json().unwrap();
    /// assert!(json.contains(r#""frame":42"#));
    /// ```
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes this violation to a pretty-printed JSON string.
    ///
    /// Like [`to_json`](Self::to_json), but with indentation for readability.
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(frame) = self.frame {
            write!(f, ", frame={frame}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing specification violations.
///
/// Implement this trait to create custom observers that can react to
/// violations in various ways (logging, metrics, alerting, etc.).
///
/// # Thread Safety
///
/// When the `sync-send` feature is enabled, observers must be `Send + Sync`
/// to allow sharing across threads.
///
/// # Example
///
/// ```
/// use rollback_net::telemetry::{ViolationObserver, SpecViolation};
///
/// struct MetricsObserver {
///     // Your metrics implementation
/// }
///
/// impl ViolationObserver for MetricsObserver {
///     fn on_violation(&self, violation: &SpecViolation) {
///         // Increment a counter, send to monitoring system, etc.
///         println!("Violation: {}", violation);
///     }
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called when a specification violation is detected.
    ///
    /// This method should be relatively quick to execute, as it may be
    /// called during time-critical operations.
    fn on_violation(&self, violation: &SpecViolation);
}

#[cfg(not(feature = "sync-send"))]
/// Trait for observing specification violations.
///
/// Implement this trait to create custom observers that can react to
/// violations in various ways (logging, metrics, alerting, etc.).
pub trait ViolationObserver {
    /// Called when a specification violation is detected.
    fn on_violation(&self, violation: &SpecViolation);
}

/// Built-in observer that logs violations via the `tracing` crate.
///
/// This is the default observer that maintains backward compatibility
/// with the previous `tracing::warn!` behavior, but with improved
/// structured output for machine parseability.
///
/// # Log Levels
///
/// - `Warning` severity → `tracing::warn!`
/// - `Error` severity → `tracing::error!`
/// - `Critical` severity → `tracing::error!` with additional context
///
/// # Structured Output
///
/// All fields are output as structured tracing fields:
/// - `severity` - The severity level as a string (`warning`, `error`, `critical`)
/// - `kind` - The violation category as a string (e.g., `frame_sync`, `input_queue`)
/// - `location` - Source file and line number where the violation was detected
/// - `frame` - The frame number as an integer, or "null" if not applicable
/// - `context` - A compact representation of context key-value pairs
///
/// This structured output is compatible with JSON logging formatters
/// (like `tracing-subscriber`'s JSON layer) and log aggregation systems.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Formats the frame as a displayable value.
    /// Returns the frame number for valid frames, or "null" for None/NULL frames.
    fn format_frame(frame: Option<Frame>) -> String {
        match frame {
            None => "null".to_string(),
            Some(f) if f.is_null() => "null".to_string(),
            Some(f) => f.as_i32().to_string(),
        }
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let frame_str = Self::format_frame(violation.frame);

        // Format context as a compact key=value string for compatibility
        // with systems that don't support dynamic field expansion
        let context_str = if violation.context.is_empty() {
            "{}".to_string()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    frame = %frame_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    frame = %frame_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Critical => {
                tracing::error!(
                    severity = "critical",
                    kind,
                    location,
                    frame = %frame_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Built-in observer that collects violations for testing.
///
/// This observer stores all violations in a thread-safe vector,
/// allowing tests to assert on the violations that occurred during
/// an operation.
///
/// # Example
///
/// ```
/// use rollback_net::telemetry::{CollectingObserver, ViolationKind, ViolationObserver, SpecViolation, ViolationSeverity};
///
/// let observer = CollectingObserver::new();
///
/// // Simulate a violation being reported
/// observer.on_violation(&SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::FrameSync,
///     "test violation",
///     "test.rs:1",
/// ));
///
/// // Check that the violation was collected
/// assert_eq!(observer.violations().len(), 1);
/// assert!(observer.has_violation(ViolationKind::FrameSync));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<SpecViolation>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty violation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected violations.
    #[must_use]
    pub fn violations(&self) -> Vec<SpecViolation> {
        self.violations.lock().clone()
    }

    /// Returns the number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns true if no violations have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Checks if any violation of the specified kind has been collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Checks if any violation with the specified severity has been collected.
    #[must_use]
    pub fn has_severity(&self, severity: ViolationSeverity) -> bool {
        self.violations
            .lock()
            .iter()
            .any(|v| v.severity == severity)
    }

    /// Returns all violations matching the specified kind.
    #[must_use]
    pub fn violations_of_kind(&self, kind: ViolationKind) -> Vec<SpecViolation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns all violations at or above the specified severity.
    #[must_use]
    pub fn violations_at_severity(&self, min_severity: ViolationSeverity) -> Vec<SpecViolation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.severity >= min_severity)
            .cloned()
            .collect()
    }

    /// Clears all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// A composite observer that forwards violations to multiple observers.
///
/// Useful when you want to both log violations and collect them for testing,
/// or when you have multiple monitoring systems.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ViolationObserver>>,
}

impl CompositeObserver {
    /// Creates a new composite observer with no child observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer to the composite.
    pub fn add(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.observers.push(observer);
    }

    /// Creates a composite observer from a list of observers.
    #[must_use]
    pub fn from_observers(observers: Vec<Arc<dyn ViolationObserver>>) -> Self {
        Self { observers }
    }
}

impl ViolationObserver for CompositeObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        for observer in &self.observers {
            observer.on_violation(violation);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

/// Macro for reporting specification violations with location tracking.
///
/// This macro creates a [`SpecViolation`] with the current file and line,
/// and reports it to the global observer (if set) or to a provided observer.
///
/// # Syntax
///
/// ```text
/// report_violation!(severity, kind, "message");
/// report_violation!(severity, kind, "message with {}", format_args);
/// ```
///
/// # Example
///
/// ```
/// use rollback_net::{report_violation, telemetry::{ViolationSeverity, ViolationKind}};
///
/// let expected = 10;
/// let actual = 15;
///
/// // Simple usage
/// report_violation!(ViolationSeverity::Warning, ViolationKind::FrameSync,
///     "frame mismatch: expected={}, actual={}", expected, actual);
/// ```
#[macro_export]
macro_rules! report_violation {
    // Basic: severity, kind, message (no format args)
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        // Log via tracing by default
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    // With format args: severity, kind, format, args...
    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Asserts that no violations have been collected.
///
/// # Panics
///
/// Panics if the observer contains any violations, printing them for debugging.
///
/// # Example
///
/// ```
/// use rollback_net::{assert_no_violations, telemetry::CollectingObserver};
///
/// let observer = CollectingObserver::new();
/// // ... run some operations ...
/// assert_no_violations!(observer);
/// ```
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "Expected no violations, but found {}:\n{:#?}",
            violations.len(),
            violations
        );
    }};

    ($observer:expr, $msg:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "{}\nExpected no violations, but found {}:\n{:#?}",
            $msg,
            violations.len(),
            violations
        );
    }};
}

/// Asserts that a violation of the specified kind was collected.
///
/// # Panics
///
/// Panics if no violation of the specified kind was found.
///
/// # Example
///
/// ```
/// use rollback_net::{assert_violation, telemetry::{CollectingObserver, ViolationKind, ViolationObserver, SpecViolation, ViolationSeverity}};
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::FrameSync,
///     "test",
///     "test.rs:1",
/// ));
/// assert_violation!(observer, ViolationKind::FrameSync);
/// ```
#[macro_export]
macro_rules! assert_violation {
    ($observer:expr, $kind:expr) => {{
        assert!(
            $observer.has_violation($kind),
            "Expected violation of kind {:?}, but found: {:#?}",
            $kind,
            $observer.violations()
        );
    }};

    ($observer:expr, $kind:expr, $msg:expr) => {{
        assert!(
            $observer.has_violation($kind),
            "{}\nExpected violation of kind {:?}, but found: {:#?}",
            $msg,
            $kind,
            $observer.violations()
        );
    }};
}

/// Reports a violation to an optional observer, falling back to [`TracingObserver`] if `None`.
///
/// This function is used internally by sessions to report violations through their
/// configured observer, while maintaining backward compatibility with the default
/// tracing-based logging.
///
/// # Arguments
///
/// * `observer` - Optional reference to a violation observer
/// * `violation` - The violation to report
///
/// # Example
///
/// ```
/// use rollback_net::telemetry::{
///     report_to_observer, CollectingObserver, SpecViolation, ViolationKind, ViolationSeverity
/// };
/// use std::sync::Arc;
///
/// let observer = Arc::new(CollectingObserver::new());
/// let violation = SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::FrameSync,
///     "test message",
///     "test.rs:1",
/// );
///
/// // Report to custom observer
/// report_to_observer(Some(&observer), &violation);
/// assert_eq!(observer.len(), 1);
///
/// // Report with no observer (uses TracingObserver)
/// report_to_observer(None::<&Arc<CollectingObserver>>, &violation);
/// ```
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &SpecViolation,
) {
    match observer {
        Some(obs) => obs.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Macro for reporting specification violations through a session's observer.
///
/// This macro is similar to [`report_violation!`], but allows specifying an
/// optional observer. If the observer is `None`, it falls back to the default
/// [`TracingObserver`].
///
/// # Syntax
///
/// ```text
/// report_violation_to!(observer, severity, kind, "message");
/// report_violation_to!(observer, severity, kind, "message with {}", format_args);
/// ```
///
/// # Example
///
/// ```
/// use rollback_net::{report_violation_to, telemetry::{ViolationSeverity, ViolationKind, CollectingObserver, ViolationObserver}};
/// use std::sync::Arc;
///
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(Arc::new(CollectingObserver::new()));
///
/// report_violation_to!(&observer, ViolationSeverity::Warning, ViolationKind::FrameSync,
///     "frame mismatch: expected={}, actual={}", 10, 15);
/// ```
#[macro_export]
macro_rules! report_violation_to {
    // Basic: observer, severity, kind, message (no format args)
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    // With format args: observer, severity, kind, format, args...
    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// Result of an invariant check.
///
/// Contains information about what invariant was violated and any
/// additional context for debugging.
///
/// # Serialization
///
/// This type implements `serde::Serialize` for structured JSON output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type whose invariant was violated.
    pub type_name: &'static str,
    /// Description of the violated invariant.
    pub invariant: String,
    /// Additional diagnostic context.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Adds additional details to the violation.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Serializes this violation to a JSON string.
    ///
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed violations).
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes this violation to a pretty-printed JSON string.
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Trait for types that maintain internal invariants.
///
/// Types implementing this trait can have their invariants checked at runtime
/// during debug builds or when the `paranoid` feature is enabled.
///
/// # Example
///
/// ```
/// use rollback_net::telemetry::{InvariantChecker, InvariantViolation};
///
/// struct BoundedCounter {
///     value: u32,
///     max: u32,
/// }
///
/// impl InvariantChecker for BoundedCounter {
///     fn check_invariants(&self) -> Result<(), InvariantViolation> {
///         if self.value > self.max {
///             return Err(InvariantViolation::new(
///                 "BoundedCounter",
///                 "value exceeds maximum",
///             ).with_details(format!("value={}, max={}", self.value, self.max)));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait InvariantChecker {
    /// Checks that all invariants of this type are satisfied.
    ///
    /// Returns `Ok(())` if all invariants hold, or an `InvariantViolation`
    /// describing the first broken invariant.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Macro for conditionally checking invariants in debug builds.
///
/// This macro expands to an invariant check in debug builds but compiles
/// to nothing in release builds, unless the `paranoid` feature is enabled.
///
/// # Syntax
///
/// ```text
/// debug_check_invariants!(expr);
/// debug_check_invariants!(expr, "context message");
/// ```
///
/// # Example
///
/// ```ignore
/// use rollback_net::{debug_check_invariants, telemetry::InvariantChecker};
///
/// fn process<T: InvariantChecker>(item: &T) {
///     // Check invariants at entry in debug builds
///     debug_check_invariants!(item, "before processing");
///
///     // ... do work ...
///
///     // Check invariants at exit in debug builds
///     debug_check_invariants!(item, "after processing");
/// }
/// ```
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{}",
                violation
            );
        }
    }};

    ($expr:expr, $context:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{} [context: {}]",
                violation,
                $context
            );
        }
    }};
}

/// No-op version for release builds without `paranoid` feature.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{}};
    ($expr:expr, $context:expr) => {{}};
}

/// Macro for checking invariants and panicking if violated (debug only).
///
/// Unlike [`debug_check_invariants!`], this macro will panic if an invariant
/// is violated, making it suitable for critical invariants where continuing
/// would cause undefined behavior.
///
/// # Example
///
/// ```ignore
/// use rollback_net::{assert_invariants, telemetry::InvariantChecker};
///
/// fn critical_operation<T: InvariantChecker>(item: &mut T) {
///     assert_invariants!(item); // Panics if invariant broken
///     // ... proceed knowing invariants hold ...
/// }
/// ```
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! assert_invariants {
    ($expr:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            panic!("Invariant violation: {}", violation);
        }
    }};

    ($expr:expr, $context:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            panic!("Invariant violation ({}): {}", $context, violation);
        }
    }};
}

/// No-op version for release builds without `paranoid` feature.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! assert_invariants {
    ($expr:expr) => {{}};
    ($expr:expr, $context:expr) => {{}};
}
