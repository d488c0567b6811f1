//! Tolerant decoding of inbound trace propagation tokens.
//!
//! Inbound tokens are untrusted caller-supplied data. Continuing a
//! distributed trace is best-effort, never a requirement for serving the
//! request, so decoding is a total function: anything malformed degrades to
//! an empty result rather than an error.

/// Inherited distributed-trace identifiers from an upstream caller.
///
/// Both fields are either present together (a valid token was decoded) or
/// absent together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationContext {
    /// The 32-hex-character distributed trace identifier.
    pub trace_id: Option<String>,
    /// The 16-hex-character identifier of the upstream caller's span.
    pub parent_span_id: Option<String>,
}

impl PropagationContext {
    /// No inherited context; the trace starts fresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context inherited from an upstream caller.
    pub fn inherited(trace_id: impl Into<String>, parent_span_id: impl Into<String>) -> Self {
        Self {
            trace_id: Some(trace_id.into()),
            parent_span_id: Some(parent_span_id.into()),
        }
    }

    /// Whether there is anything to continue.
    pub fn is_empty(&self) -> bool {
        self.trace_id.is_none() && self.parent_span_id.is_none()
    }
}

/// Decodes a W3C `traceparent` header value.
///
/// Expected shape: `{version}-{trace-id}-{parent-id}-{flags}` with
/// lowercase hex fields of 2, 32, 16 and 2 characters. Absent or malformed
/// input yields [`PropagationContext::empty`]; this function never fails.
///
/// # Example
///
/// ```
/// use request_observability::decode_traceparent;
///
/// let ctx = decode_traceparent(Some(
///     "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
/// ));
/// assert_eq!(ctx.trace_id.as_deref(), Some("4bf92f3577b34da6a3ce929d0e0e4736"));
///
/// assert!(decode_traceparent(Some("garbage")).is_empty());
/// assert!(decode_traceparent(None).is_empty());
/// ```
pub fn decode_traceparent(header: Option<&str>) -> PropagationContext {
    let Some(value) = header else {
        return PropagationContext::empty();
    };

    let fields: Vec<&str> = value.trim().split('-').collect();
    if fields.len() < 4 {
        return PropagationContext::empty();
    }
    let (version, trace_id, parent_id, flags) = (fields[0], fields[1], fields[2], fields[3]);

    if !is_lower_hex(version, 2) || version == "ff" {
        return PropagationContext::empty();
    }
    // Version 00 has exactly four fields; later versions may append more.
    if version == "00" && fields.len() != 4 {
        return PropagationContext::empty();
    }
    if !is_lower_hex(trace_id, 32) || is_all_zero(trace_id) {
        return PropagationContext::empty();
    }
    if !is_lower_hex(parent_id, 16) || is_all_zero(parent_id) {
        return PropagationContext::empty();
    }
    if !is_lower_hex(flags, 2) {
        return PropagationContext::empty();
    }

    PropagationContext::inherited(trace_id, parent_id)
}

fn is_lower_hex(field: &str, len: usize) -> bool {
    field.len() == len
        && field
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_all_zero(field: &str) -> bool {
    field.bytes().all(|b| b == b'0')
}
