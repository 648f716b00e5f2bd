//! Multicall envelope detection
//!
//! Probes a fixed, ordered list of batch-call entry points and extracts the
//! inner `(target, callData)` pairs from the first one that explains the
//! payload. Bytes after the encoded batch are ignored.

use alloy_sol_types::{sol, SolCall};
use tracing::trace;

use crate::domain::abi::{selector_hex, DecodeError, RawCall};

sol! {
    /// Multicall / Multicall2 call element
    struct Call {
        address target;
        bytes callData;
    }

    /// Multicall3 call element with a per-call failure flag
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    function aggregate3(Call3[] calls);
    function aggregate(Call[] calls);
    function tryAggregate(bool requireSuccess, Call[] calls);
    function blockAndAggregate(Call[] calls);
}

/// Known multicall envelope shapes, in probe order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// `aggregate3((address,bool,bytes)[])`
    Aggregate3,
    /// `aggregate((address,bytes)[])`
    Aggregate,
    /// `tryAggregate(bool,(address,bytes)[])`
    TryAggregate,
    /// `blockAndAggregate((address,bytes)[])`
    BlockAndAggregate,
}

/// Probe order. Earlier shapes win.
pub const PROBES: [EnvelopeKind; 4] = [
    EnvelopeKind::Aggregate3,
    EnvelopeKind::Aggregate,
    EnvelopeKind::TryAggregate,
    EnvelopeKind::BlockAndAggregate,
];

impl EnvelopeKind {
    pub fn signature(self) -> &'static str {
        match self {
            Self::Aggregate3 => aggregate3Call::SIGNATURE,
            Self::Aggregate => aggregateCall::SIGNATURE,
            Self::TryAggregate => tryAggregateCall::SIGNATURE,
            Self::BlockAndAggregate => blockAndAggregateCall::SIGNATURE,
        }
    }

    pub fn selector(self) -> [u8; 4] {
        match self {
            Self::Aggregate3 => aggregate3Call::SELECTOR,
            Self::Aggregate => aggregateCall::SELECTOR,
            Self::TryAggregate => tryAggregateCall::SELECTOR,
            Self::BlockAndAggregate => blockAndAggregateCall::SELECTOR,
        }
    }

    /// Strictly decode `payload` as this shape, returning its inner calls
    pub fn probe(self, payload: &[u8]) -> Option<Vec<RawCall>> {
        if payload.get(..4) != Some(self.selector().as_slice()) {
            return None;
        }
        match self {
            Self::Aggregate3 => {
                let call = strict_decode::<aggregate3Call>(payload)?;
                Some(
                    call.calls
                        .into_iter()
                        .map(|c| RawCall {
                            target: c.target,
                            call_data: c.callData,
                        })
                        .collect(),
                )
            }
            Self::Aggregate => {
                strict_decode::<aggregateCall>(payload).map(|call| pairs(call.calls))
            }
            Self::TryAggregate => {
                strict_decode::<tryAggregateCall>(payload).map(|call| pairs(call.calls))
            }
            Self::BlockAndAggregate => {
                strict_decode::<blockAndAggregateCall>(payload).map(|call| pairs(call.calls))
            }
        }
    }
}

fn strict_decode<C: SolCall>(payload: &[u8]) -> Option<C> {
    let call = match C::abi_decode(payload) {
        Ok(call) => call,
        Err(err) => {
            trace!(shape = C::SIGNATURE, error = %err, "Envelope probe failed");
            return None;
        }
    };
    if !payload.starts_with(&call.abi_encode()) {
        trace!(shape = C::SIGNATURE, "Envelope probe rejected non-canonical encoding");
        return None;
    }
    Some(call)
}

fn pairs(calls: Vec<Call>) -> Vec<RawCall> {
    calls
        .into_iter()
        .map(|c| RawCall {
            target: c.target,
            call_data: c.callData,
        })
        .collect()
}

/// Detect the envelope shape and extract its calls in encoding order
pub fn detect(payload: &[u8]) -> Result<Vec<RawCall>, DecodeError> {
    detect_with_kind(payload).map(|(_, calls)| calls)
}

/// Like [`detect`], also reporting which shape matched
pub fn detect_with_kind(payload: &[u8]) -> Result<(EnvelopeKind, Vec<RawCall>), DecodeError> {
    for kind in PROBES {
        if let Some(calls) = kind.probe(payload) {
            trace!(shape = kind.signature(), calls = calls.len(), "Envelope detected");
            return Ok((kind, calls));
        }
    }

    let selector = payload
        .first_chunk::<4>()
        .map(|s| selector_hex(*s))
        .unwrap_or_else(|| "<none>".to_string());
    trace!(%selector, len = payload.len(), "No envelope shape matched");
    Err(DecodeError::UnrecognizedEnvelope)
}
