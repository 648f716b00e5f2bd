//! Structural calldata decoding using alloy-dyn-abi
//!
//! "Does this signature explain these bytes" is answered by a strict decode:
//! the selector must match, the arguments must decode, and the decoded values
//! must re-encode to the leading bytes of the input. Anything after the
//! encoded arguments is ignored. Nothing here touches the network.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::Function;

use crate::domain::abi::{selector_hex, split_selector, DecodeError, DecodedValue, ParamSpec};

/// A successful structural decode
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFunction {
    pub function: Function,
    pub params: Vec<ParamSpec>,
    pub args: Vec<DecodedValue>,
}

impl DecodedFunction {
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Canonical `name(type,...)` built from the declared parameter types
    pub fn signature(&self) -> String {
        self.function.signature()
    }
}

/// Parse a textual function signature such as `transfer(address,uint256)`
pub fn parse_signature(signature: &str) -> Result<Function, DecodeError> {
    Function::parse(signature.trim()).map_err(|err| DecodeError::InvalidSignature {
        signature: signature.to_string(),
        reason: err.to_string(),
    })
}

/// Decode `call_data` (selector included) against a textual signature
pub fn try_decode(signature: &str, call_data: &[u8]) -> Result<DecodedFunction, DecodeError> {
    let function = parse_signature(signature)?;
    decode_with_function(&function, call_data)
}

/// Decode `call_data` (selector included) against a parsed function
pub fn decode_with_function(
    function: &Function,
    call_data: &[u8],
) -> Result<DecodedFunction, DecodeError> {
    let (selector, args_data) = split_selector(call_data)?;

    let expected = function.selector().0;
    if selector != expected {
        return Err(DecodeError::SelectorMismatch {
            actual: selector_hex(selector),
            expected: selector_hex(expected),
        });
    }

    let values = decode_params(function, args_data)?;

    let params = function
        .inputs
        .iter()
        .map(|input| ParamSpec::new(input.name.clone(), input.selector_type()))
        .collect();
    let args = values
        .iter()
        .zip(function.inputs.iter())
        .map(|(value, input)| DecodedValue::from_param(value, input))
        .collect();

    Ok(DecodedFunction {
        function: function.clone(),
        params,
        args,
    })
}

fn decode_params(function: &Function, args_data: &[u8]) -> Result<Vec<DynSolValue>, DecodeError> {
    let types = function
        .inputs
        .iter()
        .map(|input| {
            DynSolType::parse(&input.selector_type()).map_err(|err| {
                DecodeError::InvalidSignature {
                    signature: function.signature(),
                    reason: err.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if types.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(args_data)
        .map_err(|err| DecodeError::Abi(err.to_string()))?;

    // dirty padding decodes but does not re-encode to the same words
    if !args_data.starts_with(&decoded.abi_encode_params()) {
        return Err(DecodeError::NonCanonical);
    }

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}
