//! JNAP body decoding and output extraction

use crate::error::ProtocolError;
use crate::models::JnapResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a raw response body into a [`JnapResponse`]
///
/// The body must be a JSON object with a string `result`; anything else is
/// malformed. A non-"OK" result still decodes successfully.
pub fn parse_response(body: &[u8]) -> Result<JnapResponse, ProtocolError> {
    Ok(serde_json::from_slice(body)?)
}

/// Extract a typed record from the `output` of a response
pub fn parse_output<T: DeserializeOwned>(response: JnapResponse) -> Result<T, ProtocolError> {
    let output = response.output.ok_or(ProtocolError::MissingOutput)?;
    serde_json::from_value(Value::Object(output)).map_err(ProtocolError::InvalidOutput)
}
