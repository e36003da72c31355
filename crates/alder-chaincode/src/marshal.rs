//! Wire decoding between the peer runtime and contract calls.
//!
//! The peer hands a contract its input as an ordered list of raw byte
//! arguments (or, from the CLI path, as an `{"Args": [...]}` JSON
//! document); the first argument is the function name and the rest are
//! parameters. Responses cross back as a tag-framed byte sequence:
//!
//! - `[0x00]` + payload = success (empty payload allowed)
//! - `[0x01]` + UTF-8 message = failure

use crate::api::Invocation;
use crate::api::Response;

/// CLI argument document, e.g. `{"Args": ["query", "a"]}`.
#[derive(Debug, serde::Deserialize)]
struct ArgsDocument {
    #[serde(rename = "Args")]
    args: Vec<String>,
}

/// Decode an ordered raw argument list into an [`Invocation`].
///
/// The first argument is the function name; the rest are parameters. All
/// arguments must be valid UTF-8. An empty list yields an empty function
/// name and no parameters, which downstream dispatch treats as unknown.
pub fn invocation_from_args(raw: &[Vec<u8>]) -> anyhow::Result<Invocation> {
    let mut decoded = Vec::with_capacity(raw.len());
    for (idx, arg) in raw.iter().enumerate() {
        let text =
            std::str::from_utf8(arg).map_err(|e| anyhow::anyhow!("argument {idx} is not valid UTF-8: {e}"))?;
        decoded.push(text.to_string());
    }
    Ok(split_invocation(decoded))
}

/// Decode a CLI `{"Args": [...]}` document into an [`Invocation`].
pub fn invocation_from_json(bytes: &[u8]) -> anyhow::Result<Invocation> {
    let doc: ArgsDocument =
        serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!("invalid argument document: {e}"))?;
    Ok(split_invocation(doc.args))
}

fn split_invocation(mut parts: Vec<String>) -> Invocation {
    if parts.is_empty() {
        return Invocation::new("", Vec::new());
    }
    let args = parts.split_off(1);
    let function = parts.pop().unwrap_or_default();
    Invocation::new(function, args)
}

/// Encode a [`Response`] into its tag-framed wire form.
///
/// Successes with no payload and with an empty payload encode identically;
/// the distinction does not cross the wire.
pub fn encode_response(response: &Response) -> Vec<u8> {
    match response {
        Response::Success { payload } => {
            let payload = payload.as_deref().unwrap_or_default();
            let mut out = Vec::with_capacity(1 + payload.len());
            out.push(0x00);
            out.extend_from_slice(payload);
            out
        }
        Response::Failure { message } => {
            let mut out = Vec::with_capacity(1 + message.len());
            out.push(0x01);
            out.extend_from_slice(message.as_bytes());
            out
        }
    }
}

/// Decode a tag-framed wire response.
pub fn decode_response(bytes: &[u8]) -> anyhow::Result<Response> {
    match bytes.split_first() {
        Some((&0x00, payload)) if payload.is_empty() => Ok(Response::success_empty()),
        Some((&0x00, payload)) => Ok(Response::success(payload.to_vec())),
        Some((&0x01, message)) => {
            let message =
                std::str::from_utf8(message).map_err(|e| anyhow::anyhow!("failure message is not valid UTF-8: {e}"))?;
            Ok(Response::failure(message))
        }
        Some((tag, _)) => Err(anyhow::anyhow!("unknown response tag {tag:#04x}")),
        None => Err(anyhow::anyhow!("empty response frame")),
    }
}
