// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text encoding of tokens for terminals and URLs (unpadded base64url).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ember_core::EmberError;
use zeroize::Zeroizing;

pub fn encode_token(token: &[u8]) -> Zeroizing<String> {
    Zeroizing::new(URL_SAFE_NO_PAD.encode(token))
}

/// Decode a token typed or pasted by a user. Surrounding whitespace and
/// trailing `=` padding are ignored; anything else that is not base64url is
/// a malformed token.
pub fn decode_token(text: &str) -> Result<Zeroizing<Vec<u8>>, EmberError> {
    let trimmed = text.trim().trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map(Zeroizing::new)
        .map_err(|_| EmberError::MalformedToken)
}
