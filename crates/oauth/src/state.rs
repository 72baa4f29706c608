use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::RngCore,
};

/// Generate a random `state` nonce for one authorization attempt.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time comparison of the returned `state` with the issued one.
pub fn states_match(issued: &str, returned: &str) -> bool {
    if issued.len() != returned.len() {
        return false;
    }
    issued
        .as_bytes()
        .iter()
        .zip(returned.as_bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
