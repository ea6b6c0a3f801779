//! Recipient derivation

/// Returns every address a request is delivered to.
///
/// The SMTP username always comes first, followed by each entry of the
/// comma-separated list in order. Entries are trimmed but otherwise passed
/// through, so duplicates and empty entries are kept.
pub fn derive_recipients(username: &str, to: &str) -> Vec<String> {
    let mut recipients = vec![username.trim().to_string()];

    if !to.is_empty() {
        recipients.extend(to.split(',').map(|address| address.trim().to_string()));
    }

    recipients
}
