/// Refined replies shorter than this fall back to the original text.
const MIN_REFINED_LEN: usize = 10;

/// Leading boilerplate emitted by the ticketing system that trained part of
/// the corpus. Stripped together with the sentence it opens.
const TICKET_PREFIXES: &[&str] = &[
    "This ticket is currently assigned to",
    "This ticket has been assigned to",
    "Your ticket has been assigned to",
    "Ticket assigned to",
];

/// Stilted corpus phrasing rewritten to a conversational register.
const PHRASE_REWRITES: &[(&str, &str)] = &[
    ("Please provide us", "Please provide"),
    ("Kindly provide", "Please provide"),
    ("do the needful", "take care of this"),
    ("at the earliest", "as soon as possible"),
    ("Please be informed that ", ""),
    ("We would like to inform you that ", ""),
    ("revert back", "get back"),
];

/// Clean up dataset answer text before showing it to a user.
///
/// Strips ticket-assignment boilerplate, unescapes embedded quotes and
/// literal newline escapes, collapses doubled backslashes, and rewrites a
/// small table of stilted phrases. If the cleanup leaves near-empty text
/// (under 10 characters, or punctuation only), the original is returned
/// unchanged.
pub fn refine_reply(text: &str) -> String {
    let mut refined = strip_ticket_boilerplate(text).to_string();

    refined = refined
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\");

    for (from, to) in PHRASE_REWRITES {
        refined = refined.replace(from, to);
    }

    let trimmed = refined.trim();
    if trimmed.chars().count() < MIN_REFINED_LEN || !trimmed.chars().any(char::is_alphanumeric) {
        return text.to_string();
    }

    trimmed.to_string()
}

/// Drop a leading ticket-assignment sentence, if present.
///
/// The boilerplate always opens the reply; everything through the first
/// sentence terminator goes with it.
fn strip_ticket_boilerplate(text: &str) -> &str {
    let trimmed = text.trim_start();
    for prefix in TICKET_PREFIXES {
        if trimmed.starts_with(prefix) {
            if let Some(end) = trimmed.find(['.', '!', '?']) {
                return trimmed[end + 1..].trim_start();
            }
            // The boilerplate is the whole text; nothing useful remains.
            return "";
        }
    }
    trimmed
}
