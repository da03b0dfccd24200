//! Substring scorer for arithmetic answers.

/// `true` when `expected` occurs anywhere in `response`, ignoring case.
///
/// Short numerals can match inside longer numbers (`"7"` in `"17"`); this is
/// accepted behaviour.
pub fn check_answer(expected: &str, response: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    if expected.is_empty() {
        return false;
    }
    response.to_lowercase().contains(&expected)
}
