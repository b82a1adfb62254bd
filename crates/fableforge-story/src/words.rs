//! Format validation for player-supplied words and usernames.
//!
//! These checks are purely syntactic — the core never judges whether a
//! word actually is a noun or an adjective. That's between the players.

use fableforge_types::{GameError, WordType};

/// Maximum length of a submitted word, in characters.
pub const MAX_WORD_LEN: usize = 30;

/// Maximum length of a username, in characters.
pub const MAX_USERNAME_LEN: usize = 24;

fn has_valid_chars(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
}

/// Validates a word submitted for a blank of the given type.
///
/// Returns the trimmed word on success. Rules: non-empty after trimming,
/// at most [`MAX_WORD_LEN`] characters, and only letters, spaces,
/// hyphens, and apostrophes.
pub fn validate_word(word_type: WordType, word: &str) -> Result<&str, GameError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(GameError::validation(format!(
            "a {} cannot be empty",
            word_type.label()
        )));
    }
    if word.chars().count() > MAX_WORD_LEN {
        return Err(GameError::validation(format!(
            "a {} must be at most {MAX_WORD_LEN} characters",
            word_type.label()
        )));
    }
    if !has_valid_chars(word) {
        return Err(GameError::validation(format!(
            "a {} may only contain letters, spaces, hyphens, and apostrophes",
            word_type.label()
        )));
    }
    Ok(word)
}

/// Validates a display username. Same character set as words, capped at
/// [`MAX_USERNAME_LEN`] characters. Returns the trimmed username.
pub fn validate_username(username: &str) -> Result<&str, GameError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(GameError::validation("username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(GameError::validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if !has_valid_chars(username) {
        return Err(GameError::validation(
            "username may only contain letters, spaces, hyphens, and apostrophes",
        ));
    }
    Ok(username)
}
