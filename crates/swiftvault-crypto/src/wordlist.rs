//! BIP39 English wordlist lookups.
//!
//! The 2048 words are the standard list shipped with the `bip39`
//! crate; bit packing and checksum handling stay in [`crate::mnemonic`].

use bip39::Language;

/// Number of words in a BIP39 list (2^11).
pub const WORDLIST_LEN: usize = 2048;

/// The sorted BIP39 English wordlist.
pub fn wordlist() -> &'static [&'static str; WORDLIST_LEN] {
    Language::English.word_list()
}

/// Returns the word at an 11-bit index, or `None` when out of range.
pub fn index_to_word(index: u16) -> Option<&'static str> {
    wordlist().get(usize::from(index)).copied()
}

/// Returns the 11-bit index of `word`, or `None` if it is not in the list.
///
/// Matching is exact; callers normalise case first.
pub fn word_to_index(word: &str) -> Option<u16> {
    Language::English.find_word(word)
}
