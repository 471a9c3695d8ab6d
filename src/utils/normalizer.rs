use std::borrow::Cow;

use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

/// Canonical composition (NFC).
///
/// Headwords, definition tokens and queries all pass through here so that
/// precomposed and combining-diacritic spellings compare equal.
/// Already-composed input is returned borrowed.
#[inline]
pub fn nfc(text: &str) -> Cow<'_, str> {
    match is_nfc_quick(text.chars()) {
        IsNormalized::Yes => Cow::Borrowed(text),
        _ => Cow::Owned(text.nfc().collect()),
    }
}

/// `nfc` into an owned `String`
#[inline]
pub fn nfc_owned(text: &str) -> String {
    nfc(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_combining_marks() {
        // alpha + combining acute -> precomposed U+03AC
        let decomposed = "\u{03B1}\u{0301}";
        assert_eq!(nfc(decomposed), "\u{03AC}");
        assert!(matches!(nfc("\u{03AC}"), Cow::Borrowed(_)));
    }

    #[test]
    fn ascii_is_untouched() {
        assert!(matches!(nfc("amicus"), Cow::Borrowed("amicus")));
    }
}
