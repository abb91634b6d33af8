//! Locale-to-encoding resolution for templates.

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use unic_langid::LanguageIdentifier;

use crate::locale::locale_keys;

/// Built-in locale encodings used when a template's encoding cannot be
/// detected.
///
/// Keys are language codes, optionally followed by `_REGION`; values are
/// encoding labels. Labels resolve through the WHATWG encoding registry, so
/// `ISO-8859-1` and `ISO-8859-9` map to `windows-1252` and `windows-1254`
/// and `GB2312` maps to `GBK`.
pub const BUILTIN_LOCALE_ENCODINGS: &[(&str, &str)] = &[
    ("ar", "ISO-8859-6"),
    ("be", "ISO-8859-5"),
    ("bg", "ISO-8859-5"),
    ("ca", "ISO-8859-1"),
    ("cs", "ISO-8859-2"),
    ("da", "ISO-8859-1"),
    ("de", "ISO-8859-1"),
    ("el", "ISO-8859-7"),
    ("en", "ISO-8859-1"),
    ("es", "ISO-8859-1"),
    ("et", "ISO-8859-1"),
    ("fi", "ISO-8859-1"),
    ("fr", "ISO-8859-1"),
    ("hr", "ISO-8859-2"),
    ("hu", "ISO-8859-2"),
    ("is", "ISO-8859-1"),
    ("it", "ISO-8859-1"),
    ("iw", "ISO-8859-8"),
    ("he", "ISO-8859-8"),
    ("ja", "Shift_JIS"),
    ("ko", "EUC-KR"),
    ("lt", "ISO-8859-2"),
    ("lv", "ISO-8859-2"),
    ("mk", "ISO-8859-5"),
    ("nl", "ISO-8859-1"),
    ("no", "ISO-8859-1"),
    ("pl", "ISO-8859-2"),
    ("pt", "ISO-8859-1"),
    ("ro", "ISO-8859-2"),
    ("ru", "ISO-8859-5"),
    ("sh", "ISO-8859-5"),
    ("sk", "ISO-8859-2"),
    ("sl", "ISO-8859-2"),
    ("sq", "ISO-8859-2"),
    ("sr", "ISO-8859-5"),
    ("sv", "ISO-8859-1"),
    ("tr", "ISO-8859-9"),
    ("uk", "ISO-8859-5"),
    ("zh", "GB2312"),
    ("zh_TW", "Big5"),
];

/// Which branch of the encoding policy produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingOrigin {
    /// The template's encoding was sniffed from its bytes.
    Detected,
    /// Detection was inconclusive; built-in table plus UTF-8 default.
    Fallback,
}

/// Resolves the encoding of a template for a locale.
///
/// Lookup order is `lang_REGION`, then `lang`, then the default encoding.
///
/// # Example
///
/// ```rust
/// use standout_views::EncodingTable;
/// use encoding_rs::{SHIFT_JIS, UTF_8};
///
/// let table = EncodingTable::from_detection(None);
/// assert_eq!(table.default_encoding(), UTF_8);
/// assert_eq!(table.for_locale(&"ja-JP".parse().unwrap()), SHIFT_JIS);
///
/// let table = EncodingTable::from_detection(Some(SHIFT_JIS));
/// assert_eq!(table.for_locale(&"en-US".parse().unwrap()), SHIFT_JIS);
/// ```
#[derive(Debug, Clone)]
pub struct EncodingTable {
    default: &'static Encoding,
    locales: HashMap<String, &'static Encoding>,
    origin: EncodingOrigin,
}

impl EncodingTable {
    /// Applies the encoding policy to a detection result.
    pub fn from_detection(detected: Option<&'static Encoding>) -> Self {
        match detected {
            Some(encoding) => Self::detected(encoding),
            None => Self::fallback(),
        }
    }

    /// A table where `encoding` is the only encoding.
    pub fn detected(encoding: &'static Encoding) -> Self {
        Self {
            default: encoding,
            locales: HashMap::new(),
            origin: EncodingOrigin::Detected,
        }
    }

    /// The built-in locale table with UTF-8 as default.
    ///
    /// The table is loaded before the default is set, so locale entries win
    /// over UTF-8 for the locales they name.
    pub fn fallback() -> Self {
        let mut table = Self::builtin();
        table.default = UTF_8;
        table
    }

    fn builtin() -> Self {
        Self {
            default: WINDOWS_1252,
            locales: BUILTIN_LOCALE_ENCODINGS
                .iter()
                .filter_map(|(key, label)| {
                    let encoding = Encoding::for_label(label.as_bytes())?;
                    Some((key.to_string(), encoding))
                })
                .collect(),
            origin: EncodingOrigin::Fallback,
        }
    }

    /// Encoding used when no locale entry matches.
    pub fn default_encoding(&self) -> &'static Encoding {
        self.default
    }

    /// How this table came about.
    pub fn origin(&self) -> EncodingOrigin {
        self.origin
    }

    /// Number of locale-specific entries.
    pub fn locale_entries(&self) -> usize {
        self.locales.len()
    }

    /// The encoding for templates rendered in `locale`.
    pub fn for_locale(&self, locale: &LanguageIdentifier) -> &'static Encoding {
        if self.locales.is_empty() {
            return self.default;
        }
        locale_keys(locale)
            .iter()
            .find_map(|key| self.locales.get(key).copied())
            .unwrap_or(self.default)
    }
}
