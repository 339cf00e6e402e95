//! Language code handling
//!
//! The translation service speaks FLORES-200 codes (`eng_Latn`, `nob_Latn`),
//! while media containers and filenames use short ISO 639 aliases. This module
//! maps between the two.

/// Alias to FLORES-200 code. For each FLORES code the first alias listed is the
/// preferred one and is used for filename suffixes.
const FLORES_ALIASES: &[(&str, &str)] = &[
    ("en", "eng_Latn"),
    ("eng", "eng_Latn"),
    ("nb", "nob_Latn"),
    ("no", "nob_Latn"),
    ("nob", "nob_Latn"),
    ("nor", "nob_Latn"),
    ("nn", "nno_Latn"),
    ("nno", "nno_Latn"),
    ("sv", "swe_Latn"),
    ("swe", "swe_Latn"),
    ("da", "dan_Latn"),
    ("dan", "dan_Latn"),
    ("fi", "fin_Latn"),
    ("fin", "fin_Latn"),
    ("de", "deu_Latn"),
    ("deu", "deu_Latn"),
    ("ger", "deu_Latn"),
    ("fr", "fra_Latn"),
    ("fra", "fra_Latn"),
    ("fre", "fra_Latn"),
    ("es", "spa_Latn"),
    ("spa", "spa_Latn"),
    ("it", "ita_Latn"),
    ("ita", "ita_Latn"),
    ("pt", "por_Latn"),
    ("por", "por_Latn"),
    ("nl", "nld_Latn"),
    ("nld", "nld_Latn"),
    ("dut", "nld_Latn"),
    ("pl", "pol_Latn"),
    ("pol", "pol_Latn"),
    ("ru", "rus_Cyrl"),
    ("rus", "rus_Cyrl"),
    ("uk", "ukr_Cyrl"),
    ("ukr", "ukr_Cyrl"),
    ("zh", "zho_Hans"),
    ("zho", "zho_Hans"),
    ("chi", "zho_Hans"),
    ("ja", "jpn_Jpan"),
    ("jpn", "jpn_Jpan"),
    ("ko", "kor_Hang"),
    ("kor", "kor_Hang"),
    ("tr", "tur_Latn"),
    ("tur", "tur_Latn"),
    ("ar", "arb_Arab"),
    ("ara", "arb_Arab"),
    ("cs", "ces_Latn"),
    ("ces", "ces_Latn"),
    ("cze", "ces_Latn"),
    ("hu", "hun_Latn"),
    ("hun", "hun_Latn"),
    ("ro", "ron_Latn"),
    ("ron", "ron_Latn"),
    ("rum", "ron_Latn"),
    ("el", "ell_Grek"),
    ("ell", "ell_Grek"),
    ("gre", "ell_Grek"),
    ("he", "heb_Hebr"),
    ("heb", "heb_Hebr"),
    ("id", "ind_Latn"),
    ("ind", "ind_Latn"),
    ("vi", "vie_Latn"),
    ("vie", "vie_Latn"),
    ("th", "tha_Thai"),
    ("tha", "tha_Thai"),
    ("hi", "hin_Deva"),
    ("hin", "hin_Deva"),
    ("bn", "ben_Beng"),
    ("ben", "ben_Beng"),
    ("ur", "urd_Arab"),
    ("urd", "urd_Arab"),
    ("ta", "tam_Taml"),
    ("tam", "tam_Taml"),
    ("fa", "pes_Arab"),
    ("per", "pes_Arab"),
    ("fas", "pes_Arab"),
    ("sr", "srp_Cyrl"),
    ("srp", "srp_Cyrl"),
    ("hr", "hrv_Latn"),
    ("hrv", "hrv_Latn"),
];

/// Whether `code` already looks like a FLORES-200 code (`xxx_Script`).
pub fn is_flores_code(code: &str) -> bool {
    code.contains('_')
}

/// Normalize an alias or FLORES code to FLORES-200. Unknown codes are returned
/// trimmed but otherwise untouched so the service can reject them.
pub fn normalize(code: &str) -> String {
    let code = code.trim();
    if is_flores_code(code) {
        return code.to_string();
    }

    let lowered = code.to_lowercase();
    FLORES_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, flores)| flores.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Short code used in `<basename>.<code>.srt` filenames.
pub fn filename_suffix(code: &str) -> String {
    let flores = normalize(code);

    if let Some((alias, _)) = FLORES_ALIASES.iter().find(|(_, f)| *f == flores) {
        return alias.to_string();
    }

    let language = flores.split('_').next().unwrap_or(&flores);
    language.chars().take(3).collect::<String>().to_lowercase()
}

/// Every filename alias of the language `code` refers to, preferred first.
/// Unknown languages yield their filename suffix alone.
pub fn aliases_for(code: &str) -> Vec<String> {
    let flores = normalize(code);
    let aliases: Vec<String> = FLORES_ALIASES
        .iter()
        .filter(|(_, f)| *f == flores)
        .map(|(alias, _)| alias.to_string())
        .collect();

    if aliases.is_empty() {
        vec![filename_suffix(code)]
    } else {
        aliases
    }
}

/// Whether `code` is a language alias known to the table, case-insensitive.
pub fn is_known_alias(code: &str) -> bool {
    let lowered = code.to_lowercase();
    FLORES_ALIASES.iter().any(|(alias, _)| *alias == lowered)
}

/// Whether two codes refer to the same language.
pub fn same_language(a: &str, b: &str) -> bool {
    normalize(a).eq_ignore_ascii_case(&normalize(b))
}
