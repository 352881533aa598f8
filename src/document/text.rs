//! Text normalization for rendered fields.

/// Internal placeholder for values that upstream has not computed yet.
/// It must never reach a rendered document.
pub const NOT_COMPUTED_TOKEN: &str = "__NOT_COMPUTED__";

/// Control measure labels that mean "process control", in every supported
/// language. Compared after [`normalize_label`].
const PROCESS_CONTROL_LABELS: &[&str] = &[
    "process control",
    "process controls",
    "control de proceso",
    "control de procesos",
    "control del proceso",
    "controle de processus",
    "controle du processus",
    "controle de processo",
    "controle do processo",
    "controlo de processo",
    "controlo do processo",
    "prozesskontrolle",
    "prozesslenkung",
    "controllo di processo",
    "controllo del processo",
];

/// Fold a Latin letter with a diacritic to its base letter.
///
/// Characters without a mapping are returned unchanged.
pub fn fold_char(c: char) -> char {
    match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ª' => 'a',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ç' | 'ć' | 'č' => 'c',
        'Ď' | 'Đ' | 'Ð' => 'D',
        'ď' | 'đ' | 'ð' => 'd',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'Ğ' => 'G',
        'ğ' => 'g',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => 'I',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => 'i',
        'Ł' => 'L',
        'ł' => 'l',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => 'O',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' | 'º' => 'o',
        'Ř' => 'R',
        'ř' => 'r',
        'Ś' | 'Š' | 'Ş' => 'S',
        'ś' | 'š' | 'ş' => 's',
        'Ť' | 'Ţ' => 'T',
        'ť' | 'ţ' => 't',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'Ý' | 'Ÿ' => 'Y',
        'ý' | 'ÿ' => 'y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ź' | 'ż' | 'ž' => 'z',
        '\u{00A0}' => ' ',
        _ => c,
    }
}

/// Canonical form of a label: folded, lowercased, whitespace collapsed to
/// single spaces, hyphens and underscores treated as whitespace.
pub fn normalize_label(label: &str) -> String {
    let folded: String = label
        .chars()
        .map(fold_char)
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a control measure label is one of the "process control" labels.
pub fn is_process_control_label(label: &str) -> bool {
    let key = normalize_label(label);
    let compact: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    PROCESS_CONTROL_LABELS
        .iter()
        .any(|known| *known == key || known.replace(' ', "") == compact)
}

/// Displayable value of an optional field.
///
/// Returns `None` for missing, blank or not-yet-computed values so the
/// caller can substitute its marker.
pub fn clean_field(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.contains(NOT_COMPUTED_TOKEN) {
        return None;
    }
    Some(value.to_string())
}
