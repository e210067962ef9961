//! URI identifier codes from the NFC Forum URI record type definition.
//!
//! A URI record's first payload byte abbreviates a common prefix; code 0x00
//! means the URI is stored verbatim.

const PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Picks the longest matching prefix and returns its identifier code plus
/// the unabbreviated remainder.
pub fn abbreviate(uri: &str) -> (u8, &str) {
    let mut best = 0usize;
    for (code, prefix) in PREFIXES.iter().enumerate().skip(1) {
        if uri.starts_with(prefix) && prefix.len() > PREFIXES[best].len() {
            best = code;
        }
    }
    (best as u8, &uri[PREFIXES[best].len()..])
}

/// Expands an identifier code back into its prefix. Codes beyond the table
/// are treated as 0x00.
pub fn expand(code: u8) -> &'static str {
    PREFIXES.get(code as usize).copied().unwrap_or("")
}
