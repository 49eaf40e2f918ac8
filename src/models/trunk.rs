/// An outbound line from `trunk_numbers`, flagged as fax capable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkNumber {
    /// Full dialable number, used as caller ID.
    pub full_number: String,
    /// Optional P-Preferred-Identity header value.
    pub header_ppid: Option<String>,
    /// PJSIP endpoint the call is placed through.
    pub ps_endpoints_id: String,
}

impl TrunkNumber {
    /// The identity header, if one is configured and non-empty.
    pub fn identity_header(&self) -> Option<&str> {
        self.header_ppid.as_deref().filter(|h| !h.is_empty())
    }
}
