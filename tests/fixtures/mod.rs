//! Test fixtures: queued faxes, trunks and a stand-in for Ghostscript
#![allow(dead_code)]

use fax_spooler::models::{job::FaxJob, trunk::TrunkNumber};

pub const SERVER_NAME: &str = "voip-cluster02-upstream01";

/// Minimal bytes the pipeline writes out as the working PDF.
pub const SAMPLE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj <<>> endobj\ntrailer <<>>\n%%EOF\n";

/// Shell body run in place of `gs`: writes a fake TIFF to the `-sOutputFile=` target.
pub const FAKE_GS_OK: &str = r#"for a in "$@"; do
  case "$a" in -sOutputFile=*) out="${a#-sOutputFile=}";; esac
done
printf 'II*\000' > "$out""#;

/// Shell body that fails the way Ghostscript does on a broken document.
pub const FAKE_GS_FAIL: &str = "echo 'Error: /syntaxerror in pdf' >&2\nexit 1";

/// Fixture describing one queued fax and the trunk rows its number resolves to.
#[derive(Debug, Clone)]
pub struct FaxFixture {
    pub id: i64,
    pub filename: &'static str,
    pub outgoing_number_id: i64,
    pub to: &'static str,
    pub description: &'static str,
}

impl FaxFixture {
    pub fn job(&self) -> FaxJob {
        FaxJob {
            id: self.id,
            fax_data: SAMPLE_PDF.to_vec(),
            filename: self.filename.to_string(),
            outgoing_number_id: self.outgoing_number_id,
            to: self.to.to_string(),
        }
    }
}

pub const INVOICE: FaxFixture = FaxFixture {
    id: 42,
    filename: "invoice.pdf",
    outgoing_number_id: 7,
    to: "5551234567",
    description: "Plain PDF on a trunk without identity header",
};

pub const INVOICE_RESEND: FaxFixture = FaxFixture {
    id: 47,
    filename: "invoice.pdf",
    outgoing_number_id: 7,
    to: "5552223333",
    description: "Same file name as INVOICE, different recipient",
};

pub const INVOICE_DOCX: FaxFixture = FaxFixture {
    id: 43,
    filename: "invoice.docx",
    outgoing_number_id: 7,
    to: "5551234567",
    description: "Word document, not accepted",
};

pub const SIGNED_CONTRACT: FaxFixture = FaxFixture {
    id: 44,
    filename: "Signed Contract.PDF",
    outgoing_number_id: 8,
    to: "5557654321",
    description: "Upper-case extension, whitespace in name, trunk with identity header",
};

pub const UNKNOWN_TRUNK: FaxFixture = FaxFixture {
    id: 45,
    filename: "orphan.pdf",
    outgoing_number_id: 99,
    to: "5550000000",
    description: "Outgoing number with no fax trunk",
};

pub const DUPLICATE_TRUNK: FaxFixture = FaxFixture {
    id: 46,
    filename: "duplicate.pdf",
    outgoing_number_id: 9,
    to: "5550000001",
    description: "Outgoing number with two fax trunks",
};

pub fn plain_trunk() -> TrunkNumber {
    TrunkNumber {
        full_number: "5559999999".to_string(),
        header_ppid: None,
        ps_endpoints_id: "trunk1".to_string(),
    }
}

pub fn identity_trunk() -> TrunkNumber {
    TrunkNumber {
        full_number: "5558888888".to_string(),
        header_ppid: Some("<sip:+15558888888@carrier.example>;party=calling".to_string()),
        ps_endpoints_id: "trunk2".to_string(),
    }
}
