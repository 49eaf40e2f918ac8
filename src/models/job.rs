use strum::{Display, EnumString};

/// Lifecycle state of an outgoing fax, as stored in `faxes_outgoing.state`.
#[derive(Debug, Clone, Copy, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum FaxState {
    Created,
    Processing,
    Processed,
}

impl FaxState {
    /// Only forward, single-step transitions are allowed.
    pub fn can_transition_to(self, next: FaxState) -> bool {
        matches!(
            (self, next),
            (FaxState::Created, FaxState::Processing) | (FaxState::Processing, FaxState::Processed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaxState::Created => "created",
            FaxState::Processing => "processing",
            FaxState::Processed => "processed",
        }
    }
}

/// An outgoing fax picked up from the queue. Always in state `created` when loaded.
#[derive(Debug, Clone)]
pub struct FaxJob {
    pub id: i64,
    /// Raw PDF payload.
    pub fax_data: Vec<u8>,
    pub filename: String,
    /// Reference into `trunk_numbers`.
    pub outgoing_number_id: i64,
    /// Destination telephone number.
    pub to: String,
}

impl FaxJob {
    /// File name of the working PDF in the staging directory.
    ///
    /// Prefixed with the job id so two jobs sharing a `filename` never share
    /// a PDF, TIFF or call file.
    pub fn working_name(&self) -> String {
        format!("{}-{}", self.id, self.filename)
    }
}
