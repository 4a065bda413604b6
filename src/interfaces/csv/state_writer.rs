use crate::domain::state::{FailureKind, OrchestratorState, Phase};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct StateRow<'a> {
    phase: Phase,
    transaction_id: i64,
    status: String,
    error: Option<FailureKind>,
    reason_code: Option<i32>,
    message: Option<&'a str>,
    redirect_url: Option<&'a str>,
    polls: u32,
}

impl<'a> From<&'a OrchestratorState> for StateRow<'a> {
    fn from(state: &'a OrchestratorState) -> Self {
        let error = state.error.as_ref();
        Self {
            phase: state.phase,
            transaction_id: state.transaction_id(),
            status: state.transaction.status.to_string(),
            error: error.map(|e| e.kind),
            reason_code: state.transaction.reason_code,
            message: error.and_then(|e| e.message.as_deref()),
            redirect_url: state.qr.as_ref().map(|qr| qr.redirect_url.as_str()),
            polls: state.polls,
        }
    }
}

/// Writes orchestrator snapshots as CSV rows, header first.
pub struct StateWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_state(&mut self, state: &OrchestratorState) -> Result<()> {
        self.writer.serialize(StateRow::from(state))?;
        Ok(())
    }

    /// Writes one row per snapshot and flushes.
    pub fn write_states<'a>(
        &mut self,
        states: impl IntoIterator<Item = &'a OrchestratorState>,
    ) -> Result<()> {
        for state in states {
            self.write_state(state)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Failure;
    use crate::domain::transaction::{QrDetails, Transaction, TransactionStatus};

    fn render(states: &[OrchestratorState]) -> String {
        let mut out = Vec::new();
        {
            let mut writer = StateWriter::new(&mut out);
            writer.write_states(states).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_and_failed_row() {
        let mut failed = OrchestratorState::new(Phase::Failed);
        failed.transaction = Transaction {
            status: TransactionStatus::Declined,
            reason_code: Some(5051),
            ..Transaction::with_id(123)
        };
        failed.error = Some(Failure::declined(Some(5051)));

        let output = render(&[OrchestratorState::new(Phase::Submitting), failed]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "phase,transaction_id,status,error,reason_code,message,redirect_url,polls"
        );
        assert_eq!(lines[1], "Submitting,0,Pending,,,,,0");
        assert_eq!(lines[2], "Failed,123,Declined,Declined,5051,,,0");
    }

    #[test]
    fn test_redirect_url_and_polls() {
        let mut polling = OrchestratorState::new(Phase::Polling);
        polling.qr = Some(QrDetails {
            redirect_url: "https://qr.example/pay".into(),
            ..QrDetails::default()
        });
        polling.polls = 3;

        let output = render(&[polling]);
        assert!(output.contains("Polling,0,Pending,,,,https://qr.example/pay,3"));
    }
}
