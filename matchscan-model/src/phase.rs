use std::fmt;

/// Progress annotation for a running scan worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScannerPhase {
    TestScan,
    ManualScan,
    /// Official scan collecting history before the event opens.
    OfficialBaseline,
    OfficialInProgress,
    /// Final sweep after the event has closed.
    OfficialFinishing,
}

impl ScannerPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScannerPhase::TestScan => "TestScan",
            ScannerPhase::ManualScan => "ManualScan",
            ScannerPhase::OfficialBaseline => "OfficialBaseline",
            ScannerPhase::OfficialInProgress => "OfficialInProgress",
            ScannerPhase::OfficialFinishing => "OfficialFinishing",
        }
    }
}

impl fmt::Display for ScannerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
