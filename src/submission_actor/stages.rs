//! The four stages of the ordered submission sequence.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    CreateSubmission,
    AddAnalysisProcess,
    AddFileReferences,
    UploadFiles,
}

impl Stage {
    /// The stage after this one; the last stage wraps back to the first.
    pub fn next(self) -> Self {
        match self {
            Stage::CreateSubmission => Stage::AddAnalysisProcess,
            Stage::AddAnalysisProcess => Stage::AddFileReferences,
            Stage::AddFileReferences => Stage::UploadFiles,
            Stage::UploadFiles => Stage::CreateSubmission,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::CreateSubmission => "create analysis submission",
            Stage::AddAnalysisProcess => "add analysis process",
            Stage::AddFileReferences => "add file references",
            Stage::UploadFiles => "upload files",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
