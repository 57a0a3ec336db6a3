pub mod analysis;
pub mod content;
pub mod domain;
pub mod ports;

pub use domain::{
    AccessCredential, Analysis, AnalysisFailure, AnalysisFailureKind, AnalysisOutcome,
    Completion, Idea, IdeaAnalysisUpdate, IdeaStatus, InputType, SuggestedLink, UserSecret,
};
pub use ports::{
    ArchiveService, CodeExchangeOutcome, ContentExtractor, CredentialProvider, ExtractionFailure,
    IdeaRepository, PortError, PortResult, SecretStore, SummarizationService,
};
