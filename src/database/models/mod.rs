pub mod intermediate;
pub mod log;
pub mod organization;
pub mod principal;
pub mod profile;
pub mod terminal;

pub use intermediate::{Intermediate, IntermediateKind, IntermediatePatch};
pub use log::TransactionLog;
pub use organization::{Organization, OrganizationPatch, QuotaKind, SignerCredential};
pub use principal::{PrincipalPatch, Role, User};
pub use profile::CertificateProfile;
pub use terminal::{Person, Terminal, TerminalPatch};

/// Placeholder written over secrets in every response body
pub const REDACTED: &str = "********";
