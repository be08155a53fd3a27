use civicdesk_auth::{Principal, TokenValidationError};

/// Who is calling, as established by the auth middleware.
///
/// Present on every `/api` request. A rejected assertion is kept distinct
/// from an absent one so public operations can ignore it while protected
/// ones report why authentication failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestCaller {
    Anonymous,
    Verified(Principal),
    Rejected(TokenValidationError),
}
