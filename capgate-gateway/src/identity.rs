use capgate_model::Identity;

/// Turns the credential a transport received into an [`Identity`].
pub trait IdentityExtractor: Send + Sync {
    fn extract(&self, credential: Option<&str>) -> Option<Identity>;
}

/// Reads `Bearer <token>` authorization values. The scheme is matched
/// case-insensitively; anything else, or a blank token, is no identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenExtractor;

impl IdentityExtractor for BearerTokenExtractor {
    fn extract(&self, credential: Option<&str>) -> Option<Identity> {
        let (scheme, token) = credential?.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Identity::parse(token)
    }
}
