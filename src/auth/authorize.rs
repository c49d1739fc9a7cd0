use url::Url;

/// Response type requested from the authorization endpoint (implicit grant)
pub const RESPONSE_TYPE_TOKEN: &str = "token";

/// Parameters of one implicit-grant authorization request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Ask the provider to show the consent screen even if already granted
    pub force_verify: bool,
    pub state: String,
}

impl AuthorizationRequest {
    /// Build the browser URL for this request against `endpoint`.
    ///
    /// Any query already present on the endpoint is kept.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", RESPONSE_TYPE_TOKEN)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("force_verify", if self.force_verify { "true" } else { "false" })
            .append_pair("state", &self.state);
        url
    }
}
