use std::fmt;

use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppResult, GetField};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

const IDENTITY_TOOLKIT: &str = "https://identitytoolkit.googleapis.com/v1/accounts:";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub fn id(&self) -> &str {
        use ClientProvider::*;
        match self {
            Google => "google.com",
            Github => "github.com",
        }
    }

    fn slug(&self) -> &str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    pub fn scopes(&self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        }
    }

    fn endpoints(&self) -> (&'static str, &'static str) {
        use ClientProvider::*;
        match self {
            Google => ("https://accounts.google.com/o/oauth2/auth", "https://oauth2.googleapis.com/token"),
            Github => ("https://github.com/login/oauth/authorize", "https://github.com/login/oauth/access_token"),
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Handles on the hosted identity provider: the identity toolkit REST API
/// plus whichever OAuth providers have keys configured.
#[derive(Clone)]
pub struct Clients {
    identity_toolkit: String,
    api_key: String,
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    /// `json` is the client secret document:
    /// `{"firebase": {"apikey", "endpoint"?}, "google"?: {...}, "github"?: {...}}`.
    pub fn from_json(json: Value, public_url: &str) -> AppResult<Clients> {
        let firebase = json.get_obj_field("firebase")?;
        let api_key = firebase.get_str_field("apikey")?;
        let identity_toolkit = firebase
            .get_str_field("endpoint")
            .unwrap_or_else(|_| IDENTITY_TOOLKIT.to_owned());

        let google_client = provider_client(&json, ClientProvider::Google, public_url)?;
        let github_client = provider_client(&json, ClientProvider::Github, public_url)?;

        Ok(
            Clients {
                identity_toolkit,
                api_key,
                google_client,
                github_client,
            }
        )
    }

    /// URL of an identity toolkit method such as `signUp` or `signInWithIdp`.
    pub fn identity_url(&self, method: &str) -> String {
        format!("{}{method}?key={}", self.identity_toolkit, self.api_key)
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }.ok_or(format!("OAuth provider {provider} keys not supplied").into())
    }
}

fn provider_client(json: &Value, provider: ClientProvider, public_url: &str) -> AppResult<Option<HappyClient>> {
    let Some(json) = json.get(provider.slug()) else {
        return Ok(None);
    };
    let client_id = ClientId::new(json.get_str_field("client_id")?);
    let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

    let (auth_url, token_url) = provider.endpoints();
    let auth_url = AuthUrl::new(auth_url.to_owned())?;
    let token_url = TokenUrl::new(token_url.to_owned())?;
    let redirect_url = RedirectUrl::new(format!(
        "{}/lockin/{}",
        public_url.trim_end_matches('/'),
        provider.slug()
    ))?;

    Ok(Some(
        BasicClient::new(client_id)
        .set_client_secret(client_secret)
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url)
    ))
}
