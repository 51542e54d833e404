//! REST client for the identity provider's account operations.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::IdentityError;

/// Successful credential exchange with the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    /// Identity uid of the signed-in account.
    pub local_id: String,
    /// ID token to present as a Bearer token on subsequent requests.
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Error envelope returned by the provider on rejected operations.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the identity provider's account endpoints
/// (`/v1/accounts:<operation>?key=<api key>`).
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        IdentityClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: Value,
    ) -> Result<T, IdentityError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, operation);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        if resp.status().is_success() {
            return resp
                .json()
                .await
                .map_err(|e| IdentityError::Provider(e.to_string()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => Err(IdentityError::Rejected(body.error.message)),
            Err(_) => Err(IdentityError::Provider(text)),
        }
    }

    /// Exchange email/password credentials for a session.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, IdentityError> {
        self.post(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    /// Create an account and send the verification email.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, IdentityError> {
        let signed_in: SignInResponse = self
            .post(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        self.send_verification(&signed_in.id_token).await?;
        Ok(signed_in)
    }

    /// Exchange an OAuth provider credential (e.g. a Google ID token) for a
    /// session.
    pub async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        credential: &str,
    ) -> Result<SignInResponse, IdentityError> {
        self.post(
            "signInWithIdp",
            json!({
                "postBody": format!("id_token={credential}&providerId={provider_id}"),
                "requestUri": "http://localhost",
                "returnSecureToken": true,
            }),
        )
        .await
    }

    /// Ask the provider to send a password reset email.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let _: Value = self
            .post(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    /// Re-send the address verification email for the current session.
    pub async fn send_verification(&self, id_token: &str) -> Result<(), IdentityError> {
        let _: Value = self
            .post(
                "sendOobCode",
                json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }),
            )
            .await?;
        Ok(())
    }
}
