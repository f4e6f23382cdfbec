//! # OAuth Client Service
//!
//! CRUD for relying parties plus the invariants the data-model table pins
//! down: a public client must require PKCE and carries no secret; a
//! confidential client gets a KEK-sealed secret and authenticates with
//! `client_secret_basic`.

use rand::RngCore;
use shared::{crypto::kek::Kek, errors::ApiError};
use std::sync::Arc;

use crate::domain::{Client, ClientType};
use crate::repository::ClientRepository;

const CLIENT_SECRET_BYTES: usize = 32;

pub struct CreatedClient {
    pub client: Client,
    /// The plaintext secret, returned exactly once at creation time and
    /// never again — only its KEK-sealed form is retained.
    pub plaintext_secret: Option<String>,
}

#[derive(Clone)]
pub struct ClientService {
    repository: ClientRepository,
    kek: Arc<Kek>,
}

impl ClientService {
    pub fn new(repository: ClientRepository, kek: Arc<Kek>) -> Self {
        Self { repository, kek }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        client_id: &str,
        client_type: ClientType,
        name: &str,
        redirect_uris: Vec<String>,
        grant_types: Vec<String>,
        allowed_scopes: Vec<String>,
    ) -> Result<CreatedClient, ApiError> {
        let (token_endpoint_auth_method, require_pkce, secret_encrypted, plaintext_secret) = match client_type {
            ClientType::Public => ("none".to_string(), true, None, None),
            ClientType::Confidential => {
                let mut raw = vec![0u8; CLIENT_SECRET_BYTES];
                rand::rngs::OsRng.fill_bytes(&mut raw);
                let plaintext = shared::crypto::primitives::b64url_encode(&raw);
                let sealed = self
                    .kek
                    .seal(plaintext.as_bytes())
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                ("client_secret_basic".to_string(), false, Some(sealed), Some(plaintext))
            }
        };

        let client = self
            .repository
            .create(
                client_id,
                client_type,
                name,
                &redirect_uris,
                &grant_types,
                &token_endpoint_auth_method,
                secret_encrypted.as_deref(),
                require_pkce,
                &allowed_scopes,
            )
            .await?;

        Ok(CreatedClient { client, plaintext_secret })
    }

    pub async fn find(&self, client_id: &str) -> Result<Option<Client>, ApiError> {
        self.repository.find(client_id).await
    }

    pub async fn list(&self) -> Result<Vec<Client>, ApiError> {
        self.repository.list().await
    }

    pub async fn delete(&self, client_id: &str) -> Result<(), ApiError> {
        self.repository.delete(client_id).await
    }

    /// Verifies a confidential client's presented secret against its
    /// KEK-sealed one. Public clients never authenticate this way — callers
    /// route them through PKCE instead.
    pub async fn verify_secret(&self, client_id: &str, presented_secret: &str) -> Result<Client, ApiError> {
        let client = self
            .repository
            .find(client_id)
            .await?
            .ok_or(ApiError::InvalidClient)?;

        let secret_encrypted = client.secret_encrypted.as_ref().ok_or(ApiError::InvalidClient)?;
        let expected = self
            .kek
            .unseal(secret_encrypted)
            .map_err(|_| ApiError::InvalidClient)?;

        if shared::crypto::primitives::constant_time_eq(presented_secret.as_bytes(), &expected) {
            Ok(client)
        } else {
            Err(ApiError::InvalidClient)
        }
    }

    /// Validates a redirect URI against the client's registered allow-list —
    /// exact string match, no prefix or wildcard matching.
    pub fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> Result<(), ApiError> {
        validate_redirect_uri_check(client, redirect_uri)
    }

    pub fn validate_grant_type(&self, client: &Client, grant_type: &str) -> Result<(), ApiError> {
        validate_grant_type_check(client, grant_type)
    }
}

fn validate_redirect_uri_check(client: &Client, redirect_uri: &str) -> Result<(), ApiError> {
    if client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest { message: "redirect_uri not registered for client".to_string() })
    }
}

fn validate_grant_type_check(client: &Client, grant_type: &str) -> Result<(), ApiError> {
    if client.grant_types.iter().any(|g| g == grant_type) {
        Ok(())
    } else {
        Err(ApiError::InvalidGrant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client(client_type: ClientType) -> Client {
        Client {
            client_id: "client-1".to_string(),
            client_type,
            name: "Test Client".to_string(),
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
            secret_encrypted: None,
            require_pkce: true,
            allowed_scopes: vec!["openid".to_string()],
        }
    }

    #[test]
    fn test_validate_redirect_uri_rejects_unregistered() {
        let client = sample_client(ClientType::Public);
        assert!(validate_redirect_uri_check(&client, "https://evil.example.com").is_err());
        assert!(validate_redirect_uri_check(&client, "https://app.example.com/callback").is_ok());
    }

    #[test]
    fn test_validate_grant_type_rejects_unregistered() {
        let client = sample_client(ClientType::Confidential);
        assert!(validate_grant_type_check(&client, "client_credentials").is_err());
        assert!(validate_grant_type_check(&client, "authorization_code").is_ok());
    }
}
