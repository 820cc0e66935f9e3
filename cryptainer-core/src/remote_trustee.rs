//! `RemoteTrustee`: a `Trustee` that forwards every call over HTTP+JSON to
//! the trustee RPC surface in `cryptainer-api` (SPEC_FULL.md §6.C). One POST
//! route per `Trustee` method, `serde_json` request/response bodies —
//! intentionally narrower than a general JSON-RPC 2.0 envelope (§1 Non-goal).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cryptainer_crypto::{AsymmetricCipherAlgo, SignatureAlgo};
use cryptainer_keystore::{KeyAlgo, KeychainUid};

use crate::error::CryptainerError;
use crate::trustee::{CipherBlob, DecryptionAuthorizationResponse, KeypairIdentifier, KeypairStatus, Trustee};

pub struct RemoteTrustee {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteTrustee {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }

    /// Maps a server-side status slug to a local error kind (§7), mirroring
    /// the `Trustee RPC` section's "errors returned as status slugs" contract.
    fn map_status_slug(slug: &str, detail: &str) -> CryptainerError {
        match slug {
            "key_does_not_exist" => CryptainerError::KeyDoesNotExist(detail.to_string()),
            "key_already_exists" => CryptainerError::KeyAlreadyExists(detail.to_string()),
            "key_loading_error" => CryptainerError::KeyLoadingError(detail.to_string()),
            "decryption_error" => CryptainerError::DecryptionError(detail.to_string()),
            "authorization_error" => CryptainerError::AuthorizationError(detail.to_string()),
            "value_error" => CryptainerError::ValueError(detail.to_string()),
            _ => CryptainerError::IoError(format!("unrecognized remote trustee error {}: {}", slug, detail)),
        }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, CryptainerError> {
        let response = self
            .client
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| CryptainerError::IoError(format!("trustee RPC transport error: {}", e)))?;

        if response.status().is_success() {
            response
                .json::<Resp>()
                .await
                .map_err(|e| CryptainerError::IoError(format!("trustee RPC decode error: {}", e)))
        } else {
            let envelope: RpcErrorEnvelope = response
                .json()
                .await
                .map_err(|e| CryptainerError::IoError(format!("trustee RPC error decode failure: {}", e)))?;
            Err(Self::map_status_slug(&envelope.error, &envelope.detail))
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RpcErrorEnvelope {
    error: String,
    detail: String,
}

#[derive(Serialize)]
struct FetchPublicKeyRequest {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
    must_exist: bool,
}

#[derive(Deserialize)]
struct FetchPublicKeyResponse {
    public_key: Vec<u8>,
}

#[derive(Serialize)]
struct GetMessageSignatureRequest<'a> {
    keychain_uid: KeychainUid,
    message: &'a [u8],
    signature_algo: SignatureAlgo,
}

#[derive(Deserialize)]
struct GetMessageSignatureResponse {
    signature: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireKeypairIdentifier {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
}

#[derive(Serialize)]
struct RequestDecryptionAuthorizationRequest<'a> {
    keypair_identifiers: Vec<WireKeypairIdentifier>,
    request_message: &'a str,
    passphrases: &'a [String],
}

#[derive(Deserialize)]
struct WireKeypairStatus {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
    status: String,
}

#[derive(Deserialize)]
struct RequestDecryptionAuthorizationResponse {
    response_message: String,
    has_errors: bool,
    keypair_statuses: Vec<WireKeypairStatus>,
}

#[derive(Serialize)]
struct DecryptWithPrivateKeyRequest<'a> {
    keychain_uid: KeychainUid,
    encryption_algo: AsymmetricCipherAlgo,
    cipherdict: &'a CipherBlob,
    passphrases: &'a [String],
}

#[derive(Deserialize)]
struct DecryptWithPrivateKeyResponse {
    plaintext: Vec<u8>,
}

#[async_trait]
impl Trustee for RemoteTrustee {
    async fn fetch_public_key(
        &self,
        kuid: KeychainUid,
        key_algo: KeyAlgo,
        must_exist: bool,
    ) -> Result<Vec<u8>, CryptainerError> {
        let resp: FetchPublicKeyResponse = self
            .post("fetch_public_key", &FetchPublicKeyRequest { keychain_uid: kuid, key_algo, must_exist })
            .await?;
        Ok(resp.public_key)
    }

    async fn get_message_signature(
        &self,
        kuid: KeychainUid,
        message: &[u8],
        signature_algo: SignatureAlgo,
    ) -> Result<Vec<u8>, CryptainerError> {
        let resp: GetMessageSignatureResponse = self
            .post("get_message_signature", &GetMessageSignatureRequest { keychain_uid: kuid, message, signature_algo })
            .await?;
        Ok(resp.signature)
    }

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<DecryptionAuthorizationResponse, CryptainerError> {
        let wire_identifiers = keypair_identifiers
            .iter()
            .map(|id| WireKeypairIdentifier { keychain_uid: id.keychain_uid, key_algo: id.key_algo })
            .collect();
        let resp: RequestDecryptionAuthorizationResponse = self
            .post(
                "request_decryption_authorization",
                &RequestDecryptionAuthorizationRequest {
                    keypair_identifiers: wire_identifiers,
                    request_message,
                    passphrases,
                },
            )
            .await?;

        let keypair_statuses = resp
            .keypair_statuses
            .into_iter()
            .map(|s| {
                let status = match s.status.as_str() {
                    "accepted" => KeypairStatus::Accepted,
                    "missing_private_key" => KeypairStatus::MissingPrivateKey,
                    "authorization_missing" => KeypairStatus::AuthorizationMissing,
                    _ => KeypairStatus::MissingPassphrase,
                };
                (KeypairIdentifier { keychain_uid: s.keychain_uid, key_algo: s.key_algo }, status)
            })
            .collect();

        Ok(DecryptionAuthorizationResponse {
            response_message: resp.response_message,
            has_errors: resp.has_errors,
            keypair_statuses,
        })
    }

    async fn decrypt_with_private_key(
        &self,
        kuid: KeychainUid,
        encryption_algo: AsymmetricCipherAlgo,
        cipherdict: &CipherBlob,
        passphrases: &[String],
    ) -> Result<Vec<u8>, CryptainerError> {
        let resp: DecryptWithPrivateKeyResponse = self
            .post(
                "decrypt_with_private_key",
                &DecryptWithPrivateKeyRequest { keychain_uid: kuid, encryption_algo, cipherdict, passphrases },
            )
            .await?;
        Ok(resp.plaintext)
    }
}
