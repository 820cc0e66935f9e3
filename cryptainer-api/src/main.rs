//! Cryptainer Trustee API
//!
//! HTTP surface for the four `Trustee` methods (SPEC_FULL.md §6.C), so a
//! `RemoteTrustee` client in another process can reach a keystore it does not
//! hold directly. One POST route per method, plain `serde_json` bodies —
//! intentionally narrower than a general JSON-RPC 2.0 envelope.
//!
//! Same `AppState`/`Shared` shape, tracing-subscriber bootstrap, and
//! tuple-response error style used elsewhere in this workspace's HTTP
//! surface, trimmed to this crate's narrower needs: no rate limiting, no
//! API-key auth — a trustee RPC endpoint is meant to sit behind whatever
//! network boundary the deployment already has.
//!
//! Configuration (environment variables):
//!   CRYPTAINER_API_PORT     - Listen port (default: 8080)
//!   CRYPTAINER_KEYSTORE_DIR - Keystore directory (default: ./cryptainer-keys)
//!   CRYPTAINER_LOG          - tracing EnvFilter spec (default: info)
//!   CRYPTAINER_LOG_FORMAT   - "json" for structured logging, "pretty" for dev (default)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use cryptainer_core::trustee::{CipherBlob, KeypairIdentifier, KeypairStatus, Trustee};
use cryptainer_core::{CryptainerError, LocalTrustee};
use cryptainer_crypto::{AsymmetricCipherAlgo, SignatureAlgo};
use cryptainer_keystore::{FileBackend, KeyAlgo, Keystore, KeychainUid};

struct AppState {
    trustee: LocalTrustee,
}

type Shared = Arc<AppState>;

#[derive(Serialize)]
struct RpcErrorEnvelope {
    error: String,
    detail: String,
}

/// Maps a `CryptainerError` to an HTTP status and the status slug the
/// `RemoteTrustee` client decodes back into a local error kind (§7).
fn error_response(e: CryptainerError) -> (StatusCode, Json<RpcErrorEnvelope>) {
    let (status, slug) = match &e {
        CryptainerError::KeyDoesNotExist(_) => (StatusCode::NOT_FOUND, "key_does_not_exist"),
        CryptainerError::KeyAlreadyExists(_) => (StatusCode::CONFLICT, "key_already_exists"),
        CryptainerError::KeyLoadingError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "key_loading_error"),
        CryptainerError::DecryptionError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "decryption_error"),
        CryptainerError::DecryptionIntegrityError(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "decryption_error")
        }
        CryptainerError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "authorization_error"),
        CryptainerError::ConfigurationError(_) => (StatusCode::BAD_REQUEST, "value_error"),
        CryptainerError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "value_error"),
        CryptainerError::ValueError(_) => (StatusCode::BAD_REQUEST, "value_error"),
        CryptainerError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "value_error"),
    };
    (status, Json(RpcErrorEnvelope { error: slug.to_string(), detail: e.to_string() }))
}

// ---------------------------------------------------------------------------
// Wire bodies — mirror the private structs in cryptainer_core::remote_trustee
// field-for-field, since JSON round-trips on field names, not type identity.
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FetchPublicKeyRequest {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
    must_exist: bool,
}

#[derive(Serialize)]
struct FetchPublicKeyResponse {
    public_key: Vec<u8>,
}

#[derive(Deserialize)]
struct GetMessageSignatureRequest {
    keychain_uid: KeychainUid,
    message: Vec<u8>,
    signature_algo: SignatureAlgo,
}

#[derive(Serialize)]
struct GetMessageSignatureResponse {
    signature: Vec<u8>,
}

#[derive(Deserialize)]
struct WireKeypairIdentifier {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
}

#[derive(Deserialize)]
struct RequestDecryptionAuthorizationRequest {
    keypair_identifiers: Vec<WireKeypairIdentifier>,
    request_message: String,
    passphrases: Vec<String>,
}

#[derive(Serialize)]
struct WireKeypairStatus {
    keychain_uid: KeychainUid,
    key_algo: KeyAlgo,
    status: String,
}

#[derive(Serialize)]
struct RequestDecryptionAuthorizationResponse {
    response_message: String,
    has_errors: bool,
    keypair_statuses: Vec<WireKeypairStatus>,
}

#[derive(Deserialize)]
struct DecryptWithPrivateKeyRequest {
    keychain_uid: KeychainUid,
    encryption_algo: AsymmetricCipherAlgo,
    cipherdict: CipherBlob,
    passphrases: Vec<String>,
}

#[derive(Serialize)]
struct DecryptWithPrivateKeyResponse {
    plaintext: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn fetch_public_key(State(state): State<Shared>, Json(req): Json<FetchPublicKeyRequest>) -> Response {
    match state.trustee.fetch_public_key(req.keychain_uid, req.key_algo, req.must_exist).await {
        Ok(public_key) => Json(FetchPublicKeyResponse { public_key }).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_message_signature(
    State(state): State<Shared>,
    Json(req): Json<GetMessageSignatureRequest>,
) -> Response {
    match state
        .trustee
        .get_message_signature(req.keychain_uid, &req.message, req.signature_algo)
        .await
    {
        Ok(signature) => Json(GetMessageSignatureResponse { signature }).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

fn status_slug(status: &KeypairStatus) -> &'static str {
    match status {
        KeypairStatus::Accepted => "accepted",
        KeypairStatus::MissingPrivateKey => "missing_private_key",
        KeypairStatus::AuthorizationMissing => "authorization_missing",
        KeypairStatus::MissingPassphrase => "missing_passphrase",
    }
}

async fn request_decryption_authorization(
    State(state): State<Shared>,
    Json(req): Json<RequestDecryptionAuthorizationRequest>,
) -> Response {
    let identifiers: Vec<KeypairIdentifier> = req
        .keypair_identifiers
        .iter()
        .map(|w| KeypairIdentifier { keychain_uid: w.keychain_uid, key_algo: w.key_algo })
        .collect();

    match state
        .trustee
        .request_decryption_authorization(&identifiers, &req.request_message, &req.passphrases)
        .await
    {
        Ok(resp) => {
            let keypair_statuses = resp
                .keypair_statuses
                .iter()
                .map(|(id, status)| WireKeypairStatus {
                    keychain_uid: id.keychain_uid,
                    key_algo: id.key_algo,
                    status: status_slug(status).to_string(),
                })
                .collect();
            Json(RequestDecryptionAuthorizationResponse {
                response_message: resp.response_message,
                has_errors: resp.has_errors,
                keypair_statuses,
            })
            .into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

async fn decrypt_with_private_key(
    State(state): State<Shared>,
    Json(req): Json<DecryptWithPrivateKeyRequest>,
) -> Response {
    match state
        .trustee
        .decrypt_with_private_key(req.keychain_uid, req.encryption_algo, &req.cipherdict, &req.passphrases)
        .await
    {
        Ok(plaintext) => Json(DecryptWithPrivateKeyResponse { plaintext }).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[tokio::main]
async fn main() {
    let log_format = std::env::var("CRYPTAINER_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CRYPTAINER_LOG")
        .unwrap_or_else(|_| "cryptainer_api=info,tower_http=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(true).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let port: u16 = std::env::var("CRYPTAINER_API_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let keystore_dir = std::env::var("CRYPTAINER_KEYSTORE_DIR").unwrap_or_else(|_| "./cryptainer-keys".into());

    let backend = FileBackend::new(&keystore_dir).expect("could not open keystore directory");
    let keystore = Arc::new(Keystore::new(Arc::new(backend)));
    let trustee = LocalTrustee::new(keystore);

    let state: Shared = Arc::new(AppState { trustee });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/fetch_public_key", post(fetch_public_key))
        .route("/get_message_signature", post(get_message_signature))
        .route("/request_decryption_authorization", post(request_decryption_authorization))
        .route("/decrypt_with_private_key", post(decrypt_with_private_key))
        .layer(cors)
        .with_state(state);

    tracing::info!(port, keystore_dir = %keystore_dir, "starting cryptainer trustee API");

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("bind listener");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("serve");
}
