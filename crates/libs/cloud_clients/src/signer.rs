use crate::{storage::api_error, CloudError, TokenSource};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const STORAGE_HOST: &str = "storage.googleapis.com";
const IAM_API: &str = "https://iamcredentials.googleapis.com";

/// Everything except unreserved characters, per the V4 signing rules.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Deserialize)]
struct SignBlobResponse {
    #[serde(rename = "signedBlob")]
    signed_blob: String,
}

/// Mints V4 signed GET URLs for streaming, using the IAM `signBlob` API so no
/// private key ever touches this process.
#[derive(Clone)]
pub struct UrlSigner {
    http: reqwest::Client,
    token: Arc<TokenSource>,
    signer_email: String,
    iam_base_url: String,
}

impl UrlSigner {
    #[must_use]
    pub fn new(token: Arc<TokenSource>, signer_email: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            signer_email: signer_email.to_string(),
            iam_base_url: IAM_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_iam_base_url(mut self, base_url: &str) -> Self {
        self.iam_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn signed_get_url(
        &self,
        bucket: &str,
        object: &str,
        expires: Duration,
    ) -> Result<String, CloudError> {
        let unsigned = UnsignedUrl::build(&self.signer_email, bucket, object, expires, Utc::now());
        let signature = self.sign(unsigned.string_to_sign.as_bytes()).await?;
        Ok(unsigned.into_url(&signature))
    }

    async fn sign(&self, payload: &[u8]) -> Result<String, CloudError> {
        let token = self.token.token().await?;
        let response = self
            .http
            .post(format!(
                "{}/v1/projects/-/serviceAccounts/{}:signBlob",
                self.iam_base_url, self.signer_email
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "payload": general_purpose::STANDARD.encode(payload),
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let signed: SignBlobResponse = response.json().await?;
        let raw = general_purpose::STANDARD.decode(signed.signed_blob)?;
        Ok(to_hex(&raw))
    }
}

struct UnsignedUrl {
    canonical_uri: String,
    canonical_query: String,
    string_to_sign: String,
}

impl UnsignedUrl {
    fn build(
        signer_email: &str,
        bucket: &str,
        object: &str,
        expires: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let datetime = now.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = now.format("%Y%m%d").to_string();
        let scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{signer_email}/{scope}");

        let canonical_uri = format!("/{bucket}/{}", encode_path_segment(object));
        // sorted by parameter name
        let canonical_query = format!(
            "X-Goog-Algorithm=GOOG4-RSA-SHA256\
             &X-Goog-Credential={}\
             &X-Goog-Date={datetime}\
             &X-Goog-Expires={}\
             &X-Goog-SignedHeaders=host",
            encode_query(&credential),
            expires.as_secs()
        );
        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\nhost:{STORAGE_HOST}\n\nhost\nUNSIGNED-PAYLOAD"
        );
        let string_to_sign = format!(
            "GOOG4-RSA-SHA256\n{datetime}\n{scope}\n{}",
            to_hex(&Sha256::digest(canonical_request.as_bytes()))
        );

        Self {
            canonical_uri,
            canonical_query,
            string_to_sign,
        }
    }

    fn into_url(self, signature_hex: &str) -> String {
        format!(
            "https://{STORAGE_HOST}{}?{}&X-Goog-Signature={signature_hex}",
            self.canonical_uri, self.canonical_query
        )
    }
}

fn encode_query(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_ENCODE).to_string()
}

fn encode_path_segment(raw: &str) -> String {
    // slashes separate real path segments and stay literal
    raw.split('/')
        .map(encode_query)
        .collect::<Vec<_>>()
        .join("/")
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
