//! Service SAS token generation for blob access.
//!
//! A SAS query string is a pure function of the blob coordinates, the access
//! window, and the account key: HMAC-SHA256 over the service string-to-sign,
//! with the base64 account key as the MAC key.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use qnasync_shared::{QnaSyncError, Result};

type HmacSha256 = Hmac<Sha256>;

/// SAS protocol version, sent as `sv` and signed into the token.
pub const SAS_VERSION: &str = "2020-12-06";

/// Timestamp format required by the SAS string-to-sign (`st`/`se`).
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Coordinates and access window for a blob-scoped SAS.
#[derive(Debug, Clone)]
pub struct SasScope<'a> {
    /// Storage account name.
    pub account: &'a str,
    /// Container name.
    pub container: &'a str,
    /// Blob name, unencoded.
    pub blob: &'a str,
    /// Permission string, e.g. `"r"` for read or `"cw"` for create+write.
    pub permissions: &'a str,
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub expiry: DateTime<Utc>,
}

/// Build the signed SAS query string (no leading `?`).
pub fn blob_sas_query(scope: &SasScope<'_>, account_key: &str) -> Result<String> {
    let st = scope.start.format(TIME_FORMAT).to_string();
    let se = scope.expiry.format(TIME_FORMAT).to_string();
    let canonical = format!(
        "/blob/{}/{}/{}",
        scope.account, scope.container, scope.blob
    );

    // Service SAS string-to-sign for version 2020-12-06: permissions, start,
    // expiry, canonicalized resource, identifier, IP range, protocol,
    // version, resource type, snapshot time, encryption scope, then the five
    // response-header overrides. Unused fields stay empty but keep their
    // newline.
    let string_to_sign = format!(
        "{sp}\n{st}\n{se}\n{canonical}\n\n\nhttps\n{sv}\nb\n\n\n\n\n\n\n",
        sp = scope.permissions,
        sv = SAS_VERSION,
    );

    let key = BASE64
        .decode(account_key)
        .map_err(|e| QnaSyncError::Storage(format!("account key is not valid base64: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| QnaSyncError::Storage(format!("HMAC init failed: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(format!(
        "sv={sv}&spr=https&st={st}&se={se}&sr=b&sp={sp}&sig={sig}",
        sv = SAS_VERSION,
        st = urlencoding::encode(&st),
        se = urlencoding::encode(&se),
        sp = scope.permissions,
        sig = urlencoding::encode(&signature),
    ))
}
