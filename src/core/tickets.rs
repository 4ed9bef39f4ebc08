//! Signed, short-lived download tickets

use crate::core::models::VersionRecord;
use crate::core::service::ServiceError;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ISSUER: &str = "agentry";

/// Ticket claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClaims {
    /// Object store key
    pub sub: String,
    /// Expected SHA-256 of the object
    pub sha: String,
    pub org: String,
    pub pkg: String,
    pub ver: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Issues and validates HS256 download tickets
#[derive(Clone)]
pub struct TicketService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TicketService {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Sign a ticket for one version; returns the ticket and its expiry
    pub fn issue(&self, record: &VersionRecord) -> Result<(String, DateTime<Utc>), ServiceError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let exp = now + self.ttl.as_secs();

        let claims = TicketClaims {
            sub: record.storage_key.clone(),
            sha: record.checksum.clone(),
            org: record.org.clone(),
            pkg: record.package.clone(),
            ver: record.version.clone(),
            exp: exp as usize,
            iat: now as usize,
            iss: ISSUER.to_string(),
        };

        let ticket = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Config(format!("Failed to sign download ticket: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(exp as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Ok((ticket, expires_at))
    }

    /// Verify signature, issuer and expiry
    pub fn validate(&self, ticket: &str) -> Result<TicketClaims, ServiceError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);

        let data = decode::<TicketClaims>(ticket, &self.decoding_key, &validation)
            .map_err(|_| ServiceError::NotFound("Download ticket is invalid or expired".to_string()))?;
        Ok(data.claims)
    }
}
