//! Trust-on-first-use certificate pins

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use gemlet_transport::{TransportError, TrustDecision, TrustStore};

use crate::Database;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHost {
    pub host: String,
    pub port: u16,
    pub fingerprint: String,
    pub first_seen: DateTime<Utc>,
}

/// Persistent pin store backing the TOFU certificate policy.
pub struct KnownHosts {
    db: Database,
}

impl KnownHosts {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, host: &str, port: u16) -> Result<Option<KnownHost>> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT host, port, fingerprint, first_seen FROM known_hosts
                     WHERE host = ?1 AND port = ?2",
                    rusqlite::params![host, port],
                    |row| {
                        let first_seen: String = row.get(3)?;
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, first_seen))
                    },
                )
                .optional()?;

            Ok(row.map(|(host, port, fingerprint, first_seen)| KnownHost {
                host,
                port,
                fingerprint,
                first_seen: DateTime::parse_from_rfc3339(&first_seen)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            }))
        })
    }

    pub fn pin(&self, host: &str, port: u16, fingerprint: &str) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO known_hosts (host, port, fingerprint, first_seen)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![host, port, fingerprint, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })?;

        tracing::info!(host = %host, port, "Pinned host certificate");
        Ok(())
    }

    /// Drop a pin, e.g. after the user accepts a rotated certificate.
    pub fn forget(&self, host: &str, port: u16) -> Result<bool> {
        self.db.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM known_hosts WHERE host = ?1 AND port = ?2",
                rusqlite::params![host, port],
            )?;
            Ok(removed > 0)
        })
    }
}

impl TrustStore for KnownHosts {
    fn check(
        &self,
        host: &str,
        port: u16,
        fingerprint: &str,
    ) -> gemlet_transport::Result<TrustDecision> {
        let storage = |e: crate::StorageError| TransportError::Trust(e.to_string());

        match self.get(host, port).map_err(storage)? {
            Some(known) if known.fingerprint == fingerprint => Ok(TrustDecision::Trusted),
            Some(known) => Ok(TrustDecision::Mismatch {
                pinned: known.fingerprint,
            }),
            None => {
                self.pin(host, port, fingerprint).map_err(storage)?;
                Ok(TrustDecision::FirstUse)
            }
        }
    }
}

impl Clone for KnownHosts {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
