// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fit_pipeline::config::Config;
use fit_pipeline::db::{FirestoreDb, MemoryDb};
use fit_pipeline::middleware::auth::Claims;
use fit_pipeline::models::{ActivityRecord, ActivityStatus};
use fit_pipeline::routes::create_router;
use fit_pipeline::storage::MemoryStorage;
use fit_pipeline::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

pub const BUCKET: &str = "test-bucket";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Router on in-memory stores with a private scratch directory.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState<MemoryDb, MemoryStorage>>,
    _scratch: tempfile::TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn db(&self) -> &MemoryDb {
        &self.state.db
    }

    pub fn blobs(&self) -> &MemoryStorage {
        &self.state.blobs
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.state.config.scratch_dir
    }

    /// Files left behind under the scratch root (recursively).
    pub fn scratch_leftovers(&self) -> Vec<PathBuf> {
        fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                out.push(path.clone());
                if path.is_dir() {
                    walk(&path, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self.scratch_dir(), &mut out);
        out
    }

    /// Seed an activity record in `Uploaded` state.
    pub fn seed_uploaded(&self, activity_id: &str) {
        self.db()
            .insert(uploaded_record(activity_id, "2024-05-01T07:00:00Z"))
            .expect("seed record");
    }

    /// Seed a raw upload object.
    pub fn seed_upload(&self, object: &str, bytes: Vec<u8>) {
        self.blobs()
            .put(BUCKET, object, bytes, "application/octet-stream")
            .expect("seed upload");
    }

    /// POST a JSON body and return status plus parsed JSON body.
    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}

/// Create a test app with in-memory stores.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let config = Config {
        storage_bucket: BUCKET.to_string(),
        scratch_dir: scratch.path().join("work"),
        ..Config::test_default()
    };

    let state = Arc::new(AppState::new(config, MemoryDb::new(), MemoryStorage::new()));

    TestApp {
        router: create_router(state.clone()),
        state,
        _scratch: scratch,
    }
}

/// Sign a session JWT the way the login service does.
#[allow(dead_code)]
pub fn create_jwt(user_id: &str, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 24 * 60 * 60, // 1 day
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to create JWT")
}

/// JWT for a test caller, signed with the test key.
#[allow(dead_code)]
pub fn caller_token(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key)
}

#[allow(dead_code)]
pub fn uploaded_record(activity_id: &str, uploaded_at: &str) -> ActivityRecord {
    ActivityRecord {
        id: activity_id.to_string(),
        status: Some(ActivityStatus::Uploaded),
        uploaded_at: Some(uploaded_at.to_string()),
        ..Default::default()
    }
}

// ─── FIT file synthesis ──────────────────────────────────────

#[allow(dead_code)]
pub mod fit {
    //! Minimal FIT encoder for building test activity files.

    /// FIT epoch (1989-12-31T00:00:00Z) as a Unix timestamp.
    pub const FIT_EPOCH: i64 = 631_065_600;

    /// `time_created` used by [`two_lap_activity`].
    pub const TIME_CREATED: u32 = 1_000_000_000;

    const CRC_TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    fn crc_byte(mut crc: u16, byte: u8) -> u16 {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
    }

    pub fn crc(bytes: &[u8]) -> u16 {
        bytes.iter().fold(0, |crc, &b| crc_byte(crc, b))
    }

    const ENUM: u8 = 0x00;
    const UINT8: u8 = 0x02;
    const UINT16: u8 = 0x84;
    const UINT32: u8 = 0x86;

    /// (field number, size, base type)
    type FieldDef = (u8, u8, u8);

    const FILE_ID: (u8, u16, &[FieldDef]) = (0, 0, &[(0, 1, ENUM), (4, 4, UINT32)]);
    const RECORD: (u8, u16, &[FieldDef]) = (
        1,
        20,
        &[
            (253, 4, UINT32),
            (2, 2, UINT16),
            (3, 1, UINT8),
            (4, 1, UINT8),
            (5, 4, UINT32),
            (6, 2, UINT16),
            (7, 2, UINT16),
        ],
    );
    const LAP: (u8, u16, &[FieldDef]) = (
        2,
        19,
        &[(253, 4, UINT32), (2, 4, UINT32), (7, 4, UINT32), (9, 4, UINT32)],
    );
    const SESSION: (u8, u16, &[FieldDef]) = (
        3,
        18,
        &[
            (253, 4, UINT32),
            (2, 4, UINT32),
            (7, 4, UINT32),
            (9, 4, UINT32),
            (14, 2, UINT16),
            (18, 1, UINT8),
            (20, 2, UINT16),
            (22, 2, UINT16),
            (23, 2, UINT16),
        ],
    );

    /// One sample in SI units.
    #[derive(Debug, Clone, Copy)]
    pub struct Sample {
        /// FIT timestamp (seconds since the FIT epoch)
        pub time: u32,
        pub altitude_m: f64,
        pub heart_rate: u8,
        pub cadence: u8,
        pub distance_m: f64,
        pub speed_mps: f64,
        pub power: u16,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct Totals {
        pub time: u32,
        pub start: u32,
        pub elapsed_s: f64,
        pub distance_m: f64,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct SessionTotals {
        pub totals: Totals,
        pub avg_speed_mps: f64,
        pub avg_cadence: u8,
        pub avg_power: u16,
        pub ascent_m: u16,
        pub descent_m: u16,
    }

    #[derive(Default)]
    pub struct FitBuilder {
        data: Vec<u8>,
        defined: Vec<u8>,
    }

    impl FitBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        fn define(&mut self, (local, global, fields): (u8, u16, &[FieldDef])) {
            if self.defined.contains(&local) {
                return;
            }
            self.defined.push(local);
            self.data.push(0x40 | local);
            self.data.push(0); // reserved
            self.data.push(0); // little-endian
            self.data.extend_from_slice(&global.to_le_bytes());
            self.data.push(fields.len() as u8);
            for &(num, size, base) in fields {
                self.data.extend_from_slice(&[num, size, base]);
            }
        }

        pub fn file_id(mut self, time_created: u32) -> Self {
            self.define(FILE_ID);
            self.data.push(FILE_ID.0);
            self.data.push(4); // activity
            self.data.extend_from_slice(&time_created.to_le_bytes());
            self
        }

        pub fn record(mut self, s: Sample) -> Self {
            self.define(RECORD);
            self.data.push(RECORD.0);
            self.data.extend_from_slice(&s.time.to_le_bytes());
            self.data
                .extend_from_slice(&(((s.altitude_m + 500.0) * 5.0).round() as u16).to_le_bytes());
            self.data.push(s.heart_rate);
            self.data.push(s.cadence);
            self.data
                .extend_from_slice(&((s.distance_m * 100.0).round() as u32).to_le_bytes());
            self.data
                .extend_from_slice(&((s.speed_mps * 1000.0).round() as u16).to_le_bytes());
            self.data.extend_from_slice(&s.power.to_le_bytes());
            self
        }

        fn totals(&mut self, t: Totals) {
            self.data.extend_from_slice(&t.time.to_le_bytes());
            self.data.extend_from_slice(&t.start.to_le_bytes());
            self.data
                .extend_from_slice(&((t.elapsed_s * 1000.0).round() as u32).to_le_bytes());
            self.data
                .extend_from_slice(&((t.distance_m * 100.0).round() as u32).to_le_bytes());
        }

        pub fn lap(mut self, t: Totals) -> Self {
            self.define(LAP);
            self.data.push(LAP.0);
            self.totals(t);
            self
        }

        pub fn session(mut self, s: SessionTotals) -> Self {
            self.define(SESSION);
            self.data.push(SESSION.0);
            self.totals(s.totals);
            self.data
                .extend_from_slice(&((s.avg_speed_mps * 1000.0).round() as u16).to_le_bytes());
            self.data.push(s.avg_cadence);
            self.data.extend_from_slice(&s.avg_power.to_le_bytes());
            self.data.extend_from_slice(&s.ascent_m.to_le_bytes());
            self.data.extend_from_slice(&s.descent_m.to_le_bytes());
            self
        }

        /// Header, data and trailing CRC.
        pub fn build(self) -> Vec<u8> {
            let mut file = Vec::with_capacity(14 + self.data.len() + 2);
            file.push(14);
            file.push(0x20);
            file.extend_from_slice(&2132u16.to_le_bytes());
            file.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
            file.extend_from_slice(b".FIT");
            let header_crc = crc(&file);
            file.extend_from_slice(&header_crc.to_le_bytes());
            file.extend_from_slice(&self.data);
            let file_crc = crc(&file);
            file.extend_from_slice(&file_crc.to_le_bytes());
            file
        }
    }

    pub fn sample(offset: u32, power: u16) -> Sample {
        Sample {
            time: TIME_CREATED + offset,
            altitude_m: 100.0 + offset as f64,
            heart_rate: 140,
            cadence: 90,
            distance_m: offset as f64 * 8.0,
            speed_mps: 8.0,
            power,
        }
    }

    /// One session, two laps of 3 and 2 records.
    ///
    /// Session: 12.5 km, avg 8.5 m/s, avg power 215 W.
    pub fn two_lap_activity() -> Vec<u8> {
        let t0 = TIME_CREATED;
        FitBuilder::new()
            .file_id(t0)
            .record(sample(0, 200))
            .record(sample(1, 210))
            .record(sample(2, 220))
            .lap(Totals {
                time: t0 + 2,
                start: t0,
                elapsed_s: 2.0,
                distance_m: 16.0,
            })
            .record(sample(3, 230))
            .record(sample(4, 240))
            .lap(Totals {
                time: t0 + 4,
                start: t0 + 3,
                elapsed_s: 1.0,
                distance_m: 16.0,
            })
            .session(SessionTotals {
                totals: Totals {
                    time: t0 + 4,
                    start: t0,
                    elapsed_s: 4.0,
                    distance_m: 12_500.0,
                },
                avg_speed_mps: 8.5,
                avg_cadence: 90,
                avg_power: 215,
                ascent_m: 4,
                descent_m: 0,
            })
            .build()
    }

    /// Two sessions of one lap each.
    pub fn two_session_activity() -> Vec<u8> {
        let t0 = TIME_CREATED;
        let session = |start: u32, power: u16| SessionTotals {
            totals: Totals {
                time: start + 1,
                start,
                elapsed_s: 1.0,
                distance_m: 8.0,
            },
            avg_speed_mps: 8.0,
            avg_cadence: 90,
            avg_power: power,
            ascent_m: 1,
            descent_m: 0,
        };
        let lap = |start: u32| Totals {
            time: start + 1,
            start,
            elapsed_s: 1.0,
            distance_m: 8.0,
        };

        FitBuilder::new()
            .file_id(t0)
            .record(sample(0, 150))
            .record(sample(1, 160))
            .lap(lap(t0))
            .session(session(t0, 155))
            .record(sample(10, 300))
            .lap(lap(t0 + 10))
            .session(session(t0 + 10, 300))
            .build()
    }
}
