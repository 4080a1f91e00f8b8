use std::path::PathBuf;
use std::process::{Command, Output};

use mindrecord_core::Claims;
use mindrecord_core::token::encode_unsigned;
use serde_json::{Map, Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An isolated session store plus the mock API it talks to.
pub struct Harness {
    pub server: MockServer,
    _dir: tempfile::TempDir,
    store: PathBuf,
}

impl Harness {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("session.json");
        Self {
            server: MockServer::start().await,
            _dir: dir,
            store,
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    /// Run the CLI binary against the mock API and the isolated store.
    pub fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mindrecord"));
        cmd.args(args);
        cmd.env("MINDRECORD_API", self.api_url());
        cmd.env("MINDRECORD_STORE", &self.store);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("LANG");
        cmd.output().expect("Failed to execute CLI")
    }

    /// Run the CLI and expect success, returning stdout.
    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI and expect failure, returning stderr.
    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// The store file's contents, empty if it does not exist.
    pub fn stored(&self) -> Map<String, Value> {
        match std::fs::read_to_string(&self.store) {
            Ok(json) => serde_json::from_str(&json).unwrap(),
            Err(_) => Map::new(),
        }
    }

    /// Serve a successful `/auth` response for `sub` with `role`.
    pub async fn mount_login(&self, sub: &str, role: &str) -> String {
        let access = access_token(sub, role);
        let refresh = encode_unsigned(&Claims::new().with("sub", sub).with("kind", "refresh"));
        Mock::given(method("POST"))
            .and(path("/api/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access,
                "access_token_expiration": 3600,
                "refresh_token": refresh,
                "refresh_token_expiration": 604800
            })))
            .mount(&self.server)
            .await;
        access
    }
}

pub fn access_token(sub: &str, role: &str) -> String {
    encode_unsigned(&Claims::new().with("sub", sub).with("role", role))
}
