#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const ROOT_USERNAME: &str = "root";
pub const ROOT_PASSWORD: &str = "root-password";
pub const REGISTRATION_SECRET: &str = "development-registration";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory backend with a bootstrapped Super Admin; no database needed
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_signature-api-rust"));
        cmd.env("APP_ENV", "development")
            .env("DATABASE_BACKEND", "memory")
            .env("SIGNATURE_API_PORT", port.to_string())
            .env("BOOTSTRAP_ADMIN_USERNAME", ROOT_USERNAME)
            .env("BOOTSTRAP_ADMIN_PASSWORD", ROOT_PASSWORD)
            .env("API_ENABLE_RATE_LIMITING", "false")
            .env("SECURITY_ENFORCE_CSRF", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() <= deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Unique lowercase username, valid under the username rules
pub fn unique_username(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

pub async fn register(server: &TestServer, username: &str, password: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(server.url("/jwt/auth/register"))
        .header("jwt-header", REGISTRATION_SECRET)
        .json(&json!({"username": username, "password": password, "full_name": "Test User"}))
        .send()
        .await?)
}

pub async fn token(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/jwt/auth/token"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "token request failed: {}", res.status());
    let body = res.json::<Value>().await?;
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .context("token response without access_token")
}

pub async fn root_token(server: &TestServer) -> Result<String> {
    token(server, ROOT_USERNAME, ROOT_PASSWORD).await
}
