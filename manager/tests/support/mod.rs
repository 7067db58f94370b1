//! Test support utilities for manager behavioural tests.
//!
//! Provides a minimal local HTTP server over `tiny_http` and a builder
//! for runtime archive fixtures, so behavioural tests exercise real
//! transfers and real extraction without touching the network.

use std::path::Path;
use tiny_http::{Header, Response, Server};

/// A canned response served for one route.
pub struct RouteResponse {
    /// HTTP status code to respond with.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Optional `Location` header value for redirect responses.
    pub location: Option<String>,
}

impl RouteResponse {
    /// A 200 response with the given body.
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            location: None,
        }
    }

    /// A 302 redirect to `location`.
    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            body: Vec::new(),
            location: Some(location.to_owned()),
        }
    }

    /// An empty response with the given status code.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            location: None,
        }
    }
}

/// Spawns a local HTTP server serving the given routes and returns its
/// base URL. Unmatched paths answer 404. The serving thread lives for
/// the remainder of the test process.
pub fn spawn_server(routes: Vec<(String, RouteResponse)>) -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("test server has an IP address");
    let base = format!("http://127.0.0.1:{}", addr.port());

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_owned();
            match routes.iter().find(|(path, _)| *path == url) {
                Some((_, canned)) => {
                    let mut response =
                        Response::from_data(canned.body.clone()).with_status_code(canned.status);
                    if let Some(location) = &canned.location {
                        let header = Header::from_bytes(&b"Location"[..], location.as_bytes())
                            .expect("location header");
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                None => {
                    let _ = request.respond(
                        Response::from_string("not found").with_status_code(404),
                    );
                }
            }
        }
    });

    base
}

/// Builds a gzip-compressed tar archive at `dest` whose entries all
/// live under `top_dir`, matching the single-top-level-directory layout
/// runtime releases ship with.
pub fn build_runtime_archive(dest: &Path, top_dir: &str, files: &[(&str, &[u8])]) {
    let output = std::fs::File::create(dest).expect("create archive");
    let encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{top_dir}/{name}"), *content)
            .expect("append archive entry");
    }

    let encoder = builder.into_inner().expect("finish tar");
    encoder.finish().expect("finish gzip");
}

/// Returns true if the system `tar` binary is runnable.
pub fn tar_available() -> bool {
    std::process::Command::new("tar")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
