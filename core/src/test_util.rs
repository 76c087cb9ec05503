//! Place to put utilities that are only used by tests.

use std::net::TcpListener;

/// Returns a new temporary directory. Unlike the defaults in the `tempdir` and `tempfile` crates,
/// this directory is not world-accessible by default.
#[cfg(not(miri))]
pub fn tempdir() -> std::io::Result<tempfile::TempDir> {
    use std::fs::Permissions;
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o700));
    }
    builder.tempdir()
}

/// Returns a base URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let address = listener.local_addr().expect("no local address");
    drop(listener);
    format!("http://{address}/v1")
}

/// Returns a listener that accepts connections (through the kernel backlog) but never answers,
/// and its base URL. Requests to it only end when they time out; keep the listener alive for as
/// long as that should hold.
pub fn silent_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let address = listener.local_addr().expect("no local address");
    (listener, format!("http://{address}/v1"))
}
