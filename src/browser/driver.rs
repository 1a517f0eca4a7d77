//! Local chromedriver process management.
//!
//! The WebDriver endpoint is used as-is when something already listens on
//! it. Otherwise the configured driver binary is launched once for the whole
//! run and killed when the [`DriverService`] is dropped.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::types::{SessionError, SessionResult};
use crate::config::DriverSettings;

const PROBE_TIMEOUT: Duration = Duration::from_millis(300);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct DriverService {
    child: Option<Child>,
    addr: SocketAddr,
}

impl DriverService {
    /// Make sure a WebDriver endpoint is listening, launching the driver
    /// binary if needed
    pub fn ensure(settings: &DriverSettings) -> SessionResult<Self> {
        let addr = endpoint_addr(&settings.webdriver_url)?;
        if is_listening(addr) {
            tracing::debug!(%addr, "WebDriver endpoint already listening");
            return Ok(Self { child: None, addr });
        }

        let Some(binary) = settings.driver_path.as_ref().filter(|p| p.exists()) else {
            tracing::warn!(
                %addr,
                driver = ?settings.driver_path,
                "WebDriver endpoint not listening and no driver binary to launch"
            );
            return Ok(Self { child: None, addr });
        };

        tracing::info!(binary = %binary.display(), port = addr.port(), "launching WebDriver");
        let child = Command::new(binary)
            .arg(format!("--port={}", addr.port()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SessionError::Unavailable(format!("failed to spawn '{}': {}", binary.display(), e))
            })?;

        let mut service = Self {
            child: Some(child),
            addr,
        };
        service.wait_until_listening(settings.startup_timeout)?;
        Ok(service)
    }

    /// Whether this service started (and owns) the driver process
    pub fn launched(&self) -> bool {
        self.child.is_some()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn wait_until_listening(&mut self, timeout: Duration) -> SessionResult<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if is_listening(self.addr) {
                return Ok(());
            }
            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    self.child = None;
                    return Err(SessionError::Unavailable(format!(
                        "driver exited during startup ({})",
                        status
                    )));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(SessionError::Unavailable(format!(
            "driver did not listen on {} within {:?}",
            self.addr, timeout
        )))
    }
}

impl Drop for DriverService {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if child.try_wait().ok().flatten().is_none() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Resolve `http://host:port/...` to a socket address
pub fn endpoint_addr(url: &str) -> SessionResult<SocketAddr> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("http://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("https://") {
        (rest, 443)
    } else {
        return Err(SessionError::Unavailable(format!("unsupported WebDriver url: {}", url)));
    };

    let authority = rest.split('/').next().unwrap_or(rest);
    let host_port = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{}:{}", authority, default_port)
    };

    host_port
        .to_socket_addrs()
        .map_err(|e| SessionError::Unavailable(format!("cannot resolve {}: {}", host_port, e)))?
        .next()
        .ok_or_else(|| SessionError::Unavailable(format!("no address for {}", host_port)))
}

fn is_listening(addr: SocketAddr) -> bool {
    TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_endpoint_addr_parsing() {
        assert_eq!(endpoint_addr("http://127.0.0.1:9515").unwrap().port(), 9515);
        assert_eq!(endpoint_addr("http://127.0.0.1:4444/wd/hub").unwrap().port(), 4444);
        assert_eq!(endpoint_addr("http://127.0.0.1").unwrap().port(), 80);
        assert!(endpoint_addr("ftp://127.0.0.1").is_err());
    }

    #[test]
    fn test_ensure_uses_running_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let settings = DriverSettings {
            webdriver_url: format!("http://127.0.0.1:{}", port),
            driver_path: None,
            ..DriverSettings::defaults()
        };

        let service = DriverService::ensure(&settings).unwrap();
        assert!(!service.launched());
        assert_eq!(service.addr().port(), port);
    }

    #[test]
    fn test_ensure_without_binary_does_not_launch() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = DriverSettings {
            webdriver_url: format!("http://127.0.0.1:{}", port),
            driver_path: Some("/nonexistent/chromedriver".into()),
            ..DriverSettings::defaults()
        };

        let service = DriverService::ensure(&settings).unwrap();
        assert!(!service.launched());
    }
}
