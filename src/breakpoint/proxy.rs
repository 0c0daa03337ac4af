//! Side-channel transport to the in-debugger proxy
//!
//! The proxy runs inside the debugger and answers one UDP datagram per
//! request. It announces its port by writing it to a file once it is ready.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::common::{Error, Result};

/// Largest reply accepted from the proxy
const MAX_DATAGRAM: usize = 64 * 1024;

/// Request/response path separate from the interactive command stream
///
/// `Ok(None)` means no response arrived; callers treat it like an empty one.
#[async_trait]
pub trait SideChannel: Send {
    async fn request(&mut self, line: &str) -> Result<Option<String>>;
}

/// A session without a side channel never gets a response
#[async_trait]
impl<C: SideChannel> SideChannel for Option<C> {
    async fn request(&mut self, line: &str) -> Result<Option<String>> {
        match self {
            Some(channel) => channel.request(line).await,
            None => Ok(None),
        }
    }
}

/// UDP client for the debugger-side proxy
#[derive(Debug)]
pub struct UdpProxy {
    addr_file: PathBuf,
    timeout: Duration,
    socket: Option<UdpSocket>,
}

impl UdpProxy {
    /// Create a client that reads the proxy address from `addr_file`
    ///
    /// The file is only read on the first request, since the proxy may not
    /// have started yet when the session is created.
    pub fn new(addr_file: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            addr_file: addr_file.into(),
            timeout,
            socket: None,
        }
    }

    /// Resolve the proxy address and connect, unless already connected
    ///
    /// Returns `None` while the proxy hasn't announced its address.
    async fn connect(&mut self) -> Result<Option<&UdpSocket>> {
        if self.socket.is_none() {
            let content = match tokio::fs::read_to_string(&self.addr_file).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(file = %self.addr_file.display(), "Proxy address not published yet");
                    return Ok(None);
                }
                Err(e) => return Err(Error::file_read(&self.addr_file, e)),
            };

            let addr = parse_addr(&content)?;
            let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
            socket.connect(addr).await?;
            tracing::debug!(%addr, "Connected to proxy");
            self.socket = Some(socket);
        }
        Ok(self.socket.as_ref())
    }
}

#[async_trait]
impl SideChannel for UdpProxy {
    async fn request(&mut self, line: &str) -> Result<Option<String>> {
        let timeout = self.timeout;
        let Some(socket) = self.connect().await? else {
            return Ok(None);
        };

        let mut buf = vec![0u8; MAX_DATAGRAM];
        socket.send(line.as_bytes()).await?;

        let result = tokio::time::timeout(timeout, socket.recv(&mut buf)).await;
        match result {
            Ok(Ok(n)) => Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned())),
            Ok(Err(e)) => {
                self.socket = None;
                Err(Error::SideChannel(e.to_string()))
            }
            Err(_) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Proxy did not answer");
                // Replies carry no request id. Rebinding on a fresh port makes
                // a late answer to this request undeliverable instead of
                // being read as the answer to the next one.
                self.socket = None;
                Ok(None)
            }
        }
    }
}

/// Accepts either a bare port (localhost) or a full `host:port` address
fn parse_addr(content: &str) -> Result<SocketAddr> {
    let content = content.trim();
    if let Ok(port) = content.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }
    content
        .parse::<SocketAddr>()
        .map_err(|e| Error::SideChannel(format!("Invalid proxy address '{}': {}", content, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake proxy answering every request with `reply`
    async fn spawn_proxy(reply: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let (n, peer) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(reply.as_bytes(), peer).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (addr, handle) = spawn_proxy(r#"{"3": ["1"]}"#).await;
        let dir = tempfile::tempdir().unwrap();
        let addr_file = dir.path().join("port");
        std::fs::write(&addr_file, addr.port().to_string()).unwrap();

        let mut proxy = UdpProxy::new(&addr_file, Duration::from_secs(5));
        let response = proxy.request("info-breakpoints /a.c\n").await.unwrap();

        assert_eq!(response.as_deref(), Some(r#"{"3": ["1"]}"#));
        assert_eq!(handle.await.unwrap(), "info-breakpoints /a.c\n");
    }

    #[tokio::test]
    async fn test_missing_address_file_is_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut proxy = UdpProxy::new(dir.path().join("absent"), Duration::from_millis(10));
        assert_eq!(proxy.request("info-breakpoints /a.c\n").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_silent_proxy_times_out() {
        let silent = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let addr_file = dir.path().join("port");
        std::fs::write(&addr_file, silent.local_addr().unwrap().to_string()).unwrap();

        let mut proxy = UdpProxy::new(&addr_file, Duration::from_millis(50));
        assert_eq!(proxy.request("info-breakpoints /a.c\n").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_late_reply_is_not_taken_for_next_answer() {
        let proxy = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let addr_file = dir.path().join("port");
        std::fs::write(&addr_file, proxy.local_addr().unwrap().to_string()).unwrap();

        let server = std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            let (_, first) = proxy.recv_from(&mut buf).unwrap();
            std::thread::sleep(Duration::from_millis(150));
            proxy.send_to(b"late reply to request 1", first).unwrap();

            let (_, second) = proxy.recv_from(&mut buf).unwrap();
            proxy.send_to(b"reply to request 2", second).unwrap();
        });

        let mut client = UdpProxy::new(&addr_file, Duration::from_millis(50));
        assert_eq!(client.request("info-breakpoints /a.c\n").await.unwrap(), None);

        // Let the late reply arrive without giving the runtime a chance to
        // notice it
        std::thread::sleep(Duration::from_millis(300));

        client.timeout = Duration::from_secs(5);
        let second = client.request("info-breakpoints /b.c\n").await.unwrap();
        assert_eq!(second.as_deref(), Some("reply to request 2"));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_none_channel_never_answers() {
        let mut channel: Option<UdpProxy> = None;
        assert_eq!(channel.request("anything").await.unwrap(), None);
    }

    #[test]
    fn test_parse_addr() {
        assert_eq!(parse_addr("4000\n").unwrap().port(), 4000);
        assert_eq!(
            parse_addr("127.0.0.1:5000").unwrap(),
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_addr("not an address").is_err());
    }
}
