//! IRC client: connection, registration, and the reconnect loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_rustls::TlsConnector;
use tracing::{debug, error, info, warn};

use crate::bridge::channels::IrcChannels;
use crate::bridge::dispatch::MessageSink;
use crate::common::error::{IrcError, SendError};
use crate::common::IrcEvent;
use crate::config::types::IrcConfig;
use crate::irc::codec::{new_irc_connection, IrcConnection};
use crate::irc::message::{ctcp, is_channel, IrcLine};

const QUIT_MESSAGE: &str = "QUIT :Bridge shutting down";

/// Split `host:port`.
pub fn parse_server(server: &str) -> Result<(String, u16), IrcError> {
    let invalid = || IrcError::InvalidAddress {
        address: server.to_string(),
    };
    let (host, port) = server.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    if host.is_empty() || port == 0 {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

/// Accepts any server certificate. Signatures are still checked so the
/// handshake itself stays sound.
#[derive(Debug)]
struct NoCertificateVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Build a TLS connector, trusting the system roots unless `verify` is off.
fn build_tls_connector(verify: bool) -> Result<TlsConnector, IrcError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| IrcError::Tls {
            message: e.to_string(),
        })?;

    let config = if verify {
        let mut root_store = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            warn!("Failed to load a system certificate: {}", error);
        }
        let (added, ignored) = root_store.add_parsable_certificates(native.certs);
        debug!("Loaded {} system certificates ({} ignored)", added, ignored);
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        warn!("IRC certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification(provider)))
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Posts to IRC through the running client.
#[derive(Debug, Clone)]
pub struct IrcHandle {
    outgoing_tx: mpsc::UnboundedSender<String>,
    registered: Arc<AtomicBool>,
}

#[async_trait]
impl MessageSink for IrcHandle {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), SendError> {
        if !self.registered.load(Ordering::Acquire) {
            return Err(SendError::IrcDisconnected);
        }
        let text = text.replace(['\r', '\n'], " ");
        self.outgoing_tx
            .send(format!("PRIVMSG {} :{}", channel_id, text))
            .map_err(|_| SendError::IrcDisconnected)
    }
}

/// Per-connection registration state.
#[derive(Debug)]
struct Session {
    nick: String,
    registered: bool,
}

/// IRC client.
pub struct IrcClient {
    config: IrcConfig,
    channels_to_join: Vec<String>,
    event_tx: mpsc::UnboundedSender<IrcEvent>,
    shutdown_rx: watch::Receiver<bool>,
    outgoing_rx: mpsc::UnboundedReceiver<String>,
    registered: Arc<AtomicBool>,
}

impl IrcClient {
    pub fn new(
        config: IrcConfig,
        channels_to_join: Vec<String>,
        channels: IrcChannels,
    ) -> (Self, IrcHandle) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let registered = Arc::new(AtomicBool::new(false));

        let client = Self {
            config,
            channels_to_join,
            event_tx: channels.event_tx,
            shutdown_rx: channels.shutdown_rx,
            outgoing_rx,
            registered: Arc::clone(&registered),
        };
        let handle = IrcHandle {
            outgoing_tx,
            registered,
        };
        (client, handle)
    }

    /// Connect and reconnect until shutdown.
    pub async fn run(mut self) {
        /// Create an exponential backoff iterator for IRC reconnection.
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn irc_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(300))
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = irc_backoff();

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            match self.connect_and_serve().await {
                Ok(()) => {
                    info!("IRC client logged out");
                    break;
                }
                Err(e) => error!("IRC connection error: {}", e),
            }

            // A connection that got through registration resets the backoff.
            if self.registered.swap(false, Ordering::AcqRel) {
                backoff = irc_backoff();
            }
            // Drop anything queued for the dead connection.
            while self.outgoing_rx.try_recv().is_ok() {}

            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            info!("Reconnecting to IRC in {:.1} seconds...", delay.as_secs_f64());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received during backoff");
                        break;
                    }
                }
            }
        }

        self.registered.store(false, Ordering::Release);
        info!("IRC task ended");
    }

    async fn connect_and_serve(&mut self) -> Result<(), IrcError> {
        let (host, port) = parse_server(&self.config.server)?;
        info!("Connecting to IRC server at {}:{}", host, port);

        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| IrcError::ConnectFailed {
                address: self.config.server.clone(),
                source,
            })?;

        if !self.config.ssl {
            return self.handle_connection(stream).await;
        }

        let connector = build_tls_connector(self.config.ssl_verify)?;
        let server_name = ServerName::try_from(host).map_err(|e| IrcError::Tls {
            message: e.to_string(),
        })?;
        let stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| IrcError::Tls {
                message: e.to_string(),
            })?;
        self.handle_connection(stream).await
    }

    /// Drive one connection. Returns `Ok` only after a requested shutdown.
    pub async fn handle_connection<S>(&mut self, stream: S) -> Result<(), IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut connection = new_irc_connection(stream);
        let mut session = Session {
            nick: self.config.nick.clone(),
            registered: false,
        };

        self.register(&mut connection).await?;

        loop {
            tokio::select! {
                line = connection.next() => {
                    match line {
                        Some(Ok(line)) => {
                            debug!("<< {}", line);
                            let Some(parsed) = IrcLine::parse(&line) else {
                                continue;
                            };
                            for reply in self.handle_line(&mut session, &parsed)? {
                                connection.send(reply).await?;
                            }
                        }
                        Some(Err(e)) => return Err(e),
                        None => {
                            return Err(IrcError::Closed {
                                reason: "connection closed".to_string(),
                            })
                        }
                    }
                }

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received - quitting IRC...");
                        if let Err(e) = connection.send(QUIT_MESSAGE.to_string()).await {
                            warn!("Failed to send QUIT: {}", e);
                        }
                        return Ok(());
                    }
                }

                Some(outgoing) = self.outgoing_rx.recv(), if session.registered => {
                    connection.send(outgoing).await?;
                }
            }
        }
    }

    async fn register<S>(&self, connection: &mut IrcConnection<S>) -> Result<(), IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.config.pass.is_empty() {
            connection.feed(format!("PASS {}", self.config.pass)).await?;
        }
        connection.feed(format!("NICK {}", self.config.nick)).await?;
        connection
            .feed(format!("USER {} 0 * :{}", self.config.user, self.config.user))
            .await?;
        connection.flush().await
    }

    /// React to one server line; returns the lines to send back.
    fn handle_line(&self, session: &mut Session, line: &IrcLine) -> Result<Vec<String>, IrcError> {
        match line.command.as_str() {
            "PING" => Ok(vec![format!("PONG :{}", line.param(0).unwrap_or(""))]),
            "001" => {
                if let Some(nick) = line.param(0) {
                    session.nick = nick.to_string();
                }
                session.registered = true;
                self.registered.store(true, Ordering::Release);
                info!("Registered on IRC as {}", session.nick);
                Ok(self
                    .channels_to_join
                    .iter()
                    .map(|channel| format!("JOIN {}", channel))
                    .collect())
            }
            // ERR_NICKNAMEINUSE
            "433" if !session.registered => {
                session.nick.push('_');
                warn!("Nick in use, trying {}", session.nick);
                Ok(vec![format!("NICK {}", session.nick)])
            }
            "NICK" => {
                if line.nick() == Some(session.nick.as_str()) {
                    if let Some(nick) = line.param(0) {
                        session.nick = nick.to_string();
                    }
                }
                Ok(Vec::new())
            }
            "KICK" => {
                let channel = line.param(0).unwrap_or("");
                if line.param(1) == Some(session.nick.as_str()) {
                    warn!("Kicked from {}, rejoining", channel);
                    return Ok(vec![format!("JOIN {}", channel)]);
                }
                Ok(Vec::new())
            }
            "PRIVMSG" => {
                self.on_privmsg(session, line);
                Ok(Vec::new())
            }
            "ERROR" => Err(IrcError::Closed {
                reason: line.param(0).unwrap_or("").to_string(),
            }),
            _ => Ok(Vec::new()),
        }
    }

    fn on_privmsg(&self, session: &Session, line: &IrcLine) {
        let (Some(nick), Some(target), Some(text)) = (line.nick(), line.param(0), line.param(1))
        else {
            return;
        };
        if !is_channel(target) || nick.eq_ignore_ascii_case(&session.nick) {
            return;
        }

        let (text, action) = match ctcp(text) {
            Some(("ACTION", body)) => (body, true),
            Some(_) => return,
            None => (text, false),
        };

        let event = IrcEvent {
            nick: nick.to_string(),
            channel: target.to_lowercase(),
            text: text.to_string(),
            action,
        };
        if let Err(e) = self.event_tx.send(event) {
            warn!("Failed to forward IRC message: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBundle;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn make_test_config(pass: &str) -> IrcConfig {
        IrcConfig {
            nick: "bridge".to_string(),
            user: "relay".to_string(),
            pass: pass.to_string(),
            ssl: false,
            ssl_verify: true,
            server: "localhost:6667".to_string(),
            command_chars: String::new(),
        }
    }

    #[test]
    fn test_parse_server() {
        assert_eq!(
            parse_server("irc.example.net:6697").unwrap(),
            ("irc.example.net".to_string(), 6697)
        );
        for bad in ["irc.example.net", ":6667", "host:0", "host:http", "host:70000"] {
            assert!(
                matches!(parse_server(bad), Err(IrcError::InvalidAddress { .. })),
                "{}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_registration_and_ping() {
        let channels = ChannelBundle::new();
        let (mut client, _handle) = IrcClient::new(make_test_config("secret"), Vec::new(), channels.irc);

        let stream = tokio_test::io::Builder::new()
            .write(b"PASS secret\r\nNICK bridge\r\nUSER relay 0 * :relay\r\n")
            .read(b":irc.example.net 433 * bridge :Nickname is already in use\r\n")
            .write(b"NICK bridge_\r\n")
            .read(b"PING :irc.example.net\r\n")
            .write(b"PONG :irc.example.net\r\n")
            .read(b"ERROR :Closing link\r\n")
            .build();

        let result = client.handle_connection(stream).await;
        assert!(matches!(result, Err(IrcError::Closed { reason }) if reason == "Closing link"));
    }

    #[tokio::test]
    async fn test_relays_channel_messages() {
        let mut channels = ChannelBundle::new();
        let (mut client, handle) = IrcClient::new(
            make_test_config(""),
            vec!["#general".to_string()],
            channels.irc,
        );
        let shutdown_tx = channels.control.shutdown_tx;

        let (client_stream, server_stream) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move { client.handle_connection(client_stream).await });

        let (read_half, mut write_half) = tokio::io::split(server_stream);
        let mut lines = BufReader::new(read_half).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK bridge");
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "USER relay 0 * :relay"
        );

        // Sends before registration are refused.
        assert!(matches!(
            handle.send_message("#general", "early").await,
            Err(SendError::IrcDisconnected)
        ));

        write_half
            .write_all(b":irc.example.net 001 bridge :Welcome\r\n")
            .await
            .unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "JOIN #general");

        write_half
            .write_all(
                b":bob!b@h PRIVMSG #General :hi all\r\n\
                  :bob!b@h PRIVMSG #general :\x01ACTION waves\x01\r\n\
                  :bob!b@h PRIVMSG #general :\x01VERSION\x01\r\n\
                  :bob!b@h PRIVMSG bridge :private\r\n\
                  :bridge!r@h PRIVMSG #general :echo\r\n\
                  :carol!c@h PRIVMSG #general :last\r\n",
            )
            .await
            .unwrap();

        let rx = &mut channels.relay.irc_rx;
        assert_eq!(
            rx.recv().await.unwrap(),
            IrcEvent {
                nick: "bob".to_string(),
                channel: "#general".to_string(),
                text: "hi all".to_string(),
                action: false,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            IrcEvent {
                nick: "bob".to_string(),
                channel: "#general".to_string(),
                text: "waves".to_string(),
                action: true,
            }
        );
        assert_eq!(rx.recv().await.unwrap().nick, "carol");

        handle
            .send_message("#general", "line one\nline two")
            .await
            .unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "PRIVMSG #general :line one line two"
        );

        shutdown_tx.send(true).unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "QUIT :Bridge shutting down"
        );
        assert!(task.await.unwrap().is_ok());
    }
}
