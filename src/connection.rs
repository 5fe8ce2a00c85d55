//! Per-connection loop: greet, then read → dispatch → respond until a
//! terminal code or the stream gives out.
//!
//! The loop owns exactly one [`Session`](crate::session::Session) and is
//! strictly alternating after the initial greeting: one inbound frame, one
//! outbound frame. Reads are bounded by an idle timeout; a timeout, EOF, or
//! framing violation terminates the session as if the last code had been
//! 2500: nothing further is sent, per RFC 5734's framing rules.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::dispatch::Engine;
use crate::error::Result;
use crate::protocol::wire::{self, FramingError};
use crate::protocol::xml;

/// Drive one connected, TLS-terminated byte stream through the EPP state
/// machine. Returns once the session is over; the stream is flushed and
/// shut down on every exit path.
pub async fn serve_connection<S>(engine: Arc<Engine>, mut stream: S, idle_timeout: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let result = drive(&engine, &mut stream, idle_timeout).await;
    let _ = stream.shutdown().await;
    result
}

async fn drive<S>(engine: &Engine, stream: &mut S, idle_timeout: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = engine.new_session();
    tracing::debug!(session = session.id(), "session open");

    let greeting = xml::to_bytes(&engine.greeting())?;
    wire::write_frame(stream, &greeting).await?;

    loop {
        let payload = match timeout(idle_timeout, wire::read_frame(stream)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(FramingError::ConnectionClosed)) => {
                tracing::debug!(session = session.id(), "peer disconnected");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(session = session.id(), error = %e, "read failed; closing");
                return Ok(());
            }
            Err(_) => {
                tracing::debug!(session = session.id(), "idle timeout; closing");
                return Ok(());
            }
        };

        let reply = engine.dispatch(&payload, &mut session).await;
        let bytes = xml::to_bytes(&reply.frame)?;
        wire::write_frame(stream, &bytes).await?;

        if reply.is_terminal() {
            tracing::debug!(
                session = session.id(),
                code = reply.code.value(),
                "session over"
            );
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeting::HelloMeta;
    use crate::handler::{CommandReply, HandlerRegistry};
    use crate::protocol::xml::EPP_NS;
    use minidom::Element;

    const DOMAIN_NS: &str = "urn:ietf:params:xml:ns:domain-1.0";

    fn engine() -> Arc<Engine> {
        let mut registry = HandlerRegistry::new();
        registry.hello(|| HelloMeta {
            sv_id: Some("epp.example.com".to_string()),
            objects: vec![DOMAIN_NS.to_string()],
            ..HelloMeta::default()
        });
        registry.register("login", |_ctx| async { Ok(CommandReply::ok()) });
        Arc::new(Engine::new(registry))
    }

    async fn read_doc<S: AsyncRead + Unpin>(stream: &mut S) -> Element {
        let payload = wire::read_frame(stream).await.unwrap();
        xml::parse(&payload).unwrap()
    }

    fn login_xml() -> String {
        format!(
            r#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
                 <command>
                   <login><clID>gavin</clID><pw>x</pw>
                     <svcs><objURI>{DOMAIN_NS}</objURI></svcs>
                   </login>
                   <clTRID>L-1</clTRID>
                 </command>
               </epp>"#
        )
    }

    const LOGOUT_XML: &str = r#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
                                  <command><logout/><clTRID>Q-1</clTRID></command>
                                </epp>"#;

    #[tokio::test]
    async fn test_greeting_then_login_then_logout_closes() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve_connection(engine(), server, Duration::from_secs(5)));

        // Server speaks first.
        let greeting = read_doc(&mut client).await;
        assert!(greeting.get_child("greeting", EPP_NS).is_some());

        wire::write_frame(&mut client, login_xml().as_bytes())
            .await
            .unwrap();
        let login_resp = read_doc(&mut client).await;
        let code = login_resp
            .get_child("response", EPP_NS)
            .unwrap()
            .get_child("result", EPP_NS)
            .unwrap()
            .attr("code")
            .unwrap()
            .to_string();
        assert_eq!(code, "1000");

        wire::write_frame(&mut client, LOGOUT_XML.as_bytes())
            .await
            .unwrap();
        let logout_resp = read_doc(&mut client).await;
        assert!(logout_resp.get_child("response", EPP_NS).is_some());

        // After 1500 the server closes; the next read sees EOF.
        let end = wire::read_frame(&mut client).await;
        assert!(matches!(end, Err(FramingError::ConnectionClosed)));

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_xml_keeps_session_alive() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve_connection(engine(), server, Duration::from_secs(5)));

        let _greeting = read_doc(&mut client).await;

        wire::write_frame(&mut client, b"<epp><command").await.unwrap();
        let resp = read_doc(&mut client).await;
        let result = resp
            .get_child("response", EPP_NS)
            .unwrap()
            .get_child("result", EPP_NS)
            .unwrap();
        assert_eq!(result.attr("code"), Some("2001"));

        // Still alive: a <hello> gets a greeting back.
        wire::write_frame(
            &mut client,
            br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><hello/></epp>"#,
        )
        .await
        .unwrap();
        let hello_resp = read_doc(&mut client).await;
        assert!(hello_resp.get_child("greeting", EPP_NS).is_some());

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_framing_violation_terminates_silently() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve_connection(engine(), server, Duration::from_secs(5)));

        let _greeting = read_doc(&mut client).await;

        // Length header below the legal minimum.
        client.write_all(&2u32.to_be_bytes()).await.unwrap();
        client.flush().await.unwrap();

        let end = wire::read_frame(&mut client).await;
        assert!(matches!(end, Err(FramingError::ConnectionClosed)));

        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_closes_connection() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(serve_connection(engine(), server, Duration::from_secs(30)));

        let _greeting = read_doc(&mut client).await;

        // No frame arrives; paused time auto-advances past the timeout.
        let end = wire::read_frame(&mut client).await;
        assert!(matches!(end, Err(FramingError::ConnectionClosed)));

        task.await.unwrap().unwrap();
    }
}
