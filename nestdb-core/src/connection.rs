//! Per-connection request handling
//!
//! One accepted connection carries exactly one request: read a frame,
//! decode, validate, dispatch to the store, write the framed response and
//! let the socket drop. Only a payload whose request type cannot be
//! determined is closed without a response (logged); everything else,
//! wrong-shaped fields included, gets exactly one framed answer.

use crate::protocol::{self, reason, DecodeError, Request, Response};
use crate::store::Store;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// What the server should do after a connection finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep accepting connections.
    Continue,
    /// An `exit` request was served; begin graceful shutdown.
    Exit,
}

/// Serve one request/response exchange on `stream`.
pub async fn serve<S>(stream: &mut S, store: &Store) -> io::Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let payload = protocol::read_frame(stream).await?;

    let (response, outcome) = match Request::decode(&payload) {
        Ok(request) => dispatch(store, request),
        Err(DecodeError::WrongShape) => {
            (Response::error(reason::MALFORMED), Outcome::Continue)
        }
        Err(e) => {
            // cannot even tell the request type, close without a response
            warn!(error = %e, "unanswerable request payload, closing");
            return Ok(Outcome::Continue);
        }
    };
    let encoded = serde_json::to_vec(&response).map_err(io::Error::other)?;
    protocol::write_frame(stream, &encoded).await?;
    Ok(outcome)
}

/// Validate a decoded request and run it against the store.
fn dispatch(store: &Store, request: Request) -> (Response, Outcome) {
    if request.kind == "exit" {
        debug!("exit requested");
        return (Response::ok(), Outcome::Exit);
    }

    let response = match request.kind.as_str() {
        "get" | "set" | "delete" => {
            let key = match request.key {
                Some(key) if !key.is_empty() => key,
                _ => return (Response::error(reason::KEY_REQUIRED), Outcome::Continue),
            };
            match request.kind.as_str() {
                "get" => match store.get(&key) {
                    Ok(value) => Response::ok_value(value),
                    Err(e) => Response::error(e.to_string()),
                },
                "set" => match request.value {
                    Some(value) => match store.set(&key, value) {
                        Ok(()) => Response::ok(),
                        Err(e) => Response::error(e.to_string()),
                    },
                    None => Response::error(reason::VALUE_REQUIRED),
                },
                _ => match store.delete(&key) {
                    Ok(()) => Response::ok(),
                    Err(e) => Response::error(e.to_string()),
                },
            }
        }
        other => {
            debug!(kind = other, "unknown request type");
            Response::error(reason::UNKNOWN_TYPE)
        }
    };

    (response, Outcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;
    use crate::protocol::{read_frame, write_frame, Status};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Store,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = Store::open(dir.path().join("db.json")).unwrap();
            Self { _dir: dir, store }
        }

        /// Run one exchange through an in-memory pipe.
        async fn exchange(&self, request_json: &str) -> (Response, Outcome) {
            let (mut client, mut server) = tokio::io::duplex(64 * 1024);
            write_frame(&mut client, request_json.as_bytes())
                .await
                .unwrap();
            let outcome = serve(&mut server, &self.store).await.unwrap();
            let payload = read_frame(&mut client).await.unwrap();
            (serde_json::from_slice(&payload).unwrap(), outcome)
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let fx = Fixture::new();

        let (response, outcome) = fx
            .exchange(r#"{"type":"set","key":"name","value":"Kate"}"#)
            .await;
        assert_eq!(response, Response::ok());
        assert_eq!(outcome, Outcome::Continue);

        let (response, _) = fx.exchange(r#"{"type":"get","key":"name"}"#).await;
        assert_eq!(response, Response::ok_value(Value::from("Kate")));
    }

    #[tokio::test]
    async fn test_path_keys_over_the_wire() {
        let fx = Fixture::new();

        fx.exchange(r#"{"type":"set","key":["a","b","c"],"value":1}"#)
            .await;
        let (response, _) = fx.exchange(r#"{"type":"get","key":["a","b"]}"#).await;
        let value = response.value.unwrap();
        assert_eq!(value.as_object().unwrap().get("c"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_missing_key_and_value_validation() {
        let fx = Fixture::new();

        let (response, _) = fx.exchange(r#"{"type":"delete"}"#).await;
        assert_eq!(response, Response::error(reason::KEY_REQUIRED));

        let (response, _) = fx.exchange(r#"{"type":"get","key":[]}"#).await;
        assert_eq!(response, Response::error(reason::KEY_REQUIRED));

        let (response, _) = fx.exchange(r#"{"type":"set","key":"x"}"#).await;
        assert_eq!(response, Response::error(reason::VALUE_REQUIRED));
    }

    #[tokio::test]
    async fn test_get_and_delete_miss() {
        let fx = Fixture::new();

        let (response, _) = fx.exchange(r#"{"type":"get","key":"ghost"}"#).await;
        assert_eq!(response, Response::error(reason::NO_SUCH_KEY));

        let (response, _) = fx.exchange(r#"{"type":"delete","key":"ghost"}"#).await;
        assert_eq!(response, Response::error(reason::NO_SUCH_KEY));
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let fx = Fixture::new();
        let (response, outcome) = fx.exchange(r#"{"type":"push","key":"x"}"#).await;
        assert_eq!(response, Response::error(reason::UNKNOWN_TYPE));
        assert_eq!(outcome, Outcome::Continue);
    }

    #[tokio::test]
    async fn test_exit_reports_shutdown() {
        let fx = Fixture::new();
        let (response, outcome) = fx.exchange(r#"{"type":"exit"}"#).await;
        assert_eq!(response.response, Status::Ok);
        assert_eq!(outcome, Outcome::Exit);
    }

    #[tokio::test]
    async fn test_wrong_shaped_key_gets_a_framed_error() {
        let fx = Fixture::new();

        let (response, outcome) = fx.exchange(r#"{"type":"get","key":5}"#).await;
        assert_eq!(response, Response::error(reason::MALFORMED));
        assert_eq!(outcome, Outcome::Continue);

        let (response, _) = fx.exchange(r#"{"type":"get","key":{"a":1}}"#).await;
        assert_eq!(response, Response::error(reason::MALFORMED));

        let (response, _) = fx
            .exchange(r#"{"type":"set","key":["a",5],"value":1}"#)
            .await;
        assert_eq!(response, Response::error(reason::MALFORMED));
    }

    #[tokio::test]
    async fn test_malformed_payload_closes_without_response() {
        let fx = Fixture::new();
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"this is not json").await.unwrap();
        let outcome = serve(&mut server, &fx.store).await.unwrap();
        assert_eq!(outcome, Outcome::Continue);

        drop(server);
        let err = read_frame(&mut client).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
