use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("websocket server error: {0}")]
    Server(#[from] std::io::Error),
}
