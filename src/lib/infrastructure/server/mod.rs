//! Debug Bridge: HTTP routes over the same gateway the stdio server drives.

mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;


pub use dto::{ErrorResponse, GenerationResponse, PersonaListResponse};
pub use error::ServerError;
pub use router::build_router;
pub(crate) use state::ServerState;

use crate::application::Gateway;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve(
    gateway: Arc<Gateway>,
    addr: SocketAddr,
    cors_origins: &[String],
) -> Result<(), ServerError> {
    router::serve(gateway, addr, cors_origins).await
}
