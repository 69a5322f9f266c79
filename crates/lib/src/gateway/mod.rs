//! Gateway: the HTTP surface in front of the dispatcher.
//!
//! Routes: `GET /health`, `POST /webhook` (LINE, signature-gated), `GET /test`, and a JSON
//! 404 for everything else. `OPTIONS` on any path is answered as a CORS preflight.

mod server;

pub use server::{router, run_gateway, serve, GatewayState, RequestId};
