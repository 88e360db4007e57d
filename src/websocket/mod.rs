//! WebSocket Real-Time Feed
//!
//! Streams pollution readings and location snapshots to connected
//! dashboard clients.
//!
//! ## Architecture
//!
//! - **ConnectionRegistry**: tracks live connections, filters, liveness
//! - **Broadcaster**: fans generator events out to matching connections
//! - **Handler**: WebSocket upgrade and per-connection message loop
//! - **Messages**: the `{ type, payload }` envelope protocol
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8090/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'request_initial_data'}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'pollution_update') console.log(msg.payload);
//! };
//! ```

mod broadcaster;
mod handler;
mod messages;
mod registry;

pub use broadcaster::{Broadcaster, FeedState};
pub use handler::websocket_handler;
pub use messages::{ClientMessage, ServerMessage};
pub use registry::{
    ConnectionId, ConnectionRegistry, ConnectionSnapshot, RegistryConfig, RegistryError,
};
