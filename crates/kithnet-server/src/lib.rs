//! TCP front end for the Kithnet social-graph service.
//!
//! The [`listener`] accepts connections and spawns one [`session`]
//! task per client; each session runs the framed read → decrypt →
//! decode → dispatch → encrypt → write cycle until the peer
//! disconnects or a transport error occurs. The [`dispatcher`] is a
//! pure routing layer between wire requests and directory commands —
//! it never touches the graph or the store itself.

pub mod dispatcher;
pub mod listener;
pub mod session;

pub use dispatcher::Dispatcher;
pub use listener::{Server, ServerConfig};
pub use session::Session;
