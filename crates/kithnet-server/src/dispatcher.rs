//! Request dispatcher: wire requests in, wire responses out.
//!
//! The dispatcher maps each decoded [`Request`] to its
//! [`DirectoryCommand`], awaits the oneshot reply, and normalizes the
//! result into a [`Response`]. It is a pure routing/validation layer:
//! all graph and store access happens inside the directory event loop.

use kithnet_directory::DirectoryCommand;
use kithnet_protocol::message::{Request, Response, ResponseBody};
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes requests to the directory and shapes the replies.
#[derive(Clone)]
pub struct Dispatcher {
    command_tx: mpsc::Sender<DirectoryCommand>,
}

impl Dispatcher {
    /// Creates a dispatcher over a directory command channel.
    pub fn new(command_tx: mpsc::Sender<DirectoryCommand>) -> Self {
        Self { command_tx }
    }

    /// Handles one request end to end.
    ///
    /// Every outcome is a [`Response`]; domain failures and directory
    /// unavailability travel in-band, never as a transport fault.
    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Login { username, password } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::Login { username, password, reply })
                    .await
                {
                    Ok(Ok(profile)) => Response::Success(ResponseBody::UserData {
                        user_data: profile,
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::Register { username, password, name, photo } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::Register {
                        username,
                        password,
                        name,
                        photo,
                        reply,
                    })
                    .await
                {
                    Ok(Ok(())) => Response::Success(ResponseBody::Message {
                        message: "user registered".into(),
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::UpdateProfile { username, name, photo } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::UpdateProfile {
                        username,
                        name,
                        photo,
                        reply,
                    })
                    .await
                {
                    Ok(Ok(profile)) => Response::Success(ResponseBody::UserData {
                        user_data: profile,
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::ChangePassword { username, old_password, new_password } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::ChangePassword {
                        username,
                        old_password,
                        new_password,
                        reply,
                    })
                    .await
                {
                    Ok(Ok(())) => Response::Success(ResponseBody::Message {
                        message: "password changed".into(),
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::AddFriend { user1, user2 } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::AddFriend { user1, user2, reply })
                    .await
                {
                    Ok(Ok(newly_added)) => Response::Success(ResponseBody::Message {
                        message: if newly_added {
                            "friendship added".into()
                        } else {
                            "already friends".into()
                        },
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::RemoveFriend { user1, user2 } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::RemoveFriend { user1, user2, reply })
                    .await
                {
                    Ok(Ok(())) => Response::Success(ResponseBody::Message {
                        message: "friendship removed".into(),
                    }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::GetFriends { username } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::GetFriends { username, reply })
                    .await
                {
                    Ok(Ok(friends)) => Response::Success(ResponseBody::Friends { friends }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::FindPath { start, end } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::FindPath { start, end, reply })
                    .await
                {
                    Ok(Ok(path)) => Response::Success(ResponseBody::Path { path }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::GetSuggestions { username } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::GetSuggestions { username, reply })
                    .await
                {
                    Ok(Ok(suggestions)) => {
                        Response::Success(ResponseBody::Suggestions { suggestions })
                    }
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::SearchUser { query, current_user } => {
                match self
                    .roundtrip(|reply| DirectoryCommand::SearchUsers {
                        query,
                        current_user,
                        reply,
                    })
                    .await
                {
                    Ok(Ok(users)) => Response::Success(ResponseBody::Users { users }),
                    Ok(Err(e)) => Response::from_error(&e),
                    Err(response) => response,
                }
            }

            Request::GetStats => {
                match self
                    .roundtrip(|reply| DirectoryCommand::GetStats { reply })
                    .await
                {
                    Ok(stats) => Response::Success(ResponseBody::Stats { stats }),
                    Err(response) => response,
                }
            }
        }
    }

    /// Sends one command and awaits its oneshot reply.
    ///
    /// Channel failures become error responses: a closed command
    /// channel means the directory is shutting down; a dropped reply
    /// sender should not happen and is reported as internal.
    async fn roundtrip<T, F>(&self, make: F) -> std::result::Result<T, Response>
    where
        F: FnOnce(oneshot::Sender<T>) -> DirectoryCommand,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Response::error("directory is shutting down"))?;
        reply_rx
            .await
            .map_err(|_| Response::error("directory dropped the reply channel"))
    }
}
