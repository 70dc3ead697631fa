//! Prompt and error channel between the workspace and whatever front end
//! renders dialogs
//!
//! Each prompt is a request carrying a one-shot reply. A front end that drops
//! the reply (or the whole receiver) dismisses the prompt.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

/// What the password is for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordPurpose {
    Import,
    Export,
}

/// Answer to "add as file or import as archive"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportChoice {
    AddAsFile,
    ImportArchive,
}

#[derive(Debug)]
pub enum UiRequest {
    Password {
        purpose: PasswordPurpose,
        reply: oneshot::Sender<String>,
    },
    ChooseAction {
        name: String,
        reply: oneshot::Sender<ImportChoice>,
    },
    Error(String),
}

#[derive(Clone, Debug)]
pub struct Ui {
    tx: mpsc::UnboundedSender<UiRequest>,
}

impl Ui {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub async fn password(&self, purpose: PasswordPurpose) -> Result<String> {
        let (reply, answer) = oneshot::channel();
        self.ask(UiRequest::Password { purpose, reply })?;
        answer.await.map_err(|_| Error::Dismissed)
    }

    pub async fn choose_action(&self, name: &str) -> Result<ImportChoice> {
        let (reply, answer) = oneshot::channel();
        self.ask(UiRequest::ChooseAction {
            name: name.to_string(),
            reply,
        })?;
        answer.await.map_err(|_| Error::Dismissed)
    }

    /// Forward an error message to the front end
    pub fn display_error(&self, error: &Error) {
        tracing::warn!(kind = ?error.kind(), "{error}");
        let _ = self.tx.send(UiRequest::Error(error.to_string()));
    }

    fn ask(&self, request: UiRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| Error::Dismissed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_reply() {
        let (ui, mut rx) = Ui::channel();
        let responder = async {
            match rx.recv().await {
                Some(UiRequest::Password { purpose, reply }) => {
                    assert_eq!(purpose, PasswordPurpose::Import);
                    reply.send("secret".to_string()).unwrap();
                }
                other => panic!("unexpected request: {other:?}"),
            }
        };
        let (answer, ()) = tokio::join!(ui.password(PasswordPurpose::Import), responder);
        assert_eq!(answer.unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_dropped_reply_is_dismissal() {
        let (ui, mut rx) = Ui::channel();
        let responder = async {
            if let Some(UiRequest::ChooseAction { name, reply }) = rx.recv().await {
                assert_eq!(name, "book.epub");
                drop(reply);
            }
        };
        let (answer, ()) = tokio::join!(ui.choose_action("book.epub"), responder);
        assert!(matches!(answer, Err(Error::Dismissed)));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_dismissal() {
        let (ui, rx) = Ui::channel();
        drop(rx);
        assert!(matches!(
            ui.password(PasswordPurpose::Export).await,
            Err(Error::Dismissed)
        ));
        ui.display_error(&Error::WrongPassword);
    }

    #[test]
    fn test_display_error_sends_message() {
        let (ui, mut rx) = Ui::channel();
        ui.display_error(&Error::WrongPassword.annotate("a.txt"));
        match rx.try_recv() {
            Ok(UiRequest::Error(message)) => assert_eq!(message, "invalid password (a.txt)"),
            other => panic!("unexpected request: {other:?}"),
        }
    }
}
